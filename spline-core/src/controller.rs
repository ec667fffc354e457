//! Editing commands for one open document
//!
//! [`DocumentController`] is the context object a host drives: it owns the
//! [`Document`], knows where it is stored, and routes pointer input through
//! an [`Interaction`]. Every mutation a host performs goes through here or
//! through the interaction.

use crate::color::Color;
use crate::config::InteractionConfig;
use crate::document::Document;
use crate::file_io::{self, DocumentRepository, FileError};
use crate::geometry::Frame;
use crate::interaction::{CursorHint, Interaction, PointerEvent};
use crate::layer::{Layer, ShapeKind};
use crate::layer_tree::{LayerRow, TreeError};
use crate::selection;
use kurbo::{Point, Size};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

/// Size of a rectangle added from the menu
pub const RECT_SIZE: Size = Size::new(600.0, 300.0);

/// Size of an oval added from the menu
pub const OVAL_SIZE: Size = Size::new(400.0, 400.0);

/// Height of a triangle added from the menu
pub const TRIANGLE_HEIGHT: f64 = 400.0;

/// Width of an equilateral triangle of [`TRIANGLE_HEIGHT`], to one decimal
pub fn triangle_width() -> f64 {
    let width = TRIANGLE_HEIGHT / 3f64.sqrt() * 2.0;
    (width * 10.0).round() / 10.0
}

/// One open document and the commands that edit it
#[derive(Debug)]
pub struct DocumentController {
    document: Document,
    repository: DocumentRepository,
    name: String,
    /// Size of the host's canvas in view units
    viewport_size: Size,
    /// Shapes added per kind this session, for default names
    added: HashMap<ShapeKind, usize>,
    interaction: Interaction,
}

impl DocumentController {
    /// Controller for a new, empty document called `name`
    pub fn new(repository: DocumentRepository, name: impl Into<String>, config: InteractionConfig) -> Self {
        Self {
            document: Document::new(),
            repository,
            name: name.into(),
            viewport_size: Size::ZERO,
            added: HashMap::new(),
            interaction: Interaction::new(config),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn repository(&self) -> &DocumentRepository {
        &self.repository
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pretty_name(&self) -> &str {
        file_io::pretty_name(&self.name)
    }

    pub fn viewport_size(&self) -> Size {
        self.viewport_size
    }

    pub fn set_viewport_size(&mut self, size: Size) {
        self.viewport_size = size;
    }

    // === PERSISTENCE ===

    /// Replace the in-memory document with the stored one
    ///
    /// On failure the current document is left untouched.
    pub fn load(&mut self) -> Result<(), FileError> {
        self.document = self.repository.load(&self.name)?;
        Ok(())
    }

    /// Switch to the stored document `name`
    ///
    /// A missing or unreadable document opens as a fresh, empty one.
    pub fn open(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.interaction = Interaction::new(self.interaction.config().clone());
        if let Err(e) = self.load() {
            log::warn!("opening {:?} as a new document: {e}", self.name);
            self.document = Document::new();
        }
    }

    pub fn save(&self) -> Result<(), FileError> {
        self.repository.save(&self.name, &self.document)
    }

    /// Save and give up the document
    pub fn close(self) -> Result<Document, FileError> {
        self.save()?;
        Ok(self.document)
    }

    // === QUERIES ===

    pub fn current(&self) -> Option<Uuid> {
        self.document.current()
    }

    pub fn set_current(&mut self, layer: Option<Uuid>) {
        self.document.set_current(layer);
    }

    pub fn has_clipboard_contents(&self) -> bool {
        self.document.clipboard().is_some()
    }

    /// True when there is a current layer worth showing properties for
    ///
    /// A current group with no children has nothing to edit.
    pub fn right_panel_visible(&self) -> bool {
        let Some(current) = self.document.current() else {
            return false;
        };
        match self.document.tree().get(&current) {
            Some(layer) if layer.is_group() => !layer.members().is_empty(),
            Some(_) => true,
            None => false,
        }
    }

    pub fn layer_list(&self) -> Vec<LayerRow> {
        self.document.tree().layer_list()
    }

    // === ADDING LAYERS ===

    pub fn add_rect(&mut self) -> Result<Uuid, TreeError> {
        self.add_shape(ShapeKind::Rect, RECT_SIZE)
    }

    pub fn add_oval(&mut self) -> Result<Uuid, TreeError> {
        self.add_shape(ShapeKind::Oval, OVAL_SIZE)
    }

    pub fn add_triangle(&mut self) -> Result<Uuid, TreeError> {
        self.add_shape(ShapeKind::Triangle, Size::new(triangle_width(), TRIANGLE_HEIGHT))
    }

    fn add_shape(&mut self, kind: ShapeKind, size: Size) -> Result<Uuid, TreeError> {
        let count = self.added.entry(kind).or_insert(0);
        *count += 1;
        let name = format!("{} {}", kind.label(), count);

        let layer = Layer::shape(kind, name, Frame::unplaced(size.width, size.height));
        let id = self.document.tree_mut().insert(layer);
        self.add_layer(id)?;
        Ok(id)
    }

    /// Add a detached arena layer to the current group and make it current
    fn add_layer(&mut self, id: Uuid) -> Result<(), TreeError> {
        let group = self.document.current_group();
        self.place_layer(id, group)
    }

    fn place_layer(&mut self, id: Uuid, group: Uuid) -> Result<(), TreeError> {
        self.center_if_offscreen(&id);
        self.document.tree_mut().add_child(group, id)?;
        self.document.tree_mut().set_selected(&id, true);
        self.document.set_current(Some(id));
        Ok(())
    }

    /// Move a layer whose centre is outside the visible area to the middle of it
    fn center_if_offscreen(&mut self, id: &Uuid) {
        let Some(bounds) = self.document.tree().bounds(id) else {
            return;
        };
        let viewport = self.document.viewport();
        let visible = Frame::new(
            -viewport.x,
            -viewport.y,
            self.viewport_size.width,
            self.viewport_size.height,
        );
        let center = bounds.center();
        let onscreen = center.x >= visible.left()
            && center.x <= visible.right()
            && center.y >= visible.top()
            && center.y <= visible.bottom();
        if onscreen {
            return;
        }

        let tree = self.document.tree_mut();
        tree.set_x(id, visible.mid_x() - bounds.width / 2.0);
        tree.set_y(id, visible.mid_y() - bounds.height / 2.0);
    }

    // === CLIPBOARD AND STRUCTURE ===

    /// Delete the current layer, or every member of the current selection
    pub fn delete_current(&mut self) {
        let Some(current) = self.document.current() else {
            return;
        };
        let doomed = if selection::is_selection(self.document.tree(), &current) {
            self.document.tree().children(&current).to_vec()
        } else {
            vec![current]
        };

        self.document.set_current(None);
        for id in doomed {
            self.document.tree_mut().purge(&id);
        }
    }

    /// Move the current layer to the clipboard
    ///
    /// A selection is cut as a group holding its members.
    pub fn cut_current(&mut self) {
        let Some(current) = self.document.current() else {
            return;
        };
        if selection::is_selection(self.document.tree(), &current) {
            let copy = self.document.tree_mut().copy(&current);
            self.delete_current();
            self.document.set_clipboard(copy);
        } else {
            self.document.set_current(None);
            self.document.remove_layer(&current);
            self.document.set_clipboard(Some(current));
        }
    }

    /// Put a copy of the current layer on the clipboard
    pub fn copy_current(&mut self) {
        let Some(current) = self.document.current() else {
            return;
        };
        let copy = self.document.tree_mut().copy(&current);
        self.document.set_clipboard(copy);
    }

    /// Insert a copy of the clipboard and make it current
    pub fn paste(&mut self) -> Result<Option<Uuid>, TreeError> {
        let Some(clip) = self.document.clipboard() else {
            return Ok(None);
        };
        self.insert_copy(&clip)
    }

    /// Insert a copy of the current layer without touching the clipboard
    pub fn duplicate_current(&mut self) -> Result<Option<Uuid>, TreeError> {
        let Some(current) = self.document.current() else {
            return Ok(None);
        };
        self.insert_copy(&current)
    }

    fn insert_copy(&mut self, source: &Uuid) -> Result<Option<Uuid>, TreeError> {
        let Some(copy) = self.document.tree_mut().copy(source) else {
            return Ok(None);
        };
        self.add_layer(copy)?;
        Ok(Some(copy))
    }

    /// Wrap the current layer in a new group
    ///
    /// A selection is replaced by a group holding copies of its members; a
    /// single layer is moved into a new group in its old parent.
    pub fn group_current(&mut self) -> Result<Option<Uuid>, TreeError> {
        let Some(current) = self.document.current() else {
            return Ok(None);
        };

        if selection::is_selection(self.document.tree(), &current) {
            let Some(group) = self.document.tree_mut().copy(&current) else {
                return Ok(None);
            };
            self.delete_current();
            self.add_layer(group)?;
            return Ok(Some(group));
        }

        let parent = self.document.current_group();
        self.document.set_current(None);
        let tree = self.document.tree_mut();
        let group = tree.insert(Layer::group());
        tree.add_child(group, current)?;
        tree.set_expanded(&group, true);
        self.place_layer(group, parent)?;
        Ok(Some(group))
    }

    // === PROPERTY EDITS ===

    pub fn rename(&mut self, id: &Uuid, name: impl Into<String>) {
        self.document.tree_mut().set_name(id, name);
    }

    pub fn set_visible(&mut self, id: &Uuid, visible: bool) {
        self.document.tree_mut().set_visible(id, visible);
    }

    pub fn set_opacity(&mut self, id: &Uuid, opacity: u8) {
        self.document.tree_mut().set_opacity(id, opacity);
    }

    pub fn toggle_expanded(&mut self, id: &Uuid) {
        self.document.tree_mut().toggle_expanded(id);
    }

    /// Set a layer's box in one resize gesture
    pub fn set_frame(&mut self, id: &Uuid, frame: Frame) {
        self.document.tree_mut().set_frame(id, frame);
    }

    /// Edit a shape's colour. Returns `None` if `id` is not a shape.
    pub fn edit_color<R>(&mut self, id: &Uuid, edit: impl FnOnce(&mut Color) -> R) -> Option<R> {
        self.document.tree_mut().edit_color(id, edit)
    }

    /// Set a shape's colour from `#rrggbb`; other input is ignored
    pub fn set_color_hex(&mut self, id: &Uuid, hex: &str) -> bool {
        let applied = self.edit_color(id, |c| c.set_hex_string(hex)).unwrap_or(false);
        if !applied {
            log::debug!("ignoring colour {hex:?} for layer {id}");
        }
        applied
    }

    // === POINTER INPUT ===

    pub fn pointer_down(&mut self, event: PointerEvent) {
        self.interaction.pointer_down(&mut self.document, event);
    }

    pub fn pointer_move(&mut self, event: PointerEvent) {
        self.interaction.pointer_move(&mut self.document, event);
    }

    pub fn pointer_up(&mut self, event: PointerEvent) {
        self.interaction.pointer_up(&mut self.document, event);
    }

    pub fn pointer_cancel(&mut self) {
        self.interaction.cancel(&mut self.document);
    }

    /// Advance timers; returns true while another refresh is needed
    pub fn tick(&mut self, now: Duration) -> bool {
        self.interaction.tick(&mut self.document, now)
    }

    pub fn cursor_at(&self, position: Point) -> CursorHint {
        self.interaction.cursor_at(&self.document, position)
    }
}
