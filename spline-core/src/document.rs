//! Document structure for Spline
//!
//! A Document is the layer arena plus the editing state that persists with
//! it: which layer is current, what sits on the clipboard and where the
//! viewport is scrolled to.

use crate::change::Change;
use crate::layer_tree::{LayerTree, TreeError};
use crate::selection;
use kurbo::Vec2;
use uuid::Uuid;

/// Viewport offset of a new document, so both zero axes are on screen
pub const DEFAULT_VIEWPORT: Vec2 = Vec2::new(30.0, 30.0);

/// A complete Spline document
#[derive(Clone, Debug)]
pub struct Document {
    tree: LayerTree,

    /// Current layer: a single layer or a selection node
    current: Option<Uuid>,

    /// Root of a detached subtree held for pasting
    clipboard: Option<Uuid>,

    /// Scroll offset added to document coordinates to get view coordinates
    viewport: Vec2,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document
    pub fn new() -> Self {
        Self::from_tree(LayerTree::new(), DEFAULT_VIEWPORT)
    }

    pub(crate) fn from_tree(tree: LayerTree, viewport: Vec2) -> Self {
        Self {
            tree,
            current: None,
            clipboard: None,
            viewport,
        }
    }

    pub fn tree(&self) -> &LayerTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut LayerTree {
        &mut self.tree
    }

    pub fn root(&self) -> Uuid {
        self.tree.root()
    }

    pub fn current(&self) -> Option<Uuid> {
        self.current
    }

    /// True if the current layer is a multi-layer selection
    pub fn current_is_selection(&self) -> bool {
        self.current
            .is_some_and(|id| selection::is_selection(&self.tree, &id))
    }

    /// Make `layer` current
    ///
    /// The previous current layer (or every member of a previous selection)
    /// is unselected and the new one is selected. A selection that stops being
    /// current is dropped from the arena. Selecting a layer expands its
    /// parent group.
    pub fn set_current(&mut self, layer: Option<Uuid>) {
        if self.current == layer {
            return;
        }

        if let Some(old) = self.current.take() {
            self.mark_selected(&old, false);
            if selection::is_selection(&self.tree, &old) {
                self.tree.purge(&old);
            }
        }

        self.current = layer.filter(|id| self.tree.contains(id));
        if let Some(new) = self.current {
            self.mark_selected(&new, true);
            if let Some(parent) = self.tree.parent(&new) {
                self.tree.open_expanded(&parent);
            }
        }

        self.tree.changes_mut().push(Change::Selection);
    }

    fn mark_selected(&mut self, id: &Uuid, selected: bool) {
        self.tree.set_selected(id, selected);
        if selection::is_selection(&self.tree, id) {
            for member in self.tree.children(id).to_vec() {
                self.tree.set_selected(&member, selected);
            }
        }
    }

    /// Group that new layers are added to
    ///
    /// The parent of the current single layer, otherwise the root.
    pub fn current_group(&self) -> Uuid {
        self.current
            .and_then(|id| self.tree.parent(&id))
            .unwrap_or_else(|| self.tree.root())
    }

    /// Append an arena layer to the current group
    pub fn add_layer(&mut self, id: Uuid) -> Result<(), TreeError> {
        let group = self.current_group();
        self.tree.add_child(group, id)
    }

    /// Take a layer out of the tree, keeping it in the arena
    ///
    /// It also leaves any selection that listed it.
    pub fn remove_layer(&mut self, id: &Uuid) {
        if let Some(parent) = self.tree.parent(id) {
            if let Err(e) = self.tree.remove_child(parent, *id) {
                log::warn!("failed to remove layer {id}: {e}");
            }
        }
    }

    pub fn clipboard(&self) -> Option<Uuid> {
        self.clipboard
    }

    /// Replace the clipboard, dropping the previous detached entry
    pub fn set_clipboard(&mut self, layer: Option<Uuid>) {
        if let Some(old) = self.clipboard.take() {
            if Some(old) != layer && self.tree.parent(&old).is_none() && old != self.tree.root() {
                self.tree.purge(&old);
            }
        }
        self.clipboard = layer;
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Vec2) {
        if viewport != self.viewport {
            self.viewport = viewport;
            self.tree.changes_mut().push(Change::Viewport);
        }
    }

    /// Take every change recorded since the last drain
    pub fn drain_changes(&mut self) -> Vec<Change> {
        self.tree.drain_changes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Frame;
    use crate::layer::{Layer, ShapeKind};

    fn rect() -> Layer {
        Layer::shape(ShapeKind::Rect, "Rect", Frame::new(0.0, 0.0, 10.0, 10.0))
    }

    #[test]
    fn test_new_document() {
        let doc = Document::new();
        assert_eq!(doc.viewport(), Vec2::new(30.0, 30.0));
        assert!(doc.current().is_none());
        assert!(doc.clipboard().is_none());
        assert_eq!(doc.current_group(), doc.root());
    }

    #[test]
    fn test_set_current_moves_selected_flag() {
        let mut doc = Document::new();
        let a = doc.tree_mut().insert(rect());
        let b = doc.tree_mut().insert(rect());
        doc.add_layer(a).unwrap();
        doc.add_layer(b).unwrap();

        doc.set_current(Some(a));
        assert!(doc.tree().get(&a).unwrap().selected);

        doc.set_current(Some(b));
        assert!(!doc.tree().get(&a).unwrap().selected);
        assert!(doc.tree().get(&b).unwrap().selected);
    }

    #[test]
    fn test_current_group_follows_current_layer() {
        let mut doc = Document::new();
        let root = doc.root();
        let g = doc.tree_mut().insert(Layer::group());
        let r = doc.tree_mut().insert(rect());
        doc.tree_mut().add_child(root, g).unwrap();
        doc.tree_mut().add_child(g, r).unwrap();

        doc.set_current(Some(r));
        assert_eq!(doc.current_group(), g);
        // Selecting a layer opens its group in the layer list
        assert!(doc.tree().is_visible_in_list(&r));

        doc.set_current(Some(g));
        assert_eq!(doc.current_group(), root);
    }

    #[test]
    fn test_dropping_a_selection_clears_members() {
        let mut doc = Document::new();
        let a = doc.tree_mut().insert(rect());
        let b = doc.tree_mut().insert(rect());
        doc.add_layer(a).unwrap();
        doc.add_layer(b).unwrap();

        let sel = selection::create(doc.tree_mut(), &[a, b]);
        doc.set_current(Some(sel));
        assert!(doc.current_is_selection());

        doc.set_current(None);
        assert!(!doc.tree().get(&a).unwrap().selected);
        assert!(!doc.tree().get(&b).unwrap().selected);
        assert!(doc.tree().get(&sel).is_none());
    }

    #[test]
    fn test_viewport_change_is_logged() {
        let mut doc = Document::new();
        doc.drain_changes();
        doc.set_viewport(Vec2::new(10.0, 0.0));
        doc.set_viewport(Vec2::new(10.0, 0.0));
        assert_eq!(doc.drain_changes(), vec![Change::Viewport]);
    }

    #[test]
    fn test_set_clipboard_drops_previous_entry() {
        let mut doc = Document::new();
        let first = doc.tree_mut().insert(rect());
        let second = doc.tree_mut().insert(rect());

        doc.set_clipboard(Some(first));
        doc.set_clipboard(Some(second));
        assert!(doc.tree().get(&first).is_none());
        assert_eq!(doc.clipboard(), Some(second));
    }

    #[test]
    fn test_remove_layer_drops_it_from_selection() {
        let mut doc = Document::new();
        let a = doc.tree_mut().insert(rect());
        let b = doc.tree_mut().insert(rect());
        let c = doc.tree_mut().insert(rect());
        for id in [a, b, c] {
            doc.add_layer(id).unwrap();
        }
        let sel = crate::selection::create(doc.tree_mut(), &[a, b, c]);

        doc.remove_layer(&b);
        assert_eq!(doc.tree().children(&sel), &[a, c]);
        assert!(!doc.tree().children(&doc.root()).contains(&b));
    }
}
