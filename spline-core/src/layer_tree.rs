//! Layer arena
//!
//! The [`LayerTree`] owns every layer of a document by id. Groups list their
//! children by id and children point back at their group through a
//! non-owning `parent` id. Selections and detached subtrees (the clipboard,
//! fresh copies) live in the same arena without a parent.
//!
//! Group geometry is never stored. It is derived on request as the union of
//! the children's boxes, and writing it moves or rescales the children.

use crate::change::{Change, ChangeLog, Property};
use crate::color::Color;
use crate::geometry::{ControlPoint, Frame};
use crate::layer::{GroupData, Layer, LayerKind, GROUP_NAME};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

/// Opacity of layer-list rows for hidden layers
pub const HIDDEN_ROW_ALPHA: f32 = 0.33;

/// Structural edit that the tree refused
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("no layer with id {0}")]
    UnknownLayer(Uuid),

    #[error("layer {0} is not a group")]
    NotAGroup(Uuid),

    #[error("layer {0} cannot be placed inside its own subtree")]
    Cycle(Uuid),
}

/// One row of the editable layer list
#[derive(Clone, Debug, PartialEq)]
pub struct LayerRow {
    pub id: Uuid,
    pub name: String,
    pub is_group: bool,
    pub expanded: bool,
    /// Groups between the layer and the root, not counting the root
    pub depth: usize,
    /// Depth plus one for leaves, so they line up under their group's label
    pub indent: usize,
    pub selected: bool,
    pub visible: bool,
    pub ancestors_visible: bool,
    /// 1.0 for drawn layers, dimmed when the layer or an ancestor is hidden
    pub alpha: f32,
}

/// Arena of every layer in a document
#[derive(Clone, Debug)]
pub struct LayerTree {
    nodes: HashMap<Uuid, Layer>,
    root: Uuid,
    changes: ChangeLog,
}

impl Default for LayerTree {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerTree {
    /// Create a tree holding only an expanded, empty root group
    pub fn new() -> Self {
        let mut root = Layer::group();
        if let LayerKind::Group(g) = &mut root.kind {
            g.expanded = true;
        }
        Self::with_root(root)
    }

    /// Create a tree around an existing root layer
    pub(crate) fn with_root(root: Layer) -> Self {
        let id = root.id;
        let mut nodes = HashMap::new();
        nodes.insert(id, root);
        Self {
            nodes,
            root: id,
            changes: ChangeLog::new(),
        }
    }

    pub fn root(&self) -> Uuid {
        self.root
    }

    pub fn root_layer(&self) -> &Layer {
        // The root is inserted on construction and can never be purged
        &self.nodes[&self.root]
    }

    /// Any layer in the arena, attached or not
    pub fn get(&self, id: &Uuid) -> Option<&Layer> {
        self.nodes.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &Uuid) -> Option<&mut Layer> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of layers in the arena, including detached ones
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn changes(&self) -> &ChangeLog {
        &self.changes
    }

    pub(crate) fn changes_mut(&mut self) -> &mut ChangeLog {
        &mut self.changes
    }

    /// Take every change recorded since the last drain
    pub fn drain_changes(&mut self) -> Vec<Change> {
        self.changes.drain()
    }

    // === STRUCTURE ===

    /// Put a layer into the arena without a parent
    pub fn insert(&mut self, mut layer: Layer) -> Uuid {
        let id = layer.id;
        layer.parent = None;
        self.nodes.insert(id, layer);
        id
    }

    pub fn parent(&self, id: &Uuid) -> Option<Uuid> {
        self.nodes.get(id).and_then(|l| l.parent)
    }

    /// Children of a group or members of a selection
    pub fn children(&self, id: &Uuid) -> &[Uuid] {
        self.nodes.get(id).map(|l| l.members()).unwrap_or(&[])
    }

    /// Position of a layer within its parent's children
    pub fn index_in_parent(&self, id: &Uuid) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(&parent).iter().position(|c| c == id)
    }

    /// Every layer below `id`, in pre-order
    pub fn descendants(&self, id: &Uuid) -> Vec<Uuid> {
        let mut out = Vec::new();
        let mut stack: Vec<Uuid> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            if self.nodes.get(&next).is_some_and(|l| l.is_group()) {
                stack.extend(self.children(&next).iter().rev().copied());
            }
        }
        out
    }

    /// True if `ancestor` is `id` or one of its parents
    pub fn is_ancestor_or_self(&self, ancestor: &Uuid, id: &Uuid) -> bool {
        let mut cursor = Some(*id);
        while let Some(c) = cursor {
            if c == *ancestor {
                return true;
            }
            cursor = self.parent(&c);
        }
        false
    }

    /// Look a layer up by id among the root and its descendants
    pub fn find(&self, id: &Uuid) -> Option<&Layer> {
        if self.is_ancestor_or_self(&self.root, id) {
            self.nodes.get(id)
        } else {
            None
        }
    }

    /// Append `child` to `group`, detaching it from any previous parent
    ///
    /// The parent link is set before the child id is pushed onto the group.
    pub fn add_child(&mut self, group: Uuid, child: Uuid) -> Result<(), TreeError> {
        match self.nodes.get(&group) {
            None => return Err(TreeError::UnknownLayer(group)),
            Some(l) if !l.is_group() => return Err(TreeError::NotAGroup(group)),
            Some(_) => {}
        }
        if !self.nodes.contains_key(&child) {
            return Err(TreeError::UnknownLayer(child));
        }
        if self.is_ancestor_or_self(&child, &group) {
            return Err(TreeError::Cycle(child));
        }

        self.detach(&child);

        if let Some(c) = self.nodes.get_mut(&child) {
            c.parent = Some(group);
        }
        if let Some(children) = self.nodes.get_mut(&group).and_then(|g| g.members_mut()) {
            children.push(child);
        }
        self.changes.structure(group);
        Ok(())
    }

    /// Remove `child` from `group`, keeping it (and its subtree) in the arena
    ///
    /// The child also leaves every selection that listed it.
    pub fn remove_child(&mut self, group: Uuid, child: Uuid) -> Result<(), TreeError> {
        self.unparent(group, child)?;
        self.unlink_from_selections(&child);
        Ok(())
    }

    fn unparent(&mut self, group: Uuid, child: Uuid) -> Result<(), TreeError> {
        let children = self
            .nodes
            .get_mut(&group)
            .ok_or(TreeError::UnknownLayer(group))?;
        let LayerKind::Group(g) = &mut children.kind else {
            return Err(TreeError::NotAGroup(group));
        };
        let before = g.children.len();
        g.children.retain(|c| *c != child);
        if g.children.len() == before {
            return Err(TreeError::UnknownLayer(child));
        }

        if let Some(c) = self.nodes.get_mut(&child) {
            c.parent = None;
        }
        self.changes.structure(group);
        Ok(())
    }

    /// Take a layer out of its parent group, if it has one. Selections that
    /// list it are left alone.
    pub fn detach(&mut self, id: &Uuid) -> bool {
        match self.parent(id) {
            Some(parent) => self.unparent(parent, *id).is_ok(),
            None => false,
        }
    }

    /// Drop a layer and its whole subtree from the arena
    pub fn purge(&mut self, id: &Uuid) {
        if *id == self.root {
            log::warn!("refusing to purge the root group");
            return;
        }
        self.detach(id);
        // Selections only reference their members, so purging one stops here
        let subtree = match self.nodes.get(id) {
            Some(l) if l.is_group() => self.descendants(id),
            _ => Vec::new(),
        };
        for gone in subtree.iter().chain(std::iter::once(id)) {
            self.unlink_from_selections(gone);
            self.nodes.remove(gone);
        }
    }

    /// Remove a layer from every selection that lists it
    fn unlink_from_selections(&mut self, id: &Uuid) {
        let mut touched = Vec::new();
        for layer in self.nodes.values_mut() {
            if let LayerKind::Selection(members) = &mut layer.kind {
                let before = members.len();
                members.retain(|m| m != id);
                if members.len() != before {
                    touched.push(layer.id);
                }
            }
        }
        for selection in touched {
            self.changes.structure(selection);
        }
    }

    /// Deep copy of a layer, inserted detached. Returns the copy's id.
    ///
    /// Copies get fresh ids. Descendants of a copied group are unselected.
    /// Copying a selection yields a group holding copies of its members.
    pub fn copy(&mut self, id: &Uuid) -> Option<Uuid> {
        let source = self.nodes.get(id)?.clone();

        let mut copy = source.clone();
        copy.id = Uuid::new_v4();
        copy.parent = None;
        copy.gesture = None;

        let members: Vec<Uuid> = source.members().to_vec();
        if copy.is_selection() {
            copy.name = GROUP_NAME.to_string();
            copy.kind = LayerKind::Group(GroupData::default());
        } else if let LayerKind::Group(g) = &mut copy.kind {
            g.children.clear();
        }

        let copy_id = self.insert(copy);
        for member in members {
            if let Some(child) = self.copy(&member) {
                if let Some(c) = self.nodes.get_mut(&child) {
                    c.selected = false;
                    c.parent = Some(copy_id);
                }
                if let Some(children) = self.nodes.get_mut(&copy_id).and_then(|l| l.members_mut())
                {
                    children.push(child);
                }
            }
        }
        Some(copy_id)
    }

    // === DERIVED PROPERTIES ===

    /// Number of groups between a layer and the root, not counting the root
    pub fn depth(&self, id: &Uuid) -> usize {
        let mut depth: usize = 0;
        let mut cursor = self.parent(id);
        while let Some(p) = cursor {
            depth += 1;
            cursor = self.parent(&p);
        }
        depth.saturating_sub(1)
    }

    /// True if every ancestor group is expanded
    pub fn is_visible_in_list(&self, id: &Uuid) -> bool {
        let mut cursor = self.parent(id);
        while let Some(p) = cursor {
            let expanded = self
                .nodes
                .get(&p)
                .and_then(|l| l.as_group())
                .is_some_and(|g| g.expanded);
            if !expanded {
                return false;
            }
            cursor = self.parent(&p);
        }
        true
    }

    /// True if every ancestor's own visibility flag is set
    pub fn ancestors_visible(&self, id: &Uuid) -> bool {
        let mut cursor = self.parent(id);
        while let Some(p) = cursor {
            if !self.nodes.get(&p).is_some_and(|l| l.visible) {
                return false;
            }
            cursor = self.parent(&p);
        }
        true
    }

    /// Opacity multiplied through every ancestor, in percent
    pub fn compound_opacity(&self, id: &Uuid) -> f64 {
        let Some(layer) = self.nodes.get(id) else {
            return 0.0;
        };
        let own = f64::from(layer.opacity);
        match layer.parent {
            Some(p) => own * self.compound_opacity(&p) / 100.0,
            None => own,
        }
    }

    /// The editable layer list: pre-order, collapsed groups hide their children
    pub fn layer_list(&self) -> Vec<LayerRow> {
        let mut rows = Vec::new();
        self.push_rows(&self.root, &mut rows);
        rows
    }

    fn push_rows(&self, group: &Uuid, rows: &mut Vec<LayerRow>) {
        for child in self.children(group) {
            let Some(layer) = self.nodes.get(child) else {
                continue;
            };
            let depth = self.depth(child);
            let ancestors_visible = self.ancestors_visible(child);
            let expanded = layer.as_group().is_some_and(|g| g.expanded);
            rows.push(LayerRow {
                id: *child,
                name: layer.name.clone(),
                is_group: layer.is_group(),
                expanded,
                depth,
                indent: depth + usize::from(!layer.is_group()),
                selected: layer.selected,
                visible: layer.visible,
                ancestors_visible,
                alpha: if layer.visible && ancestors_visible {
                    1.0
                } else {
                    HIDDEN_ROW_ALPHA
                },
            });
            if expanded {
                self.push_rows(child, rows);
            }
        }
    }

    // === PROPERTIES ===

    pub fn set_name(&mut self, id: &Uuid, name: impl Into<String>) {
        if let Some(layer) = self.nodes.get_mut(id) {
            layer.name = name.into();
            self.changes.property(*id, Property::Name);
        }
    }

    pub fn set_visible(&mut self, id: &Uuid, visible: bool) {
        if let Some(layer) = self.nodes.get_mut(id) {
            if layer.visible != visible {
                layer.visible = visible;
                self.changes.property(*id, Property::Visible);
            }
        }
    }

    /// Set opacity in percent, clamped to 100
    pub fn set_opacity(&mut self, id: &Uuid, opacity: u8) {
        if let Some(layer) = self.nodes.get_mut(id) {
            layer.opacity = opacity.min(100);
            self.changes.property(*id, Property::Opacity);
        }
    }

    pub fn set_selected(&mut self, id: &Uuid, selected: bool) {
        if let Some(layer) = self.nodes.get_mut(id) {
            if layer.selected != selected {
                layer.selected = selected;
                self.changes.property(*id, Property::Selected);
            }
        }
    }

    pub fn set_expanded(&mut self, id: &Uuid, expanded: bool) {
        if let Some(LayerKind::Group(g)) = self.nodes.get_mut(id).map(|l| &mut l.kind) {
            if g.expanded != expanded {
                g.expanded = expanded;
                self.changes.property(*id, Property::Expanded);
            }
        }
    }

    /// Flip a group's expanded flag. The root always stays expanded.
    pub fn toggle_expanded(&mut self, id: &Uuid) {
        if *id == self.root {
            return;
        }
        if let Some(expanded) = self.get(id).and_then(|l| l.as_group()).map(|g| g.expanded) {
            self.set_expanded(id, !expanded);
        }
    }

    pub fn open_expanded(&mut self, id: &Uuid) {
        self.set_expanded(id, true);
    }

    /// Apply an edit to a shape's colour. Returns `None` for non-shapes.
    pub fn edit_color<R>(&mut self, id: &Uuid, edit: impl FnOnce(&mut Color) -> R) -> Option<R> {
        let shape = self.nodes.get_mut(id)?.as_shape_mut()?;
        let result = edit(&mut shape.color);
        self.changes.property(*id, Property::Color);
        Some(result)
    }

    // === GEOMETRY ===

    /// Bounding box of a layer
    ///
    /// Shapes report their stored frame. Groups and selections report the
    /// union of their members' boxes, or `None` while they have no members.
    pub fn bounds(&self, id: &Uuid) -> Option<Frame> {
        let layer = self.nodes.get(id)?;
        match &layer.kind {
            LayerKind::Shape(s) => Some(s.frame),
            LayerKind::Group(_) | LayerKind::Selection(_) => layer
                .members()
                .iter()
                .filter_map(|m| self.bounds(m))
                .reduce(|acc, f| acc.union(&f)),
        }
    }

    pub fn set_x(&mut self, id: &Uuid, x: f64) {
        self.move_axis(id, x, Axis::X);
    }

    pub fn set_y(&mut self, id: &Uuid, y: f64) {
        self.move_axis(id, y, Axis::Y);
    }

    pub fn set_width(&mut self, id: &Uuid, width: f64) {
        self.scale_axis(id, width, Axis::X);
    }

    pub fn set_height(&mut self, id: &Uuid, height: f64) {
        self.scale_axis(id, height, Axis::Y);
    }

    fn move_axis(&mut self, id: &Uuid, value: f64, axis: Axis) {
        let Some(layer) = self.nodes.get_mut(id) else {
            return;
        };
        if let Some(shape) = layer.as_shape_mut() {
            *axis.origin_mut(&mut shape.frame) = value;
            self.changes.property(*id, Property::Geometry);
            return;
        }

        let Some(bounds) = self.bounds(id) else {
            return;
        };
        let delta = value - axis.origin(&bounds);
        if delta == 0.0 {
            return;
        }
        for member in self.children(id).to_vec() {
            if let Some(b) = self.bounds(&member) {
                self.move_axis(&member, axis.origin(&b) + delta, axis);
            }
        }
        self.changes.property(*id, Property::Geometry);
    }

    /// Resize along one axis. Groups rescale their members relative to the
    /// geometry captured by [`start_resize`](Self::start_resize) and do
    /// nothing without it.
    fn scale_axis(&mut self, id: &Uuid, value: f64, axis: Axis) {
        let Some(layer) = self.nodes.get_mut(id) else {
            return;
        };
        let gesture = layer.gesture;
        if let Some(shape) = layer.as_shape_mut() {
            *axis.extent_mut(&mut shape.frame) = value;
            self.changes.property(*id, Property::Geometry);
            return;
        }

        let (Some(start), Some(bounds)) = (gesture, self.bounds(id)) else {
            return;
        };
        let start_extent = axis.extent(&start);
        if start_extent == 0.0 || value == axis.extent(&bounds) {
            return;
        }

        let scale = value / start_extent;
        let origin = axis.origin(&bounds);
        for member in self.children(id).to_vec() {
            let member_start = self
                .nodes
                .get(&member)
                .and_then(|l| l.gesture)
                .or_else(|| self.bounds(&member));
            let Some(ms) = member_start else {
                continue;
            };
            self.scale_axis(&member, axis.extent(&ms) * scale, axis);
            self.move_axis(
                &member,
                origin + (axis.origin(&ms) - axis.origin(&start)) * scale,
                axis,
            );
        }
        self.changes.property(*id, Property::Geometry);
    }

    /// Set position and size in one resize gesture, so groups rescale
    pub fn set_frame(&mut self, id: &Uuid, frame: Frame) {
        self.start_resize(id);
        self.set_x(id, frame.x);
        self.set_y(id, frame.y);
        self.set_width(id, frame.width);
        self.set_height(id, frame.height);
        self.end_resize(id);
    }

    /// Record the current geometry of a layer and everything below it
    pub fn start_resize(&mut self, id: &Uuid) {
        let bounds = self.bounds(id);
        if let Some(layer) = self.nodes.get_mut(id) {
            layer.gesture = bounds;
        }
        for member in self.children(id).to_vec() {
            self.start_resize(&member);
        }
    }

    /// Clear the snapshot taken by [`start_resize`](Self::start_resize)
    pub fn end_resize(&mut self, id: &Uuid) {
        if let Some(layer) = self.nodes.get_mut(id) {
            layer.gesture = None;
        }
        for member in self.children(id).to_vec() {
            self.end_resize(&member);
        }
    }

    /// Drag a control point by `(dx, dy)`
    ///
    /// Left and top handles move the origin and shrink the size by the same
    /// amount; right and bottom handles only change the size. Corners apply
    /// both of their axis rules.
    pub fn resize(&mut self, id: &Uuid, point: ControlPoint, dx: f64, dy: f64) {
        if point.is_left() {
            if let Some(b) = self.bounds(id) {
                self.set_x(id, b.x + dx);
            }
            if let Some(b) = self.bounds(id) {
                self.set_width(id, b.width - dx);
            }
        }
        if point.is_top() {
            if let Some(b) = self.bounds(id) {
                self.set_y(id, b.y + dy);
            }
            if let Some(b) = self.bounds(id) {
                self.set_height(id, b.height - dy);
            }
        }
        if point.is_right() {
            if let Some(b) = self.bounds(id) {
                self.set_width(id, b.width + dx);
            }
        }
        if point.is_bottom() {
            if let Some(b) = self.bounds(id) {
                self.set_height(id, b.height + dy);
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Axis {
    X,
    Y,
}

impl Axis {
    fn origin(self, f: &Frame) -> f64 {
        match self {
            Axis::X => f.x,
            Axis::Y => f.y,
        }
    }

    fn extent(self, f: &Frame) -> f64 {
        match self {
            Axis::X => f.width,
            Axis::Y => f.height,
        }
    }

    fn origin_mut(self, f: &mut Frame) -> &mut f64 {
        match self {
            Axis::X => &mut f.x,
            Axis::Y => &mut f.y,
        }
    }

    fn extent_mut(self, f: &mut Frame) -> &mut f64 {
        match self {
            Axis::X => &mut f.width,
            Axis::Y => &mut f.height,
        }
    }
}
