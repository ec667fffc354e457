//! Layer types for Spline documents
//!
//! Layers live in the [`LayerTree`](crate::layer_tree::LayerTree) arena and
//! refer to each other by id. A layer is one of three kinds: a group that owns
//! an ordered list of children, a selection that references layers owned
//! elsewhere, or a shape leaf.

use crate::color::Color;
use crate::geometry::{
    Frame, OvalGeometry, RectGeometry, ShapeGeometry, TriangleGeometry,
};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name given to every new group
pub const GROUP_NAME: &str = "Group";

/// Name given to transient multi-layer selections
pub const SELECTION_NAME: &str = "Selection";

/// Opacity of a freshly created layer, in percent
pub const FULL_OPACITY: u8 = 100;

/// Concrete shape drawn by a shape layer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Rect,
    Oval,
    Triangle,
}

impl ShapeKind {
    /// Exact-geometry implementation for this kind
    pub fn geometry(self) -> &'static dyn ShapeGeometry {
        match self {
            ShapeKind::Rect => &RectGeometry,
            ShapeKind::Oval => &OvalGeometry,
            ShapeKind::Triangle => &TriangleGeometry,
        }
    }

    /// Human-readable label, used for default layer names
    pub fn label(self) -> &'static str {
        match self {
            ShapeKind::Rect => "Rect",
            ShapeKind::Oval => "Oval",
            ShapeKind::Triangle => "Triangle",
        }
    }

    pub fn contains(self, frame: &Frame, point: Point) -> bool {
        self.geometry().contains(frame, point)
    }
}

/// Shape leaf data
#[derive(Clone, Debug, PartialEq)]
pub struct ShapeData {
    pub kind: ShapeKind,

    /// Stored geometry (groups derive theirs from children)
    pub frame: Frame,

    pub color: Color,
}

/// Group data
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GroupData {
    /// Child ids, bottom of the stacking order first
    pub children: Vec<Uuid>,

    /// Whether the children are listed in the layer list
    pub expanded: bool,
}

/// What a layer is
#[derive(Clone, Debug, PartialEq)]
pub enum LayerKind {
    /// Owns its children
    Group(GroupData),

    /// References layers owned by groups elsewhere, in the order they were
    /// selected
    Selection(Vec<Uuid>),

    Shape(ShapeData),
}

/// A node in the layer arena
#[derive(Clone, Debug)]
pub struct Layer {
    /// Unique identifier
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Whether the layer itself is drawn
    pub visible: bool,

    /// Opacity in percent (0-100)
    pub opacity: u8,

    /// Whether the layer is part of the current selection
    pub selected: bool,

    /// Owning group. Never set for selections or detached layers.
    pub(crate) parent: Option<Uuid>,

    /// Geometry captured when a resize gesture started
    pub(crate) gesture: Option<Frame>,

    pub kind: LayerKind,
}

impl Layer {
    fn with_kind(name: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            visible: true,
            opacity: FULL_OPACITY,
            selected: false,
            parent: None,
            gesture: None,
            kind,
        }
    }

    /// Create an empty, collapsed group
    pub fn group() -> Self {
        Self::with_kind(GROUP_NAME, LayerKind::Group(GroupData::default()))
    }

    /// Create an empty selection
    pub fn selection() -> Self {
        Self::with_kind(SELECTION_NAME, LayerKind::Selection(Vec::new()))
    }

    /// Create a shape with the default colour
    pub fn shape(kind: ShapeKind, name: impl Into<String>, frame: Frame) -> Self {
        Self::with_kind(
            name,
            LayerKind::Shape(ShapeData {
                kind,
                frame,
                color: Color::default(),
            }),
        )
    }

    /// Replace the generated id (used when decoding stored documents)
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn parent(&self) -> Option<Uuid> {
        self.parent
    }

    pub fn gesture(&self) -> Option<Frame> {
        self.gesture
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, LayerKind::Group(_))
    }

    pub fn is_selection(&self) -> bool {
        matches!(self.kind, LayerKind::Selection(_))
    }

    pub fn as_group(&self) -> Option<&GroupData> {
        match &self.kind {
            LayerKind::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_shape(&self) -> Option<&ShapeData> {
        match &self.kind {
            LayerKind::Shape(s) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn as_shape_mut(&mut self) -> Option<&mut ShapeData> {
        match &mut self.kind {
            LayerKind::Shape(s) => Some(s),
            _ => None,
        }
    }

    /// Ids this layer lists: a group's children or a selection's members
    pub fn members(&self) -> &[Uuid] {
        match &self.kind {
            LayerKind::Group(g) => &g.children,
            LayerKind::Selection(m) => m,
            LayerKind::Shape(_) => &[],
        }
    }

    pub(crate) fn members_mut(&mut self) -> Option<&mut Vec<Uuid>> {
        match &mut self.kind {
            LayerKind::Group(g) => Some(&mut g.children),
            LayerKind::Selection(m) => Some(m),
            LayerKind::Shape(_) => None,
        }
    }

    pub fn shape_kind(&self) -> Option<ShapeKind> {
        self.as_shape().map(|s| s.kind)
    }

    pub fn color(&self) -> Option<&Color> {
        self.as_shape().map(|s| &s.color)
    }
}
