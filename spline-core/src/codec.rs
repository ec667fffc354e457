//! JSON document format
//!
//! Layers are stored as a tree of objects, each carrying a `"type"`
//! discriminator (`LayerGroup`, `SelectionGroup`, `RectLayer`, `OvalLayer`,
//! `TriangleLayer`) and, for groups, a `"layers"` array of children. The
//! current layer is stored next to the tree by reference: a single id string,
//! or an array of ids when a multi-layer selection was current.
//!
//! Decoding builds the whole tree first and then resolves the stored ids
//! against it. Ids that no longer resolve are dropped with a warning; a
//! missing or unknown discriminator fails the whole load.

use crate::color::Color;
use crate::document::Document;
use crate::geometry::Frame;
use crate::layer::{GroupData, Layer, LayerKind, ShapeData, ShapeKind};
use crate::layer_tree::{LayerTree, TreeError};
use crate::selection;
use kurbo::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

const TYPE: &str = "type";
const LAYERS: &str = "layers";
const LAYER_GROUP: &str = "LayerGroup";
const SELECTION_GROUP: &str = "SelectionGroup";
const RECT_LAYER: &str = "RectLayer";
const OVAL_LAYER: &str = "OvalLayer";
const TRIANGLE_LAYER: &str = "TriangleLayer";

/// A stored document that cannot be turned into a [`Document`]
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("layer is missing its \"type\" field")]
    MissingDiscriminator,

    #[error("unknown layer type {0:?}")]
    UnknownDiscriminator(String),

    #[error("document has no root layer")]
    MissingRoot,

    #[error("document root is not a group")]
    RootNotGroup,

    #[error("malformed layer tree: {0}")]
    Tree(#[from] TreeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredDocument {
    root: StoredLayer,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    current_layer: Option<StoredCurrent>,

    #[serde(default)]
    viewport_x: f64,

    #[serde(default)]
    viewport_y: f64,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum StoredCurrent {
    Single(String),
    Many(Vec<String>),
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type")]
enum StoredLayer {
    LayerGroup(StoredGroup),
    SelectionGroup(StoredGroup),
    RectLayer(StoredShape),
    OvalLayer(StoredShape),
    TriangleLayer(StoredShape),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredBase {
    id: Uuid,

    #[serde(default)]
    name: String,

    #[serde(default)]
    selected: bool,

    #[serde(default = "default_visible")]
    visible: bool,

    #[serde(default = "default_opacity")]
    opacity: u8,

    #[serde(default)]
    x: f64,

    #[serde(default)]
    y: f64,

    #[serde(default)]
    width: f64,

    #[serde(default)]
    height: f64,
}

fn default_visible() -> bool {
    true
}

fn default_opacity() -> u8 {
    100
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredGroup {
    #[serde(flatten)]
    base: StoredBase,

    #[serde(default)]
    twirled_down: bool,

    #[serde(default)]
    layers: Vec<StoredLayer>,
}

#[derive(Serialize, Deserialize)]
struct StoredShape {
    #[serde(flatten)]
    base: StoredBase,

    #[serde(default)]
    color: Color,
}

/// Serialize a document to pretty-printed JSON
///
/// The clipboard is not stored.
pub fn encode(document: &Document) -> Result<String, CodecError> {
    let tree = document.tree();
    let current_layer = document.current().and_then(|id| {
        let layer = tree.get(&id)?;
        Some(if layer.is_selection() {
            StoredCurrent::Many(layer.members().iter().map(Uuid::to_string).collect())
        } else {
            StoredCurrent::Single(id.to_string())
        })
    });

    let viewport = document.viewport();
    let stored = StoredDocument {
        root: store_layer(tree, tree.root_layer()),
        current_layer,
        viewport_x: viewport.x,
        viewport_y: viewport.y,
    };
    Ok(serde_json::to_string_pretty(&stored)?)
}

fn store_layer(tree: &LayerTree, layer: &Layer) -> StoredLayer {
    let frame = tree.bounds(&layer.id).unwrap_or(Frame::new(0.0, 0.0, 0.0, 0.0));
    let base = StoredBase {
        id: layer.id,
        name: layer.name.clone(),
        selected: layer.selected,
        visible: layer.visible,
        opacity: layer.opacity,
        x: frame.x,
        y: frame.y,
        width: frame.width,
        height: frame.height,
    };

    match &layer.kind {
        LayerKind::Group(g) => StoredLayer::LayerGroup(StoredGroup {
            base,
            twirled_down: g.expanded,
            layers: g
                .children
                .iter()
                .filter_map(|c| tree.get(c))
                .map(|c| store_layer(tree, c))
                .collect(),
        }),
        LayerKind::Selection(members) => StoredLayer::SelectionGroup(StoredGroup {
            base,
            twirled_down: false,
            layers: members
                .iter()
                .filter_map(|c| tree.get(c))
                .map(|c| store_layer(tree, c))
                .collect(),
        }),
        LayerKind::Shape(s) => {
            let shape = StoredShape {
                base,
                color: s.color.clone(),
            };
            match s.kind {
                ShapeKind::Rect => StoredLayer::RectLayer(shape),
                ShapeKind::Oval => StoredLayer::OvalLayer(shape),
                ShapeKind::Triangle => StoredLayer::TriangleLayer(shape),
            }
        }
    }
}

/// Parse a document from JSON
pub fn decode(json: &str) -> Result<Document, CodecError> {
    let value: Value = serde_json::from_str(json)?;
    let root = value.get("root").ok_or(CodecError::MissingRoot)?;
    check_discriminators(root)?;

    let stored: StoredDocument = serde_json::from_value(value)?;
    let root = match stored.root {
        StoredLayer::LayerGroup(g) | StoredLayer::SelectionGroup(g) => g,
        _ => return Err(CodecError::RootNotGroup),
    };

    let (mut root_layer, children) = group_layer(root);
    if let LayerKind::Group(g) = &mut root_layer.kind {
        g.expanded = true;
    }
    let mut tree = LayerTree::with_root(root_layer);
    let root_id = tree.root();
    for child in children {
        build(&mut tree, root_id, child)?;
    }

    let current = stored
        .current_layer
        .and_then(|c| resolve_current(&mut tree, c));

    let mut document = Document::from_tree(tree, Vec2::new(stored.viewport_x, stored.viewport_y));
    document.set_current(current);
    document.drain_changes();
    Ok(document)
}

/// Walk the raw tree and reject nodes whose type is missing or unknown
fn check_discriminators(node: &Value) -> Result<(), CodecError> {
    let tag = node
        .get(TYPE)
        .and_then(Value::as_str)
        .ok_or(CodecError::MissingDiscriminator)?;

    match tag {
        LAYER_GROUP | SELECTION_GROUP | RECT_LAYER | OVAL_LAYER | TRIANGLE_LAYER => {}
        other => return Err(CodecError::UnknownDiscriminator(other.to_string())),
    }

    if let Some(children) = node.get(LAYERS).and_then(Value::as_array) {
        for child in children {
            check_discriminators(child)?;
        }
    }
    Ok(())
}

fn base_layer(base: StoredBase, kind: LayerKind) -> Layer {
    let mut layer = Layer::group().with_id(base.id);
    layer.name = base.name;
    layer.selected = base.selected;
    layer.visible = base.visible;
    layer.opacity = base.opacity.min(100);
    layer.kind = kind;
    layer
}

fn group_layer(group: StoredGroup) -> (Layer, Vec<StoredLayer>) {
    let kind = LayerKind::Group(GroupData {
        children: Vec::new(),
        expanded: group.twirled_down,
    });
    (base_layer(group.base, kind), group.layers)
}

fn shape_layer(kind: ShapeKind, shape: StoredShape) -> Layer {
    let frame = Frame::new(
        shape.base.x,
        shape.base.y,
        shape.base.width,
        shape.base.height,
    );
    base_layer(
        shape.base,
        LayerKind::Shape(ShapeData {
            kind,
            frame,
            color: shape.color,
        }),
    )
}

fn build(tree: &mut LayerTree, parent: Uuid, stored: StoredLayer) -> Result<(), CodecError> {
    let (mut layer, children) = match stored {
        // Selections are never written inside the tree; treat strays as groups
        StoredLayer::LayerGroup(g) | StoredLayer::SelectionGroup(g) => group_layer(g),
        StoredLayer::RectLayer(s) => (shape_layer(ShapeKind::Rect, s), Vec::new()),
        StoredLayer::OvalLayer(s) => (shape_layer(ShapeKind::Oval, s), Vec::new()),
        StoredLayer::TriangleLayer(s) => (shape_layer(ShapeKind::Triangle, s), Vec::new()),
    };

    if tree.contains(&layer.id) {
        let fresh = Uuid::new_v4();
        log::warn!("duplicate layer id {} in document, using {fresh}", layer.id);
        layer.id = fresh;
    }

    let id = tree.insert(layer);
    tree.add_child(parent, id)?;
    for child in children {
        build(tree, id, child)?;
    }
    Ok(())
}

/// Turn stored ids back into a current layer
///
/// Ids that do not parse or are not in the tree are dropped. Two or more
/// survivors become a selection, one becomes the current layer by itself.
fn resolve_current(tree: &mut LayerTree, stored: StoredCurrent) -> Option<Uuid> {
    let raw = match stored {
        StoredCurrent::Single(id) => vec![id],
        StoredCurrent::Many(ids) => ids,
    };

    let mut resolved = Vec::new();
    for text in raw {
        match Uuid::parse_str(&text) {
            Ok(id) if tree.find(&id).is_some() => {
                if !resolved.contains(&id) {
                    resolved.push(id);
                }
            }
            Ok(id) => log::warn!("current layer {id} is not in the document, dropping it"),
            Err(e) => log::warn!("ignoring malformed current layer id {text:?}: {e}"),
        }
    }

    match resolved.as_slice() {
        [] => None,
        [only] => Some(*only),
        many => Some(selection::create(tree, many)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, Uuid, Uuid) {
        let mut doc = Document::new();
        let root = doc.root();
        let g = doc.tree_mut().insert(Layer::group());
        let r = doc.tree_mut().insert(Layer::shape(
            ShapeKind::Rect,
            "Rect 1",
            Frame::new(10.0, 20.0, 600.0, 300.0),
        ));
        let t = doc.tree_mut().insert(Layer::shape(
            ShapeKind::Triangle,
            "Triangle 1",
            Frame::new(-50.0, 0.0, 461.9, 400.0),
        ));
        doc.tree_mut().add_child(root, g).unwrap();
        doc.tree_mut().add_child(g, r).unwrap();
        doc.tree_mut().add_child(root, t).unwrap();
        (doc, r, t)
    }

    #[test]
    fn test_encoded_shape_uses_type_tags() {
        let (doc, _, _) = sample();
        let json = encode(&doc).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["root"]["type"], "LayerGroup");
        assert_eq!(value["root"]["layers"][0]["type"], "LayerGroup");
        assert_eq!(value["root"]["layers"][0]["layers"][0]["type"], "RectLayer");
        assert_eq!(value["root"]["layers"][1]["type"], "TriangleLayer");
        assert_eq!(value["viewportX"], 30.0);
        assert!(value.get("currentLayer").is_none());
    }

    #[test]
    fn test_single_current_is_id_string() {
        let (mut doc, r, _) = sample();
        doc.set_current(Some(r));
        let value: Value = serde_json::from_str(&encode(&doc).unwrap()).unwrap();
        assert_eq!(value["currentLayer"], r.to_string());

        let back = decode(&encode(&doc).unwrap()).unwrap();
        assert_eq!(back.current(), Some(r));
        assert!(back.tree().get(&r).unwrap().selected);
    }

    #[test]
    fn test_selection_current_is_id_array() {
        let (mut doc, r, t) = sample();
        let sel = selection::create(doc.tree_mut(), &[t, r]);
        doc.set_current(Some(sel));

        let json = encode(&doc).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value["currentLayer"],
            serde_json::json!([t.to_string(), r.to_string()])
        );

        let back = decode(&json).unwrap();
        let current = back.current().unwrap();
        assert!(back.current_is_selection());
        assert_eq!(back.tree().children(&current), &[t, r]);
    }

    #[test]
    fn test_missing_discriminator_fails() {
        let json = r#"{"root": {"id": "6f1c3a52-7f0c-4a43-9c55-2f6f5e0b8a11", "layers": []}}"#;
        assert!(matches!(decode(json), Err(CodecError::MissingDiscriminator)));
    }

    #[test]
    fn test_unknown_discriminator_fails() {
        let json = r#"{"root": {"type": "LayerGroup", "id": "6f1c3a52-7f0c-4a43-9c55-2f6f5e0b8a11",
            "layers": [{"type": "StarLayer", "id": "0b4c2a0e-16d3-4b55-8d7e-1f0a3e9c7b22"}]}}"#;
        match decode(json) {
            Err(CodecError::UnknownDiscriminator(t)) => assert_eq!(t, "StarLayer"),
            other => panic!("unexpected result: {:?}", other.map(|d| d.root())),
        }
    }

    #[test]
    fn test_root_must_be_group() {
        let json = r#"{"root": {"type": "RectLayer", "id": "6f1c3a52-7f0c-4a43-9c55-2f6f5e0b8a11"}}"#;
        assert!(matches!(decode(json), Err(CodecError::RootNotGroup)));
        assert!(matches!(decode("{}"), Err(CodecError::MissingRoot)));
        assert!(matches!(decode("not json"), Err(CodecError::Json(_))));
    }

    #[test]
    fn test_unresolved_ids_are_dropped() {
        let (mut doc, r, _) = sample();
        doc.set_current(Some(r));
        let mut value: Value = serde_json::from_str(&encode(&doc).unwrap()).unwrap();
        value["currentLayer"] = Value::String(Uuid::new_v4().to_string());

        let back = decode(&value.to_string()).unwrap();
        assert_eq!(back.current(), None);
        assert!(back.tree().find(&r).is_some());
    }

    #[test]
    fn test_partially_resolved_selection_collapses() {
        let (doc, r, _) = sample();
        let mut value: Value = serde_json::from_str(&encode(&doc).unwrap()).unwrap();
        value["currentLayer"] =
            serde_json::json!([r.to_string(), Uuid::new_v4().to_string(), "not-an-id"]);

        let back = decode(&value.to_string()).unwrap();
        assert_eq!(back.current(), Some(r));
        assert!(!back.current_is_selection());
    }

    #[test]
    fn test_nested_selection_group_decodes_as_group() {
        let json = r#"{"root": {"type": "LayerGroup", "id": "6f1c3a52-7f0c-4a43-9c55-2f6f5e0b8a11",
            "layers": [{"type": "SelectionGroup", "id": "0b4c2a0e-16d3-4b55-8d7e-1f0a3e9c7b22",
                        "name": "Group", "layers": []}]}}"#;
        let doc = decode(json).unwrap();
        let child = doc.tree().children(&doc.root())[0];
        assert!(doc.tree().get(&child).unwrap().is_group());
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let json = r#"{"root": {"type": "LayerGroup", "id": "6f1c3a52-7f0c-4a43-9c55-2f6f5e0b8a11",
            "layers": [{"type": "OvalLayer", "id": "0b4c2a0e-16d3-4b55-8d7e-1f0a3e9c7b22"}]}}"#;
        let doc = decode(json).unwrap();
        let child = doc.tree().children(&doc.root())[0];
        let layer = doc.tree().get(&child).unwrap();
        assert!(layer.visible);
        assert_eq!(layer.opacity, 100);
        assert_eq!(layer.color().map(|c| c.color()), Some(0xFFC6_DAFC));
        assert_eq!(doc.viewport(), Vec2::ZERO);
    }

    #[test]
    fn test_partial_color_loads() {
        let json = r#"{"root": {"type": "LayerGroup", "id": "6f1c3a52-7f0c-4a43-9c55-2f6f5e0b8a11",
            "layers": [{"type": "RectLayer", "id": "0b4c2a0e-16d3-4b55-8d7e-1f0a3e9c7b22",
                        "color": {"color": 4278255360}}]}}"#;
        let doc = decode(json).unwrap();
        let child = doc.tree().children(&doc.root())[0];
        let color = doc.tree().get(&child).unwrap().color().unwrap();
        assert_eq!(color.color(), 0xFF00_FF00);
        assert_eq!((color.red(), color.green(), color.blue()), (0, 255, 0));
    }
}
