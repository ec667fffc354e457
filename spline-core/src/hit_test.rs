//! Hit testing for selection and interaction
//!
//! Box tests work on any layer through the tree's derived bounds; exact tests
//! dispatch to the shape's [`ShapeGeometry`](crate::geometry::ShapeGeometry).

use crate::layer::LayerKind;
use crate::layer_tree::LayerTree;
use kurbo::Point;
use uuid::Uuid;

/// Box test for a layer
///
/// Groups and selections without members never report a hit.
pub fn in_bounds(tree: &LayerTree, id: &Uuid, point: Point) -> bool {
    in_inset_bounds(tree, id, point, 0.0)
}

/// Box test against the layer's bounds shrunk by `inset` on every side
pub fn in_inset_bounds(tree: &LayerTree, id: &Uuid, point: Point, inset: f64) -> bool {
    tree.bounds(id)
        .is_some_and(|frame| frame.contains_inset(point, inset))
}

/// Exact-geometry test
///
/// Shapes use their own geometry (a triangle also requires the box test).
/// Other layers fall back to [`in_bounds`].
pub fn in_shape_bounds(tree: &LayerTree, id: &Uuid, point: Point) -> bool {
    match tree.get(id).map(|l| &l.kind) {
        Some(LayerKind::Shape(shape)) => shape.kind.contains(&shape.frame, point),
        Some(_) => in_bounds(tree, id, point),
        None => false,
    }
}

/// Group a hit test should start from, given the current layer
///
/// # Arguments
///
/// * `tree` - The document's layer arena
/// * `current` - The current layer, if any
///
/// # Returns
///
/// For a selection, the parent of its most recently added member; for a
/// group, the group itself; for any other layer, its parent. Falls back to
/// the root.
pub fn hit_scope(tree: &LayerTree, current: Option<&Uuid>) -> Uuid {
    let Some(current) = current.and_then(|id| tree.get(id)) else {
        return tree.root();
    };
    let scope = match &current.kind {
        LayerKind::Selection(members) => members.last().and_then(|m| tree.parent(m)),
        LayerKind::Group(_) => Some(current.id),
        LayerKind::Shape(_) => current.parent(),
    };
    scope.unwrap_or_else(|| tree.root())
}

/// Topmost visible layer under `point`
///
/// Scans `scope`'s children from the top of the stacking order down, skipping
/// `skip` and hidden layers. Shapes must contain the point exactly; groups
/// only need a box hit. When nothing in `scope` matches, the search retries in
/// the scope's parent until the root has been tried.
///
/// # Arguments
///
/// * `tree` - The document's layer arena
/// * `point` - The point to test in document space
/// * `scope` - Group to search first
/// * `skip` - Layer to ignore (the current layer)
///
/// # Returns
///
/// The id of the layer hit, or None
pub fn top_layer_hit(
    tree: &LayerTree,
    point: Point,
    scope: Uuid,
    skip: Option<&Uuid>,
) -> Option<Uuid> {
    let mut scope = Some(scope);
    while let Some(group) = scope {
        for child in tree.children(&group).iter().rev() {
            if Some(child) == skip {
                continue;
            }
            let Some(layer) = tree.get(child) else {
                continue;
            };
            if !layer.visible || !in_bounds(tree, child, point) {
                continue;
            }
            if let LayerKind::Shape(shape) = &layer.kind {
                if !shape.kind.contains(&shape.frame, point) {
                    continue;
                }
            }
            return Some(*child);
        }
        scope = tree.parent(&group);
    }
    None
}

/// True if `a` is drawn above `b` within the same parent group
pub fn is_stacked_above(tree: &LayerTree, a: &Uuid, b: &Uuid) -> bool {
    if tree.parent(a).is_none() || tree.parent(a) != tree.parent(b) {
        return false;
    }
    match (tree.index_in_parent(a), tree.index_in_parent(b)) {
        (Some(ia), Some(ib)) => ia > ib,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Frame;
    use crate::layer::{Layer, ShapeKind};

    fn add(tree: &mut LayerTree, parent: Uuid, kind: ShapeKind, frame: Frame) -> Uuid {
        let id = tree.insert(Layer::shape(kind, kind.label(), frame));
        tree.add_child(parent, id).unwrap();
        id
    }

    #[test]
    fn test_empty_group_never_hit() {
        let mut tree = LayerTree::new();
        let root = tree.root();
        let g = tree.insert(Layer::group());
        tree.add_child(root, g).unwrap();

        assert!(!in_bounds(&tree, &g, Point::new(0.0, 0.0)));
        assert_eq!(top_layer_hit(&tree, Point::new(0.0, 0.0), root, None), None);
    }

    #[test]
    fn test_topmost_wins() {
        let mut tree = LayerTree::new();
        let root = tree.root();
        let bottom = add(&mut tree, root, ShapeKind::Rect, Frame::new(0.0, 0.0, 100.0, 100.0));
        let top = add(&mut tree, root, ShapeKind::Rect, Frame::new(50.0, 50.0, 100.0, 100.0));

        assert_eq!(top_layer_hit(&tree, Point::new(75.0, 75.0), root, None), Some(top));
        assert_eq!(top_layer_hit(&tree, Point::new(25.0, 25.0), root, None), Some(bottom));
        // Skipping the top layer exposes the one below
        assert_eq!(
            top_layer_hit(&tree, Point::new(75.0, 75.0), root, Some(&top)),
            Some(bottom)
        );
    }

    #[test]
    fn test_shapes_need_exact_hit() {
        let mut tree = LayerTree::new();
        let root = tree.root();
        let rect = add(&mut tree, root, ShapeKind::Rect, Frame::new(0.0, 0.0, 100.0, 100.0));
        let _oval = add(&mut tree, root, ShapeKind::Oval, Frame::new(0.0, 0.0, 100.0, 100.0));

        // Corner of the oval's box falls through to the rect below
        assert_eq!(top_layer_hit(&tree, Point::new(2.0, 2.0), root, None), Some(rect));
    }

    #[test]
    fn test_hidden_layers_are_skipped() {
        let mut tree = LayerTree::new();
        let root = tree.root();
        let r = add(&mut tree, root, ShapeKind::Rect, Frame::new(0.0, 0.0, 10.0, 10.0));
        tree.set_visible(&r, false);
        assert_eq!(top_layer_hit(&tree, Point::new(5.0, 5.0), root, None), None);
    }

    #[test]
    fn test_hit_bubbles_to_parent_scope() {
        let mut tree = LayerTree::new();
        let root = tree.root();
        let g = tree.insert(Layer::group());
        tree.add_child(root, g).unwrap();
        let inner = add(&mut tree, g, ShapeKind::Rect, Frame::new(0.0, 0.0, 10.0, 10.0));
        let outer = add(&mut tree, root, ShapeKind::Rect, Frame::new(100.0, 0.0, 10.0, 10.0));

        assert_eq!(top_layer_hit(&tree, Point::new(5.0, 5.0), g, None), Some(inner));
        assert_eq!(top_layer_hit(&tree, Point::new(105.0, 5.0), g, None), Some(outer));
        // From the root, the group is hit as a whole
        assert_eq!(top_layer_hit(&tree, Point::new(5.0, 5.0), root, None), Some(g));
    }

    #[test]
    fn test_hit_scope_rules() {
        let mut tree = LayerTree::new();
        let root = tree.root();
        let g = tree.insert(Layer::group());
        tree.add_child(root, g).unwrap();
        let a = add(&mut tree, g, ShapeKind::Rect, Frame::new(0.0, 0.0, 10.0, 10.0));
        let b = add(&mut tree, root, ShapeKind::Rect, Frame::new(0.0, 0.0, 10.0, 10.0));

        assert_eq!(hit_scope(&tree, None), root);
        assert_eq!(hit_scope(&tree, Some(&g)), g);
        assert_eq!(hit_scope(&tree, Some(&a)), g);
        assert_eq!(hit_scope(&tree, Some(&b)), root);

        let mut sel = Layer::selection();
        if let LayerKind::Selection(m) = &mut sel.kind {
            m.extend([b, a]);
        }
        let sel = tree.insert(sel);
        assert_eq!(hit_scope(&tree, Some(&sel)), g);
    }

    #[test]
    fn test_stacking_order() {
        let mut tree = LayerTree::new();
        let root = tree.root();
        let a = add(&mut tree, root, ShapeKind::Rect, Frame::new(0.0, 0.0, 10.0, 10.0));
        let b = add(&mut tree, root, ShapeKind::Rect, Frame::new(0.0, 0.0, 10.0, 10.0));
        assert!(is_stacked_above(&tree, &b, &a));
        assert!(!is_stacked_above(&tree, &a, &b));
    }
}
