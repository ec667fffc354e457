//! Multi-layer selection
//!
//! A selection is a [`LayerKind::Selection`] node in the arena listing the
//! ids of layers owned by groups elsewhere. It only exists while at least two
//! layers are selected together; shrinking it to one member hands back that
//! layer, shrinking it to none drops the selection entirely.

use crate::layer::{Layer, LayerKind};
use crate::layer_tree::LayerTree;
use uuid::Uuid;

/// True if `id` names a selection node
pub fn is_selection(tree: &LayerTree, id: &Uuid) -> bool {
    tree.get(id).is_some_and(|l| l.is_selection())
}

/// Create a selection holding `members` in order and mark them selected
pub fn create(tree: &mut LayerTree, members: &[Uuid]) -> Uuid {
    let selection = tree.insert(Layer::selection());
    for member in members {
        add_member(tree, &selection, *member);
    }
    selection
}

/// Append a layer to a selection. Already-listed layers are left in place.
pub fn add_member(tree: &mut LayerTree, selection: &Uuid, member: Uuid) {
    let Some(LayerKind::Selection(members)) = tree.get_mut(selection).map(|l| &mut l.kind) else {
        return;
    };
    if !members.contains(&member) {
        members.push(member);
        tree.set_selected(&member, true);
        tree.changes_mut().structure(*selection);
    }
}

/// Drop a layer from a selection
pub fn remove_member(tree: &mut LayerTree, selection: &Uuid, member: &Uuid) {
    let Some(LayerKind::Selection(members)) = tree.get_mut(selection).map(|l| &mut l.kind) else {
        return;
    };
    let before = members.len();
    members.retain(|m| m != member);
    if members.len() != before {
        tree.set_selected(member, false);
        tree.changes_mut().structure(*selection);
    }
}

/// Toggle a layer's membership
pub fn toggle_member(tree: &mut LayerTree, selection: &Uuid, member: Uuid) {
    if tree.children(selection).contains(&member) {
        remove_member(tree, selection, &member);
    } else {
        add_member(tree, selection, member);
    }
}

/// Combine the current layer with a newly picked one
///
/// Without `multi`, or when either side is missing, the result is simply
/// `candidate`. With `multi`, a current selection has `candidate` toggled in
/// or out, and a current single layer becomes a new selection of
/// `[current, candidate]`.
///
/// # Returns
///
/// The id of the layer or selection that should become current. A
/// selection left with one member is dropped in favour of that member; one
/// left empty is dropped and `None` is returned.
pub fn selection_from(
    tree: &mut LayerTree,
    current: Option<Uuid>,
    candidate: Option<Uuid>,
    multi: bool,
) -> Option<Uuid> {
    let (true, Some(current), Some(candidate)) = (multi, current, candidate) else {
        return candidate;
    };

    if !is_selection(tree, &current) {
        if current == candidate {
            return Some(current);
        }
        return Some(create(tree, &[current, candidate]));
    }

    toggle_member(tree, &current, candidate);
    let members = tree.children(&current).to_vec();
    match members.as_slice() {
        [] => {
            tree.purge(&current);
            None
        }
        [only] => {
            tree.purge(&current);
            Some(*only)
        }
        _ => Some(current),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Frame;
    use crate::layer::ShapeKind;

    fn two_rects() -> (LayerTree, Uuid, Uuid) {
        let mut tree = LayerTree::new();
        let root = tree.root();
        let a = tree.insert(Layer::shape(ShapeKind::Rect, "A", Frame::new(0.0, 0.0, 10.0, 10.0)));
        let b = tree.insert(Layer::shape(ShapeKind::Rect, "B", Frame::new(20.0, 0.0, 10.0, 10.0)));
        tree.add_child(root, a).unwrap();
        tree.add_child(root, b).unwrap();
        (tree, a, b)
    }

    #[test]
    fn test_single_select_returns_candidate() {
        let (mut tree, a, b) = two_rects();
        assert_eq!(selection_from(&mut tree, Some(a), Some(b), false), Some(b));
        assert_eq!(selection_from(&mut tree, Some(a), None, true), None);
        assert_eq!(selection_from(&mut tree, None, Some(b), true), Some(b));
    }

    #[test]
    fn test_multi_select_builds_selection() {
        let (mut tree, a, b) = two_rects();
        let sel = selection_from(&mut tree, Some(a), Some(b), true).unwrap();

        assert!(is_selection(&tree, &sel));
        assert_eq!(tree.children(&sel), &[a, b]);
        assert!(tree.get(&a).unwrap().selected);
        assert!(tree.get(&b).unwrap().selected);
        // Members stay owned by their group
        assert_eq!(tree.parent(&a), Some(tree.root()));
    }

    #[test]
    fn test_toggle_is_its_own_inverse() {
        let (mut tree, a, b) = two_rects();
        let sel = selection_from(&mut tree, Some(a), Some(b), true);
        let back = selection_from(&mut tree, sel, Some(b), true);

        assert_eq!(back, Some(a));
        assert!(!tree.get(&b).unwrap().selected);
        // The collapsed selection is gone from the arena
        assert!(tree.get(&sel.unwrap()).is_none());
    }

    #[test]
    fn test_toggle_adds_third_member() {
        let (mut tree, a, b) = two_rects();
        let root = tree.root();
        let c = tree.insert(Layer::shape(ShapeKind::Oval, "C", Frame::new(40.0, 0.0, 10.0, 10.0)));
        tree.add_child(root, c).unwrap();

        let sel = selection_from(&mut tree, Some(a), Some(b), true);
        let sel2 = selection_from(&mut tree, sel, Some(c), true);
        assert_eq!(sel, sel2);
        assert_eq!(tree.children(&sel2.unwrap()), &[a, b, c]);
    }

    #[test]
    fn test_empty_selection_becomes_none() {
        let (mut tree, a, _) = two_rects();
        let sel = create(&mut tree, &[a]);
        assert_eq!(selection_from(&mut tree, Some(sel), Some(a), true), None);
        assert!(tree.get(&sel).is_none());
    }

    #[test]
    fn test_selection_bounds_span_members() {
        let (mut tree, a, b) = two_rects();
        let sel = create(&mut tree, &[a, b]);
        assert_eq!(tree.bounds(&sel), Some(Frame::new(0.0, 0.0, 30.0, 10.0)));

        tree.set_x(&sel, 5.0);
        assert_eq!(tree.bounds(&a).map(|f| f.x), Some(5.0));
        assert_eq!(tree.bounds(&b).map(|f| f.x), Some(25.0));
    }
}
