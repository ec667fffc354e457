//! Change notification
//!
//! The arena records what changed as a flat list of [`Change`] entries. A
//! renderer or layer list drains the log after each batch of edits and redraws
//! what it needs; nothing is pushed to observers while the tree is being
//! mutated.

use uuid::Uuid;

/// Layer attribute that changed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Property {
    Name,
    Visible,
    Opacity,
    Selected,
    Geometry,
    Color,
    Expanded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Change {
    /// A single attribute of one layer
    Property { id: Uuid, property: Property },

    /// Children were added to or removed from this subtree root
    Structure { subtree: Uuid },

    /// The document's current layer changed
    Selection,

    /// The viewport offset changed
    Viewport,
}

/// Pending changes, oldest first
#[derive(Clone, Debug, Default)]
pub struct ChangeLog {
    entries: Vec<Change>,
}

impl ChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a change, skipping an exact repeat of the previous entry
    pub fn push(&mut self, change: Change) {
        if self.entries.last() != Some(&change) {
            self.entries.push(change);
        }
    }

    pub fn property(&mut self, id: Uuid, property: Property) {
        self.push(Change::Property { id, property });
    }

    pub fn structure(&mut self, subtree: Uuid) {
        self.push(Change::Structure { subtree });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.entries.iter()
    }

    /// Take every pending change
    pub fn drain(&mut self) -> Vec<Change> {
        std::mem::take(&mut self.entries)
    }
}
