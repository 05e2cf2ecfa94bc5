//! Undo records produced by editing operations.
//!
//! An operation returns a [`PickedItemsList`] describing what it did to
//! which items: a `Changed` entry carries a snapshot of the item before
//! the mutation, a `Deleted` entry owns the removed item outright, and a
//! `New` entry names the created item by tstamp. The list is the data an
//! undo stack stores; applying it back to a board is the caller's
//! concern.

use boardkit_board::item::{BoardItem, ItemKind};

/// What the operation did to the item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoKind {
    /// The item was mutated; `snapshot` holds its prior state.
    Changed,
    /// The item was created; only its identity is recorded.
    New,
    /// The item was removed; `snapshot` owns it.
    Deleted,
}

/// One undo record.
#[derive(Debug, Clone, PartialEq)]
pub struct PickedItem {
    pub kind: UndoKind,
    /// Identity of the affected item.
    pub tstamp: u64,
    pub item_kind: ItemKind,
    /// Pre-mutation state for `Changed`, the removed item for `Deleted`,
    /// `None` for `New`.
    pub snapshot: Option<BoardItem>,
}

/// The records of one operation, in the order the items were touched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PickedItemsList {
    items: Vec<PickedItem>,
}

impl PickedItemsList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_changed(&mut self, before: BoardItem) {
        self.items.push(PickedItem {
            kind: UndoKind::Changed,
            tstamp: before.tstamp(),
            item_kind: before.kind(),
            snapshot: Some(before),
        });
    }

    pub fn push_new(&mut self, item_kind: ItemKind, tstamp: u64) {
        self.items.push(PickedItem {
            kind: UndoKind::New,
            tstamp,
            item_kind,
            snapshot: None,
        });
    }

    pub fn push_deleted(&mut self, removed: BoardItem) {
        self.items.push(PickedItem {
            kind: UndoKind::Deleted,
            tstamp: removed.tstamp(),
            item_kind: removed.kind(),
            snapshot: Some(removed),
        });
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PickedItem> {
        self.items.iter()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Merges another list into this one, keeping touch order.
    pub fn append(&mut self, mut other: PickedItemsList) {
        self.items.append(&mut other.items);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardkit_board::track::Track;
    use boardkit_core::geometry::Point;

    #[test]
    fn records_carry_identity_and_snapshots() {
        let track = Track::new_segment(Point::new(0, 0), Point::new(10, 0), 2, 15, 1);
        let tstamp = track.tstamp;

        let mut list = PickedItemsList::new();
        list.push_changed(BoardItem::Track(track.clone()));
        list.push_new(ItemKind::Via, 42);
        list.push_deleted(BoardItem::Track(track));

        assert_eq!(list.len(), 3);
        let records: Vec<&PickedItem> = list.iter().collect();
        assert_eq!(records[0].kind, UndoKind::Changed);
        assert_eq!(records[0].tstamp, tstamp);
        assert!(records[0].snapshot.is_some());
        assert_eq!(records[1].kind, UndoKind::New);
        assert!(records[1].snapshot.is_none());
        assert_eq!(records[2].kind, UndoKind::Deleted);
    }
}
