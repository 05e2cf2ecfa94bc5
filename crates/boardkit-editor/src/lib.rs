//! Interactive board editing.
//!
//! Everything here operates on a [`boardkit_board::Board`] through its
//! order-preserving mutation methods: rectangular block operations,
//! track-chain cleanup after routing, copper zone fill, and the undo
//! records the operations produce.

pub mod block;
pub mod connect;
pub mod undo;
pub mod zone_fill;

pub use block::{BlockCommand, BlockOperation, BlockOptions, BlockSelection, BlockStage};
pub use connect::{drag_track_endpoint, erase_redundant_track, find_track_at, mark_trace};
pub use undo::{PickedItem, PickedItemsList, UndoKind};
pub use zone_fill::{fill_all_zones, fill_zone, fill_zone_in_place, ZoneFillError};
