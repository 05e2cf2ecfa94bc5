//! Board document model: the polymorphic item set, the board container, net
//! and net-class tables, and design settings.
//!
//! Items form a closed sum type ([`item::BoardItem`]) dispatched by `match`;
//! the board owns every item reachable from its collections, and a module
//! owns its pads and child graphics. The track collection keeps its
//! net-code-sorted order across every structural mutation, which the
//! connectivity algorithms in `boardkit-editor` rely on.

pub mod board;
pub mod drawing;
pub mod error;
pub mod item;
pub mod module;
pub mod netinfo;
pub mod pad;
pub mod settings;
pub mod track;
pub mod zone;

pub use board::Board;
pub use error::BoardError;
pub use item::{BoardItem, ItemKind};
pub use netinfo::{NetClass, NetClasses, NetInfo, NetInfoList};
pub use track::{EndsMask, Track, TrackKind, ViaType};

/// Net code reserved for items not connected to any net.
pub const NET_UNCONNECTED: i32 = 0;

/// Returns a new unique item timestamp.
///
/// Timestamps identify items across undo snapshots and are persisted in the
/// board file as hex `tstamp` values; fresh ones are drawn from a v4 UUID so
/// duplicated items never collide with loaded ones.
pub fn fresh_tstamp() -> u64 {
    uuid::Uuid::new_v4().as_u64_pair().0
}
