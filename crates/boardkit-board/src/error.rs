//! Error types for board-model mutations.

use thiserror::Error;

/// Errors from board container and table operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    /// A net class with the same name already exists.
    #[error("net class \"{name}\" already exists")]
    DuplicateNetClass {
        /// The rejected class name.
        name: String,
    },

    /// A net with the same code or name already exists.
    #[error("net {code} \"{name}\" collides with an existing net")]
    DuplicateNet {
        /// The rejected net code.
        code: i32,
        /// The rejected net name.
        name: String,
    },

    /// An operation referenced a net code missing from the net table.
    #[error("net code {code} is not defined")]
    UnknownNet {
        /// The missing net code.
        code: i32,
    },

    /// An operation referenced an item the board does not own.
    #[error("no item with timestamp {tstamp:#x} on the board")]
    UnknownItem {
        /// The missing item timestamp.
        tstamp: u64,
    },
}
