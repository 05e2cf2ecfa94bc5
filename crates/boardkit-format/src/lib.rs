//! Board file formats.
//!
//! The primary format is the s-expression board file: a token-based
//! recursive-descent parser builds a [`boardkit_board::Board`] (or a single
//! standalone module), and a mirror serializer re-emits the text
//! losslessly. A second, line-oriented legacy footprint library format
//! lives in [`library`].

pub mod error;
pub mod io;
pub mod lexer;
pub mod library;
pub mod parser;
pub mod writer;

pub use error::{FormatError, ParseError};
pub use io::{load_board, load_board_into, load_footprint, save_board, save_footprint};
pub use library::FootprintLibrary;
pub use parser::{parse_board_text, ParsedItem};
pub use writer::{format_board, format_module};
