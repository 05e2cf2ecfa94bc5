//! Board file I/O entry points.

use std::path::Path;

use anyhow::{bail, Context, Result};
use boardkit_board::board::Board;
use boardkit_board::module::Module;
use tracing::info;

use crate::parser::{parse_board_text, ParsedItem};
use crate::writer::{format_board, format_module};

/// Loads a board file.
pub fn load_board(path: impl AsRef<Path>) -> Result<Board> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).context("Failed to read board file")?;
    let parsed = parse_board_text(&text, &path.display().to_string())?;
    match parsed {
        ParsedItem::Board(board) => {
            info!(
                path = %path.display(),
                tracks = board.track_count(),
                modules = board.modules.len(),
                zones = board.zones.len(),
                "board loaded"
            );
            Ok(*board)
        }
        ParsedItem::Module(_) => bail!(
            "{} contains a footprint, not a board",
            path.display()
        ),
    }
}

/// Replaces `board` with the file's contents. The current board is only
/// swapped out after a successful parse, so a bad file never destroys the
/// open document.
pub fn load_board_into(board: &mut Board, path: impl AsRef<Path>) -> Result<()> {
    let fresh = load_board(path)?;
    *board = fresh;
    Ok(())
}

/// Writes the board in the s-expression format.
pub fn save_board(board: &Board, path: impl AsRef<Path>) -> Result<()> {
    let text = format_board(board);
    std::fs::write(path.as_ref(), text).context("Failed to write board file")?;
    info!(path = %path.as_ref().display(), "board saved");
    Ok(())
}

/// Loads a standalone footprint file.
pub fn load_footprint(path: impl AsRef<Path>) -> Result<Module> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).context("Failed to read footprint file")?;
    match parse_board_text(&text, &path.display().to_string())? {
        ParsedItem::Module(module) => Ok(*module),
        ParsedItem::Board(_) => bail!(
            "{} contains a board, not a footprint",
            path.display()
        ),
    }
}

/// Writes a standalone footprint file.
pub fn save_footprint(module: &Module, path: impl AsRef<Path>) -> Result<()> {
    let text = format_module(module);
    std::fs::write(path.as_ref(), text).context("Failed to write footprint file")?;
    Ok(())
}
