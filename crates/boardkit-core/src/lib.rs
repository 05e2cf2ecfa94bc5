//! Core primitives for BoardKit: board coordinates, angles, bounding boxes,
//! layer numbering and masks, and unit conversion.
//!
//! Everything that touches a board coordinate stores it in internal units
//! (nanometers, `i32`); millimeters exist only at the file-format boundary.

pub mod geometry;
pub mod layer;
pub mod units;

pub use geometry::{BoundingBox, Point};
pub use layer::{LayerMask, LayerTables};
pub use units::{iu_to_mm, mm_to_iu, IU_PER_MM};
