//! Pads, always owned by a module.
//!
//! Pad coordinates live in the module frame: `offset` is relative to the
//! module anchor before module rotation, and `orientation` is relative to
//! the module orientation. Absolute geometry is computed through the owning
//! module.

use boardkit_core::geometry::Point;
use boardkit_core::layer::LayerMask;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadShape {
    Circle,
    Rect,
    Oval,
    Trapezoid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadAttribute {
    Smd,
    ThruHole,
    NpThruHole,
    Connect,
}

/// Drill description: round unless a slot size is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PadDrill {
    pub size: i32,
    /// Second axis for slotted (oval) drills, 0 for round.
    pub slot: i32,
    /// Offset of the hole from the pad center.
    pub offset: Point,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pad {
    pub name: String,
    pub shape: PadShape,
    pub attribute: PadAttribute,
    /// Position relative to the module anchor, in the unrotated module
    /// frame.
    pub offset: Point,
    pub size: Point,
    /// Trapezoid asymmetry, unused for other shapes.
    pub delta: Point,
    pub drill: PadDrill,
    /// Orientation relative to the module, decidegrees.
    pub orientation: i32,
    pub layers: LayerMask,
    pub net: i32,
    pub net_name: String,
}

impl Pad {
    pub fn new(name: &str, shape: PadShape, attribute: PadAttribute) -> Self {
        Self {
            name: name.to_string(),
            shape,
            attribute,
            offset: Point::default(),
            size: Point::default(),
            delta: Point::default(),
            drill: PadDrill::default(),
            orientation: 0,
            layers: LayerMask::NONE,
            net: crate::NET_UNCONNECTED,
            net_name: String::new(),
        }
    }

    /// Radius of the smallest circle covering the pad.
    pub fn enclosing_radius(&self) -> i32 {
        match self.shape {
            PadShape::Circle => self.size.x / 2,
            _ => {
                let half = self.size.x.max(self.size.y) as f64 / 2.0;
                (half * std::f64::consts::SQRT_2).ceil() as i32
            }
        }
    }

    pub fn is_on_copper(&self) -> bool {
        self.layers.intersects(LayerMask::ALL_COPPER)
    }
}
