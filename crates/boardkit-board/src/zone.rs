//! Zone outlines and their derived fills.
//!
//! The corner outline is the authoritative data; the filled polygons are a
//! cache that can always be regenerated from it. Editing a corner
//! invalidates the fill but does not regenerate it, regeneration is an
//! explicit (and relatively expensive) operation.

use boardkit_core::geometry::{mirror_point_y, rotate_point, BoundingBox, Point};
use boardkit_core::layer::LayerNum;

use crate::track::flipped_layer;

/// How the zone copper attaches to pads of its net.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PadConnection {
    Solid,
    #[default]
    Thermal,
    /// Thermal relief for through-hole pads, solid for SMD.
    ThermalReliefsForThtOnly,
    None,
}

/// Display hatch style of the outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HatchStyle {
    None,
    #[default]
    Edge,
    Full,
}

/// How the derived fill is represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillMode {
    #[default]
    Polygons,
    Segments,
}

/// One closed contour of corner points.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Contour(pub Vec<Point>);

impl Contour {
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(&self.0)
    }
}

/// Keepout restrictions; a keepout zone carves copper instead of pouring
/// it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeepoutParams {
    pub no_tracks: bool,
    pub no_vias: bool,
    pub no_copper_pour: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub tstamp: u64,
    pub net: i32,
    /// Net name as read from the file; kept verbatim so a mismatch against
    /// the net table survives a round trip.
    pub net_name: String,
    pub layer: LayerNum,
    pub priority: u32,
    pub hatch_style: HatchStyle,
    pub hatch_pitch: i32,
    pub connect_pads: PadConnection,
    pub clearance: i32,
    pub min_thickness: i32,
    pub arc_segments: i32,
    pub thermal_gap: i32,
    pub thermal_bridge_width: i32,
    pub fill_mode: FillMode,
    pub is_filled: bool,
    pub keepout: Option<KeepoutParams>,
    /// Main outline followed by hole contours.
    pub outline: Contour,
    pub holes: Vec<Contour>,
    /// Derived fill; regenerable, never authoritative.
    pub filled_polys: Vec<Vec<Point>>,
}

impl Zone {
    pub fn new(layer: LayerNum, net: i32) -> Self {
        Self {
            tstamp: crate::fresh_tstamp(),
            net,
            net_name: String::new(),
            layer,
            priority: 0,
            hatch_style: HatchStyle::default(),
            hatch_pitch: 508_000,
            connect_pads: PadConnection::default(),
            clearance: 508_000,
            min_thickness: 254_000,
            arc_segments: 16,
            thermal_gap: 508_000,
            thermal_bridge_width: 508_000,
            fill_mode: FillMode::default(),
            is_filled: false,
            keepout: None,
            outline: Contour::default(),
            holes: Vec::new(),
            filled_polys: Vec::new(),
        }
    }

    pub fn corner_count(&self) -> usize {
        self.outline.0.len() + self.holes.iter().map(|h| h.0.len()).sum::<usize>()
    }

    /// Replaces one outline corner and invalidates the fill.
    pub fn set_corner(&mut self, index: usize, p: Point) {
        if let Some(corner) = self.outline.0.get_mut(index) {
            *corner = p;
            self.invalidate_fill();
        }
    }

    pub fn push_corner(&mut self, p: Point) {
        self.outline.0.push(p);
        self.invalidate_fill();
    }

    /// Drops the derived fill; the caller regenerates explicitly.
    pub fn invalidate_fill(&mut self) {
        self.filled_polys.clear();
        self.is_filled = false;
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.outline.bounding_box()
    }

    pub fn translate(&mut self, vector: Point) {
        for p in &mut self.outline.0 {
            *p += vector;
        }
        for hole in &mut self.holes {
            for p in &mut hole.0 {
                *p += vector;
            }
        }
        // A rigid move keeps the cached fill valid; shift it along.
        for poly in &mut self.filled_polys {
            for p in poly {
                *p += vector;
            }
        }
    }

    pub fn rotate(&mut self, center: Point, angle_decideg: i32) {
        for p in self.all_points_mut() {
            *p = rotate_point(*p, center, angle_decideg);
        }
    }

    pub fn flip(&mut self, center: Point) {
        for p in self.all_points_mut() {
            *p = mirror_point_y(*p, center);
        }
        self.layer = flipped_layer(self.layer);
    }

    fn all_points_mut(&mut self) -> impl Iterator<Item = &mut Point> {
        self.outline
            .0
            .iter_mut()
            .chain(self.holes.iter_mut().flat_map(|h| h.0.iter_mut()))
            .chain(self.filled_polys.iter_mut().flatten())
    }

    /// Point-in-polygon test against the outline, holes subtracted.
    pub fn hit_test(&self, p: Point) -> bool {
        point_in_contour(p, &self.outline) && !self.holes.iter().any(|h| point_in_contour(p, h))
    }
}

fn point_in_contour(p: Point, contour: &Contour) -> bool {
    let pts = &contour.0;
    if pts.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = pts.len() - 1;
    for i in 0..pts.len() {
        let (a, b) = (pts[i], pts[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross =
                a.x as f64 + (p.y - a.y) as f64 * (b.x - a.x) as f64 / (b.y - a.y) as f64;
            if (p.x as f64) < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_zone() -> Zone {
        let mut z = Zone::new(boardkit_core::layer::LAYER_FRONT, 1);
        z.outline = Contour(vec![
            Point::new(0, 0),
            Point::new(1000, 0),
            Point::new(1000, 1000),
            Point::new(0, 1000),
        ]);
        z
    }

    #[test]
    fn corner_edit_invalidates_fill() {
        let mut z = square_zone();
        z.filled_polys.push(vec![Point::new(1, 1)]);
        z.is_filled = true;
        z.set_corner(0, Point::new(-10, -10));
        assert!(z.filled_polys.is_empty());
        assert!(!z.is_filled);
    }

    #[test]
    fn translate_keeps_fill() {
        let mut z = square_zone();
        z.filled_polys.push(vec![Point::new(1, 1)]);
        z.is_filled = true;
        z.translate(Point::new(100, 0));
        assert_eq!(z.filled_polys[0][0], Point::new(101, 1));
        assert!(z.is_filled);
    }

    #[test]
    fn hit_test_respects_holes() {
        let mut z = square_zone();
        assert!(z.hit_test(Point::new(500, 500)));
        assert!(!z.hit_test(Point::new(1500, 500)));
        z.holes.push(Contour(vec![
            Point::new(400, 400),
            Point::new(600, 400),
            Point::new(600, 600),
            Point::new(400, 600),
        ]));
        assert!(!z.hit_test(Point::new(500, 500)));
        assert!(z.hit_test(Point::new(100, 100)));
    }
}
