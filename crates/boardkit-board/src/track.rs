//! Tracks, vias, and deprecated zone-fill segments.
//!
//! A via packs the two copper layers it spans into the low byte of its
//! layer field, four bits each. A through via ignores the stored pair and
//! always reports (front, back): the override happens on every read, so a
//! via demoted from blind/buried to through needs no fixup.

use boardkit_core::geometry::{mirror_point_y, rotate_point, BoundingBox, Point};
use boardkit_core::layer::{self, LayerMask, LayerNum};

use crate::netinfo::{NetClasses, NetInfoList};

/// Via kinds, in increasing order of manufacturing exotism.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViaType {
    Through,
    BlindBuried,
    Micro,
}

/// Discriminates the three track representations sharing one storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    /// A straight copper run on a single layer.
    Segment,
    /// A plated hole spanning a copper layer range.
    Via {
        via_type: ViaType,
        /// Explicit drill diameter; 0 or less means "use the net class".
        drill: i32,
    },
    /// Deprecated zone-fill segment kept only for old boards.
    ZoneSegment,
}

/// Bitmask returned by [`Track::is_point_on_ends`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EndsMask(pub u8);

impl EndsMask {
    pub const NONE: EndsMask = EndsMask(0);
    pub const START: EndsMask = EndsMask(1);
    pub const END: EndsMask = EndsMask(2);

    pub fn matches_start(&self) -> bool {
        self.0 & Self::START.0 != 0
    }

    pub fn matches_end(&self) -> bool {
        self.0 & Self::END.0 != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub tstamp: u64,
    pub start: Point,
    pub end: Point,
    pub width: i32,
    /// Layer number; for a via this is the packed layer pair.
    pub layer: LayerNum,
    pub net: i32,
    /// Persisted status word from the file. Editing algorithms never touch
    /// it; transient visited marks live in algorithm-local sets.
    pub status: u32,
    pub kind: TrackKind,
}

impl Track {
    pub fn new_segment(start: Point, end: Point, width: i32, layer: LayerNum, net: i32) -> Self {
        Self {
            tstamp: crate::fresh_tstamp(),
            start,
            end,
            width,
            layer,
            net,
            status: 0,
            kind: TrackKind::Segment,
        }
    }

    pub fn new_via(at: Point, width: i32, via_type: ViaType, net: i32) -> Self {
        let mut via = Self {
            tstamp: crate::fresh_tstamp(),
            start: at,
            end: at,
            width,
            layer: 0,
            net,
            status: 0,
            kind: TrackKind::Via { via_type, drill: 0 },
        };
        via.set_layer_pair(layer::LAYER_FRONT, layer::LAYER_BACK);
        via
    }

    pub fn is_via(&self) -> bool {
        matches!(self.kind, TrackKind::Via { .. })
    }

    pub fn via_type(&self) -> Option<ViaType> {
        match self.kind {
            TrackKind::Via { via_type, .. } => Some(via_type),
            _ => None,
        }
    }

    /// A zero-length non-via segment. Such segments may exist transiently
    /// during interactive editing but are never serialized and never count
    /// as chain elements.
    pub fn is_null(&self) -> bool {
        !self.is_via() && self.start == self.end
    }

    /// Length of the copper run, zero for a via.
    pub fn length(&self) -> f64 {
        self.start.distance_to(self.end)
    }

    /// Stores the copper layer pair of a via, 4 bits per layer. For a
    /// through via the stored value is forced to (front, back).
    pub fn set_layer_pair(&mut self, top: LayerNum, bottom: LayerNum) {
        let (mut top, mut bottom) = (top, bottom);
        if matches!(
            self.kind,
            TrackKind::Via {
                via_type: ViaType::Through,
                ..
            }
        ) {
            top = layer::LAYER_FRONT;
            bottom = layer::LAYER_BACK;
        }
        if bottom > top {
            std::mem::swap(&mut top, &mut bottom);
        }
        self.layer = (top & 15) | ((bottom & 15) << 4);
    }

    /// The copper layer pair of a via as (top, bottom).
    ///
    /// A through via always reports (front, back) regardless of the stored
    /// value; the normalization runs on every read.
    pub fn layer_pair(&self) -> (LayerNum, LayerNum) {
        match self.kind {
            TrackKind::Via {
                via_type: ViaType::Through,
                ..
            } => (layer::LAYER_FRONT, layer::LAYER_BACK),
            TrackKind::Via { .. } => {
                let mut top = self.layer & 15;
                let mut bottom = (self.layer >> 4) & 15;
                if bottom > top {
                    std::mem::swap(&mut top, &mut bottom);
                }
                (top, bottom)
            }
            _ => (self.layer, self.layer),
        }
    }

    /// The set of copper layers this item occupies.
    pub fn layer_mask(&self) -> LayerMask {
        if self.is_via() {
            let (top, bottom) = self.layer_pair();
            let mut mask = LayerMask::NONE;
            for l in bottom..=top {
                mask.insert(l);
            }
            mask
        } else {
            LayerMask::of(self.layer)
        }
    }

    pub fn is_on_layer(&self, layer: LayerNum) -> bool {
        if self.is_via() {
            let (top, bottom) = self.layer_pair();
            (bottom..=top).contains(&layer)
        } else {
            self.layer == layer
        }
    }

    /// Tests `p` against both endpoints within `tolerance`; a negative
    /// tolerance defaults to half the track width.
    pub fn is_point_on_ends(&self, p: Point, tolerance: i32) -> EndsMask {
        let tol = if tolerance < 0 {
            self.width as f64 / 2.0
        } else {
            tolerance as f64
        };
        let mut mask = EndsMask::NONE;
        if self.start.distance_to(p) <= tol {
            mask.0 |= EndsMask::START.0;
        }
        if self.end.distance_to(p) <= tol {
            mask.0 |= EndsMask::END.0;
        }
        mask
    }

    /// Drill diameter of a via: the explicit per-via value when set (> 0),
    /// else the owning net class's via or microvia drill. Returns the
    /// neutral value 0 when called on a non-via.
    pub fn drill_value(&self, nets: &NetInfoList, classes: &NetClasses) -> i32 {
        match self.kind {
            TrackKind::Via { via_type, drill } => {
                if drill > 0 {
                    return drill;
                }
                let class = classes.class_for_net_code(self.net, nets);
                match via_type {
                    ViaType::Micro => class.uvia_drill,
                    _ => class.via_drill,
                }
            }
            _ => 0,
        }
    }

    /// Clearance between this track and `other`: the larger of the two net
    /// class clearances, or this track's own when `other` is `None`.
    pub fn clearance(&self, other: Option<&Track>, nets: &NetInfoList, classes: &NetClasses) -> i32 {
        let own = classes.class_for_net_code(self.net, nets).clearance;
        match other {
            Some(other) => own.max(classes.class_for_net_code(other.net, nets).clearance),
            None => own,
        }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let mut bbox = BoundingBox::new(self.start, self.end);
        bbox.inflate(self.width / 2);
        bbox
    }

    pub fn translate(&mut self, vector: Point) {
        self.start += vector;
        self.end += vector;
    }

    pub fn rotate(&mut self, center: Point, angle_decideg: i32) {
        self.start = rotate_point(self.start, center, angle_decideg);
        self.end = rotate_point(self.end, center, angle_decideg);
    }

    pub fn flip(&mut self, center: Point) {
        self.start = mirror_point_y(self.start, center);
        self.end = mirror_point_y(self.end, center);
        if self.is_via() {
            let (top, bottom) = self.layer_pair();
            self.set_layer_pair(flipped_layer(bottom), flipped_layer(top));
        } else {
            self.layer = flipped_layer(self.layer);
        }
    }

    /// True when `p` lies on the copper of this item.
    pub fn hit_test(&self, p: Point) -> bool {
        let half_width = self.width as f64 / 2.0;
        if self.is_via() {
            return self.start.distance_to(p) <= half_width;
        }
        distance_to_segment(p, self.start, self.end) <= half_width
    }
}

/// The layer an item lands on after flipping the board side.
pub fn flipped_layer(layer: LayerNum) -> LayerNum {
    use boardkit_core::layer::*;
    match layer {
        LAYER_BACK => LAYER_FRONT,
        LAYER_FRONT => LAYER_BACK,
        ADHESIVE_BACK => ADHESIVE_FRONT,
        ADHESIVE_FRONT => ADHESIVE_BACK,
        SOLDERPASTE_BACK => SOLDERPASTE_FRONT,
        SOLDERPASTE_FRONT => SOLDERPASTE_BACK,
        SILKSCREEN_BACK => SILKSCREEN_FRONT,
        SILKSCREEN_FRONT => SILKSCREEN_BACK,
        SOLDERMASK_BACK => SOLDERMASK_FRONT,
        SOLDERMASK_FRONT => SOLDERMASK_BACK,
        other => other,
    }
}

/// Distance from `p` to the segment (a, b).
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let ap = p - a;
    let len_sq = (ab.x as f64).powi(2) + (ab.y as f64).powi(2);
    if len_sq == 0.0 {
        return a.distance_to(p);
    }
    let t = ((ap.x as f64 * ab.x as f64 + ap.y as f64 * ab.y as f64) / len_sq).clamp(0.0, 1.0);
    let proj = Point::new(
        a.x + (t * ab.x as f64).round() as i32,
        a.y + (t * ab.y as f64).round() as i32,
    );
    proj.distance_to(p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netinfo::NetClass;
    use boardkit_core::layer::{LAYER_BACK, LAYER_FRONT};

    fn via(via_type: ViaType) -> Track {
        let mut v = Track::new_via(Point::new(0, 0), 600_000, ViaType::Through, 1);
        if let TrackKind::Via { via_type: vt, .. } = &mut v.kind {
            *vt = via_type;
        }
        v
    }

    #[test]
    fn through_via_pair_is_always_front_back() {
        let mut v = via(ViaType::Through);
        // Store a bogus pair; a through via must ignore it on read.
        v.layer = (3 & 15) | ((1 & 15) << 4);
        assert_eq!(v.layer_pair(), (LAYER_FRONT, LAYER_BACK));
        assert_eq!(v.layer_mask(), LayerMask::ALL_COPPER);
    }

    #[test]
    fn blind_via_pair_unpacks_ordered() {
        let mut v = via(ViaType::BlindBuried);
        v.set_layer_pair(2, 7);
        assert_eq!(v.layer_pair(), (7, 2));
        assert!(v.is_on_layer(4));
        assert!(!v.is_on_layer(8));
    }

    #[test]
    fn demoting_blind_to_through_normalizes_on_read() {
        let mut v = via(ViaType::BlindBuried);
        v.set_layer_pair(2, 7);
        if let TrackKind::Via { via_type, .. } = &mut v.kind {
            *via_type = ViaType::Through;
        }
        assert_eq!(v.layer_pair(), (LAYER_FRONT, LAYER_BACK));
    }

    #[test]
    fn point_on_ends_default_tolerance() {
        let t = Track::new_segment(Point::new(0, 0), Point::new(1000, 0), 200, 0, 1);
        let m = t.is_point_on_ends(Point::new(50, 50), -1);
        assert!(m.matches_start());
        assert!(!m.matches_end());
        let m = t.is_point_on_ends(Point::new(1000, 0), 0);
        assert!(m.matches_end());
    }

    #[test]
    fn null_segment_detection() {
        let t = Track::new_segment(Point::new(5, 5), Point::new(5, 5), 100, 0, 1);
        assert!(t.is_null());
        let v = Track::new_via(Point::new(5, 5), 100, ViaType::Through, 1);
        assert!(!v.is_null());
    }

    #[test]
    fn drill_on_non_via_is_neutral_zero() {
        let t = Track::new_segment(Point::new(0, 0), Point::new(10, 0), 100, 0, 1);
        let nets = NetInfoList::new();
        let classes = NetClasses::new();
        assert_eq!(t.drill_value(&nets, &classes), 0);
    }

    #[test]
    fn flip_swaps_copper_side() {
        let mut t = Track::new_segment(Point::new(0, 100), Point::new(10, 100), 100, LAYER_FRONT, 1);
        t.flip(Point::new(0, 0));
        assert_eq!(t.layer, LAYER_BACK);
        assert_eq!(t.start, Point::new(0, -100));
    }

    #[test]
    fn segment_hit_test() {
        let t = Track::new_segment(Point::new(0, 0), Point::new(1000, 0), 200, 0, 1);
        assert!(t.hit_test(Point::new(500, 90)));
        assert!(!t.hit_test(Point::new(500, 150)));
    }

    #[test]
    fn pairwise_clearance_never_shrinks_below_own() {
        let mut nets = NetInfoList::new();
        nets.add(1, "GND").unwrap();
        nets.add(2, "VCC").unwrap();
        let mut classes = NetClasses::new();
        classes.default_class_mut().clearance = 200_000;
        let mut tight = NetClass::new("Tight");
        tight.clearance = 50_000;
        tight.nets.push("VCC".to_string());
        classes.add(tight).unwrap();

        let a = Track::new_segment(Point::new(0, 0), Point::new(10, 0), 100, 0, 1);
        let b = Track::new_segment(Point::new(0, 0), Point::new(10, 0), 100, 0, 2);
        let own = a.clearance(None, &nets, &classes);
        assert_eq!(own, 200_000);
        // The tighter class on the other net must not reduce the result.
        assert!(a.clearance(Some(&b), &nets, &classes) >= own);
    }
}
