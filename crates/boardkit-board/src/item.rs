//! The closed board-item sum type and its shared capability set.
//!
//! Every algorithm that needs "any item" works through [`BoardItem`] and
//! dispatches by `match`; `kind()` answers the `Type() == X` style filtering
//! questions the block operations and the parser ask.

use boardkit_core::geometry::{BoundingBox, Point};
use boardkit_core::layer::LayerNum;

use crate::drawing::{Dimension, DrawSegment, Target, TextItem};
use crate::module::Module;
use crate::track::{Track, TrackKind};
use crate::zone::Zone;

/// Item kind discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Track,
    Via,
    /// Deprecated zone-fill segment.
    ZoneSegment,
    Module,
    Drawing,
    Text,
    Dimension,
    Target,
    Zone,
}

/// Any board item, owned.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardItem {
    Track(Track),
    Module(Module),
    Drawing(DrawSegment),
    Text(TextItem),
    Dimension(Dimension),
    Target(Target),
    Zone(Zone),
}

impl BoardItem {
    pub fn kind(&self) -> ItemKind {
        match self {
            BoardItem::Track(t) => match t.kind {
                TrackKind::Segment => ItemKind::Track,
                TrackKind::Via { .. } => ItemKind::Via,
                TrackKind::ZoneSegment => ItemKind::ZoneSegment,
            },
            BoardItem::Module(_) => ItemKind::Module,
            BoardItem::Drawing(_) => ItemKind::Drawing,
            BoardItem::Text(_) => ItemKind::Text,
            BoardItem::Dimension(_) => ItemKind::Dimension,
            BoardItem::Target(_) => ItemKind::Target,
            BoardItem::Zone(_) => ItemKind::Zone,
        }
    }

    pub fn tstamp(&self) -> u64 {
        match self {
            BoardItem::Track(t) => t.tstamp,
            BoardItem::Module(m) => m.tstamp,
            BoardItem::Drawing(d) => d.tstamp,
            BoardItem::Text(t) => t.tstamp,
            BoardItem::Dimension(d) => d.tstamp,
            BoardItem::Target(t) => t.tstamp,
            BoardItem::Zone(z) => z.tstamp,
        }
    }

    pub fn set_tstamp(&mut self, tstamp: u64) {
        match self {
            BoardItem::Track(t) => t.tstamp = tstamp,
            BoardItem::Module(m) => m.tstamp = tstamp,
            BoardItem::Drawing(d) => d.tstamp = tstamp,
            BoardItem::Text(t) => t.tstamp = tstamp,
            BoardItem::Dimension(d) => d.tstamp = tstamp,
            BoardItem::Target(t) => t.tstamp = tstamp,
            BoardItem::Zone(z) => z.tstamp = tstamp,
        }
    }

    /// Reference position: start point for tracks, anchor for modules,
    /// first outline corner for zones.
    pub fn position(&self) -> Point {
        match self {
            BoardItem::Track(t) => t.start,
            BoardItem::Module(m) => m.position,
            BoardItem::Drawing(d) => d.start,
            BoardItem::Text(t) => t.position,
            BoardItem::Dimension(d) => d.crossbar.0,
            BoardItem::Target(t) => t.position,
            BoardItem::Zone(z) => z.outline.0.first().copied().unwrap_or_default(),
        }
    }

    pub fn set_position(&mut self, position: Point) {
        let delta = position - self.position();
        self.translate(delta);
    }

    /// The layer the item sits on; for a via the raw packed value.
    pub fn layer(&self) -> LayerNum {
        match self {
            BoardItem::Track(t) => t.layer,
            BoardItem::Module(m) => m.layer,
            BoardItem::Drawing(d) => d.layer,
            BoardItem::Text(t) => t.layer,
            BoardItem::Dimension(d) => d.layer,
            BoardItem::Target(t) => t.layer,
            BoardItem::Zone(z) => z.layer,
        }
    }

    pub fn set_layer(&mut self, layer: LayerNum) {
        match self {
            BoardItem::Track(t) => t.layer = layer,
            BoardItem::Module(m) => m.layer = layer,
            BoardItem::Drawing(d) => d.layer = layer,
            BoardItem::Text(t) => t.layer = layer,
            BoardItem::Dimension(d) => d.layer = layer,
            BoardItem::Target(t) => t.layer = layer,
            BoardItem::Zone(z) => z.layer = layer,
        }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        match self {
            BoardItem::Track(t) => t.bounding_box(),
            BoardItem::Module(m) => m.bounding_box(),
            BoardItem::Drawing(d) => d.bounding_box(),
            BoardItem::Text(t) => t.bounding_box(),
            BoardItem::Dimension(d) => d.bounding_box(),
            BoardItem::Target(t) => t.bounding_box(),
            BoardItem::Zone(z) => z.bounding_box(),
        }
    }

    pub fn translate(&mut self, vector: Point) {
        match self {
            BoardItem::Track(t) => t.translate(vector),
            BoardItem::Module(m) => m.translate(vector),
            BoardItem::Drawing(d) => d.translate(vector),
            BoardItem::Text(t) => t.translate(vector),
            BoardItem::Dimension(d) => d.translate(vector),
            BoardItem::Target(t) => t.translate(vector),
            BoardItem::Zone(z) => z.translate(vector),
        }
    }

    pub fn rotate(&mut self, center: Point, angle_decideg: i32) {
        match self {
            BoardItem::Track(t) => t.rotate(center, angle_decideg),
            BoardItem::Module(m) => m.rotate(center, angle_decideg),
            BoardItem::Drawing(d) => d.rotate(center, angle_decideg),
            BoardItem::Text(t) => t.rotate(center, angle_decideg),
            BoardItem::Dimension(d) => d.rotate(center, angle_decideg),
            BoardItem::Target(t) => t.rotate(center, angle_decideg),
            BoardItem::Zone(z) => z.rotate(center, angle_decideg),
        }
    }

    pub fn flip(&mut self, center: Point) {
        match self {
            BoardItem::Track(t) => t.flip(center),
            BoardItem::Module(m) => m.flip(center),
            BoardItem::Drawing(d) => d.flip(center),
            BoardItem::Text(t) => t.flip(center),
            BoardItem::Dimension(d) => d.flip(center),
            BoardItem::Target(t) => t.flip(center),
            BoardItem::Zone(z) => z.flip(center),
        }
    }

    pub fn hit_test(&self, p: Point) -> bool {
        match self {
            BoardItem::Track(t) => t.hit_test(p),
            BoardItem::Module(m) => m.hit_test(p),
            BoardItem::Drawing(d) => d.hit_test(p),
            BoardItem::Text(t) => t.hit_test(p),
            BoardItem::Dimension(d) => d.hit_test(p),
            BoardItem::Target(t) => t.hit_test(p),
            BoardItem::Zone(z) => z.hit_test(p),
        }
    }

    /// Area hit test used by block selection. Small items match when they
    /// intersect the rectangle; modules and zones only when fully
    /// contained, so a block grab does not drag half a footprint along.
    pub fn hit_test_rect(&self, rect: &BoundingBox) -> bool {
        match self {
            BoardItem::Module(_) | BoardItem::Zone(_) => rect.contains_box(&self.bounding_box()),
            _ => rect.intersects(&self.bounding_box()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::ViaType;

    #[test]
    fn kind_discriminates_track_flavors() {
        let seg = BoardItem::Track(Track::new_segment(
            Point::new(0, 0),
            Point::new(10, 0),
            5,
            0,
            1,
        ));
        assert_eq!(seg.kind(), ItemKind::Track);

        let via = BoardItem::Track(Track::new_via(Point::new(0, 0), 5, ViaType::Through, 1));
        assert_eq!(via.kind(), ItemKind::Via);
    }

    #[test]
    fn set_position_translates() {
        let mut item = BoardItem::Track(Track::new_segment(
            Point::new(0, 0),
            Point::new(10, 0),
            5,
            0,
            1,
        ));
        item.set_position(Point::new(100, 100));
        match &item {
            BoardItem::Track(t) => {
                assert_eq!(t.start, Point::new(100, 100));
                assert_eq!(t.end, Point::new(110, 100));
            }
            _ => unreachable!(),
        }
    }
}
