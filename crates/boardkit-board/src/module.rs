//! Modules (footprints): pads plus child graphics, owned as one unit.
//!
//! Children keep module-frame coordinates; moving a module is a position
//! change only, rotating adjusts the orientation field, and flipping
//! mirrors children into the opposite side's frame. Deleting a module
//! deletes its children with it, by ownership.

use boardkit_core::geometry::{mirror_point_y, rotate_point, BoundingBox, Point};
use boardkit_core::layer::{LayerMask, LayerNum, LAYER_FRONT, SILKSCREEN_FRONT};

use crate::drawing::ShapeKind;
use crate::pad::Pad;
use crate::track::flipped_layer;

/// Role of a text carried by a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleTextKind {
    Reference,
    Value,
    User,
}

/// A text in module-frame coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleText {
    pub kind: ModuleTextKind,
    pub text: String,
    pub offset: Point,
    /// Relative to the module orientation, decidegrees.
    pub orientation: i32,
    pub layer: LayerNum,
    pub size: Point,
    pub thickness: i32,
    pub italic: bool,
    pub visible: bool,
}

impl ModuleText {
    pub fn new(kind: ModuleTextKind, text: &str) -> Self {
        Self {
            kind,
            text: text.to_string(),
            offset: Point::default(),
            orientation: 0,
            layer: SILKSCREEN_FRONT,
            size: Point::new(1_000_000, 1_000_000),
            thickness: 150_000,
            italic: false,
            visible: true,
        }
    }
}

/// A graphic edge in module-frame coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeModule {
    pub shape: ShapeKind,
    pub start: Point,
    pub end: Point,
    pub width: i32,
    pub layer: LayerNum,
}

/// Reference to a 3D shape file with placement parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Model3D {
    pub path: String,
    pub at: [f64; 3],
    pub scale: [f64; 3],
    pub rotate: [f64; 3],
}

/// Mounting style recorded in the file's `attr` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModuleAttr {
    #[default]
    ThroughHole,
    Smd,
    Virtual,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub tstamp: u64,
    pub name: String,
    pub reference: ModuleText,
    pub value: ModuleText,
    pub texts: Vec<ModuleText>,
    pub position: Point,
    pub orientation: i32,
    /// Side the module sits on: front or back copper.
    pub layer: LayerNum,
    pub locked: bool,
    pub attr: ModuleAttr,
    pub description: String,
    pub tags: String,
    /// Schematic sheet path the module was placed from.
    pub path: String,
    pub pads: Vec<Pad>,
    pub edges: Vec<EdgeModule>,
    pub model: Option<Model3D>,
}

impl Module {
    pub fn new(name: &str) -> Self {
        Self {
            tstamp: crate::fresh_tstamp(),
            name: name.to_string(),
            reference: ModuleText::new(ModuleTextKind::Reference, ""),
            value: ModuleText::new(ModuleTextKind::Value, ""),
            texts: Vec::new(),
            position: Point::default(),
            orientation: 0,
            layer: LAYER_FRONT,
            locked: false,
            attr: ModuleAttr::default(),
            description: String::new(),
            tags: String::new(),
            path: String::new(),
            pads: Vec::new(),
            edges: Vec::new(),
            model: None,
        }
    }

    /// Absolute board position of a module-frame point.
    pub fn to_board(&self, offset: Point) -> Point {
        rotate_point(self.position + offset, self.position, self.orientation)
    }

    pub fn pad_position(&self, pad: &Pad) -> Point {
        self.to_board(pad.offset)
    }

    pub fn find_pad(&self, name: &str) -> Option<&Pad> {
        self.pads.iter().find(|p| p.name == name)
    }

    /// Pads of the module touching `p` on a layer of `mask`.
    pub fn pad_at(&self, p: Point, mask: LayerMask) -> Option<&Pad> {
        self.pads.iter().find(|pad| {
            pad.layers.intersects(mask)
                && self.pad_position(pad).distance_to(p) <= pad.enclosing_radius() as f64
        })
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let mut bbox = BoundingBox::new(self.position, self.position);
        for pad in &self.pads {
            let pos = self.pad_position(pad);
            let r = pad.enclosing_radius();
            bbox.merge_point(Point::new(pos.x - r, pos.y - r));
            bbox.merge_point(Point::new(pos.x + r, pos.y + r));
        }
        for edge in &self.edges {
            bbox.merge_point(self.to_board(edge.start));
            bbox.merge_point(self.to_board(edge.end));
            if let ShapeKind::Polygon(points) = &edge.shape {
                for p in points {
                    bbox.merge_point(self.to_board(*p));
                }
            }
        }
        bbox
    }

    pub fn translate(&mut self, vector: Point) {
        self.position += vector;
    }

    /// Rotates the module about an arbitrary center, keeping the internal
    /// orientation consistent with the applied transform.
    pub fn rotate(&mut self, center: Point, angle_decideg: i32) {
        self.position = rotate_point(self.position, center, angle_decideg);
        self.orientation = (self.orientation + angle_decideg).rem_euclid(3600);
    }

    /// Flips the module to the other board side about `center`.
    pub fn flip(&mut self, center: Point) {
        self.position = mirror_point_y(self.position, center);
        self.orientation = (-self.orientation).rem_euclid(3600);
        self.layer = flipped_layer(self.layer);

        for pad in &mut self.pads {
            pad.offset.y = -pad.offset.y;
            pad.drill.offset.y = -pad.drill.offset.y;
            pad.orientation = (-pad.orientation).rem_euclid(3600);
            pad.layers = flipped_mask(pad.layers);
        }
        for edge in &mut self.edges {
            edge.start.y = -edge.start.y;
            edge.end.y = -edge.end.y;
            edge.layer = flipped_layer(edge.layer);
            match &mut edge.shape {
                ShapeKind::Polygon(points) => {
                    for p in points {
                        p.y = -p.y;
                    }
                }
                ShapeKind::Arc { angle } => *angle = -*angle,
                ShapeKind::Curve { ctrl1, ctrl2 } => {
                    ctrl1.y = -ctrl1.y;
                    ctrl2.y = -ctrl2.y;
                }
                _ => {}
            }
        }
        for text in self
            .texts
            .iter_mut()
            .chain([&mut self.reference, &mut self.value])
        {
            text.offset.y = -text.offset.y;
            text.orientation = (-text.orientation).rem_euclid(3600);
            text.layer = flipped_layer(text.layer);
        }
    }

    pub fn hit_test(&self, p: Point) -> bool {
        self.bounding_box().contains(p)
    }
}

/// Maps every layer of a mask through [`flipped_layer`].
pub fn flipped_mask(mask: LayerMask) -> LayerMask {
    let mut out = LayerMask::NONE;
    for layer in mask.iter() {
        out.insert(flipped_layer(layer));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pad::{PadAttribute, PadShape};
    use boardkit_core::layer::LAYER_BACK;

    fn module_with_pad() -> Module {
        let mut m = Module::new("R_0805");
        m.position = Point::new(10_000_000, 10_000_000);
        let mut pad = Pad::new("1", PadShape::Rect, PadAttribute::Smd);
        pad.offset = Point::new(1_000_000, 0);
        pad.size = Point::new(1_000_000, 1_200_000);
        pad.layers = LayerMask::of(LAYER_FRONT);
        m.pads.push(pad);
        m
    }

    #[test]
    fn pad_position_follows_module_rotation() {
        let mut m = module_with_pad();
        assert_eq!(m.pad_position(&m.pads[0]), Point::new(11_000_000, 10_000_000));
        m.rotate(m.position, 900);
        assert_eq!(m.pad_position(&m.pads[0]), Point::new(10_000_000, 11_000_000));
        assert_eq!(m.orientation, 900);
    }

    #[test]
    fn flip_changes_side_and_mirrors_children() {
        let mut m = module_with_pad();
        m.flip(Point::new(0, 0));
        assert_eq!(m.layer, LAYER_BACK);
        assert_eq!(m.position, Point::new(10_000_000, -10_000_000));
        assert!(m.pads[0].layers.contains(LAYER_BACK));
        assert!(!m.pads[0].layers.contains(LAYER_FRONT));
    }

    #[test]
    fn bounding_box_covers_pads() {
        let m = module_with_pad();
        let bbox = m.bounding_box();
        assert!(bbox.contains(Point::new(11_000_000, 10_000_000)));
        assert!(bbox.contains(m.position));
    }
}
