//! Free-standing graphic items: segments, texts, dimensions, and targets.

use boardkit_core::geometry::{mirror_point_y, rotate_point, BoundingBox, Point};
use boardkit_core::layer::LayerNum;

use crate::track::{distance_to_segment, flipped_layer};

/// Geometric form of a graphic segment.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    Line,
    /// Arc centered at `start`, starting at `end`, sweeping `angle`
    /// decidegrees.
    Arc { angle: i32 },
    /// Circle centered at `start` with `end` on the circumference.
    Circle,
    /// Cubic Bezier from `start` to `end` with two control points.
    Curve { ctrl1: Point, ctrl2: Point },
    /// Closed polygon; `start`/`end` are unused beyond the corner list.
    Polygon(Vec<Point>),
}

/// A free-standing graphic segment on any layer.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawSegment {
    pub tstamp: u64,
    pub shape: ShapeKind,
    pub start: Point,
    pub end: Point,
    pub width: i32,
    pub layer: LayerNum,
}

impl DrawSegment {
    pub fn new_line(start: Point, end: Point, width: i32, layer: LayerNum) -> Self {
        Self {
            tstamp: crate::fresh_tstamp(),
            shape: ShapeKind::Line,
            start,
            end,
            width,
            layer,
        }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let mut bbox = match &self.shape {
            ShapeKind::Circle => {
                let radius = self.start.distance_to(self.end).ceil() as i32;
                let mut b = BoundingBox::new(self.start, self.start);
                b.inflate(radius);
                b
            }
            ShapeKind::Polygon(points) if !points.is_empty() => BoundingBox::from_points(points),
            ShapeKind::Curve { ctrl1, ctrl2 } => {
                let mut b = BoundingBox::new(self.start, self.end);
                b.merge_point(*ctrl1);
                b.merge_point(*ctrl2);
                b
            }
            // An arc is bounded conservatively by its full circle.
            ShapeKind::Arc { .. } => {
                let radius = self.start.distance_to(self.end).ceil() as i32;
                let mut b = BoundingBox::new(self.start, self.start);
                b.inflate(radius);
                b
            }
            _ => BoundingBox::new(self.start, self.end),
        };
        bbox.inflate(self.width / 2);
        bbox
    }

    pub fn translate(&mut self, vector: Point) {
        self.start += vector;
        self.end += vector;
        match &mut self.shape {
            ShapeKind::Curve { ctrl1, ctrl2 } => {
                *ctrl1 += vector;
                *ctrl2 += vector;
            }
            ShapeKind::Polygon(points) => {
                for p in points {
                    *p += vector;
                }
            }
            _ => {}
        }
    }

    pub fn rotate(&mut self, center: Point, angle_decideg: i32) {
        self.start = rotate_point(self.start, center, angle_decideg);
        self.end = rotate_point(self.end, center, angle_decideg);
        match &mut self.shape {
            ShapeKind::Curve { ctrl1, ctrl2 } => {
                *ctrl1 = rotate_point(*ctrl1, center, angle_decideg);
                *ctrl2 = rotate_point(*ctrl2, center, angle_decideg);
            }
            ShapeKind::Polygon(points) => {
                for p in points {
                    *p = rotate_point(*p, center, angle_decideg);
                }
            }
            _ => {}
        }
    }

    pub fn flip(&mut self, center: Point) {
        self.start = mirror_point_y(self.start, center);
        self.end = mirror_point_y(self.end, center);
        match &mut self.shape {
            ShapeKind::Curve { ctrl1, ctrl2 } => {
                *ctrl1 = mirror_point_y(*ctrl1, center);
                *ctrl2 = mirror_point_y(*ctrl2, center);
            }
            ShapeKind::Polygon(points) => {
                for p in points {
                    *p = mirror_point_y(*p, center);
                }
            }
            ShapeKind::Arc { angle } => *angle = -*angle,
            _ => {}
        }
        self.layer = flipped_layer(self.layer);
    }

    pub fn hit_test(&self, p: Point) -> bool {
        let half_width = self.width.max(1) as f64 / 2.0;
        match &self.shape {
            ShapeKind::Circle | ShapeKind::Arc { .. } => {
                let radius = self.start.distance_to(self.end);
                (self.start.distance_to(p) - radius).abs() <= half_width
            }
            ShapeKind::Polygon(points) => points.windows(2).any(|w| {
                distance_to_segment(p, w[0], w[1]) <= half_width
            }),
            _ => distance_to_segment(p, self.start, self.end) <= half_width,
        }
    }
}

/// A free text on the board.
#[derive(Debug, Clone, PartialEq)]
pub struct TextItem {
    pub tstamp: u64,
    pub text: String,
    pub position: Point,
    pub orientation: i32,
    pub layer: LayerNum,
    /// Character cell (width, height).
    pub size: Point,
    pub thickness: i32,
    pub italic: bool,
    pub mirrored: bool,
    pub visible: bool,
}

impl TextItem {
    pub fn new(text: &str, position: Point, layer: LayerNum) -> Self {
        Self {
            tstamp: crate::fresh_tstamp(),
            text: text.to_string(),
            position,
            orientation: 0,
            layer,
            size: Point::new(1_500_000, 1_500_000),
            thickness: 300_000,
            italic: false,
            mirrored: false,
            visible: true,
        }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        // Approximate extent from the glyph cell; fine for selection and
        // block framing, not for rendering.
        let half_w = self.size.x * self.text.chars().count().max(1) as i32 / 2;
        let half_h = self.size.y / 2;
        BoundingBox::new(
            Point::new(self.position.x - half_w, self.position.y - half_h),
            Point::new(self.position.x + half_w, self.position.y + half_h),
        )
    }

    pub fn translate(&mut self, vector: Point) {
        self.position += vector;
    }

    pub fn rotate(&mut self, center: Point, angle_decideg: i32) {
        self.position = rotate_point(self.position, center, angle_decideg);
        self.orientation = (self.orientation + angle_decideg).rem_euclid(3600);
    }

    pub fn flip(&mut self, center: Point) {
        self.position = mirror_point_y(self.position, center);
        self.layer = flipped_layer(self.layer);
        self.mirrored = !self.mirrored;
    }

    pub fn hit_test(&self, p: Point) -> bool {
        self.bounding_box().contains(p)
    }
}

/// A measurement annotation: a crossbar, two feature lines, four arrow
/// strokes, and the measurement text.
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    pub tstamp: u64,
    /// Measured distance in internal units.
    pub value: i32,
    pub width: i32,
    pub layer: LayerNum,
    pub text: TextItem,
    pub crossbar: (Point, Point),
    pub feature1: (Point, Point),
    pub feature2: (Point, Point),
    pub arrow1a: (Point, Point),
    pub arrow1b: (Point, Point),
    pub arrow2a: (Point, Point),
    pub arrow2b: (Point, Point),
}

impl Dimension {
    pub fn segments(&self) -> [(Point, Point); 7] {
        [
            self.crossbar,
            self.feature1,
            self.feature2,
            self.arrow1a,
            self.arrow1b,
            self.arrow2a,
            self.arrow2b,
        ]
    }

    fn segments_mut(&mut self) -> [&mut (Point, Point); 7] {
        [
            &mut self.crossbar,
            &mut self.feature1,
            &mut self.feature2,
            &mut self.arrow1a,
            &mut self.arrow1b,
            &mut self.arrow2a,
            &mut self.arrow2b,
        ]
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let mut bbox = self.text.bounding_box();
        for (a, b) in self.segments() {
            bbox.merge_point(a);
            bbox.merge_point(b);
        }
        bbox
    }

    pub fn translate(&mut self, vector: Point) {
        for seg in self.segments_mut() {
            seg.0 += vector;
            seg.1 += vector;
        }
        self.text.translate(vector);
    }

    pub fn rotate(&mut self, center: Point, angle_decideg: i32) {
        for seg in self.segments_mut() {
            seg.0 = rotate_point(seg.0, center, angle_decideg);
            seg.1 = rotate_point(seg.1, center, angle_decideg);
        }
        self.text.rotate(center, angle_decideg);
    }

    pub fn flip(&mut self, center: Point) {
        for seg in self.segments_mut() {
            seg.0 = mirror_point_y(seg.0, center);
            seg.1 = mirror_point_y(seg.1, center);
        }
        self.text.flip(center);
        self.layer = flipped_layer(self.layer);
    }

    pub fn hit_test(&self, p: Point) -> bool {
        let half_width = self.width.max(1) as f64 / 2.0;
        self.segments()
            .iter()
            .any(|(a, b)| distance_to_segment(p, *a, *b) <= half_width)
            || self.text.hit_test(p)
    }
}

/// Alignment target shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetShape {
    Plus,
    X,
}

/// A layer-alignment target (photo tool registration mark).
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub tstamp: u64,
    pub shape: TargetShape,
    pub position: Point,
    pub size: i32,
    pub width: i32,
    pub layer: LayerNum,
}

impl Target {
    pub fn bounding_box(&self) -> BoundingBox {
        let mut bbox = BoundingBox::new(self.position, self.position);
        bbox.inflate(self.size / 2 + self.width);
        bbox
    }

    pub fn translate(&mut self, vector: Point) {
        self.position += vector;
    }

    pub fn rotate(&mut self, center: Point, angle_decideg: i32) {
        self.position = rotate_point(self.position, center, angle_decideg);
    }

    pub fn flip(&mut self, center: Point) {
        self.position = mirror_point_y(self.position, center);
        self.layer = flipped_layer(self.layer);
    }

    pub fn hit_test(&self, p: Point) -> bool {
        self.bounding_box().contains(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_bbox_includes_width() {
        let line = DrawSegment::new_line(Point::new(0, 0), Point::new(100, 0), 10, 0);
        let bbox = line.bounding_box();
        assert_eq!(bbox.min(), Point::new(-5, -5));
        assert_eq!(bbox.max(), Point::new(105, 5));
    }

    #[test]
    fn polygon_transforms_carry_corners() {
        let mut poly = DrawSegment::new_line(Point::new(0, 0), Point::new(0, 0), 10, 0);
        poly.shape = ShapeKind::Polygon(vec![
            Point::new(0, 0),
            Point::new(100, 0),
            Point::new(100, 100),
        ]);
        poly.translate(Point::new(10, 20));
        match &poly.shape {
            ShapeKind::Polygon(pts) => assert_eq!(pts[1], Point::new(110, 20)),
            _ => unreachable!(),
        }
    }

    #[test]
    fn text_rotation_wraps_orientation() {
        let mut text = TextItem::new("REF", Point::new(0, 0), 21);
        text.orientation = 2700;
        text.rotate(Point::new(0, 0), 1800);
        assert_eq!(text.orientation, 900);
    }
}
