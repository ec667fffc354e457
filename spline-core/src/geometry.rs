//! Bounding boxes, control points and exact shape geometry
//!
//! Every layer is placed by a [`Frame`]: an origin plus a signed size. Width
//! and height may go negative while a control point is dragged past the
//! opposite edge, so all containment tests normalise through min/max first.

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Position given to layers that have not been placed yet
pub const UNDEFINED: f64 = i32::MIN as f64;

/// Position and signed size of a layer's bounding box
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Frame {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A frame of the given size that has not been positioned yet
    pub fn unplaced(width: f64, height: f64) -> Self {
        Self::new(UNDEFINED, UNDEFINED, width, height)
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn mid_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn mid_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn center(&self) -> Point {
        Point::new(self.mid_x(), self.mid_y())
    }

    /// Normalised rectangle covering the frame
    pub fn to_rect(&self) -> Rect {
        Rect::new(self.left(), self.top(), self.right(), self.bottom()).abs()
    }

    /// Smallest frame spanning both (left/top minimum, right/bottom maximum)
    pub fn union(&self, other: &Frame) -> Frame {
        let x = self.left().min(other.left());
        let y = self.top().min(other.top());
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Frame::new(x, y, right - x, bottom - y)
    }

    /// Inclusive box test
    pub fn contains(&self, point: Point) -> bool {
        self.contains_inset(point, 0.0)
    }

    /// Inclusive box test against the frame shrunk by `inset` on every side
    pub fn contains_inset(&self, point: Point, inset: f64) -> bool {
        let r = self.to_rect();
        point.x >= r.x0 + inset
            && point.x <= r.x1 - inset
            && point.y >= r.y0 + inset
            && point.y <= r.y1 - inset
    }

    pub fn control_point(&self, point: ControlPoint) -> Point {
        use ControlPoint::*;
        match point {
            TopLeft => Point::new(self.left(), self.top()),
            MidTop => Point::new(self.mid_x(), self.top()),
            TopRight => Point::new(self.right(), self.top()),
            MidLeft => Point::new(self.left(), self.mid_y()),
            MidRight => Point::new(self.right(), self.mid_y()),
            BottomLeft => Point::new(self.left(), self.bottom()),
            MidBottom => Point::new(self.mid_x(), self.bottom()),
            BottomRight => Point::new(self.right(), self.bottom()),
        }
    }

    /// The eight control points in [`ControlPoint::ALL`] order
    pub fn control_points(&self) -> [(ControlPoint, Point); 8] {
        ControlPoint::ALL.map(|cp| (cp, self.control_point(cp)))
    }

    /// Control point nearest to `point`, with its distance
    pub fn closest_control_point(&self, point: Point) -> (ControlPoint, f64) {
        let mut best = (ControlPoint::TopLeft, f64::INFINITY);
        for (cp, p) in self.control_points() {
            let d = p.distance(point);
            if d < best.1 {
                best = (cp, d);
            }
        }
        best
    }
}

/// One of the eight handles on a layer's bounding box
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ControlPoint {
    TopLeft,
    MidTop,
    TopRight,
    MidLeft,
    MidRight,
    BottomLeft,
    MidBottom,
    BottomRight,
}

impl ControlPoint {
    pub const ALL: [ControlPoint; 8] = [
        ControlPoint::TopLeft,
        ControlPoint::MidTop,
        ControlPoint::TopRight,
        ControlPoint::MidLeft,
        ControlPoint::MidRight,
        ControlPoint::BottomLeft,
        ControlPoint::MidBottom,
        ControlPoint::BottomRight,
    ];

    pub fn is_left(self) -> bool {
        matches!(
            self,
            ControlPoint::TopLeft | ControlPoint::MidLeft | ControlPoint::BottomLeft
        )
    }

    pub fn is_top(self) -> bool {
        matches!(
            self,
            ControlPoint::TopLeft | ControlPoint::MidTop | ControlPoint::TopRight
        )
    }

    pub fn is_right(self) -> bool {
        matches!(
            self,
            ControlPoint::TopRight | ControlPoint::MidRight | ControlPoint::BottomRight
        )
    }

    pub fn is_bottom(self) -> bool {
        matches!(
            self,
            ControlPoint::BottomLeft | ControlPoint::MidBottom | ControlPoint::BottomRight
        )
    }
}

/// Exact-geometry hit test for a shape stretched across its frame
pub trait ShapeGeometry {
    /// True if `point` lies inside the shape. Callers that need the box test
    /// as well should combine it with [`Frame::contains`].
    fn contains(&self, frame: &Frame, point: Point) -> bool;
}

/// Axis-aligned rectangle filling the frame
pub struct RectGeometry;

/// Ellipse inscribed in the frame
pub struct OvalGeometry;

/// Isosceles triangle with its apex at the middle of the top edge
pub struct TriangleGeometry;

impl ShapeGeometry for RectGeometry {
    fn contains(&self, frame: &Frame, point: Point) -> bool {
        frame.contains(point)
    }
}

impl ShapeGeometry for OvalGeometry {
    fn contains(&self, frame: &Frame, point: Point) -> bool {
        let rx = frame.width / 2.0;
        let ry = frame.height / 2.0;
        let h = frame.mid_x();
        let k = frame.mid_y();
        let nx = (point.x - h) * (point.x - h) / (rx * rx);
        let ny = (point.y - k) * (point.y - k) / (ry * ry);
        nx + ny <= 1.0
    }
}

impl ShapeGeometry for TriangleGeometry {
    fn contains(&self, frame: &Frame, point: Point) -> bool {
        if !frame.contains(point) {
            return false;
        }

        let w = (frame.width / 2.0).abs();
        let h = frame.height.abs();

        let mut x = if frame.width > 0.0 {
            point.x - frame.left()
        } else {
            point.x - frame.right()
        };
        let y = if frame.height > 0.0 {
            frame.bottom() - point.y
        } else {
            point.y - frame.bottom()
        };

        // Fold the right half onto the left one
        if x > w {
            x = frame.width.abs() - x;
        }

        y / x <= h / w
    }
}
