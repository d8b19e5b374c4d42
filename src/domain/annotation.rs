//! Annotation types for drawing on screenshots
//!
//! All annotation geometry is stored in overlay-local logical coordinates.

use std::fmt;

use chrono::{DateTime, Local};

use super::geometry::{Point, Rect};
use crate::config::ShapeColor;
use crate::error::{OverlayError, Result};

/// Identifier of an annotation, unique within one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnnotationId(pub u64);

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-item interaction state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemState {
    #[default]
    Normal,
    Selected,
    /// Text content being edited in place
    Editing,
}

/// Free text label
#[derive(Clone, Debug, PartialEq)]
pub struct TextAnnotation {
    /// Top-left of the text box
    pub origin: Point,
    pub text: String,
    pub font_size: f64,
    pub color: ShapeColor,
    /// Optional filled box behind the text
    pub background: Option<ShapeColor>,
}

impl TextAnnotation {
    /// Approximate advance per character relative to the font size
    const CHAR_WIDTH: f64 = 0.6;
    const LINE_HEIGHT: f64 = 1.25;

    /// Layout estimate used for hit-testing and dirty regions
    fn bounds(&self) -> Rect {
        let lines = self.text.lines().count().max(1);
        let longest = self
            .text
            .lines()
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0)
            .max(1);
        Rect::from_xywh(
            self.origin.x,
            self.origin.y,
            longest as f64 * self.font_size * Self::CHAR_WIDTH,
            lines as f64 * self.font_size * Self::LINE_HEIGHT,
        )
    }
}

/// Emoji or sticker glyph scaled into a box
#[derive(Clone, Debug, PartialEq)]
pub struct StickerAnnotation {
    pub glyph: String,
    pub bounds: Rect,
}

/// Arrow from start to end with the head at `end`
#[derive(Clone, Debug, PartialEq)]
pub struct ArrowAnnotation {
    pub start: Point,
    pub end: Point,
    pub color: ShapeColor,
    /// Whether to draw shadow/border
    pub shadow: bool,
}

/// Outline rectangle or ellipse spanned by two corners
#[derive(Clone, Debug, PartialEq)]
pub struct ShapeAnnotation {
    pub start: Point,
    pub end: Point,
    pub color: ShapeColor,
    pub shadow: bool,
}

/// Freehand stroke
#[derive(Clone, Debug, PartialEq)]
pub struct PenAnnotation {
    pub points: Vec<Point>,
    pub color: ShapeColor,
    pub thickness: f64,
}

/// Black box hiding sensitive content
#[derive(Clone, Debug, PartialEq)]
pub struct RedactAnnotation {
    pub start: Point,
    pub end: Point,
}

/// Pixelation block over sensitive content
#[derive(Clone, Debug, PartialEq)]
pub struct PixelateAnnotation {
    pub start: Point,
    pub end: Point,
    pub block_size: u32,
}

/// Closed set of annotation variants
#[derive(Clone, Debug, PartialEq)]
pub enum AnnotationKind {
    Text(TextAnnotation),
    Sticker(StickerAnnotation),
    Arrow(ArrowAnnotation),
    Rectangle(ShapeAnnotation),
    Ellipse(ShapeAnnotation),
    Pen(PenAnnotation),
    Redact(RedactAnnotation),
    Pixelate(PixelateAnnotation),
}

impl AnnotationKind {
    pub fn name(&self) -> &'static str {
        match self {
            AnnotationKind::Text(_) => "text",
            AnnotationKind::Sticker(_) => "sticker",
            AnnotationKind::Arrow(_) => "arrow",
            AnnotationKind::Rectangle(_) => "rectangle",
            AnnotationKind::Ellipse(_) => "ellipse",
            AnnotationKind::Pen(_) => "pen",
            AnnotationKind::Redact(_) => "redact",
            AnnotationKind::Pixelate(_) => "pixelate",
        }
    }

    /// Check if this is a shape annotation (arrow, ellipse, rectangle, pen)
    pub fn is_shape(&self) -> bool {
        matches!(
            self,
            AnnotationKind::Arrow(_)
                | AnnotationKind::Ellipse(_)
                | AnnotationKind::Rectangle(_)
                | AnnotationKind::Pen(_)
        )
    }

    /// Check if this is a redaction annotation (redact, pixelate)
    pub fn is_redaction(&self) -> bool {
        matches!(self, AnnotationKind::Redact(_) | AnnotationKind::Pixelate(_))
    }

    /// Geometric extent, not including stroke width
    pub fn bounds(&self) -> Rect {
        match self {
            AnnotationKind::Text(t) => t.bounds(),
            AnnotationKind::Sticker(s) => s.bounds.normalized(),
            AnnotationKind::Arrow(a) => Rect::from_points(a.start, a.end),
            AnnotationKind::Rectangle(s) | AnnotationKind::Ellipse(s) => {
                Rect::from_points(s.start, s.end)
            }
            AnnotationKind::Pen(p) => Rect::bounding(&p.points).unwrap_or_default(),
            AnnotationKind::Redact(r) => Rect::from_points(r.start, r.end),
            AnnotationKind::Pixelate(p) => Rect::from_points(p.start, p.end),
        }
    }

    /// Control points in a fixed per-variant order
    pub fn points(&self) -> Vec<Point> {
        match self {
            AnnotationKind::Text(t) => vec![t.origin],
            AnnotationKind::Sticker(s) => vec![s.bounds.top_left(), s.bounds.bottom_right()],
            AnnotationKind::Arrow(a) => vec![a.start, a.end],
            AnnotationKind::Rectangle(s) | AnnotationKind::Ellipse(s) => vec![s.start, s.end],
            AnnotationKind::Pen(p) => p.points.clone(),
            AnnotationKind::Redact(r) => vec![r.start, r.end],
            AnnotationKind::Pixelate(p) => vec![p.start, p.end],
        }
    }

    /// Replace control points; the count must match [`AnnotationKind::points`]
    pub fn set_points(&mut self, id: AnnotationId, points: &[Point]) -> Result<()> {
        let expected = self.points().len();
        if points.len() != expected {
            return Err(OverlayError::PointCountMismatch {
                id,
                expected,
                actual: points.len(),
            });
        }
        match self {
            AnnotationKind::Text(t) => t.origin = points[0],
            AnnotationKind::Sticker(s) => s.bounds = Rect::from_points(points[0], points[1]),
            AnnotationKind::Arrow(a) => {
                a.start = points[0];
                a.end = points[1];
            }
            AnnotationKind::Rectangle(s) | AnnotationKind::Ellipse(s) => {
                s.start = points[0];
                s.end = points[1];
            }
            AnnotationKind::Pen(p) => p.points.copy_from_slice(points),
            AnnotationKind::Redact(r) => {
                r.start = points[0];
                r.end = points[1];
            }
            AnnotationKind::Pixelate(p) => {
                p.start = points[0];
                p.end = points[1];
            }
        }
        Ok(())
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        match self {
            AnnotationKind::Text(t) => t.origin = t.origin.translate(dx, dy),
            AnnotationKind::Sticker(s) => s.bounds = s.bounds.translate(dx, dy),
            AnnotationKind::Pen(p) => {
                for point in &mut p.points {
                    *point = point.translate(dx, dy);
                }
            }
            AnnotationKind::Arrow(_)
            | AnnotationKind::Rectangle(_)
            | AnnotationKind::Ellipse(_)
            | AnnotationKind::Redact(_)
            | AnnotationKind::Pixelate(_) => self.map_two_points(|p| p.translate(dx, dy)),
        }
    }

    /// Scale geometry about a pivot. Text scales its font by the vertical factor.
    pub fn scale_about(&mut self, pivot: Point, sx: f64, sy: f64) {
        match self {
            AnnotationKind::Text(t) => {
                t.origin = t.origin.scale_about(pivot, sx, sy);
                t.font_size *= sy.abs();
            }
            AnnotationKind::Sticker(s) => {
                s.bounds = Rect::from_points(
                    s.bounds.top_left().scale_about(pivot, sx, sy),
                    s.bounds.bottom_right().scale_about(pivot, sx, sy),
                );
            }
            AnnotationKind::Pen(p) => {
                for point in &mut p.points {
                    *point = point.scale_about(pivot, sx, sy);
                }
            }
            AnnotationKind::Arrow(_)
            | AnnotationKind::Rectangle(_)
            | AnnotationKind::Ellipse(_)
            | AnnotationKind::Redact(_)
            | AnnotationKind::Pixelate(_) => self.map_two_points(|p| p.scale_about(pivot, sx, sy)),
        }
    }

    fn map_two_points(&mut self, f: impl Fn(Point) -> Point) {
        let (start, end) = match self {
            AnnotationKind::Arrow(a) => (&mut a.start, &mut a.end),
            AnnotationKind::Rectangle(s) | AnnotationKind::Ellipse(s) => (&mut s.start, &mut s.end),
            AnnotationKind::Redact(r) => (&mut r.start, &mut r.end),
            AnnotationKind::Pixelate(p) => (&mut p.start, &mut p.end),
            AnnotationKind::Text(_) | AnnotationKind::Sticker(_) | AnnotationKind::Pen(_) => {
                return;
            }
        };
        *start = f(*start);
        *end = f(*end);
    }

    /// Whether `point` hits the annotation within `tolerance` logical pixels
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        match self {
            AnnotationKind::Text(_)
            | AnnotationKind::Sticker(_)
            | AnnotationKind::Redact(_)
            | AnnotationKind::Pixelate(_) => {
                self.bounds().inflate(tolerance).contains_point(point)
            }
            AnnotationKind::Arrow(a) => segment_distance(point, a.start, a.end) <= tolerance,
            AnnotationKind::Pen(p) => match p.points.as_slice() {
                [] => false,
                [only] => only.distance(point) <= tolerance + p.thickness * 0.5,
                points => points
                    .windows(2)
                    .any(|w| segment_distance(point, w[0], w[1]) <= tolerance + p.thickness * 0.5),
            },
            AnnotationKind::Rectangle(s) => {
                let r = Rect::from_points(s.start, s.end);
                r.inflate(tolerance).contains_point(point)
                    && !r.inflate(-tolerance).contains_point(point)
            }
            AnnotationKind::Ellipse(s) => {
                let r = Rect::from_points(s.start, s.end);
                let c = r.center();
                let rx = (r.width() * 0.5).max(1.0);
                let ry = (r.height() * 0.5).max(1.0);
                let nx = (point.x - c.x) / rx;
                let ny = (point.y - c.y) / ry;
                let dist = (nx * nx + ny * ny).sqrt();
                (dist - 1.0).abs() * rx.min(ry) <= tolerance
            }
        }
    }
}

/// Distance from `p` to the segment `a`-`b`
fn segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance(Point::new(a.x + t * dx, a.y + t * dy))
}

/// One annotation owned by a session's collection
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotationItem {
    pub id: AnnotationId,
    pub z_index: i64,
    pub state: ItemState,
    pub created_at: DateTime<Local>,
    pub modified_at: DateTime<Local>,
    pub kind: AnnotationKind,
}

impl AnnotationItem {
    pub fn new(id: AnnotationId, z_index: i64, kind: AnnotationKind) -> Self {
        let now = Local::now();
        Self {
            id,
            z_index,
            state: ItemState::Normal,
            created_at: now,
            modified_at: now,
            kind,
        }
    }

    pub fn bounds(&self) -> Rect {
        self.kind.bounds()
    }

    /// Bump the modification timestamp
    pub fn touch(&mut self) {
        self.modified_at = Local::now();
    }

    pub fn is_selected(&self) -> bool {
        matches!(self.state, ItemState::Selected | ItemState::Editing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arrow() -> AnnotationKind {
        AnnotationKind::Arrow(ArrowAnnotation {
            start: Point::new(0.0, 0.0),
            end: Point::new(100.0, 0.0),
            color: ShapeColor::default(),
            shadow: true,
        })
    }

    fn every_kind() -> Vec<AnnotationKind> {
        let shape = ShapeAnnotation {
            start: Point::new(10.0, 10.0),
            end: Point::new(50.0, 30.0),
            color: ShapeColor::default(),
            shadow: false,
        };
        vec![
            AnnotationKind::Text(TextAnnotation {
                origin: Point::new(5.0, 5.0),
                text: "hi".into(),
                font_size: 10.0,
                color: ShapeColor::BLACK,
                background: None,
            }),
            AnnotationKind::Sticker(StickerAnnotation {
                glyph: "🙂".into(),
                bounds: Rect::from_xywh(0.0, 0.0, 32.0, 32.0),
            }),
            arrow(),
            AnnotationKind::Rectangle(shape.clone()),
            AnnotationKind::Ellipse(shape),
            AnnotationKind::Pen(PenAnnotation {
                points: vec![Point::new(0.0, 0.0), Point::new(5.0, 5.0), Point::new(9.0, 2.0)],
                color: ShapeColor::default(),
                thickness: 3.0,
            }),
            AnnotationKind::Redact(RedactAnnotation {
                start: Point::new(0.0, 0.0),
                end: Point::new(20.0, 20.0),
            }),
            AnnotationKind::Pixelate(PixelateAnnotation {
                start: Point::new(0.0, 0.0),
                end: Point::new(20.0, 20.0),
                block_size: 8,
            }),
        ]
    }

    #[test]
    fn test_translate_moves_bounds_for_every_kind() {
        for mut kind in every_kind() {
            let before = kind.bounds();
            kind.translate(7.0, -3.0);
            let after = kind.bounds();
            assert!((after.left - before.left - 7.0).abs() < 1e-9, "{}", kind.name());
            assert!((after.top - before.top + 3.0).abs() < 1e-9, "{}", kind.name());
        }
    }

    #[test]
    fn test_points_roundtrip_for_every_kind() {
        for mut kind in every_kind() {
            let original = kind.clone();
            let moved: Vec<Point> = kind.points().iter().map(|p| p.translate(1.0, 1.0)).collect();
            kind.set_points(AnnotationId(1), &moved).unwrap();
            assert_eq!(kind.points(), moved);
            kind.set_points(AnnotationId(1), &original.points()).unwrap();
            assert_eq!(kind, original);
        }
    }

    #[test]
    fn test_set_points_rejects_wrong_count() {
        let mut kind = arrow();
        let err = kind
            .set_points(AnnotationId(3), &[Point::default()])
            .unwrap_err();
        assert_eq!(
            err,
            OverlayError::PointCountMismatch {
                id: AnnotationId(3),
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_scale_then_reciprocal_restores() {
        for mut kind in every_kind() {
            let original = kind.bounds();
            let pivot = Point::new(3.0, 4.0);
            kind.scale_about(pivot, 2.0, 0.5);
            kind.scale_about(pivot, 0.5, 2.0);
            let restored = kind.bounds();
            assert!((restored.left - original.left).abs() < 1e-9, "{}", kind.name());
            assert!((restored.bottom - original.bottom).abs() < 1e-9, "{}", kind.name());
        }
    }

    #[test]
    fn test_arrow_hit_test() {
        let kind = arrow();
        assert!(kind.hit_test(Point::new(50.0, 2.0), 4.0));
        assert!(!kind.hit_test(Point::new(50.0, 20.0), 4.0));
        assert!(!kind.hit_test(Point::new(120.0, 0.0), 4.0));
    }

    #[test]
    fn test_rectangle_hit_test_only_on_outline() {
        let kind = AnnotationKind::Rectangle(ShapeAnnotation {
            start: Point::new(0.0, 0.0),
            end: Point::new(100.0, 100.0),
            color: ShapeColor::default(),
            shadow: false,
        });
        assert!(kind.hit_test(Point::new(1.0, 50.0), 3.0));
        assert!(!kind.hit_test(Point::new(50.0, 50.0), 3.0));
    }

    #[test]
    fn test_shape_and_redaction_partition() {
        for kind in every_kind() {
            assert!(!(kind.is_shape() && kind.is_redaction()), "{}", kind.name());
        }
    }
}
