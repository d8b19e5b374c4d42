//! Annotation composition onto captured images using tiny-skia
//!
//! These functions draw annotations onto an `RgbaImage` whose top-left corner
//! corresponds to `origin` in overlay-local logical coordinates.

use anyhow::Context;
use image::RgbaImage;
use tiny_skia::{Color, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

use super::geometry::{self, arrow, shape};
use crate::config::ShapeColor;
use crate::domain::{AnnotationItem, AnnotationKind, PenAnnotation, PixelateAnnotation, Point};

/// Draws annotation items onto a captured bitmap
pub trait Compositor {
    /// Draw `items` (already in ascending z-order) onto `base`
    fn composite(
        &self,
        base: &mut RgbaImage,
        items: &[AnnotationItem],
        origin: Point,
        scale: f64,
    ) -> anyhow::Result<()>;
}

/// Default compositor for vector annotations and redactions.
///
/// Glyph-based annotations (text content, stickers) are left to a compositor
/// with font support; only a text box background is drawn here.
#[derive(Debug, Default, Clone, Copy)]
pub struct SkiaCompositor;

impl Compositor for SkiaCompositor {
    fn composite(
        &self,
        base: &mut RgbaImage,
        items: &[AnnotationItem],
        origin: Point,
        scale: f64,
    ) -> anyhow::Result<()> {
        let mapping = Mapping {
            origin,
            scale: scale as f32,
        };
        for item in items {
            draw_item(base, &item.kind, &mapping)
                .with_context(|| format!("drawing {} {}", item.kind.name(), item.id))?;
        }
        Ok(())
    }
}

/// Logical-to-image coordinate conversion
struct Mapping {
    origin: Point,
    scale: f32,
}

impl Mapping {
    fn map(&self, p: Point) -> (f32, f32) {
        (
            (p.x - self.origin.x) as f32 * self.scale,
            (p.y - self.origin.y) as f32 * self.scale,
        )
    }
}

fn draw_item(img: &mut RgbaImage, kind: &AnnotationKind, m: &Mapping) -> anyhow::Result<()> {
    match kind {
        AnnotationKind::Text(text) => {
            if let Some(background) = text.background {
                let bounds = kind.bounds();
                fill_rect(img, m.map(bounds.top_left()), m.map(bounds.bottom_right()), background)?;
            }
            log::trace!("Text glyphs left to the host compositor");
            Ok(())
        }
        AnnotationKind::Sticker(_) => {
            log::trace!("Sticker glyphs left to the host compositor");
            Ok(())
        }
        AnnotationKind::Arrow(a) => with_pixmap(img, |pixmap| {
            let (sx, sy) = m.map(a.start);
            let (ex, ey) = m.map(a.end);
            let thickness = arrow::THICKNESS * m.scale;
            let head_size = arrow::HEAD_SIZE * m.scale;
            let outline = arrow::OUTLINE * m.scale;

            // Draw shadow/border first (thicker stroke)
            if a.shadow
                && let Some(path) = build_arrow_path(sx, sy, ex, ey, head_size + outline)
            {
                stroke(pixmap, &path, [0, 0, 0, 220], thickness + outline * 2.0);
            }
            if let Some(path) = build_arrow_path(sx, sy, ex, ey, head_size) {
                stroke(pixmap, &path, a.color.to_rgba_u8(), thickness);
            }
        }),
        AnnotationKind::Rectangle(s) | AnnotationKind::Ellipse(s) => {
            let ellipse = matches!(kind, AnnotationKind::Ellipse(_));
            with_pixmap(img, |pixmap| {
                let (x1, y1) = m.map(s.start);
                let (x2, y2) = m.map(s.end);
                let (min_x, min_y, max_x, max_y) = geometry::normalize_rect(x1, y1, x2, y2);
                let path = if ellipse {
                    let (cx, cy, rx, ry) =
                        geometry::ellipse_from_bounds(min_x, min_y, max_x, max_y);
                    build_ellipse_path(cx, cy, rx, ry)
                } else {
                    build_rect_path(min_x, min_y, max_x, max_y)
                };
                let Some(path) = path else {
                    return;
                };
                if s.shadow {
                    let border = (shape::BORDER_THICKNESS * m.scale).max(2.0);
                    stroke(pixmap, &path, [0, 0, 0, 220], border);
                }
                let thickness = (shape::THICKNESS * m.scale).max(1.0);
                stroke(pixmap, &path, s.color.to_rgba_u8(), thickness);
            })
        }
        AnnotationKind::Pen(pen) => draw_pen(img, pen, m),
        AnnotationKind::Redact(r) => fill_rect(img, m.map(r.start), m.map(r.end), ShapeColor::BLACK),
        AnnotationKind::Pixelate(p) => {
            pixelate(img, p, m);
            Ok(())
        }
    }
}

/// Convert RgbaImage to Pixmap, apply drawing function, and copy back
fn with_pixmap(img: &mut RgbaImage, f: impl FnOnce(&mut Pixmap)) -> anyhow::Result<()> {
    let (w, h) = (img.width(), img.height());
    let size = tiny_skia::IntSize::from_wh(w, h)
        .with_context(|| format!("cannot draw on a {w}x{h} image"))?;
    let mut pixmap = Pixmap::from_vec(img.as_raw().clone(), size)
        .context("image buffer does not match its dimensions")?;

    f(&mut pixmap);

    // Copy back
    img.copy_from_slice(pixmap.data());
    Ok(())
}

fn stroke(pixmap: &mut Pixmap, path: &tiny_skia::Path, [r, g, b, a]: [u8; 4], width: f32) {
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = true;

    let stroke = Stroke {
        width,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Default::default()
    };
    pixmap.stroke_path(path, &paint, &stroke, Transform::identity(), None);
}

fn fill_rect(
    img: &mut RgbaImage,
    (x1, y1): (f32, f32),
    (x2, y2): (f32, f32),
    color: ShapeColor,
) -> anyhow::Result<()> {
    let (min_x, min_y, max_x, max_y) = geometry::normalize_rect(x1, y1, x2, y2);
    let Some(rect) = tiny_skia::Rect::from_xywh(min_x, min_y, max_x - min_x, max_y - min_y) else {
        return Ok(());
    };
    with_pixmap(img, |pixmap| {
        let [r, g, b, _] = color.to_rgba_u8();
        let mut paint = Paint::default();
        paint.set_color(Color::from_rgba8(r, g, b, 255));
        pixmap.fill_rect(rect, &paint, Transform::identity(), None);
    })
}

fn draw_pen(img: &mut RgbaImage, pen: &PenAnnotation, m: &Mapping) -> anyhow::Result<()> {
    let mut points = pen.points.iter().map(|p| m.map(*p));
    let Some((x0, y0)) = points.next() else {
        return Ok(());
    };
    let mut pb = PathBuilder::new();
    pb.move_to(x0, y0);
    let mut segments = 0;
    for (x, y) in points {
        pb.line_to(x, y);
        segments += 1;
    }
    if segments == 0 {
        // Single click: a dot
        pb.line_to(x0 + 0.01, y0);
    }
    let Some(path) = pb.finish() else {
        return Ok(());
    };
    let width = (pen.thickness as f32 * m.scale).max(1.0);
    with_pixmap(img, |pixmap| stroke(pixmap, &path, pen.color.to_rgba_u8(), width))
}

/// Build an arrow path as stroked lines (shaft + two angled head lines)
fn build_arrow_path(
    start_x: f32,
    start_y: f32,
    end_x: f32,
    end_y: f32,
    head_size: f32,
) -> Option<tiny_skia::Path> {
    let (head1_x, head1_y, head2_x, head2_y) =
        arrow::head_points(start_x, start_y, end_x, end_y, head_size)?;

    let mut pb = PathBuilder::new();
    pb.move_to(start_x, start_y);
    pb.line_to(end_x, end_y);
    pb.move_to(end_x, end_y);
    pb.line_to(head1_x, head1_y);
    pb.move_to(end_x, end_y);
    pb.line_to(head2_x, head2_y);
    pb.finish()
}

fn build_rect_path(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    pb.move_to(min_x, min_y);
    pb.line_to(max_x, min_y);
    pb.line_to(max_x, max_y);
    pb.line_to(min_x, max_y);
    pb.close();
    pb.finish()
}

/// Build an ellipse path using cubic bezier curves
fn build_ellipse_path(cx: f32, cy: f32, rx: f32, ry: f32) -> Option<tiny_skia::Path> {
    let kx = rx * shape::BEZIER_K;
    let ky = ry * shape::BEZIER_K;

    let mut pb = PathBuilder::new();
    pb.move_to(cx, cy - ry);
    pb.cubic_to(cx + kx, cy - ry, cx + rx, cy - ky, cx + rx, cy);
    pb.cubic_to(cx + rx, cy + ky, cx + kx, cy + ry, cx, cy + ry);
    pb.cubic_to(cx - kx, cy + ry, cx - rx, cy + ky, cx - rx, cy);
    pb.cubic_to(cx - rx, cy - ky, cx - kx, cy - ry, cx, cy - ry);
    pb.close();
    pb.finish()
}

/// Replace each block of the region with its average color
fn pixelate(img: &mut RgbaImage, p: &PixelateAnnotation, m: &Mapping) {
    if img.width() == 0 || img.height() == 0 {
        return;
    }
    // Scale the block size from display pixels to image pixels
    let block_size = ((p.block_size as f32) * m.scale).round().max(1.0) as u32;
    let (x1, y1) = m.map(p.start);
    let (x2, y2) = m.map(p.end);
    let (min_x, min_y, max_x, max_y) = geometry::normalize_rect(x1, y1, x2, y2);
    if max_x < 0.0 || max_y < 0.0 {
        return;
    }

    let min_x = (min_x.round().max(0.0) as u32).min(img.width() - 1);
    let min_y = (min_y.round().max(0.0) as u32).min(img.height() - 1);
    let max_x = (max_x.round() as u32).min(img.width() - 1);
    let max_y = (max_y.round() as u32).min(img.height() - 1);

    let mut block_y = min_y;
    while block_y <= max_y {
        let block_end_y = (block_y + block_size - 1).min(max_y);
        let mut block_x = min_x;
        while block_x <= max_x {
            let block_end_x = (block_x + block_size - 1).min(max_x);

            let mut totals = [0u64; 4];
            let mut pixel_count: u64 = 0;
            for py in block_y..=block_end_y {
                for px in block_x..=block_end_x {
                    let pixel = img.get_pixel(px, py);
                    for (total, channel) in totals.iter_mut().zip(pixel.0) {
                        *total += channel as u64;
                    }
                    pixel_count += 1;
                }
            }

            if pixel_count > 0 {
                let avg = image::Rgba(totals.map(|t| (t / pixel_count) as u8));
                for py in block_y..=block_end_y {
                    for px in block_x..=block_end_x {
                        img.put_pixel(px, py, avg);
                    }
                }
            }
            block_x += block_size;
        }
        block_y += block_size;
    }
}
