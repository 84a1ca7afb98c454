//! Raster preview of a string art result.
//!
//! Mirrors the SVG export: white background, connections stroked one by
//! one per quality tier (lowest first) so overlapping threads darken the
//! way real thread does, pins filled on top.

use strand_export::quality::group_by_tier;
use strand_export::svg::PIN_RADIUS;
use strand_pipeline::{RgbaImage, StringArtResult};
use tiny_skia::{Color, FillRule, LineCap, Paint, PathBuilder, Pixmap, Stroke, Transform};

/// Pin fill color, `#2d3748`.
const PIN_RGB: [u8; 3] = [0x2d, 0x37, 0x48];

/// Render `result` at canvas resolution.
///
/// Returns `None` for an empty canvas.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn render_preview(result: &StringArtResult, line_opacity: f64) -> Option<RgbaImage> {
    let dims = result.dimensions();
    let mut pixmap = Pixmap::new(dims.width, dims.height)?;
    pixmap.fill(Color::WHITE);

    for (tier, connections) in group_by_tier(&result.connections) {
        let alpha = (line_opacity * tier.opacity_factor()).clamp(0.0, 1.0);
        let mut paint = Paint::default();
        paint.set_color_rgba8(0, 0, 0, (alpha * 255.0).round() as u8);
        paint.anti_alias = true;
        let stroke = Stroke {
            width: tier.stroke_width() as f32,
            line_cap: LineCap::Round,
            ..Stroke::default()
        };

        for c in connections {
            let (Some(a), Some(b)) = (result.pins.get(c.from), result.pins.get(c.to)) else {
                continue;
            };
            let mut pb = PathBuilder::new();
            pb.move_to(a.x as f32, a.y as f32);
            pb.line_to(b.x as f32, b.y as f32);
            if let Some(path) = pb.finish() {
                pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
            }
        }
    }

    let mut pin_paint = Paint::default();
    let [r, g, b] = PIN_RGB;
    pin_paint.set_color_rgba8(r, g, b, 255);
    pin_paint.anti_alias = true;
    for pin in &result.pins {
        if let Some(circle) = PathBuilder::from_circle(pin.x as f32, pin.y as f32, PIN_RADIUS as f32)
        {
            pixmap.fill_path(
                &circle,
                &pin_paint,
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }
    }

    // The background is opaque, so premultiplied and straight RGBA agree.
    RgbaImage::from_raw(dims.width, dims.height, pixmap.take())
}
