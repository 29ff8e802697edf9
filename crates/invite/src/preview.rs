//! Position markers on a page preview raster

use crate::geometry::Viewport;
use crate::positions::Position;
use image::{imageops, Rgba, RgbaImage};
use pdf_core::Color;

/// Marker disc radius in preview pixels
pub const MARKER_RADIUS: f64 = 10.0;
/// Width of the white ring around the disc
pub const MARKER_OUTLINE: f64 = 2.0;

const MARKER_FILL: Color = Color::red();
const MARKER_RING: Color = Color::white();

/// A white preview surface for a page of the given size in points
pub fn blank_canvas(page_width: f32, page_height: f32, viewport: &Viewport) -> RgbaImage {
    let (w, h) = viewport.canvas_size(page_width, page_height);
    RgbaImage::from_pixel(w, h, Color::white().to_rgba())
}

/// Scale a caller-supplied page raster to the viewport's preview size
pub fn fit_background(
    background: &RgbaImage,
    page_width: f32,
    page_height: f32,
    viewport: &Viewport,
) -> RgbaImage {
    let (w, h) = viewport.canvas_size(page_width, page_height);
    if background.dimensions() == (w, h) {
        return background.clone();
    }
    imageops::resize(background, w, h, imageops::FilterType::Triangle)
}

/// Draw one marker centred on a preview pixel coordinate
///
/// Parts of the marker outside the canvas are clipped.
pub fn draw_marker(canvas: &mut RgbaImage, center_x: f64, center_y: f64) {
    let outer = MARKER_RADIUS + MARKER_OUTLINE;
    let (width, height) = canvas.dimensions();

    let x_min = (center_x - outer).floor().max(0.0) as u32;
    let y_min = (center_y - outer).floor().max(0.0) as u32;
    let x_max = ((center_x + outer).ceil().max(0.0) as u32).min(width);
    let y_max = ((center_y + outer).ceil().max(0.0) as u32).min(height);

    let fill: Rgba<u8> = MARKER_FILL.to_rgba();
    let ring: Rgba<u8> = MARKER_RING.to_rgba();

    for py in y_min..y_max {
        for px in x_min..x_max {
            // Sample at the pixel centre
            let dx = px as f64 + 0.5 - center_x;
            let dy = py as f64 + 0.5 - center_y;
            let dist = (dx * dx + dy * dy).sqrt();

            if dist <= MARKER_RADIUS {
                canvas.put_pixel(px, py, fill);
            } else if dist <= outer {
                canvas.put_pixel(px, py, ring);
            }
        }
    }
}

/// Draw a marker for every position, mapped through the viewport
///
/// Returns the number of markers drawn.
pub fn draw_markers<'a, I>(canvas: &mut RgbaImage, positions: I, viewport: &Viewport) -> usize
where
    I: IntoIterator<Item = &'a Position>,
{
    let mut count = 0;
    for position in positions {
        let (sx, sy) = viewport.to_screen(position.x, position.y);
        draw_marker(canvas, sx, sy);
        count += 1;
    }
    count
}
