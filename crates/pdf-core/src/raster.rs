//! Overlay rasterization
//!
//! An [`OverlayLayer`] is a transparent RGBA raster covering a whole page at
//! a fixed number of pixels per point. Its origin is the top-left corner of
//! the page and y grows downward, matching the preview surface.

use crate::{FontData, PdfError, Result, ShapedRun};
use ab_glyph::{point, Font, GlyphId, PxScale};
use image::{Rgba, RgbaImage};

/// Largest raster edge accepted, in pixels
const MAX_LAYER_EDGE: u32 = 16_384;

/// RGBA color (values 0 - 255, straight alpha)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Create an opaque color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Create a color with explicit alpha
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn black() -> Self {
        Self::rgb(0, 0, 0)
    }

    pub const fn white() -> Self {
        Self::rgb(255, 255, 255)
    }

    pub const fn red() -> Self {
        Self::rgb(255, 0, 0)
    }

    pub const fn blue() -> Self {
        Self::rgb(0, 0, 255)
    }

    pub const fn gold() -> Self {
        Self::rgb(255, 215, 0)
    }

    pub const fn green() -> Self {
        Self::rgb(0, 128, 0)
    }

    pub const fn maroon() -> Self {
        Self::rgb(128, 0, 0)
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, self.a])
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

/// A transparent page-sized raster that shaped text is drawn onto
#[derive(Debug, Clone)]
pub struct OverlayLayer {
    image: RgbaImage,
    /// Pixels per PDF point
    scale: f32,
    page_width: f32,
    page_height: f32,
}

impl OverlayLayer {
    /// Create a transparent layer for a page
    ///
    /// # Arguments
    /// * `page_width` - Page width in points
    /// * `page_height` - Page height in points
    /// * `scale` - Pixels per point
    pub fn new(page_width: f32, page_height: f32, scale: f32) -> Result<Self> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(PdfError::ImageError(format!("invalid raster scale: {scale}")));
        }

        let width = pixel_extent(page_width, scale)?;
        let height = pixel_extent(page_height, scale)?;

        Ok(Self {
            image: RgbaImage::new(width, height),
            scale,
            page_width,
            page_height,
        })
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Page size in points as (width, height)
    pub fn page_size(&self) -> (f32, f32) {
        (self.page_width, self.page_height)
    }

    /// Whether nothing has been drawn yet
    pub fn is_blank(&self) -> bool {
        self.image.pixels().all(|p| p[3] == 0)
    }

    /// Draw a shaped run with its first glyph's baseline origin at
    /// (`x`, `baseline_y`), both in points from the page's top-left corner.
    ///
    /// # Arguments
    /// * `font` - The font the run was shaped with
    /// * `run` - Shaped glyphs
    /// * `x` - Baseline origin x in points
    /// * `baseline_y` - Baseline origin y in points, measured downward
    /// * `font_size` - Em size in points
    /// * `color` - Fill color, alpha honoured
    pub fn draw_run(
        &mut self,
        font: &FontData,
        run: &ShapedRun,
        x: f32,
        baseline_y: f32,
        font_size: f32,
        color: Color,
    ) -> Result<()> {
        if !(font_size.is_finite() && font_size > 0.0) {
            return Err(PdfError::ImageError(format!("invalid font size: {font_size}")));
        }

        let outline_font = font.outline_font()?;
        let units_per_em = outline_font.units_per_em().unwrap_or(run.units_per_em);

        // ab_glyph scales by line height (ascent - descent), not by em
        let px_per_em = font_size * self.scale;
        let px_scale = PxScale::from(px_per_em * outline_font.height_unscaled() / units_per_em);
        let units_to_px = px_per_em / run.units_per_em;

        let mut pen_x = x * self.scale;
        let mut pen_y = baseline_y * self.scale;
        let image = &mut self.image;
        let (width, height) = image.dimensions();

        for glyph in &run.glyphs {
            let origin = point(
                pen_x + glyph.x_offset as f32 * units_to_px,
                pen_y - glyph.y_offset as f32 * units_to_px,
            );
            let positioned = GlyphId(glyph.glyph_id).with_scale_and_position(px_scale, origin);

            if let Some(outlined) = outline_font.outline_glyph(positioned) {
                let bounds = outlined.px_bounds();
                outlined.draw(|gx, gy, coverage| {
                    let px = bounds.min.x as i64 + gx as i64;
                    let py = bounds.min.y as i64 + gy as i64;
                    if px < 0 || py < 0 || px >= width as i64 || py >= height as i64 {
                        return;
                    }
                    let dst = image.get_pixel_mut(px as u32, py as u32);
                    blend_over(dst, color, coverage);
                });
            }

            pen_x += glyph.x_advance as f32 * units_to_px;
            pen_y -= glyph.y_advance as f32 * units_to_px;
        }

        Ok(())
    }
}

fn pixel_extent(points: f32, scale: f32) -> Result<u32> {
    let pixels = (points * scale).ceil();
    if !pixels.is_finite() || pixels < 1.0 || pixels > MAX_LAYER_EDGE as f32 {
        return Err(PdfError::ImageError(format!(
            "page extent of {points}pt at scale {scale} is out of range"
        )));
    }
    Ok(pixels as u32)
}

/// Source-over compositing with straight (non-premultiplied) alpha
fn blend_over(dst: &mut Rgba<u8>, color: Color, coverage: f32) {
    let src_a = (color.a as f32 / 255.0) * coverage.clamp(0.0, 1.0);
    if src_a <= 0.0 {
        return;
    }

    let dst_a = dst[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);

    let channel = |src: u8, dst: u8| -> u8 {
        let value = (src as f32 * src_a + dst as f32 * dst_a * (1.0 - src_a)) / out_a;
        value.round().clamp(0.0, 255.0) as u8
    };

    *dst = Rgba([
        channel(color.r, dst[0]),
        channel(color.g, dst[1]),
        channel(color.b, dst[2]),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ]);
}
