//! Complex-script text shaping
//!
//! Shaping turns a Unicode string into positioned glyphs, forming the
//! conjuncts and vowel-sign reorderings that scripts such as Gujarati need.
//! The heavy lifting is done by rustybuzz; this module only adapts its
//! output into plain data the rasterizer consumes.

use crate::{FontData, PdfError, Result};
use rustybuzz::UnicodeBuffer;

/// One positioned glyph, in font units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapedGlyph {
    pub glyph_id: u16,
    /// Byte offset of the source cluster in the input text
    pub cluster: u32,
    pub x_advance: i32,
    pub y_advance: i32,
    pub x_offset: i32,
    pub y_offset: i32,
}

/// The output of shaping a single line of text
#[derive(Debug, Clone, PartialEq)]
pub struct ShapedRun {
    pub glyphs: Vec<ShapedGlyph>,
    pub units_per_em: f32,
}

impl ShapedRun {
    /// Total horizontal advance in font units
    pub fn advance_units(&self) -> i64 {
        self.glyphs.iter().map(|g| g.x_advance as i64).sum()
    }

    /// Total horizontal advance in points for a given font size
    pub fn width_points(&self, font_size: f32) -> f32 {
        self.advance_units() as f32 / self.units_per_em * font_size
    }

    /// Whether the font lacked a glyph for some of the input
    pub fn has_missing_glyphs(&self) -> bool {
        self.glyphs.iter().any(|g| g.glyph_id == 0)
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

/// Shape a single line of text with the given font
///
/// Script, language and direction are guessed from the text itself.
///
/// # Arguments
/// * `font` - Validated font
/// * `text` - Text to shape (no line breaking is performed)
pub fn shape_text(font: &FontData, text: &str) -> Result<ShapedRun> {
    let face = font.shaping_face()?;

    let units_per_em = face.units_per_em() as f32;
    if units_per_em <= 0.0 {
        return Err(PdfError::ShapingError(format!(
            "invalid units per em: {units_per_em}"
        )));
    }

    let mut buffer = UnicodeBuffer::new();
    buffer.push_str(text);
    buffer.guess_segment_properties();

    let output = rustybuzz::shape(&face, &[], buffer);

    let glyphs = output
        .glyph_infos()
        .iter()
        .zip(output.glyph_positions())
        .map(|(info, pos)| {
            let glyph_id = u16::try_from(info.glyph_id).map_err(|_| {
                PdfError::ShapingError(format!("glyph id out of range: {}", info.glyph_id))
            })?;
            Ok(ShapedGlyph {
                glyph_id,
                cluster: info.cluster,
                x_advance: pos.x_advance,
                y_advance: pos.y_advance,
                x_offset: pos.x_offset,
                y_offset: pos.y_offset,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ShapedRun {
        glyphs,
        units_per_em,
    })
}
