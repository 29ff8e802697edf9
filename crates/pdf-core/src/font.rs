//! Font loading and validation

use crate::{PdfError, Result};
use ab_glyph::{Font, FontRef, PxScale, ScaleFont};
use std::path::Path;
use std::sync::Arc;

/// Nominal size used for the trial measurement when a font is loaded
const TRIAL_SIZE: f32 = 20.0;

/// A validated TrueType/OpenType font
///
/// The raw bytes are shared behind an `Arc`, so cloning is cheap and a
/// single font can be handed to several rendering threads.
#[derive(Debug, Clone)]
pub struct FontData {
    /// Font name/identifier
    pub name: String,
    /// Raw font file bytes
    data: Arc<Vec<u8>>,
}

impl FontData {
    /// Create font data from TTF/OTF bytes
    ///
    /// The font must parse, carry a Unicode `cmap`, be accepted by the
    /// shaping engine and produce a sane line height and space advance at a
    /// nominal size.
    ///
    /// # Arguments
    /// * `name` - Font identifier
    /// * `ttf_data` - TrueType font file bytes
    pub fn from_ttf(name: &str, ttf_data: &[u8]) -> Result<Self> {
        let face = ttf_parser::Face::parse(ttf_data, 0)
            .map_err(|e| PdfError::FontParseError(format!("{e:?}")))?;

        let has_unicode_cmap = face
            .tables()
            .cmap
            .map(|cmap| cmap.subtables.into_iter().any(|s| s.is_unicode()))
            .unwrap_or(false);
        if !has_unicode_cmap {
            return Err(PdfError::FontParseError(
                "font has no Unicode character map".to_string(),
            ));
        }

        if rustybuzz::Face::from_slice(ttf_data, 0).is_none() {
            return Err(PdfError::FontParseError(
                "font rejected by the shaping engine".to_string(),
            ));
        }

        // Trial measurement at a nominal size
        let font = FontRef::try_from_slice(ttf_data)
            .map_err(|e| PdfError::FontParseError(e.to_string()))?;
        let scaled = font.as_scaled(PxScale::from(TRIAL_SIZE));
        let line_height = scaled.height();
        if !line_height.is_finite() || line_height <= 0.0 {
            return Err(PdfError::FontParseError(format!(
                "font reports an unusable line height ({line_height})"
            )));
        }
        let space_advance = scaled.h_advance(font.glyph_id(' '));
        if !space_advance.is_finite() || space_advance <= 0.0 {
            return Err(PdfError::FontParseError(format!(
                "font reports an unusable space advance ({space_advance})"
            )));
        }

        Ok(Self {
            name: name.to_string(),
            data: Arc::new(ttf_data.to_vec()),
        })
    }

    /// Load and validate a font file from disk
    ///
    /// The font is named after the file stem.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "font".to_string());

        Self::from_ttf(&name, &bytes)
    }

    /// Raw font bytes
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Get glyph ID for a character (0 means `.notdef`)
    pub fn glyph_id(&self, c: char) -> Option<u16> {
        ttf_parser::Face::parse(self.bytes(), 0)
            .ok()
            .and_then(|face| face.glyph_index(c))
            .map(|id| id.0)
    }

    /// Check if font has a glyph for the given character
    pub fn has_glyph(&self, c: char) -> bool {
        self.glyph_id(c).map(|id| id != 0).unwrap_or(false)
    }

    /// Borrow the font as an ab_glyph outline source
    pub(crate) fn outline_font(&self) -> Result<FontRef<'_>> {
        FontRef::try_from_slice(self.bytes()).map_err(|e| PdfError::FontParseError(e.to_string()))
    }

    /// Borrow the font as a rustybuzz shaping face
    pub(crate) fn shaping_face(&self) -> Result<rustybuzz::Face<'_>> {
        rustybuzz::Face::from_slice(self.bytes(), 0)
            .ok_or_else(|| PdfError::FontParseError("font rejected by the shaping engine".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{minimal_ttf, SPACE_GLYPH};

    #[test]
    fn test_font_from_ttf() {
        let font = FontData::from_ttf("test", &minimal_ttf()).expect("Failed to load font");
        assert_eq!(font.name, "test");
        assert_eq!(font.bytes(), minimal_ttf().as_slice());
    }

    #[test]
    fn test_font_rejects_garbage() {
        let result = FontData::from_ttf("junk", &[0u8; 100]);
        assert!(matches!(result, Err(PdfError::FontParseError(_))));
    }

    #[test]
    fn test_font_rejects_empty() {
        assert!(FontData::from_ttf("empty", &[]).is_err());
    }

    #[test]
    fn test_glyph_lookup() {
        let font = FontData::from_ttf("test", &minimal_ttf()).expect("Failed to load font");
        assert!(font.has_glyph('A'));
        assert!(font.has_glyph('ર'));
        assert_eq!(font.glyph_id(' '), Some(2));
        assert!(!font.has_glyph('中'));
    }

    /// The fixture font with the space glyph's advance width replaced
    fn with_space_advance(advance: u16) -> Vec<u8> {
        let mut data = minimal_ttf();
        let num_tables = u16::from_be_bytes([data[4], data[5]]) as usize;
        let record = (0..num_tables)
            .map(|i| 12 + 16 * i)
            .find(|&r| &data[r..r + 4] == b"hmtx")
            .expect("Fixture has no hmtx table");
        let offset = u32::from_be_bytes([
            data[record + 8],
            data[record + 9],
            data[record + 10],
            data[record + 11],
        ]) as usize;

        // One (advance, lsb) pair of u16s per glyph
        let slot = offset + 4 * SPACE_GLYPH as usize;
        data[slot..slot + 2].copy_from_slice(&advance.to_be_bytes());
        data
    }

    #[test]
    fn test_font_rejects_zero_space_advance() {
        FontData::from_ttf("patched", &with_space_advance(300)).expect("Unpatched advance loads");
        match FontData::from_ttf("patched", &with_space_advance(0)) {
            Err(PdfError::FontParseError(msg)) => assert!(msg.contains("space advance")),
            other => panic!("Expected FontParseError, got {other:?}"),
        }
    }

    #[test]
    fn test_from_file_uses_stem_as_name() {
        let dir = std::env::temp_dir().join(format!("pdf-core-font-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("Failed to create temp dir");
        let path = dir.join("Shruti.ttf");
        std::fs::write(&path, minimal_ttf()).expect("Failed to write font");

        let font = FontData::from_file(&path).expect("Failed to load font file");
        assert_eq!(font.name, "Shruti");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_from_file_missing() {
        let result = FontData::from_file("/nonexistent/font.ttf");
        assert!(matches!(result, Err(PdfError::IoError(_))));
    }

    #[test]
    fn test_clone_shares_bytes() {
        let font = FontData::from_ttf("test", &minimal_ttf()).expect("Failed to load font");
        let copy = font.clone();
        assert_eq!(font.bytes().as_ptr(), copy.bytes().as_ptr());
    }
}
