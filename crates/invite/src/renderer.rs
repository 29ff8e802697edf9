//! Text overlay rendering

use crate::config::RenderConfig;
use crate::positions::Position;
use crate::{InviteError, Result};
use pdf_core::{shape_text, FontData, OverlayLayer, PdfDocument, ShapedRun};
use std::collections::BTreeMap;
use tracing::debug;

/// Renders a name onto template pages at marked positions
pub struct OverlayRenderer<'a> {
    /// The render settings
    config: &'a RenderConfig,
    /// The configured font
    font: &'a FontData,
}

impl<'a> OverlayRenderer<'a> {
    /// Create a renderer; fails if no font is configured
    pub fn new(config: &'a RenderConfig) -> Result<Self> {
        let font = config.require_font()?;
        Ok(Self { config, font })
    }

    /// Render `text` at a single position
    ///
    /// The page gets its own transparent layer, composited over the
    /// existing content and any earlier overlays.
    ///
    /// # Arguments
    /// * `doc` - Document to draw on
    /// * `text` - Text to render
    /// * `position` - Page and baseline origin
    pub fn render(&self, doc: &mut PdfDocument, text: &str, position: &Position) -> Result<()> {
        let run = self.shape(text, position.page_index)?;
        self.render_page(doc, &run, position.page_index, std::slice::from_ref(position))
    }

    /// Render `text` at every position, shaping it only once
    ///
    /// Positions sharing a page are drawn into a single layer in insertion
    /// order, which composites identically to one layer per position.
    /// Returns the number of positions drawn.
    pub fn render_all(
        &self,
        doc: &mut PdfDocument,
        text: &str,
        positions: &[Position],
    ) -> Result<usize> {
        let Some(first) = positions.first() else {
            return Ok(0);
        };
        let run = self.shape(text, first.page_index)?;

        let mut by_page: BTreeMap<usize, Vec<Position>> = BTreeMap::new();
        for position in positions {
            by_page.entry(position.page_index).or_default().push(*position);
        }

        for (page_index, page_positions) in &by_page {
            self.render_page(doc, &run, *page_index, page_positions)?;
        }

        Ok(positions.len())
    }

    fn shape(&self, text: &str, page: usize) -> Result<ShapedRun> {
        let run = shape_text(self.font, text).map_err(|e| InviteError::RenderFailure {
            page,
            reason: e.to_string(),
        })?;

        if run.has_missing_glyphs() {
            debug!(font = %self.font.name, "font lacks glyphs for part of {text:?}");
        }
        Ok(run)
    }

    fn render_page(
        &self,
        doc: &mut PdfDocument,
        run: &ShapedRun,
        page_index: usize,
        positions: &[Position],
    ) -> Result<()> {
        let failure = |reason: String| InviteError::RenderFailure {
            page: page_index,
            reason,
        };

        let page_count = doc.page_count();
        if page_index >= page_count {
            return Err(failure(format!(
                "template has {page_count} pages, position refers to page {}",
                page_index + 1
            )));
        }

        let (width, height) = doc.page_size(page_index).map_err(|e| failure(e.to_string()))?;
        let mut layer = OverlayLayer::new(width, height, self.config.quality.raster_scale())
            .map_err(|e| failure(e.to_string()))?;

        for position in positions {
            layer
                .draw_run(
                    self.font,
                    run,
                    position.x as f32,
                    position.y as f32,
                    position.font_size,
                    self.config.color,
                )
                .map_err(|e| failure(e.to_string()))?;
        }

        doc.insert_overlay(page_index, layer.image())
            .map_err(|e| failure(e.to_string()))?;

        debug!(
            page = page_index,
            positions = positions.len(),
            "rendered overlay"
        );
        Ok(())
    }
}
