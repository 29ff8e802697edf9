//! Screen <-> document coordinate mapping
//!
//! The preview rasterizes each page at `zoom * render_scale` pixels per
//! point. A click on that raster maps back to page points by dividing by
//! the same factor. Both spaces share a top-left origin.

/// Fixed rasterization multiplier of the preview surface
pub const PREVIEW_RENDER_SCALE: f64 = 2.0;

pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 3.0;
pub const ZOOM_STEP: f64 = 0.2;
pub const DEFAULT_ZOOM: f64 = 1.0;

/// Convert a preview pixel coordinate to template page points
pub fn to_document_space(screen_x: f64, screen_y: f64, zoom: f64, render_scale: f64) -> (f64, f64) {
    let factor = zoom * render_scale;
    (screen_x / factor, screen_y / factor)
}

/// Convert template page points to a preview pixel coordinate
pub fn to_screen_space(doc_x: f64, doc_y: f64, zoom: f64, render_scale: f64) -> (f64, f64) {
    let factor = zoom * render_scale;
    (doc_x * factor, doc_y * factor)
}

/// Zoom state of the preview
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    zoom: f64,
    render_scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: DEFAULT_ZOOM,
            render_scale: PREVIEW_RENDER_SCALE,
        }
    }
}

impl Viewport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Viewport at a given zoom, clamped to the supported range
    pub fn with_zoom(zoom: f64) -> Self {
        let mut viewport = Self::default();
        viewport.set_zoom(zoom);
        viewport
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn render_scale(&self) -> f64 {
        self.render_scale
    }

    /// Preview pixels per page point
    pub fn factor(&self) -> f64 {
        self.zoom * self.render_scale
    }

    /// Set the zoom, clamped to [`MIN_ZOOM`, `MAX_ZOOM`]
    pub fn set_zoom(&mut self, zoom: f64) {
        let zoom = if zoom.is_finite() { zoom } else { DEFAULT_ZOOM };
        // Round to hundredths so repeated steps do not drift
        self.zoom = (zoom.clamp(MIN_ZOOM, MAX_ZOOM) * 100.0).round() / 100.0;
    }

    /// Step the zoom up; returns false when already at the maximum
    pub fn zoom_in(&mut self) -> bool {
        let before = self.zoom;
        self.set_zoom(self.zoom + ZOOM_STEP);
        self.zoom != before
    }

    /// Step the zoom down; returns false when already at the minimum
    pub fn zoom_out(&mut self) -> bool {
        let before = self.zoom;
        self.set_zoom(self.zoom - ZOOM_STEP);
        self.zoom != before
    }

    /// Zoom as a percentage label, e.g. "120%"
    pub fn label(&self) -> String {
        format!("{}%", (self.zoom * 100.0).round() as i64)
    }

    pub fn to_document(&self, screen_x: f64, screen_y: f64) -> (f64, f64) {
        to_document_space(screen_x, screen_y, self.zoom, self.render_scale)
    }

    pub fn to_screen(&self, doc_x: f64, doc_y: f64) -> (f64, f64) {
        to_screen_space(doc_x, doc_y, self.zoom, self.render_scale)
    }

    /// Preview raster size in pixels for a page of the given size in points
    pub fn canvas_size(&self, page_width: f32, page_height: f32) -> (u32, u32) {
        let w = (page_width as f64 * self.factor()).ceil().max(1.0);
        let h = (page_height as f64 * self.factor()).ceil().max(1.0);
        (w as u32, h as u32)
    }
}
