//! Interactive session state

use crate::batch::{BatchGenerator, BatchOptions, BatchProgress, BatchReport};
use crate::config::RenderConfig;
use crate::geometry::Viewport;
use crate::guests::GuestList;
use crate::layout::Layout;
use crate::positions::{Position, PositionStore};
use crate::preview;
use crate::renderer::OverlayRenderer;
use crate::{InviteError, ResourceKind, Result};
use image::RgbaImage;
use pdf_core::{FontData, PdfDocument};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// The loaded template and where it came from
struct Template {
    path: PathBuf,
    document: PdfDocument,
}

/// Everything a front end tracks between user actions
///
/// Setup operations that fail leave the session as it was.
pub struct Session {
    template: Option<Template>,
    config: RenderConfig,
    positions: PositionStore,
    guests: Option<GuestList>,
    current_page: usize,
    viewport: Viewport,
}

impl Session {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            template: None,
            config,
            positions: PositionStore::new(),
            guests: None,
            current_page: 0,
            viewport: Viewport::default(),
        }
    }

    /// Load and validate a font file, replacing the current font on success
    pub fn load_font(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let font = FontData::from_file(path)
            .map_err(|e| InviteError::resource(ResourceKind::Font, path, e))?;
        info!("Loaded font {} from {}", font.name, path.display());
        self.set_font(font);
        Ok(())
    }

    pub fn set_font(&mut self, font: FontData) {
        self.config.font = Some(font);
    }

    /// Open a template, discarding all positions and returning to page 1
    ///
    /// Returns the template's page count.
    pub fn load_template(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let document = PdfDocument::open(path)
            .map_err(|e| InviteError::resource(ResourceKind::Template, path, e))?;
        let page_count = document.page_count();

        if !self.positions.is_empty() {
            debug!(
                "Discarding {} positions for new template",
                self.positions.len()
            );
        }
        self.positions.clear();
        self.current_page = 0;
        self.template = Some(Template {
            path: path.to_path_buf(),
            document,
        });

        info!("Loaded template {} ({} pages)", path.display(), page_count);
        Ok(page_count)
    }

    /// Load the guest list, returning the number of guests
    pub fn load_guest_list(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let guests = GuestList::from_path(path)?;
        let count = guests.len();

        let blank = guests.blank_count();
        if blank > 0 {
            warn!("{blank} guests have an empty name and will be reported as failures");
        }

        self.guests = Some(guests);
        Ok(count)
    }

    pub fn set_guests(&mut self, guests: GuestList) {
        self.guests = Some(guests);
    }

    pub fn template_path(&self) -> Option<&Path> {
        self.template.as_ref().map(|t| t.path.as_path())
    }

    pub fn page_count(&self) -> usize {
        self.template
            .as_ref()
            .map_or(0, |t| t.document.page_count())
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Show the page at `page_index` (0-based)
    pub fn set_page(&mut self, page_index: usize) -> Result<()> {
        let len = self.page_count();
        if page_index >= len {
            return Err(InviteError::IndexOutOfRange {
                index: page_index,
                len,
            });
        }
        self.current_page = page_index;
        Ok(())
    }

    /// Advance one page; returns false on the last page
    pub fn next_page(&mut self) -> bool {
        self.set_page(self.current_page + 1).is_ok()
    }

    /// Go back one page; returns false on the first page
    pub fn prev_page(&mut self) -> bool {
        match self.current_page.checked_sub(1) {
            Some(page) => self.set_page(page).is_ok(),
            None => false,
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.viewport.set_zoom(zoom);
    }

    pub fn zoom_in(&mut self) -> bool {
        self.viewport.zoom_in()
    }

    pub fn zoom_out(&mut self) -> bool {
        self.viewport.zoom_out()
    }

    /// Mark a name position from a click on the current page's preview
    ///
    /// The click is mapped to page points through the viewport and stored
    /// with the default font size. Returns the new position's index.
    ///
    /// # Arguments
    /// * `screen_x`, `screen_y` - Click location in preview pixels
    pub fn click(&mut self, screen_x: f64, screen_y: f64) -> Result<usize> {
        let template = self.template.as_ref().ok_or_else(|| {
            InviteError::PreconditionFailed("no template loaded".to_string())
        })?;

        let (x, y) = self.viewport.to_document(screen_x, screen_y);
        let (width, height) = template.document.page_size(self.current_page)?;
        if x > width as f64 || y > height as f64 {
            return Err(InviteError::InvalidPosition(format!(
                "({x:.1}, {y:.1}) is outside the {width} x {height} page"
            )));
        }

        let index = self.positions.add(
            &self.config,
            self.current_page,
            x,
            y,
            self.config.font_size_default,
        )?;
        debug!("Marked {}", self.positions.as_slice()[index]);
        Ok(index)
    }

    pub fn remove_position(&mut self, index: usize) -> Result<Position> {
        self.positions.remove_at(index)
    }

    pub fn positions(&self) -> &PositionStore {
        &self.positions
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut RenderConfig {
        &mut self.config
    }

    pub fn guests(&self) -> Option<&GuestList> {
        self.guests.as_ref()
    }

    /// Store indices and preview pixel centres of the current page's markers
    pub fn marker_positions(&self) -> impl Iterator<Item = (usize, (f64, f64))> + '_ {
        self.positions
            .indexed_for_page(self.current_page)
            .map(|(i, p)| (i, self.viewport.to_screen(p.x, p.y)))
    }

    /// Preview raster of the current page with its markers drawn
    ///
    /// `background` is a rendering of the page; it is scaled to the
    /// viewport. Without one a white canvas is used.
    pub fn render_preview(&self, background: Option<&RgbaImage>) -> Result<RgbaImage> {
        let template = self.require_template()?;
        let (width, height) = template.document.page_size(self.current_page)?;

        let mut canvas = match background {
            Some(image) => preview::fit_background(image, width, height, &self.viewport),
            None => preview::blank_canvas(width, height, &self.viewport),
        };
        preview::draw_markers(
            &mut canvas,
            self.positions.list_for_page(self.current_page),
            &self.viewport,
        );
        Ok(canvas)
    }

    /// Render one invitation for `name` at every marked position
    pub fn test_sample(&self, name: &str, output: impl AsRef<Path>) -> Result<()> {
        let template = self.require_template()?;
        if self.positions.is_empty() {
            return Err(InviteError::PreconditionFailed(
                "no name positions marked".to_string(),
            ));
        }
        let renderer = OverlayRenderer::new(&self.config)?;

        let mut document = PdfDocument::open(&template.path)
            .map_err(|e| InviteError::resource(ResourceKind::Template, &template.path, e))?;
        renderer.render_all(&mut document, name, self.positions.as_slice())?;
        document.save(output.as_ref())?;

        info!("Wrote sample to {}", output.as_ref().display());
        Ok(())
    }

    /// A batch generator over the session's template, positions and guests
    pub fn generator<'a>(&'a self, output_dir: &'a Path) -> Result<BatchGenerator<'a>> {
        let template = self.require_template()?;
        let guests = self.guests.as_ref().ok_or_else(|| {
            InviteError::PreconditionFailed("no guest list loaded".to_string())
        })?;

        Ok(BatchGenerator::new(
            &template.path,
            &self.positions,
            guests,
            &self.config,
            output_dir,
        ))
    }

    /// Generate one invitation per guest into `output_dir`
    pub fn generate<F>(
        &self,
        output_dir: impl AsRef<Path>,
        options: BatchOptions,
        progress: F,
    ) -> Result<BatchReport>
    where
        F: FnMut(&BatchProgress) + Send,
    {
        self.generator(output_dir.as_ref())?
            .with_options(options)
            .generate(progress)
    }

    pub fn save_layout(&self, path: impl AsRef<Path>) -> Result<()> {
        Layout::from_store(&self.positions, self.template_path()).save(path)
    }

    /// Replace the positions with those saved in a layout file
    ///
    /// Returns the number of positions loaded.
    pub fn load_layout(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let store = Layout::load(path)?
            .into_store()
            .map_err(|e| InviteError::resource(ResourceKind::Layout, path, e))?;

        if let Some(max_page) = store.max_page_index() {
            let pages = self.page_count();
            if self.template.is_some() && max_page >= pages {
                warn!(
                    "Layout refers to page {} but the template has {} pages",
                    max_page + 1,
                    pages
                );
            }
        }

        self.positions = store;
        Ok(self.positions.len())
    }

    fn require_template(&self) -> Result<&Template> {
        self.template
            .as_ref()
            .ok_or_else(|| InviteError::PreconditionFailed("no template loaded".to_string()))
    }
}
