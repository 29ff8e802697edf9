//! Batch generation: one output PDF per guest

use crate::config::{RenderConfig, DEFAULT_OUTPUT_PREFIX};
use crate::filename::OutputNamer;
use crate::guests::GuestList;
use crate::positions::PositionStore;
use crate::renderer::OverlayRenderer;
use crate::{InviteError, ResourceKind, Result};
use pdf_core::PdfDocument;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Batch tuning knobs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    /// Output file name prefix
    pub output_prefix: String,
    /// Worker threads (1 = sequential)
    pub jobs: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
            jobs: 1,
        }
    }
}

/// Progress notification sent after each guest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchProgress {
    /// Guests finished so far, including this one
    pub completed: usize,
    pub total: usize,
    pub row: usize,
    pub name: String,
    pub succeeded: bool,
}

/// Result for a single guest
#[derive(Debug)]
pub struct GuestOutcome {
    pub row: usize,
    pub name: String,
    pub result: Result<PathBuf>,
}

/// A guest whose output could not be produced
#[derive(Debug)]
pub struct GuestFailure {
    pub row: usize,
    pub name: String,
    pub error: InviteError,
}

/// Tally of a finished batch
#[derive(Debug, Default)]
pub struct BatchReport {
    pub success_count: usize,
    /// Failures in input order
    pub failures: Vec<GuestFailure>,
    /// Written files in input order
    pub outputs: Vec<PathBuf>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.success_count + self.failures.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// One-line human summary
    pub fn summary(&self) -> String {
        if self.failures.is_empty() {
            format!("Generated {} invitations", self.success_count)
        } else {
            format!(
                "Generated {} of {} invitations ({} failed)",
                self.success_count,
                self.total(),
                self.failures.len()
            )
        }
    }

    fn record(&mut self, outcome: GuestOutcome) {
        match outcome.result {
            Ok(path) => {
                self.success_count += 1;
                self.outputs.push(path);
            }
            Err(error) => self.failures.push(GuestFailure {
                row: outcome.row,
                name: outcome.name,
                error,
            }),
        }
    }
}

/// A guest with its destination path decided
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedOutput {
    pub row: usize,
    pub name: String,
    pub path: PathBuf,
}

/// Produces one PDF per guest from a template and a set of positions
pub struct BatchGenerator<'a> {
    template_path: &'a Path,
    positions: &'a PositionStore,
    guests: &'a GuestList,
    config: &'a RenderConfig,
    output_dir: &'a Path,
    options: BatchOptions,
}

impl<'a> BatchGenerator<'a> {
    pub fn new(
        template_path: &'a Path,
        positions: &'a PositionStore,
        guests: &'a GuestList,
        config: &'a RenderConfig,
        output_dir: &'a Path,
    ) -> Self {
        Self {
            template_path,
            positions,
            guests,
            config,
            output_dir,
            options: BatchOptions::default(),
        }
    }

    pub fn with_options(mut self, options: BatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Verify everything a batch needs before any file is written
    pub fn check_preconditions(&self) -> Result<()> {
        let template = PdfDocument::open(self.template_path).map_err(|e| {
            InviteError::PreconditionFailed(format!(
                "template {} cannot be opened: {e}",
                self.template_path.display()
            ))
        })?;

        if self.config.font.is_none() {
            return Err(InviteError::PreconditionFailed(
                "no font selected".to_string(),
            ));
        }

        if self.positions.is_empty() {
            return Err(InviteError::PreconditionFailed(
                "no name positions marked".to_string(),
            ));
        }

        if self.guests.is_empty() {
            return Err(InviteError::PreconditionFailed(
                "guest list is empty".to_string(),
            ));
        }

        if self.options.jobs == 0 {
            return Err(InviteError::PreconditionFailed(
                "jobs must be at least 1".to_string(),
            ));
        }

        if let Some(max_page) = self.positions.max_page_index() {
            if max_page >= template.page_count() {
                warn!(
                    "positions refer to page {} but the template has {} pages; affected guests will fail",
                    max_page + 1,
                    template.page_count()
                );
            }
        }

        std::fs::create_dir_all(self.output_dir).map_err(|e| {
            InviteError::PreconditionFailed(format!(
                "output directory {} cannot be created: {e}",
                self.output_dir.display()
            ))
        })?;

        Ok(())
    }

    /// Decide every guest's output path, in input order
    pub fn plan(&self) -> Vec<PlannedOutput> {
        let mut namer = OutputNamer::new(self.options.output_prefix.clone());
        self.guests
            .iter()
            .map(|guest| PlannedOutput {
                row: guest.row,
                name: guest.name.clone(),
                path: self.output_dir.join(namer.file_name(guest.row, &guest.name)),
            })
            .collect()
    }

    /// Per-guest results, produced lazily and sequentially
    pub fn outcomes(&self) -> Result<impl Iterator<Item = GuestOutcome> + '_> {
        self.check_preconditions()?;
        let renderer = OverlayRenderer::new(self.config)?;

        Ok(self.plan().into_iter().map(move |planned| {
            let result = self.render_one(&renderer, &planned);
            GuestOutcome {
                row: planned.row,
                name: planned.name,
                result,
            }
        }))
    }

    /// Run the whole batch
    ///
    /// Precondition failures abort before any file is written. After that,
    /// each guest's error is captured in the report and the batch goes on.
    /// `progress` is called once per guest as it finishes.
    pub fn generate<F>(&self, progress: F) -> Result<BatchReport>
    where
        F: FnMut(&BatchProgress) + Send,
    {
        self.check_preconditions()?;
        let renderer = OverlayRenderer::new(self.config)?;
        let plan = self.plan();
        let total = plan.len();

        info!(
            "Generating {} invitations into {} ({} positions, {} jobs)",
            total,
            self.output_dir.display(),
            self.positions.len(),
            self.options.jobs
        );

        let progress = Mutex::new((0usize, progress));
        let run_one = |planned: &PlannedOutput| -> GuestOutcome {
            let result = self.render_one(&renderer, planned);

            let mut guard = progress.lock().unwrap_or_else(|e| e.into_inner());
            let (completed, callback) = &mut *guard;
            *completed += 1;
            callback(&BatchProgress {
                completed: *completed,
                total,
                row: planned.row,
                name: planned.name.clone(),
                succeeded: result.is_ok(),
            });

            GuestOutcome {
                row: planned.row,
                name: planned.name.clone(),
                result,
            }
        };

        let outcomes: Vec<GuestOutcome> = if self.options.jobs > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.options.jobs)
                .build()
                .map_err(|e| InviteError::PreconditionFailed(format!("thread pool: {e}")))?;
            pool.install(|| plan.par_iter().map(run_one).collect())
        } else {
            plan.iter().map(run_one).collect()
        };

        let mut report = BatchReport::default();
        for outcome in outcomes {
            report.record(outcome);
        }

        info!("{}", report.summary());
        Ok(report)
    }

    /// Render and save one guest's document from a fresh template copy
    fn render_one(&self, renderer: &OverlayRenderer<'_>, planned: &PlannedOutput) -> Result<PathBuf> {
        let result = self.try_render_one(renderer, planned);
        match &result {
            Ok(path) => debug!(row = planned.row, "wrote {}", path.display()),
            Err(e) => warn!(row = planned.row, name = %planned.name, "guest failed: {e}"),
        }
        result
    }

    fn try_render_one(
        &self,
        renderer: &OverlayRenderer<'_>,
        planned: &PlannedOutput,
    ) -> Result<PathBuf> {
        if planned.name.trim().is_empty() {
            return Err(InviteError::BlankGuestName(planned.row));
        }

        let mut doc = PdfDocument::open(self.template_path)
            .map_err(|e| InviteError::resource(ResourceKind::Template, self.template_path, e))?;

        renderer.render_all(&mut doc, &planned.name, self.positions.as_slice())?;

        if let Err(e) = doc.save(&planned.path) {
            // Do not leave a truncated file behind
            if planned.path.is_file() {
                std::fs::remove_file(&planned.path).ok();
            }
            return Err(e.into());
        }

        Ok(planned.path.clone())
    }
}
