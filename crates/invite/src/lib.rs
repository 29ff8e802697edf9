//! Invite - position capture and batch overlay rendering
//!
//! This crate provides:
//! - Screen/document coordinate mapping for a zoomed page preview
//! - An ordered store of marked name positions
//! - Guest list loading from CSV
//! - Rendering a shaped name onto template pages
//! - Batch generation of one PDF per guest, with per-guest error capture
//! - A [`Session`] context object tying the above together
//!
//! # Example
//!
//! ```ignore
//! use invite::{BatchOptions, RenderConfig, Session};
//!
//! let mut session = Session::new(RenderConfig::default());
//! session.load_font("NotoSansGujarati-Regular.ttf")?;
//! session.load_template("card.pdf")?;
//! session.click(240.0, 680.0)?;
//! session.load_guest_list("guests.csv")?;
//!
//! let report = session.generate("out", BatchOptions::default(), |_| {})?;
//! println!("{}", report.summary());
//! ```

pub mod batch;
pub mod config;
pub mod filename;
pub mod geometry;
pub mod guests;
pub mod layout;
pub mod positions;
pub mod preview;
mod renderer;
mod session;

pub use batch::{BatchGenerator, BatchOptions, BatchProgress, BatchReport, GuestFailure, GuestOutcome};
pub use config::{RenderConfig, RenderQuality, Settings, TextColor};
pub use geometry::{to_document_space, to_screen_space, Viewport, PREVIEW_RENDER_SCALE};
pub use guests::{GuestList, GuestRecord};
pub use layout::Layout;
pub use positions::{Position, PositionStore};
pub use renderer::OverlayRenderer;
pub use session::Session;

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// What kind of external resource failed to load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Template,
    Font,
    GuestList,
    Layout,
    Config,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Template => "template",
            ResourceKind::Font => "font",
            ResourceKind::GuestList => "guest list",
            ResourceKind::Layout => "layout",
            ResourceKind::Config => "config",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while marking positions or generating output
#[derive(Debug, Error)]
pub enum InviteError {
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Failed to load {kind} from {}: {reason}", path.display())]
    ResourceLoad {
        kind: ResourceKind,
        path: PathBuf,
        reason: String,
    },

    #[error("Render failed on page index {page}: {reason}")]
    RenderFailure { page: usize, reason: String },

    #[error("Index {index} is out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("No font loaded")]
    NoFontLoaded,

    #[error("Invalid position: {0}")]
    InvalidPosition(String),

    #[error("Guest name on row {0} is empty")]
    BlankGuestName(usize),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("PDF error: {0}")]
    Pdf(#[from] pdf_core::PdfError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl InviteError {
    pub(crate) fn resource(
        kind: ResourceKind,
        path: impl Into<PathBuf>,
        reason: impl fmt::Display,
    ) -> Self {
        InviteError::ResourceLoad {
            kind,
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for invite operations
pub type Result<T> = std::result::Result<T, InviteError>;
