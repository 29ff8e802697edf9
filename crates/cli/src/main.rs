//! rsinvite CLI - mark name positions on a PDF template and generate
//! one invitation per guest.

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use invite::layout::Layout;
use invite::{BatchOptions, RenderQuality, Session, Settings, TextColor};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

const DEFAULT_SAMPLE_NAME: &str = "શ્રી રાજેશભાઈ પટેલ";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorOption {
    Black,
    Red,
    Blue,
    Gold,
    Green,
    Maroon,
}

impl From<ColorOption> for TextColor {
    fn from(opt: ColorOption) -> Self {
        match opt {
            ColorOption::Black => Self::Black,
            ColorOption::Red => Self::Red,
            ColorOption::Blue => Self::Blue,
            ColorOption::Gold => Self::Gold,
            ColorOption::Green => Self::Green,
            ColorOption::Maroon => Self::Maroon,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum QualityOption {
    Normal,
    High,
}

impl From<QualityOption> for RenderQuality {
    fn from(opt: QualityOption) -> Self {
        match opt {
            QualityOption::Normal => Self::Normal,
            QualityOption::High => Self::High,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "rsinvite")]
#[command(author, version, about = "Overlay guest names onto a PDF invitation template", long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Overlay rendering quality
    #[arg(long, global = true, value_enum)]
    quality: Option<QualityOption>,

    /// Name text color
    #[arg(long, global = true, value_enum)]
    color: Option<ColorOption>,

    #[command(subcommand)]
    command: Command,
}

/// Template, font and layout shared by most commands
#[derive(ClapArgs, Debug)]
struct Inputs {
    /// Template PDF
    #[arg(short, long)]
    template: PathBuf,

    /// TrueType/OpenType font (default: font_path from the config file)
    #[arg(short, long)]
    font: Option<PathBuf>,

    /// Layout file holding the marked positions
    #[arg(short, long)]
    layout: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mark a name position from a click on the page preview
    Mark {
        #[command(flatten)]
        inputs: Inputs,

        /// Page number (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: usize,

        /// Click x in preview pixels
        #[arg(long)]
        screen_x: f64,

        /// Click y in preview pixels
        #[arg(long)]
        screen_y: f64,

        /// Preview zoom the click was made at
        #[arg(short, long, default_value_t = 1.0)]
        zoom: f64,

        /// Font size for this position (default: font_size from the config)
        #[arg(short, long)]
        size: Option<u32>,
    },

    /// List or remove marked positions
    Positions {
        /// Layout file
        #[arg(short, long)]
        layout: PathBuf,

        #[command(subcommand)]
        action: PositionsAction,
    },

    /// Draw position markers for one page to a PNG
    Preview {
        /// Template PDF
        #[arg(short, long)]
        template: PathBuf,

        /// Layout file
        #[arg(short, long)]
        layout: PathBuf,

        /// Page number (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: usize,

        #[arg(short, long, default_value_t = 1.0)]
        zoom: f64,

        /// Page image to draw the markers on
        #[arg(short, long)]
        background: Option<PathBuf>,

        /// Output PNG
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Render a single test invitation
    Sample {
        #[command(flatten)]
        inputs: Inputs,

        /// Name to render
        #[arg(short, long, default_value = DEFAULT_SAMPLE_NAME)]
        name: String,

        /// Output PDF
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Generate one invitation per guest
    Generate {
        #[command(flatten)]
        inputs: Inputs,

        /// Guest list CSV with a `name` column
        #[arg(short, long)]
        guests: PathBuf,

        /// Output directory
        #[arg(short, long)]
        out_dir: PathBuf,

        /// Worker threads (default: jobs from the config)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Output file name prefix (default: output_prefix from the config)
        #[arg(long)]
        prefix: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum PositionsAction {
    /// Print every position with its index
    List,
    /// Remove the position at INDEX
    Remove { index: usize },
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Setup logging
    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    // Load config, then let flags override it
    let mut settings = if let Some(config_path) = &args.config {
        Settings::from_file(config_path).context("Failed to load config file")?
    } else {
        Settings::load()
    };

    if let Some(quality) = args.quality {
        settings.rendering_quality = quality.into();
    }
    if let Some(color) = args.color {
        settings.text_color = color.into();
    }

    match args.command {
        Command::Mark {
            inputs,
            page,
            screen_x,
            screen_y,
            zoom,
            size,
        } => {
            if let Some(size) = size {
                settings.font_size = size;
            }
            mark(&settings, &inputs, page, screen_x, screen_y, zoom)?;
        }
        Command::Positions { layout, action } => positions(&layout, action)?,
        Command::Preview {
            template,
            layout,
            page,
            zoom,
            background,
            out,
        } => preview(&settings, &template, &layout, page, zoom, background.as_deref(), &out)?,
        Command::Sample { inputs, name, out } => sample(&settings, &inputs, &name, &out)?,
        Command::Generate {
            inputs,
            guests,
            out_dir,
            jobs,
            prefix,
        } => {
            if let Some(jobs) = jobs {
                settings.jobs = jobs;
            }
            if let Some(prefix) = prefix {
                settings.output_prefix = prefix;
            }
            return generate(&settings, &inputs, &guests, &out_dir);
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Build a session with the template and (optionally) font loaded
fn open_session(settings: &Settings, template: &Path, font: Option<&Path>) -> Result<Session> {
    let config = settings
        .render_config()
        .context("Invalid configuration")?;
    let mut session = Session::new(config);

    if let Some(font) = font {
        session
            .load_font(font)
            .with_context(|| format!("Failed to load font: {}", font.display()))?;
    }

    session
        .load_template(template)
        .with_context(|| format!("Failed to load template: {}", template.display()))?;
    Ok(session)
}

fn load_layout_into(session: &mut Session, layout: &Path) -> Result<()> {
    let count = session
        .load_layout(layout)
        .with_context(|| format!("Failed to load layout: {}", layout.display()))?;
    info!("Loaded {} positions", count);
    Ok(())
}

/// Convert a 1-based page number from the command line
fn page_index(page: usize) -> Result<usize> {
    page.checked_sub(1)
        .context("Page numbers start at 1")
}

fn mark(
    settings: &Settings,
    inputs: &Inputs,
    page: usize,
    screen_x: f64,
    screen_y: f64,
    zoom: f64,
) -> Result<()> {
    let mut session = open_session(settings, &inputs.template, inputs.font.as_deref())?;
    if inputs.layout.exists() {
        load_layout_into(&mut session, &inputs.layout)?;
    }

    session
        .set_page(page_index(page)?)
        .with_context(|| format!("Template has no page {page}"))?;
    session.set_zoom(zoom);

    let index = session
        .click(screen_x, screen_y)
        .context("Failed to mark position")?;
    session
        .save_layout(&inputs.layout)
        .with_context(|| format!("Failed to save layout: {}", inputs.layout.display()))?;

    if let Some(position) = session.positions().get(index) {
        // CLI output is intentional
        println!("Marked #{index}: {position}");
    }
    Ok(())
}

fn positions(layout_path: &Path, action: PositionsAction) -> Result<()> {
    let layout = Layout::load(layout_path)
        .with_context(|| format!("Failed to load layout: {}", layout_path.display()))?;

    match action {
        PositionsAction::List => {
            if layout.positions.is_empty() {
                println!("No positions marked");
            }
            for (i, position) in layout.positions.iter().enumerate() {
                println!("{i}: {position}");
            }
        }
        PositionsAction::Remove { index } => {
            let template = layout.template.clone();
            let mut store = layout.into_store().context("Layout holds invalid positions")?;
            let removed = store
                .remove_at(index)
                .context("Failed to remove position")?;

            let mut updated = Layout::from_store(&store, None);
            updated.template = template;
            updated
                .save(layout_path)
                .with_context(|| format!("Failed to save layout: {}", layout_path.display()))?;
            println!("Removed #{index}: {removed}");
        }
    }
    Ok(())
}

fn preview(
    settings: &Settings,
    template: &Path,
    layout: &Path,
    page: usize,
    zoom: f64,
    background: Option<&Path>,
    out: &Path,
) -> Result<()> {
    let mut session = open_session(settings, template, None)?;
    load_layout_into(&mut session, layout)?;
    session
        .set_page(page_index(page)?)
        .with_context(|| format!("Template has no page {page}"))?;
    session.set_zoom(zoom);

    let background = background
        .map(|path| {
            image::open(path)
                .map(|img| img.to_rgba8())
                .with_context(|| format!("Failed to load background: {}", path.display()))
        })
        .transpose()?;

    let canvas = session.render_preview(background.as_ref())?;
    canvas
        .save(out)
        .with_context(|| format!("Failed to write preview: {}", out.display()))?;

    println!(
        "Preview of page {page} at {} with {} markers saved to: {}",
        session.viewport().label(),
        session.marker_positions().count(),
        out.display()
    );
    Ok(())
}

fn sample(settings: &Settings, inputs: &Inputs, name: &str, out: &Path) -> Result<()> {
    let mut session = open_session(settings, &inputs.template, inputs.font.as_deref())?;
    load_layout_into(&mut session, &inputs.layout)?;

    session
        .test_sample(name, out)
        .context("Failed to render sample")?;
    println!("Sample saved to: {}", out.display());
    Ok(())
}

fn generate(settings: &Settings, inputs: &Inputs, guests: &Path, out_dir: &Path) -> Result<ExitCode> {
    let mut session = open_session(settings, &inputs.template, inputs.font.as_deref())?;
    load_layout_into(&mut session, &inputs.layout)?;
    let guest_count = session
        .load_guest_list(guests)
        .with_context(|| format!("Failed to load guest list: {}", guests.display()))?;

    // Setup progress bar
    let pb = ProgressBar::new(guest_count as u64);
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let options = BatchOptions {
        output_prefix: settings.output_prefix.clone(),
        jobs: settings.jobs,
    };
    let report = session
        .generate(out_dir, options, |progress| {
            pb.set_message(progress.name.clone());
            pb.inc(1);
        })
        .context("Cannot start generation")?;

    pb.finish_and_clear();

    println!("{}", report.summary());
    for failure in &report.failures {
        println!("  row {} ({:?}): {}", failure.row, failure.name, failure.error);
    }

    if report.is_complete_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
