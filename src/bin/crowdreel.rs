use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use crowdreel::{
    DatasetConfig, DirFrameSource, RenderThreading, RendererKind, TextOverlay, assemble,
    create_renderer, default_captions, load_document, parse_trace, render_all, save_document,
};

#[derive(Parser, Debug)]
#[command(name = "crowdreel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert the raw trace text into the structured JSON record store.
    Parse(ParseArgs),
    /// Render the dataset into an MP4 video (requires `ffmpeg` on PATH).
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct ParseArgs {
    /// Dataset root directory (holds `data.txt`).
    #[arg(long)]
    root: PathBuf,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Dataset root directory (holds `position.json` and the frame images).
    #[arg(long)]
    root: PathBuf,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Visualization to overlay on the raw frames.
    #[arg(long, value_enum, default_value_t = Mode::Passthrough)]
    mode: Mode,

    /// Render only the first N frame indices.
    #[arg(long)]
    frames: Option<usize>,

    /// Encoding tick rate; per-frame hold durations come from the trace.
    #[arg(long, default_value_t = 60)]
    rate: u32,

    /// Skip the caption overlay.
    #[arg(long)]
    no_captions: bool,

    /// TTF/OTF font for captions (required unless --no-captions).
    #[arg(long)]
    font: Option<PathBuf>,

    /// Render frames on a worker pool.
    #[arg(long)]
    parallel: bool,

    /// Worker count for --parallel (defaults to all cores).
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Passthrough,
    Bbox,
    Density,
}

impl From<Mode> for RendererKind {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Passthrough => RendererKind::Passthrough,
            Mode::Bbox => RendererKind::BoundingBox,
            Mode::Density => RendererKind::DensityMap,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Parse(args) => cmd_parse(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn cmd_parse(args: ParseArgs) -> anyhow::Result<()> {
    let cfg = DatasetConfig::new(&args.root);

    let trace_path = cfg.trace_path();
    let raw = std::fs::read_to_string(&trace_path)
        .with_context(|| format!("read trace '{}'", trace_path.display()))?;

    let doc = parse_trace(&raw)?;
    info!(frames = doc.len(), "trace parsed");

    let store_path = cfg.record_store_path();
    save_document(&doc, &store_path)?;
    eprintln!("wrote {}", store_path.display());
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut cfg = DatasetConfig::new(&args.root);
    if let Some(font) = &args.font {
        cfg = cfg.with_font_path(font);
    }

    let doc = load_records(&cfg)?;
    if doc.is_empty() {
        anyhow::bail!("dataset '{}' has no frame records", args.root.display());
    }
    doc.validate();

    let mut indices = doc.frame_indices();
    if let Some(n) = args.frames {
        indices.truncate(n);
    }

    let overlay = if args.no_captions {
        None
    } else {
        let font = cfg.font_path.as_deref().ok_or_else(|| {
            anyhow::anyhow!("captions need a font: pass --font <path> or --no-captions")
        })?;
        Some(TextOverlay::from_font_path(font)?)
    };

    let renderer = create_renderer(args.mode.into());
    let source = DirFrameSource::new(cfg);
    let threading = RenderThreading {
        parallel: args.parallel,
        threads: args.threads,
    };

    let frames = render_all(
        &indices,
        &doc,
        renderer.as_ref(),
        overlay.as_ref(),
        default_captions,
        &source,
        &threading,
    )?;

    assemble(&frames, &args.out, args.rate)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

/// Prefer the structured store; fall back to parsing the raw trace when the
/// store has not been built yet.
fn load_records(cfg: &DatasetConfig) -> anyhow::Result<crowdreel::TraceDocument> {
    let store_path = cfg.record_store_path();
    if store_path.exists() {
        return Ok(load_document(&store_path)?);
    }

    warn!(
        store = %store_path.display(),
        "record store missing, parsing raw trace instead"
    );
    let trace_path = cfg.trace_path();
    let raw = std::fs::read_to_string(&trace_path)
        .with_context(|| format!("read trace '{}'", trace_path.display()))?;
    Ok(parse_trace(&raw)?)
}
