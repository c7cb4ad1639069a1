use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use qrbrand::{
    AssetCache, BORDER_MODULES, CAPTION_FONT_PX, CaptionRenderer, Compositor, FileLogoSource,
    HttpLogoSource, MODULE_PX, RenderConfig, RequestHandler, ServiceConfig,
};

#[derive(Parser, Debug)]
#[command(name = "qrbrand", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve `GET /<text>.png[?text=<caption>]` over HTTP.
    Serve(ServeArgs),
    /// Render a single branded QR code to a PNG file.
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct ServeArgs {
    /// JSON settings file; flags below override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address.
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Logo source URL (falls back to the LOGO_URL environment variable).
    #[arg(long)]
    logo_url: Option<String>,

    /// Logo fetch timeout in milliseconds.
    #[arg(long)]
    logo_timeout_ms: Option<u64>,

    /// Skip logo re-fetches for this long after a failed fetch.
    #[arg(long)]
    logo_retry_cooldown_ms: Option<u64>,

    /// Worker thread count.
    #[arg(long)]
    workers: Option<usize>,

    /// Pixels trimmed from each canvas dimension (half per side).
    #[arg(long)]
    border_shrink_px: Option<u32>,

    /// Use the payload as caption when no `text` parameter is given.
    #[arg(long)]
    caption_defaults_to_payload: Option<bool>,

    /// Extra font directory for captions (repeatable).
    #[arg(long = "font-dir")]
    font_dirs: Vec<PathBuf>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Text or URL to encode.
    #[arg(long)]
    text: String,

    /// Caption drawn under the code.
    #[arg(long)]
    caption: Option<String>,

    /// Logo file path, or an http(s) URL.
    #[arg(long)]
    logo: String,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Pixels trimmed from each canvas dimension (half per side).
    #[arg(long, default_value_t = RenderConfig::default().border_shrink_px)]
    border_shrink_px: u32,

    /// Extra font directory for captions (repeatable).
    #[arg(long = "font-dir")]
    font_dirs: Vec<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Serve(args) => cmd_serve(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut cfg = match &args.config {
        Some(path) => ServiceConfig::from_path(path)?,
        None => ServiceConfig::default(),
    };
    if let Some(addr) = args.addr {
        cfg.addr = addr;
    }
    if args.logo_url.is_some() {
        cfg.logo_url = args.logo_url;
    }
    if let Some(ms) = args.logo_timeout_ms {
        cfg.logo_timeout_ms = ms;
    }
    if args.logo_retry_cooldown_ms.is_some() {
        cfg.logo_retry_cooldown_ms = args.logo_retry_cooldown_ms;
    }
    if let Some(n) = args.workers {
        cfg.workers = n;
    }
    if let Some(px) = args.border_shrink_px {
        cfg.render.border_shrink_px = px;
    }
    if let Some(flag) = args.caption_defaults_to_payload {
        cfg.render.caption_defaults_to_payload = flag;
    }
    cfg.font_dirs.extend(args.font_dirs);
    let cfg = cfg.with_env_fallback();
    cfg.validate(MODULE_PX, BORDER_MODULES)?;

    let source = HttpLogoSource::new(cfg.require_logo_url()?, cfg.logo_timeout())?;
    let cache = AssetCache::new(source).with_retry_cooldown(cfg.logo_retry_cooldown());
    let compositor = Compositor::new(
        cfg.render,
        CaptionRenderer::new(&cfg.font_dirs, CAPTION_FONT_PX),
    );
    let handler = Arc::new(RequestHandler::new(Arc::new(cache), compositor));

    qrbrand::serve(cfg.addr, cfg.workers, handler)?;
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let render = RenderConfig {
        border_shrink_px: args.border_shrink_px,
        caption_defaults_to_payload: false,
    };
    render.validate(MODULE_PX, BORDER_MODULES)?;

    let cache = if args.logo.starts_with("http://") || args.logo.starts_with("https://") {
        AssetCache::new(HttpLogoSource::new(
            args.logo.as_str(),
            ServiceConfig::default().logo_timeout(),
        )?)
    } else {
        AssetCache::new(FileLogoSource::new(&args.logo))
    };
    let compositor = Compositor::new(
        render,
        CaptionRenderer::new(&args.font_dirs, CAPTION_FONT_PX),
    );
    let handler = RequestHandler::new(Arc::new(cache), compositor);

    let png = handler.render(&args.text, args.caption.as_deref())?;

    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, png).with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
