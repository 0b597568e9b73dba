/// Parallax - head-coupled off-axis renderer in the terminal
///
/// Draws a wireframe room with floating shapes whose apparent depth follows
/// the viewer's head. Controls:
///   - Arrow Keys: Move the simulated head (keys source)
///   - C: Recenter the simulated head
///   - H: Toggle the HUD
///   - Q/ESC/Ctrl-C: Quit
use anyhow::{Context, Result};
use clap::Parser;
use parallax_core::{Config, Preset};
use parallax_terminal::tracker::{self, HeadSourceKind};
use parallax_terminal::TerminalApp;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "parallax", version, about = "Head-coupled off-axis 3D illusion in the terminal")]
struct Args {
    /// Built-in preset the config starts from (neon, studio)
    #[arg(long, default_value = "neon")]
    preset: Preset,

    /// TOML file layered over the preset
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where head offsets come from: keys, stdin or udp:<addr>
    #[arg(long, default_value = "keys")]
    head_source: HeadSourceKind,

    /// Override the frame rate
    #[arg(long)]
    fps: Option<u32>,

    /// Do not mirror tracked x offsets
    #[arg(long)]
    no_mirror: bool,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print the effective config as TOML and exit
    #[arg(long)]
    dump_config: bool,
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let default_level = if log_file.is_some() { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;

    let mut config = Config::load(args.preset, args.config.as_deref()).context("failed to load config")?;
    if let Some(fps) = args.fps {
        config.display.fps = fps;
    }
    if args.no_mirror {
        config.display.mirror = false;
    }
    config.validate().context("invalid config")?;

    if args.dump_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let head = tracker::start(&args.head_source, config.display.mirror)
        .with_context(|| format!("failed to start head source {}", args.head_source))?;

    let mut app = TerminalApp::new(&config, args.preset.name(), head).context("failed to set up terminal")?;
    app.run()?;

    tracing::info!("exited cleanly");
    Ok(())
}
