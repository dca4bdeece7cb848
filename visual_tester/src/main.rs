mod replay;
mod settings;
#[cfg(feature = "opencv")]
mod video;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "visual_tester", about = "Highlights the ball in play and its trail")]
struct Cli {
    /// Configuration file (defaults to ./action_ball.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay recorded tracks (JSON lines) through the classifier
    Replay {
        /// Track file, one `{"tracks": [[x1, y1, x2, y2, id], ...]}` object per line
        #[arg(short, long)]
        input: PathBuf,

        /// Directory for annotated PNG frames
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        #[arg(long, default_value_t = 1280)]
        width: u32,

        #[arg(long, default_value_t = 720)]
        height: u32,

        /// Font for track labels; labels are skipped without one
        #[arg(long)]
        font: Option<PathBuf>,
    },

    /// Detect, track and annotate a video file
    #[cfg(feature = "opencv")]
    Run {
        #[arg(short, long)]
        input: PathBuf,

        /// Annotated XVID video
        #[arg(short, long)]
        output: PathBuf,

        /// ONNX model path, overrides `detector.model_path`
        #[arg(long)]
        model: Option<String>,
    },
}

fn execute(command: Command, app: settings::AppConfig, stop: &AtomicBool) -> Result<()> {
    match command {
        Command::Replay { input, output_dir, width, height, font } => {
            let options = replay::ReplayOptions { input, output_dir, width, height, font };
            let stdout = std::io::stdout();
            let summary = replay::run(&options, &app, stop, &mut stdout.lock())?;
            info!(
                frames = summary.frames,
                role_changes = summary.role_changes,
                rejected = summary.rejected_tracks,
                "done"
            );
        }
        #[cfg(feature = "opencv")]
        Command::Run { input, output, model } => {
            let mut app = app;
            if let Some(model) = model {
                app.detector.model_path = model;
            }
            let options = video::VideoOptions { input, output };
            video::run(&options, &app, stop)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("action_ball=info,visual_tester=info,warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let app = settings::load(cli.config.as_deref())?;

    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing the current frame");
            flag.store(true, Ordering::Relaxed);
        }
    });

    let command = cli.command;
    tokio::task::spawn_blocking(move || execute(command, app, &stop)).await??;
    Ok(())
}
