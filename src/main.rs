//! meisencam binary: one invocation runs one capture-compare-upload cycle.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use meisencam::camera::{Camera, RpicamStill};
use meisencam::config::{AppConfig, DEFAULT_ENV_FILE, EnvSource};
use meisencam::pipeline::CyclePipeline;

#[derive(Parser)]
#[command(name = "meisencam", about = "Bird-box camera: capture, motion-score, upload")]
struct Cli {
    /// Capture a single test image and exit, without motion detection or
    /// upload.
    #[arg(short = 't', long)]
    test: bool,

    /// Output path for the test image (defaults to the work dir's
    /// current.jpg).
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// dotenv-style file to layer under the process environment.
    #[arg(long)]
    env_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let env_file = cli.env_file.unwrap_or_else(|| PathBuf::from(DEFAULT_ENV_FILE));
    let source = if env_file.is_file() {
        EnvSource::with_env_file(&env_file)?
    } else {
        EnvSource::from_process()
    };
    let config = AppConfig::from_source(&source)?;

    let mut camera = RpicamStill::new(config.camera.clone());

    if cli.test {
        let output = cli.output.unwrap_or_else(|| config.current_image_path());
        let timestamp = camera.capture(&output)?;
        tracing::info!(path = %output.display(), %timestamp, "test image saved");
        return Ok(());
    }

    let mut pipeline = CyclePipeline::new(config, camera);
    let report = pipeline.run_cycle()?;
    tracing::info!(
        timestamp = %report.timestamp,
        score = report.score,
        mode = report.mode,
        upload_status = report.upload_status,
        "cycle complete"
    );
    Ok(())
}
