//! Scope - capture a photo and turn it into upright OCR input
//!
//! Command-line host for the scan pipeline. The camera is an external
//! command and the OCR input is written as a PNG file.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossbeam_channel::{unbounded, Receiver};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use scope_capture::config::{self, AppConfig};
use scope_capture::storage;
use scope_capture::{
    read_orientation, CapturedImage, CheckpointStore, CommandDevice, ImageFileSink, Normalizer, OcrConsumer,
    PipelineEvent, PipelineOutcome, ResumeOutcome, ScanPipeline, UnavailableDevice,
};

/// Scope - photo capture and orientation normalization for OCR
#[derive(Parser, Debug)]
#[command(name = "scope-capture")]
#[command(about = "Capture a photo and produce an upright RGBA image for OCR")]
struct Args {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture a photo with the configured device and normalize it
    Scan {
        /// Where to write the normalized PNG
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Capture to a fresh file instead of overwriting the configured destination
        #[arg(long)]
        keep_history: bool,
    },
    /// Normalize an existing photo
    Normalize {
        /// Photo to normalize
        input: PathBuf,

        /// Decode-time subsampling factor (overrides config)
        #[arg(short, long)]
        downsample: Option<u32>,

        /// Where to write the normalized PNG
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the orientation recorded in a photo
    Orientation {
        /// Photo to inspect
        input: PathBuf,
    },
    /// Finish a capture interrupted before normalization
    Resume {
        /// Where to write the normalized PNG
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => storage::get_config_dir()?.join("config.toml"),
    };

    let explicit = args.config.is_some();
    let load = || load_or_create_config(&config_path, explicit);

    match args.command {
        Command::InitConfig { force } => init_config(&config_path, force),
        Command::Scan { output, keep_history } => scan(&load()?, output, keep_history),
        Command::Normalize {
            input,
            downsample,
            output,
        } => normalize_file(&load()?, &input, downsample, output),
        Command::Orientation { input } => {
            let tag = read_orientation(&CapturedImage::from_existing(&input))?;
            println!("{}: {} ({}° clockwise)", input.display(), tag, tag.rotation_degrees());
            Ok(())
        }
        Command::Resume { output } => resume(&load()?, output),
    }
}

/// Load configuration from file or fall back to defaults
fn load_or_create_config(path: &Path, explicit: bool) -> Result<AppConfig> {
    if path.exists() {
        let config = config::load_config(path)?;
        info!("Loaded configuration from {:?}", path);
        return Ok(config);
    }
    if explicit {
        bail!("Config file {:?} does not exist", path);
    }
    info!("Using default configuration");
    Ok(AppConfig::default())
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{:?} already exists (use --force to overwrite)", path);
    }
    config::save_config(&AppConfig::default(), path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn scan(config: &AppConfig, output: Option<PathBuf>, keep_history: bool) -> Result<()> {
    if config.capture.device_command.is_empty() {
        bail!("No capture device configured; set capture.device_command in the config file");
    }

    let mut destination = config.destination_path()?;
    if keep_history {
        let name = format!("capture_{}.jpg", Uuid::new_v4());
        destination = match destination.parent() {
            Some(parent) => parent.join(name),
            None => PathBuf::from(name),
        };
    }

    let device = CommandDevice::from_argv(&config.capture.device_command, config.capture.cancel_exit_code)?;
    let (tx, rx) = unbounded();
    let pipeline = ScanPipeline::from_config(Arc::new(device), config)?.with_events(tx);

    let mut sink = ImageFileSink::new(output.unwrap_or_else(|| destination.with_extension("png")));
    let outcome = pipeline.run(&destination, &mut sink);
    log_events(&rx);

    match outcome? {
        PipelineOutcome::Completed(report) => {
            println!(
                "{}x{} OCR input written to {} (orientation {})",
                report.width,
                report.height,
                sink.path().display(),
                report.orientation
            );
        }
        PipelineOutcome::CaptureCancelled => println!("Capture cancelled"),
    }
    Ok(())
}

fn normalize_file(
    config: &AppConfig,
    input: &Path,
    downsample: Option<u32>,
    output: Option<PathBuf>,
) -> Result<()> {
    let image = CapturedImage::from_existing(input);
    let tag = read_orientation(&image)?;
    let factor = downsample.unwrap_or(config.normalize.downsample_factor);

    let buffer = Normalizer::new(&config.normalize).normalize(&image, tag, factor)?;
    let (width, height) = buffer.dimensions();

    let out = output.unwrap_or_else(|| input.with_extension("normalized.png"));
    let mut sink = ImageFileSink::new(&out);
    sink.consume(buffer)
        .with_context(|| format!("Failed to write {:?}", out))?;

    println!("{}x{} ({}) written to {}", width, height, tag, out.display());
    Ok(())
}

fn resume(config: &AppConfig, output: Option<PathBuf>) -> Result<()> {
    let store = CheckpointStore::new(config.checkpoint_path()?);
    let Some(checkpoint) = store.load()?.filter(|cp| cp.photo_taken) else {
        println!("Nothing to resume");
        return Ok(());
    };

    let out = output.unwrap_or_else(|| checkpoint.destination.with_extension("png"));
    let pipeline = ScanPipeline::from_config(Arc::new(UnavailableDevice), config)?;
    let mut sink = ImageFileSink::new(out);

    match pipeline.resume(&mut sink)? {
        ResumeOutcome::Completed(report) => println!(
            "Resumed {}: {}x{} written to {}",
            report.image.path().display(),
            report.width,
            report.height,
            sink.path().display()
        ),
        ResumeOutcome::NothingPending => println!("Nothing to resume"),
    }
    Ok(())
}

fn log_events(rx: &Receiver<PipelineEvent>) {
    for event in rx.try_iter() {
        match event {
            PipelineEvent::Failed { reason } => warn!("Scan failed: {}", reason),
            other => info!("{:?}", other),
        }
    }
}
