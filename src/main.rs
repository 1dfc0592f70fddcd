//! # Media Compressor - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Creazione della configurazione e avvio del batch
//! - Visualizzazione del progresso (progress bar o eventi JSON)
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI
//! 2. Configura il logging (INFO o DEBUG a seconda del flag verbose, `RUST_LOG` ha la precedenza)
//! 3. Controlla che ffmpeg sia disponibile (solo un warning se manca)
//! 4. Valida la configurazione e avvia il batch
//! 5. Consuma gli outcome fino alla fine; Ctrl+C annulla i job non ancora iniziati
//!
//! ## Esempio di utilizzo:
//! ```bash
//! media-compressor /path/to/media --resize --resize-percentage 20 --workers 8 --verbose
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use media_compressor::{
    config::{DEFAULT_RESIZE_PERCENTAGE, DEFAULT_RESIZE_THRESHOLD},
    file_manager::FileManager,
    json_output::JsonMessage,
    platform::PlatformCommands,
    progress::ProgressManager,
    Config, MediaCompressor,
};

#[derive(Parser)]
#[command(name = "media-compressor")]
#[command(about = "Compress images to WebP and transcode videos to MP4")]
struct Args {
    /// Folder containing the media files to compress
    source_folder: PathBuf,

    /// Output folder (default: <source_folder>/compressed)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Leave images alone (they are reported as skipped)
    #[arg(long)]
    skip_images: bool,

    /// Do not carry EXIF metadata into the WebP output
    #[arg(long)]
    remove_image_metadata: bool,

    /// Shrink images whose larger side exceeds the threshold
    #[arg(long)]
    resize: bool,

    /// Percentage removed from each dimension when resizing (0-100, exclusive)
    #[arg(long, default_value_t = DEFAULT_RESIZE_PERCENTAGE)]
    resize_percentage: f64,

    /// Larger-side size in pixels above which images are resized
    #[arg(long, default_value_t = DEFAULT_RESIZE_THRESHOLD)]
    resize_threshold: u32,

    /// Drop the audio stream from videos
    #[arg(long)]
    remove_video_audio: bool,

    /// Strip container metadata from videos
    #[arg(long)]
    remove_video_metadata: bool,

    /// Number of parallel workers (default: available cores)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Path to the ffmpeg executable
    #[arg(long)]
    ffmpeg: Option<PathBuf>,

    /// Emit newline-delimited JSON events instead of a progress bar
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn to_config(&self) -> Config {
        let mut config = Config::new(&self.source_folder);

        if let Some(ref output) = self.output {
            config.output_root = output.clone();
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(ref ffmpeg) = self.ffmpeg {
            config.video_encoder = ffmpeg.clone();
        }

        config.compress_images = !self.skip_images;
        config.remove_image_metadata = self.remove_image_metadata;
        config.enable_resize = self.resize;
        config.resize_percentage = self.resize_percentage;
        config.resize_threshold = self.resize_threshold;
        config.remove_video_audio = self.remove_video_audio;
        config.remove_video_metadata = self.remove_video_metadata;
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout is reserved for JSON events
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = args.to_config();

    if PlatformCommands::instance().is_command_available(&config.video_encoder) {
        info!("{} found.", config.video_encoder.display());
    } else {
        warn!(
            "Warning: {} not found. Video compression will not work. Please install it and ensure it's in your system's PATH.",
            config.video_encoder.display()
        );
    }

    if let Err(e) = run(config, args.json).await {
        if args.json {
            JsonMessage::error(e.to_string(), e.chain().nth(1).map(|s| s.to_string())).emit();
        }
        return Err(e);
    }

    Ok(())
}

async fn run(config: Config, json: bool) -> Result<()> {
    let compressor = MediaCompressor::new(config)?;

    let spinner = (!json).then(|| ProgressManager::spinner("Scanning media files..."));
    let mut handle = compressor.start_batch().await?;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let initial = handle.progress();
    if json {
        JsonMessage::start(compressor.config(), &initial).emit();
    }
    let bar = (!json).then(|| ProgressManager::new(initial.total_jobs as u64));

    let mut cancelled = false;
    loop {
        tokio::select! {
            outcome = handle.next_outcome() => {
                let Some(outcome) = outcome else { break };
                let snapshot = handle.progress();

                if json {
                    JsonMessage::file_complete(&outcome).emit();
                    JsonMessage::progress(&snapshot).emit();
                }
                if let Some(ref bar) = bar {
                    let name = FileManager::display_name(&outcome.source_path);
                    let message = if outcome.status.is_success() {
                        let reduction = FileManager::calculate_reduction(outcome.original_size, outcome.compressed_size);
                        format!(
                            "{} {}: {} saved ({:.1}%)",
                            outcome.status.label(),
                            name,
                            FileManager::format_size(outcome.bytes_saved()),
                            reduction
                        )
                    } else if outcome.status.is_skipped() {
                        format!("{} {}: original kept", outcome.status.label(), name)
                    } else {
                        format!("{} {}", outcome.status.label(), name)
                    };
                    bar.update(snapshot.completed_jobs, &message);
                }
            }
            _ = tokio::signal::ctrl_c(), if !cancelled => {
                warn!("Interrupted: jobs not yet started will be cancelled");
                handle.cancel();
                cancelled = true;
            }
        }
    }

    let progress = handle.wait().await?;

    if json {
        JsonMessage::complete(&progress).emit();
    } else {
        if let Some(bar) = bar {
            bar.finish("Done");
        }
        println!("{}", progress.format_summary());
    }

    Ok(())
}
