//! # Video Processing Module
//!
//! Questo modulo gestisce la transcodifica di tutti i formati video supportati.
//!
//! ## Responsabilità:
//! - Costruisce la richiesta per l'encoder esterno (ffmpeg)
//! - Esegue il processo figlio senza bloccare il runtime
//! - Interpreta exit code e file di output in un `Outcome`
//!
//! ## Formati supportati:
//! - **Input**: MP4, MOV, AVI, MKV, WebM
//! - **Output**: MP4 (H.264 + AAC) per massima compatibilità
//!
//! ## Parametri fissi:
//! - Codec video: libx264, CRF 23, preset medium
//! - Audio: AAC 128k, oppure rimosso (`-an`)
//! - Metadata: preservati, oppure rimossi (`-map_metadata -1`)
//! - Sovrascrittura sempre attiva (`-y`)
//!
//! ## Esiti:
//! - encoder non trovato → `Failed` con lo stesso messaggio per tutti i video del batch
//! - exit code diverso da zero → `Failed`, con l'output diagnostico di ffmpeg; un output
//!   lasciato da questa esecuzione viene eliminato, quello di un'esecuzione precedente no
//! - exit code zero ma output assente o vuoto → `Failed`, l'output vuoto viene eliminato
//! - altrimenti → `Success`
//!
//! Nessun retry.

use crate::args;
use crate::config::Config;
use crate::error::CompressError;
use crate::file_manager::FileManager;
use crate::optimizer::path_resolver::PathResolver;
use crate::outcome::{Job, Outcome, OutcomeStatus};
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, warn};

/// Extension of every video output
pub const TARGET_EXTENSION: &str = "mp4";

const VIDEO_CODEC: &str = "libx264";
const VIDEO_CRF: u8 = 23;
const VIDEO_PRESET: &str = "medium";
const AUDIO_CODEC: &str = "aac";
const AUDIO_BITRATE: &str = "128k";

/// Handles video transcoding
pub struct VideoProcessor {
    config: Arc<Config>,
}

impl VideoProcessor {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Encoder arguments for one transcode
    pub fn build_args(&self, input_path: &Path, output_path: &Path) -> Vec<String> {
        let mut cmd_args = args![
            "-i",
            input_path.display(),
            "-c:v",
            VIDEO_CODEC,
            "-crf",
            VIDEO_CRF,
            "-preset",
            VIDEO_PRESET,
        ];

        if self.config.remove_video_audio {
            cmd_args.extend(args!["-an"]);
        } else {
            cmd_args.extend(args!["-c:a", AUDIO_CODEC, "-b:a", AUDIO_BITRATE]);
        }

        if self.config.remove_video_metadata {
            cmd_args.extend(args!["-map_metadata", "-1"]);
        }

        cmd_args.extend(args!["-f", TARGET_EXTENSION, "-y", output_path.display()]);
        cmd_args
    }

    /// Transcode one video. Never fails: every error becomes a `Failed` outcome.
    pub async fn compress(&self, job: &Job) -> Outcome {
        let original_size = match FileManager::get_file_size(&job.source_path).await {
            Ok(size) => size,
            Err(e) => return Outcome::failed(job, 0, &e),
        };

        match self.transcode(job, original_size).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Video transcode failed for {}: {}", job.source_path.display(), e);
                Outcome::failed(job, original_size, &e)
            }
        }
    }

    async fn transcode(&self, job: &Job, original_size: u64) -> Result<Outcome, CompressError> {
        let name = FileManager::display_name(&job.source_path);
        let output_path = PathResolver::get_output_path(
            &job.source_path,
            &self.config.source_root,
            &self.config.output_root,
            TARGET_EXTENSION,
        )?;

        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let program = &self.config.video_encoder;
        let program_name = program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.display().to_string());

        let existed_before = tokio::fs::try_exists(&output_path).await.unwrap_or(false);

        debug!("🎬 Transcoding {} with {}", name, program.display());
        let start_time = std::time::Instant::now();

        let output = Command::new(program)
            .args(self.build_args(&job.source_path, &output_path))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                    CompressError::EncoderMissing {
                        program: program_name.clone(),
                    }
                }
                _ => CompressError::Io(e),
            })?;

        let diagnostics = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            let left_size = tokio::fs::metadata(&output_path).await.map(|m| m.len()).ok();
            if left_size == Some(0) || (left_size.is_some() && !existed_before) {
                let _ = tokio::fs::remove_file(&output_path).await;
            }
            return Err(CompressError::EncoderFailure {
                program: program_name,
                code: output.status.code(),
                diagnostics,
            });
        }

        let compressed_size = tokio::fs::metadata(&output_path)
            .await
            .map(|m| m.len())
            .unwrap_or(0);

        if compressed_size == 0 {
            let _ = tokio::fs::remove_file(&output_path).await;
            return Err(CompressError::EmptyOutput { diagnostics });
        }

        debug!(
            "Video transcode of {} completed in {:.1}s",
            name,
            start_time.elapsed().as_secs_f64()
        );

        let message = format!(
            "Compressed {} to MP4 ({} -> {})",
            name,
            FileManager::format_size(original_size),
            FileManager::format_size(compressed_size)
        );

        Ok(Outcome::success(
            job,
            OutcomeStatus::Success,
            original_size,
            compressed_size,
            output_path,
            message,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_manager::MediaKind;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn setup(encoder: &str) -> (TempDir, Arc<Config>, Job) {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();
        std::fs::create_dir_all(root.join("clips")).unwrap();
        let source = root.join("clips/holiday.mov");
        std::fs::write(&source, vec![0u8; 2048]).unwrap();

        let mut config = Config::new(&root);
        config.video_encoder = PathBuf::from(encoder);
        (temp_dir, Arc::new(config), Job::new(source, MediaKind::Video))
    }

    #[test]
    fn test_default_args() {
        let config = Arc::new(Config::new("/media"));
        let processor = VideoProcessor::new(config);
        let args = processor.build_args(Path::new("/media/a.mov"), Path::new("/media/compressed/a.mp4"));
        assert_eq!(
            args,
            vec![
                "-i", "/media/a.mov", "-c:v", "libx264", "-crf", "23", "-preset", "medium",
                "-c:a", "aac", "-b:a", "128k", "-f", "mp4", "-y", "/media/compressed/a.mp4",
            ]
        );
    }

    #[test]
    fn test_stripping_args() {
        let mut config = Config::new("/media");
        config.remove_video_audio = true;
        config.remove_video_metadata = true;
        let processor = VideoProcessor::new(Arc::new(config));
        let args = processor.build_args(Path::new("/media/a.mov"), Path::new("/out/a.mp4"));

        assert!(args.contains(&"-an".to_string()));
        assert!(!args.contains(&"aac".to_string()));
        let map = args.iter().position(|a| a == "-map_metadata").unwrap();
        assert_eq!(args[map + 1], "-1");
        assert_eq!(args.last().unwrap(), "/out/a.mp4");
    }

    #[tokio::test]
    async fn test_missing_encoder() {
        let (_temp_dir, config, job) = setup("/nonexistent/bin/ffmpeg");
        let outcome = VideoProcessor::new(config).compress(&job).await;

        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert_eq!(outcome.original_size, 2048);
        assert_eq!(
            outcome.message,
            "Error: ffmpeg not found. Please ensure it's installed and in your system's PATH."
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_fails() {
        let (_temp_dir, config, job) = setup("false");
        let outcome = VideoProcessor::new(config.clone()).compress(&job).await;

        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert!(outcome.message.contains("false failed with code 1."), "{}", outcome.message);
        assert_eq!(outcome.compressed_size, 0);
        assert!(!config.output_root.join("clips/holiday.mp4").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_keeps_previous_output() {
        let (_temp_dir, config, job) = setup("false");
        let output = config.output_root.join("clips/holiday.mp4");
        std::fs::create_dir_all(output.parent().unwrap()).unwrap();
        std::fs::write(&output, vec![9u8; 100]).unwrap();

        let outcome = VideoProcessor::new(config).compress(&job).await;
        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert_eq!(std::fs::read(&output).unwrap(), vec![9u8; 100]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_partial_output_of_failed_run_is_removed() {
        // Writes some bytes to the output, then fails
        let (temp_dir, mut config, job) = setup("sh");
        let script = temp_dir.path().join("broken_ffmpeg.sh");
        std::fs::write(&script, "#!/bin/sh\nfor last; do :; done\necho partial > \"$last\"\nexit 3\n").unwrap();
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        Arc::make_mut(&mut config).video_encoder = script;

        let outcome = VideoProcessor::new(config.clone()).compress(&job).await;
        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert!(outcome.message.contains("failed with code 3."), "{}", outcome.message);
        assert!(!config.output_root.join("clips/holiday.mp4").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_executable_encoder_is_reported_missing() {
        let (temp_dir, mut config, job) = setup("ffmpeg");
        let encoder = temp_dir.path().join("ffmpeg");
        std::fs::write(&encoder, b"not a program").unwrap();
        Arc::make_mut(&mut config).video_encoder = encoder;

        let outcome = VideoProcessor::new(config).compress(&job).await;
        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert_eq!(
            outcome.message,
            "Error: ffmpeg not found. Please ensure it's installed and in your system's PATH."
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_output_fails() {
        // `true` exits 0 without writing anything
        let (_temp_dir, config, job) = setup("true");
        let outcome = VideoProcessor::new(config.clone()).compress(&job).await;

        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert!(outcome.message.contains("Output file not created or is empty."));
        assert!(!config.output_root.join("clips/holiday.mp4").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_empty_output_is_deleted() {
        let (_temp_dir, config, job) = setup("true");
        let output = config.output_root.join("clips/holiday.mp4");
        std::fs::create_dir_all(output.parent().unwrap()).unwrap();
        std::fs::write(&output, b"").unwrap();

        let outcome = VideoProcessor::new(config).compress(&job).await;
        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert!(!output.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_transcode() {
        // Stand-in encoder: copy the input (argument after -i) to the last argument
        let (temp_dir, mut config, job) = setup("sh");
        let script = temp_dir.path().join("fake_ffmpeg.sh");
        std::fs::write(&script, "#!/bin/sh\nin=\"$2\"\nfor last; do :; done\nhead -c 512 \"$in\" > \"$last\"\n")
            .unwrap();
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        Arc::make_mut(&mut config).video_encoder = script;

        let outcome = VideoProcessor::new(config.clone()).compress(&job).await;
        assert_eq!(outcome.status, OutcomeStatus::Success, "{}", outcome.message);
        assert_eq!(outcome.original_size, 2048);
        assert_eq!(outcome.compressed_size, 512);
        assert_eq!(outcome.output_path, Some(config.output_root.join("clips/holiday.mp4")));
        assert_eq!(outcome.message, "Compressed holiday.mov to MP4 (2.00 KB -> 512.00 B)");
    }
}
