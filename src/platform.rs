//! # Platform-specific utilities
//!
//! Questo modulo centralizza la logica cross-platform per trovare l'encoder video
//! esterno. Il nome del programma dipende dal sistema (`ffmpeg` / `ffmpeg.exe`) e può
//! essere sovrascritto con la variabile d'ambiente `FFMPEG_PATH`. La ricerca nel `PATH`
//! (bit di esecuzione, `PATHEXT` su Windows) è delegata al crate `which`.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

/// Environment variable overriding the ffmpeg location
pub const FFMPEG_PATH_ENV: &str = "FFMPEG_PATH";

/// Platform-specific command manager
pub struct PlatformCommands {
    commands: HashMap<&'static str, &'static str>,
}

impl PlatformCommands {
    /// Get the singleton instance
    pub fn instance() -> &'static Self {
        static INSTANCE: OnceLock<PlatformCommands> = OnceLock::new();
        INSTANCE.get_or_init(Self::new)
    }

    fn new() -> Self {
        let mut commands = HashMap::new();
        if cfg!(windows) {
            commands.insert("ffmpeg", "ffmpeg.exe");
        } else {
            commands.insert("ffmpeg", "ffmpeg");
        }

        Self { commands }
    }

    /// Get the platform-specific command name
    pub fn get_command<'a>(&self, base_name: &'a str) -> &'a str {
        self.commands.get(base_name).copied().unwrap_or(base_name)
    }

    /// Program used for video transcoding: `FFMPEG_PATH` if set, otherwise the platform name
    pub fn ffmpeg_program(&self) -> PathBuf {
        match env::var_os(FFMPEG_PATH_ENV) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => PathBuf::from(self.get_command("ffmpeg")),
        }
    }

    /// Resolve a program to an executable: paths with a directory component are checked
    /// as-is, bare names are looked up in `PATH`.
    pub fn resolve(&self, program: &Path) -> Option<PathBuf> {
        match which::which(program) {
            Ok(found) => {
                debug!("Resolved {} -> {}", program.display(), found.display());
                Some(found)
            }
            Err(e) => {
                debug!("Cannot resolve {}: {}", program.display(), e);
                None
            }
        }
    }

    /// Check if a program is available on the system
    pub fn is_command_available(&self, program: &Path) -> bool {
        self.resolve(program).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_platform_commands() {
        let platform = PlatformCommands::instance();
        let ffmpeg = platform.get_command("ffmpeg");
        assert!(ffmpeg.starts_with("ffmpeg"));
        assert_eq!(platform.get_command("unknown-tool"), "unknown-tool");
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_explicit_path() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let tool = temp_dir.path().join("encoder");
        std::fs::write(&tool, b"#!/bin/sh\n").unwrap();

        let platform = PlatformCommands::instance();
        // Present but not executable: spawning it would fail
        assert!(!platform.is_command_available(&tool));

        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert!(platform.is_command_available(&tool));
        assert!(!platform.is_command_available(&temp_dir.path().join("missing")));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_bare_name_from_path() {
        assert!(PlatformCommands::instance().is_command_available(Path::new("sh")));
    }

    #[test]
    fn test_resolve_missing_bare_name() {
        let platform = PlatformCommands::instance();
        assert!(!platform.is_command_available(Path::new("definitely-not-an-encoder-7f3a")));
    }
}
