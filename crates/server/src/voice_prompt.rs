//! Voice prompt resolution
//!
//! Requests name a reference clip relative to the configured prompt
//! directory. Resolution rejects anything that escapes that directory,
//! including through symlinks, then checks the file exists and has an
//! allowed extension.

use std::path::{Component, Path, PathBuf};

use tts_gateway_config::VoicePromptConfig;
use tts_gateway_core::{VoicePrompt, VoicePromptError};

/// Resolves request-supplied prompt names to files on disk
#[derive(Debug, Clone)]
pub struct VoicePromptResolver {
    directory: PathBuf,
    allowed_extensions: Vec<String>,
    min_duration_seconds: f64,
    max_duration_seconds: f64,
}

impl VoicePromptResolver {
    pub fn new(config: &VoicePromptConfig) -> Self {
        Self {
            directory: config.directory.clone(),
            allowed_extensions: config
                .allowed_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            min_duration_seconds: config.min_duration_seconds,
            max_duration_seconds: config.max_duration_seconds,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Resolve `name` to a voice prompt inside the prompt directory
    pub fn resolve(&self, name: &str) -> Result<VoicePrompt, VoicePromptError> {
        let relative = Path::new(name);
        let escapes = relative.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes {
            tracing::warn!(audio_prompt = %name, "Rejected voice prompt outside prompt directory");
            return Err(VoicePromptError::PathTraversal(name.to_string()));
        }

        let not_found = || VoicePromptError::NotFound(name.to_string());

        let root = self.directory.canonicalize().map_err(|_| not_found())?;
        let full = root.join(relative).canonicalize().map_err(|_| not_found())?;

        // Symlinks can still point elsewhere
        if !full.starts_with(&root) {
            tracing::warn!(audio_prompt = %name, "Voice prompt resolves outside prompt directory");
            return Err(VoicePromptError::PathTraversal(name.to_string()));
        }

        if !full.is_file() {
            return Err(not_found());
        }

        let extension = full
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        if !self.allowed_extensions.iter().any(|a| *a == extension) {
            return Err(VoicePromptError::UnsupportedExtension(format!(".{}", extension)));
        }

        self.check_duration(&full, &extension);

        Ok(VoicePrompt::new(full))
    }

    /// Warn about clips outside the recommended length. Never fails.
    fn check_duration(&self, path: &Path, extension: &str) {
        if extension != "wav" {
            tracing::debug!(path = %path.display(), "Skipping duration check for non-WAV prompt");
            return;
        }

        let duration = match wav_duration(path) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not read voice prompt duration");
                return;
            }
        };

        if duration < self.min_duration_seconds {
            tracing::warn!(
                path = %path.display(),
                duration_sec = duration,
                min_sec = self.min_duration_seconds,
                "Voice prompt is shorter than recommended"
            );
        } else if duration > self.max_duration_seconds {
            tracing::warn!(
                path = %path.display(),
                duration_sec = duration,
                max_sec = self.max_duration_seconds,
                "Voice prompt is longer than recommended"
            );
        } else {
            tracing::info!(path = %path.display(), duration_sec = duration, "Using voice prompt");
        }
    }
}

fn wav_duration(path: &Path) -> Result<f64, hound::Error> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Ok(0.0);
    }
    Ok(reader.duration() as f64 / spec.sample_rate as f64)
}
