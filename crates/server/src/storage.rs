//! Batch output storage
//!
//! Finished batch audio is written as 16-bit mono WAV under the output
//! directory, named `{session_id}_{uuid}.wav`. A background task deletes
//! files older than the retention window. An optional [`AudioPublisher`]
//! turns a stored file into a URL; without one, callers inline the bytes.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tokio::sync::watch;

use tts_gateway_config::OutputConfig;
use tts_gateway_core::AssembledAudio;

use crate::ServerError;

/// Encode assembled audio as a 16-bit PCM mono WAV file
pub fn encode_wav(audio: &AssembledAudio) -> Result<Vec<u8>, ServerError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let to_err = |e: hound::Error| ServerError::Internal(format!("WAV encoding failed: {}", e));

    let mut cursor = Cursor::new(Vec::with_capacity(44 + audio.samples.len() * 2));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).map_err(to_err)?;
        for &sample in &audio.samples {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer.write_sample(value).map_err(to_err)?;
        }
        writer.finalize().map_err(to_err)?;
    }

    Ok(cursor.into_inner())
}

/// A file written to the output directory
#[derive(Debug, Clone)]
pub struct StoredAudio {
    pub filename: String,
    pub path: PathBuf,
}

/// Output directory with time-based retention
#[derive(Debug)]
pub struct OutputStore {
    directory: PathBuf,
    retention: Duration,
    cleanup_interval: Duration,
}

impl OutputStore {
    pub fn new(config: &OutputConfig) -> Self {
        Self::with_retention(
            config.directory.clone(),
            Duration::from_secs(config.retention_hours.saturating_mul(3600)),
            Duration::from_secs(config.cleanup_interval_seconds.max(1)),
        )
    }

    pub fn with_retention(directory: PathBuf, retention: Duration, cleanup_interval: Duration) -> Self {
        Self {
            directory,
            retention,
            cleanup_interval,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Write `bytes` for `session_id`, creating the directory if needed
    pub async fn save(&self, session_id: &str, bytes: &[u8]) -> Result<StoredAudio, ServerError> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| ServerError::Storage(format!("{}: {}", self.directory.display(), e)))?;

        let filename = format!("{}_{}.wav", sanitize(session_id), uuid::Uuid::new_v4().simple());
        let path = self.directory.join(&filename);

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ServerError::Storage(format!("{}: {}", path.display(), e)))?;

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Saved batch audio");

        Ok(StoredAudio { filename, path })
    }

    /// Delete files older than the retention window. Returns how many went.
    pub fn purge_expired(&self) -> std::io::Result<usize> {
        let entries = match std::fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let now = SystemTime::now();
        let mut removed = 0;

        for entry in entries.flatten() {
            let metadata = match entry.metadata() {
                Ok(m) if m.is_file() => m,
                _ => continue,
            };
            let age = metadata
                .modified()
                .ok()
                .and_then(|m| now.duration_since(m).ok())
                .unwrap_or_default();

            if age >= self.retention {
                match std::fs::remove_file(entry.path()) {
                    Ok(()) => removed += 1,
                    Err(e) => {
                        tracing::warn!(path = %entry.path().display(), error = %e, "Failed to delete expired output")
                    }
                }
            }
        }

        Ok(removed)
    }

    /// Start the background retention sweep.
    ///
    /// Returns a shutdown sender; send `true` to stop the task.
    pub fn start_cleanup_task(self: &Arc<Self>) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let store = Arc::clone(self);
        let interval = store.cleanup_interval;

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            interval_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        match store.purge_expired() {
                            Ok(0) => {}
                            Ok(n) => tracing::info!("Output cleanup: removed {} expired files", n),
                            Err(e) => tracing::warn!(error = %e, "Output cleanup failed"),
                        }
                    }
                    result = shutdown_rx.changed() => {
                        if result.is_err() || *shutdown_rx.borrow() {
                            tracing::info!("Output cleanup task shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }
}

/// Keep session ids from steering the output path
fn sanitize(session_id: &str) -> String {
    let cleaned: String = session_id
        .chars()
        .take(64)
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "session".to_string()
    } else {
        cleaned
    }
}

/// Makes stored audio reachable by URL
#[async_trait]
pub trait AudioPublisher: Send + Sync {
    /// Publish a stored file. `Ok(None)` means callers should inline the audio.
    async fn publish(&self, stored: &StoredAudio, bytes: &[u8]) -> Result<Option<String>, ServerError>;
}

/// Publisher for an output directory already served at a public base URL
#[derive(Debug, Clone)]
pub struct StaticUrlPublisher {
    base_url: String,
}

impl StaticUrlPublisher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AudioPublisher for StaticUrlPublisher {
    async fn publish(&self, stored: &StoredAudio, _bytes: &[u8]) -> Result<Option<String>, ServerError> {
        Ok(Some(format!("{}/{}", self.base_url, stored.filename)))
    }
}
