use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use chrono::{DateTime, Utc};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// An audio file written for one processed cheer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtsArtifact {
    pub file_name: String,
    pub path: PathBuf,
    pub public_url: String,
    pub created_at: DateTime<Utc>,
}

impl TtsArtifact {
    /// Time since the file was written
    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.created_at
    }
}

#[derive(Debug)]
struct StoreInner {
    dir: PathBuf,
    url_prefix: String,
    ttl: Duration,
    tracker: TaskTracker,
    shutdown: CancellationToken,
}

/// Writes transient audio artifacts into the public directory and deletes
/// each one once its time-to-live has passed.
///
/// Pending deletions are tracked so that [`shutdown`](Self::shutdown) can
/// delete them right away instead of leaving files behind.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    inner: Arc<StoreInner>,
}

impl ArtifactStore {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

    pub fn new(dir: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self::new_with_ttl(dir, url_prefix, Self::DEFAULT_TTL)
    }

    pub fn new_with_ttl(
        dir: impl Into<PathBuf>,
        url_prefix: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                dir: dir.into(),
                url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
                ttl,
                tracker: TaskTracker::new(),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Number of artifacts still waiting for deletion
    pub fn pending(&self) -> usize {
        self.inner.tracker.len()
    }

    /// Writes `audio` under a fresh `cheer_<16 hex>.<extension>` name
    #[tracing::instrument(skip(self, audio), fields(size = audio.len()))]
    pub async fn persist(&self, audio: &[u8], extension: &str) -> Result<TtsArtifact, ArtifactError> {
        let file_name = format!("cheer_{}.{}", hex::encode(rand::random::<[u8; 8]>()), extension);
        let path = self.inner.dir.join(&file_name);

        tokio::fs::create_dir_all(&self.inner.dir)
            .await
            .map_err(|source| ArtifactError::Io {
                path: self.inner.dir.clone(),
                source,
            })?;
        tokio::fs::write(&path, audio)
            .await
            .map_err(|source| ArtifactError::Io {
                path: path.clone(),
                source,
            })?;

        tracing::info!(path = %path.display(), "TTS audio file written");

        Ok(TtsArtifact {
            public_url: format!("{}/{}", self.inner.url_prefix, file_name),
            file_name,
            path,
            created_at: Utc::now(),
        })
    }

    /// Deletes `artifact` after the store's TTL, or immediately once
    /// [`shutdown`](Self::shutdown) has been requested. Deletion failures are
    /// only logged.
    pub fn schedule_deletion(&self, artifact: TtsArtifact) {
        let ttl = self.inner.ttl;
        let shutdown = self.inner.shutdown.clone();

        self.inner.tracker.spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(ttl) => {}
                _ = shutdown.cancelled() => {
                    tracing::debug!(path = %artifact.path.display(), "Flushing artifact on shutdown");
                }
            }

            match tokio::fs::remove_file(&artifact.path).await {
                Ok(()) => tracing::info!(
                    path = %artifact.path.display(),
                    age_secs = artifact.age().num_seconds(),
                    "Deleted file"
                ),
                Err(e) => {
                    tracing::error!(error = ?e, path = %artifact.path.display(), "Error deleting file")
                }
            }
        });
    }

    /// Deletes every pending artifact now and waits for the deletions to finish
    pub async fn shutdown(&self) {
        tracing::info!(pending = self.pending(), "Flushing pending artifact deletions");
        self.inner.shutdown.cancel();
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
    }
}
