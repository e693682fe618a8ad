pub mod builder;

use cheer_queue::{CheerEntry, CheerQueue, QueuedCheer};
use tokio::sync::Mutex;

use crate::{
    artifacts::{ArtifactError, ArtifactStore},
    bus::LiveBus,
    notify::{notification_text, NotificationDispatcher},
    tts::SpeechSynthesizer,
    twitch::RecordingLocator,
    types::TtsNotification,
};

/// Result of one processing cycle that did not fail hard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Nothing was queued; no external call was made
    Empty,
    Processed {
        cheer: CheerEntry,
        /// Recording deep link, `None` when the channel was offline or the
        /// lookup failed
        url: Option<String>,
    },
}

/// Failures that abort a cycle. The dequeued cheer is not put back.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

// Drives one dequeue-to-broadcast cycle per call
#[derive(Debug)]
pub struct CheerProcessor<L, N, S>
where
    L: RecordingLocator + Send + Sync + 'static,
    N: NotificationDispatcher + Send + Sync + 'static,
    S: SpeechSynthesizer + Send + Sync + 'static,
{
    queue: CheerQueue,
    bus: LiveBus,
    artifacts: ArtifactStore,
    locator: L,
    dispatcher: N,
    synthesizer: S,
    cycle_lock: Mutex<()>,
}

impl<L, N, S> CheerProcessor<L, N, S>
where
    L: RecordingLocator + Send + Sync + 'static,
    N: NotificationDispatcher + Send + Sync + 'static,
    S: SpeechSynthesizer + Send + Sync + 'static,
{
    pub fn queue(&self) -> &CheerQueue {
        &self.queue
    }

    pub fn bus(&self) -> &LiveBus {
        &self.bus
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Looks up the recording link and cross-posts the cheer.
    ///
    /// Every failure in here is logged and swallowed; the cycle carries on
    /// without a link.
    #[tracing::instrument(skip_all, fields(user = %cheer.display_name))]
    async fn cross_post(&self, cheer: &CheerEntry) -> Option<String> {
        let url = match self.locator.locate().await {
            Ok(Some(link)) => Some(link.url),
            Ok(None) => {
                tracing::info!("Channel is not live, skipping recording link");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to locate recording");
                None
            }
        };

        let text = notification_text(cheer, url.as_deref());
        if let Err(e) = self.dispatcher.notify(&text).await {
            tracing::warn!(error = %e, "Failed to send cheer notification");
        }

        url
    }

    /// Runs one cycle: dequeue, cross-post, synthesize, persist, broadcast
    /// and schedule cleanup.
    ///
    /// Cycles are serialized; a second caller waits for the running cycle to
    /// finish before it dequeues.
    #[tracing::instrument(skip(self))]
    pub async fn process_next(&self) -> Result<ProcessOutcome, ProcessError> {
        let _cycle = self.cycle_lock.lock().await;

        let Ok(QueuedCheer { id, cheer }) = self.queue.dequeue_front() else {
            tracing::info!("No cheers in queue");
            return Ok(ProcessOutcome::Empty);
        };
        tracing::info!(%id, user = %cheer.display_name, bits = cheer.bits, "Processing cheer");

        let url = self.cross_post(&cheer).await;

        let attribution = cheer.attribution();
        let audio = self
            .synthesizer
            .synthesize(&attribution)
            .await
            .inspect_err(|e| tracing::error!(error = %e, %id, "Failed to synthesize cheer audio"))
            .map_err(|e| ProcessError::Synthesis(e.to_string()))?;

        let artifact = self
            .artifacts
            .persist(&audio, S::AUDIO_EXTENSION)
            .await
            .inspect_err(|e| tracing::error!(error = %e, %id, "Failed to write cheer audio"))?;

        self.bus.broadcast(TtsNotification {
            audio_url: artifact.public_url.clone(),
            message: attribution,
        });
        self.artifacts.schedule_deletion(artifact);

        tracing::info!(%id, "TTS audio prepared and notification sent");
        Ok(ProcessOutcome::Processed { cheer, url })
    }
}
