use cheer_queue::CheerQueue;
use tokio::sync::Mutex;

use crate::{
    artifacts::ArtifactStore, bus::LiveBus, notify::NotificationDispatcher,
    tts::SpeechSynthesizer, twitch::RecordingLocator, CheerProcessor,
};

pub struct CheerProcessorBuilder<L = (), N = (), S = ()> {
    queue: CheerQueue,
    artifacts: ArtifactStore,
    bus: LiveBus,
    locator: L,
    dispatcher: N,
    synthesizer: S,
}

impl CheerProcessorBuilder {
    pub fn new(queue: CheerQueue, artifacts: ArtifactStore) -> Self {
        Self {
            queue,
            artifacts,
            bus: LiveBus::new(),
            locator: (),
            dispatcher: (),
            synthesizer: (),
        }
    }
}

impl<L, N, S> CheerProcessorBuilder<L, N, S> {
    pub fn locator<L2: RecordingLocator + Send + Sync + 'static>(
        self,
        locator: L2,
    ) -> CheerProcessorBuilder<L2, N, S> {
        CheerProcessorBuilder {
            queue: self.queue,
            artifacts: self.artifacts,
            bus: self.bus,
            locator,
            dispatcher: self.dispatcher,
            synthesizer: self.synthesizer,
        }
    }

    pub fn dispatcher<N2: NotificationDispatcher + Send + Sync + 'static>(
        self,
        dispatcher: N2,
    ) -> CheerProcessorBuilder<L, N2, S> {
        CheerProcessorBuilder {
            queue: self.queue,
            artifacts: self.artifacts,
            bus: self.bus,
            locator: self.locator,
            dispatcher,
            synthesizer: self.synthesizer,
        }
    }

    pub fn synthesizer<S2: SpeechSynthesizer + Send + Sync + 'static>(
        self,
        synthesizer: S2,
    ) -> CheerProcessorBuilder<L, N, S2> {
        CheerProcessorBuilder {
            queue: self.queue,
            artifacts: self.artifacts,
            bus: self.bus,
            locator: self.locator,
            dispatcher: self.dispatcher,
            synthesizer,
        }
    }

    /// Shares an existing bus instead of the fresh one created by `new`
    pub fn bus(mut self, bus: LiveBus) -> Self {
        self.bus = bus;
        self
    }
}

impl<L, N, S> CheerProcessorBuilder<L, N, S>
where
    L: RecordingLocator + Send + Sync + 'static,
    N: NotificationDispatcher + Send + Sync + 'static,
    S: SpeechSynthesizer + Send + Sync + 'static,
{
    pub fn build(self) -> CheerProcessor<L, N, S> {
        CheerProcessor {
            queue: self.queue,
            bus: self.bus,
            artifacts: self.artifacts,
            locator: self.locator,
            dispatcher: self.dispatcher,
            synthesizer: self.synthesizer,
            cycle_lock: Mutex::new(()),
        }
    }
}
