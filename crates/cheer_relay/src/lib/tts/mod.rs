pub mod elevenlabs;

use std::{
    fmt::{Debug, Display},
    future::Future,
};

use bytes::Bytes;

pub trait SpeechSynthesizer {
    /// File extension of the audio this synthesizer produces
    const AUDIO_EXTENSION: &'static str;

    type Error: Debug + Display + Send + Sync;

    fn synthesize(&self, text: &str) -> impl Future<Output = Result<Bytes, Self::Error>> + Send;
}
