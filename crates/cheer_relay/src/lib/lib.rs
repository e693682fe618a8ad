mod error;
pub mod artifacts;
pub mod bus;
pub mod notify;
pub mod parser;
mod processor;
pub mod server;
pub mod tracing;
pub mod tts;
pub mod twitch;
pub mod types;

pub use error::Error;
pub use processor::{
    builder::CheerProcessorBuilder, CheerProcessor, ProcessError, ProcessOutcome,
};
