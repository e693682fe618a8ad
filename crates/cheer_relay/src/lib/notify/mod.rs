pub mod discord;

use std::{
    fmt::{Debug, Display},
    future::Future,
};

use cheer_queue::CheerEntry;

/// Cross-posts cheer announcements to a team chat channel
pub trait NotificationDispatcher {
    type Error: Debug + Display + Send + Sync;

    fn notify(&self, text: &str) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// `Cheer from <user>: <message>` followed by the recording link on its own
/// line when one is available
pub fn notification_text(cheer: &CheerEntry, url: Option<&str>) -> String {
    match url {
        Some(url) => format!("{}\n{}", cheer.attribution(), url),
        None => cheer.attribution(),
    }
}
