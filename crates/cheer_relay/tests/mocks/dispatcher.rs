use std::sync::{Arc, Mutex};

use cheer_relay::notify::NotificationDispatcher;

#[derive(Clone)]
pub struct MockDispatcher {
    pub calls: Arc<Mutex<Vec<String>>>,
    pub fail_with: Option<String>,
}

impl Default for MockDispatcher {
    fn default() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
        }
    }
}

impl MockDispatcher {
    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Default::default()
        }
    }
}

impl NotificationDispatcher for MockDispatcher {
    type Error = anyhow::Error;

    async fn notify(&self, text: &str) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(text.to_string());
        if let Some(ref msg) = self.fail_with {
            return Err(anyhow::anyhow!("{}", msg));
        }
        Ok(())
    }
}
