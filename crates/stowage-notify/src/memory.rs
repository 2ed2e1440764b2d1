//! A notifier that keeps every message in memory.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::notifier::{Notifier, NotifyResult};

#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<String>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages delivered so far, oldest first.
    pub fn sent(&self) -> Vec<String> {
        self.sent
            .lock()
            .map(|v| v.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn clear(&self) {
        if let Ok(mut v) = self.sent.lock() {
            v.clear();
        }
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn send(&self, text: &str) -> NotifyResult<()> {
        if let Ok(mut v) = self.sent.lock() {
            v.push(text.to_string());
        }
        Ok(())
    }

    fn channel(&self) -> &'static str {
        "memory"
    }
}
