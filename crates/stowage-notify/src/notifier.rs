//! Notification channel trait and selection.

use async_trait::async_trait;
use stowage_core::TelegramConfig;
use thiserror::Error;
use tracing::{debug, warn};

use crate::telegram::TelegramNotifier;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("http client error: {0}")]
    Client(String),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("notification rejected ({status}): {description}")]
    Rejected { status: u16, description: String },
}

pub type NotifyResult<T> = Result<T, NotifyError>;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> NotifyResult<()>;

    /// Short channel name for logs.
    fn channel(&self) -> &'static str;
}

/// Drops every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send(&self, _text: &str) -> NotifyResult<()> {
        Ok(())
    }

    fn channel(&self) -> &'static str {
        "none"
    }
}

/// Telegram when credentials are configured, otherwise a no-op channel.
pub fn from_config(telegram: Option<&TelegramConfig>) -> Box<dyn Notifier> {
    match telegram.map(TelegramNotifier::new) {
        Some(Ok(notifier)) => Box::new(notifier),
        Some(Err(e)) => {
            warn!(error = %e, "telegram notifier unavailable, notifications disabled");
            Box::new(NoopNotifier)
        }
        None => Box::new(NoopNotifier),
    }
}

/// Send `text`, swallowing any failure.
pub async fn deliver(notifier: &dyn Notifier, text: &str) {
    match notifier.send(text).await {
        Ok(()) => debug!(channel = notifier.channel(), "notification delivered"),
        Err(e) => debug!(channel = notifier.channel(), error = %e, "notification failed"),
    }
}
