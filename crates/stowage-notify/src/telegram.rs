//! Telegram Bot API channel.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stowage_core::TelegramConfig;

use crate::notifier::{Notifier, NotifyError, NotifyResult};

const API_BASE: &str = "https://api.telegram.org";
const SEND_TIMEOUT: Duration = Duration::from_secs(15);

/// Telegram rejects messages longer than this many characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Sends messages through `sendMessage` with HTML parse mode.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: String,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> NotifyResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent("stowage/0.1")
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::Client(e.to_string()))?;
        Ok(Self {
            client,
            api_base: API_BASE.to_string(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
        })
    }

    /// Point at another Bot API server.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }

    fn payload(&self, text: &str) -> SendMessage<'_> {
        SendMessage {
            chat_id: &self.chat_id,
            text: escape_html(text, MAX_MESSAGE_CHARS),
            parse_mode: "HTML",
            disable_web_page_preview: true,
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> NotifyResult<()> {
        let resp = self
            .client
            .post(self.endpoint())
            .json(&self.payload(text))
            .send()
            .await?;

        let status = resp.status().as_u16();
        let body: ApiResponse = resp.json().await?;
        if body.ok {
            Ok(())
        } else {
            Err(NotifyError::Rejected {
                status,
                description: body.description.unwrap_or_default(),
            })
        }
    }

    fn channel(&self) -> &'static str {
        "telegram"
    }
}

/// Escape `<`, `>` and `&` for HTML parse mode, stopping before the
/// escaped text would exceed `max_chars`.
fn escape_html(text: &str, max_chars: usize) -> String {
    let mut out = String::with_capacity(text.len());
    let mut used = 0;
    for c in text.chars() {
        let piece = match c {
            '<' => "&lt;",
            '>' => "&gt;",
            '&' => "&amp;",
            _ => {
                if used + 1 > max_chars {
                    break;
                }
                out.push(c);
                used += 1;
                continue;
            }
        };
        if used + piece.len() > max_chars {
            break;
        }
        out.push_str(piece);
        used += piece.len();
    }
    out
}
