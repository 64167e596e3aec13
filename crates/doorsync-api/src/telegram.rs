// Telegram Bot API notifier.
//
// Optional: `TelegramClient::new` returns `None` when no token or chat ids
// are configured, and `send` swallows delivery failures. A broken notifier
// must never break a sync cycle.

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::transport::TransportConfig;

pub struct TelegramClient {
    http: reqwest::Client,
    token: SecretString,
    chat_ids: Vec<String>,
}

impl TelegramClient {
    /// Build a notifier from a bot token and a comma-separated chat-id
    /// list. `None` when either is empty.
    pub fn new(token: &str, chat_ids: &str, transport: &TransportConfig) -> Option<Self> {
        let token = token.trim();
        let chat_ids: Vec<String> = chat_ids
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_owned)
            .collect();

        if token.is_empty() || chat_ids.is_empty() {
            return None;
        }

        Some(Self {
            http: transport.build_client().ok()?,
            token: SecretString::from(token.to_owned()),
            chat_ids,
        })
    }

    /// Send a plain-text message to every configured chat. Best-effort.
    pub async fn send(&self, text: &str) {
        let url = format!(
            "https://api.telegram.org/bot{}/sendMessage",
            self.token.expose_secret()
        );

        for chat_id in &self.chat_ids {
            let result = self
                .http
                .post(&url)
                .json(&serde_json::json!({ "chat_id": chat_id, "text": text }))
                .send()
                .await;
            if let Err(err) = result {
                debug!(chat_id, error = %err, "telegram notification failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_notifier_is_none() {
        let transport = TransportConfig::default();
        assert!(TelegramClient::new("", "123", &transport).is_none());
        assert!(TelegramClient::new("tok", "", &transport).is_none());
        assert!(TelegramClient::new("tok", " , ", &transport).is_none());
        assert!(TelegramClient::new("tok", "123, 456", &transport).is_some());
    }
}
