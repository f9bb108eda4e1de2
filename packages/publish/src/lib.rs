#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Alert delivery to the destination chat channel.
//!
//! The monitor only knows the narrow [`Notifier`] seam: summary text plus an
//! optional map image. The shipped backend is Telegram — a photo with the
//! summary as its caption when a map was rendered, a plain message otherwise.

use async_trait::async_trait;
use teloxide::{
    Bot,
    payloads::SendPhotoSetters,
    requests::{Request, Requester},
    types::{ChatId, InputFile},
};
use thiserror::Error;

/// Errors that can occur while publishing an alert.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The Telegram API rejected the request or was unreachable.
    #[error("telegram request failed: {0}")]
    Telegram(#[from] teloxide::RequestError),
}

/// Trait for publishing one alert to the destination channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends the alert text, attaching the map image when present.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] if delivery fails.
    async fn publish(&self, text: &str, image: Option<Vec<u8>>) -> Result<(), PublishError>;
}

/// Telegram-backed [`Notifier`].
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramNotifier {
    /// Creates a notifier posting to the given chat.
    #[must_use]
    pub fn new(bot_token: String, chat_id: i64) -> Self {
        Self {
            bot: Bot::new(bot_token),
            chat_id: ChatId(chat_id),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn publish(&self, text: &str, image: Option<Vec<u8>>) -> Result<(), PublishError> {
        match image {
            Some(bytes) => {
                self.bot
                    .send_photo(self.chat_id, InputFile::memory(bytes))
                    .caption(text.to_owned())
                    .send()
                    .await?;
            }
            None => {
                self.bot.send_message(self.chat_id, text).send().await?;
            }
        }
        log::debug!("Published alert to chat {}", self.chat_id);
        Ok(())
    }
}
