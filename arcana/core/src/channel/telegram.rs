//! Telegram Channel Implementation
//!
//! [`NotifyChannel`] backed by the Telegram Bot API.
//!
//! # Telegram API
//!
//! The bot uses a handful of methods:
//! - `sendMessage` / `editMessageText` / `deleteMessage` - card frames
//! - `sendChatAction` - presence pings
//! - `sendPhoto` - share renders (multipart upload)
//! - `getUpdates` / `answerCallbackQuery` - long polling (binary only)
//!
//! Frames are sent with `parse_mode=HTML`; callers fence monospace art
//! with [`crate::channel::fence`] before it reaches this layer.
//!
//! Telegram reports "this edit changes nothing" and "already deleted" as
//! plain-text descriptions on an `ok=false` response; those are mapped to
//! the typed [`ChannelError::NotModified`] / [`ChannelError::MessageGone`]
//! variants the engine dispatches on.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::traits::{
    ChannelError, ChatId, Keyboard, MessageHandle, MessageId, NotifyChannel, PresenceKind,
};

/// Telegram Bot API channel.
#[derive(Clone)]
pub struct TelegramChannel {
    /// Method URL prefix including the bot token.
    base_url: String,
    /// HTTP client.
    http_client: reqwest::Client,
}

/// Envelope every Bot API response arrives in.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// The slice of a Telegram message the engine cares about.
#[derive(Debug, Deserialize)]
struct ApiMessage {
    message_id: i64,
    chat: ApiChat,
}

#[derive(Debug, Deserialize)]
struct ApiChat {
    id: i64,
}

/// One long-poll update.
#[derive(Clone, Debug, Deserialize)]
pub struct Update {
    /// Monotonic update id; the next poll offsets past it.
    pub update_id: i64,
    /// An incoming message, when present.
    #[serde(default)]
    pub message: Option<IncomingMessage>,
    /// An inline button press, when present.
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

/// An incoming chat message.
#[derive(Clone, Debug, Deserialize)]
pub struct IncomingMessage {
    /// Chat it arrived in.
    pub chat: IncomingChat,
    /// Sender, absent for channel posts.
    #[serde(default)]
    pub from: Option<IncomingUser>,
    /// Text content, absent for media messages.
    #[serde(default)]
    pub text: Option<String>,
}

/// Chat header of an incoming message.
#[derive(Clone, Debug, Deserialize)]
pub struct IncomingChat {
    /// Chat id.
    pub id: i64,
}

/// Sender of an incoming message or callback.
#[derive(Clone, Debug, Deserialize)]
pub struct IncomingUser {
    /// User id.
    pub id: i64,
}

/// An inline keyboard button press.
#[derive(Clone, Debug, Deserialize)]
pub struct CallbackQuery {
    /// Id to acknowledge via `answer_callback`.
    pub id: String,
    /// The user who pressed the button.
    pub from: IncomingUser,
    /// The message the keyboard was attached to.
    #[serde(default)]
    pub message: Option<IncomingMessage>,
    /// The button's action payload.
    #[serde(default)]
    pub data: Option<String>,
}

impl TelegramChannel {
    /// Create a channel for the given bot token.
    #[must_use]
    pub fn new(token: &str) -> Self {
        Self {
            base_url: format!("https://api.telegram.org/bot{token}"),
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(90))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }

    fn keyboard_json(keyboard: Option<&Keyboard>) -> serde_json::Value {
        match keyboard {
            None => serde_json::Value::Null,
            Some(kb) => json!({
                "inline_keyboard": kb
                    .rows
                    .iter()
                    .map(|row| {
                        row.iter()
                            .map(|b| json!({ "text": b.label, "callback_data": b.action }))
                            .collect::<Vec<_>>()
                    })
                    .collect::<Vec<_>>(),
            }),
        }
    }

    fn classify(description: String) -> ChannelError {
        let lower = description.to_lowercase();
        if lower.contains("message is not modified") {
            ChannelError::NotModified
        } else if lower.contains("message to delete not found")
            || lower.contains("message to edit not found")
        {
            ChannelError::MessageGone
        } else {
            ChannelError::Api(description)
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<T, ChannelError> {
        let response = self
            .http_client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;

        let parsed: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;

        if !parsed.ok {
            return Err(Self::classify(
                parsed
                    .description
                    .unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        parsed
            .result
            .ok_or_else(|| ChannelError::Api("ok response without result".to_string()))
    }

    /// Fetch pending updates, long-polling up to `timeout_secs`.
    ///
    /// Pass the last seen `update_id + 1` as `offset` to acknowledge
    /// consumed updates.
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, ChannelError> {
        self.call(
            "getUpdates",
            &json!({ "offset": offset, "timeout": timeout_secs }),
        )
        .await
    }

    /// Acknowledge an inline button press with a short toast.
    pub async fn answer_callback(&self, callback_id: &str, text: &str) -> Result<(), ChannelError> {
        let _: bool = self
            .call(
                "answerCallbackQuery",
                &json!({ "callback_query_id": callback_id, "text": text }),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl NotifyChannel for TelegramChannel {
    async fn create_message(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageHandle, ChannelError> {
        let mut body = json!({
            "chat_id": chat.0,
            "text": text,
            "parse_mode": "HTML",
        });
        let markup = Self::keyboard_json(keyboard);
        if !markup.is_null() {
            body["reply_markup"] = markup;
        }
        let message: ApiMessage = self.call("sendMessage", &body).await?;
        Ok(MessageHandle {
            chat: ChatId(message.chat.id),
            message: MessageId(message.message_id),
        })
    }

    async fn edit_message(
        &self,
        handle: MessageHandle,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), ChannelError> {
        let mut body = json!({
            "chat_id": handle.chat.0,
            "message_id": handle.message.0,
            "text": text,
            "parse_mode": "HTML",
        });
        let markup = Self::keyboard_json(keyboard);
        if !markup.is_null() {
            body["reply_markup"] = markup;
        }
        // editMessageText returns the edited Message (or `true` for inline
        // messages); the engine only needs success.
        let _: serde_json::Value = self.call("editMessageText", &body).await?;
        Ok(())
    }

    async fn delete_message(&self, handle: MessageHandle) -> Result<(), ChannelError> {
        let _: bool = self
            .call(
                "deleteMessage",
                &json!({ "chat_id": handle.chat.0, "message_id": handle.message.0 }),
            )
            .await?;
        Ok(())
    }

    async fn presence_ping(&self, chat: ChatId, kind: PresenceKind) -> Result<(), ChannelError> {
        let _: bool = self
            .call(
                "sendChatAction",
                &json!({ "chat_id": chat.0, "action": kind.as_str() }),
            )
            .await?;
        Ok(())
    }

    async fn send_photo(
        &self,
        chat: ChatId,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<MessageHandle, ChannelError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ChannelError::Transport(format!("read {}: {e}", path.display())))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "card.png".to_string());

        let mut form = reqwest::multipart::Form::new()
            .text("chat_id", chat.0.to_string())
            .part(
                "photo",
                reqwest::multipart::Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str("image/png")
                    .map_err(|e| ChannelError::Transport(e.to_string()))?,
            );
        if let Some(caption) = caption {
            form = form.text("caption", caption.to_string());
        }

        let response = self
            .http_client
            .post(self.method_url("sendPhoto"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;

        let parsed: ApiResponse<ApiMessage> = response
            .json()
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;

        if !parsed.ok {
            return Err(Self::classify(
                parsed
                    .description
                    .unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        let message = parsed
            .result
            .ok_or_else(|| ChannelError::Api("ok response without result".to_string()))?;
        Ok(MessageHandle {
            chat: ChatId(message.chat.id),
            message: MessageId(message.message_id),
        })
    }
}
