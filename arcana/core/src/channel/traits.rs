//! Notification Channel Trait
//!
//! The abstraction between the engine and whatever chat service displays
//! the cards. The animator and orchestrator only ever talk to
//! [`NotifyChannel`]; implementations handle service-specific details
//! (API formats, auth, escaping).
//!
//! The "content unchanged" condition is part of the contract: an edit
//! that would not change the message MUST surface as
//! [`ChannelError::NotModified`] so the render sink can treat it as an
//! idempotent no-op. Every other failure is fatal to the reveal that
//! issued it.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A chat (conversation) identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message identifier, unique within its chat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub i64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to one message: the key a reveal session edits under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageHandle {
    /// The chat the message lives in.
    pub chat: ChatId,
    /// The message within that chat.
    pub message: MessageId,
}

impl fmt::Display for MessageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.chat, self.message)
    }
}

/// Lightweight presence signals sent before slow operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PresenceKind {
    /// "typing..." - shown while a reveal is pacing itself.
    Typing,
    /// "uploading photo..." - shown while a share render is in flight.
    UploadingPhoto,
}

impl PresenceKind {
    /// Wire name of the presence action.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Typing => "typing",
            Self::UploadingPhoto => "upload_photo",
        }
    }
}

/// One inline button.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Button {
    /// Visible label.
    pub label: String,
    /// Opaque action payload delivered back when pressed.
    pub action: String,
}

/// An inline keyboard attached below a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Keyboard {
    /// Button rows, outer vec top to bottom.
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    /// A keyboard with a single button.
    #[must_use]
    pub fn single(label: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            rows: vec![vec![Button {
                label: label.into(),
                action: action.into(),
            }]],
        }
    }
}

/// Errors surfaced by a notification channel.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The edit would not change the message. Swallowed by the render
    /// sink; never fatal.
    #[error("message content unchanged")]
    NotModified,

    /// The message no longer exists (already deleted). Tolerated by
    /// banish; fatal anywhere else.
    #[error("message no longer exists")]
    MessageGone,

    /// The chat service rejected the request.
    #[error("chat service rejected request: {0}")]
    Api(String),

    /// The request never reached the chat service.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Async interface to the chat service displaying cards.
///
/// Implementations: [`TelegramChannel`](crate::channel::TelegramChannel)
/// for the real service, [`InMemoryChannel`](crate::channel::InMemoryChannel)
/// for tests.
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    /// Post a new message, returning its handle.
    async fn create_message(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageHandle, ChannelError>;

    /// Replace the text (and keyboard) of an existing message.
    ///
    /// # Errors
    ///
    /// [`ChannelError::NotModified`] when the new content equals the
    /// current content; any other variant for real failures.
    async fn edit_message(
        &self,
        handle: MessageHandle,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), ChannelError>;

    /// Delete a message.
    ///
    /// # Errors
    ///
    /// [`ChannelError::MessageGone`] when it was already deleted.
    async fn delete_message(&self, handle: MessageHandle) -> Result<(), ChannelError>;

    /// Send a presence signal. Best-effort; callers log and continue on
    /// failure.
    async fn presence_ping(&self, chat: ChatId, kind: PresenceKind) -> Result<(), ChannelError>;

    /// Upload a photo from disk, returning the handle of the new message.
    async fn send_photo(
        &self,
        chat: ChatId,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<MessageHandle, ChannelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_kind_wire_names() {
        assert_eq!(PresenceKind::Typing.as_str(), "typing");
        assert_eq!(PresenceKind::UploadingPhoto.as_str(), "upload_photo");
    }

    #[test]
    fn handle_display() {
        let handle = MessageHandle {
            chat: ChatId(-100),
            message: MessageId(42),
        };
        assert_eq!(handle.to_string(), "-100/42");
    }

    #[test]
    fn keyboard_single() {
        let kb = Keyboard::single("again", "draw_again");
        assert_eq!(kb.rows.len(), 1);
        assert_eq!(kb.rows[0][0].action, "draw_again");
    }
}
