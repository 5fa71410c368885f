//! In-Memory Channel
//!
//! A recording [`NotifyChannel`] for tests and headless runs. Every call
//! is appended to a log the test can inspect; edit failures can be
//! scripted to exercise the sink's unchanged/fatal paths.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::traits::{
    ChannelError, ChatId, Keyboard, MessageHandle, MessageId, NotifyChannel, PresenceKind,
};

/// One recorded channel interaction.
#[derive(Clone, Debug, PartialEq)]
pub enum ChannelCall {
    /// `create_message` was invoked.
    Create {
        /// Target chat.
        chat: ChatId,
        /// Message text as delivered.
        text: String,
        /// Whether a keyboard was attached.
        with_keyboard: bool,
    },
    /// `edit_message` was invoked (and did not fail).
    Edit {
        /// Edited message.
        handle: MessageHandle,
        /// New text as delivered.
        text: String,
    },
    /// `delete_message` was invoked.
    Delete {
        /// Deleted message.
        handle: MessageHandle,
    },
    /// `presence_ping` was invoked.
    Ping {
        /// Target chat.
        chat: ChatId,
        /// Presence kind.
        kind: PresenceKind,
    },
    /// `send_photo` was invoked.
    Photo {
        /// Target chat.
        chat: ChatId,
        /// Uploaded file path.
        path: PathBuf,
    },
}

/// Recording channel double.
///
/// Message ids are assigned from an atomic counter. Scripted errors are
/// consumed front-to-back by successive `edit_message` calls.
#[derive(Default)]
pub struct InMemoryChannel {
    calls: Mutex<Vec<ChannelCall>>,
    next_message_id: AtomicI64,
    scripted_edit_errors: Mutex<Vec<ChannelError>>,
    gone_handles: Mutex<Vec<MessageHandle>>,
}

impl InMemoryChannel {
    /// Create an empty channel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every recorded call, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ChannelCall> {
        self.calls.lock().clone()
    }

    /// Every edit text delivered for `handle`, in order.
    #[must_use]
    pub fn edits_for(&self, handle: MessageHandle) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                ChannelCall::Edit { handle: h, text } if *h == handle => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Total successful edit calls across all messages.
    #[must_use]
    pub fn edit_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, ChannelCall::Edit { .. }))
            .count()
    }

    /// Queue an error for a future `edit_message` call.
    pub fn script_edit_error(&self, error: ChannelError) {
        self.scripted_edit_errors.lock().push(error);
    }

    /// Mark a handle as already deleted; `delete_message` on it returns
    /// [`ChannelError::MessageGone`].
    pub fn mark_gone(&self, handle: MessageHandle) {
        self.gone_handles.lock().push(handle);
    }
}

#[async_trait]
impl NotifyChannel for InMemoryChannel {
    async fn create_message(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageHandle, ChannelError> {
        let id = self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.calls.lock().push(ChannelCall::Create {
            chat,
            text: text.to_string(),
            with_keyboard: keyboard.is_some(),
        });
        Ok(MessageHandle {
            chat,
            message: MessageId(id),
        })
    }

    async fn edit_message(
        &self,
        handle: MessageHandle,
        text: &str,
        _keyboard: Option<&Keyboard>,
    ) -> Result<(), ChannelError> {
        let scripted = {
            let mut errors = self.scripted_edit_errors.lock();
            if errors.is_empty() {
                None
            } else {
                Some(errors.remove(0))
            }
        };
        if let Some(error) = scripted {
            return Err(error);
        }
        self.calls.lock().push(ChannelCall::Edit {
            handle,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn delete_message(&self, handle: MessageHandle) -> Result<(), ChannelError> {
        if self.gone_handles.lock().contains(&handle) {
            return Err(ChannelError::MessageGone);
        }
        self.calls.lock().push(ChannelCall::Delete { handle });
        Ok(())
    }

    async fn presence_ping(&self, chat: ChatId, kind: PresenceKind) -> Result<(), ChannelError> {
        self.calls.lock().push(ChannelCall::Ping { chat, kind });
        Ok(())
    }

    async fn send_photo(
        &self,
        chat: ChatId,
        path: &Path,
        _caption: Option<&str>,
    ) -> Result<MessageHandle, ChannelError> {
        let id = self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.calls.lock().push(ChannelCall::Photo {
            chat,
            path: path.to_path_buf(),
        });
        Ok(MessageHandle {
            chat,
            message: MessageId(id),
        })
    }
}
