//! Render Sink
//!
//! The write-suppression layer between the reveal animator and the
//! notification channel. Animations re-emit frames freely; the sink makes
//! sure only real changes reach the wire:
//!
//! - A frame identical to the last one written for its message is dropped
//!   locally, without any channel call.
//! - A channel-side [`ChannelError::NotModified`] is swallowed as an
//!   idempotent no-op (the remote already shows this content).
//! - Any other channel error propagates and aborts the enclosing reveal.
//!
//! The last-written cache is a bounded LRU store so long-lived processes
//! do not accumulate an entry per message ever animated.

use parking_lot::Mutex;

use crate::cache::{BoundedCache, DEFAULT_SINK_CAPACITY};
use crate::channel::{ChannelError, Keyboard, MessageHandle, NotifyChannel};

/// Deduplicating frame writer keyed by message handle.
pub struct RenderSink {
    last_text: Mutex<BoundedCache<MessageHandle, String>>,
}

impl RenderSink {
    /// Create a sink remembering at most `capacity` messages.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            last_text: Mutex::new(BoundedCache::new(capacity)),
        }
    }

    /// Record the text a freshly created message was posted with, so the
    /// first animation frame can be suppressed when identical.
    pub fn seed(&self, handle: MessageHandle, text: &str) {
        self.last_text.lock().insert(handle, text.to_string());
    }

    /// Forget a message (e.g. after banishing it).
    pub fn forget(&self, handle: MessageHandle) {
        self.last_text.lock().remove(&handle);
    }

    /// Write `text` to `handle` unless it is already displayed.
    ///
    /// # Errors
    ///
    /// Propagates every channel error except
    /// [`ChannelError::NotModified`], which is treated as success without
    /// recording.
    pub async fn write<C: NotifyChannel + ?Sized>(
        &self,
        channel: &C,
        handle: MessageHandle,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), ChannelError> {
        {
            let mut cache = self.last_text.lock();
            if cache.get(&handle).map(String::as_str) == Some(text) {
                return Ok(());
            }
        }

        match channel.edit_message(handle, text, keyboard).await {
            Ok(()) => {
                self.last_text.lock().insert(handle, text.to_string());
                Ok(())
            }
            Err(ChannelError::NotModified) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl Default for RenderSink {
    fn default() -> Self {
        Self::new(DEFAULT_SINK_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChatId, InMemoryChannel, MessageId};

    fn handle(n: i64) -> MessageHandle {
        MessageHandle {
            chat: ChatId(1),
            message: MessageId(n),
        }
    }

    #[tokio::test]
    async fn identical_consecutive_writes_hit_the_wire_once() {
        let channel = InMemoryChannel::new();
        let sink = RenderSink::default();
        let h = handle(1);

        sink.write(&channel, h, "frame", None).await.unwrap();
        sink.write(&channel, h, "frame", None).await.unwrap();
        assert_eq!(channel.edit_count(), 1);

        sink.write(&channel, h, "frame two", None).await.unwrap();
        assert_eq!(channel.edit_count(), 2);
    }

    #[tokio::test]
    async fn seeded_text_suppresses_the_first_write() {
        let channel = InMemoryChannel::new();
        let sink = RenderSink::default();
        let h = handle(1);

        sink.seed(h, "initial");
        sink.write(&channel, h, "initial", None).await.unwrap();
        assert_eq!(channel.edit_count(), 0);
    }

    #[tokio::test]
    async fn not_modified_is_swallowed_without_recording() {
        let channel = InMemoryChannel::new();
        let sink = RenderSink::default();
        let h = handle(1);

        channel.script_edit_error(ChannelError::NotModified);
        sink.write(&channel, h, "frame", None).await.unwrap();
        assert_eq!(channel.edit_count(), 0);

        // Not recorded, so the same text goes to the wire again.
        sink.write(&channel, h, "frame", None).await.unwrap();
        assert_eq!(channel.edit_count(), 1);
    }

    #[tokio::test]
    async fn other_errors_propagate() {
        let channel = InMemoryChannel::new();
        let sink = RenderSink::default();
        let h = handle(1);

        channel.script_edit_error(ChannelError::Api("boom".to_string()));
        let err = sink.write(&channel, h, "frame", None).await.unwrap_err();
        assert!(matches!(err, ChannelError::Api(_)));
    }

    #[tokio::test]
    async fn sessions_are_independent() {
        let channel = InMemoryChannel::new();
        let sink = RenderSink::default();

        sink.write(&channel, handle(1), "same", None).await.unwrap();
        sink.write(&channel, handle(2), "same", None).await.unwrap();
        assert_eq!(channel.edit_count(), 2);
    }
}
