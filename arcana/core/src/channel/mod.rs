//! Notification Channel Layer
//!
//! This module contains:
//! - The [`NotifyChannel`] trait the engine renders through
//! - [`TelegramChannel`], the Telegram Bot API implementation
//! - [`InMemoryChannel`], a recording test double
//!
//! # Module Structure
//!
//! - [`traits`]: channel trait, ids, keyboard and error types
//! - [`telegram`]: reqwest-backed Telegram Bot API client
//! - [`in_memory`]: in-process channel for tests
//!
//! Frames are monospace art, so the display text for a frame is wrapped
//! in an HTML `<pre>` fence by [`fence`] before it reaches a channel.

pub mod in_memory;
pub mod telegram;
pub mod traits;

pub use in_memory::{ChannelCall, InMemoryChannel};
pub use telegram::TelegramChannel;
pub use traits::{
    Button, ChannelError, ChatId, Keyboard, MessageHandle, MessageId, NotifyChannel, PresenceKind,
};

/// Escape HTML-sensitive characters for channels that parse HTML.
#[must_use]
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Fence a frame in a `<pre>` block so clients keep its alignment.
#[must_use]
pub fn fence(s: &str) -> String {
    format!("<pre>{}</pre>", html_escape(s))
}
