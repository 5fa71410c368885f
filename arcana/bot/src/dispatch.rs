//! Update Dispatch
//!
//! Routes long-poll updates to the Oracle's operations and drives the
//! onboarding conversation. Each update is handled in its own task so a
//! multi-second reveal never blocks the poll loop; failures stop at the
//! per-update error handler and never take the process down.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Datelike;
use parking_lot::Mutex;
use tracing::{error, info, warn};

use arcana_core::channel::telegram::Update;
use arcana_core::channel::{ChatId, NotifyChannel, TelegramChannel};
use arcana_core::onboarding::{Onboarding, OnboardingOutcome};
use arcana_core::oracle::{Oracle, DRAW_AGAIN_ACTION};
use arcana_core::profile::ProfileStore;

/// Routes updates to the Oracle and the onboarding form.
pub struct Dispatcher {
    channel: Arc<TelegramChannel>,
    oracle: Arc<Oracle<TelegramChannel>>,
    profiles: Arc<ProfileStore>,
    onboarding: Mutex<HashMap<i64, Onboarding>>,
    deck_path: PathBuf,
}

impl Dispatcher {
    /// Create a dispatcher over the shared bot state.
    pub fn new(
        channel: Arc<TelegramChannel>,
        oracle: Arc<Oracle<TelegramChannel>>,
        profiles: Arc<ProfileStore>,
        deck_path: PathBuf,
    ) -> Arc<Self> {
        Arc::new(Self {
            channel,
            oracle,
            profiles,
            onboarding: Mutex::new(HashMap::new()),
            deck_path,
        })
    }

    /// Handle one update in its own task. The task owns the error
    /// boundary: everything is logged, nothing propagates.
    pub fn dispatch(self: &Arc<Self>, update: Update) {
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = dispatcher.handle_update(update).await {
                error!(error = %e, "update handler failed");
            }
        });
    }

    async fn handle_update(&self, update: Update) -> anyhow::Result<()> {
        if let Some(callback) = update.callback_query {
            if let Err(e) = self
                .channel
                .answer_callback(&callback.id, "shuffling \u{2726}")
                .await
            {
                warn!(error = %e, "failed to answer callback");
            }
            if callback.data.as_deref() == Some(DRAW_AGAIN_ACTION) {
                if let Some(message) = callback.message {
                    self.oracle.draw_again(ChatId(message.chat.id)).await?;
                }
            }
            return Ok(());
        }

        let Some(message) = update.message else {
            return Ok(());
        };
        let Some(text) = message.text else {
            return Ok(());
        };
        let chat = ChatId(message.chat.id);
        let user = message.from.map_or(message.chat.id, |u| u.id);

        match text.trim() {
            "/start" => self.handle_start(chat, user).await,
            "/cancel" => self.handle_cancel(chat, user).await,
            "/draw" => Ok(self.oracle.draw(chat).await?),
            "/share" => Ok(self.oracle.share(chat).await?),
            "/banish" => Ok(self.oracle.banish(chat).await?),
            other if !other.starts_with('/') => self.handle_text(chat, user, other).await,
            _ => Ok(()),
        }
    }

    async fn handle_start(&self, chat: ChatId, user: i64) -> anyhow::Result<()> {
        if self.oracle.deck().is_empty() {
            let text = format!(
                "Add your deck to {} (one card per line), then /draw.",
                self.deck_path.display()
            );
            self.channel.create_message(chat, &text, None).await?;
            return Ok(());
        }

        if self.profiles.is_complete(user) {
            self.channel.create_message(chat, "Type /draw", None).await?;
            return Ok(());
        }

        self.onboarding
            .lock()
            .insert(user, Onboarding::new(chrono::Utc::now().year()));
        self.channel
            .create_message(chat, Onboarding::opening_prompt(), None)
            .await?;
        Ok(())
    }

    async fn handle_cancel(&self, chat: ChatId, user: i64) -> anyhow::Result<()> {
        if self.onboarding.lock().remove(&user).is_some() {
            self.channel
                .create_message(chat, Onboarding::dismissal(), None)
                .await?;
        }
        Ok(())
    }

    async fn handle_text(&self, chat: ChatId, user: i64, text: &str) -> anyhow::Result<()> {
        let outcome = {
            let mut forms = self.onboarding.lock();
            let Some(form) = forms.get_mut(&user) else {
                return Ok(());
            };
            let outcome = form.advance(text);
            if matches!(outcome, OnboardingOutcome::Complete { .. }) {
                forms.remove(&user);
            }
            outcome
        };

        match outcome {
            OnboardingOutcome::Continue(reply) => {
                self.channel.create_message(chat, &reply, None).await?;
            }
            OnboardingOutcome::Complete { profile, farewell } => {
                info!(user = user, "attunement complete");
                self.profiles.set(user, profile);
                self.channel
                    .create_message(chat, "Absorbing\u{2026} adjusting.", None)
                    .await?;
                tokio::time::sleep(Duration::from_millis(600)).await;
                self.channel.create_message(chat, &farewell, None).await?;
            }
        }
        Ok(())
    }
}
