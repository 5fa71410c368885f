//! The Oracle - Orchestration Core
//!
//! The Oracle owns the deck, the render sink, the per-chat state and the
//! share renderer, and exposes the four operations the command surface
//! dispatches to:
//!
//! - `draw` / `draw_again`: run one full reveal session on a fresh message
//! - `share`: render the chat's most recent card to a PNG and upload it
//! - `banish`: delete the chat's card message, tolerating "already gone"
//!
//! The Oracle is channel-agnostic: it drives any [`NotifyChannel`], so
//! the same orchestration runs against Telegram in production and the
//! in-memory channel under test.
//!
//! Each reveal session gets its own RNG seeded from the Oracle's root
//! generator; seeding the root (via [`OracleConfig::seed`]) makes entire
//! animation runs reproducible.
//!
//! Failures follow the one-handler-per-request policy: operations return
//! a single [`OracleError`] for the dispatch layer to log; nothing here
//! crosses between chats.

use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::cache::BoundedCache;
use crate::channel::{
    fence, ChannelError, ChatId, Keyboard, MessageHandle, NotifyChannel, PresenceKind,
};
use crate::config::OracleConfig;
use crate::deck::Deck;
use crate::layout::{build_frame, FrameStyle, Layout};
use crate::reveal::{
    CancelToken, PacingConfig, RevealAlgorithm, RevealError, RevealSession,
};
use crate::share::{ShareError, ShareRenderer};
use crate::sink::RenderSink;

/// Callback action payload of the draw-again button.
pub const DRAW_AGAIN_ACTION: &str = "draw_again";
/// Label of the draw-again button.
const DRAW_AGAIN_LABEL: &str = "\u{2726}  d r a w   a g a i n  \u{2726}";

/// Instructional text surfaced when the deck is empty. No frame is
/// constructed and no animation runs.
pub const EMPTY_DECK_TEXT: &str = "Deck is empty. Add lines to the deck file, then /draw.";
/// Instructional text when a chat shares before drawing.
const NOTHING_TO_SHARE_TEXT: &str = "Nothing to share yet. /draw a card first.";
/// Instructional text when a chat banishes without a card message.
const NOTHING_TO_BANISH_TEXT: &str = "No card here to banish.";

/// Errors surfaced by Oracle operations.
#[derive(Debug, Error)]
pub enum OracleError {
    /// A channel call outside a reveal failed.
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// A reveal session aborted.
    #[error(transparent)]
    Reveal(#[from] RevealError),

    /// A share render failed.
    #[error(transparent)]
    Share(#[from] ShareError),

    /// The blocking render task was torn down.
    #[error("share render task failed: {0}")]
    RenderTask(String),
}

/// Per-chat memory: the text and message of the most recent card.
#[derive(Clone, Debug, Default)]
struct ChatState {
    last_card: Option<String>,
    last_message: Option<MessageHandle>,
}

/// The orchestration core, generic over the notification channel.
pub struct Oracle<C: NotifyChannel> {
    channel: Arc<C>,
    deck: Deck,
    sink: RenderSink,
    chats: Mutex<BoundedCache<ChatId, ChatState>>,
    renderer: Arc<ShareRenderer>,
    pacing: PacingConfig,
    keyboard: Keyboard,
    seeder: Mutex<StdRng>,
}

impl<C: NotifyChannel + 'static> Oracle<C> {
    /// Create an Oracle over a channel and a loaded deck.
    #[must_use]
    pub fn new(channel: Arc<C>, deck: Deck, config: OracleConfig) -> Self {
        let seeder = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            channel,
            deck,
            sink: RenderSink::new(config.sink_capacity),
            chats: Mutex::new(BoundedCache::new(config.chat_capacity)),
            renderer: Arc::new(ShareRenderer::new(config.share)),
            pacing: config.pacing,
            keyboard: Keyboard::single(DRAW_AGAIN_LABEL, DRAW_AGAIN_ACTION),
            seeder: Mutex::new(seeder),
        }
    }

    /// The loaded deck.
    #[must_use]
    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    /// The most recent card text drawn in `chat`, if any.
    #[must_use]
    pub fn last_card(&self, chat: ChatId) -> Option<String> {
        self.chats
            .lock()
            .peek(&chat)
            .and_then(|state| state.last_card.clone())
    }

    fn session_rng(&self) -> StdRng {
        StdRng::seed_from_u64(self.seeder.lock().gen())
    }

    /// Draw a card and run one full reveal in `chat`.
    ///
    /// An empty deck surfaces [`EMPTY_DECK_TEXT`] and runs nothing.
    ///
    /// # Errors
    ///
    /// Propagates the first fatal channel failure of the reveal.
    pub async fn draw(&self, chat: ChatId) -> Result<(), OracleError> {
        let card = if self.deck.is_empty() {
            None
        } else {
            let mut seeder = self.seeder.lock();
            Some(self.deck.draw(&mut *seeder).to_string())
        };
        let Some(card) = card else {
            tracing::info!(chat = %chat, "draw on empty deck");
            self.channel
                .create_message(chat, EMPTY_DECK_TEXT, None)
                .await?;
            return Ok(());
        };
        self.reveal(chat, card).await
    }

    /// Run another independent reveal in `chat` (the draw-again button).
    ///
    /// # Errors
    ///
    /// Same as [`Oracle::draw`].
    pub async fn draw_again(&self, chat: ChatId) -> Result<(), OracleError> {
        self.draw(chat).await
    }

    async fn reveal(&self, chat: ChatId, card: String) -> Result<(), OracleError> {
        let mut rng = self.session_rng();
        self.ping(chat, PresenceKind::Typing).await;

        let glyphs = FrameStyle::pick(&mut rng).glyphs();
        let layout = Layout::for_text(&card);
        let blank_rows =
            vec![String::new(); layout.pad_top + layout.lines.len() + layout.pad_bottom];
        let blank = fence(&build_frame(&blank_rows, &glyphs, layout.inner_width, 0, 0));

        let handle = self
            .channel
            .create_message(chat, &blank, Some(&self.keyboard))
            .await?;
        self.sink.seed(handle, &blank);
        self.chats.lock().insert(
            chat,
            ChatState {
                last_card: Some(card.clone()),
                last_message: Some(handle),
            },
        );

        let algorithm = RevealAlgorithm::select(&mut rng);
        tracing::info!(chat = %chat, handle = %handle, algorithm = ?algorithm, "drawing card");
        let session = RevealSession::new(
            self.channel.as_ref(),
            &self.sink,
            handle,
            Some(&self.keyboard),
            glyphs,
            &layout,
            &self.pacing,
            CancelToken::disabled(),
            rng,
        );
        session.run(algorithm).await?;
        Ok(())
    }

    /// Render and deliver the chat's most recent card as a photo.
    ///
    /// # Errors
    ///
    /// Render failures and upload failures propagate; a chat with no
    /// drawn card gets instructional text instead.
    pub async fn share(&self, chat: ChatId) -> Result<(), OracleError> {
        let Some(card) = self.last_card(chat) else {
            self.channel
                .create_message(chat, NOTHING_TO_SHARE_TEXT, None)
                .await?;
            return Ok(());
        };

        self.ping(chat, PresenceKind::UploadingPhoto).await;

        let suffix: u32 = self.seeder.lock().gen();
        let file_name = format!("card-{}-{suffix:08x}.png", chat.0);
        let renderer = Arc::clone(&self.renderer);
        let render_card = card.clone();
        let path = tokio::task::spawn_blocking(move || renderer.render(&render_card, &file_name))
            .await
            .map_err(|e| OracleError::RenderTask(e.to_string()))??;

        self.channel.send_photo(chat, &path, Some(&card)).await?;
        Ok(())
    }

    /// Delete the chat's card message. A message that is already gone is
    /// treated as success.
    ///
    /// # Errors
    ///
    /// Any other delete failure propagates.
    pub async fn banish(&self, chat: ChatId) -> Result<(), OracleError> {
        let handle = {
            let mut chats = self.chats.lock();
            chats.get_mut(&chat).and_then(|state| state.last_message.take())
        };
        let Some(handle) = handle else {
            self.channel
                .create_message(chat, NOTHING_TO_BANISH_TEXT, None)
                .await?;
            return Ok(());
        };

        match self.channel.delete_message(handle).await {
            Ok(()) => {}
            Err(ChannelError::MessageGone) => {
                tracing::debug!(handle = %handle, "card message already gone");
            }
            Err(e) => return Err(e.into()),
        }
        self.sink.forget(handle);
        Ok(())
    }

    async fn ping(&self, chat: ChatId, kind: PresenceKind) {
        if let Err(e) = self.channel.presence_ping(chat, kind).await {
            tracing::debug!(chat = %chat, error = %e, "presence ping failed");
        }
    }
}
