//! Reveal Animator
//!
//! Runs one of three timed multi-frame algorithms over a card's layout,
//! pushing every intermediate frame through the [`RenderSink`] before the
//! next computation proceeds. Frames are never batched; within one
//! session they are strictly ordered.
//!
//! # Algorithms
//!
//! - **Sequential**: rows revealed top to bottom, one per tick, with an
//!   occasional transient per-row glitch.
//! - **Column drip**: the padded block treated as a grid, revealed column
//!   by column with monotonic accumulation and occasional whole-frame
//!   glitch overlays; the terminal frame is always forced exact.
//! - **Void**: rare path - the frame appears fully corrupted, then heals
//!   over several probabilistic passes before being forced exact.
//!
//! A session ends in the exact target frame (for drip and void by a
//! forced final write) or aborts entirely on the first unrecoverable
//! channel error. There is no retry and no partial rollback.
//!
//! All randomness flows through the session's own [`rand::Rng`]; a seeded
//! generator replays an animation decision-for-decision. Every pacing
//! delay is a cancellation-aware suspension point.

use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tokio::sync::watch;

use crate::channel::{fence, ChannelError, Keyboard, MessageHandle, NotifyChannel, PresenceKind};
use crate::glitch;
use crate::layout::{build_frame, center, Layout, StyleGlyphs};
use crate::sink::RenderSink;

/// Chance that a draw takes the void reveal instead of the common pair.
pub const RARE_EVENT_CHANCE: f64 = 0.012;

/// Of the non-void draws, how often sequential wins over drip.
const SEQUENTIAL_BIAS: f64 = 0.75;
/// Chance a freshly revealed row first flashes corrupted.
const ROW_GLITCH_CHANCE: f64 = 0.3;
/// Chance a drip column shows a whole-frame glitch overlay first.
const DRIP_OVERLAY_CHANCE: f64 = 0.15;
/// Overlay corruption intensity for drip columns.
const DRIP_OVERLAY_INTENSITY: f64 = 0.12;
/// Per-cell reveal chance during a drip column pass.
const DRIP_REVEAL_CHANCE: f64 = 0.88;
/// Per-cell heal chance during a void healing pass.
const HEAL_CHANCE: f64 = 0.35;
/// Chance of the end-of-reveal flicker after a sequential reveal.
const SEQUENTIAL_FLICKER_CHANCE: f64 = 0.4;
/// Chance of the end-of-reveal flicker after a void reveal.
const VOID_FLICKER_CHANCE: f64 = 0.5;

/// Delays between animation ticks.
///
/// Defaults match the tuned values of the original deck bot; override
/// individual fields with the `with_*` setters (tests shrink everything
/// to zero).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PacingConfig {
    /// Minimum delay before a sequential row reveals.
    pub line_reveal_min: Duration,
    /// Maximum delay before a sequential row reveals.
    pub line_reveal_max: Duration,
    /// Minimum hold on a transient glitch frame.
    pub glitch_min: Duration,
    /// Maximum hold on a transient glitch frame.
    pub glitch_max: Duration,
    /// Fixed delay per drip column.
    pub drip_step: Duration,
    /// Pause before the settled frame is re-emitted.
    pub settle_pause: Duration,
    /// Pause on each side of a flicker swap.
    pub flicker_pause: Duration,
    /// Minimum delay between void healing passes.
    pub heal_min: Duration,
    /// Maximum delay between void healing passes.
    pub heal_max: Duration,
    /// Pause before the void reveal forces the exact target.
    pub void_settle: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            line_reveal_min: Duration::from_millis(280),
            line_reveal_max: Duration::from_millis(650),
            glitch_min: Duration::from_millis(80),
            glitch_max: Duration::from_millis(180),
            drip_step: Duration::from_millis(60),
            settle_pause: Duration::from_millis(220),
            flicker_pause: Duration::from_millis(160),
            heal_min: Duration::from_millis(150),
            heal_max: Duration::from_millis(330),
            void_settle: Duration::from_millis(250),
        }
    }
}

impl PacingConfig {
    /// A config with every delay zeroed, for tests.
    #[must_use]
    pub fn instant() -> Self {
        Self {
            line_reveal_min: Duration::ZERO,
            line_reveal_max: Duration::ZERO,
            glitch_min: Duration::ZERO,
            glitch_max: Duration::ZERO,
            drip_step: Duration::ZERO,
            settle_pause: Duration::ZERO,
            flicker_pause: Duration::ZERO,
            heal_min: Duration::ZERO,
            heal_max: Duration::ZERO,
            void_settle: Duration::ZERO,
        }
    }

    /// Scale every delay uniformly (e.g. 0.5 for a twice-as-fast bot).
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        let scale = |d: Duration| d.mul_f64(factor.max(0.0));
        Self {
            line_reveal_min: scale(self.line_reveal_min),
            line_reveal_max: scale(self.line_reveal_max),
            glitch_min: scale(self.glitch_min),
            glitch_max: scale(self.glitch_max),
            drip_step: scale(self.drip_step),
            settle_pause: scale(self.settle_pause),
            flicker_pause: scale(self.flicker_pause),
            heal_min: scale(self.heal_min),
            heal_max: scale(self.heal_max),
            void_settle: scale(self.void_settle),
        }
    }
}

/// The three mutually exclusive reveal algorithms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevealAlgorithm {
    /// Row-by-row top-to-bottom reveal.
    Sequential,
    /// Column-major progressive reveal.
    Drip,
    /// Corruption-then-heal reveal (rare).
    Void,
}

impl RevealAlgorithm {
    /// Select an algorithm with the fixed prior: 1.2 % void override;
    /// of the remainder, sequential three times as likely as drip.
    pub fn select<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.gen_bool(RARE_EVENT_CHANCE) {
            Self::Void
        } else if rng.gen_bool(SEQUENTIAL_BIAS) {
            Self::Sequential
        } else {
            Self::Drip
        }
    }
}

/// Errors aborting a reveal session.
#[derive(Debug, Error)]
pub enum RevealError {
    /// The owning session tore the reveal down mid-animation.
    #[error("reveal cancelled")]
    Cancelled,

    /// The display channel failed fatally.
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Cancels the reveals holding the paired [`CancelToken`].
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Abort every reveal holding the paired token at its next
    /// suspension point.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Cooperative cancellation checked at every suspension point.
#[derive(Clone, Debug)]
pub struct CancelToken {
    rx: Option<watch::Receiver<bool>>,
}

impl CancelToken {
    /// A token that can never fire; reveals run to completion.
    #[must_use]
    pub fn disabled() -> Self {
        Self { rx: None }
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolve once cancellation is requested; pends forever on a
    /// disabled token or after the handle is dropped un-fired.
    pub async fn cancelled(&self) {
        let Some(rx) = &self.rx else {
            return std::future::pending().await;
        };
        let mut rx = rx.clone();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                return std::future::pending().await;
            }
        }
    }
}

/// Create a linked cancel handle/token pair.
#[must_use]
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx: Some(rx) })
}

/// One animation run, bound to one message, from blank to final frame.
pub struct RevealSession<'a, C: NotifyChannel + ?Sized, R: Rng> {
    channel: &'a C,
    sink: &'a RenderSink,
    handle: MessageHandle,
    keyboard: Option<&'a Keyboard>,
    glyphs: StyleGlyphs,
    width: usize,
    /// Body lines with padding rows expanded to empty strings; frames are
    /// built from these with zero extra padding.
    rows: Vec<String>,
    pacing: &'a PacingConfig,
    cancel: CancelToken,
    rng: R,
}

impl<'a, C: NotifyChannel + ?Sized, R: Rng> RevealSession<'a, C, R> {
    /// Bind a session to a message. The message is expected to already
    /// show the blank frame (seeded into the sink by the caller).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        channel: &'a C,
        sink: &'a RenderSink,
        handle: MessageHandle,
        keyboard: Option<&'a Keyboard>,
        glyphs: StyleGlyphs,
        layout: &Layout,
        pacing: &'a PacingConfig,
        cancel: CancelToken,
        rng: R,
    ) -> Self {
        Self {
            channel,
            sink,
            handle,
            keyboard,
            glyphs,
            width: layout.inner_width,
            rows: layout.padded_rows(),
            pacing,
            cancel,
            rng,
        }
    }

    /// Run the given algorithm to completion.
    ///
    /// # Errors
    ///
    /// [`RevealError::Channel`] on the first unrecoverable channel
    /// failure, [`RevealError::Cancelled`] if the token fires.
    pub async fn run(mut self, algorithm: RevealAlgorithm) -> Result<(), RevealError> {
        tracing::debug!(
            handle = %self.handle,
            algorithm = ?algorithm,
            rows = self.rows.len(),
            width = self.width,
            "reveal session starting"
        );
        match algorithm {
            RevealAlgorithm::Sequential => self.sequential().await,
            RevealAlgorithm::Drip => self.drip().await,
            RevealAlgorithm::Void => self.void().await,
        }
    }

    async fn sequential(&mut self) -> Result<(), RevealError> {
        let blank_row = " ".repeat(self.width);
        let mut displayed = vec![blank_row; self.rows.len()];
        self.emit(&displayed).await?;

        for i in 0..self.rows.len() {
            self.ping().await;
            self.pace_between(self.pacing.line_reveal_min, self.pacing.line_reveal_max)
                .await?;

            let row = self.rows[i].clone();
            if !row.is_empty() {
                displayed[i] = row.clone();
                if self.rng.gen_bool(ROW_GLITCH_CHANCE) {
                    let intensity = self.rng.gen_range(0.25..0.55);
                    let glitched = glitch::corrupt_line(&row, intensity, &mut self.rng);
                    let mut transient = displayed.clone();
                    transient[i] = glitched;
                    self.emit(&transient).await?;
                    self.pace_between(self.pacing.glitch_min, self.pacing.glitch_max)
                        .await?;
                }
            }
            self.emit(&displayed).await?;
        }

        self.pace(self.pacing.settle_pause).await?;
        self.emit(&displayed).await?;
        if self.rng.gen_bool(SEQUENTIAL_FLICKER_CHANCE) {
            self.flicker(&displayed).await?;
        }
        Ok(())
    }

    async fn drip(&mut self) -> Result<(), RevealError> {
        let padded: Vec<String> = self.rows.iter().map(|ln| center(ln, self.width)).collect();
        let grid: Vec<Vec<char>> = padded.iter().map(|ln| ln.chars().collect()).collect();
        let mut revealed = vec![vec![false; self.width]; padded.len()];

        for col in 0..self.width {
            self.ping().await;
            self.pace(self.pacing.drip_step).await?;

            drip_tick(&grid, &mut revealed, col, &mut self.rng);
            let shown = glitch::mask(&padded, &revealed);

            if self.rng.gen_bool(DRIP_OVERLAY_CHANCE) {
                // Transient overlay only; the reveal matrix is untouched.
                let overlay = glitch::corrupt(&shown, DRIP_OVERLAY_INTENSITY, &mut self.rng);
                self.emit(&overlay).await?;
                self.pace_between(self.pacing.glitch_min, self.pacing.glitch_max)
                    .await?;
            }
            self.emit(&shown).await?;
        }

        // The probabilistic pass may have skipped cells; the terminal
        // frame bypasses the mask and is always exact.
        self.pace(self.pacing.settle_pause).await?;
        let stripped: Vec<String> = padded.iter().map(|ln| ln.trim().to_string()).collect();
        self.emit(&stripped).await?;
        Ok(())
    }

    async fn void(&mut self) -> Result<(), RevealError> {
        let targets: Vec<String> = self.rows.iter().map(|ln| center(ln, self.width)).collect();
        let mut current = glitch::full_corruption(&targets, &mut self.rng);
        self.emit(&current).await?;

        let passes = self.rng.gen_range(3..=5);
        for _ in 0..passes {
            self.ping().await;
            self.pace_between(self.pacing.heal_min, self.pacing.heal_max)
                .await?;
            heal_pass(&mut current, &targets, &mut self.rng);
            self.emit(&current).await?;
        }

        // Healing is probabilistic; the terminal frame is always exact.
        self.pace(self.pacing.void_settle).await?;
        self.emit(&targets).await?;
        if self.rng.gen_bool(VOID_FLICKER_CHANCE) {
            self.flicker(&targets).await?;
        }
        Ok(())
    }

    /// Swap to the reversed-ornament glyph set and back.
    async fn flicker(&mut self, lines: &[String]) -> Result<(), RevealError> {
        let alt = self.glyphs.flickered();
        self.pace(self.pacing.flicker_pause).await?;
        self.emit_with(lines, &alt).await?;
        self.pace(self.pacing.flicker_pause).await?;
        self.emit(lines).await?;
        Ok(())
    }

    async fn emit(&self, lines: &[String]) -> Result<(), RevealError> {
        self.emit_with(lines, &self.glyphs).await
    }

    async fn emit_with(&self, lines: &[String], glyphs: &StyleGlyphs) -> Result<(), RevealError> {
        let frame = fence(&build_frame(lines, glyphs, self.width, 0, 0));
        self.sink
            .write(self.channel, self.handle, &frame, self.keyboard)
            .await
            .map_err(RevealError::from)
    }

    async fn ping(&self) {
        if let Err(e) = self
            .channel
            .presence_ping(self.handle.chat, PresenceKind::Typing)
            .await
        {
            tracing::debug!(chat = %self.handle.chat, error = %e, "presence ping failed");
        }
    }

    async fn pace_between(&mut self, min: Duration, max: Duration) -> Result<(), RevealError> {
        let duration = if max > min {
            Duration::from_secs_f64(self.rng.gen_range(min.as_secs_f64()..=max.as_secs_f64()))
        } else {
            min
        };
        self.pace(duration).await
    }

    async fn pace(&self, duration: Duration) -> Result<(), RevealError> {
        if self.cancel.is_cancelled() {
            return Err(RevealError::Cancelled);
        }
        tokio::select! {
            () = tokio::time::sleep(duration) => Ok(()),
            () = self.cancel.cancelled() => Err(RevealError::Cancelled),
        }
    }
}

/// One drip column pass: every still-hidden cell in `col` whose target
/// character is non-blank is revealed with [`DRIP_REVEAL_CHANCE`].
/// Revealed cells are never re-hidden.
fn drip_tick<R: Rng + ?Sized>(
    grid: &[Vec<char>],
    revealed: &mut [Vec<bool>],
    col: usize,
    rng: &mut R,
) {
    for (row, cells) in grid.iter().enumerate() {
        if revealed[row][col] {
            continue;
        }
        if cells.get(col).copied().unwrap_or(' ') != ' ' && rng.gen_bool(DRIP_REVEAL_CHANCE) {
            revealed[row][col] = true;
        }
    }
}

/// One void healing pass: every cell differing from its target heals with
/// [`HEAL_CHANCE`], independently.
fn heal_pass<R: Rng + ?Sized>(current: &mut [String], targets: &[String], rng: &mut R) {
    for (cur, target) in current.iter_mut().zip(targets) {
        let healed: String = cur
            .chars()
            .zip(target.chars())
            .map(|(c, t)| {
                if c != t && rng.gen_bool(HEAL_CHANCE) {
                    t
                } else {
                    c
                }
            })
            .collect();
        *cur = healed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn grid_of(lines: &[&str]) -> Vec<Vec<char>> {
        lines.iter().map(|l| l.chars().collect()).collect()
    }

    #[test]
    fn drip_reveals_are_monotonic_across_columns() {
        let grid = grid_of(&["  word  ", " other  ", "        "]);
        let width = grid[0].len();
        let mut revealed = vec![vec![false; width]; grid.len()];
        let mut rng = StdRng::seed_from_u64(11);

        let mut prior_count = 0usize;
        for pass in 0..3 {
            for col in 0..width {
                let before = revealed.clone();
                drip_tick(&grid, &mut revealed, col, &mut rng);
                for (r, row) in before.iter().enumerate() {
                    for (c, &was) in row.iter().enumerate() {
                        assert!(
                            !was || revealed[r][c],
                            "cell ({r},{c}) was re-hidden in pass {pass}"
                        );
                    }
                }
            }
            let count = revealed.iter().flatten().filter(|&&b| b).count();
            assert!(count >= prior_count);
            prior_count = count;
        }
    }

    #[test]
    fn drip_never_reveals_blank_cells() {
        let grid = grid_of(&["  ab  "]);
        let mut revealed = vec![vec![false; 6]];
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..50 {
            for col in 0..6 {
                drip_tick(&grid, &mut revealed, col, &mut rng);
            }
        }
        assert!(!revealed[0][0] && !revealed[0][1]);
        assert!(!revealed[0][4] && !revealed[0][5]);
        assert!(revealed[0][2] && revealed[0][3], "non-blank cells converge");
    }

    #[test]
    fn heal_pass_moves_toward_target_and_converges() {
        let targets = vec!["target line".to_string()];
        let mut current = vec!["▒▒▒▒▒▒ ▒▒▒▒".to_string()];
        let mut rng = StdRng::seed_from_u64(5);

        let mismatches = |cur: &[String]| {
            cur[0]
                .chars()
                .zip(targets[0].chars())
                .filter(|(c, t)| c != t)
                .count()
        };

        let mut last = mismatches(&current);
        for _ in 0..200 {
            heal_pass(&mut current, &targets, &mut rng);
            let now = mismatches(&current);
            assert!(now <= last, "healing must never corrupt further");
            last = now;
        }
        assert_eq!(current, targets, "healing converges eventually");
    }

    #[test]
    fn algorithm_selection_respects_the_prior() {
        let mut rng = StdRng::seed_from_u64(99);
        let mut counts = [0usize; 3];
        for _ in 0..20_000 {
            match RevealAlgorithm::select(&mut rng) {
                RevealAlgorithm::Sequential => counts[0] += 1,
                RevealAlgorithm::Drip => counts[1] += 1,
                RevealAlgorithm::Void => counts[2] += 1,
            }
        }
        assert!(counts[2] < 600, "void should stay rare: {counts:?}");
        assert!(counts[0] > counts[1] * 2, "sequential dominates drip: {counts:?}");
    }

    #[test]
    fn cancel_token_fires_once_cancelled() {
        let (handle, token) = cancel_pair();
        assert!(!token.is_cancelled());
        handle.cancel();
        assert!(token.is_cancelled());
        assert!(!CancelToken::disabled().is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_session_aborts_at_the_first_suspension() {
        use crate::channel::{ChatId, InMemoryChannel, NotifyChannel};
        use crate::layout::{FrameStyle, Layout};
        use crate::sink::RenderSink;

        let channel = InMemoryChannel::new();
        let sink = RenderSink::default();
        let handle = channel
            .create_message(ChatId(1), "blank", None)
            .await
            .unwrap();
        let layout = Layout::for_text("a short card");
        let pacing = PacingConfig::default();
        let (cancel_handle, token) = cancel_pair();
        cancel_handle.cancel();

        let session = RevealSession::new(
            &channel,
            &sink,
            handle,
            None,
            FrameStyle::Rounded.glyphs(),
            &layout,
            &pacing,
            token,
            StdRng::seed_from_u64(0),
        );
        let result = session.run(RevealAlgorithm::Sequential).await;
        assert!(matches!(result, Err(RevealError::Cancelled)));
    }
}
