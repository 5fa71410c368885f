//! Integration tests for the reveal pipeline
//!
//! These tests drive full reveal sessions and Oracle operations against
//! the in-memory channel with seeded RNGs, and verify the end-to-end
//! properties the engine guarantees:
//! - every emitted frame is rectangular
//! - drip reveals accumulate monotonically and terminate exact
//! - void reveals terminate bit-exact regardless of healing randomness
//! - the render sink deduplicates identical consecutive frames
//! - fatal channel errors abort a reveal with no retry

use std::sync::Arc;

use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

use arcana_core::channel::{fence, ChannelCall, ChatId, InMemoryChannel, NotifyChannel};
use arcana_core::deck::Deck;
use arcana_core::layout::{build_frame, FrameStyle, Layout, StyleGlyphs};
use arcana_core::oracle::Oracle;
use arcana_core::reveal::{
    CancelToken, PacingConfig, RevealAlgorithm, RevealError, RevealSession,
};
use arcana_core::sink::RenderSink;
use arcana_core::{ChannelError, MessageHandle, OracleConfig};

const CARD: &str = "Act first. Apologize later.";

/// Strip the `<pre>` fence and split a frame into rows.
fn frame_rows(edit: &str) -> Vec<String> {
    let inner = edit
        .strip_prefix("<pre>")
        .and_then(|s| s.strip_suffix("</pre>"))
        .expect("frames are fenced");
    inner.lines().map(ToString::to_string).collect()
}

/// Interior cells of a frame (content between the vertical borders).
fn interior(rows: &[String]) -> Vec<Vec<char>> {
    rows[1..rows.len() - 1]
        .iter()
        .map(|row| {
            let chars: Vec<char> = row.chars().collect();
            chars[2..chars.len() - 2].to_vec()
        })
        .collect()
}

async fn run_forced(
    algorithm: RevealAlgorithm,
    seed: u64,
) -> (Arc<InMemoryChannel>, MessageHandle, Layout, StyleGlyphs) {
    let channel = Arc::new(InMemoryChannel::new());
    let sink = RenderSink::default();
    let layout = Layout::for_text(CARD);
    let glyphs = FrameStyle::Heavy.glyphs();
    let pacing = PacingConfig::instant();

    let handle = channel
        .create_message(ChatId(1), "initial", None)
        .await
        .unwrap();

    let session = RevealSession::new(
        channel.as_ref(),
        &sink,
        handle,
        None,
        glyphs.clone(),
        &layout,
        &pacing,
        CancelToken::disabled(),
        StdRng::seed_from_u64(seed),
    );
    session.run(algorithm).await.unwrap();
    (channel, handle, layout, glyphs)
}

// =============================================================================
// Frame geometry across whole sessions
// =============================================================================

/// Every frame any algorithm emits is rectangular with the style's
/// border glyphs intact.
#[tokio::test(start_paused = true)]
async fn every_emitted_frame_is_rectangular() {
    for (algorithm, seed) in [
        (RevealAlgorithm::Sequential, 3),
        (RevealAlgorithm::Drip, 4),
        (RevealAlgorithm::Void, 5),
    ] {
        let (channel, handle, _, _) = run_forced(algorithm, seed).await;
        let edits = channel.edits_for(handle);
        assert!(!edits.is_empty(), "{algorithm:?} emitted no frames");
        for edit in &edits {
            let rows = frame_rows(edit);
            let widths: Vec<usize> = rows.iter().map(|r| r.chars().count()).collect();
            assert!(
                widths.iter().all(|&w| w == widths[0]),
                "{algorithm:?} emitted a ragged frame: {edit}"
            );
        }
    }
}

// =============================================================================
// Drip reveal
// =============================================================================

/// Non-blank interior cells only ever accumulate across a drip session
/// (glitch overlays corrupt glyphs in place but never blank a revealed
/// cell), and the terminal frame is the exact target.
#[tokio::test(start_paused = true)]
async fn drip_reveal_is_monotonic_and_terminates_exact() {
    let (channel, handle, layout, glyphs) = run_forced(RevealAlgorithm::Drip, 11).await;
    let edits = channel.edits_for(handle);

    let mut prior: Option<Vec<Vec<bool>>> = None;
    for edit in &edits {
        let cells = interior(&frame_rows(edit));
        let filled: Vec<Vec<bool>> = cells
            .iter()
            .map(|row| row.iter().map(|&c| c != ' ').collect())
            .collect();
        if let Some(prior) = &prior {
            for (r, row) in prior.iter().enumerate() {
                for (c, &was) in row.iter().enumerate() {
                    assert!(
                        !was || filled[r][c],
                        "cell ({r},{c}) was blanked mid-session"
                    );
                }
            }
        }
        prior = Some(filled);
    }

    let expected = fence(&build_frame(
        &layout.padded_rows(),
        &glyphs,
        layout.inner_width,
        0,
        0,
    ));
    assert_eq!(edits.last().unwrap(), &expected, "terminal frame must be exact");
}

// =============================================================================
// Void reveal
// =============================================================================

/// Whatever the healing passes leave behind, the forced final write makes
/// the terminal frame bit-exact equal to the target.
#[tokio::test(start_paused = true)]
async fn void_reveal_terminates_bit_exact() {
    for seed in [0, 1, 2, 40, 41] {
        let (channel, handle, layout, glyphs) = run_forced(RevealAlgorithm::Void, seed).await;
        let edits = channel.edits_for(handle);
        let expected = fence(&build_frame(
            &layout.padded_rows(),
            &glyphs,
            layout.inner_width,
            0,
            0,
        ));
        assert_eq!(
            edits.last().unwrap(),
            &expected,
            "seed {seed}: terminal frame must be exact"
        );
    }
}

// =============================================================================
// Sequential reveal
// =============================================================================

/// A sequential session ends showing the full card body.
#[tokio::test(start_paused = true)]
async fn sequential_reveal_ends_with_the_card_visible() {
    let (channel, handle, layout, _) = run_forced(RevealAlgorithm::Sequential, 21).await;
    let edits = channel.edits_for(handle);
    let last = edits.last().unwrap();
    for line in &layout.lines {
        assert!(last.contains(line.as_str()), "missing body line {line:?}");
    }
}

// =============================================================================
// Render sink behavior through a session
// =============================================================================

/// Two back-to-back identical edits to the same message produce exactly
/// one underlying write call.
#[tokio::test]
async fn identical_consecutive_edits_write_once() {
    let channel = InMemoryChannel::new();
    let sink = RenderSink::default();
    let handle = channel
        .create_message(ChatId(5), "seed", None)
        .await
        .unwrap();

    sink.write(&channel, handle, "same frame", None).await.unwrap();
    sink.write(&channel, handle, "same frame", None).await.unwrap();
    assert_eq!(channel.edit_count(), 1);
}

/// A fatal channel error aborts the session entirely: no retry, no
/// further writes.
#[tokio::test(start_paused = true)]
async fn fatal_channel_error_aborts_the_reveal() {
    let channel = Arc::new(InMemoryChannel::new());
    let sink = RenderSink::default();
    let layout = Layout::for_text(CARD);
    let pacing = PacingConfig::instant();
    let handle = channel
        .create_message(ChatId(1), "initial", None)
        .await
        .unwrap();

    channel.script_edit_error(ChannelError::Api("kaput".to_string()));

    let session = RevealSession::new(
        channel.as_ref(),
        &sink,
        handle,
        None,
        FrameStyle::Thin.glyphs(),
        &layout,
        &pacing,
        CancelToken::disabled(),
        StdRng::seed_from_u64(1),
    );
    let result = session.run(RevealAlgorithm::Sequential).await;
    assert!(matches!(result, Err(RevealError::Channel(ChannelError::Api(_)))));
    assert_eq!(channel.edit_count(), 0, "the first write failed; none may follow");
}

// =============================================================================
// Oracle end to end
// =============================================================================

/// A full draw against the in-memory channel: blank message created with
/// the draw-again keyboard, frames edited in, card text visible at the
/// end.
#[tokio::test(start_paused = true)]
async fn oracle_draw_runs_a_full_reveal() {
    let channel = Arc::new(InMemoryChannel::new());
    let config = OracleConfig {
        pacing: PacingConfig::instant(),
        seed: Some(1234),
        ..OracleConfig::default()
    };
    let oracle = Oracle::new(Arc::clone(&channel), Deck::from_lines([CARD]), config);

    oracle.draw(ChatId(1)).await.unwrap();

    let calls = channel.calls();
    let created = calls.iter().find_map(|call| match call {
        ChannelCall::Create { text, with_keyboard, .. } => Some((text.clone(), *with_keyboard)),
        _ => None,
    });
    let (blank, with_keyboard) = created.expect("a card message was created");
    assert!(with_keyboard, "the card message carries the draw-again button");
    assert!(blank.starts_with("<pre>"), "the card message is a fenced frame");

    assert!(channel.edit_count() > 0, "the reveal edited frames in");
    let last_edit = calls
        .iter()
        .rev()
        .find_map(|call| match call {
            ChannelCall::Edit { text, .. } => Some(text.clone()),
            _ => None,
        })
        .expect("at least one edit");
    assert!(
        last_edit.contains("Apologize"),
        "final frame shows the card text"
    );
    assert_eq!(oracle.last_card(ChatId(1)), Some(CARD.to_string()));
}

/// Draws in different chats interleave freely and never share state.
#[tokio::test(start_paused = true)]
async fn concurrent_draws_in_different_chats_are_independent() {
    let channel = Arc::new(InMemoryChannel::new());
    let config = OracleConfig {
        pacing: PacingConfig::instant(),
        seed: Some(99),
        ..OracleConfig::default()
    };
    let oracle = Arc::new(Oracle::new(
        Arc::clone(&channel),
        Deck::from_lines(["first card", "second card"]),
        config,
    ));

    let a = {
        let oracle = Arc::clone(&oracle);
        tokio::spawn(async move { oracle.draw(ChatId(1)).await })
    };
    let b = {
        let oracle = Arc::clone(&oracle);
        tokio::spawn(async move { oracle.draw(ChatId(2)).await })
    };
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    assert!(oracle.last_card(ChatId(1)).is_some());
    assert!(oracle.last_card(ChatId(2)).is_some());

    // Each chat's message ids are distinct, so every edit targeted the
    // session that owned it.
    let mut chats_seen = std::collections::HashSet::new();
    for call in channel.calls() {
        if let ChannelCall::Edit { handle, .. } = call {
            chats_seen.insert(handle.chat);
        }
    }
    assert_eq!(chats_seen.len(), 2);
}
