//! Card Deck
//!
//! A deck is a UTF-8 line-delimited file, one card per line. Lines are
//! trimmed; empty lines are skipped; duplicates keep their first-seen
//! position. Drawing from an empty deck yields the literal
//! [`EMPTY_DECK_SENTINEL`] instead of a card - the orchestrator surfaces
//! instructional text and runs no animation in that case.

use std::collections::HashSet;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

/// The draw result when the deck holds no cards.
pub const EMPTY_DECK_SENTINEL: &str = "the deck is empty";

/// Errors loading a deck file.
#[derive(Debug, Error)]
pub enum DeckError {
    /// The deck file could not be read.
    #[error("failed to read deck file: {0}")]
    Io(#[from] std::io::Error),
}

/// An immutable deck of card texts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Deck {
    cards: Vec<String>,
}

impl Deck {
    /// Load a deck from a line-delimited file. A missing file is an
    /// error; an existing but empty file is an empty deck.
    pub fn load(path: &Path) -> Result<Self, DeckError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_lines(text.lines()))
    }

    /// Build a deck from raw lines, trimming, skipping empties and
    /// deduplicating first-seen.
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let mut seen = HashSet::new();
        let mut cards = Vec::new();
        for line in lines {
            let line = line.trim();
            if !line.is_empty() && seen.insert(line.to_string()) {
                cards.push(line.to_string());
            }
        }
        Self { cards }
    }

    /// Number of distinct cards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Whether the deck holds no cards.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Draw a random card, or [`EMPTY_DECK_SENTINEL`] when empty.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        self.cards
            .choose(rng)
            .map_or(EMPTY_DECK_SENTINEL, String::as_str)
    }
}
