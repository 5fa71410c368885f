//! Frame Layout Engine
//!
//! Pure geometry for card frames: inner width selection, greedy word wrap,
//! vertical padding for a near-square aspect, and the bordered frame builder.
//!
//! Everything here is deterministic. A frame is a pure function of
//! (style glyphs, inner width, row contents, top/bottom padding) - the
//! animation layer composes these primitives but can never produce a
//! non-rectangular frame.
//!
//! All measurements are in characters (`chars().count()`); the engine
//! assumes single-width glyphs throughout.

/// Minimum inner width of a card frame, in characters.
pub const MIN_WIDTH: usize = 24;
/// Maximum inner width of a card frame, in characters.
pub const MAX_WIDTH: usize = 48;
/// Maximum number of wrapped body lines per card. Overflow is dropped.
pub const MAX_LINES: usize = 10;

/// Height the padding aims for, as a fraction of the inner width.
const TARGET_HEIGHT_RATIO: f64 = 0.20;
/// Upper bound on padding rows added around the body.
const MAX_EXTRA_ROWS: usize = 10;

/// The closed set of frame styles a card can be drawn in.
///
/// Selection is random per draw; the glyph sets are fixed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameStyle {
    /// Rounded corners, light lines, crescent-moon ornament.
    Rounded,
    /// Heavy lines, four-pointed-star ornament.
    Heavy,
    /// Thin square corners, single diamond ornament.
    Thin,
    /// Double lines, six-pointed-star ornament.
    Double,
}

impl FrameStyle {
    /// Every style, for random selection.
    pub const ALL: [Self; 4] = [Self::Rounded, Self::Heavy, Self::Thin, Self::Double];

    /// The glyph set this style draws with.
    #[must_use]
    pub fn glyphs(self) -> StyleGlyphs {
        match self {
            Self::Rounded => StyleGlyphs {
                top_left: '╭',
                top_right: '╮',
                bottom_left: '╰',
                bottom_right: '╯',
                horizontal: '─',
                vertical: '│',
                ornament: "☽☾".to_string(),
            },
            Self::Heavy => StyleGlyphs {
                top_left: '┏',
                top_right: '┓',
                bottom_left: '┗',
                bottom_right: '┛',
                horizontal: '━',
                vertical: '┃',
                ornament: "✦✦".to_string(),
            },
            Self::Thin => StyleGlyphs {
                top_left: '┌',
                top_right: '┐',
                bottom_left: '└',
                bottom_right: '┘',
                horizontal: '─',
                vertical: '│',
                ornament: "❖".to_string(),
            },
            Self::Double => StyleGlyphs {
                top_left: '╔',
                top_right: '╗',
                bottom_left: '╚',
                bottom_right: '╝',
                horizontal: '═',
                vertical: '║',
                ornament: "✶✶".to_string(),
            },
        }
    }

    /// Pick a style at random.
    pub fn pick<R: rand::Rng + ?Sized>(rng: &mut R) -> Self {
        use rand::seq::SliceRandom;
        *Self::ALL
            .choose(rng)
            .unwrap_or(&Self::Rounded)
    }
}

/// A concrete glyph set for drawing one frame.
///
/// The ornament string heads the frame and is mirrored for the footer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyleGlyphs {
    /// Top-left corner glyph.
    pub top_left: char,
    /// Top-right corner glyph.
    pub top_right: char,
    /// Bottom-left corner glyph.
    pub bottom_left: char,
    /// Bottom-right corner glyph.
    pub bottom_right: char,
    /// Horizontal border glyph.
    pub horizontal: char,
    /// Vertical border glyph.
    pub vertical: char,
    /// Ornament string, centered in the header row.
    pub ornament: String,
}

impl StyleGlyphs {
    /// The same glyph set with the ornament reversed, used for the
    /// end-of-reveal flicker.
    #[must_use]
    pub fn flickered(&self) -> Self {
        Self {
            ornament: self.ornament.chars().rev().collect(),
            ..self.clone()
        }
    }
}

/// Derived geometry for one card: width, wrapped body, vertical padding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    /// Inner width in characters, within `[MIN_WIDTH, MAX_WIDTH]`.
    pub inner_width: usize,
    /// Wrapped body lines, at most [`MAX_LINES`].
    pub lines: Vec<String>,
    /// Blank rows above the body.
    pub pad_top: usize,
    /// Blank rows below the body.
    pub pad_bottom: usize,
}

impl Layout {
    /// Compute the full layout for a card text.
    #[must_use]
    pub fn for_text(text: &str) -> Self {
        let inner_width = inner_width(text);
        let lines = wrap(text, inner_width);
        let (pad_top, pad_bottom) = square_padding(inner_width, lines.len());
        Self {
            inner_width,
            lines,
            pad_top,
            pad_bottom,
        }
    }

    /// Body lines with the padding rows expanded to empty strings, the
    /// working buffer the reveal algorithms operate on.
    #[must_use]
    pub fn padded_rows(&self) -> Vec<String> {
        let mut rows = vec![String::new(); self.pad_top];
        rows.extend(self.lines.iter().cloned());
        rows.extend(std::iter::repeat(String::new()).take(self.pad_bottom));
        rows
    }
}

/// Inner frame width for a card text: longest word plus margin, clamped to
/// `[MIN_WIDTH, MAX_WIDTH]`. Monotonic in the longest-word length within
/// the clamp range.
#[must_use]
pub fn inner_width(text: &str) -> usize {
    let longest_word = text
        .split_whitespace()
        .map(|w| w.chars().count())
        .max()
        .unwrap_or(6);
    (longest_word + 8).clamp(MIN_WIDTH, MAX_WIDTH)
}

/// Greedy word wrap. Words are never split: a single word longer than
/// `width` occupies its own (overflowing) line. Output is capped at
/// [`MAX_LINES`]; overflow text is silently dropped.
#[must_use]
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(8);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if current_len == 0 {
            current.push_str(word);
            current_len = word_len;
        } else if current_len + 1 + word_len <= width {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines.truncate(MAX_LINES);
    lines
}

/// Vertical padding rows that bring the frame close to a square aspect.
///
/// The target height is `round(width * 0.20)` clamped to
/// `[line_count + 2, line_count + 10]`; the surplus is split with the
/// larger half below. Returns `(top, bottom)` with `bottom - top <= 1`.
#[must_use]
pub fn square_padding(inner_width: usize, line_count: usize) -> (usize, usize) {
    let target = (inner_width as f64 * TARGET_HEIGHT_RATIO).round() as usize;
    let target = target.clamp(line_count + 2, line_count + MAX_EXTRA_ROWS);
    let extra = target - line_count;
    let top = extra / 2;
    (top, extra - top)
}

/// Center `s` within `width` characters, left-biased. A string of display
/// length >= `width` is truncated to exactly `width` - never wrapped,
/// never an error.
#[must_use]
pub fn center(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len >= width {
        return s.chars().take(width).collect();
    }
    let left = (width - len) / 2;
    let right = width - len - left;
    let mut out = String::with_capacity(width);
    out.extend(std::iter::repeat(' ').take(left));
    out.push_str(s);
    out.extend(std::iter::repeat(' ').take(right));
    out
}

/// Build one bordered frame.
///
/// Row order: top border; centered ornament header; one blank interior
/// row; `pad_top` blank rows; the content lines (centered or truncated to
/// `inner_width`); `pad_bottom` blank rows; one blank interior row;
/// centered reversed-ornament footer; bottom border. Every interior row is
/// wrapped by the vertical glyph with one space of margin on each side, so
/// all rows have equal display length.
#[must_use]
pub fn build_frame(
    lines: &[String],
    glyphs: &StyleGlyphs,
    inner_width: usize,
    pad_top: usize,
    pad_bottom: usize,
) -> String {
    let v = glyphs.vertical;
    let head = center(&glyphs.ornament, inner_width);
    let foot_orn: String = glyphs.ornament.chars().rev().collect();
    let foot = center(&foot_orn, inner_width);
    let bar = String::from(glyphs.horizontal).repeat(inner_width + 2);
    let blank = format!("{v} {} {v}", " ".repeat(inner_width));

    let mut out = Vec::with_capacity(lines.len() + pad_top + pad_bottom + 6);
    out.push(format!("{}{bar}{}", glyphs.top_left, glyphs.top_right));
    out.push(format!("{v} {head} {v}"));
    out.push(blank.clone());
    for _ in 0..pad_top {
        out.push(blank.clone());
    }
    for line in lines {
        out.push(format!("{v} {} {v}", center(line, inner_width)));
    }
    for _ in 0..pad_bottom {
        out.push(blank.clone());
    }
    out.push(blank);
    out.push(format!("{v} {foot} {v}"));
    out.push(format!("{}{bar}{}", glyphs.bottom_left, glyphs.bottom_right));
    out.join("\n")
}
