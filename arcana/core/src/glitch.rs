//! Corruption and Masking Primitives
//!
//! Character-level utilities shared by every reveal algorithm: random
//! corruption against a fixed glyph palette, and masking a target block
//! against a 2-D reveal matrix. Blank cells are never corrupted and never
//! need revealing.
//!
//! All randomness flows through a caller-supplied [`rand::Rng`], so a
//! seeded generator reproduces an animation exactly.

use rand::seq::SliceRandom;
use rand::Rng;

/// The corruption palette. Drawn from uniformly when a cell glitches.
pub const GLITCH_GLYPHS: &[char] = &[
    '▒', '▓', '░', '◼', '◻', '◾', '◽', '▞', '▚', '▣', '▤', '▥', '▦', '▧', '▨', '▩', '◆', '◇',
    '◈', '✧', '✦', '✴', '✹', '✺', '✵', '✷', '✸', '✢', '✣', '✤', '✥', '※', '¤', '•', '·',
];

fn random_glyph<R: Rng + ?Sized>(rng: &mut R) -> char {
    *GLITCH_GLYPHS.choose(rng).unwrap_or(&'▒')
}

/// Corrupt a block of lines: each non-blank character is independently
/// replaced with a palette glyph at probability `intensity`.
pub fn corrupt<R: Rng + ?Sized>(lines: &[String], intensity: f64, rng: &mut R) -> Vec<String> {
    lines
        .iter()
        .map(|line| {
            line.chars()
                .map(|c| {
                    if c != ' ' && rng.gen_bool(intensity) {
                        random_glyph(rng)
                    } else {
                        c
                    }
                })
                .collect()
        })
        .collect()
}

/// Corrupt a single line at the given intensity.
pub fn corrupt_line<R: Rng + ?Sized>(line: &str, intensity: f64, rng: &mut R) -> String {
    line.chars()
        .map(|c| {
            if c != ' ' && rng.gen_bool(intensity) {
                random_glyph(rng)
            } else {
                c
            }
        })
        .collect()
}

/// Replace every non-blank cell with a random palette glyph. This is the
/// opening frame of the void reveal.
pub fn full_corruption<R: Rng + ?Sized>(targets: &[String], rng: &mut R) -> Vec<String> {
    targets
        .iter()
        .map(|line| {
            line.chars()
                .map(|c| if c == ' ' { ' ' } else { random_glyph(rng) })
                .collect()
        })
        .collect()
}

/// Mask target lines against a reveal matrix: any cell whose matrix entry
/// is `false` (or missing) is blanked.
#[must_use]
pub fn mask(targets: &[String], revealed: &[Vec<bool>]) -> Vec<String> {
    targets
        .iter()
        .enumerate()
        .map(|(row, line)| {
            let row_mask: &[bool] = revealed.get(row).map_or(&[], Vec::as_slice);
            line.chars()
                .enumerate()
                .map(|(col, c)| if row_mask.get(col).copied().unwrap_or(false) { c } else { ' ' })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn corrupt_preserves_blanks_and_length() {
        let mut rng = StdRng::seed_from_u64(7);
        let lines = vec!["  hello  world  ".to_string()];
        let out = corrupt(&lines, 1.0, &mut rng);
        assert_eq!(out[0].chars().count(), lines[0].chars().count());
        for (orig, got) in lines[0].chars().zip(out[0].chars()) {
            if orig == ' ' {
                assert_eq!(got, ' ');
            } else {
                assert!(GLITCH_GLYPHS.contains(&got));
            }
        }
    }

    #[test]
    fn corrupt_at_zero_intensity_is_identity() {
        let mut rng = StdRng::seed_from_u64(7);
        let lines = vec!["keep me intact".to_string()];
        assert_eq!(corrupt(&lines, 0.0, &mut rng), lines);
    }

    #[test]
    fn corrupt_is_reproducible_under_a_fixed_seed() {
        let lines = vec!["the same every time".to_string()];
        let a = corrupt(&lines, 0.5, &mut StdRng::seed_from_u64(42));
        let b = corrupt(&lines, 0.5, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn full_corruption_replaces_every_glyph() {
        let mut rng = StdRng::seed_from_u64(3);
        let targets = vec![" ab ".to_string()];
        let out = full_corruption(&targets, &mut rng);
        let chars: Vec<char> = out[0].chars().collect();
        assert_eq!(chars[0], ' ');
        assert_eq!(chars[3], ' ');
        assert!(GLITCH_GLYPHS.contains(&chars[1]));
        assert!(GLITCH_GLYPHS.contains(&chars[2]));
    }

    #[test]
    fn mask_blanks_unrevealed_cells() {
        let targets = vec!["abcd".to_string(), "efgh".to_string()];
        let revealed = vec![vec![true, false, true, false], vec![false; 4]];
        let out = mask(&targets, &revealed);
        assert_eq!(out, vec!["a c ".to_string(), "    ".to_string()]);
    }

    #[test]
    fn mask_tolerates_short_or_missing_rows() {
        let targets = vec!["abcd".to_string(), "efgh".to_string()];
        let revealed = vec![vec![true]];
        let out = mask(&targets, &revealed);
        assert_eq!(out, vec!["a   ".to_string(), "    ".to_string()]);
    }
}
