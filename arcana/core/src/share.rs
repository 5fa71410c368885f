//! Share Image Renderer
//!
//! Static PNG export of a card's text: the text is fitted into a
//! fixed-margin box on a background canvas by binary-searching the
//! largest font size whose greedy pixel wrap satisfies both the box
//! width and the box height, then drawn centered with an outline stroke
//! for contrast against arbitrary backgrounds.
//!
//! Missing assets never fail a render:
//! - no background image (or an unreadable one) falls back to a solid
//!   canvas of fixed dimensions;
//! - no TTF (or an unparsable one) falls back to the basic 8x8 bitmap
//!   font, scaled in whole multiples.
//!
//! Each render job is stateless; nothing is cached between requests.

use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use thiserror::Error;

/// Fraction of the canvas width reserved as left/right margin.
const MARGIN_X: f32 = 0.12;
/// Fraction of the canvas height reserved as top margin.
const MARGIN_TOP: f32 = 0.14;
/// Fraction of the canvas height reserved as bottom margin.
const MARGIN_BOTTOM: f32 = 0.12;
/// Extra spacing between stacked lines, as a fraction of line height.
const LINE_SPACING: f32 = 0.35;
/// Search floor: at least 16 px, at least 5 % of the canvas width.
const MIN_SIZE_FRACTION: f32 = 0.05;
/// Search ceiling: 14 % of the canvas width.
const MAX_SIZE_FRACTION: f32 = 0.14;

/// Fill color for the card text.
const TEXT_FILL: Rgba<u8> = Rgba([245, 240, 255, 255]);
/// Stroke color drawn beneath the fill.
const TEXT_STROKE: Rgba<u8> = Rgba([12, 8, 20, 255]);
/// Solid canvas color when no background image is available.
const FALLBACK_CANVAS: Rgba<u8> = Rgba([26, 18, 38, 255]);

/// Errors producing a share render.
#[derive(Debug, Error)]
pub enum ShareError {
    /// The output image could not be encoded or written.
    #[error("failed to write share image: {0}")]
    Image(String),

    /// The output directory could not be created.
    #[error("failed to prepare output directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Settings for share renders.
#[derive(Clone, Debug)]
pub struct ShareConfig {
    /// Background image; a solid canvas is used when absent or unreadable.
    pub background: Option<PathBuf>,
    /// Scalable TTF font; the basic bitmap font is used when absent or
    /// unparsable.
    pub font: Option<PathBuf>,
    /// Directory share renders are written into.
    pub output_dir: PathBuf,
    /// Canvas dimensions for the solid fallback.
    pub canvas_size: (u32, u32),
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            background: None,
            font: None,
            output_dir: std::env::temp_dir().join("arcana-shares"),
            canvas_size: (1000, 1250),
        }
    }
}

/// The font a render draws with.
enum CardFont {
    /// A parsed TTF, rasterized per glyph.
    Scalable(fontdue::Font),
    /// The 8x8 bitmap font, scaled in whole multiples.
    Bitmap,
}

impl CardFont {
    /// Load the configured font, falling back to the bitmap font.
    fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::Bitmap;
        };
        match std::fs::read(path) {
            Ok(bytes) => match fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default()) {
                Ok(font) => Self::Scalable(font),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = e, "unparsable font, using bitmap fallback");
                    Self::Bitmap
                }
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable font, using bitmap fallback");
                Self::Bitmap
            }
        }
    }

    /// Whole-multiple scale factor the bitmap font uses at `size` px.
    fn bitmap_scale(size: f32) -> u32 {
        ((size / 8.0).floor() as u32).max(1)
    }

    /// Height of one line at `size` px.
    fn line_height(&self, size: f32) -> f32 {
        match self {
            Self::Scalable(font) => font
                .horizontal_line_metrics(size)
                .map_or(size * 1.2, |m| m.ascent - m.descent),
            Self::Bitmap => (Self::bitmap_scale(size) * 8) as f32,
        }
    }

    /// Measured width of `text` at `size` px.
    fn measure(&self, text: &str, size: f32) -> f32 {
        match self {
            Self::Scalable(font) => text
                .chars()
                .map(|c| font.metrics(c, size).advance_width)
                .sum(),
            Self::Bitmap => (text.chars().count() as u32 * Self::bitmap_scale(size) * 8) as f32,
        }
    }

    /// Draw one line with its top-left corner at (`x`, `y`).
    fn draw_line(&self, canvas: &mut RgbaImage, text: &str, x: f32, y: f32, size: f32, color: Rgba<u8>) {
        match self {
            Self::Scalable(font) => {
                let ascent = font
                    .horizontal_line_metrics(size)
                    .map_or(size, |m| m.ascent);
                let baseline = y + ascent;
                let mut cursor = x;
                for c in text.chars() {
                    let (metrics, bitmap) = font.rasterize(c, size);
                    let glyph_x = cursor + metrics.xmin as f32;
                    let glyph_y = baseline - (metrics.height as i32 + metrics.ymin) as f32;
                    for gy in 0..metrics.height {
                        for gx in 0..metrics.width {
                            let coverage = bitmap[gy * metrics.width + gx];
                            if coverage > 0 {
                                blend_pixel(
                                    canvas,
                                    glyph_x as i32 + gx as i32,
                                    glyph_y as i32 + gy as i32,
                                    color,
                                    f32::from(coverage) / 255.0,
                                );
                            }
                        }
                    }
                    cursor += metrics.advance_width;
                }
            }
            Self::Bitmap => {
                let scale = Self::bitmap_scale(size) as i32;
                let mut cursor = x as i32;
                for c in text.chars() {
                    let index = if (c as usize) < font8x8::legacy::BASIC_LEGACY.len() {
                        c as usize
                    } else {
                        b'?' as usize
                    };
                    let glyph = font8x8::legacy::BASIC_LEGACY[index];
                    for (gy, row) in glyph.iter().enumerate() {
                        for gx in 0..8 {
                            if ((*row >> gx) & 1) != 0 {
                                for sy in 0..scale {
                                    for sx in 0..scale {
                                        blend_pixel(
                                            canvas,
                                            cursor + gx * scale + sx,
                                            y as i32 + gy as i32 * scale + sy,
                                            color,
                                            1.0,
                                        );
                                    }
                                }
                            }
                        }
                    }
                    cursor += 8 * scale;
                }
            }
        }
    }
}

fn blend_pixel(canvas: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>, alpha: f32) {
    if x < 0 || y < 0 || x >= canvas.width() as i32 || y >= canvas.height() as i32 || alpha <= 0.0 {
        return;
    }
    let alpha = alpha.min(1.0);
    let blend =
        |src: u8, dst: u8| (f32::from(src) * alpha + f32::from(dst) * (1.0 - alpha)).round() as u8;
    let pixel = canvas.get_pixel_mut(x as u32, y as u32);
    let [r, g, b, a] = &mut pixel.0;
    *r = blend(color[0], *r);
    *g = blend(color[1], *g);
    *b = blend(color[2], *b);
    *a = 255;
}

/// Outcome of the font-size search: the chosen size and the wrapped
/// lines at that size.
#[derive(Clone, Debug, PartialEq)]
pub struct TextFit {
    /// Selected font size in pixels.
    pub font_size: f32,
    /// Greedily wrapped lines at that size.
    pub lines: Vec<String>,
}

/// Greedy word wrap by measured pixel width. Words are never split; a
/// word wider than the box occupies its own (rejected-at-fit) line.
fn wrap_to_width(font: &CardFont, text: &str, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
        } else {
            let candidate = format!("{current} {word}");
            if font.measure(&candidate, size) <= max_width {
                current = candidate;
            } else {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn block_height(font: &CardFont, size: f32, line_count: usize) -> f32 {
    if line_count == 0 {
        return 0.0;
    }
    let lh = font.line_height(size);
    line_count as f32 * lh + (line_count - 1) as f32 * LINE_SPACING * lh
}

/// Binary-search the largest font size in `[min_size, max_size]` whose
/// wrap fits the box; falls back to `min_size`, best-effort, when no
/// candidate is ever accepted.
fn fit_text(font: &CardFont, text: &str, box_w: f32, box_h: f32, min_size: u32, max_size: u32) -> TextFit {
    let fits = |size: u32| -> Option<Vec<String>> {
        let size = size as f32;
        let lines = wrap_to_width(font, text, size, box_w);
        let widths_ok = lines.iter().all(|l| font.measure(l, size) <= box_w);
        let height_ok = block_height(font, size, lines.len()) <= box_h;
        (widths_ok && height_ok).then_some(lines)
    };

    let mut lo = min_size;
    let mut hi = max_size;
    let mut best: Option<(u32, Vec<String>)> = None;
    while lo <= hi {
        let mid = lo + (hi - lo) / 2;
        match fits(mid) {
            Some(lines) => {
                best = Some((mid, lines));
                lo = mid + 1;
            }
            None => {
                if mid == 0 {
                    break;
                }
                hi = mid - 1;
            }
        }
    }

    match best {
        Some((size, lines)) => TextFit {
            font_size: size as f32,
            lines,
        },
        None => TextFit {
            font_size: min_size as f32,
            lines: wrap_to_width(font, text, min_size as f32, box_w),
        },
    }
}

/// Renders card texts to PNG files.
pub struct ShareRenderer {
    config: ShareConfig,
    font: CardFont,
}

impl ShareRenderer {
    /// Create a renderer, loading the configured font once.
    #[must_use]
    pub fn new(config: ShareConfig) -> Self {
        let font = CardFont::load(config.font.as_deref());
        Self { config, font }
    }

    fn canvas(&self) -> RgbaImage {
        if let Some(path) = &self.config.background {
            match image::open(path) {
                Ok(img) => return img.to_rgba8(),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "unreadable background, using solid canvas"
                    );
                }
            }
        }
        let (w, h) = self.config.canvas_size;
        RgbaImage::from_pixel(w, h, FALLBACK_CANVAS)
    }

    /// Fit `text` against this renderer's canvas geometry without
    /// drawing anything.
    #[must_use]
    pub fn fit(&self, text: &str) -> TextFit {
        let canvas = self.canvas();
        self.fit_on(text, canvas.width(), canvas.height())
    }

    fn fit_on(&self, text: &str, width: u32, height: u32) -> TextFit {
        let (w, h) = (width as f32, height as f32);
        let box_w = w * (1.0 - 2.0 * MARGIN_X);
        let box_h = h * (1.0 - MARGIN_TOP - MARGIN_BOTTOM);
        let min_size = (w * MIN_SIZE_FRACTION).max(16.0) as u32;
        let max_size = (w * MAX_SIZE_FRACTION) as u32;
        fit_text(&self.font, text, box_w, box_h, min_size, max_size.max(min_size))
    }

    /// Render `text` to `<output_dir>/<file_name>`, returning the full
    /// path of the written PNG.
    ///
    /// # Errors
    ///
    /// [`ShareError::Io`] when the output directory cannot be created,
    /// [`ShareError::Image`] when encoding fails.
    pub fn render(&self, text: &str, file_name: &str) -> Result<PathBuf, ShareError> {
        let mut canvas = self.canvas();
        let (w, h) = (canvas.width() as f32, canvas.height() as f32);
        let fit = self.fit_on(text, canvas.width(), canvas.height());

        let box_x = w * MARGIN_X;
        let box_w = w * (1.0 - 2.0 * MARGIN_X);
        let box_y = h * MARGIN_TOP;
        let box_h = h * (1.0 - MARGIN_TOP - MARGIN_BOTTOM);

        let lh = self.font.line_height(fit.font_size);
        let block_h = block_height(&self.font, fit.font_size, fit.lines.len());
        let mut y = box_y + (box_h - block_h) / 2.0;
        let stroke = ((fit.font_size * 0.04).ceil() as i32).max(1);

        for line in &fit.lines {
            let line_w = self.font.measure(line, fit.font_size);
            let x = box_x + (box_w - line_w) / 2.0;
            for dy in -stroke..=stroke {
                for dx in -stroke..=stroke {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    self.font.draw_line(
                        &mut canvas,
                        line,
                        x + dx as f32,
                        y + dy as f32,
                        fit.font_size,
                        TEXT_STROKE,
                    );
                }
            }
            self.font
                .draw_line(&mut canvas, line, x, y, fit.font_size, TEXT_FILL);
            y += lh * (1.0 + LINE_SPACING);
        }

        std::fs::create_dir_all(&self.config.output_dir)?;
        let path = self.config.output_dir.join(file_name);
        canvas
            .save(&path)
            .map_err(|e| ShareError::Image(e.to_string()))?;
        tracing::info!(path = %path.display(), size = fit.font_size, "share render written");
        Ok(path)
    }
}
