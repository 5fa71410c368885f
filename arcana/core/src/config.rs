//! Engine Configuration
//!
//! Typed configuration for the orchestrator with environment-variable and
//! TOML-file overlays. Precedence, lowest to highest: built-in defaults,
//! TOML file, environment variables.
//!
//! # Environment Variables
//!
//! - `ARCANA_SEED`: root RNG seed (reproducible animations)
//! - `ARCANA_PACING_SCALE`: uniform multiplier on every pacing delay
//! - `ARCANA_SHARE_DIR`: directory share renders are written into
//! - `ARCANA_BACKGROUND`: background image for share renders
//! - `ARCANA_FONT`: TTF font for share renders

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::cache::{DEFAULT_CHAT_CAPACITY, DEFAULT_SINK_CAPACITY};
use crate::reveal::PacingConfig;
use crate::share::ShareConfig;

/// Errors loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for this schema.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Orchestrator configuration.
#[derive(Clone, Debug)]
pub struct OracleConfig {
    /// Animation pacing delays.
    pub pacing: PacingConfig,
    /// Share render settings.
    pub share: ShareConfig,
    /// Capacity of the render sink's last-frame cache.
    pub sink_capacity: usize,
    /// Capacity of the per-chat state map.
    pub chat_capacity: usize,
    /// Root RNG seed; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            pacing: PacingConfig::default(),
            share: ShareConfig::default(),
            sink_capacity: DEFAULT_SINK_CAPACITY,
            chat_capacity: DEFAULT_CHAT_CAPACITY,
            seed: None,
        }
    }
}

impl OracleConfig {
    /// Defaults overlaid with environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Defaults, then the TOML file (when given), then environment
    /// variables.
    ///
    /// # Errors
    ///
    /// Propagates [`ConfigError`] from the file overlay.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(path) = file {
            config.apply(&load_toml(path)?);
        }
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(seed) = std::env::var("ARCANA_SEED") {
            self.seed = seed.parse().ok();
        }
        if let Some(scale) = std::env::var("ARCANA_PACING_SCALE")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
        {
            self.pacing = self.pacing.scaled(scale);
        }
        if let Ok(dir) = std::env::var("ARCANA_SHARE_DIR") {
            self.share.output_dir = PathBuf::from(dir);
        }
        if let Ok(path) = std::env::var("ARCANA_BACKGROUND") {
            self.share.background = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("ARCANA_FONT") {
            self.share.font = Some(PathBuf::from(path));
        }
    }

    /// Apply a TOML overlay on top of this configuration.
    pub fn apply(&mut self, overlay: &ArcanaToml) {
        if let Some(scale) = overlay.pacing_scale {
            self.pacing = self.pacing.scaled(scale);
        }
        if let Some(path) = &overlay.background {
            self.share.background = Some(path.clone());
        }
        if let Some(path) = &overlay.font {
            self.share.font = Some(path.clone());
        }
        if let Some(dir) = &overlay.share_dir {
            self.share.output_dir = dir.clone();
        }
        if let Some(capacity) = overlay.sink_capacity {
            self.sink_capacity = capacity;
        }
        if let Some(capacity) = overlay.chat_capacity {
            self.chat_capacity = capacity;
        }
        if overlay.seed.is_some() {
            self.seed = overlay.seed;
        }
    }
}

/// The TOML configuration file schema. Every field is optional; absent
/// fields leave the defaults untouched.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct ArcanaToml {
    /// Uniform multiplier on every pacing delay.
    pub pacing_scale: Option<f64>,
    /// Background image for share renders.
    pub background: Option<PathBuf>,
    /// TTF font for share renders.
    pub font: Option<PathBuf>,
    /// Directory share renders are written into.
    pub share_dir: Option<PathBuf>,
    /// Capacity of the render sink's last-frame cache.
    pub sink_capacity: Option<usize>,
    /// Capacity of the per-chat state map.
    pub chat_capacity: Option<usize>,
    /// Root RNG seed.
    pub seed: Option<u64>,
}

/// Load a TOML overlay from `path`.
///
/// # Errors
///
/// [`ConfigError::Io`] when the file cannot be read,
/// [`ConfigError::Parse`] when it is not valid for the schema.
pub fn load_toml(path: &Path) -> Result<ArcanaToml, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&text)?)
}

/// Default data directory: the platform data dir under `arcana/`, or the
/// system temp dir when no platform dir exists.
#[must_use]
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map_or_else(std::env::temp_dir, |d| d)
        .join("arcana")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn defaults_are_bounded() {
        let config = OracleConfig::default();
        assert_eq!(config.sink_capacity, DEFAULT_SINK_CAPACITY);
        assert_eq!(config.chat_capacity, DEFAULT_CHAT_CAPACITY);
        assert!(config.seed.is_none());
    }

    #[test]
    fn toml_overlay_applies() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "pacing_scale = 0.5").unwrap();
        writeln!(file, "seed = 7").unwrap();
        writeln!(file, "sink_capacity = 32").unwrap();
        file.flush().unwrap();

        let overlay = load_toml(file.path()).unwrap();
        let mut config = OracleConfig::default();
        config.apply(&overlay);

        assert_eq!(config.seed, Some(7));
        assert_eq!(config.sink_capacity, 32);
        assert_eq!(config.pacing.drip_step, Duration::from_millis(30));
    }

    #[test]
    fn empty_toml_changes_nothing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "").unwrap();
        file.flush().unwrap();

        let overlay = load_toml(file.path()).unwrap();
        assert_eq!(overlay, ArcanaToml::default());
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "pacing_scale = \"fast\"").unwrap();
        file.flush().unwrap();

        assert!(matches!(
            load_toml(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }
}
