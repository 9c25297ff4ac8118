//! Session configuration.

use serde::{Deserialize, Serialize};

use crate::engine::DEFAULT_HISTORY_LIMIT;
use crate::enforcer::BrandingConfig;
use crate::i18n::Language;

/// Document units per inch for new documents.
pub const UNITS_PER_INCH: f64 = 300.0;

/// Default import size limit (50 MiB).
pub const DEFAULT_MAX_IMPORT_BYTES: usize = 50 * 1024 * 1024;

/// Canvas size of newly created documents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    /// Width in document units.
    pub width: f64,
    /// Height in document units.
    pub height: f64,
}

impl CanvasSize {
    /// A size given in inches.
    #[must_use]
    pub fn from_inches(width: f64, height: f64) -> Self {
        Self {
            width: width * UNITS_PER_INCH,
            height: height * UNITS_PER_INCH,
        }
    }
}

impl Default for CanvasSize {
    /// US Letter.
    fn default() -> Self {
        Self::from_inches(8.5, 11.0)
    }
}

/// Configuration of a [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Size of documents created from scratch.
    pub canvas: CanvasSize,
    /// The protected watermark.
    pub branding: BrandingConfig,
    /// Language used until one is selected or restored.
    pub default_language: Language,
    /// Undo snapshots kept by the engine.
    pub history_limit: usize,
    /// Largest file accepted by the import pipeline.
    pub max_import_bytes: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            canvas: CanvasSize::default(),
            branding: BrandingConfig::default(),
            default_language: Language::En,
            history_limit: DEFAULT_HISTORY_LIMIT,
            max_import_bytes: DEFAULT_MAX_IMPORT_BYTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_canvas_is_letter_at_300() {
        let size = CanvasSize::default();
        assert!((size.width - 2550.0).abs() < f64::EPSILON);
        assert!((size.height - 3300.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"default_language": "fr", "branding": {"text": "Hi"}}"#)
                .expect("parse");
        assert_eq!(config.default_language, Language::Fr);
        assert_eq!(config.branding.text, "Hi");
        assert!((config.branding.font_size - 32.0).abs() < f64::EPSILON);
        assert_eq!(config.history_limit, DEFAULT_HISTORY_LIMIT);
    }
}
