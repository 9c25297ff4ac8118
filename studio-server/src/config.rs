//! Server configuration from command-line flags and environment.

use std::path::PathBuf;

use clap::Parser;
use studio_core::config::DEFAULT_MAX_IMPORT_BYTES;
use studio_core::{BrandingConfig, Language, SessionConfig};

/// Default port for the studio server.
pub const DEFAULT_PORT: u16 = 9473;

/// Command-line arguments.
#[derive(Debug, Clone, Parser)]
#[command(name = "priey-studio")]
#[command(about = "Local session server for Priey Design Studio")]
#[command(version)]
pub struct ServerConfig {
    /// Port to listen on (localhost only).
    #[arg(long, env = "STUDIO_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Directory holding the persisted session.
    #[arg(long, env = "STUDIO_DATA_DIR", default_value = "./studio-data")]
    pub data_dir: PathBuf,

    /// Access password; the gate is open when unset.
    #[arg(long, env = "STUDIO_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Language used until the user picks one.
    #[arg(long, env = "STUDIO_LANGUAGE", default_value = "en")]
    pub language: String,

    /// Override the watermark text.
    #[arg(long, env = "STUDIO_BRANDING_TEXT")]
    pub branding_text: Option<String>,

    /// Largest accepted upload in bytes.
    #[arg(long, env = "STUDIO_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_IMPORT_BYTES)]
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    /// Session configuration derived from the flags.
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        let mut branding = BrandingConfig::default();
        if let Some(text) = &self.branding_text {
            branding.text.clone_from(text);
        }
        SessionConfig {
            branding,
            default_language: Language::from_code(&self.language),
            max_import_bytes: self.max_upload_bytes,
            ..SessionConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let config = ServerConfig::try_parse_from([
            "priey-studio",
            "--port",
            "8123",
            "--language",
            "ru-RU",
            "--branding-text",
            "Made here",
            "--max-upload-bytes",
            "1024",
        ])
        .expect("parse");

        assert_eq!(config.port, 8123);
        let session = config.session_config();
        assert_eq!(session.default_language, Language::Ru);
        assert_eq!(session.branding.text, "Made here");
        assert_eq!(session.max_import_bytes, 1024);
    }

    #[test]
    fn test_session_config_keeps_canvas_defaults() {
        let config = ServerConfig::try_parse_from(["priey-studio", "--port", "1"]).expect("parse");
        let session = config.session_config();
        assert!((session.canvas.width - 2550.0).abs() < f64::EPSILON);
        assert!((session.branding.font_size - 32.0).abs() < f64::EPSILON);
    }
}
