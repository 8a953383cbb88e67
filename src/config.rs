// Process configuration, read from the environment once at startup.
//
// The resulting AppConfig is constructed in main and passed explicitly
// into the server state — no hidden globals.

use thiserror::Error;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MODEL: &str = "gpt-4o-transcribe";
const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable not set: {0}")]
    MissingEnv(&'static str),

    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// API key for the hosted transcription service
    pub api_key: String,
    /// Port the HTTP server binds to
    pub port: u16,
    /// Transcription model name, also reported in metadata.model_versions
    pub model: String,
    /// Base URL of the transcription API (overridable for testing)
    pub api_base_url: String,
    /// Whether empty chord results are padded with the random fallback
    /// palette. The fallback fabricates musically meaningless data and
    /// exists only to keep the response field non-empty.
    pub fallback_chords: bool,
}

impl AppConfig {
    /// Read configuration from the environment.
    ///
    /// `OPENAI_API_KEY` is required; everything else has a default:
    /// `CHORDSCRIBE_PORT` (8000), `CHORDSCRIBE_MODEL` (gpt-4o-transcribe),
    /// `CHORDSCRIBE_OPENAI_BASE_URL`, `CHORDSCRIBE_FALLBACK_CHORDS`
    /// ("0"/"false" disables, anything else keeps it on).
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ConfigError::MissingEnv("OPENAI_API_KEY"))?;

        let port = match std::env::var("CHORDSCRIBE_PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                name: "CHORDSCRIBE_PORT",
                value: raw,
            })?,
            Err(_) => DEFAULT_PORT,
        };

        let model =
            std::env::var("CHORDSCRIBE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let api_base_url = std::env::var("CHORDSCRIBE_OPENAI_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());

        let fallback_chords = match std::env::var("CHORDSCRIBE_FALLBACK_CHORDS") {
            Ok(raw) => !matches!(raw.to_lowercase().as_str(), "0" | "false" | "off"),
            Err(_) => true,
        };

        Ok(AppConfig {
            api_key,
            port,
            model,
            api_base_url,
            fallback_chords,
        })
    }
}
