// Hosted transcription API client.
//
// Posts the normalized waveform to the OpenAI-compatible
// /audio/transcriptions endpoint as a multipart form, requesting JSON
// output with segment-level timestamps. One attempt per request — a
// failure here fails the whole analysis, so there is nothing to retry
// into.

use reqwest::multipart;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;

use crate::error::AnalyzeError;

const TRANSCRIPTIONS_PATH: &str = "/audio/transcriptions";
const RESPONSE_FORMAT: &str = "json";
const TIMESTAMP_GRANULARITY: &str = "segment";

/// Transcription can be slow for long uploads; the whole call still has to
/// fit inside one HTTP request upstream.
const REQUEST_TIMEOUT_SECS: u64 = 120;

pub struct TranscriptionClient {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl TranscriptionClient {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Model name as reported in metadata.model_versions.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Transcribe a 16 kHz mono WAV file.
    ///
    /// Returns the response body as loose JSON: the service does not
    /// guarantee a stable shape, so normalization happens downstream in
    /// `segments::extract_segments`. A body that is not JSON at all is
    /// wrapped as `{"text": <body>}` so the plain-text path still works.
    pub async fn transcribe_file(&self, wav_path: &Path) -> Result<serde_json::Value, AnalyzeError> {
        let audio = tokio::fs::read(wav_path)
            .await
            .map_err(|e| AnalyzeError::Transcription(format!("failed to read waveform: {}", e)))?;

        let file_part = multipart::Part::bytes(audio)
            .file_name("input.wav")
            .mime_str("audio/wav")
            .map_err(|e| AnalyzeError::Transcription(format!("invalid mime type: {}", e)))?;

        let form = multipart::Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", RESPONSE_FORMAT)
            .text("timestamp_granularities[]", TIMESTAMP_GRANULARITY);

        let url = format!("{}{}", self.base_url, TRANSCRIPTIONS_PATH);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AnalyzeError::Transcription(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AnalyzeError::Transcription(format!(
                "API error {}: {}",
                status, error_text
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AnalyzeError::Transcription(format!("failed to read response: {}", e)))?;

        Ok(match serde_json::from_str(&body) {
            Ok(value) => value,
            Err(_) => serde_json::json!({ "text": body }),
        })
    }
}
