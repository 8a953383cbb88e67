// Error taxonomy for the analysis pipeline.
//
// Fatal errors abort the request and surface as JSON error responses.
// Chord-estimation failures never reach this type: they are absorbed at
// the component boundary (see audio::chords / pipeline) and degrade to an
// empty chord list. Scratch-cleanup failures are logged and swallowed in
// staging.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzeError {
    /// The external encoder exited non-zero (or could not be spawned).
    #[error("Audio conversion error: {0}")]
    AudioConversion(String),

    /// The hosted transcription call failed, or its response was
    /// malformed beyond recovery.
    #[error("Transcription error: {0}")]
    Transcription(String),

    /// The upload itself was unusable (e.g. no `file` part).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Staging I/O or waveform header probing failed.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AnalyzeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AnalyzeError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AnalyzeError::AudioConversion(_)
            | AnalyzeError::Transcription(_)
            | AnalyzeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AnalyzeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(serde_json::json!({ "detail": self.to_string() }));
        (status, body).into_response()
    }
}
