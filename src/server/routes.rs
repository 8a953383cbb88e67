// HTTP routes: the analysis endpoint and a small status probe.

use axum::extract::{Multipart, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;

use super::AppState;
use crate::error::AnalyzeError;
use crate::model::AnalysisResult;
use crate::pipeline;

#[derive(Serialize)]
pub struct StatusResponse {
    pub name: String,
    pub version: String,
    /// Whether local chord/tempo estimation is operational; when false the
    /// chords field degrades to the fallback path
    pub chords_available: bool,
}

pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/analyze", post(analyze))
        .route("/api/status", get(get_status))
}

async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        name: "chordscribe".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        chords_available: state.dsp_available,
    })
}

/// Accept a multipart audio upload and return the full analysis.
///
/// Reads the first `file` field (falling back to the first field carrying
/// a filename); everything else in the form is ignored.
async fn analyze(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisResult>, AnalyzeError> {
    let mut upload: Option<(Vec<u8>, String)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AnalyzeError::BadRequest(format!("malformed multipart body: {}", e)))?
    {
        let is_file = field.name() == Some("file") || field.file_name().is_some();
        if !is_file {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AnalyzeError::BadRequest(format!("failed to read upload: {}", e)))?;

        upload = Some((data.to_vec(), filename));
        break;
    }

    let (data, filename) =
        upload.ok_or_else(|| AnalyzeError::BadRequest("missing 'file' field".to_string()))?;

    if data.is_empty() {
        return Err(AnalyzeError::BadRequest("uploaded file is empty".to_string()));
    }

    let result = pipeline::analyze_upload(&state, data, &filename).await?;
    Ok(Json(result))
}
