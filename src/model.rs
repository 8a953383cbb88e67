// Response types for the /analyze endpoint.
//
// Everything here is request-scoped: built once per upload, serialized,
// and discarded. The JSON field names are the public API contract.

use serde::{Deserialize, Serialize};

/// One recognized lyric span with segment-level timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Span start in seconds
    pub start: f64,
    /// Span end in seconds
    pub end: f64,
    /// Recognized text, trimmed of surrounding whitespace
    pub text: String,
}

/// One chord span. The label is an informal "root:quality" token
/// (e.g. "C:maj"), not a validated chord grammar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordEvent {
    pub start: f64,
    pub end: f64,
    pub label: String,
}

/// Names of the models/pipelines that produced each part of the result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelVersions {
    /// Hosted transcription model (e.g. "gpt-4o-transcribe")
    pub lyrics: String,
    /// Local chord-estimation pipeline version string
    pub chords: String,
}

/// Basic metadata about the analyzed upload.
///
/// `artist` and `key` are always empty strings: this service performs no
/// artist or key detection. `bpm` is null when tempo estimation is
/// unavailable or fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub title: String,
    pub artist: String,
    pub duration_sec: f64,
    pub bpm: Option<f64>,
    pub key: String,
    pub source: String,
    pub model_versions: ModelVersions,
}

/// The full analysis payload returned by POST /analyze.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub metadata: Metadata,
    pub lyrics: Vec<Segment>,
    pub chords: Vec<ChordEvent>,
}
