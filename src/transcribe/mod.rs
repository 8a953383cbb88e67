// Lyrics extraction via a hosted transcription model.
//
// client    — multipart HTTP client for the /audio/transcriptions endpoint
// segments  — normalizes the service's unstable response shapes into a
//             uniform list of time-aligned lyric segments

pub mod client;
pub mod segments;

pub use client::TranscriptionClient;
pub use segments::extract_segments;
