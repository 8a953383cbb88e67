// Format normalization via the external ffmpeg encoder.
//
// Whatever the client uploaded becomes a 16 kHz mono WAV the rest of the
// pipeline can rely on. The encoder runs as a child process; any non-zero
// exit (or failure to spawn at all) is fatal for the request.

use std::path::Path;
use tokio::process::Command;

use crate::error::AnalyzeError;

/// Sample rate the pipeline standardizes on (matches what the hosted
/// transcription model expects).
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// How much of the encoder's stderr to carry in the error detail.
const STDERR_TAIL_BYTES: usize = 500;

/// Convert `input` to a 16 kHz mono WAV at `output` using ffmpeg.
pub async fn convert_to_wav(input: &Path, output: &Path) -> Result<(), AnalyzeError> {
    convert_with_encoder("ffmpeg", input, output).await
}

/// Same, with the encoder binary as a parameter so the failure path is
/// testable on machines without ffmpeg installed.
pub async fn convert_with_encoder(
    encoder: &str,
    input: &Path,
    output: &Path,
) -> Result<(), AnalyzeError> {
    let result = Command::new(encoder)
        .arg("-i")
        .arg(input)
        .arg("-ar")
        .arg(TARGET_SAMPLE_RATE.to_string())
        .arg("-ac")
        .arg("1")
        .arg(output)
        .arg("-y")
        .output()
        .await;

    let output_data = match result {
        Ok(o) => o,
        Err(e) => {
            return Err(AnalyzeError::AudioConversion(format!(
                "failed to run {}: {}",
                encoder, e
            )));
        }
    };

    if !output_data.status.success() {
        let stderr = String::from_utf8_lossy(&output_data.stderr);
        return Err(AnalyzeError::AudioConversion(format!(
            "{} exited with {}: {}",
            encoder,
            output_data.status,
            stderr_tail(&stderr)
        )));
    }

    tracing::debug!("normalized {:?} -> {:?}", input, output);
    Ok(())
}

/// ffmpeg prints banners and progress before the actual diagnostic; the
/// useful part is at the end.
fn stderr_tail(stderr: &str) -> &str {
    let trimmed = stderr.trim();
    match trimmed.char_indices().nth_back(STDERR_TAIL_BYTES) {
        Some((idx, _)) => &trimmed[idx..],
        None => trimmed,
    }
}
