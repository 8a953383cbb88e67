// Per-request scratch storage for uploaded audio.
//
// Each request gets its own uniquely named temporary directory holding the
// raw upload (`input<ext>`) and the normalized waveform (`input.wav`).
// The directory is removed when the StagedUpload is dropped, which covers
// every exit path; cleanup() removes it eagerly and logs (but never
// propagates) removal failures.

use std::path::PathBuf;
use tempfile::TempDir;

/// Extension used when the client filename has none.
const DEFAULT_EXTENSION: &str = "mp3";

/// Longest extension accepted from the client filename hint.
const MAX_EXTENSION_LEN: usize = 8;

pub struct StagedUpload {
    dir: TempDir,
    /// The uploaded bytes, as received
    pub input_path: PathBuf,
    /// Where the normalized 16 kHz mono WAV goes
    pub wav_path: PathBuf,
}

impl StagedUpload {
    /// Remove the scratch directory now. Failures are logged at debug and
    /// swallowed — cleanup must never mask the request's primary outcome.
    pub fn cleanup(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            tracing::debug!("failed to remove scratch dir {:?}: {}", path, e);
        }
    }
}

/// Write the uploaded bytes into a fresh scratch directory.
///
/// `filename` is the client-supplied hint; only its extension is used, and
/// only after sanitizing, so a hostile filename cannot place files outside
/// the scratch directory.
pub fn stage_upload(data: &[u8], filename: &str) -> std::io::Result<StagedUpload> {
    let dir = TempDir::with_prefix("chordscribe-")?;

    let ext = sanitize_extension(filename);
    let input_path = dir.path().join(format!("input.{}", ext));
    let wav_path = dir.path().join("input.wav");

    std::fs::write(&input_path, data)?;

    tracing::debug!(
        "staged {} byte upload at {:?}",
        data.len(),
        input_path
    );

    Ok(StagedUpload {
        dir,
        input_path,
        wav_path,
    })
}

/// Pull a usable extension out of the client filename hint.
/// Non-alphanumeric characters and overlong extensions fall back to the
/// default rather than erroring — the encoder probes content anyway.
fn sanitize_extension(filename: &str) -> String {
    let ext = std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext {
        Some(e)
            if !e.is_empty()
                && e.len() <= MAX_EXTENSION_LEN
                && e.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            e
        }
        _ => DEFAULT_EXTENSION.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_writes_upload() {
        let staged = stage_upload(b"fake audio bytes", "song.mp3").unwrap();
        let written = std::fs::read(&staged.input_path).unwrap();
        assert_eq!(written, b"fake audio bytes");
        assert!(staged.input_path.ends_with("input.mp3"));
        assert!(staged.wav_path.ends_with("input.wav"));
    }

    #[test]
    fn test_cleanup_removes_directory() {
        let staged = stage_upload(b"bytes", "a.wav").unwrap();
        let scratch = staged.input_path.parent().unwrap().to_path_buf();
        assert!(scratch.exists());

        staged.cleanup();
        assert!(!scratch.exists(), "scratch dir must be gone after cleanup");
    }

    #[test]
    fn test_drop_removes_directory() {
        let scratch;
        {
            let staged = stage_upload(b"bytes", "a.flac").unwrap();
            scratch = staged.input_path.parent().unwrap().to_path_buf();
            assert!(scratch.exists());
        }
        assert!(!scratch.exists(), "scratch dir must be gone after drop");
    }

    #[test]
    fn test_extension_default() {
        assert_eq!(sanitize_extension("noextension"), "mp3");
        assert_eq!(sanitize_extension(""), "mp3");
    }

    #[test]
    fn test_extension_sanitized() {
        assert_eq!(sanitize_extension("track.FLAC"), "flac");
        assert_eq!(sanitize_extension("track.m4a"), "m4a");
        // Path separators and weird characters never survive
        assert_eq!(sanitize_extension("evil.../../etc"), "mp3");
        assert_eq!(sanitize_extension("x.waaaaaaaaav"), "mp3");
    }

    #[test]
    fn test_unique_directories_per_request() {
        let a = stage_upload(b"a", "a.mp3").unwrap();
        let b = stage_upload(b"b", "b.mp3").unwrap();
        assert_ne!(a.input_path.parent(), b.input_path.parent());
    }
}
