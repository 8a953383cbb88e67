// The per-request analysis pipeline.
//
// Strictly sequential: stage upload → normalize with the external encoder
// → transcribe via the hosted model → estimate chords locally → assemble
// metadata. Encoder and transcription failures abort the request; chord
// estimation failures degrade to an empty (or fabricated-fallback) chord
// list. The scratch directory is removed on every exit path.

use std::path::Path;

use crate::audio::{beats, chords, chroma, decoder, harmonic};
use crate::error::AnalyzeError;
use crate::model::{AnalysisResult, ChordEvent, Metadata, ModelVersions, Segment};
use crate::server::AppState;
use crate::transcode;
use crate::transcribe;
use crate::staging::{self, StagedUpload};

/// Reported in metadata.model_versions.chords.
pub const CHORD_PIPELINE_VERSION: &str = "chordscribe-dsp-1.0";

/// Run the full analysis for one uploaded file.
pub async fn analyze_upload(
    state: &AppState,
    data: Vec<u8>,
    filename: &str,
) -> Result<AnalysisResult, AnalyzeError> {
    let staged = staging::stage_upload(&data, filename)
        .map_err(|e| AnalyzeError::Internal(format!("failed to stage upload: {}", e)))?;

    // Errors from here on drop `staged`, which removes the scratch dir.
    let result = run_pipeline(state, &staged, filename).await;

    staged.cleanup();
    result
}

async fn run_pipeline(
    state: &AppState,
    staged: &StagedUpload,
    filename: &str,
) -> Result<AnalysisResult, AnalyzeError> {
    tracing::info!("analyzing upload {:?}", filename);

    transcode::convert_to_wav(&staged.input_path, &staged.wav_path).await?;

    let raw = state.transcriber.transcribe_file(&staged.wav_path).await?;
    let lyrics = transcribe::extract_segments(&raw);
    tracing::info!("transcription produced {} lyric segment(s)", lyrics.len());

    let dsp = if state.dsp_available {
        let wav_path = staged.wav_path.to_path_buf();
        match tokio::task::spawn_blocking(move || run_dsp(&wav_path)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("DSP task failed: {}", e);
                DspOutcome::default()
            }
        }
    } else {
        tracing::debug!("DSP capability unavailable, skipping chord/tempo estimation");
        DspOutcome::default()
    };

    let chord_events = finalize_chords(dsp.chords, &lyrics, state.config.fallback_chords);

    let info = decoder::probe_wav_info(&staged.wav_path)
        .map_err(|e| AnalyzeError::Internal(format!("failed to read waveform header: {}", e)))?;

    let metadata = build_metadata(
        filename,
        info.duration_sec(),
        dsp.bpm,
        state.transcriber.model(),
    );

    Ok(AnalysisResult {
        metadata,
        lyrics,
        chords: chord_events,
    })
}

/// Chord events and tempo from the local DSP pass. Both degrade
/// independently — a failure leaves the field at its default.
#[derive(Debug, Default)]
struct DspOutcome {
    chords: Vec<ChordEvent>,
    bpm: Option<f64>,
}

/// Decode once, then track beats and label chords. Every failure in here
/// is absorbed: logged, never fatal for the request.
fn run_dsp(wav_path: &Path) -> DspOutcome {
    let audio = match decoder::decode_to_mono(wav_path) {
        Ok(audio) => audio,
        Err(e) => {
            tracing::warn!("chord estimation error: {}", e);
            return DspOutcome::default();
        }
    };

    let grid = match beats::track_beats(&audio) {
        Ok(grid) => grid,
        Err(e) => {
            tracing::warn!("chord estimation error: {}", e);
            return DspOutcome::default();
        }
    };

    let chords = match chord_pass(&audio, &grid.beat_times) {
        Ok(events) => events,
        Err(e) => {
            tracing::warn!("chord estimation error: {}", e);
            Vec::new()
        }
    };

    tracing::debug!(
        "DSP pass: {} beats, {} chord event(s), bpm {:?}",
        grid.beat_times.len(),
        chords.len(),
        grid.bpm
    );

    DspOutcome {
        chords,
        bpm: grid.bpm,
    }
}

/// Harmonic mask → chromagram → per-beat labels.
fn chord_pass(
    audio: &decoder::MonoAudio,
    beat_times: &[f64],
) -> Result<Vec<ChordEvent>, String> {
    let spec = harmonic::harmonic_spectrogram(&audio.samples, audio.sample_rate)?;
    let chromagram = chroma::chroma_from_spectrogram(&spec);
    Ok(chords::estimate_chords(&chromagram, beat_times))
}

/// Apply the fallback policy: an empty estimate with non-empty lyrics is
/// padded with random palette chords aligned to the lyric spans (unless
/// the fallback is disabled by configuration).
fn finalize_chords(
    estimated: Vec<ChordEvent>,
    lyrics: &[Segment],
    fallback_enabled: bool,
) -> Vec<ChordEvent> {
    if estimated.is_empty() && !lyrics.is_empty() && fallback_enabled {
        tracing::info!("no chords estimated, padding with fallback palette");
        return chords::fallback_chords(lyrics);
    }
    estimated
}

fn build_metadata(filename: &str, duration_sec: f64, bpm: Option<f64>, model: &str) -> Metadata {
    Metadata {
        title: filename.to_string(),
        artist: String::new(),
        duration_sec,
        bpm,
        key: String::new(),
        source: filename.to_string(),
        model_versions: ModelVersions {
            lyrics: model.to_string(),
            chords: CHORD_PIPELINE_VERSION.to_string(),
        },
    }
}
