// Per-frame chromagram from the harmonic spectrogram.
//
// Each STFT frame is folded into 12 pitch-class strengths by mapping every
// FFT bin in the musical range to its nearest semitone (12-TET, A4=440Hz)
// and accumulating power. Unlike a whole-track chromagram, the per-frame
// form keeps time resolution so chord estimation can average over beat
// spans.

use crate::audio::harmonic::{Spectrogram, FFT_SIZE, HOP_SIZE};

/// Below this, bass rumble and noise dominate. ~C2 = 65Hz.
const MIN_FREQ: f64 = 65.0;

/// Above ~2000Hz harmonics rather than fundamentals dominate, which
/// distorts the pitch class distribution.
const MAX_FREQ: f64 = 2000.0;

/// A time-resolved 12-bin pitch-class representation.
#[derive(Debug, Clone)]
pub struct Chromagram {
    /// One 12-element strength vector per STFT frame
    pub frames: Vec<[f64; 12]>,
    pub sample_rate: u32,
}

impl Chromagram {
    /// Index of the STFT frame covering time `t` (seconds).
    pub fn time_to_frame(&self, t: f64) -> usize {
        if t <= 0.0 {
            return 0;
        }
        (t * self.sample_rate as f64 / HOP_SIZE as f64) as usize
    }

    /// Time (seconds) at the start of frame `idx`.
    pub fn frame_to_time(&self, idx: usize) -> f64 {
        idx as f64 * HOP_SIZE as f64 / self.sample_rate as f64
    }

    /// Average chroma vector over frames [start, end), clamped to the
    /// available range. None when the span covers no frames.
    pub fn average_span(&self, start: usize, end: usize) -> Option<[f64; 12]> {
        let end = end.min(self.frames.len());
        if start >= end {
            return None;
        }

        let mut mean = [0.0f64; 12];
        for frame in &self.frames[start..end] {
            for (acc, v) in mean.iter_mut().zip(frame.iter()) {
                *acc += v;
            }
        }
        let n = (end - start) as f64;
        for v in mean.iter_mut() {
            *v /= n;
        }
        Some(mean)
    }
}

/// Fold a magnitude spectrogram into per-frame pitch-class power.
pub fn chroma_from_spectrogram(spec: &Spectrogram) -> Chromagram {
    let bin_map = bin_to_pitch_class(spec.sample_rate);

    let frames = spec
        .frames
        .iter()
        .map(|magnitudes| {
            let mut chroma = [0.0f64; 12];
            for (bin, pc) in bin_map.iter().enumerate() {
                if let Some(pc) = pc {
                    let magnitude = magnitudes[bin];
                    chroma[*pc] += magnitude * magnitude;
                }
            }
            chroma
        })
        .collect();

    Chromagram {
        frames,
        sample_rate: spec.sample_rate,
    }
}

/// Frequency-to-pitch-class mapping for each FFT bin.
///
/// 12-TET with A4=440Hz: semitones_from_A = 12·log2(f/440); the +9 shifts
/// A-based indexing to C-based (C=0, ..., A=9, ..., B=11). Bins outside
/// the musical range map to None.
fn bin_to_pitch_class(sample_rate: u32) -> Vec<Option<usize>> {
    (0..Spectrogram::num_bins())
        .map(|bin| {
            let freq = bin as f64 * sample_rate as f64 / FFT_SIZE as f64;
            if freq < MIN_FREQ || freq > MAX_FREQ {
                None
            } else {
                let semitones_from_a = 12.0 * (freq / 440.0).log2();
                let pitch_class = ((semitones_from_a.round() as i32 + 9) % 12 + 12) % 12;
                Some(pitch_class as usize)
            }
        })
        .collect()
}
