// Harmonic component extraction.
//
// Chord estimation wants pitched content, not drum hits. Rather than
// reconstructing a time-domain harmonic signal, this module computes an
// STFT magnitude spectrogram and keeps only the cells where energy is
// sustained along time (harmonic) rather than spread across frequency
// (percussive) — a median-filter dominance mask. The masked spectrogram
// feeds the chromagram directly.
//
// Process per frame:
// 1. Hanning window + FFT (4096 samples, 1024 hop)
// 2. For each bin: compare the median magnitude over a time window against
//    the median over a frequency window
// 3. Keep the cell when the time median wins (sustained energy), else zero

use rustfft::{num_complex::Complex, FftPlanner};
use std::f64::consts::PI;

/// FFT window size. 4096 at 16 kHz gives ~3.9 Hz bin spacing — enough to
/// separate adjacent semitones down to the bottom of the chroma range.
pub const FFT_SIZE: usize = 4096;

/// Hop between consecutive frames (75% overlap).
pub const HOP_SIZE: usize = 1024;

/// Half-width of the median windows, in frames/bins. 17-point windows
/// total, the usual order of magnitude for magnitude-domain HPSS.
const MEDIAN_HALF_SPAN: usize = 8;

/// Magnitude spectrogram after harmonic masking.
#[derive(Debug, Clone)]
pub struct Spectrogram {
    /// One magnitude vector (FFT_SIZE/2 + 1 bins) per frame
    pub frames: Vec<Vec<f64>>,
    pub sample_rate: u32,
}

impl Spectrogram {
    pub fn num_bins() -> usize {
        FFT_SIZE / 2 + 1
    }
}

/// Compute the harmonic-masked magnitude spectrogram of a mono signal.
pub fn harmonic_spectrogram(samples: &[f32], sample_rate: u32) -> Result<Spectrogram, String> {
    if samples.len() < FFT_SIZE {
        return Err(format!(
            "Audio too short for spectral analysis: {} samples (need at least {})",
            samples.len(),
            FFT_SIZE
        ));
    }

    let magnitudes = stft_magnitudes(samples);
    let frames = harmonic_mask(&magnitudes);

    Ok(Spectrogram {
        frames,
        sample_rate,
    })
}

/// Sliding Hanning-windowed FFT; returns per-frame magnitude vectors.
fn stft_magnitudes(samples: &[f32]) -> Vec<Vec<f64>> {
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(FFT_SIZE);

    let window: Vec<f64> = (0..FFT_SIZE)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / (FFT_SIZE - 1) as f64).cos()))
        .collect();

    let num_frames = (samples.len() - FFT_SIZE) / HOP_SIZE + 1;
    let num_bins = Spectrogram::num_bins();
    let mut frames = Vec::with_capacity(num_frames);

    for frame_idx in 0..num_frames {
        let start = frame_idx * HOP_SIZE;

        let mut buffer: Vec<Complex<f64>> = samples[start..start + FFT_SIZE]
            .iter()
            .enumerate()
            .map(|(i, &s)| Complex::new(s as f64 * window[i], 0.0))
            .collect();

        fft.process(&mut buffer);

        frames.push(buffer[..num_bins].iter().map(|c| c.norm()).collect());
    }

    frames
}

/// Zero every spectrogram cell whose energy looks percussive.
///
/// A cell is harmonic-dominant when its median along the time axis is at
/// least its median along the frequency axis: tones persist across frames
/// at one bin, transients smear across bins within one frame.
fn harmonic_mask(magnitudes: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let num_frames = magnitudes.len();
    let num_bins = magnitudes[0].len();
    let mut masked = vec![vec![0.0; num_bins]; num_frames];

    let mut scratch: Vec<f64> = Vec::with_capacity(2 * MEDIAN_HALF_SPAN + 1);

    for t in 0..num_frames {
        let t_lo = t.saturating_sub(MEDIAN_HALF_SPAN);
        let t_hi = (t + MEDIAN_HALF_SPAN + 1).min(num_frames);

        for f in 0..num_bins {
            // Median across neighboring frames at this bin
            scratch.clear();
            scratch.extend((t_lo..t_hi).map(|ti| magnitudes[ti][f]));
            let harmonic = median(&mut scratch);

            // Median across neighboring bins in this frame
            let f_lo = f.saturating_sub(MEDIAN_HALF_SPAN);
            let f_hi = (f + MEDIAN_HALF_SPAN + 1).min(num_bins);
            scratch.clear();
            scratch.extend_from_slice(&magnitudes[t][f_lo..f_hi]);
            let percussive = median(&mut scratch);

            if harmonic >= percussive {
                masked[t][f] = magnitudes[t][f];
            }
        }
    }

    masked
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    values[values.len() / 2]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI as PI_F32;

    fn generate_tone(frequency: f64, sample_rate: u32, duration_seconds: f64) -> Vec<f32> {
        let total = (sample_rate as f64 * duration_seconds) as usize;
        (0..total)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (2.0 * PI_F32 * frequency as f32 * t).sin()
            })
            .collect()
    }

    /// Broadband click train: short noise-like impulses, no sustained tone.
    fn generate_clicks(sample_rate: u32, duration_seconds: f64) -> Vec<f32> {
        let total = (sample_rate as f64 * duration_seconds) as usize;
        let mut samples = vec![0.0f32; total];
        let period = sample_rate as usize / 2; // one click every 500ms
        for start in (0..total).step_by(period) {
            for j in 0..64 {
                if start + j < total {
                    // alternating impulse, wideband
                    samples[start + j] = if j % 2 == 0 { 0.9 } else { -0.9 };
                }
            }
        }
        samples
    }

    fn total_energy(frames: &[Vec<f64>]) -> f64 {
        frames
            .iter()
            .flat_map(|f| f.iter())
            .map(|m| m * m)
            .sum()
    }

    #[test]
    fn test_too_short_input_rejected() {
        let samples = vec![0.0f32; 100];
        assert!(harmonic_spectrogram(&samples, 16_000).is_err());
    }

    #[test]
    fn test_sustained_tone_survives_masking() {
        let samples = generate_tone(440.0, 16_000, 3.0);
        let raw = stft_magnitudes(&samples);
        let masked = harmonic_mask(&raw);

        let retained = total_energy(&masked) / total_energy(&raw);
        assert!(
            retained > 0.5,
            "sustained tone should mostly survive the harmonic mask, retained {:.2}",
            retained
        );
    }

    #[test]
    fn test_tone_retains_more_than_clicks() {
        let tone = generate_tone(440.0, 16_000, 3.0);
        let clicks = generate_clicks(16_000, 3.0);

        let tone_raw = stft_magnitudes(&tone);
        let tone_masked = harmonic_mask(&tone_raw);
        let clicks_raw = stft_magnitudes(&clicks);
        let clicks_masked = harmonic_mask(&clicks_raw);

        let tone_retained = total_energy(&tone_masked) / total_energy(&tone_raw);
        let clicks_retained = total_energy(&clicks_masked) / total_energy(&clicks_raw);

        assert!(
            tone_retained > clicks_retained,
            "tonal content should survive masking better than transients ({:.2} vs {:.2})",
            tone_retained,
            clicks_retained
        );
    }

    #[test]
    fn test_frame_count_matches_hop() {
        let samples = generate_tone(440.0, 16_000, 2.0);
        let spec = harmonic_spectrogram(&samples, 16_000).unwrap();
        let expected = (samples.len() - FFT_SIZE) / HOP_SIZE + 1;
        assert_eq!(spec.frames.len(), expected);
        assert_eq!(spec.frames[0].len(), Spectrogram::num_bins());
    }
}
