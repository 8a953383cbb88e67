// Waveform loading for DSP analysis.
//
// The pipeline only ever reads the normalized file produced by the
// encoder (16 kHz mono WAV), but decoding goes through symphonia's probe
// anyway — it costs nothing and keeps this module honest about malformed
// encoder output.

use std::path::Path;
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::conv::FromSample;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// A fully decoded mono waveform, input to all analysis stages.
#[derive(Debug, Clone)]
pub struct MonoAudio {
    /// Mono samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate of the decoded stream
    pub sample_rate: u32,
}

/// Frame count and rate read from a waveform file's container header,
/// without decoding any audio packets.
#[derive(Debug, Clone, Copy)]
pub struct WavInfo {
    pub n_frames: u64,
    pub sample_rate: u32,
}

impl WavInfo {
    /// Duration in seconds, exactly frames / rate.
    pub fn duration_sec(&self) -> f64 {
        self.n_frames as f64 / self.sample_rate as f64
    }
}

/// Read frame count and sample rate from the container header only.
pub fn probe_wav_info(path: &Path) -> Result<WavInfo, String> {
    let format = open_format(path)?;
    let track = format
        .default_track()
        .ok_or_else(|| "No audio tracks found".to_string())?;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| "Waveform header is missing a sample rate".to_string())?;
    let n_frames = track
        .codec_params
        .n_frames
        .ok_or_else(|| "Waveform header is missing a frame count".to_string())?;

    Ok(WavInfo {
        n_frames,
        sample_rate,
    })
}

/// Decode an entire audio file to mono f32 samples.
///
/// Multichannel input is averaged down to one channel. Corrupted packets
/// are skipped rather than failing the whole decode.
pub fn decode_to_mono(path: &Path) -> Result<MonoAudio, String> {
    let mut format = open_format(path)?;

    let track = format
        .default_track()
        .ok_or_else(|| "No audio tracks found".to_string())?;
    let track_id = track.id;
    let sample_rate = track.codec_params.sample_rate.unwrap_or(16_000);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| format!("Failed to create decoder: {}", e))?;

    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(format!("Error reading packet: {}", e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => append_mono(&decoded, &mut samples),
            Err(symphonia::core::errors::Error::DecodeError(msg)) => {
                tracing::debug!("skipping corrupted packet: {}", msg);
                continue;
            }
            Err(e) => return Err(format!("Decode error: {}", e)),
        }
    }

    Ok(MonoAudio {
        samples,
        sample_rate,
    })
}

fn open_format(path: &Path) -> Result<Box<dyn FormatReader>, String> {
    let file =
        std::fs::File::open(path).map_err(|e| format!("Failed to open audio file: {}", e))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension() {
        hint.with_extension(&ext.to_string_lossy());
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| format!("Failed to probe audio format: {}", e))?;

    Ok(probed.format)
}

/// Mix one decoded buffer down to mono f32 and append it.
fn append_mono(decoded: &AudioBufferRef, out: &mut Vec<f32>) {
    match decoded {
        AudioBufferRef::F32(buf) => mix_down(buf, out),
        AudioBufferRef::F64(buf) => mix_down(buf, out),
        AudioBufferRef::U8(buf) => mix_down(buf, out),
        AudioBufferRef::U16(buf) => mix_down(buf, out),
        AudioBufferRef::U24(buf) => mix_down(buf, out),
        AudioBufferRef::U32(buf) => mix_down(buf, out),
        AudioBufferRef::S8(buf) => mix_down(buf, out),
        AudioBufferRef::S16(buf) => mix_down(buf, out),
        AudioBufferRef::S24(buf) => mix_down(buf, out),
        AudioBufferRef::S32(buf) => mix_down(buf, out),
    }
}

fn mix_down<S>(buf: &symphonia::core::audio::AudioBuffer<S>, out: &mut Vec<f32>)
where
    S: symphonia::core::sample::Sample,
    f32: FromSample<S>,
{
    let channels = buf.spec().channels.count();
    let frames = buf.frames();

    if channels == 0 || frames == 0 {
        return;
    }

    if channels == 1 {
        out.extend(buf.chan(0).iter().map(|&s| f32::from_sample(s)));
        return;
    }

    let scale = 1.0 / channels as f32;
    let base = out.len();
    out.resize(base + frames, 0.0);
    for ch in 0..channels {
        for (i, &sample) in buf.chan(ch).iter().enumerate() {
            out[base + i] += f32::from_sample(sample) * scale;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wav_info_duration() {
        let info = WavInfo {
            n_frames: 80_000,
            sample_rate: 16_000,
        };
        assert_eq!(info.duration_sec(), 5.0);
    }

    #[test]
    fn test_wav_info_duration_fractional() {
        let info = WavInfo {
            n_frames: 24_000,
            sample_rate: 16_000,
        };
        assert_eq!(info.duration_sec(), 1.5);
    }

    #[test]
    fn test_probe_missing_file() {
        let err = probe_wav_info(Path::new("/nonexistent/input.wav")).unwrap_err();
        assert!(err.contains("Failed to open"), "got: {}", err);
    }

    #[test]
    fn test_decode_missing_file() {
        assert!(decode_to_mono(Path::new("/nonexistent/input.wav")).is_err());
    }

    /// Minimal 16-bit PCM mono WAV writer for fixtures.
    fn write_wav(path: &Path, samples: &[i16], sample_rate: u32) {
        let data_len = (samples.len() * 2) as u32;
        let mut bytes = Vec::with_capacity(44 + samples.len() * 2);
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
        bytes.extend_from_slice(&1u16.to_le_bytes()); // mono
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes()); // block align
        bytes.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        for s in samples {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_probe_reads_header_frames_and_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.wav");
        // half a second at 16kHz
        write_wav(&path, &vec![0i16; 8000], 16_000);

        let info = probe_wav_info(&path).unwrap();
        assert_eq!(info.sample_rate, 16_000);
        assert_eq!(info.n_frames, 8000);
        assert_eq!(info.duration_sec(), 0.5);
    }

    #[test]
    fn test_decode_wav_to_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.wav");
        let samples: Vec<i16> = (0..4000)
            .map(|i| ((i as f32 * 0.1).sin() * 10_000.0) as i16)
            .collect();
        write_wav(&path, &samples, 16_000);

        let audio = decode_to_mono(&path).unwrap();
        assert_eq!(audio.sample_rate, 16_000);
        assert_eq!(audio.samples.len(), 4000);
        // 16-bit PCM scales into [-1, 1]
        assert!(audio.samples.iter().all(|s| s.abs() <= 1.0));
        assert!(audio.samples.iter().any(|s| s.abs() > 0.1));
    }
}
