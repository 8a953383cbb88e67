// Coarse chord labeling over beat-aligned chroma averages.
//
// This is a threshold heuristic, not a trained chord recognizer: within
// each beat span the chroma vector is averaged, every pitch class at or
// above half the maximum strength is "selected", the lowest-index
// selection becomes the root, and the chord is minor exactly when another
// selection sits three semitones above the root. Callers must treat the
// random fallback (fallback_chords) as fabricated filler, not as
// recognition output.

use rand::seq::SliceRandom;

use crate::audio::chroma::Chromagram;
use crate::model::{ChordEvent, Segment};

/// Palette used when estimation yields nothing but lyrics exist. Six
/// common chords; draws are uniform and carry no musical meaning.
pub const FALLBACK_PALETTE: [&str; 6] = [
    "C:maj", "G:maj", "D:min", "A:min", "F:maj", "E:min",
];

/// Sharp-spelled pitch class names, index 0 = C.
const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Pitch classes at or above this fraction of the span maximum count as
/// sounding.
const SELECTION_THRESHOLD: f64 = 0.5;

/// Label chords for each consecutive pair of beat timestamps.
pub fn estimate_chords(chroma: &Chromagram, beat_times: &[f64]) -> Vec<ChordEvent> {
    let mut events = Vec::new();

    for pair in beat_times.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        let start_frame = chroma.time_to_frame(start);
        let end_frame = chroma.time_to_frame(end);

        // Beats closer together than one frame yield nothing to average
        if start_frame >= end_frame {
            continue;
        }

        if let Some(mean) = chroma.average_span(start_frame, end_frame) {
            events.push(ChordEvent {
                start,
                end,
                label: label_from_chroma(&mean),
            });
        }
    }

    events
}

/// Derive a "root:quality" label from one averaged chroma vector.
pub fn label_from_chroma(mean: &[f64; 12]) -> String {
    let max = mean.iter().cloned().fold(f64::MIN, f64::max);

    let selected: Vec<usize> = (0..12)
        .filter(|&pc| mean[pc] >= SELECTION_THRESHOLD * max)
        .collect();

    // Threshold is relative to the max, so the max itself always passes;
    // selected is never empty.
    let root = selected[0];
    let minor = selected
        .iter()
        .any(|&pc| pc != root && (pc + 12 - root) % 12 == 3);

    chord_label(root, minor)
}

/// Map a root pitch class + quality to the emitted label. Natural notes
/// go through the fixed table; accidentals use the generic
/// "<root>:maj"/"<root>:min" form.
fn chord_label(root: usize, minor: bool) -> String {
    let name = NOTE_NAMES[root];
    let mapped = match (name, minor) {
        ("C", false) => Some("C:maj"),
        ("C", true) => Some("C:min"),
        ("D", false) => Some("D:maj"),
        ("D", true) => Some("D:min"),
        ("E", false) => Some("E:maj"),
        ("E", true) => Some("E:min"),
        ("F", false) => Some("F:maj"),
        ("F", true) => Some("F:min"),
        ("G", false) => Some("G:maj"),
        ("G", true) => Some("G:min"),
        ("A", false) => Some("A:maj"),
        ("A", true) => Some("A:min"),
        ("B", false) => Some("B:maj"),
        ("B", true) => Some("B:min"),
        _ => None,
    };

    match mapped {
        Some(label) => label.to_string(),
        None => format!("{}:{}", name, if minor { "min" } else { "maj" }),
    }
}

/// Fabricate one chord per lyric segment from the fixed palette, reusing
/// the lyric's boundaries. Exists purely so the chords field is not empty;
/// has no musical validity.
pub fn fallback_chords(lyrics: &[Segment]) -> Vec<ChordEvent> {
    let mut rng = rand::thread_rng();

    lyrics
        .iter()
        .map(|segment| ChordEvent {
            start: segment.start,
            end: segment.end,
            label: FALLBACK_PALETTE
                .choose(&mut rng)
                .expect("palette is non-empty")
                .to_string(),
        })
        .collect()
}
