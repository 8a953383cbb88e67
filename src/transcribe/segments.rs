// Normalizes the transcription service's response shapes.
//
// The hosted model does not guarantee where (or whether) it puts segment
// timestamps, so extraction is an ordered chain of strategies — first one
// that produces a candidate list wins:
//   1. a top-level "segments" array
//   2. a "segments" array nested one level down inside an object field
//   3. the "text" field parses as JSON and contains a "segments" array
// A candidate segment survives only if it carries all of start/end/text;
// surviving text is whitespace-trimmed. When nothing survives but a text
// field exists, the whole transcript becomes a single zero-duration
// segment — that keeps the lyrics list non-empty whenever the service said
// anything at all.

use serde_json::Value;

use crate::model::Segment;

/// Extract lyric segments from a transcription response of unknown shape.
pub fn extract_segments(raw: &Value) -> Vec<Segment> {
    let candidates = direct_segments(raw)
        .or_else(|| nested_segments(raw))
        .or_else(|| segments_from_text_json(raw));

    let mut lyrics: Vec<Segment> = candidates
        .map(|list| list.iter().filter_map(parse_segment).collect())
        .unwrap_or_default();

    // No usable segments anywhere — fall back to one span covering the
    // whole transcript with degenerate timestamps.
    if lyrics.is_empty() {
        if let Some(text) = raw.get("text").and_then(Value::as_str) {
            lyrics.push(Segment {
                start: 0.0,
                end: 0.0,
                text: text.trim().to_string(),
            });
        }
    }

    lyrics
}

/// Strategy 1: `{"segments": [...]}`.
fn direct_segments(raw: &Value) -> Option<Vec<Value>> {
    raw.get("segments").and_then(Value::as_array).cloned()
}

/// Strategy 2: `{"anything": {"segments": [...]}}` — some response shapes
/// bury the list one level down in a wrapper object.
fn nested_segments(raw: &Value) -> Option<Vec<Value>> {
    let obj = raw.as_object()?;
    obj.values()
        .find_map(|v| v.get("segments").and_then(Value::as_array).cloned())
}

/// Strategy 3: the text field itself is a JSON document with segments.
fn segments_from_text_json(raw: &Value) -> Option<Vec<Value>> {
    let text = raw.get("text")?.as_str()?;
    let parsed: Value = serde_json::from_str(text).ok()?;
    parsed
        .get("segments")
        .and_then(Value::as_array)
        .cloned()
}

/// A candidate is kept only when start, end, and text are all present and
/// well-typed. Text is trimmed.
fn parse_segment(value: &Value) -> Option<Segment> {
    let start = value.get("start")?.as_f64()?;
    let end = value.get("end")?.as_f64()?;
    let text = value.get("text")?.as_str()?;

    Some(Segment {
        start,
        end,
        text: text.trim().to_string(),
    })
}
