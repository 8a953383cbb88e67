// DSP analysis modules: decoding, harmonic masking, chroma features,
// beat tracking, and chord labeling.

pub mod beats;
pub mod chords;
pub mod chroma;
pub mod decoder;
pub mod harmonic;
