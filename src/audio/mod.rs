//! Audio analysis.
//!
//! Decoding, DSP primitives, per-frame features and vocal segment detection.

pub mod analyzer;
pub mod decode;
pub mod features;
pub mod segments;

pub use analyzer::{SignalAnalysis, SignalAnalyzer, SpectralAnalyzer};
pub use decode::{decode_file, DecodedAudio};
pub use features::{AudioFeatures, FeatureExtractor};
pub use segments::VocalSegmentDetector;
