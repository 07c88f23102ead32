/// Whisper inference engine
pub mod engine;
/// Transcript rendering
pub mod format;
/// Single-flight model initialization
pub mod lifecycle;
/// Timed transcript segments
pub mod segment;
/// ggml weight download
pub mod weights;

pub use engine::{DecodeOptions, Transcriber, TranscriptionEngine, TranscriptionError};
pub use format::{format_transcript, TranscriptMode};
pub use lifecycle::{ModelCell, ModelInitError};
pub use segment::Segment;
