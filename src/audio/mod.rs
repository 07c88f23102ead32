/// WAV decoding and conversion to whisper's input format
pub mod decode;

pub use decode::{load_pcm_16k_mono, DecodeError, TARGET_SAMPLE_RATE};
