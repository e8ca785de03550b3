//! Audio I/O and the host audio object.
//!
//! The sound-file codec works in (samples, channels) layout; the host
//! exchanges audio as a (batch, channels, samples) waveform.

mod waveform;
mod wav;

pub use waveform::AudioObject;
pub use wav::{SampleEncoding, read_wav, write_wav};
