//! The host audio object and layout conversions.

use candle_core::{DType, Tensor};

use crate::{Error, Result};

/// In-memory audio exchanged between nodes.
///
/// `waveform` is shaped `(batch, channels, samples)` with batch = 1.
#[derive(Debug, Clone)]
pub struct AudioObject {
    pub waveform: Tensor,
    pub sample_rate: u32,
}

impl AudioObject {
    /// Build from frames as returned by [`super::read_wav`].
    ///
    /// `(samples,)` becomes `(1, 1, samples)`; `(samples, channels)` becomes
    /// `(1, channels, samples)`.
    pub fn from_frames(frames: &Tensor, sample_rate: u32) -> Result<Self> {
        let per_channel = match frames.rank() {
            1 => frames.unsqueeze(0)?,
            2 => frames.t()?.contiguous()?,
            rank => {
                return Err(Error::Audio(format!(
                    "sound file data must be 1-D or 2-D, got rank {rank}"
                )));
            }
        };
        let waveform = per_channel.to_dtype(DType::F32)?.unsqueeze(0)?;
        Ok(Self {
            waveform,
            sample_rate,
        })
    }

    /// First batch element in `(samples, channels)` layout, ready for writing.
    pub fn to_frames(&self) -> Result<Tensor> {
        if self.waveform.rank() != 3 {
            return Err(Error::Audio(format!(
                "waveform must be (batch, channels, samples), got {:?}",
                self.waveform.dims()
            )));
        }
        Ok(self.waveform.get(0)?.t()?.contiguous()?)
    }

    pub fn channels(&self) -> usize {
        self.waveform.dims().get(1).copied().unwrap_or(0)
    }

    pub fn num_samples(&self) -> usize {
        self.waveform.dims().get(2).copied().unwrap_or(0)
    }

    pub fn duration_s(&self) -> f64 {
        self.num_samples() as f64 / self.sample_rate as f64
    }
}
