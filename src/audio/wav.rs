//! WAV file I/O in the sound-file layout.
//!
//! Reading yields a 1-D `(samples,)` tensor for mono files and a 2-D
//! `(samples, channels)` tensor otherwise. Writing accepts either shape.

use std::path::Path;

use candle_core::{DType, Device, Tensor};

use crate::{Error, Result};

/// Sample format used when writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleEncoding {
    /// 16-bit signed PCM, the usual sound-file default for WAV.
    #[default]
    Pcm16,
    /// 32-bit IEEE float.
    Float32,
}

/// Read a WAV file, return (frames, sample_rate).
///
/// Samples are f32 in [-1, 1].
pub fn read_wav(path: impl AsRef<Path>) -> Result<(Tensor, u32)> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels as usize;

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let max_val = (1u32 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    let frames = samples.len() / channels.max(1);
    let data = match channels {
        0 => return Err(Error::Audio("WAV header declares zero channels".into())),
        1 => Tensor::from_vec(samples, frames, &Device::Cpu)?,
        _ => Tensor::from_vec(samples, (frames, channels), &Device::Cpu)?,
    };
    Ok((data, spec.sample_rate))
}

/// Write `(samples,)` or `(samples, channels)` frames as a WAV file.
pub fn write_wav(
    path: impl AsRef<Path>,
    frames: &Tensor,
    sample_rate: u32,
    encoding: SampleEncoding,
) -> Result<()> {
    let channels = match frames.dims() {
        [_] => 1,
        [_, c] => *c,
        dims => {
            return Err(Error::Audio(format!(
                "expected (samples,) or (samples, channels), got {dims:?}"
            )));
        }
    };
    let channels = u16::try_from(channels)
        .map_err(|_| Error::Audio(format!("too many channels: {channels}")))?;
    let interleaved = frames
        .to_dtype(DType::F32)?
        .contiguous()?
        .flatten_all()?
        .to_vec1::<f32>()?;

    let spec = match encoding {
        SampleEncoding::Pcm16 => hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        },
        SampleEncoding::Float32 => hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        },
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    match encoding {
        SampleEncoding::Pcm16 => {
            for &s in &interleaved {
                writer.write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16)?;
            }
        }
        SampleEncoding::Float32 => {
            for &s in &interleaved {
                writer.write_sample(s)?;
            }
        }
    }
    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_stereo_float() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.wav");
        let original = vec![0.0f32, 0.5, -0.5, 1.0, -1.0, 0.25];
        let frames = Tensor::from_vec(original.clone(), (3, 2), &Device::Cpu).unwrap();
        write_wav(&path, &frames, 48000, SampleEncoding::Float32).unwrap();

        let (loaded, sr) = read_wav(&path).unwrap();
        assert_eq!(sr, 48000);
        assert_eq!(loaded.dims(), &[3, 2]);
        let loaded = loaded.flatten_all().unwrap().to_vec1::<f32>().unwrap();
        for (a, b) in loaded.iter().zip(original.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_mono_reads_as_one_dimensional() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        let frames = Tensor::from_vec(vec![0.1f32, -0.2, 0.3, -0.4], 4, &Device::Cpu).unwrap();
        write_wav(&path, &frames, 44100, SampleEncoding::Pcm16).unwrap();

        let (loaded, sr) = read_wav(&path).unwrap();
        assert_eq!(sr, 44100);
        assert_eq!(loaded.dims(), &[4]);
        let loaded = loaded.to_vec1::<f32>().unwrap();
        assert!((loaded[2] - 0.3).abs() < 1e-3, "got {}", loaded[2]);
    }

    #[test]
    fn test_pcm16_clips_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        let frames = Tensor::from_vec(vec![2.0f32, -2.0], 2, &Device::Cpu).unwrap();
        write_wav(&path, &frames, 8000, SampleEncoding::Pcm16).unwrap();

        let (loaded, _) = read_wav(&path).unwrap();
        let loaded = loaded.to_vec1::<f32>().unwrap();
        assert!((loaded[0] - 1.0).abs() < 1e-3);
        assert!((loaded[1] + 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_rejects_rank_three() {
        let dir = tempfile::tempdir().unwrap();
        let frames = Tensor::zeros((1, 2, 3), DType::F32, &Device::Cpu).unwrap();
        let err = write_wav(dir.path().join("x.wav"), &frames, 8000, SampleEncoding::Pcm16)
            .unwrap_err();
        assert!(matches!(err, Error::Audio(_)));
    }
}
