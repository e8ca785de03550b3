//! Node input configuration.
//!
//! Option enums carry the exact labels the host shows in its drop-downs, and
//! the input structs carry the host-declared defaults.

use std::fmt;
use std::str::FromStr;

use candle_core::DType;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Model release to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Version {
    #[serde(rename = "3B-merged")]
    Merged3B,
    #[default]
    #[serde(rename = "3B-20260123")]
    Release20260123,
}

impl Version {
    pub const ALL: [Version; 2] = [Version::Merged3B, Version::Release20260123];

    pub fn label(self) -> &'static str {
        match self {
            Version::Merged3B => "3B-merged",
            Version::Release20260123 => "3B-20260123",
        }
    }
}

/// Where a subsystem runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceSelection {
    #[default]
    Cuda,
    Cpu,
}

impl DeviceSelection {
    pub const ALL: [DeviceSelection; 2] = [DeviceSelection::Cuda, DeviceSelection::Cpu];

    pub fn label(self) -> &'static str {
        match self {
            DeviceSelection::Cuda => "cuda",
            DeviceSelection::Cpu => "cpu",
        }
    }
}

/// Numeric precision of the language-model subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MulaPrecision {
    #[default]
    Bfloat16,
    Float16,
    Float32,
}

impl MulaPrecision {
    pub const ALL: [MulaPrecision; 3] = [
        MulaPrecision::Bfloat16,
        MulaPrecision::Float16,
        MulaPrecision::Float32,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MulaPrecision::Bfloat16 => "bfloat16",
            MulaPrecision::Float16 => "float16",
            MulaPrecision::Float32 => "float32",
        }
    }

    pub fn dtype(self) -> DType {
        match self {
            MulaPrecision::Bfloat16 => DType::BF16,
            MulaPrecision::Float16 => DType::F16,
            MulaPrecision::Float32 => DType::F32,
        }
    }
}

/// Numeric precision of the codec subsystem. bfloat16 is not offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecPrecision {
    #[default]
    Float32,
    Float16,
}

impl CodecPrecision {
    pub const ALL: [CodecPrecision; 2] = [CodecPrecision::Float32, CodecPrecision::Float16];

    pub fn label(self) -> &'static str {
        match self {
            CodecPrecision::Float32 => "float32",
            CodecPrecision::Float16 => "float16",
        }
    }

    pub fn dtype(self) -> DType {
        match self {
            CodecPrecision::Float32 => DType::F32,
            CodecPrecision::Float16 => DType::F16,
        }
    }
}

macro_rules! label_enum {
    ($ty:ty, $what:literal) => {
        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                <$ty>::ALL
                    .into_iter()
                    .find(|v| v.label() == s)
                    .ok_or_else(|| Error::InvalidInput(format!("unknown {} '{s}'", $what)))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

label_enum!(Version, "version");
label_enum!(DeviceSelection, "device");
label_enum!(MulaPrecision, "mula dtype");
label_enum!(CodecPrecision, "codec dtype");

/// Inputs of the Loader node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderInputs {
    /// Checkpoint filename of the language model.
    pub mula_model: String,
    /// Checkpoint filename of the audio codec.
    pub codec_model: String,
    #[serde(default)]
    pub version: Version,
    #[serde(default)]
    pub mula_device: DeviceSelection,
    #[serde(default)]
    pub codec_device: DeviceSelection,
    #[serde(default)]
    pub mula_dtype: MulaPrecision,
    #[serde(default)]
    pub codec_dtype: CodecPrecision,
    #[serde(default = "default_cpu_offload")]
    pub cpu_offload: bool,
}

fn default_cpu_offload() -> bool {
    true
}

/// Declared numeric bounds of the Generator inputs.
pub mod bounds {
    pub const MAX_AUDIO_LENGTH_MS: (u32, u32) = (1_000, 300_000);
    pub const MAX_AUDIO_LENGTH_STEP: u32 = 1_000;
    pub const TOPK: (u32, u32) = (1, 1_000);
    pub const TEMPERATURE: (f64, f64) = (0.1, 2.0);
    pub const CFG_SCALE: (f64, f64) = (0.0, 10.0);
    pub const FLOAT_STEP: f64 = 0.1;
}

/// Inputs of the Generator node, minus the pipeline handle.
///
/// Values are not re-checked by the Generator; the host enforces the
/// declared bounds (see [`crate::nodes::check_request`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationRequest {
    pub vocal_gender: String,
    pub style_preset: String,
    pub instrument_preset: String,
    pub lyrics: String,
    pub tags: String,
    pub max_audio_length_ms: u32,
    pub topk: u32,
    pub temperature: f32,
    pub cfg_scale: f32,
    pub seed: u64,
}

impl Default for GenerationRequest {
    fn default() -> Self {
        Self {
            vocal_gender: "Female".to_string(),
            style_preset: "None".to_string(),
            instrument_preset: "None".to_string(),
            lyrics: "Enter lyrics here".to_string(),
            tags: "emotional, high quality".to_string(),
            max_audio_length_ms: 10_000,
            topk: 50,
            temperature: 1.0,
            cfg_scale: 1.5,
            seed: 0,
        }
    }
}

impl GenerationRequest {
    /// Estimated number of pipeline steps, one per 80 ms frame.
    pub fn estimated_steps(&self) -> u64 {
        u64::from(self.max_audio_length_ms / 80)
    }
}

/// Default `filename_prefix` of the Preview node.
pub const DEFAULT_FILENAME_PREFIX: &str = "HeartMuLa/audio";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_parse_and_print() {
        assert_eq!("3B-merged".parse::<Version>().unwrap(), Version::Merged3B);
        assert_eq!(Version::default().to_string(), "3B-20260123");
        assert_eq!("cpu".parse::<DeviceSelection>().unwrap(), DeviceSelection::Cpu);
        assert_eq!(DeviceSelection::default(), DeviceSelection::Cuda);
        assert!("bfloat16".parse::<CodecPrecision>().is_err());
        assert!("tpu".parse::<DeviceSelection>().is_err());
    }

    #[test]
    fn precision_maps_to_dtype() {
        assert_eq!(MulaPrecision::Bfloat16.dtype(), DType::BF16);
        assert_eq!(MulaPrecision::Float16.dtype(), DType::F16);
        assert_eq!(MulaPrecision::Float32.dtype(), DType::F32);
        assert_eq!(CodecPrecision::Float32.dtype(), DType::F32);
        assert_eq!(CodecPrecision::Float16.dtype(), DType::F16);
    }

    #[test]
    fn device_labels_round_trip() {
        for device in DeviceSelection::ALL {
            assert_eq!(device.label().parse::<DeviceSelection>().unwrap(), device);
        }
        assert_eq!(DeviceSelection::default(), DeviceSelection::Cuda);
        assert!("cuda:1".parse::<DeviceSelection>().is_err());
    }

    #[test]
    fn loader_inputs_take_host_defaults() {
        let inputs: LoaderInputs =
            serde_json::from_str(r#"{"mula_model":"a.safetensors","codec_model":"b.safetensors"}"#)
                .unwrap();
        assert_eq!(inputs.version, Version::Release20260123);
        assert_eq!(inputs.mula_dtype, MulaPrecision::Bfloat16);
        assert_eq!(inputs.codec_dtype, CodecPrecision::Float32);
        assert!(inputs.cpu_offload);
    }

    #[test]
    fn step_estimate_uses_80ms_frames() {
        let request = GenerationRequest {
            max_audio_length_ms: 10_000,
            ..Default::default()
        };
        assert_eq!(request.estimated_steps(), 125);
        let request = GenerationRequest {
            max_audio_length_ms: 1_050,
            ..Default::default()
        };
        assert_eq!(request.estimated_steps(), 13);
    }
}
