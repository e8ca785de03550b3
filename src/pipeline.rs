//! External generation pipeline seam.
//!
//! The generation model lives outside this crate. Nodes reach it only
//! through two traits:
//!
//! - [`PipelineFactory`]: builds a pipeline from a checkpoint path
//!   ("from pretrained"), with per-subsystem device and dtype maps
//! - [`MusicPipeline`]: runs one generation and writes a WAV file to the
//!   requested save path, reporting each step through a callback
//!
//! A factory is injected into the Loader once; when none can be built, the
//! Loader fails with [`crate::Error::PipelineUnavailable`].

mod process;

pub use process::{DEFAULT_SCRIPT, ProcessPipeline, ProcessPipelineFactory, default_script_path};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use candle_core::DType;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::config::{DeviceSelection, Version};
use crate::seed::SeedContext;

/// Per-subsystem setting: the language model ("mula") and the audio codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubsystemMap<T> {
    pub mula: T,
    pub codec: T,
}

/// Arguments of the "from pretrained" factory.
#[derive(Debug, Clone, PartialEq)]
pub struct PretrainedOptions {
    /// Language-model checkpoint; auxiliary files are looked up next to it.
    pub model_path: PathBuf,
    pub device: SubsystemMap<DeviceSelection>,
    pub dtype: SubsystemMap<DType>,
    pub version: Version,
    pub lazy_load: bool,
    pub cpu_offload: bool,
    pub explicit_codec_path: Option<PathBuf>,
}

/// Conditioning payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineInputs {
    pub lyrics: String,
    pub tags: String,
}

/// Sampling parameters forwarded verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    pub max_audio_length_ms: u32,
    pub topk: u32,
    pub temperature: f32,
    pub cfg_scale: f32,
}

/// Per-step progress callback, called with `(step, total)`.
pub type StepCallback<'a> = &'a mut dyn FnMut(u64, u64);

/// One generation call.
pub struct PipelineCall<'a> {
    pub inputs: &'a PipelineInputs,
    pub params: SamplingParams,
    /// Where the pipeline must write its WAV output.
    pub save_path: &'a Path,
    pub seeds: SeedContext,
    pub callback: StepCallback<'a>,
}

/// A loaded generation pipeline.
pub trait MusicPipeline: Send + Sync {
    /// Generate audio and write it to `call.save_path`.
    fn generate(&self, call: PipelineCall<'_>) -> Result<()>;
}

/// Builds pipelines from checkpoints.
pub trait PipelineFactory: Send + Sync {
    fn from_pretrained(&self, options: &PretrainedOptions) -> Result<Arc<dyn MusicPipeline>>;
}

/// Opaque handle passed from the Loader to the Generator.
#[derive(Clone)]
pub struct PipelineHandle {
    inner: Arc<dyn MusicPipeline>,
}

impl PipelineHandle {
    pub fn new(inner: Arc<dyn MusicPipeline>) -> Self {
        Self { inner }
    }

    pub fn pipeline(&self) -> &dyn MusicPipeline {
        self.inner.as_ref()
    }
}

impl fmt::Debug for PipelineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineHandle").finish_non_exhaustive()
    }
}
