//! Loader node: checkpoint names in, pipeline handle out.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{
    CodecPrecision, DeviceSelection, LoaderInputs, MulaPrecision, Version,
};
use crate::pipeline::{PipelineFactory, PipelineHandle, PretrainedOptions, SubsystemMap};
use crate::registry::{CHECKPOINTS, PathRegistry};
use crate::{Error, Result};

use super::declaration::{InputDecl, InputKind, NodeDefinition};

pub const CLASS_NAME: &str = "HeartMuLaLoader";

/// Files whose presence marks a directory as a codec model.
const CODEC_MARKERS: [&str; 2] = ["model.safetensors", "config.json"];

/// Directories searched for a standalone codec model, in order.
pub fn codec_candidates(models_dir: &Path) -> Vec<PathBuf> {
    let global = models_dir.join("heartcodec");
    let nested = global.join("HeartCodec-oss");
    vec![
        global,
        nested,
        models_dir.join(CHECKPOINTS).join("HeartCodec-oss"),
    ]
}

/// First candidate directory that holds codec weights or a codec config.
pub fn probe_codec_dir(models_dir: &Path) -> Option<PathBuf> {
    codec_candidates(models_dir)
        .into_iter()
        .find(|dir| dir.is_dir() && CODEC_MARKERS.iter().any(|m| dir.join(m).exists()))
}

/// Resolved load: the factory arguments plus what the codec probe found.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadPlan {
    pub options: PretrainedOptions,
    pub codec_checkpoint: PathBuf,
    /// Standalone codec directory found under the models root, if any.
    ///
    /// Reported only; the selected codec checkpoint is what gets loaded.
    pub probed_codec_dir: Option<PathBuf>,
}

enum FactorySlot {
    Ready(Arc<dyn PipelineFactory>),
    Missing(String),
}

/// Builds pipeline handles from checkpoint names.
pub struct Loader {
    registry: Arc<dyn PathRegistry>,
    factory: FactorySlot,
}

impl Loader {
    pub fn new(registry: Arc<dyn PathRegistry>, factory: Arc<dyn PipelineFactory>) -> Self {
        Self {
            registry,
            factory: FactorySlot::Ready(factory),
        }
    }

    /// A loader whose pipeline implementation could not be located.
    ///
    /// Every [`Loader::load`] fails with [`Error::PipelineUnavailable`]
    /// carrying `reason`.
    pub fn unavailable(registry: Arc<dyn PathRegistry>, reason: impl Into<String>) -> Self {
        Self {
            registry,
            factory: FactorySlot::Missing(reason.into()),
        }
    }

    /// Wrap the outcome of locating a factory at startup.
    pub fn from_located<F>(registry: Arc<dyn PathRegistry>, located: Result<F>) -> Self
    where
        F: PipelineFactory + 'static,
    {
        match located {
            Ok(factory) => Self::new(registry, Arc::new(factory)),
            Err(error) => {
                tracing::warn!(%error, "pipeline implementation unavailable");
                Self::unavailable(registry, error.to_string())
            }
        }
    }

    /// Resolve checkpoint names and dtypes without touching the pipeline.
    pub fn plan(&self, inputs: &LoaderInputs) -> Result<LoadPlan> {
        let mula_path = self.checkpoint(&inputs.mula_model)?;
        let codec_path = self.checkpoint(&inputs.codec_model)?;

        let probed_codec_dir = probe_codec_dir(&self.registry.models_dir());
        match &probed_codec_dir {
            Some(dir) => {
                tracing::info!(path = %dir.display(), "found standalone HeartCodec directory")
            }
            None => tracing::debug!("no standalone HeartCodec directory under models root"),
        }

        let options = PretrainedOptions {
            model_path: mula_path,
            device: SubsystemMap {
                mula: inputs.mula_device,
                codec: inputs.codec_device,
            },
            dtype: SubsystemMap {
                mula: inputs.mula_dtype.dtype(),
                codec: inputs.codec_dtype.dtype(),
            },
            version: inputs.version,
            lazy_load: false,
            cpu_offload: inputs.cpu_offload,
            explicit_codec_path: Some(codec_path.clone()),
        };
        Ok(LoadPlan {
            options,
            codec_checkpoint: codec_path,
            probed_codec_dir,
        })
    }

    /// Build a pipeline handle.
    pub fn load(&self, inputs: &LoaderInputs) -> Result<PipelineHandle> {
        let factory = match &self.factory {
            FactorySlot::Ready(factory) => factory,
            FactorySlot::Missing(reason) => {
                return Err(Error::PipelineUnavailable(format!(
                    "heartlib not found. Please ensure heartlib is installed \
                     or in the correct path. ({reason})"
                )));
            }
        };
        let plan = self.plan(inputs)?;
        tracing::info!(path = %plan.options.model_path.display(), "loading HeartMuLa model");
        tracing::info!(path = %plan.codec_checkpoint.display(), "loading HeartCodec model");

        let pipeline = factory.from_pretrained(&plan.options)?;
        Ok(PipelineHandle::new(pipeline))
    }

    fn checkpoint(&self, name: &str) -> Result<PathBuf> {
        self.registry
            .full_path(CHECKPOINTS, name)
            .ok_or_else(|| Error::CheckpointNotFound {
                folder: CHECKPOINTS.to_string(),
                name: name.to_string(),
            })
    }
}

fn choice<T: ToString>(options: &[T], default: Option<T>) -> InputKind {
    InputKind::Choice {
        options: options.iter().map(ToString::to_string).collect(),
        default: default.map(|d| d.to_string()),
    }
}

pub fn definition(registry: &dyn PathRegistry) -> Result<NodeDefinition> {
    let checkpoints = registry.filename_list(CHECKPOINTS)?;
    Ok(NodeDefinition {
        class_name: CLASS_NAME,
        display_name: "HeartMuLa Loader",
        category: super::CATEGORY,
        function: "load_model",
        inputs: vec![
            InputDecl::required("mula_model", choice(&checkpoints, None)),
            InputDecl::required("codec_model", choice(&checkpoints, None)),
            InputDecl::required("version", choice(&Version::ALL, Some(Version::default()))),
            InputDecl::required(
                "mula_device",
                choice(&DeviceSelection::ALL, Some(DeviceSelection::default())),
            ),
            InputDecl::required(
                "codec_device",
                choice(&DeviceSelection::ALL, Some(DeviceSelection::default())),
            ),
            InputDecl::required(
                "mula_dtype",
                choice(&MulaPrecision::ALL, Some(MulaPrecision::default())),
            ),
            InputDecl::required(
                "codec_dtype",
                choice(&CodecPrecision::ALL, Some(CodecPrecision::default())),
            ),
            InputDecl::required("cpu_offload", InputKind::Boolean { default: true }),
        ],
        return_types: vec![super::PIPE_TYPE],
        return_names: vec!["pipe"],
        output_node: false,
    })
}
