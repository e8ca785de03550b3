//! Preview/Save node: writes audio under the output tree and reports the
//! file to the host UI.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::audio::{AudioObject, SampleEncoding, write_wav};
use crate::config::DEFAULT_FILENAME_PREFIX;
use crate::registry::PathRegistry;
use crate::{Error, Result};

use super::declaration::{InputDecl, InputKind, NodeDefinition};

pub const CLASS_NAME: &str = "HeartMuLaPreview";

/// Largest random suffix appended to file names.
pub const MAX_SUFFIX: u32 = 100_000;

/// One saved file as the UI refers to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedAudio {
    pub filename: String,
    pub subfolder: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Absolute path on disk; not sent to the UI.
    #[serde(skip)]
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiPayload {
    pub audio: Vec<SavedAudio>,
}

/// Terminal result: a UI payload only, no graph outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewResult {
    pub ui: UiPayload,
}

/// Writes audio objects as WAV files under the host output directory.
pub struct Preview {
    registry: Arc<dyn PathRegistry>,
    encoding: SampleEncoding,
}

impl Preview {
    pub fn new(registry: Arc<dyn PathRegistry>) -> Self {
        Self {
            registry,
            encoding: SampleEncoding::default(),
        }
    }

    pub fn with_encoding(mut self, encoding: SampleEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Save the first batch element of `audio`.
    ///
    /// `filename_prefix` may contain `/`-separated subdirectories; the file
    /// becomes `<output>/<subdirs>/<name>_<n>.wav` with `n` drawn from
    /// `0..=100000`. Existing files with the same name are overwritten.
    /// Prefixes that would leave the output tree are rejected.
    pub fn save(
        &self,
        audio: &AudioObject,
        filename_prefix: Option<&str>,
    ) -> Result<PreviewResult> {
        let suffix = rand::rng().random_range(0..=MAX_SUFFIX);
        self.save_with_suffix(
            audio,
            filename_prefix.unwrap_or(DEFAULT_FILENAME_PREFIX),
            suffix,
        )
    }

    fn save_with_suffix(
        &self,
        audio: &AudioObject,
        filename_prefix: &str,
        suffix: u32,
    ) -> Result<PreviewResult> {
        let (subfolder, base) = split_prefix(filename_prefix);
        check_inside_output(filename_prefix, subfolder)?;
        let dir = self.registry.output_directory().join(subfolder);
        std::fs::create_dir_all(&dir)?;

        let filename = format!("{base}_{suffix}.wav");
        let path = dir.join(&filename);
        let frames = audio.to_frames()?;
        write_wav(&path, &frames, audio.sample_rate, self.encoding)?;
        tracing::info!(path = %path.display(), "saved audio");

        Ok(PreviewResult {
            ui: UiPayload {
                audio: vec![SavedAudio {
                    filename,
                    subfolder: subfolder.to_string(),
                    kind: "output".to_string(),
                    path,
                }],
            },
        })
    }
}

/// Split `a/b/name` into (`a/b`, `name`).
fn split_prefix(prefix: &str) -> (&str, &str) {
    prefix.rsplit_once('/').unwrap_or(("", prefix))
}

/// The subfolder must be a plain relative path. The base name always gets a
/// `_<n>.wav` suffix, so it cannot name a directory on its own.
fn check_inside_output(prefix: &str, subfolder: &str) -> Result<()> {
    let inside = Path::new(subfolder)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if inside {
        return Ok(());
    }
    tracing::warn!(prefix, "refusing filename prefix outside the output directory");
    Err(Error::InvalidInput(format!(
        "filename_prefix {prefix:?} leaves the output directory"
    )))
}

pub fn definition() -> NodeDefinition {
    NodeDefinition {
        class_name: CLASS_NAME,
        display_name: "HeartMuLa Preview/Save",
        category: super::CATEGORY,
        function: "save_audio",
        inputs: vec![
            InputDecl::required("audio", InputKind::Link(super::AUDIO_TYPE)),
            InputDecl::optional(
                "filename_prefix",
                InputKind::String {
                    default: DEFAULT_FILENAME_PREFIX.to_string(),
                    multiline: false,
                },
            ),
        ],
        return_types: vec![],
        return_names: vec![],
        output_node: true,
    }
}
