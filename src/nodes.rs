//! The three HeartMuLa nodes.
//!
//! ```text
//! Loader ──HEARTMULA_PIPE──▶ Generator ──AUDIO──▶ Preview/Save ──▶ UI
//! ```
//!
//! - [`loader`]: resolves checkpoints and builds a [`PipelineHandle`]
//! - [`generator`]: builds the tag string, runs the pipeline, reads back audio
//! - [`preview`]: writes the audio under the output tree, reports the file
//! - [`declaration`]: the typed input/output declarations the host renders
//!
//! [`PipelineHandle`]: crate::pipeline::PipelineHandle

pub mod declaration;
pub mod generator;
pub mod loader;
pub mod preview;

pub use declaration::{InputDecl, InputKind, NodeDefinition};
pub use generator::{Generator, check_request};
pub use loader::{LoadPlan, Loader};
pub use preview::{Preview, PreviewResult, SavedAudio};

use crate::registry::PathRegistry;

/// Category every node is listed under.
pub const CATEGORY: &str = "HeartMuLa";

/// Host type name of the pipeline handle.
pub const PIPE_TYPE: &str = "HEARTMULA_PIPE";

/// Host type name of the audio object.
pub const AUDIO_TYPE: &str = "AUDIO";

/// Class name → display name, in registration order.
pub const NODE_DISPLAY_NAMES: [(&str, &str); 3] = [
    (loader::CLASS_NAME, "HeartMuLa Loader"),
    (generator::CLASS_NAME, "HeartMuLa Generator"),
    (preview::CLASS_NAME, "HeartMuLa Preview/Save"),
];

/// Display name registered for `class_name`.
pub fn display_name(class_name: &str) -> Option<&'static str> {
    NODE_DISPLAY_NAMES
        .iter()
        .find(|(class, _)| *class == class_name)
        .map(|(_, display)| *display)
}

/// Declarations of all nodes, with checkpoint choices taken from `registry`.
pub fn node_definitions(registry: &dyn PathRegistry) -> crate::Result<Vec<NodeDefinition>> {
    Ok(vec![
        loader::definition(registry)?,
        generator::definition(),
        preview::definition(),
    ])
}
