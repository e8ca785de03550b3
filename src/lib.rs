//! HeartMuLa music generation as node-graph nodes.
//!
//! Exposes an external HeartMuLa generation pipeline as three nodes a
//! visual node-graph host can wire together:
//!
//! ```text
//! checkpoints ─▶ Loader ──pipe──▶ Generator ──audio──▶ Preview/Save ─▶ WAV on disk
//!                   ▲                 ▲
//!          PipelineFactory    lyrics, tags, presets,
//!          (injected)         sampling params, seed
//! ```
//!
//! The generation model itself is not part of this crate. It is reached
//! through the [`pipeline::PipelineFactory`] / [`pipeline::MusicPipeline`]
//! traits; [`pipeline::ProcessPipelineFactory`] drives heartlib's generation
//! script in a child process.
//!
//! ## Modules
//!
//! - [`nodes`]: Loader, Generator, Preview/Save and their host declarations
//! - [`pipeline`]: the injected pipeline seam and the subprocess backend
//! - [`audio`]: WAV I/O and the `(batch, channels, samples)` audio object
//! - [`tags`]: tag-string assembly and preset catalogs
//! - [`registry`]: host path registry (checkpoints, models root, output)
//! - [`config`]: node input types, option labels, defaults and bounds
//! - [`seed`]: request-scoped random context
//! - [`progress`]: step progress reporting

pub mod audio;
pub mod config;
pub mod nodes;
pub mod pipeline;
pub mod progress;
pub mod registry;
pub mod seed;
pub mod tags;

mod error;

pub use error::{Error, Result};
