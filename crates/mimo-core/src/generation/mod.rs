//! Multi-target generation.
//!
//! [`GenerationModel::translate_batch`] encodes the source, repeats it per
//! beam, and runs a [`BeamSearchController`](crate::search::BeamSearchController)
//! for each target decoder in turn.

mod config;
mod translate;

pub use config::GenerationConfig;
pub use translate::{DecodeResults, GenerationModel};
