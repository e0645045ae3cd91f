//! # Mimo Core
//!
//! Multi-target beam search decoding for sequence-to-sequence models with
//! one shared encoder and one decoder per relation target.
//!
//! This crate provides:
//! - **Beam search** with per-instance beams, backpointer hypothesis
//!   reconstruction and deterministic tie-breaking
//! - **Batch compaction** so finished instances stop costing decoder compute
//! - **Multi-target driver** producing ranked hypotheses for every target
//! - **Vocabulary and relation targets** shared with preprocessing

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod generation;
pub mod model;
pub mod preprocess;
pub mod search;
pub mod vocab;

pub use error::{MimoError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{MimoError, Result};
    pub use crate::generation::{DecodeResults, GenerationConfig, GenerationModel};
    pub use crate::model::{Decoder, Encoder, MimoModel, Normalizer, TargetDecoder, TargetDecoders};
    pub use crate::preprocess::{TargetSpec, TargetTable};
    pub use crate::search::{Beam, BeamSearchController, Hypothesis, SearchOutcome};
    pub use crate::vocab::{SpecialTokens, Vocabulary};
}
