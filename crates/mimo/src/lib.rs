//! # Mimo
//!
//! Multi-target relation generation: one shared encoder, one decoder per
//! relation target, beam search over every target.
//!
//! Mimo turns an encoded source document into ranked value sequences for
//! each relation target (`<given_name>`, `<sport>`, ...):
//! - **Per-target beams**: independent beam search for every instance and target
//! - **Compaction**: finished instances drop out of the decoder batch
//! - **n-best output**: ranked hypotheses with cumulative log-probabilities
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mimo::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let model = MimoModel::new(Box::new(encoder), decoders, Device::Cpu);
//!     let generator = Generator::builder()
//!         .beam_size(5)
//!         .n_best(3)
//!         .build(model)?;
//!
//!     let results = generator.generate(&sources)?;
//!     for target in render(&results, &vocab) {
//!         println!("{}: {:?}", target.target, target.instances[0]);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// Re-export core crate
pub use mimo_core::*;

mod generator;

pub use generator::{render, Generator, GeneratorBuilder, RenderedTarget};

/// Commonly used types.
pub mod prelude {
    pub use crate::generator::{render, Generator, GeneratorBuilder, RenderedTarget};
    pub use mimo_core::prelude::*;
    pub use mimo_core::preprocess::{encode_instance, Instance};
    pub use mimo_core::vocab::VocabBuilder;

    // Re-export useful external types
    pub use anyhow;
    pub use candle_core::Device;
    pub use tracing;
}
