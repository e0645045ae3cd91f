//! Beam search decoding.
//!
//! | Component | Purpose |
//! |-----------|---------|
//! | [`Beam`] | Slots, scores and backpointers for one instance |
//! | [`BeamSearchController`] | Steps all beams of a batch against one target decoder |
//! | [`ActiveMap`] | Original batch position to compacted row group |
//! | [`repeat_for_beam`] / [`select_active_rows`] | Replicate and compact working tensors |
//!
//! # Example
//!
//! ```ignore
//! let src = repeat_for_beam(&src_seq, beam_size)?;
//! let enc = repeat_for_beam(&encoder.forward(&src_seq, &src_pos)?, beam_size)?;
//!
//! let controller = BeamSearchController::new(&target, beam_size, n_best, specials);
//! let outcome = controller.run(&src, &enc, &inits)?;
//!
//! for hyps in &outcome.hypotheses {
//!     println!("{:?}", hyps.first());
//! }
//! ```

mod beam;
mod compact;
mod controller;

#[cfg(test)]
pub(crate) mod testing;

pub use beam::Beam;
pub use compact::{repeat_for_beam, select_active_rows, ActiveMap};
pub use controller::{BeamSearchController, Hypothesis, SearchOutcome};
