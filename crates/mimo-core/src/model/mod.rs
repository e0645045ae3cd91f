//! Model collaborators.
//!
//! The decoding core never builds networks itself. It consumes:
//! - an [`Encoder`] shared by all targets
//! - one [`Decoder`] per relation target, wrapped with its
//!   [`Normalizer`] in a [`TargetDecoder`]

mod decoder;
mod encoder;
mod mimo;

pub use decoder::{Decoder, Normalizer, TargetDecoder, TargetDecoders};
pub use encoder::{batch_tensors, positions_for, Encoder};
pub use mimo::MimoModel;
