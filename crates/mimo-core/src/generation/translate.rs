//! Multi-target decoding driver.

use super::GenerationConfig;
use crate::error::{MimoError, Result};
use crate::model::MimoModel;
use crate::search::{repeat_for_beam, BeamSearchController, SearchOutcome};
use candle_core::{DType, Tensor};
use tracing::{debug, info};

/// Decode results keyed by target name, in target order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodeResults {
    targets: Vec<(String, SearchOutcome)>,
}

impl DecodeResults {
    /// Outcome for one target.
    pub fn get(&self, target: &str) -> Option<&SearchOutcome> {
        self.targets
            .iter()
            .find(|(name, _)| name == target)
            .map(|(_, outcome)| outcome)
    }

    /// Iterate `(target, outcome)` in target order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SearchOutcome)> {
        self.targets.iter().map(|(n, o)| (n.as_str(), o))
    }

    /// Number of targets decoded.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Check if nothing was decoded.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl IntoIterator for DecodeResults {
    type Item = (String, SearchOutcome);
    type IntoIter = std::vec::IntoIter<(String, SearchOutcome)>;

    fn into_iter(self) -> Self::IntoIter {
        self.targets.into_iter()
    }
}

/// Runs beam search for every target of a [`MimoModel`].
#[derive(Debug)]
pub struct GenerationModel {
    model: MimoModel,
    config: GenerationConfig,
}

impl GenerationModel {
    /// Wrap a model.
    pub fn new(model: MimoModel, config: GenerationConfig) -> Result<Self> {
        config.validate()?;
        if model.decoders().is_empty() {
            return Err(MimoError::InvalidConfig("model has no target decoders".to_string()));
        }
        Ok(Self { model, config })
    }

    /// Underlying model.
    pub fn model(&self) -> &MimoModel {
        &self.model
    }

    /// Generation config.
    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Decode a batch for every target.
    ///
    /// # Arguments
    ///
    /// * `src_seq` - Source ids `[batch, src_len]`, any integer dtype (read as U32)
    /// * `src_pos` - Source positions `[batch, src_len]`, any integer dtype (read as U32)
    /// * `batch_inits` - Forced first token per instance; defaults to each
    ///   source's first token
    pub fn translate_batch(
        &self,
        src_seq: &Tensor,
        src_pos: &Tensor,
        batch_inits: Option<&[u32]>,
    ) -> Result<DecodeResults> {
        let src_seq = &src_seq.to_dtype(DType::U32)?;
        let src_pos = &src_pos.to_dtype(DType::U32)?;
        let (batch_size, _) = src_seq.dims2()?;
        if src_pos.dims() != src_seq.dims() {
            return Err(MimoError::ShapeMismatch(format!(
                "source positions {:?} do not match source ids {:?}",
                src_pos.dims(),
                src_seq.dims()
            )));
        }

        let inits = match batch_inits {
            Some(inits) if inits.len() != batch_size => {
                return Err(MimoError::InitMismatch {
                    expected: batch_size,
                    got: inits.len(),
                })
            }
            Some(inits) => inits.to_vec(),
            None => src_seq.narrow(1, 0, 1)?.flatten_all()?.to_vec1::<u32>()?,
        };

        let beam_size = self.config.beam_size;
        let mut results = DecodeResults::default();
        for (name, decoder) in self.model.decoders().iter() {
            let enc_output = self.model.encoder().forward(src_seq, src_pos)?;
            let src_rep = repeat_for_beam(src_seq, beam_size)?;
            let enc_rep = repeat_for_beam(&enc_output, beam_size)?;
            debug!(
                relation = name,
                batch_size,
                rows = batch_size * beam_size,
                "decoding target"
            );

            let controller = BeamSearchController::new(
                decoder,
                beam_size,
                self.config.n_best,
                self.config.special_tokens,
            );
            let outcome = controller.run(&src_rep, &enc_rep, &inits)?;

            info!(
                relation = name,
                steps = outcome.steps,
                unfinished = outcome.unfinished,
                "decoded target"
            );
            results.targets.push((name.to_string(), outcome));
        }

        Ok(results)
    }
}
