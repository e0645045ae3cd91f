//! Per-target decoders.
//!
//! Each relation target owns a [`TargetDecoder`]: the decoder itself plus
//! the normalizer that turns its vocabulary logits into log-probabilities.
//! Targets are kept in insertion order by [`TargetDecoders`].

use crate::error::{MimoError, Result};
use candle_core::{Tensor, D};

/// One target's decoder.
pub trait Decoder: Send + Sync {
    /// Run the decoder over partial target sequences.
    ///
    /// # Arguments
    ///
    /// * `tgt_seq` - Partial target ids `[rows, t]` (U32)
    /// * `tgt_pos` - Positions `1..=t` for every row `[rows, t]` (U32)
    /// * `src_seq` - Source ids `[rows, src_len]` (U32)
    /// * `enc_output` - Encoder output `[rows, src_len, d_model]`
    ///
    /// # Returns
    ///
    /// Hidden states `[rows, t, d_model]`.
    fn forward(
        &self,
        tgt_seq: &Tensor,
        tgt_pos: &Tensor,
        src_seq: &Tensor,
        enc_output: &Tensor,
    ) -> Result<Tensor>;

    /// Project hidden states `[rows, d_model]` to vocabulary logits `[rows, vocab]`.
    fn project(&self, hidden: &Tensor) -> Result<Tensor>;

    /// Maximum number of decode steps.
    fn max_seq_len(&self) -> usize;
}

/// Turns vocabulary logits into log-probabilities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Normalizer {
    /// Log-softmax over the vocabulary dimension.
    #[default]
    LogSoftmax,
}

impl Normalizer {
    /// Apply to `[rows, vocab]` logits.
    pub fn apply(&self, logits: &Tensor) -> Result<Tensor> {
        match self {
            Normalizer::LogSoftmax => Ok(candle_nn::ops::log_softmax(logits, D::Minus1)?),
        }
    }
}

/// A decoder paired with its log-probability normalizer.
pub struct TargetDecoder {
    decoder: Box<dyn Decoder>,
    normalizer: Normalizer,
}

impl TargetDecoder {
    /// Wrap a decoder with log-softmax normalization.
    pub fn new(decoder: Box<dyn Decoder>) -> Self {
        Self {
            decoder,
            normalizer: Normalizer::LogSoftmax,
        }
    }

    /// Underlying decoder.
    pub fn decoder(&self) -> &dyn Decoder {
        self.decoder.as_ref()
    }

    /// Normalizer.
    pub fn normalizer(&self) -> Normalizer {
        self.normalizer
    }

    /// Maximum number of decode steps.
    pub fn max_seq_len(&self) -> usize {
        self.decoder.max_seq_len()
    }

    /// Log-probabilities of the next token, `[rows, vocab]`.
    ///
    /// Runs the decoder, keeps the last time step, projects it to the
    /// vocabulary and normalizes.
    pub fn next_token_log_probs(
        &self,
        tgt_seq: &Tensor,
        tgt_pos: &Tensor,
        src_seq: &Tensor,
        enc_output: &Tensor,
    ) -> Result<Tensor> {
        let hidden = self.decoder.forward(tgt_seq, tgt_pos, src_seq, enc_output)?;
        let (rows, len, _) = hidden.dims3()?;
        if len == 0 || rows != tgt_seq.dims()[0] {
            return Err(MimoError::ShapeMismatch(format!(
                "decoder returned {:?} for {} target rows",
                hidden.dims(),
                tgt_seq.dims()[0]
            )));
        }

        let last = hidden.narrow(1, len - 1, 1)?.squeeze(1)?;
        let logits = self.decoder.project(&last)?;
        self.normalizer.apply(&logits)
    }
}

impl std::fmt::Debug for TargetDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetDecoder")
            .field("max_seq_len", &self.max_seq_len())
            .field("normalizer", &self.normalizer)
            .finish()
    }
}

/// Target decoders keyed by target name, in insertion order.
#[derive(Debug, Default)]
pub struct TargetDecoders {
    entries: Vec<(String, TargetDecoder)>,
}

impl TargetDecoders {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a decoder, replacing any previous one with the same name.
    pub fn insert(&mut self, name: impl Into<String>, decoder: TargetDecoder) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = decoder,
            None => self.entries.push((name, decoder)),
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, decoder: TargetDecoder) -> Self {
        self.insert(name, decoder);
        self
    }

    /// Look up a target.
    pub fn get(&self, name: &str) -> Result<&TargetDecoder> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| d)
            .ok_or_else(|| MimoError::UnknownTarget(name.to_string()))
    }

    /// Target names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Iterate `(name, decoder)` in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TargetDecoder)> {
        self.entries.iter().map(|(n, d)| (n.as_str(), d))
    }

    /// Number of targets.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no targets are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::testing::ScriptedDecoder;
    use candle_core::Device;

    #[test]
    fn log_softmax_rows_sum_to_one() {
        let logits = Tensor::new(&[[1.0f32, 2.0, 3.0], [0.0, 0.0, 0.0]], &Device::Cpu).unwrap();
        let log_probs = Normalizer::LogSoftmax.apply(&logits).unwrap();

        for row in log_probs.exp().unwrap().to_vec2::<f32>().unwrap() {
            let total: f32 = row.iter().sum();
            assert!((total - 1.0).abs() < 1e-5, "row sums to {}", total);
        }
    }

    #[test]
    fn next_token_log_probs_normalize_last_step() {
        let target = TargetDecoder::new(Box::new(ScriptedDecoder::new(6, 3)));
        assert_eq!(target.normalizer(), Normalizer::LogSoftmax);

        let device = Device::Cpu;
        let tgt_seq = Tensor::new(&[[0u32, 4], [0, 5]], &device).unwrap();
        let tgt_pos = Tensor::new(&[[1u32, 2], [1, 2]], &device).unwrap();
        // finish step 2: EOS leads once two tokens are in
        let src_seq = Tensor::new(&[[0u32, 2, 1], [0, 2, 1]], &device).unwrap();
        let enc_output = Tensor::new(
            &[[[0f32, 1.0], [2.0, 2.0], [1.0, 3.0]], [[0.0, 1.0], [2.0, 2.0], [1.0, 3.0]]],
            &device,
        )
        .unwrap();

        let log_probs = target
            .next_token_log_probs(&tgt_seq, &tgt_pos, &src_seq, &enc_output)
            .unwrap();
        let hidden = target
            .decoder()
            .forward(&tgt_seq, &tgt_pos, &src_seq, &enc_output)
            .unwrap();
        let expected = target
            .normalizer()
            .apply(&hidden.narrow(1, 1, 1).unwrap().squeeze(1).unwrap())
            .unwrap();

        assert_eq!(log_probs.dims(), &[2, 6]);
        assert_eq!(
            log_probs.to_vec2::<f32>().unwrap(),
            expected.to_vec2::<f32>().unwrap()
        );
        let best = log_probs.argmax(1).unwrap().to_vec1::<u32>().unwrap();
        assert_eq!(best, vec![1, 1]);
    }

    #[test]
    fn registry_keeps_insertion_order() {
        let decoders = TargetDecoders::new()
            .with("<sport>", TargetDecoder::new(Box::new(ScriptedDecoder::new(6, 3))))
            .with("<given_name>", TargetDecoder::new(Box::new(ScriptedDecoder::new(6, 3))))
            .with("<sport>", TargetDecoder::new(Box::new(ScriptedDecoder::new(6, 5))));

        assert_eq!(decoders.len(), 2);
        assert_eq!(decoders.names().collect::<Vec<_>>(), vec!["<sport>", "<given_name>"]);
        assert_eq!(decoders.get("<sport>").unwrap().max_seq_len(), 5);
    }

    #[test]
    fn unknown_target_lookup_fails() {
        let decoders = TargetDecoders::new();
        assert!(matches!(decoders.get("<sport>"), Err(MimoError::UnknownTarget(_))));
    }
}
