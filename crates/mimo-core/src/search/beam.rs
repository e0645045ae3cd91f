//! Per-instance beam state.
//!
//! A [`Beam`] tracks a fixed number of slots for one source instance. Each
//! call to [`Beam::advance`] scores every `(slot, token)` continuation,
//! keeps the best `width`, and records which slot each survivor came from.
//! Full hypotheses are rebuilt by walking those backpointers.
//!
//! # Algorithm
//!
//! 1. Add each slot's cumulative score to its row of log-probabilities
//! 2. Rank all `width * vocab` continuations by score, lower flat index first on ties;
//!    a NaN score ranks as negative infinity
//! 3. Keep the top `width`; flat index `i` is slot `i / vocab`, token `i % vocab`
//! 4. Done once the best continuation is EOS
//!
//! Only slot 0 starts at score 0; the rest start at negative infinity so
//! the first step fans a single hypothesis out into `width` distinct ones.
//!
//! # Example
//!
//! ```
//! use candle_core::{Device, Tensor};
//! use mimo_core::search::Beam;
//! use mimo_core::vocab::SpecialTokens;
//!
//! let specials = SpecialTokens { bos: 0, eos: 1, pad: 2, unk: 3 };
//! let mut beam = Beam::new(2, None, specials);
//!
//! let log_probs = Tensor::new(
//!     &[[-9.0f32, -9.0, -9.0, -9.0, -0.5, -1.0], [-9.0, -9.0, -9.0, -9.0, -0.5, -1.0]],
//!     &Device::Cpu,
//! ).unwrap();
//! assert!(beam.advance(&log_probs).unwrap());
//! assert_eq!(beam.current_state(), vec![vec![0, 4], vec![0, 5]]);
//! ```

use crate::error::{MimoError, Result};
use crate::vocab::SpecialTokens;
use candle_core::{DType, Tensor};
use std::cmp::Ordering;

/// Decode state for one instance.
#[derive(Debug, Clone)]
pub struct Beam {
    /// Number of slots.
    width: usize,
    /// First token of every slot.
    init: u32,
    /// EOS token ID for detecting completion.
    eos: u32,
    /// Cumulative log-probability per slot.
    scores: Vec<f32>,
    /// Token chosen by each slot, per step.
    next_tokens: Vec<Vec<u32>>,
    /// Originating slot of each slot, per step.
    backpointers: Vec<Vec<usize>>,
    /// Whether the best slot has emitted EOS.
    done: bool,
}

impl Beam {
    /// Create a beam of `width` slots.
    ///
    /// Every slot starts with `init`, or BOS when no initial token is
    /// forced.
    pub fn new(width: usize, init: Option<u32>, specials: SpecialTokens) -> Self {
        let mut scores = vec![f32::NEG_INFINITY; width];
        if let Some(first) = scores.first_mut() {
            *first = 0.0;
        }

        Self {
            width,
            init: init.unwrap_or(specials.bos),
            eos: specials.eos,
            scores,
            next_tokens: Vec::new(),
            backpointers: Vec::new(),
            done: false,
        }
    }

    /// Number of slots.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Forced first token.
    pub fn init_token(&self) -> u32 {
        self.init
    }

    /// Whether the best slot has emitted EOS.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Number of completed steps.
    pub fn num_steps(&self) -> usize {
        self.backpointers.len()
    }

    /// Cumulative score per slot.
    pub fn scores(&self) -> &[f32] {
        &self.scores
    }

    /// Originating slot of each slot, per step.
    pub fn backpointers(&self) -> &[Vec<usize>] {
        &self.backpointers
    }

    /// Decoder input for every slot: the initial token followed by the
    /// slot's hypothesis. Each row has `num_steps() + 1` tokens.
    pub fn current_state(&self) -> Vec<Vec<u32>> {
        (0..self.width)
            .map(|slot| {
                let mut seq = Vec::with_capacity(self.num_steps() + 1);
                seq.push(self.init);
                seq.extend(self.hypothesis(slot));
                seq
            })
            .collect()
    }

    /// Advance one step.
    ///
    /// # Arguments
    ///
    /// * `word_log_probs` - Next-token log-probabilities `[width, vocab]`,
    ///   one row per slot
    ///
    /// # Returns
    ///
    /// `true` while the beam is still active, `false` once it has just
    /// completed and should no longer be scheduled.
    pub fn advance(&mut self, word_log_probs: &Tensor) -> Result<bool> {
        if self.done {
            return Ok(false);
        }

        let (rows, vocab_size) = word_log_probs.dims2()?;
        if self.width == 0 || rows != self.width || vocab_size == 0 {
            return Err(MimoError::ShapeMismatch(format!(
                "beam of width {} got log-probs of shape [{}, {}]",
                self.width, rows, vocab_size
            )));
        }
        let word_log_probs = word_log_probs.to_dtype(DType::F32)?.to_vec2::<f32>()?;

        let mut candidates: Vec<(usize, f32)> = Vec::with_capacity(self.width * vocab_size);
        for (slot, row) in word_log_probs.iter().enumerate() {
            let base = self.scores[slot];
            candidates.extend(row.iter().enumerate().map(|(token, &lp)| {
                let score = base + lp;
                let score = if score.is_nan() { f32::NEG_INFINITY } else { score };
                (slot * vocab_size + token, score)
            }));
        }
        if candidates.len() > self.width {
            candidates.select_nth_unstable_by(self.width - 1, rank);
            candidates.truncate(self.width);
        }
        candidates.sort_by(rank);

        let mut prev = Vec::with_capacity(self.width);
        let mut tokens = Vec::with_capacity(self.width);
        for (slot, &(flat, score)) in candidates.iter().enumerate() {
            prev.push(flat / vocab_size);
            tokens.push((flat % vocab_size) as u32);
            self.scores[slot] = score;
        }

        self.done = tokens[0] == self.eos;
        self.backpointers.push(prev);
        self.next_tokens.push(tokens);

        Ok(!self.done)
    }

    /// All `(slot, score)` pairs, best first; equal scores keep slot order.
    pub fn sort_scores(&self) -> Vec<(usize, f32)> {
        let mut sorted: Vec<(usize, f32)> = self.scores.iter().copied().enumerate().collect();
        sorted.sort_by(rank);
        sorted
    }

    /// Tokens chosen by `slot`, oldest first, without the initial token.
    ///
    /// # Panics
    ///
    /// Panics if `slot >= width`.
    pub fn hypothesis(&self, slot: usize) -> Vec<u32> {
        let mut hyp = Vec::with_capacity(self.num_steps());
        let mut k = slot;
        for step in (0..self.num_steps()).rev() {
            hyp.push(self.next_tokens[step][k]);
            k = self.backpointers[step][k];
        }
        hyp.reverse();
        hyp
    }
}

/// Higher score first, then lower index.
fn rank(a: &(usize, f32), b: &(usize, f32)) -> Ordering {
    b.1.total_cmp(&a.1).then(a.0.cmp(&b.0))
}
