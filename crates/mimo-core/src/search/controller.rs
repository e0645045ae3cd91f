//! Batched beam search for one target decoder.
//!
//! The controller owns one [`Beam`] per instance and steps them in
//! lockstep. Every step feeds the partial hypotheses of all live beams to
//! the decoder as a single batch, advances each beam with its slice of the
//! output, and drops the row groups of instances that just finished.

use super::beam::Beam;
use super::compact::{select_active_rows, ActiveMap};
use crate::error::{MimoError, Result};
use crate::model::TargetDecoder;
use crate::vocab::SpecialTokens;
use candle_core::{Device, IndexOp, Tensor};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One complete output sequence and its cumulative log-probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    /// Token ids, excluding the initial token.
    pub tokens: Vec<u32>,
    /// Cumulative log-probability.
    pub score: f32,
}

/// Result of decoding one batch with one target decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Up to `n_best` hypotheses per instance, best first.
    pub hypotheses: Vec<Vec<Hypothesis>>,
    /// Decode steps taken.
    pub steps: usize,
    /// Instances still undone when the length cap was hit.
    pub unfinished: usize,
}

impl SearchOutcome {
    /// Best hypothesis of each instance.
    pub fn best(&self) -> Vec<Option<&Hypothesis>> {
        self.hypotheses.iter().map(|h| h.first()).collect()
    }

    /// Scores per instance, best first.
    pub fn scores(&self) -> Vec<Vec<f32>> {
        self.hypotheses
            .iter()
            .map(|h| h.iter().map(|hyp| hyp.score).collect())
            .collect()
    }
}

/// Runs beam search over a batch for a single target.
#[derive(Debug)]
pub struct BeamSearchController<'a> {
    decoder: &'a TargetDecoder,
    beam_size: usize,
    n_best: usize,
    specials: SpecialTokens,
}

impl<'a> BeamSearchController<'a> {
    /// Create a controller.
    pub fn new(
        decoder: &'a TargetDecoder,
        beam_size: usize,
        n_best: usize,
        specials: SpecialTokens,
    ) -> Self {
        Self {
            decoder,
            beam_size,
            n_best,
            specials,
        }
    }

    /// Decode a batch.
    ///
    /// # Arguments
    ///
    /// * `src_seq` - Source ids already repeated per beam, `[batch * beam_size, src_len]`
    /// * `enc_output` - Encoder output repeated the same way, `[batch * beam_size, src_len, d_model]`
    /// * `inits` - Forced first token per instance; its length is the batch size
    pub fn run(&self, src_seq: &Tensor, enc_output: &Tensor, inits: &[u32]) -> Result<SearchOutcome> {
        let batch_size = inits.len();
        let width = self.beam_size;
        if width == 0 {
            return Err(MimoError::InvalidConfig("beam size must be at least 1".to_string()));
        }
        for (name, rows) in [("source", src_seq.dim(0)?), ("encoder output", enc_output.dim(0)?)] {
            if rows != batch_size * width {
                return Err(MimoError::ShapeMismatch(format!(
                    "{} has {} rows, expected {} instances x beam {}",
                    name, rows, batch_size, width
                )));
            }
        }

        let mut beams: Vec<Beam> = inits
            .iter()
            .map(|&init| Beam::new(width, Some(init), self.specials))
            .collect();
        let mut active_map = ActiveMap::identity(batch_size);
        let mut remaining = batch_size;
        let mut src_seq = src_seq.clone();
        let mut enc_output = enc_output.clone();
        let mut steps = 0;

        let max_len = self.decoder.max_seq_len();
        for len in 1..=max_len {
            if remaining == 0 {
                break;
            }
            steps = len;
            let rows = remaining * width;
            let device = src_seq.device().clone();

            let dec_seq = partial_sequences(&beams, &active_map, len, &device)?;
            let dec_pos = decode_positions(rows, len, &device)?;

            let log_probs =
                self.decoder
                    .next_token_log_probs(&dec_seq, &dec_pos, &src_seq, &enc_output)?;
            let (_, vocab_size) = log_probs.dims2()?;
            let log_probs = log_probs.reshape((remaining, width, vocab_size))?;

            let mut still_active = Vec::with_capacity(remaining);
            for (original, beam) in beams.iter_mut().enumerate() {
                let Some(position) = active_map.position(original) else {
                    continue;
                };
                if beam.advance(&log_probs.i(position)?)? {
                    still_active.push(original);
                }
            }

            debug!(
                step = len,
                rows,
                finished = remaining - still_active.len(),
                remaining = still_active.len(),
                "beam search step"
            );

            if still_active.is_empty() {
                remaining = 0;
                break;
            }

            if still_active.len() < remaining {
                let keep: Vec<usize> = still_active
                    .iter()
                    .filter_map(|&original| active_map.position(original))
                    .collect();
                src_seq = select_active_rows(&src_seq, &keep, remaining)?;
                enc_output = select_active_rows(&enc_output, &keep, remaining)?;
                debug!(
                    from = remaining,
                    to = keep.len(),
                    rows = keep.len() * width,
                    "compacted working batch"
                );
                remaining = keep.len();
            }
            active_map = ActiveMap::from_active(batch_size, &still_active);
        }

        if remaining > 0 {
            warn!(
                unfinished = remaining,
                max_len, "length cap reached, returning partial hypotheses"
            );
        }

        let hypotheses = beams
            .iter()
            .map(|beam| {
                beam.sort_scores()
                    .into_iter()
                    .take(self.n_best)
                    .map(|(slot, score)| Hypothesis {
                        tokens: beam.hypothesis(slot),
                        score,
                    })
                    .collect()
            })
            .collect();

        Ok(SearchOutcome {
            hypotheses,
            steps,
            unfinished: remaining,
        })
    }
}

/// Current states of all active beams, `[active * width, len]`.
fn partial_sequences(
    beams: &[Beam],
    active_map: &ActiveMap,
    len: usize,
    device: &Device,
) -> Result<Tensor> {
    let active = active_map.active();
    let width = beams.first().map(Beam::width).unwrap_or(0);
    let mut flat = Vec::with_capacity(active.len() * width * len);
    for &original in &active {
        for seq in beams[original].current_state() {
            if seq.len() != len {
                return Err(MimoError::ShapeMismatch(format!(
                    "beam {} holds {} tokens at step {}",
                    original,
                    seq.len(),
                    len
                )));
            }
            flat.extend(seq);
        }
    }
    Ok(Tensor::from_vec(flat, (active.len() * width, len), device)?)
}

/// Positions `1..=len` for every row, `[rows, len]`.
fn decode_positions(rows: usize, len: usize, device: &Device) -> Result<Tensor> {
    let positions = Tensor::arange(1u32, len as u32 + 1, device)?
        .unsqueeze(0)?
        .repeat((rows, 1))?;
    Ok(positions)
}
