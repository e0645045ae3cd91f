//! Deterministic encoder/decoder stubs for tests.
//!
//! Vocabulary: BOS=0, EOS=1, PAD=2, UNK=3, A=4, B=5. Each source sequence
//! is `[BOS, k, EOS]`: the instance wants to end after `k` decode steps.
//! The decoder reads `k` back out of the (possibly compacted) source rows,
//! so a row-group mix-up during compaction changes the decoded output.

use crate::error::{MimoError, Result};
use crate::model::{Decoder, Encoder};
use crate::vocab::SpecialTokens;
use candle_core::{DType, Device, Tensor};
use parking_lot::Mutex;
use std::sync::Arc;

pub(crate) const A: u32 = 4;
pub(crate) const B: u32 = 5;
pub(crate) const VOCAB: usize = 6;

pub(crate) fn specials() -> SpecialTokens {
    SpecialTokens {
        bos: 0,
        eos: 1,
        pad: 2,
        unk: 3,
    }
}

/// Sources `[BOS, k, EOS]` for each finish step `k`.
pub(crate) fn sources(finish_steps: &[u32]) -> (Tensor, Tensor) {
    let seqs: Vec<Vec<u32>> = finish_steps.iter().map(|&k| vec![0, k, 1]).collect();
    crate::model::batch_tensors(&seqs, specials().pad, &Device::Cpu).unwrap()
}

/// Encodes each token as a `d_model = 2` vector `[token, position]`.
#[derive(Debug, Default)]
pub(crate) struct EchoEncoder;

impl Encoder for EchoEncoder {
    fn forward(&self, src_seq: &Tensor, src_pos: &Tensor) -> Result<Tensor> {
        let tokens = src_seq.to_dtype(DType::F32)?.unsqueeze(2)?;
        let positions = src_pos.to_dtype(DType::F32)?.unsqueeze(2)?;
        Ok(Tensor::cat(&[&tokens, &positions], 2)?)
    }
}

/// Shapes seen by one decoder call: `(tgt rows, tgt len, src rows, enc rows)`.
pub(crate) type CallShape = (usize, usize, usize, usize);

/// Scores A then B, and EOS once the target length reaches the instance's
/// finish step. Hidden states are the logits themselves.
#[derive(Debug)]
pub(crate) struct ScriptedDecoder {
    vocab: usize,
    max_len: usize,
    calls: Arc<Mutex<Vec<CallShape>>>,
}

impl ScriptedDecoder {
    pub(crate) fn new(vocab: usize, max_len: usize) -> Self {
        Self {
            vocab,
            max_len,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared handle to the recorded call shapes.
    pub(crate) fn calls(&self) -> Arc<Mutex<Vec<CallShape>>> {
        self.calls.clone()
    }

    fn row_logits(&self, finish_step: u32, len: usize) -> Vec<f32> {
        let mut row = vec![-6.0f32; self.vocab];
        row[A as usize] = 2.0;
        row[B as usize] = 1.0;
        row[1] = if len as u32 >= finish_step { 4.0 } else { -4.0 };
        row
    }
}

impl Decoder for ScriptedDecoder {
    fn forward(
        &self,
        tgt_seq: &Tensor,
        _tgt_pos: &Tensor,
        src_seq: &Tensor,
        enc_output: &Tensor,
    ) -> Result<Tensor> {
        let (rows, len) = tgt_seq.dims2()?;
        let src_rows = src_seq.dims()[0];
        let enc_rows = enc_output.dims()[0];
        self.calls.lock().push((rows, len, src_rows, enc_rows));

        if src_rows != rows || enc_rows != rows {
            return Err(MimoError::ModelError(format!(
                "{} target rows against {} source rows and {} encoder rows",
                rows, src_rows, enc_rows
            )));
        }

        let src = src_seq.to_vec2::<u32>()?;
        let enc = enc_output.to_vec3::<f32>()?;
        let mut hidden = Vec::with_capacity(rows * len * self.vocab);
        for (src_row, enc_row) in src.iter().zip(enc.iter()) {
            let finish_step = src_row[1];
            if enc_row[1][0] != finish_step as f32 {
                return Err(MimoError::ModelError(
                    "encoder rows out of step with source rows".to_string(),
                ));
            }
            for _ in 0..len {
                hidden.extend(self.row_logits(finish_step, len));
            }
        }
        Ok(Tensor::from_vec(hidden, (rows, len, self.vocab), tgt_seq.device())?)
    }

    fn project(&self, hidden: &Tensor) -> Result<Tensor> {
        Ok(hidden.clone())
    }

    fn max_seq_len(&self) -> usize {
        self.max_len
    }
}

/// Always fails, for error propagation tests.
#[derive(Debug)]
pub(crate) struct FailingDecoder;

impl Decoder for FailingDecoder {
    fn forward(&self, _: &Tensor, _: &Tensor, _: &Tensor, _: &Tensor) -> Result<Tensor> {
        Err(MimoError::ModelError("forward pass failed".to_string()))
    }

    fn project(&self, hidden: &Tensor) -> Result<Tensor> {
        Ok(hidden.clone())
    }

    fn max_seq_len(&self) -> usize {
        4
    }
}
