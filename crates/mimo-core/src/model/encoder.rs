//! Shared source encoder and batch tensor helpers.

use crate::error::{MimoError, Result};
use candle_core::{Device, Tensor};

/// Encodes a batch of source sequences once per target decode.
///
/// Implementations must be pure: the same inputs always produce the same
/// output.
pub trait Encoder: Send + Sync {
    /// Encode sources.
    ///
    /// # Arguments
    ///
    /// * `src_seq` - Token ids `[batch, src_len]` (U32)
    /// * `src_pos` - 1-based positions `[batch, src_len]`, 0 at padding (U32)
    ///
    /// # Returns
    ///
    /// Encoder output `[batch, src_len, d_model]`.
    fn forward(&self, src_seq: &Tensor, src_pos: &Tensor) -> Result<Tensor>;
}

/// 1-based positions for one sequence, 0 where the token is padding.
pub fn positions_for(seq: &[u32], pad: u32) -> Vec<u32> {
    seq.iter()
        .enumerate()
        .map(|(i, &tok)| if tok == pad { 0 } else { i as u32 + 1 })
        .collect()
}

/// Pad encoded sequences into `(src_seq, src_pos)` tensors of shape
/// `[batch, max_len]`.
pub fn batch_tensors(seqs: &[Vec<u32>], pad: u32, device: &Device) -> Result<(Tensor, Tensor)> {
    let max_len = seqs.iter().map(Vec::len).max().unwrap_or(0);
    if seqs.is_empty() || max_len == 0 {
        return Err(MimoError::ShapeMismatch(
            "cannot build a batch from empty sequences".to_string(),
        ));
    }

    let mut tokens = Vec::with_capacity(seqs.len() * max_len);
    let mut positions = Vec::with_capacity(seqs.len() * max_len);
    for seq in seqs {
        let mut padded = seq.clone();
        padded.resize(max_len, pad);
        positions.extend(positions_for(&padded, pad));
        tokens.extend(padded);
    }

    let src_seq = Tensor::from_vec(tokens, (seqs.len(), max_len), device)?;
    let src_pos = Tensor::from_vec(positions, (seqs.len(), max_len), device)?;
    Ok((src_seq, src_pos))
}
