//! Beam replication and batch compaction.
//!
//! Working tensors are laid out instance-major: rows
//! `[i * beam_size, (i + 1) * beam_size)` belong to instance `i`. When
//! instances finish, their row groups are dropped so the decoder only runs
//! on live instances. The remaining-instance count is always passed in
//! explicitly.

use crate::error::{MimoError, Result};
use candle_core::Tensor;

/// Repeat every row `beam_size` times along the leading dimension.
///
/// `[batch, ...]` becomes `[batch * beam_size, ...]` with each instance's
/// copies adjacent.
pub fn repeat_for_beam(tensor: &Tensor, beam_size: usize) -> Result<Tensor> {
    let (&batch, rest) = tensor.dims().split_first().ok_or_else(|| {
        MimoError::ShapeMismatch("cannot replicate a scalar tensor".to_string())
    })?;

    let mut expanded = vec![batch, beam_size];
    expanded.extend_from_slice(rest);
    let mut flat = vec![batch * beam_size];
    flat.extend_from_slice(rest);

    let repeated = tensor
        .unsqueeze(1)?
        .broadcast_as(expanded)?
        .contiguous()?
        .reshape(flat)?;
    Ok(repeated)
}

/// Keep the row groups of the given instances.
///
/// # Arguments
///
/// * `tensor` - Working tensor whose leading dimension is
///   `remaining * rows_per_instance`
/// * `active` - Positions (in `0..remaining`) of instances to keep, in output order
/// * `remaining` - Number of instances currently in `tensor`
///
/// # Returns
///
/// Tensor with leading dimension `active.len() * rows_per_instance` and the
/// same trailing dimensions.
pub fn select_active_rows(tensor: &Tensor, active: &[usize], remaining: usize) -> Result<Tensor> {
    let (&rows, rest) = tensor.dims().split_first().ok_or_else(|| {
        MimoError::ShapeMismatch("cannot compact a scalar tensor".to_string())
    })?;
    if remaining == 0 || rows % remaining != 0 {
        return Err(MimoError::ShapeMismatch(format!(
            "{} rows cannot be split across {} instances",
            rows, remaining
        )));
    }
    if let Some(&bad) = active.iter().find(|&&i| i >= remaining) {
        return Err(MimoError::ShapeMismatch(format!(
            "active instance {} out of range for {} remaining",
            bad, remaining
        )));
    }

    let rows_per_instance = rows / remaining;
    let index: Vec<u32> = active.iter().map(|&i| i as u32).collect();
    let index = Tensor::from_vec(index, active.len(), tensor.device())?;

    let grouped = tensor.reshape((remaining, tensor.elem_count() / remaining))?;
    let selected = grouped.index_select(&index, 0)?;

    let mut new_dims = vec![active.len() * rows_per_instance];
    new_dims.extend_from_slice(rest);
    Ok(selected.reshape(new_dims)?)
}

/// Mapping from original batch position to row-group position in the
/// compacted working tensors. Finished instances have no position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveMap {
    positions: Vec<Option<usize>>,
}

impl ActiveMap {
    /// Every instance active at its own position.
    pub fn identity(batch_size: usize) -> Self {
        Self {
            positions: (0..batch_size).map(Some).collect(),
        }
    }

    /// Dense renumbering of `active` (original positions, ascending).
    pub fn from_active(batch_size: usize, active: &[usize]) -> Self {
        let mut positions = vec![None; batch_size];
        for (compacted, &original) in active.iter().enumerate() {
            positions[original] = Some(compacted);
        }
        Self { positions }
    }

    /// Compacted position of an original instance.
    pub fn position(&self, original: usize) -> Option<usize> {
        self.positions.get(original).copied().flatten()
    }

    /// Original positions still active, ascending.
    pub fn active(&self) -> Vec<usize> {
        self.positions
            .iter()
            .enumerate()
            .filter_map(|(original, pos)| pos.map(|_| original))
            .collect()
    }

    /// Number of active instances.
    pub fn len(&self) -> usize {
        self.positions.iter().filter(|p| p.is_some()).count()
    }

    /// Check if no instance is active.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
