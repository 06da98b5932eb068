//! View, squeeze, unsqueeze and expand.

use tracing::debug;

use crate::backend::shape_helpers::{insert_unit_dim, left_pad_dims};
use crate::ops::error::{LoweringError, LoweringResult};
use crate::ops::graph::{GraphBuilder, Node};
use crate::ops::ptir::axes_iter;

use super::complete::complete_shape;

/// Reshapes `input` to `target`, resolving at most one negative entry.
pub fn view(builder: &mut GraphBuilder, input: &Node, target: &[i64]) -> LoweringResult<Node> {
    debug!(op = "view", input = ?input.dims(), target = ?target, "lowering");
    let dims = complete_shape(target, input.dims())?;
    builder.reshape(input, &dims)
}

/// Drops axis `dim` when it has size 1; otherwise returns `input` untouched.
pub fn squeeze_dim(builder: &mut GraphBuilder, input: &Node, dim: usize) -> LoweringResult<Node> {
    debug!(op = "squeeze_dim", input = ?input.dims(), dim, "lowering");
    let rank = input.rank();
    if dim >= rank {
        return Err(LoweringError::DimensionOutOfRange {
            op: "squeeze_dim",
            dim,
            rank,
        });
    }
    if input.dims()[dim] != 1 {
        return Ok(input.clone());
    }
    let mut dims = input.dims().to_vec();
    dims.remove(dim);
    builder.reshape(input, &dims)
}

/// Drops every size-1 axis, keeping the order of the rest.
pub fn squeeze_all(builder: &mut GraphBuilder, input: &Node) -> LoweringResult<Node> {
    debug!(op = "squeeze_all", input = ?input.dims(), "lowering");
    let dims = input
        .dims()
        .iter()
        .copied()
        .filter(|&size| size != 1)
        .collect::<Vec<_>>();
    builder.reshape(input, &dims)
}

/// Returns `dims` with a size-1 axis inserted at `dim` (`dim <= dims.len()`).
pub fn unsqueeze_dims(dims: &[usize], dim: usize) -> LoweringResult<Vec<usize>> {
    insert_unit_dim(dims, dim).ok_or(LoweringError::DimensionOutOfRange {
        op: "unsqueeze",
        dim,
        rank: dims.len(),
    })
}

/// Inserts a size-1 axis at `dim`.
pub fn unsqueeze(builder: &mut GraphBuilder, input: &Node, dim: usize) -> LoweringResult<Node> {
    debug!(op = "unsqueeze", input = ?input.dims(), dim, "lowering");
    let dims = unsqueeze_dims(input.dims(), dim)?;
    builder.reshape(input, &dims)
}

/// Broadcasts `input` to `target` with numpy-style trailing alignment.
pub fn expand(builder: &mut GraphBuilder, input: &Node, target: &[usize]) -> LoweringResult<Node> {
    debug!(op = "expand", input = ?input.dims(), target = ?target, "lowering");
    if target.len() < input.rank() {
        return Err(LoweringError::RankMismatch {
            op: "expand",
            expected: input.rank(),
            actual: target.len(),
        });
    }
    let aligned = reshape_to_rank(builder, input, target.len())?;
    builder.broadcast_in_dim(&aligned, target, &axes_iter(0..target.len()))
}

/// Prepends size-1 axes until `input` has `rank` axes. No node is emitted when it already does.
pub fn reshape_to_rank(
    builder: &mut GraphBuilder,
    input: &Node,
    rank: usize,
) -> LoweringResult<Node> {
    if input.rank() > rank {
        return Err(LoweringError::RankMismatch {
            op: "reshape_to_rank",
            expected: rank,
            actual: input.rank(),
        });
    }
    if input.rank() == rank {
        return Ok(input.clone());
    }
    builder.reshape(input, &left_pad_dims(input.dims(), rank))
}
