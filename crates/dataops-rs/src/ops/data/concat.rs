//! Concatenate, stack, repeat and split.

use tracing::{debug, warn};

use crate::ops::error::{LoweringError, LoweringResult};
use crate::ops::graph::{GraphBuilder, Node};
use crate::ops::ptir::axes_iter;

use super::options::SplitPolicy;
use super::reshape::unsqueeze;

/// Joins `inputs` along `dim` in order with a single concatenate.
pub fn concat(builder: &mut GraphBuilder, inputs: &[Node], dim: usize) -> LoweringResult<Node> {
    debug!(op = "concat", inputs = inputs.len(), dim, "lowering");
    builder.concat(inputs, dim)
}

/// Stacks equally shaped `inputs` along a new axis `dim`.
pub fn stack(builder: &mut GraphBuilder, inputs: &[Node], dim: usize) -> LoweringResult<Node> {
    debug!(op = "stack", inputs = inputs.len(), dim, "lowering");
    let Some(first) = inputs.first() else {
        return Err(LoweringError::EmptyOperandList { op: "stack" });
    };
    for input in inputs {
        builder.ensure_known(input)?;
    }
    let rank = first.rank();
    if dim > rank {
        return Err(LoweringError::DimensionOutOfRange {
            op: "stack",
            dim,
            rank,
        });
    }
    for input in &inputs[1..] {
        if input.rank() != rank {
            return Err(LoweringError::RankMismatch {
                op: "stack",
                expected: rank,
                actual: input.rank(),
            });
        }
        for (axis, (&expected, &actual)) in first.dims().iter().zip(input.dims()).enumerate() {
            if expected != actual {
                return Err(LoweringError::ShapeMismatch {
                    op: "stack",
                    axis,
                    expected,
                    actual,
                });
            }
        }
    }

    let mut expanded = Vec::with_capacity(inputs.len());
    for input in inputs {
        expanded.push(unsqueeze(builder, input, dim)?);
    }
    builder.concat(&expanded, dim)
}

/// Tiles `input` `repeats[extra + k]` times along each axis `k`, then adds the
/// `extra = repeats.len() - rank` leading axes by broadcasting.
pub fn repeat(builder: &mut GraphBuilder, input: &Node, repeats: &[usize]) -> LoweringResult<Node> {
    debug!(op = "repeat", input = ?input.dims(), repeats = ?repeats, "lowering");
    let rank = input.rank();
    if repeats.len() < rank {
        return Err(LoweringError::RankMismatch {
            op: "repeat",
            expected: rank,
            actual: repeats.len(),
        });
    }
    let extra = repeats.len() - rank;

    let mut result = input.clone();
    for (axis, &count) in repeats[extra..].iter().enumerate() {
        result = match count {
            1 => result,
            0 => {
                let mut sizes = result.dims().to_vec();
                sizes[axis] = 0;
                builder.slice(&result, &vec![0; rank], &sizes)?
            }
            _ => builder.concat(&vec![result; count], axis)?,
        };
    }

    if extra > 0 {
        let mut dims = repeats[..extra].to_vec();
        dims.extend_from_slice(result.dims());
        result = builder.broadcast_in_dim(&result, &dims, &axes_iter(extra..extra + rank))?;
    }
    Ok(result)
}

/// Number of chunks a truncating split of `dim_size` by `split_sizes` yields.
pub fn split_count(dim_size: usize, split_sizes: &[usize]) -> usize {
    let mut remaining = dim_size;
    let mut count = 0;
    for &size in split_sizes {
        if size > remaining {
            break;
        }
        remaining -= size;
        count += 1;
    }
    count
}

/// Cuts `input` along `dim` into consecutive chunks of `split_sizes`.
///
/// A chunk that does not fit ends the walk under [`SplitPolicy::Truncate`] and is an error
/// under [`SplitPolicy::Strict`]. Sizes need not cover the whole axis.
pub fn split(
    builder: &mut GraphBuilder,
    input: &Node,
    split_sizes: &[usize],
    dim: usize,
) -> LoweringResult<Vec<Node>> {
    debug!(op = "split", input = ?input.dims(), sizes = ?split_sizes, dim, "lowering");
    let rank = input.rank();
    if dim >= rank {
        return Err(LoweringError::DimensionOutOfRange {
            op: "split",
            dim,
            rank,
        });
    }
    let extent = input.dims()[dim];
    let count = split_count(extent, split_sizes);

    if count < split_sizes.len() {
        let consumed: usize = split_sizes[..count].iter().sum();
        let remaining = extent - consumed;
        match builder.options().split {
            SplitPolicy::Strict => {
                return Err(LoweringError::SplitSizeOverflow {
                    index: count,
                    requested: split_sizes[count],
                    remaining,
                });
            }
            SplitPolicy::Truncate => warn!(
                dim,
                extent,
                requested = split_sizes.len(),
                produced = count,
                "split sizes exceed the axis; truncating"
            ),
        }
    }

    let mut chunks = Vec::with_capacity(count);
    let mut starts = vec![0usize; rank];
    for &size in &split_sizes[..count] {
        let mut sizes = input.dims().to_vec();
        sizes[dim] = size;
        chunks.push(builder.slice(input, &starts, &sizes)?);
        starts[dim] += size;
    }
    Ok(chunks)
}
