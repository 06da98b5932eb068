//! Static slices, windowed overwrite and flat resize.

use tracing::debug;

use crate::backend::ptir_utils::tensor_literal_si32;
use crate::backend::shape_helpers::left_pad_dims;
use crate::backend::spec::Literal;
use crate::ops::error::{element_count, LoweringError, LoweringResult};
use crate::ops::graph::{GraphBuilder, Node};
use crate::ops::ptir::{check_window, PadDim, PaddingConfig};

use super::reshape::reshape_to_rank;

/// Extracts the unit-stride window of `sizes` starting at `base`.
pub fn slice(
    builder: &mut GraphBuilder,
    input: &Node,
    base: &[usize],
    sizes: &[usize],
) -> LoweringResult<Node> {
    debug!(op = "slice", input = ?input.dims(), base = ?base, sizes = ?sizes, "lowering");
    builder.slice(input, base, sizes)
}

/// Writes `source` into `target` at offsets `base`.
///
/// A lower-rank `source` is aligned to `target` by prepending size-1 axes. The window must lie
/// inside `target`.
pub fn update_slice(
    builder: &mut GraphBuilder,
    target: &Node,
    source: &Node,
    base: &[usize],
) -> LoweringResult<Node> {
    debug!(
        op = "update_slice",
        target = ?target.dims(),
        source = ?source.dims(),
        base = ?base,
        "lowering"
    );
    builder.ensure_known(target)?;
    builder.ensure_known(source)?;
    let rank = target.rank();
    if source.dtype() != target.dtype() {
        return Err(LoweringError::DTypeMismatch {
            op: "update_slice",
            expected: target.dtype(),
            actual: source.dtype(),
        });
    }
    if source.rank() > rank {
        return Err(LoweringError::RankMismatch {
            op: "update_slice",
            expected: rank,
            actual: source.rank(),
        });
    }
    if base.len() != rank {
        return Err(LoweringError::RankMismatch {
            op: "update_slice",
            expected: rank,
            actual: base.len(),
        });
    }
    let window = left_pad_dims(source.dims(), rank);
    check_window("update_slice", target.dims(), base, &window)?;
    let starts = base
        .iter()
        .map(|&start| {
            i32::try_from(start).map_err(|_| LoweringError::InvalidAttribute {
                op: "update_slice",
                reason: format!("start index {start} does not fit in si32"),
            })
        })
        .collect::<LoweringResult<Vec<_>>>()?;

    let update = reshape_to_rank(builder, source, rank)?;
    let starts = builder.constant(tensor_literal_si32(&starts))?;
    builder.dynamic_update_slice(target, &update, &starts)
}

/// Reinterprets `input` as `new_sizes`, truncating or zero-filling the flat element sequence.
pub fn resize(builder: &mut GraphBuilder, input: &Node, new_sizes: &[usize]) -> LoweringResult<Node> {
    debug!(op = "resize", input = ?input.dims(), new_sizes = ?new_sizes, "lowering");
    let count = element_count(input.dims())?;
    let new_count = element_count(new_sizes)?;
    if count == new_count {
        return builder.reshape(input, new_sizes);
    }

    let flat = builder.reshape(input, &[count])?;
    let resized = if new_count < count {
        builder.slice(&flat, &[0], &[new_count])?
    } else {
        let mut config = PaddingConfig::zeros(1);
        config.set(
            0,
            PadDim {
                low: 0,
                high: new_count - count,
                interior: 0,
            },
        )?;
        builder.pad(&flat, &config, Literal::zero(input.dtype()))?
    };
    builder.reshape(&resized, new_sizes)
}
