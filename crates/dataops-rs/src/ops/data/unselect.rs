//! Strided overwrite along one axis, expressed as pad + mask + select.

use tracing::debug;

use crate::backend::spec::{DType, Literal};
use crate::ops::error::{LoweringError, LoweringResult};
use crate::ops::graph::{GraphBuilder, Node};
use crate::ops::ptir::{PadDim, PaddingConfig};

/// Returns `target` with positions `start, start + stride, ...` of axis `dim` replaced by the
/// consecutive slices of `source`.
///
/// When `source` already spans the whole axis the window must be `[0, target[dim])` with
/// stride 1 and `source` itself is returned. Otherwise `end` is not consulted: the window is
/// `source[dim]` elements long.
pub fn unselect(
    builder: &mut GraphBuilder,
    target: &Node,
    source: &Node,
    dim: usize,
    start: usize,
    end: usize,
    stride: usize,
) -> LoweringResult<Node> {
    debug!(
        op = "unselect",
        target = ?target.dims(),
        source = ?source.dims(),
        dim,
        start,
        end,
        stride,
        "lowering"
    );
    builder.ensure_known(target)?;
    builder.ensure_known(source)?;
    let rank = target.rank();
    if source.rank() != rank {
        return Err(LoweringError::RankMismatch {
            op: "unselect",
            expected: rank,
            actual: source.rank(),
        });
    }
    if dim >= rank {
        return Err(LoweringError::DimensionOutOfRange {
            op: "unselect",
            dim,
            rank,
        });
    }
    if stride == 0 {
        return Err(LoweringError::InvalidWindow {
            reason: "stride must be at least 1".to_string(),
        });
    }
    if source.dtype() != target.dtype() {
        return Err(LoweringError::DTypeMismatch {
            op: "unselect",
            expected: target.dtype(),
            actual: source.dtype(),
        });
    }

    let extent = target.dims()[dim];
    let n = source.dims()[dim];
    if extent == n {
        if start != 0 || stride != 1 || end != extent {
            return Err(LoweringError::FullCoverageWindowMismatch {
                start,
                end,
                stride,
                extent,
            });
        }
        return Ok(source.clone());
    }

    for (axis, (&expected, &actual)) in target.dims().iter().zip(source.dims()).enumerate() {
        if axis != dim && expected != actual {
            return Err(LoweringError::ShapeMismatch {
                op: "unselect",
                axis,
                expected,
                actual,
            });
        }
    }

    let interior = stride - 1;
    let covered = n
        .saturating_sub(1)
        .checked_mul(interior)
        .and_then(|gaps| gaps.checked_add(n))
        .and_then(|span| span.checked_add(start));
    let Some(high) = covered.and_then(|covered| extent.checked_sub(covered)) else {
        return Err(LoweringError::InvalidWindow {
            reason: format!(
                "{n} elements from {start} with stride {stride} overrun extent {extent}"
            ),
        });
    };

    let mut config = PaddingConfig::zeros(rank);
    config.set(
        dim,
        PadDim {
            low: start,
            high,
            interior,
        },
    )?;

    let padded = builder.pad(source, &config, Literal::zero(source.dtype()))?;
    let ones = builder.broadcast_constant(DType::I1, Literal::I1(true), source.dims())?;
    let mask = builder.pad(&ones, &config, Literal::I1(false))?;
    builder.select(&mask, &padded, target)
}
