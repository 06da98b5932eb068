//! Errors raised while validating and lowering data movement ops.

use thiserror::Error;

use crate::backend::shape_helpers::checked_element_count_or_error;
use crate::backend::spec::{DType, ValueId};

/// Failure detected before any malformed instruction reaches the graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoweringError {
    #[error("only one dimension may be inferred, found -1 at positions {first} and {second}")]
    MultipleIncompleteDimensions { first: usize, second: usize },
    #[error("shape {requested:?} is invalid for input of shape {input:?}")]
    ShapeElementCountMismatch { requested: Vec<i64>, input: Vec<usize> },
    #[error("{op}: expected rank {expected}, got {actual}")]
    RankMismatch {
        op: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{op}: size mismatch on axis {axis}: expected {expected}, got {actual}")]
    ShapeMismatch {
        op: &'static str,
        axis: usize,
        expected: usize,
        actual: usize,
    },
    #[error("{op}: dimension {dim} is out of range for rank {rank}")]
    DimensionOutOfRange {
        op: &'static str,
        dim: usize,
        rank: usize,
    },
    #[error("{op}: window start {start} size {size} exceeds extent {extent} on axis {axis}")]
    SliceOutOfBounds {
        op: &'static str,
        axis: usize,
        start: usize,
        size: usize,
        extent: usize,
    },
    #[error(
        "full-coverage overwrite requires start 0, stride 1 and end {extent}; got start {start}, end {end}, stride {stride}"
    )]
    FullCoverageWindowMismatch {
        start: usize,
        end: usize,
        stride: usize,
        extent: usize,
    },
    #[error("split size {requested} at chunk {index} exceeds the remaining length {remaining}")]
    SplitSizeOverflow {
        index: usize,
        requested: usize,
        remaining: usize,
    },
    #[error("{op} requires at least one operand")]
    EmptyOperandList { op: &'static str },
    #[error("invalid window: {reason}")]
    InvalidWindow { reason: String },
    #[error("broadcast_in_dim: operand dim {operand} on axis {axis} cannot broadcast to {result}")]
    BroadcastIncompatible {
        axis: usize,
        operand: usize,
        result: usize,
    },
    #[error("{op}: {reason}")]
    InvalidAttribute { op: &'static str, reason: String },
    #[error("{op}: expected dtype {expected:?}, got {actual:?}")]
    DTypeMismatch {
        op: &'static str,
        expected: DType,
        actual: DType,
    },
    #[error("element count of {dims:?} overflows usize")]
    ElementCountOverflow { dims: Vec<usize> },
    #[error("value {0:?} was not issued by this builder")]
    UnknownValue(ValueId),
    #[error("literal {literal} cannot be encoded as {dtype:?}")]
    UnsupportedLiteral { dtype: DType, literal: String },
}

/// Convenience alias used throughout the lowering layer.
pub type LoweringResult<T> = Result<T, LoweringError>;

pub(crate) fn element_count(dims: &[usize]) -> LoweringResult<usize> {
    checked_element_count_or_error(dims, || LoweringError::ElementCountOverflow {
        dims: dims.to_vec(),
    })
}
