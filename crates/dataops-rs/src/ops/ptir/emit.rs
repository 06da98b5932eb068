//! Validated primitive emitters.
//!
//! Each method checks the primitive's contract against the operand specs recorded in the
//! builder, then appends exactly one instruction. Nothing is emitted when a check fails.

use tracing::trace;

use crate::backend::ptir_utils::{tensor_literal_scalar, tensor_spec_static};
use crate::backend::spec::{
    BroadcastInDimSpec, ConcatSpec, DType, DynamicUpdateSliceSpec, Literal, Operand, Operation,
    ReshapeSpec, Shape, SliceSpec, TensorLiteral, TensorSpec,
};
use crate::ops::error::{element_count, LoweringError, LoweringResult};
use crate::ops::graph::{GraphBuilder, Node};

use super::axes::strictly_increasing;
use super::padding::PaddingConfig;

impl GraphBuilder {
    fn emit_node(&mut self, op: Operation, operands: Vec<Operand>, spec: TensorSpec) -> Node {
        let label = op.label();
        let value = self.emit(op, operands, spec.clone());
        trace!(
            value = value.0,
            op = label,
            dtype = ?spec.dtype,
            dims = ?spec.shape.dims(),
            "emitted primitive"
        );
        Node::new(value, spec)
    }

    /// Emits a dense constant. The payload length must match the literal spec.
    pub fn constant(&mut self, literal: TensorLiteral) -> LoweringResult<Node> {
        let expected = literal
            .spec
            .byte_len()
            .ok_or_else(|| LoweringError::ElementCountOverflow {
                dims: literal.spec.shape.dims().to_vec(),
            })?;
        if literal.byte_len() != expected {
            return Err(LoweringError::InvalidAttribute {
                op: "constant",
                reason: format!(
                    "payload holds {} bytes but the spec requires {expected}",
                    literal.byte_len()
                ),
            });
        }
        let spec = literal.spec.clone();
        Ok(self.emit_node(Operation::Constant(literal), Vec::new(), spec))
    }

    /// Emits a rank-0 constant holding `value`.
    pub fn scalar_constant(&mut self, dtype: DType, value: Literal) -> LoweringResult<Node> {
        let literal =
            tensor_literal_scalar(dtype, value).ok_or_else(|| LoweringError::UnsupportedLiteral {
                dtype,
                literal: format!("{value:?}"),
            })?;
        self.constant(literal)
    }

    /// Emits `value` replicated over `dims` as a scalar constant plus a broadcast.
    pub fn broadcast_constant(
        &mut self,
        dtype: DType,
        value: Literal,
        dims: &[usize],
    ) -> LoweringResult<Node> {
        let scalar = self.scalar_constant(dtype, value)?;
        self.broadcast_in_dim(&scalar, dims, &[])
    }

    /// Reinterprets `input` with `dims`; element counts must agree.
    pub fn reshape(&mut self, input: &Node, dims: &[usize]) -> LoweringResult<Node> {
        self.ensure_known(input)?;
        let source = element_count(input.dims())?;
        let target = element_count(dims)?;
        if source != target {
            return Err(LoweringError::ShapeElementCountMismatch {
                requested: dims.iter().map(|&dim| dim as i64).collect(),
                input: input.dims().to_vec(),
            });
        }
        let spec = tensor_spec_static(input.dtype(), dims);
        Ok(self.emit_node(
            Operation::Reshape(ReshapeSpec {
                new_shape: dims.to_vec(),
            }),
            vec![Operand::Value(input.id())],
            spec,
        ))
    }

    /// Maps operand axis `i` to result axis `broadcast_dims[i]` and replicates the rest.
    pub fn broadcast_in_dim(
        &mut self,
        input: &Node,
        result_dims: &[usize],
        broadcast_dims: &[usize],
    ) -> LoweringResult<Node> {
        self.ensure_known(input)?;
        if broadcast_dims.len() != input.rank() {
            return Err(LoweringError::RankMismatch {
                op: "broadcast_in_dim",
                expected: input.rank(),
                actual: broadcast_dims.len(),
            });
        }
        if !strictly_increasing(broadcast_dims) {
            return Err(LoweringError::InvalidAttribute {
                op: "broadcast_in_dim",
                reason: format!("broadcast dims {broadcast_dims:?} must be strictly increasing"),
            });
        }
        for (axis, (&operand, &target)) in input.dims().iter().zip(broadcast_dims).enumerate() {
            let Some(&result) = result_dims.get(target) else {
                return Err(LoweringError::DimensionOutOfRange {
                    op: "broadcast_in_dim",
                    dim: target,
                    rank: result_dims.len(),
                });
            };
            if operand != 1 && operand != result {
                return Err(LoweringError::BroadcastIncompatible {
                    axis,
                    operand,
                    result,
                });
            }
        }
        element_count(result_dims)?;

        let spec = tensor_spec_static(input.dtype(), result_dims);
        Ok(self.emit_node(
            Operation::BroadcastInDim(BroadcastInDimSpec {
                result_shape: Shape::new(result_dims.to_vec()),
                broadcast_dims: broadcast_dims.to_vec(),
            }),
            vec![Operand::Value(input.id())],
            spec,
        ))
    }

    /// Pads `input` per `config`, filling new positions with `value`.
    pub fn pad(
        &mut self,
        input: &Node,
        config: &PaddingConfig,
        value: Literal,
    ) -> LoweringResult<Node> {
        self.ensure_known(input)?;
        let dims = config.padded_dims(input.dims())?;
        if value.encode(input.dtype()).is_none() {
            return Err(LoweringError::UnsupportedLiteral {
                dtype: input.dtype(),
                literal: format!("{value:?}"),
            });
        }
        element_count(&dims)?;
        let spec = tensor_spec_static(input.dtype(), &dims);
        Ok(self.emit_node(
            Operation::Pad(config.to_spec(value)),
            vec![Operand::Value(input.id())],
            spec,
        ))
    }

    /// Extracts the unit-stride window `[starts, starts + sizes)`.
    pub fn slice(&mut self, input: &Node, starts: &[usize], sizes: &[usize]) -> LoweringResult<Node> {
        self.ensure_known(input)?;
        let rank = input.rank();
        for len in [starts.len(), sizes.len()] {
            if len != rank {
                return Err(LoweringError::RankMismatch {
                    op: "slice",
                    expected: rank,
                    actual: len,
                });
            }
        }
        check_window("slice", input.dims(), starts, sizes)?;

        let spec = tensor_spec_static(input.dtype(), sizes);
        Ok(self.emit_node(
            Operation::Slice(SliceSpec {
                starts: starts.to_vec(),
                sizes: sizes.to_vec(),
            }),
            vec![Operand::Value(input.id())],
            spec,
        ))
    }

    /// Concatenates `inputs` along `axis` in order.
    pub fn concat(&mut self, inputs: &[Node], axis: usize) -> LoweringResult<Node> {
        let Some(first) = inputs.first() else {
            return Err(LoweringError::EmptyOperandList { op: "concat" });
        };
        let rank = first.rank();
        if axis >= rank {
            return Err(LoweringError::DimensionOutOfRange {
                op: "concat",
                dim: axis,
                rank,
            });
        }

        let mut dims = first.dims().to_vec();
        dims[axis] = 0;
        for input in inputs {
            self.ensure_known(input)?;
            if input.dtype() != first.dtype() {
                return Err(LoweringError::DTypeMismatch {
                    op: "concat",
                    expected: first.dtype(),
                    actual: input.dtype(),
                });
            }
            if input.rank() != rank {
                return Err(LoweringError::RankMismatch {
                    op: "concat",
                    expected: rank,
                    actual: input.rank(),
                });
            }
            for (other, (&expected, &actual)) in first.dims().iter().zip(input.dims()).enumerate()
            {
                if other != axis && expected != actual {
                    return Err(LoweringError::ShapeMismatch {
                        op: "concat",
                        axis: other,
                        expected,
                        actual,
                    });
                }
            }
            dims[axis] = dims[axis].checked_add(input.dims()[axis]).ok_or_else(|| {
                LoweringError::ElementCountOverflow {
                    dims: input.dims().to_vec(),
                }
            })?;
        }
        element_count(&dims)?;

        let spec = tensor_spec_static(first.dtype(), &dims);
        let operands = inputs
            .iter()
            .map(|input| Operand::Value(input.id()))
            .collect();
        Ok(self.emit_node(Operation::Concat(ConcatSpec { axis }), operands, spec))
    }

    /// Picks `on_true` where `predicate` holds and `on_false` elsewhere.
    pub fn select(
        &mut self,
        predicate: &Node,
        on_true: &Node,
        on_false: &Node,
    ) -> LoweringResult<Node> {
        for node in [predicate, on_true, on_false] {
            self.ensure_known(node)?;
        }
        if predicate.dtype() != DType::I1 {
            return Err(LoweringError::DTypeMismatch {
                op: "select",
                expected: DType::I1,
                actual: predicate.dtype(),
            });
        }
        if on_true.dtype() != on_false.dtype() {
            return Err(LoweringError::DTypeMismatch {
                op: "select",
                expected: on_true.dtype(),
                actual: on_false.dtype(),
            });
        }
        check_same_dims("select", predicate.dims(), on_true.dims())?;
        check_same_dims("select", predicate.dims(), on_false.dims())?;

        let spec = on_true.spec().clone();
        Ok(self.emit_node(
            Operation::Select,
            vec![
                Operand::Value(predicate.id()),
                Operand::Value(on_true.id()),
                Operand::Value(on_false.id()),
            ],
            spec,
        ))
    }

    /// Overwrites the window of `base` starting at `starts` with `update`.
    ///
    /// `starts` must be a 1-D `Si32` value holding one index per axis of `base`.
    pub fn dynamic_update_slice(
        &mut self,
        base: &Node,
        update: &Node,
        starts: &Node,
    ) -> LoweringResult<Node> {
        for node in [base, update, starts] {
            self.ensure_known(node)?;
        }
        let rank = base.rank();
        if starts.dtype() != DType::Si32 {
            return Err(LoweringError::DTypeMismatch {
                op: "dynamic_update_slice",
                expected: DType::Si32,
                actual: starts.dtype(),
            });
        }
        if starts.dims() != [rank] {
            return Err(LoweringError::InvalidAttribute {
                op: "dynamic_update_slice",
                reason: format!(
                    "start indices must have shape [{rank}], got {:?}",
                    starts.dims()
                ),
            });
        }
        if update.rank() != rank {
            return Err(LoweringError::RankMismatch {
                op: "dynamic_update_slice",
                expected: rank,
                actual: update.rank(),
            });
        }
        if update.dtype() != base.dtype() {
            return Err(LoweringError::DTypeMismatch {
                op: "dynamic_update_slice",
                expected: base.dtype(),
                actual: update.dtype(),
            });
        }
        let zeros = vec![0usize; rank];
        check_window("dynamic_update_slice", base.dims(), &zeros, update.dims())?;

        let spec = base.spec().clone();
        Ok(self.emit_node(
            Operation::DynamicUpdateSlice(DynamicUpdateSliceSpec {
                sizes: update.dims().to_vec(),
            }),
            vec![
                Operand::Value(base.id()),
                Operand::Value(update.id()),
                Operand::Value(starts.id()),
            ],
            spec,
        ))
    }
}

/// Checks `starts[i] + sizes[i] <= extents[i]` on every axis.
pub(crate) fn check_window(
    op: &'static str,
    extents: &[usize],
    starts: &[usize],
    sizes: &[usize],
) -> LoweringResult<()> {
    for (axis, ((&extent, &start), &size)) in extents.iter().zip(starts).zip(sizes).enumerate() {
        let fits = start.checked_add(size).is_some_and(|end| end <= extent);
        if !fits {
            return Err(LoweringError::SliceOutOfBounds {
                op,
                axis,
                start,
                size,
                extent,
            });
        }
    }
    Ok(())
}

fn check_same_dims(op: &'static str, expected: &[usize], actual: &[usize]) -> LoweringResult<()> {
    if expected.len() != actual.len() {
        return Err(LoweringError::RankMismatch {
            op,
            expected: expected.len(),
            actual: actual.len(),
        });
    }
    for (axis, (&expected, &actual)) in expected.iter().zip(actual).enumerate() {
        if expected != actual {
            return Err(LoweringError::ShapeMismatch {
                op,
                axis,
                expected,
                actual,
            });
        }
    }
    Ok(())
}
