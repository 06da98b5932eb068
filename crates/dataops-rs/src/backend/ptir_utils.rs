use std::sync::Arc;

use crate::backend::spec::{DType, Literal, Shape, TensorLiteral, TensorSpec};

/// Builds a static backend shape descriptor from explicit dimensions.
pub fn shape_static(dims: &[usize]) -> Shape {
    Shape::new(dims.to_vec())
}

/// Builds a tensor spec with fully static dimensions.
pub fn tensor_spec_static(dtype: DType, dims: &[usize]) -> TensorSpec {
    TensorSpec::new(dtype, shape_static(dims))
}

/// Creates a 1-D `Si32` literal holding `values`.
pub fn tensor_literal_si32(values: &[i32]) -> TensorLiteral {
    let bytes = values
        .iter()
        .flat_map(|value| value.to_le_bytes())
        .collect::<Vec<u8>>();
    TensorLiteral::new(
        tensor_spec_static(DType::Si32, &[values.len()]),
        Arc::<[u8]>::from(bytes),
    )
}

/// Repeats one encoded `literal` across every element of `dims`.
///
/// Returns `None` when the literal does not encode as `dtype` or the size overflows.
pub fn tensor_literal_splat(dtype: DType, literal: Literal, dims: &[usize]) -> Option<TensorLiteral> {
    let element = literal.encode(dtype)?;
    let spec = tensor_spec_static(dtype, dims);
    let count = spec.element_count()?;
    let mut bytes = Vec::with_capacity(count.checked_mul(element.len())?);
    for _ in 0..count {
        bytes.extend_from_slice(&element);
    }
    Some(TensorLiteral::new(spec, Arc::<[u8]>::from(bytes)))
}

/// Creates a rank-0 literal.
pub fn tensor_literal_scalar(dtype: DType, literal: Literal) -> Option<TensorLiteral> {
    tensor_literal_splat(dtype, literal, &[])
}
