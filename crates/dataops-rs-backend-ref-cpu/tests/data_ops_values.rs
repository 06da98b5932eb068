use anyhow::{anyhow, Result};
use dataops_rs::backend::ptir_utils::tensor_spec_static;
use dataops_rs::backend::spec::{DType, PortableBackend, TensorInit};
use dataops_rs::ops::data::{
    concat, expand, repeat, resize, split, squeeze_dim, unselect, unsqueeze, update_slice, view,
};
use dataops_rs::{GraphBuilder, LoweringOptions, Node};
use dataops_rs_backend_ref_cpu::{CpuPortableBackend, CpuTensor};
use proptest::prelude::*;

/// Declares one `F32` parameter per input, lowers with `lower`, and runs the program.
fn run_f32<F>(inputs: &[(Vec<usize>, Vec<f32>)], lower: F) -> Result<Vec<CpuTensor>>
where
    F: FnOnce(&mut GraphBuilder, &[Node]) -> Result<Vec<Node>>,
{
    let mut builder = GraphBuilder::with_options(LoweringOptions::default());
    let mut params = Vec::with_capacity(inputs.len());
    let mut tensors = Vec::with_capacity(inputs.len());
    for (dims, values) in inputs {
        params.push(builder.parameter(tensor_spec_static(DType::F32, dims)));
        tensors.push(CpuTensor::from_f32(dims, values.clone())?);
    }
    let outputs = lower(&mut builder, &params)?;
    let program = builder.finish("main", &outputs)?;
    Ok(CpuPortableBackend::new().run_program(&program, &tensors)?)
}

fn values(tensor: &CpuTensor) -> Result<Vec<f32>> {
    tensor
        .as_f32()
        .map(<[f32]>::to_vec)
        .ok_or_else(|| anyhow!("expected f32 tensor"))
}

fn iota(count: usize) -> Vec<f32> {
    (0..count).map(|v| v as f32).collect()
}

#[test]
fn unselect_overwrites_strided_positions() -> Result<()> {
    let out = run_f32(
        &[(vec![5], vec![1.0, 2.0, 3.0, 4.0, 5.0]), (vec![2], vec![9.0, 9.0])],
        |b, p| Ok(vec![unselect(b, &p[0], &p[1], 0, 1, 4, 2)?]),
    )?;
    assert_eq!(values(&out[0])?, vec![1.0, 9.0, 3.0, 9.0, 5.0]);
    Ok(())
}

#[test]
fn unselect_into_zeros_matches_reference_pattern() -> Result<()> {
    let out = run_f32(
        &[(vec![5], vec![0.0; 5]), (vec![2], vec![9.0, 9.0])],
        |b, p| Ok(vec![unselect(b, &p[0], &p[1], 0, 1, 4, 2)?]),
    )?;
    assert_eq!(values(&out[0])?, vec![0.0, 9.0, 0.0, 9.0, 0.0]);
    Ok(())
}

#[test]
fn unselect_along_inner_axis_keeps_rows() -> Result<()> {
    let out = run_f32(
        &[(vec![2, 4], vec![0.0; 8]), (vec![2, 2], vec![1.0, 2.0, 3.0, 4.0])],
        |b, p| Ok(vec![unselect(b, &p[0], &p[1], 1, 0, 4, 3)?]),
    )?;
    assert_eq!(
        values(&out[0])?,
        vec![1.0, 0.0, 0.0, 2.0, 3.0, 0.0, 0.0, 4.0]
    );
    Ok(())
}

#[test]
fn repeat_tiles_rows() -> Result<()> {
    let out = run_f32(&[(vec![2, 3], iota(6))], |b, p| {
        Ok(vec![repeat(b, &p[0], &[2, 1])?])
    })?;
    assert_eq!(out[0].dims(), &[4, 3]);
    let data = values(&out[0])?;
    assert_eq!(data[..6], data[6..]);
    Ok(())
}

#[test]
fn repeat_with_leading_axis_broadcasts_copies() -> Result<()> {
    let out = run_f32(&[(vec![2], vec![1.0, 2.0])], |b, p| {
        Ok(vec![repeat(b, &p[0], &[2, 2])?])
    })?;
    assert_eq!(out[0].dims(), &[2, 4]);
    assert_eq!(
        values(&out[0])?,
        vec![1.0, 2.0, 1.0, 2.0, 1.0, 2.0, 1.0, 2.0]
    );
    Ok(())
}

#[test]
fn view_with_wildcard_preserves_order() -> Result<()> {
    let out = run_f32(&[(vec![12], iota(12))], |b, p| {
        Ok(vec![view(b, &p[0], &[-1, 4])?])
    })?;
    assert_eq!(out[0].dims(), &[3, 4]);
    assert_eq!(values(&out[0])?, iota(12));
    Ok(())
}

#[test]
fn split_then_concat_reconstructs_input() -> Result<()> {
    let input = iota(14);
    let out = run_f32(&[(vec![2, 7], input.clone())], |b, p| {
        let chunks = split(b, &p[0], &[2, 3, 2], 1)?;
        Ok(vec![concat(b, &chunks, 1)?])
    })?;
    assert_eq!(out[0].dims(), &[2, 7]);
    assert_eq!(values(&out[0])?, input);
    Ok(())
}

#[test]
fn split_chunks_hold_consecutive_columns() -> Result<()> {
    let out = run_f32(&[(vec![2, 3], iota(6))], |b, p| {
        Ok(split(b, &p[0], &[1, 2], 1)?)
    })?;
    assert_eq!(values(&out[0])?, vec![0.0, 3.0]);
    assert_eq!(values(&out[1])?, vec![1.0, 2.0, 4.0, 5.0]);
    Ok(())
}

#[test]
fn concat_is_associative() -> Result<()> {
    let inputs: [(Vec<usize>, Vec<f32>); 3] = [
        (vec![2, 1], vec![1.0, 2.0]),
        (vec![2, 2], vec![3.0, 4.0, 5.0, 6.0]),
        (vec![2, 1], vec![7.0, 8.0]),
    ];
    let out = run_f32(&inputs, |b, p| {
        let flat = concat(b, p, 1)?;
        let left = concat(b, &p[..2], 1)?;
        let left = concat(b, &[left, p[2].clone()], 1)?;
        let right = concat(b, &p[1..], 1)?;
        let right = concat(b, &[p[0].clone(), right], 1)?;
        Ok(vec![flat, left, right])
    })?;
    let expected = vec![1.0, 3.0, 4.0, 7.0, 2.0, 5.0, 6.0, 8.0];
    for tensor in &out {
        assert_eq!(values(tensor)?, expected);
    }
    Ok(())
}

#[test]
fn resize_to_same_count_is_identity_on_elements() -> Result<()> {
    let out = run_f32(&[(vec![2, 3], iota(6))], |b, p| {
        Ok(vec![resize(b, &p[0], &[3, 2])?])
    })?;
    assert_eq!(values(&out[0])?, iota(6));
    Ok(())
}

#[test]
fn resize_grow_then_shrink_recovers_prefix() -> Result<()> {
    let out = run_f32(&[(vec![2, 2], vec![1.0, 2.0, 3.0, 4.0])], |b, p| {
        let grown = resize(b, &p[0], &[3, 3])?;
        let shrunk = resize(b, &grown, &[2, 2])?;
        Ok(vec![grown, shrunk])
    })?;
    assert_eq!(
        values(&out[0])?,
        vec![1.0, 2.0, 3.0, 4.0, 0.0, 0.0, 0.0, 0.0, 0.0]
    );
    assert_eq!(values(&out[1])?, vec![1.0, 2.0, 3.0, 4.0]);
    Ok(())
}

#[test]
fn expand_replicates_values() -> Result<()> {
    let out = run_f32(&[(vec![3], vec![1.0, 2.0, 3.0])], |b, p| {
        Ok(vec![expand(b, &p[0], &[2, 3])?])
    })?;
    assert_eq!(out[0].dims(), &[2, 3]);
    assert_eq!(values(&out[0])?, vec![1.0, 2.0, 3.0, 1.0, 2.0, 3.0]);
    Ok(())
}

#[test]
fn squeeze_then_unsqueeze_restores_data() -> Result<()> {
    let input = iota(6);
    let out = run_f32(&[(vec![2, 1, 3], input.clone())], |b, p| {
        let squeezed = squeeze_dim(b, &p[0], 1)?;
        Ok(vec![unsqueeze(b, &squeezed, 1)?])
    })?;
    assert_eq!(out[0].dims(), &[2, 1, 3]);
    assert_eq!(values(&out[0])?, input);
    Ok(())
}

#[test]
fn update_slice_writes_window() -> Result<()> {
    let out = run_f32(&[(vec![3, 3], vec![0.0; 9]), (vec![2], vec![7.0, 8.0])], |b, p| {
        Ok(vec![update_slice(b, &p[0], &p[1], &[2, 1])?])
    })?;
    assert_eq!(
        values(&out[0])?,
        vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 7.0, 8.0]
    );
    Ok(())
}

#[test]
fn integer_inputs_resize_with_integer_zero() -> Result<()> {
    let mut builder = GraphBuilder::with_options(LoweringOptions::default());
    let x = builder.parameter(tensor_spec_static(DType::Si32, &[3]));
    let out = resize(&mut builder, &x, &[5])?;
    let program = builder.finish("main", &[out])?;
    let backend = CpuPortableBackend::new();
    let input = CpuTensor::from_i32(&[3], vec![4, 5, 6])?;
    let result = backend.run_program(&program, &[input])?;
    assert_eq!(result[0].as_i32(), Some(&[4, 5, 6, 0, 0][..]));
    Ok(())
}

#[test]
fn materialize_and_to_literal_round_trip() -> Result<()> {
    let backend = CpuPortableBackend::new();
    let zeros = backend.materialize(TensorInit::Zeroed(tensor_spec_static(DType::I1, &[2, 2])))?;
    assert_eq!(zeros.as_bool(), Some(&[0u8, 0, 0, 0][..]));

    let tensor = CpuTensor::from_f32(&[2], vec![1.5, -2.0])?;
    let literal = backend.to_literal(&tensor)?;
    let restored = backend.materialize(TensorInit::Literal(literal))?;
    assert_eq!(restored, tensor);
    assert_eq!(backend.backend_name(), "cpu-portable");
    Ok(())
}

#[test]
fn run_program_rejects_wrong_arity() -> Result<()> {
    let mut builder = GraphBuilder::with_options(LoweringOptions::default());
    let x = builder.parameter(tensor_spec_static(DType::F32, &[2]));
    let program = builder.finish("main", &[x])?;
    let err = CpuPortableBackend::new()
        .run_program(&program, &[])
        .expect_err("one input expected");
    assert!(err.to_string().contains("entry expects 1 inputs"));
    Ok(())
}

proptest! {
    #[test]
    fn split_then_concat_reconstructs_any_partition(
        rows in 1usize..4,
        sizes in prop::collection::vec(1usize..4, 1..5),
    ) {
        let cols: usize = sizes.iter().sum();
        let input = iota(rows * cols);
        let out = run_f32(&[(vec![rows, cols], input.clone())], |b, p| {
            let chunks = split(b, &p[0], &sizes, 1)?;
            Ok(vec![concat(b, &chunks, 1)?])
        })
        .expect("split and concat lower");
        prop_assert_eq!(out[0].dims(), &[rows, cols]);
        prop_assert_eq!(values(&out[0]).expect("f32 output"), input);
    }

    #[test]
    fn resize_grow_then_shrink_recovers_any_prefix(
        dims in prop::collection::vec(1usize..4, 1..4),
        extra in 0usize..6,
    ) {
        let count: usize = dims.iter().product();
        let input = iota(count);
        let out = run_f32(&[(dims.clone(), input.clone())], |b, p| {
            let grown = resize(b, &p[0], &[count + extra])?;
            let shrunk = resize(b, &grown, &dims)?;
            Ok(vec![grown, shrunk])
        })
        .expect("resize lowers");
        let grown = values(&out[0]).expect("f32 output");
        prop_assert_eq!(&grown[..count], input.as_slice());
        prop_assert!(grown[count..].iter().all(|&v| v == 0.0));
        prop_assert_eq!(out[1].dims(), dims.as_slice());
        prop_assert_eq!(values(&out[1]).expect("f32 output"), input);
    }
}
