use std::collections::HashMap;
use std::sync::Arc;

use dataops_rs::backend::ptir_utils::tensor_spec_static;
use dataops_rs::backend::shape_helpers::{
    checked_element_count_or_error, contiguous_strides_or_error,
};
use dataops_rs::backend::spec::{
    BackendError, BackendResult, BroadcastInDimSpec, ConcatSpec, DType, DynamicUpdateSliceSpec,
    Instruction, Literal, Operand, Operation, PadSpec, PortableBackend, Program, SliceSpec,
    TensorInit, TensorLiteral, TensorSpec, ValueId,
};
use tracing::trace;

#[derive(Debug, Clone, PartialEq)]
pub struct CpuTensor {
    pub spec: TensorSpec,
    pub data: TensorData,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    F32(Arc<[f32]>),
    Si32(Arc<[i32]>),
    Bool(Arc<[u8]>),
}

impl CpuTensor {
    pub fn from_f32(dims: &[usize], values: Vec<f32>) -> BackendResult<Self> {
        Self::from_values(DType::F32, dims, values)
    }

    pub fn from_i32(dims: &[usize], values: Vec<i32>) -> BackendResult<Self> {
        Self::from_values(DType::Si32, dims, values)
    }

    pub fn from_bool(dims: &[usize], values: Vec<bool>) -> BackendResult<Self> {
        let bytes = values.into_iter().map(u8::from).collect::<Vec<_>>();
        Self::from_values(DType::I1, dims, bytes)
    }

    fn from_values<T: Element>(dtype: DType, dims: &[usize], values: Vec<T>) -> BackendResult<Self> {
        let expected = element_count(dims)?;
        if values.len() != expected {
            return Err(BackendError::execution(format!(
                "{} values supplied for shape {dims:?} ({expected} expected)",
                values.len()
            )));
        }
        Ok(Self {
            spec: tensor_spec_static(dtype, dims),
            data: T::wrap(values),
        })
    }

    pub fn dims(&self) -> &[usize] {
        self.spec.shape.dims()
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        f32::slice(&self.data)
    }

    pub fn as_i32(&self) -> Option<&[i32]> {
        i32::slice(&self.data)
    }

    /// Predicate payload, one byte (`0` or `1`) per element.
    pub fn as_bool(&self) -> Option<&[u8]> {
        u8::slice(&self.data)
    }
}

/// Host element types the interpreter stores natively. `u8` backs `I1` predicates.
trait Element: Copy + Default + Send + Sync + 'static {
    fn slice(data: &TensorData) -> Option<&[Self]>;
    fn wrap(values: Vec<Self>) -> TensorData;
    fn from_literal(literal: Literal) -> Option<Self>;
}

impl Element for f32 {
    fn slice(data: &TensorData) -> Option<&[Self]> {
        match data {
            TensorData::F32(values) => Some(values.as_ref()),
            _ => None,
        }
    }

    fn wrap(values: Vec<Self>) -> TensorData {
        TensorData::F32(Arc::from(values))
    }

    fn from_literal(literal: Literal) -> Option<Self> {
        match literal {
            Literal::Float(value) => Some(value as f32),
            _ => None,
        }
    }
}

impl Element for i32 {
    fn slice(data: &TensorData) -> Option<&[Self]> {
        match data {
            TensorData::Si32(values) => Some(values.as_ref()),
            _ => None,
        }
    }

    fn wrap(values: Vec<Self>) -> TensorData {
        TensorData::Si32(Arc::from(values))
    }

    fn from_literal(literal: Literal) -> Option<Self> {
        match literal {
            Literal::Signed(value) => i32::try_from(value).ok(),
            _ => None,
        }
    }
}

impl Element for u8 {
    fn slice(data: &TensorData) -> Option<&[Self]> {
        match data {
            TensorData::Bool(values) => Some(values.as_ref()),
            _ => None,
        }
    }

    fn wrap(values: Vec<Self>) -> TensorData {
        TensorData::Bool(Arc::from(values))
    }

    fn from_literal(literal: Literal) -> Option<Self> {
        match literal {
            Literal::I1(flag) => Some(u8::from(flag)),
            _ => None,
        }
    }
}

/// Reference interpreter for lowered programs. Supports `F32`, `Si32` and `I1` tensors.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuPortableBackend;

impl CpuPortableBackend {
    pub fn new() -> Self {
        Self
    }
}

impl PortableBackend for CpuPortableBackend {
    type TensorHandle = CpuTensor;

    fn backend_name(&self) -> &str {
        "cpu-portable"
    }

    fn materialize(&self, init: TensorInit) -> BackendResult<Self::TensorHandle> {
        match init {
            TensorInit::Literal(lit) => literal_to_tensor(&lit),
            TensorInit::Zeroed(spec) => zeroed_tensor(&spec),
        }
    }

    fn to_literal(&self, tensor: &Self::TensorHandle) -> BackendResult<TensorLiteral> {
        Ok(tensor_to_literal(tensor))
    }

    fn run_program(
        &self,
        program: &Program,
        entry_inputs: &[Self::TensorHandle],
    ) -> BackendResult<Vec<Self::TensorHandle>> {
        let function = program
            .entry_function()
            .ok_or_else(|| BackendError::execution("entry function not found"))?;

        if function.parameter_ids.len() != entry_inputs.len() {
            return Err(BackendError::execution(format!(
                "entry expects {} inputs, got {}",
                function.parameter_ids.len(),
                entry_inputs.len()
            )));
        }

        let mut values: HashMap<ValueId, CpuTensor> = HashMap::new();
        for ((param_id, spec), handle) in function
            .parameter_ids
            .iter()
            .zip(function.parameters.iter())
            .zip(entry_inputs.iter())
        {
            if &handle.spec != spec {
                return Err(BackendError::execution(format!(
                    "input for %{} has spec {:?}, expected {:?}",
                    param_id.0, handle.spec, spec
                )));
            }
            values.insert(*param_id, handle.clone());
        }

        for (instr_index, instruction) in function.body.iter().enumerate() {
            let mut inputs = Vec::with_capacity(instruction.operands.len());
            for operand in &instruction.operands {
                let tensor = match operand {
                    Operand::Value(id) => values
                        .get(id)
                        .cloned()
                        .ok_or_else(|| BackendError::execution("operand value missing"))?,
                };
                inputs.push(tensor);
            }
            trace!(
                index = instr_index,
                op = instruction.op.label(),
                value = instruction.id.0,
                "executing instruction"
            );
            let output = execute_operation(instruction, &inputs).map_err(|err| {
                augment_backend_error(err, &function.name, instr_index, instruction)
            })?;
            values.insert(instruction.id, output);
        }

        let mut results = Vec::with_capacity(function.result_ids.len());
        for id in &function.result_ids {
            let value = values
                .get(id)
                .cloned()
                .ok_or_else(|| BackendError::execution("missing function result value"))?;
            results.push(value);
        }
        Ok(results)
    }
}

fn literal_to_tensor(literal: &TensorLiteral) -> BackendResult<CpuTensor> {
    let data = match literal.spec.dtype {
        DType::F32 => TensorData::F32(Arc::from(bytes_to_f32(&literal.bytes)?)),
        DType::Si32 => TensorData::Si32(Arc::from(bytes_to_i32(&literal.bytes)?)),
        DType::I1 => TensorData::Bool(Arc::clone(&literal.bytes)),
        other => {
            return Err(BackendError::unimplemented(
                "constant",
                format!("literal dtype {other:?} unsupported"),
            ))
        }
    };
    let tensor = CpuTensor {
        spec: literal.spec.clone(),
        data,
    };
    if data_len(&tensor.data) != element_count(tensor.dims())? {
        return Err(BackendError::execution(
            "literal payload does not match its spec",
        ));
    }
    Ok(tensor)
}

fn zeroed_tensor(spec: &TensorSpec) -> BackendResult<CpuTensor> {
    let elem_count = element_count(spec.shape.dims())?;
    let data = match spec.dtype {
        DType::F32 => TensorData::F32(Arc::from(vec![0.0; elem_count])),
        DType::Si32 => TensorData::Si32(Arc::from(vec![0; elem_count])),
        DType::I1 => TensorData::Bool(Arc::from(vec![0; elem_count])),
        other => {
            return Err(BackendError::unimplemented(
                "materialize",
                format!("zero init dtype {other:?} unsupported"),
            ))
        }
    };
    Ok(CpuTensor {
        spec: spec.clone(),
        data,
    })
}

fn tensor_to_literal(tensor: &CpuTensor) -> TensorLiteral {
    match &tensor.data {
        TensorData::F32(values) => TensorLiteral::new(
            tensor.spec.clone(),
            values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        ),
        TensorData::Si32(values) => TensorLiteral::new(
            tensor.spec.clone(),
            values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        ),
        TensorData::Bool(values) => TensorLiteral::new(tensor.spec.clone(), Arc::clone(values)),
    }
}

fn execute_operation(instruction: &Instruction, inputs: &[CpuTensor]) -> BackendResult<CpuTensor> {
    if let Operation::Constant(literal) = &instruction.op {
        return literal_to_tensor(literal);
    }
    let output = &instruction.output;
    match output.dtype {
        DType::F32 => execute_typed::<f32>(&instruction.op, inputs, output),
        DType::Si32 => execute_typed::<i32>(&instruction.op, inputs, output),
        DType::I1 => execute_typed::<u8>(&instruction.op, inputs, output),
        other => Err(BackendError::unimplemented(
            instruction.op.label(),
            format!("dtype {other:?} unsupported in cpu portable backend"),
        )),
    }
}

fn execute_typed<T: Element>(
    op: &Operation,
    inputs: &[CpuTensor],
    output: &TensorSpec,
) -> BackendResult<CpuTensor> {
    let values = match op {
        Operation::Constant(_) => {
            return Err(BackendError::execution("constant has no typed kernel"))
        }
        Operation::Reshape(_) => op_reshape::<T>(inputs, output)?,
        Operation::BroadcastInDim(spec) => op_broadcast_in_dim::<T>(inputs, output, spec)?,
        Operation::Pad(spec) => op_pad::<T>(inputs, output, spec)?,
        Operation::Slice(spec) => op_slice::<T>(inputs, output, spec)?,
        Operation::Concat(spec) => op_concat::<T>(inputs, output, spec)?,
        Operation::Select => op_select::<T>(inputs)?,
        Operation::DynamicUpdateSlice(spec) => op_dynamic_update_slice::<T>(inputs, spec)?,
    };
    if values.len() != element_count(output.shape.dims())? {
        return Err(BackendError::execution(
            "kernel produced a buffer that does not match the output spec",
        ));
    }
    Ok(CpuTensor {
        spec: output.clone(),
        data: T::wrap(values),
    })
}

fn typed<T: Element>(tensor: &CpuTensor) -> BackendResult<&[T]> {
    T::slice(&tensor.data).ok_or_else(|| {
        BackendError::execution(format!(
            "operand dtype {:?} does not match the instruction",
            tensor.spec.dtype
        ))
    })
}

fn expect_single(inputs: &[CpuTensor]) -> BackendResult<&CpuTensor> {
    match inputs {
        [input] => Ok(input),
        _ => Err(BackendError::execution(format!(
            "expected one operand, got {}",
            inputs.len()
        ))),
    }
}

fn op_reshape<T: Element>(inputs: &[CpuTensor], output: &TensorSpec) -> BackendResult<Vec<T>> {
    let input = expect_single(inputs)?;
    if element_count(input.dims())? != element_count(output.shape.dims())? {
        return Err(BackendError::execution("reshape element count mismatch"));
    }
    Ok(typed::<T>(input)?.to_vec())
}

fn op_broadcast_in_dim<T: Element>(
    inputs: &[CpuTensor],
    output: &TensorSpec,
    spec: &BroadcastInDimSpec,
) -> BackendResult<Vec<T>> {
    let input = expect_single(inputs)?;
    let values = typed::<T>(input)?;
    let in_dims = input.dims();
    let out_dims = output.shape.dims();
    if spec.broadcast_dims.len() != in_dims.len() {
        return Err(BackendError::execution("broadcast_in_dim rank mismatch"));
    }
    let in_strides = strides(in_dims)?;
    let out_len = element_count(out_dims)?;

    let mut result = Vec::with_capacity(out_len);
    for idx in 0..out_len {
        let coord = unravel_index(idx, out_dims);
        let mut in_index = 0usize;
        for (axis, &target) in spec.broadcast_dims.iter().enumerate() {
            let c = *coord
                .get(target)
                .ok_or_else(|| BackendError::execution("broadcast_in_dim axis out of range"))?;
            if in_dims[axis] != 1 {
                in_index += c * in_strides[axis];
            }
        }
        result.push(values[in_index]);
    }
    Ok(result)
}

fn op_pad<T: Element>(
    inputs: &[CpuTensor],
    output: &TensorSpec,
    spec: &PadSpec,
) -> BackendResult<Vec<T>> {
    let input = expect_single(inputs)?;
    let values = typed::<T>(input)?;
    let in_dims = input.dims();
    let out_dims = output.shape.dims();
    let rank = in_dims.len();
    if spec.low.len() != rank || spec.high.len() != rank || spec.interior.len() != rank {
        return Err(BackendError::execution("pad config rank mismatch"));
    }
    let fill = T::from_literal(spec.pad_value)
        .ok_or_else(|| BackendError::execution("pad value does not match operand dtype"))?;
    let out_strides = strides(out_dims)?;

    let mut result = vec![fill; element_count(out_dims)?];
    for (idx, &value) in values.iter().enumerate() {
        let coord = unravel_index(idx, in_dims);
        let mut out_index = 0usize;
        for axis in 0..rank {
            let position = spec.low[axis] + coord[axis] * (spec.interior[axis] + 1);
            if position >= out_dims[axis] {
                return Err(BackendError::execution("pad writes past the output extent"));
            }
            out_index += position * out_strides[axis];
        }
        result[out_index] = value;
    }
    Ok(result)
}

fn op_slice<T: Element>(
    inputs: &[CpuTensor],
    output: &TensorSpec,
    spec: &SliceSpec,
) -> BackendResult<Vec<T>> {
    let input = expect_single(inputs)?;
    let values = typed::<T>(input)?;
    let in_dims = input.dims();
    let out_dims = output.shape.dims();
    if spec.starts.len() != in_dims.len() || out_dims.len() != in_dims.len() {
        return Err(BackendError::execution("slice rank mismatch"));
    }
    for axis in 0..in_dims.len() {
        if spec.starts[axis] + out_dims[axis] > in_dims[axis] {
            return Err(BackendError::execution("slice out of bounds"));
        }
    }
    let in_strides = strides(in_dims)?;
    let out_len = element_count(out_dims)?;

    let mut result = Vec::with_capacity(out_len);
    for idx in 0..out_len {
        let coord = unravel_index(idx, out_dims);
        let in_index = coord
            .iter()
            .enumerate()
            .map(|(axis, &c)| (spec.starts[axis] + c) * in_strides[axis])
            .sum::<usize>();
        result.push(values[in_index]);
    }
    Ok(result)
}

fn op_concat<T: Element>(
    inputs: &[CpuTensor],
    output: &TensorSpec,
    spec: &ConcatSpec,
) -> BackendResult<Vec<T>> {
    if inputs.is_empty() {
        return Err(BackendError::execution("concat expects at least one input"));
    }
    let out_dims = output.shape.dims();
    let axis = spec.axis;
    if axis >= out_dims.len() {
        return Err(BackendError::execution("concat axis out of range"));
    }
    let outer = out_dims[..axis].iter().product::<usize>();
    let inner = out_dims[axis + 1..].iter().product::<usize>();

    let mut chunks = Vec::with_capacity(inputs.len());
    let mut axis_total = 0usize;
    for tensor in inputs {
        let dims = tensor.dims();
        if dims.len() != out_dims.len() {
            return Err(BackendError::execution("concat rank mismatch"));
        }
        for (idx, (&dim, &out_dim)) in dims.iter().zip(out_dims).enumerate() {
            if idx != axis && dim != out_dim {
                return Err(BackendError::execution("concat dimension mismatch"));
            }
        }
        axis_total += dims[axis];
        chunks.push((dims[axis] * inner, typed::<T>(tensor)?));
    }
    if axis_total != out_dims[axis] {
        return Err(BackendError::execution(
            "concat inputs do not match output axis length",
        ));
    }

    let mut result = Vec::with_capacity(element_count(out_dims)?);
    for block in 0..outer {
        for &(chunk, values) in &chunks {
            result.extend_from_slice(&values[block * chunk..(block + 1) * chunk]);
        }
    }
    Ok(result)
}

fn op_select<T: Element>(inputs: &[CpuTensor]) -> BackendResult<Vec<T>> {
    let [pred, on_true, on_false] = inputs else {
        return Err(BackendError::execution("select expects three operands"));
    };
    let pred = typed::<u8>(pred)?;
    let on_true = typed::<T>(on_true)?;
    let on_false = typed::<T>(on_false)?;
    if pred.len() != on_true.len() || pred.len() != on_false.len() {
        return Err(BackendError::execution("select operand shapes differ"));
    }
    Ok(pred
        .iter()
        .zip(on_true.iter().zip(on_false.iter()))
        .map(|(&flag, (&t, &f))| if flag != 0 { t } else { f })
        .collect())
}

fn op_dynamic_update_slice<T: Element>(
    inputs: &[CpuTensor],
    spec: &DynamicUpdateSliceSpec,
) -> BackendResult<Vec<T>> {
    let [base, update, starts] = inputs else {
        return Err(BackendError::execution(
            "dynamic_update_slice expects (base, update, starts)",
        ));
    };
    let base_dims = base.dims();
    let update_dims = update.dims();
    if base_dims.len() != spec.sizes.len() || update_dims != spec.sizes.as_slice() {
        return Err(BackendError::execution(
            "dynamic_update_slice update shape mismatch",
        ));
    }
    let starts_vals = typed::<i32>(starts)?;
    if starts_vals.len() != base_dims.len() {
        return Err(BackendError::execution(
            "dynamic_update_slice starts must be 1-D of length equal to rank",
        ));
    }

    let mut clamped = Vec::with_capacity(base_dims.len());
    for axis in 0..base_dims.len() {
        let size = spec.sizes[axis];
        let max_start = base_dims[axis].checked_sub(size).ok_or_else(|| {
            BackendError::execution("dynamic_update_slice size exceeds dimension")
        })?;
        let start = usize::try_from(starts_vals[axis].max(0)).unwrap_or(0);
        clamped.push(start.min(max_start));
    }

    let mut result = typed::<T>(base)?.to_vec();
    let update_vals = typed::<T>(update)?;
    let base_strides = strides(base_dims)?;
    for (idx, &value) in update_vals.iter().enumerate() {
        let coord = unravel_index(idx, update_dims);
        let out_index = coord
            .iter()
            .enumerate()
            .map(|(axis, &c)| (clamped[axis] + c) * base_strides[axis])
            .sum::<usize>();
        result[out_index] = value;
    }
    Ok(result)
}

fn augment_backend_error(
    error: BackendError,
    function_name: &str,
    instruction_index: usize,
    instruction: &Instruction,
) -> BackendError {
    let context = format!(
        "at function `{}` instruction #{}, {} id {:?}",
        function_name,
        instruction_index,
        instruction.op.label(),
        instruction.id
    );
    match error {
        BackendError::Execution { message } => BackendError::Execution {
            message: format!("{message} ({context})"),
        },
        BackendError::Unimplemented { op, reason } => BackendError::Unimplemented {
            op,
            reason: format!("{reason} (while executing {context})"),
        },
    }
}

fn data_len(data: &TensorData) -> usize {
    match data {
        TensorData::F32(values) => values.len(),
        TensorData::Si32(values) => values.len(),
        TensorData::Bool(values) => values.len(),
    }
}

fn element_count(dims: &[usize]) -> BackendResult<usize> {
    checked_element_count_or_error(dims, || {
        BackendError::execution(format!("element count of {dims:?} overflows"))
    })
}

fn strides(dims: &[usize]) -> BackendResult<Vec<usize>> {
    contiguous_strides_or_error(dims, || {
        BackendError::execution(format!("strides of {dims:?} overflow"))
    })
}

fn unravel_index(mut index: usize, dims: &[usize]) -> Vec<usize> {
    let mut coords = vec![0; dims.len()];
    for (i, dim) in dims.iter().enumerate().rev() {
        coords[i] = index % *dim;
        index /= *dim;
    }
    coords
}

fn bytes_to_f32(bytes: &[u8]) -> BackendResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(BackendError::execution(
            "literal byte length mismatches f32",
        ));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

fn bytes_to_i32(bytes: &[u8]) -> BackendResult<Vec<i32>> {
    if bytes.len() % 4 != 0 {
        return Err(BackendError::execution(
            "literal byte length mismatches i32",
        ));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
