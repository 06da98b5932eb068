use std::{fmt, fs, io, path::Path, sync::Arc};

use half::{bf16, f16};
use serde::{ser::SerializeStruct, Deserialize, Serialize};
use thiserror::Error;

/// Frozen program format version enforced by this interface.
pub const SPEC_VERSION: &str = "dataops.v0.1";

fn default_spec_version() -> String {
    SPEC_VERSION.to_string()
}

/// Enumerates scalar element types understood by the program contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum DType {
    I1,
    Si8,
    Ui8,
    Si16,
    Ui16,
    Si32,
    Ui32,
    Si64,
    Ui64,
    Bf16,
    F16,
    F32,
    F64,
}

impl DType {
    pub fn is_signed_integer(self) -> bool {
        matches!(self, DType::Si8 | DType::Si16 | DType::Si32 | DType::Si64)
    }

    pub fn is_unsigned_integer(self) -> bool {
        matches!(self, DType::Ui8 | DType::Ui16 | DType::Ui32 | DType::Ui64)
    }

    /// Returns the storage size of one element. Predicates occupy a full byte.
    pub fn size_in_bytes(self) -> usize {
        match self {
            DType::I1 | DType::Si8 | DType::Ui8 => 1,
            DType::Si16 | DType::Ui16 | DType::Bf16 | DType::F16 => 2,
            DType::Si32 | DType::Ui32 | DType::F32 => 4,
            DType::Si64 | DType::Ui64 | DType::F64 => 8,
        }
    }
}

/// Logical tensor shape as an ordered list of static extents.
///
/// Rank 0 is a scalar and holds exactly one element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    pub fn new(dims: impl Into<Vec<usize>>) -> Self {
        Self { dims: dims.into() }
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Returns the element count, or `None` when the product overflows.
    pub fn element_count(&self) -> Option<usize> {
        self.dims
            .iter()
            .try_fold(1usize, |count, dim| count.checked_mul(*dim))
    }
}

/// Tensor metadata coupling dtype and shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TensorSpec {
    pub dtype: DType,
    pub shape: Shape,
}

impl TensorSpec {
    pub fn new(dtype: DType, shape: Shape) -> Self {
        Self { dtype, shape }
    }

    pub fn element_count(&self) -> Option<usize> {
        self.shape.element_count()
    }

    /// Returns total byte length of a dense buffer holding this spec.
    pub fn byte_len(&self) -> Option<usize> {
        self.element_count()?.checked_mul(self.dtype.size_in_bytes())
    }
}

/// Scalar literal used for attributes (e.g., padding values).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    I1(bool),
    Signed(i64),
    Unsigned(u64),
    Float(f64),
}

impl Literal {
    /// The additive identity of `dtype` (`false` for predicates).
    pub fn zero(dtype: DType) -> Self {
        if dtype == DType::I1 {
            Literal::I1(false)
        } else if dtype.is_signed_integer() {
            Literal::Signed(0)
        } else if dtype.is_unsigned_integer() {
            Literal::Unsigned(0)
        } else {
            Literal::Float(0.0)
        }
    }

    /// Encodes the literal as one little-endian element of `dtype`.
    ///
    /// Returns `None` when the literal kind does not belong to `dtype` or the value does not fit.
    pub fn encode(&self, dtype: DType) -> Option<Vec<u8>> {
        let bytes = match (dtype, *self) {
            (DType::I1, Literal::I1(flag)) => vec![u8::from(flag)],
            (DType::Si8, Literal::Signed(v)) => i8::try_from(v).ok()?.to_le_bytes().to_vec(),
            (DType::Si16, Literal::Signed(v)) => i16::try_from(v).ok()?.to_le_bytes().to_vec(),
            (DType::Si32, Literal::Signed(v)) => i32::try_from(v).ok()?.to_le_bytes().to_vec(),
            (DType::Si64, Literal::Signed(v)) => v.to_le_bytes().to_vec(),
            (DType::Ui8, Literal::Unsigned(v)) => u8::try_from(v).ok()?.to_le_bytes().to_vec(),
            (DType::Ui16, Literal::Unsigned(v)) => u16::try_from(v).ok()?.to_le_bytes().to_vec(),
            (DType::Ui32, Literal::Unsigned(v)) => u32::try_from(v).ok()?.to_le_bytes().to_vec(),
            (DType::Ui64, Literal::Unsigned(v)) => v.to_le_bytes().to_vec(),
            (DType::Bf16, Literal::Float(v)) => bf16::from_f64(v).to_bits().to_le_bytes().to_vec(),
            (DType::F16, Literal::Float(v)) => f16::from_f64(v).to_bits().to_le_bytes().to_vec(),
            (DType::F32, Literal::Float(v)) => (v as f32).to_le_bytes().to_vec(),
            (DType::F64, Literal::Float(v)) => v.to_le_bytes().to_vec(),
            _ => return None,
        };
        Some(bytes)
    }
}

/// Dense literal tensor payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorLiteral {
    pub spec: TensorSpec,
    pub bytes: Arc<[u8]>,
}

impl TensorLiteral {
    pub fn new(spec: TensorSpec, bytes: Arc<[u8]>) -> Self {
        Self { spec, bytes }
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }
}

impl Serialize for TensorLiteral {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("TensorLiteral", 2)?;
        state.serialize_field("spec", &self.spec)?;
        state.serialize_field("bytes", &self.bytes.as_ref())?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for TensorLiteral {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct TensorLiteralHelper {
            spec: TensorSpec,
            bytes: Vec<u8>,
        }

        let helper = TensorLiteralHelper::deserialize(deserializer)?;
        Ok(TensorLiteral {
            spec: helper.spec,
            bytes: Arc::<[u8]>::from(helper.bytes),
        })
    }
}

/// Initialization payload when materialising tensors on a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TensorInit {
    Literal(TensorLiteral),
    Zeroed(TensorSpec),
}

/// Attribute payload for `reshape`. Dimensions are always fully resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReshapeSpec {
    pub new_shape: Vec<usize>,
}

/// Attribute payload for `broadcast_in_dim`.
///
/// Operand axis `i` maps to result axis `broadcast_dims[i]`; every other result axis is
/// replicated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BroadcastInDimSpec {
    pub result_shape: Shape,
    pub broadcast_dims: Vec<usize>,
}

/// Attribute payload for `slice` (unit stride).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceSpec {
    pub starts: Vec<usize>,
    pub sizes: Vec<usize>,
}

/// Attribute payload for `concat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcatSpec {
    pub axis: usize,
}

/// Attribute payload for `pad`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PadSpec {
    pub low: Vec<usize>,
    pub high: Vec<usize>,
    pub interior: Vec<usize>,
    pub pad_value: Literal,
}

/// Attribute payload for `dynamic_update_slice`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicUpdateSliceSpec {
    pub sizes: Vec<usize>,
}

/// Unique identifier for SSA values in a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueId(pub u32);

/// Operand reference in an instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    Value(ValueId),
}

/// Declarative form of the primitive operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    Constant(TensorLiteral),
    Reshape(ReshapeSpec),
    BroadcastInDim(BroadcastInDimSpec),
    Pad(PadSpec),
    Slice(SliceSpec),
    Concat(ConcatSpec),
    Select,
    DynamicUpdateSlice(DynamicUpdateSliceSpec),
}

impl Operation {
    /// Short, stable op name used in logs and backend diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            Operation::Constant(_) => "constant",
            Operation::Reshape(_) => "reshape",
            Operation::BroadcastInDim(_) => "broadcast_in_dim",
            Operation::Pad(_) => "pad",
            Operation::Slice(_) => "slice",
            Operation::Concat(_) => "concat",
            Operation::Select => "select",
            Operation::DynamicUpdateSlice(_) => "dynamic_update_slice",
        }
    }
}

/// Single SSA instruction in the declarative program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub id: ValueId,
    pub op: Operation,
    pub operands: Vec<Operand>,
    pub output: TensorSpec,
}

/// Function describing one lowered computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub parameters: Vec<TensorSpec>,
    pub parameter_ids: Vec<ValueId>,
    pub results: Vec<TensorSpec>,
    pub body: Vec<Instruction>,
    pub result_ids: Vec<ValueId>,
}

/// Complete program with an entry function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    #[serde(default = "default_spec_version")]
    pub spec_version: String,
    pub entry: String,
    pub functions: Vec<Function>,
}

#[derive(Debug, Error)]
pub enum ProgramSerdeError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("program spec version '{found}' does not match expected '{expected}'")]
    SpecVersionMismatch {
        found: String,
        expected: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum ProgramIoError {
    #[error(transparent)]
    Serialization(#[from] ProgramSerdeError),
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl Program {
    pub fn new(entry: impl Into<String>) -> Self {
        Self {
            spec_version: SPEC_VERSION.to_string(),
            entry: entry.into(),
            functions: Vec::new(),
        }
    }

    pub fn with_functions(mut self, functions: Vec<Function>) -> Self {
        self.functions = functions;
        self
    }

    /// Returns the function named by `entry`, if present.
    pub fn entry_function(&self) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == self.entry)
    }

    pub fn to_json_string(&self) -> Result<String, ProgramSerdeError> {
        serde_json::to_string_pretty(self).map_err(ProgramSerdeError::from)
    }

    pub fn from_json_str(src: &str) -> Result<Self, ProgramSerdeError> {
        let mut program: Program = serde_json::from_str(src).map_err(ProgramSerdeError::from)?;
        program.spec_version = normalize_spec_version(program.spec_version)?;
        Ok(program)
    }

    pub fn to_bincode_bytes(&self) -> Result<Vec<u8>, ProgramSerdeError> {
        bincode::serialize(self).map_err(ProgramSerdeError::from)
    }

    pub fn from_bincode_slice(bytes: &[u8]) -> Result<Self, ProgramSerdeError> {
        let mut program: Program = bincode::deserialize(bytes).map_err(ProgramSerdeError::from)?;
        program.spec_version = normalize_spec_version(program.spec_version)?;
        Ok(program)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), ProgramIoError> {
        let contents = self.to_json_string()?;
        fs::write(path, contents).map_err(ProgramIoError::from)
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, ProgramIoError> {
        let contents = fs::read_to_string(path).map_err(ProgramIoError::from)?;
        Program::from_json_str(&contents).map_err(ProgramIoError::from)
    }
}

fn normalize_spec_version(version: String) -> Result<String, ProgramSerdeError> {
    if version.is_empty() {
        return Ok(SPEC_VERSION.to_string());
    }
    if version == SPEC_VERSION {
        Ok(version)
    } else {
        Err(ProgramSerdeError::SpecVersionMismatch {
            found: version,
            expected: SPEC_VERSION,
        })
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_line(
            f,
            0,
            &format!(
                "program @{} (spec_version = {}) {{",
                self.entry, self.spec_version
            ),
        )?;
        for function in &self.functions {
            fmt_function(function, 1, f)?;
        }
        write_line(f, 0, "}")
    }
}

fn fmt_function(function: &Function, indent: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write_line(f, indent, &format!("func @{} {{", function.name))?;
    if !function.parameter_ids.is_empty() {
        write_line(f, indent + 1, "params:")?;
        for (value_id, spec) in function
            .parameter_ids
            .iter()
            .zip(function.parameters.iter())
        {
            write_line(
                f,
                indent + 2,
                &format!("%{} : {}", value_id.0, format_tensor_spec(spec)),
            )?;
        }
    }
    if !function.body.is_empty() {
        write_line(f, indent + 1, "body:")?;
        for instruction in &function.body {
            fmt_instruction(instruction, indent + 2, f)?;
        }
    }
    if !function.result_ids.is_empty() {
        write_line(f, indent + 1, "results:")?;
        for (value_id, spec) in function.result_ids.iter().zip(function.results.iter()) {
            write_line(
                f,
                indent + 2,
                &format!("%{} : {}", value_id.0, format_tensor_spec(spec)),
            )?;
        }
    }
    write_line(f, indent, "}")
}

fn fmt_instruction(
    instruction: &Instruction,
    indent: usize,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    let operands = instruction
        .operands
        .iter()
        .map(format_operand)
        .collect::<Vec<_>>()
        .join(", ");
    let op_repr = format_operation(&instruction.op);
    let line = if operands.is_empty() {
        format!(
            "%{} = {} -> {}",
            instruction.id.0,
            op_repr,
            format_tensor_spec(&instruction.output)
        )
    } else {
        format!(
            "%{} = {}({}) -> {}",
            instruction.id.0,
            op_repr,
            operands,
            format_tensor_spec(&instruction.output)
        )
    };
    write_line(f, indent, &line)
}

fn format_operation(op: &Operation) -> String {
    match op {
        Operation::Constant(lit) => format!(
            "constant<{:?} x {}>",
            lit.spec.dtype,
            format_shape(&lit.spec.shape)
        ),
        Operation::Reshape(spec) => format!("reshape {:?}", spec.new_shape),
        Operation::BroadcastInDim(spec) => format!(
            "broadcast_in_dim dims={:?} shape={}",
            spec.broadcast_dims,
            format_shape(&spec.result_shape)
        ),
        Operation::Pad(spec) => format!(
            "pad low={:?} high={:?} interior={:?} value={:?}",
            spec.low, spec.high, spec.interior, spec.pad_value
        ),
        Operation::Slice(spec) => {
            format!("slice starts={:?} sizes={:?}", spec.starts, spec.sizes)
        }
        Operation::Concat(spec) => format!("concat axis={}", spec.axis),
        Operation::Select => "select".to_string(),
        Operation::DynamicUpdateSlice(spec) => {
            format!("dynamic_update_slice sizes={:?}", spec.sizes)
        }
    }
}

fn format_tensor_spec(spec: &TensorSpec) -> String {
    format!("tensor<{:?} x {}>", spec.dtype, format_shape(&spec.shape))
}

fn format_shape(shape: &Shape) -> String {
    if shape.dims().is_empty() {
        "[]".to_string()
    } else {
        shape
            .dims()
            .iter()
            .map(|dim| dim.to_string())
            .collect::<Vec<_>>()
            .join("x")
    }
}

fn format_operand(operand: &Operand) -> String {
    match operand {
        Operand::Value(id) => format!("%{}", id.0),
    }
}

fn write_line(f: &mut fmt::Formatter<'_>, indent: usize, line: &str) -> fmt::Result {
    for _ in 0..indent {
        f.write_str("  ")?;
    }
    writeln!(f, "{line}")
}

/// Errors surfaced by backends while evaluating programs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    Unimplemented { op: &'static str, reason: String },
    Execution { message: String },
}

impl BackendError {
    pub fn unimplemented(op: &'static str, reason: impl Into<String>) -> Self {
        BackendError::Unimplemented {
            op,
            reason: reason.into(),
        }
    }

    pub fn execution(message: impl Into<String>) -> Self {
        BackendError::Execution {
            message: message.into(),
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Unimplemented { op, reason } => {
                write!(f, "{op} is not implemented: {reason}")
            }
            BackendError::Execution { message } => {
                write!(f, "backend execution failure: {message}")
            }
        }
    }
}

impl std::error::Error for BackendError {}

/// Convenience alias for results returned by backend routines.
pub type BackendResult<T> = Result<T, BackendError>;

/// Backend that evaluates lowered programs.
pub trait PortableBackend: Send + Sync {
    type TensorHandle: Clone + Send + Sync + 'static;

    /// Returns a human-readable backend identifier (e.g., `"cpu"`).
    fn backend_name(&self) -> &str;

    /// Creates a backend tensor from a literal or zero-initialised spec.
    fn materialize(&self, init: TensorInit) -> BackendResult<Self::TensorHandle>;

    /// Copies a backend tensor back into a host literal.
    fn to_literal(&self, tensor: &Self::TensorHandle) -> BackendResult<TensorLiteral>;

    /// Runs the entry function of `program`, binding `entry_inputs` to its parameters in order.
    fn run_program(
        &self,
        program: &Program,
        entry_inputs: &[Self::TensorHandle],
    ) -> BackendResult<Vec<Self::TensorHandle>>;
}
