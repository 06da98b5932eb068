use std::{
    env, fs,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

use dataops_rs::backend::ptir_utils::tensor_spec_static;
use dataops_rs::backend::spec::{DType, Program, ProgramSerdeError, SPEC_VERSION};
use dataops_rs::ops::data::{unselect, view};
use dataops_rs::{GraphBuilder, LoweringError, LoweringOptions};

fn sample_program() -> Program {
    let mut b = GraphBuilder::with_options(LoweringOptions::default());
    let target = b.parameter(tensor_spec_static(DType::F32, &[5]));
    let source = b.parameter(tensor_spec_static(DType::F32, &[2]));
    let out = unselect(&mut b, &target, &source, 0, 1, 4, 2).expect("unselect lowers");
    let out = view(&mut b, &out, &[-1, 1]).expect("view lowers");
    b.finish("main", &[out]).expect("program seals")
}

fn unique_path(ext: &str) -> PathBuf {
    let mut path = env::temp_dir();
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before unix epoch")
        .as_nanos();
    path.push(format!("dataops_rs_program_{timestamp}.{ext}"));
    path
}

#[test]
fn finish_records_parameters_and_results() {
    let program = sample_program();
    assert_eq!(program.entry, "main");
    assert_eq!(program.spec_version, SPEC_VERSION);
    let function = program.entry_function().expect("entry function present");
    assert_eq!(function.parameters.len(), 2);
    assert_eq!(function.parameter_ids.len(), 2);
    assert_eq!(function.results[0].shape.dims(), &[5, 1]);
    let last = function.body.last().expect("body is not empty");
    assert_eq!(last.id, function.result_ids[0]);
}

#[test]
fn finish_rejects_unknown_results() {
    let mut other = GraphBuilder::with_options(LoweringOptions::default());
    let foreign = other.parameter(tensor_spec_static(DType::F32, &[3]));
    let b = GraphBuilder::with_options(LoweringOptions::default());
    let err = b.finish("main", &[foreign]).expect_err("value 0 was never issued");
    assert!(matches!(err, LoweringError::UnknownValue(_)));
}

#[test]
fn program_display_renders_ir() {
    let rendered = format!("{}", sample_program());
    assert!(
        rendered.contains("program @main"),
        "rendered IR missing program header:\n{rendered}"
    );
    assert!(
        rendered.contains("%0 : tensor<F32 x 5>"),
        "rendered IR missing parameter:\n{rendered}"
    );
    assert!(
        rendered.contains("select(%"),
        "rendered IR missing select:\n{rendered}"
    );
    assert!(
        rendered.contains("constant<I1 x []>"),
        "rendered IR missing scalar mask constant:\n{rendered}"
    );
}

#[test]
fn program_json_roundtrip_preserves_structure() {
    let program = sample_program();
    let json = program.to_json_string().expect("json serialization");
    let parsed = Program::from_json_str(&json).expect("json deserialization");
    assert_eq!(parsed, program);
}

#[test]
fn program_bincode_roundtrip_preserves_structure() {
    let program = sample_program();
    let bytes = program.to_bincode_bytes().expect("bincode serialization");
    let parsed = Program::from_bincode_slice(&bytes).expect("bincode deserialization");
    assert_eq!(parsed, program);
}

#[test]
fn program_json_rejects_foreign_spec_version() {
    let mut program = sample_program();
    program.spec_version = "other.v9".to_string();
    let json = program.to_json_string().expect("json serialization");
    let err = Program::from_json_str(&json).expect_err("version mismatch");
    assert!(matches!(err, ProgramSerdeError::SpecVersionMismatch { .. }));
}

#[test]
fn program_save_and_load_json() {
    let program = sample_program();
    let path = unique_path("json");
    program.save_json(&path).expect("save program");
    let loaded = Program::load_json(&path).expect("load program");
    let _ = fs::remove_file(&path);
    assert_eq!(loaded, program);
}

#[test]
fn literals_encode_per_dtype() {
    use dataops_rs::backend::ptir_utils::tensor_literal_splat;
    use dataops_rs::Literal;

    assert_eq!(Literal::I1(true).encode(DType::I1), Some(vec![1]));
    assert_eq!(
        Literal::Signed(-2).encode(DType::Si16),
        Some((-2i16).to_le_bytes().to_vec())
    );
    assert_eq!(Literal::Signed(300).encode(DType::Si8), None);
    assert_eq!(Literal::Unsigned(7).encode(DType::Si32), None);
    assert_eq!(Literal::Float(1.0).encode(DType::Bf16), Some(vec![0x80, 0x3f]));
    assert_eq!(Literal::Float(1.0).encode(DType::F16), Some(vec![0x00, 0x3c]));
    assert_eq!(Literal::zero(DType::Ui32), Literal::Unsigned(0));
    assert_eq!(Literal::zero(DType::F64), Literal::Float(0.0));

    let splat = tensor_literal_splat(DType::Si32, Literal::Signed(3), &[2, 2])
        .expect("si32 literal encodes");
    assert_eq!(splat.byte_len(), 16);
    assert_eq!(&splat.bytes[..4], &3i32.to_le_bytes());
}
