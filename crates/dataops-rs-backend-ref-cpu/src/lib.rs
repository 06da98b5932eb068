//! Reference CPU interpreter for programs produced by `dataops-rs`.
pub mod cpu;

pub use cpu::{CpuPortableBackend, CpuTensor, TensorData};
