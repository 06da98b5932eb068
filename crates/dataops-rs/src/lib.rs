//! Shape-algebra lowering of tensor data movement ops into portable IR programs.
//!
//! Callers hold a [`GraphBuilder`] and [`Node`] handles and call the free functions in
//! [`ops::data`]; each one validates its arguments and emits a short sequence of primitive
//! instructions. [`GraphBuilder::finish`] seals the result into a [`Program`] that any
//! [`PortableBackend`] can run.

pub mod backend;
mod env;
pub mod ops;

pub use backend::spec::{DType, Literal, PortableBackend, Program, Shape, TensorSpec};
pub use ops::data::{LoweringOptions, SplitPolicy};
pub use ops::error::LoweringError;
pub use ops::graph::{GraphBuilder, Node};
