//! Lowering layer: graph builder, validated primitives and the data movement families.
//!
//! `graph` owns the program under construction, `ptir` adds one checked method per primitive,
//! and `data` composes those primitives into the user-facing shape operations.
pub mod data;
pub mod error;
pub mod graph;
pub mod ptir;
