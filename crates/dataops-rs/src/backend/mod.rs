//! Program model shared by the lowering layer and the backends that evaluate it.

pub mod ptir_utils;
pub mod shape_helpers;
pub mod spec;
