//! Graph construction for lowered programs.
//!
//! The builder records parameters and instructions in emission order and tracks the spec of
//! every value it issued, so validated primitives can look up operand shapes by id.
mod builder;
mod node;

pub use builder::GraphBuilder;
pub use node::Node;
