//! Data movement lowerings.
//!
//! Every function takes the builder explicitly, validates its arguments against the operand
//! specs, then emits a short composition of primitives. Emitted nodes are never mutated.

mod complete;
mod concat;
mod options;
mod reshape;
mod slice;
mod unselect;

pub use complete::complete_shape;
pub use concat::{concat, repeat, split, split_count, stack};
pub use options::{LoweringOptions, SplitPolicy};
pub use reshape::{
    expand, reshape_to_rank, squeeze_all, squeeze_dim, unsqueeze, unsqueeze_dims, view,
};
pub use slice::{resize, slice, update_slice};
pub use unselect::unselect;
