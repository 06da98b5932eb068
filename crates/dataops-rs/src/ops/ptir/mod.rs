//! Checked primitive emission on top of [`GraphBuilder`](crate::ops::graph::GraphBuilder).

pub mod axes;
mod emit;
pub mod padding;

pub use axes::{axes_iter, Axes};
pub use padding::{PadDim, PaddingConfig};

pub(crate) use emit::check_window;
