//! Axis helper utilities used by the primitive emitters.

use smallvec::SmallVec;

/// Compact representation of axis selections.
pub type Axes = SmallVec<[usize; 4]>;

/// Macro helper that collects arguments into an [`Axes`].
#[macro_export]
macro_rules! axes {
    ($($axis:expr),* $(,)?) => {{
        let mut tmp = $crate::ops::ptir::axes::Axes::new();
        $(tmp.push($axis as usize);)*
        tmp
    }};
}

/// Builds an axes list from any sequence.
pub fn axes_iter<I>(iter: I) -> Axes
where
    I: IntoIterator<Item = usize>,
{
    iter.into_iter().collect()
}

/// Returns `true` when `axes` is strictly increasing.
pub fn strictly_increasing(axes: &[usize]) -> bool {
    axes.windows(2).all(|pair| pair[0] < pair[1])
}
