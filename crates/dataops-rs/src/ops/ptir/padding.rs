//! Per-dimension padding configuration shared by `pad` emitters.

use serde::{Deserialize, Serialize};

use crate::backend::spec::{Literal, PadSpec};
use crate::ops::error::{LoweringError, LoweringResult};

/// Padding amounts for one axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PadDim {
    pub low: usize,
    pub high: usize,
    pub interior: usize,
}

impl PadDim {
    /// Output extent for an input extent `n`: `low + high + n + max(n - 1, 0) * interior`.
    pub fn padded(&self, n: usize) -> Option<usize> {
        let gaps = n.saturating_sub(1).checked_mul(self.interior)?;
        self.low
            .checked_add(self.high)?
            .checked_add(n)?
            .checked_add(gaps)
    }
}

/// Padding for every axis of one operand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaddingConfig {
    dims: Vec<PadDim>,
}

impl PaddingConfig {
    /// A configuration that pads nothing on any of `rank` axes.
    pub fn zeros(rank: usize) -> Self {
        Self {
            dims: vec![PadDim::default(); rank],
        }
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Replaces the padding of `axis`.
    pub fn set(&mut self, axis: usize, pad: PadDim) -> LoweringResult<()> {
        let rank = self.rank();
        let slot = self
            .dims
            .get_mut(axis)
            .ok_or(LoweringError::DimensionOutOfRange {
                op: "pad",
                dim: axis,
                rank,
            })?;
        *slot = pad;
        Ok(())
    }

    /// Applies the configuration to `dims`, returning the padded extents.
    pub fn padded_dims(&self, dims: &[usize]) -> LoweringResult<Vec<usize>> {
        if dims.len() != self.rank() {
            return Err(LoweringError::RankMismatch {
                op: "pad",
                expected: dims.len(),
                actual: self.rank(),
            });
        }
        dims.iter()
            .zip(&self.dims)
            .map(|(&n, pad)| {
                pad.padded(n).ok_or_else(|| LoweringError::ElementCountOverflow {
                    dims: dims.to_vec(),
                })
            })
            .collect()
    }

    pub(crate) fn to_spec(&self, pad_value: Literal) -> PadSpec {
        PadSpec {
            low: self.dims.iter().map(|pad| pad.low).collect(),
            high: self.dims.iter().map(|pad| pad.high).collect(),
            interior: self.dims.iter().map(|pad| pad.interior).collect(),
            pad_value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interior_padding_skips_empty_axes() {
        let pad = PadDim {
            low: 1,
            high: 2,
            interior: 3,
        };
        assert_eq!(pad.padded(0), Some(3));
        assert_eq!(pad.padded(1), Some(4));
        assert_eq!(pad.padded(3), Some(12));
    }

    #[test]
    fn padded_dims_checks_rank() {
        let config = PaddingConfig::zeros(2);
        assert!(config.padded_dims(&[4]).is_err());
        assert_eq!(config.padded_dims(&[4, 5]).unwrap(), vec![4, 5]);
    }
}
