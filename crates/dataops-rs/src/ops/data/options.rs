use serde::{Deserialize, Serialize};

use crate::env;

/// How `split` reacts when a requested chunk runs past the end of the axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitPolicy {
    /// Stop at the first chunk that does not fit and return the chunks produced so far.
    #[default]
    Truncate,
    /// Report the first chunk that does not fit as [`SplitSizeOverflow`](crate::LoweringError::SplitSizeOverflow).
    Strict,
}

/// Knobs consulted by the lowering functions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoweringOptions {
    pub split: SplitPolicy,
}

impl LoweringOptions {
    /// Reads `DATAOPS_STRICT_SPLIT` once per process.
    pub fn from_env() -> Self {
        if env::strict_split_enabled() {
            Self::strict()
        } else {
            Self::default()
        }
    }

    pub fn strict() -> Self {
        Self {
            split: SplitPolicy::Strict,
        }
    }
}
