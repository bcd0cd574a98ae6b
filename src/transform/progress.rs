use std::fmt;

use serde::{Deserialize, Serialize};

/// How a frame index is normalized into progress over the clip
///
/// Both conventions return 0 when the denominator would be zero and never
/// exceed 1, even when a source yields more frames than it declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressConvention {
    /// `index / total`: the last frame stops one step short of 1.0
    OverTotal,
    /// `index / (total - 1)`: the last frame lands exactly on 1.0
    OverLastIndex,
}

impl ProgressConvention {
    pub fn progress(self, index: u64, total: u64) -> f64 {
        let denominator = match self {
            ProgressConvention::OverTotal => total,
            ProgressConvention::OverLastIndex => total.saturating_sub(1),
        };
        if denominator == 0 {
            return 0.0;
        }
        (index as f64 / denominator as f64).min(1.0)
    }
}

impl fmt::Display for ProgressConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressConvention::OverTotal => write!(f, "index/total"),
            ProgressConvention::OverLastIndex => write!(f, "index/(total-1)"),
        }
    }
}
