#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Construction-time settings of a [`Capture`](crate::Capture).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct CaptureConfig {
    /// Number of half-resolution pyramid levels to build.
    pub pyramid_levels: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self { pyramid_levels: 6 }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct AlignConfig {
    /// Neighbourhood searched around the estimate at every stage.
    pub search_radius: u32,
    /// Minimum share of the unclipped reference samples in a stage's window
    /// that a candidate must score to count. At least one sample is always
    /// required.
    pub min_overlap_fraction: f64,
    /// Pyramid levels whose smaller side is below this are not searched.
    pub min_level_size: usize,
    /// Scale both sides by the other capture's half-light percentile before
    /// differencing. Needed when the two captures differ in exposure.
    pub normalize_exposure: bool,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            search_radius: 1,
            min_overlap_fraction: 0.25,
            min_level_size: 8,
            normalize_exposure: false,
        }
    }
}

impl AlignConfig {
    pub(crate) fn min_scored(&self, population: u64) -> u64 {
        let fraction = self.min_overlap_fraction.clamp(0.0, 1.0);
        ((population as f64 * fraction).ceil() as u64).max(1)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct ExposureConfig {
    /// Rank used on both populations, `0.5` is the half-light percentile.
    pub percentile: f64,
    /// Below this many shared samples the ratio falls back to `1.0`.
    pub min_samples: usize,
}

impl Default for ExposureConfig {
    fn default() -> Self {
        Self {
            percentile: 0.5,
            min_samples: 1,
        }
    }
}

/// All settings used when processing a bracketed sequence.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct StackConfig {
    pub capture: CaptureConfig,
    pub align: AlignConfig,
    pub exposure: ExposureConfig,
}
