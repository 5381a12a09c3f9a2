//! Options recognized by the anonymization methods. Every numeric option is
//! optional: a missing or zero value falls back to its default.

use serde::Deserialize;
use tracing::info;
use trajectories::Meter;

use crate::AnonymizationError;

pub const DEFAULT_K: usize = 3;
pub const DEFAULT_INTERVAL: u64 = 15 * 60;
pub const DEFAULT_MAX_R_S: Meter = 500.0;
pub const DEFAULT_MIN_R_S: Meter = 100.0;
pub const DEFAULT_MAX_R_T: u64 = 120;
pub const DEFAULT_MIN_R_T: u64 = 60;
/// Share of the original dataset, in percent, scanned by the fast record linkage.
pub const DEFAULT_WINDOW_PERCENT: f64 = 1.0;

fn or_default<T: PartialEq + Default + std::fmt::Display + Copy>(
    field: &str,
    value: Option<T>,
    default: T,
) -> T {
    match value {
        Some(v) if v != T::default() => v,
        _ => {
            info!("No '{field}' provided. Using {default}.");
            default
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MicroaggregationConf {
    pub k: usize,
    /// Partition span in seconds.
    pub interval: u64,
}

#[derive(Debug, Default, Deserialize)]
struct RawMicroaggregationConf {
    k: Option<usize>,
    interval: Option<u64>,
}

impl From<RawMicroaggregationConf> for MicroaggregationConf {
    fn from(raw: RawMicroaggregationConf) -> Self {
        Self {
            k: or_default("k", raw.k, DEFAULT_K),
            interval: or_default("interval", raw.interval, DEFAULT_INTERVAL),
        }
    }
}

impl MicroaggregationConf {
    pub fn from_json(json: &str) -> Result<Self, AnonymizationError> {
        Ok(serde_json::from_str::<RawMicroaggregationConf>(json)?.into())
    }
}

impl Default for MicroaggregationConf {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            interval: DEFAULT_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwapConf {
    pub k: usize,
    pub max_r_s: Meter,
    pub min_r_s: Meter,
    pub max_r_t: u64,
    pub min_r_t: u64,
    pub step_s: Meter,
    pub step_t: u64,
    pub seed: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSwapConf {
    k: Option<usize>,
    max_r_s: Option<Meter>,
    min_r_s: Option<Meter>,
    max_r_t: Option<u64>,
    min_r_t: Option<u64>,
    step_s: Option<Meter>,
    step_t: Option<u64>,
    seed: Option<u64>,
}

impl From<RawSwapConf> for SwapConf {
    fn from(raw: RawSwapConf) -> Self {
        let max_r_s = or_default("max_r_s", raw.max_r_s, DEFAULT_MAX_R_S);
        let min_r_s = or_default("min_r_s", raw.min_r_s, DEFAULT_MIN_R_S);
        let max_r_t = or_default("max_r_t", raw.max_r_t, DEFAULT_MAX_R_T);
        let min_r_t = or_default("min_r_t", raw.min_r_t, DEFAULT_MIN_R_T);
        Self {
            k: or_default("k", raw.k, DEFAULT_K),
            max_r_s,
            min_r_s,
            max_r_t,
            min_r_t,
            step_s: raw
                .step_s
                .filter(|s| *s > 0.0)
                .unwrap_or_else(|| half_span_s(min_r_s, max_r_s)),
            step_t: raw
                .step_t
                .filter(|s| *s > 0)
                .unwrap_or_else(|| half_span_t(min_r_t, max_r_t)),
            seed: raw.seed,
        }
    }
}

fn half_span_s(min: Meter, max: Meter) -> Meter {
    ((max - min).abs() / 2.0).trunc()
}

fn half_span_t(min: u64, max: u64) -> u64 {
    min.abs_diff(max) / 2
}

impl SwapConf {
    pub fn from_json(json: &str) -> Result<Self, AnonymizationError> {
        Ok(serde_json::from_str::<RawSwapConf>(json)?.into())
    }

    /// Radii bounds with steps at half the span.
    pub fn with_radii(k: usize, (min_r_s, max_r_s): (Meter, Meter), (min_r_t, max_r_t): (u64, u64)) -> Self {
        Self {
            k,
            max_r_s,
            min_r_s,
            max_r_t,
            min_r_t,
            step_s: half_span_s(min_r_s, max_r_s),
            step_t: half_span_t(min_r_t, max_r_t),
            seed: None,
        }
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl Default for SwapConf {
    fn default() -> Self {
        Self::with_radii(
            DEFAULT_K,
            (DEFAULT_MIN_R_S, DEFAULT_MAX_R_S),
            (DEFAULT_MIN_R_T, DEFAULT_MAX_R_T),
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct RecordLinkageConf {
    /// Number of originals scanned per anonymized trajectory. `None` scans
    /// [`DEFAULT_WINDOW_PERCENT`] of the original dataset.
    pub window_size: Option<usize>,
}

impl RecordLinkageConf {
    pub fn from_json(json: &str) -> Result<Self, AnonymizationError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Window for an original dataset of `len` trajectories. A percentage
    /// below one trajectory scans the whole dataset. A fractional percentage
    /// gives the odd window centered on the closest original, `2 * (w / 2) + 1`.
    pub fn window_for(&self, len: usize) -> usize {
        match self.window_size {
            Some(w) if w > 0 => w,
            _ => {
                let window = len as f64 * DEFAULT_WINDOW_PERCENT / 100.0;
                if window < 1.0 {
                    len
                } else if window.fract() == 0.0 {
                    window as usize
                } else {
                    2 * (window / 2.0) as usize + 1
                }
            }
        }
    }
}
