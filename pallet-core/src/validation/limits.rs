//! Constraint checker: weight and height against pallet limits.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::capacity::{stacked_height, stacked_weight};
use crate::config::{float_cmp, WARN_PERCENT};
use crate::model::Assignment;

/// Utilization of a pallet against its weight and height limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimitReport {
    pub over_weight: bool,
    pub over_height: bool,
    pub weight_percent: f64,
    pub height_percent: f64,
    pub warn_weight: bool,
    pub warn_height: bool,
}

impl LimitReport {
    /// Whether either limit is exceeded.
    pub fn is_over(&self) -> bool {
        self.over_weight || self.over_height
    }

    /// Whether either limit is at or above the warning threshold.
    pub fn is_warning(&self) -> bool {
        self.warn_weight || self.warn_height
    }
}

/// Outcome of a feasibility check.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Verdict {
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Verdict {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

fn percent(value: f64, max: f64) -> f64 {
    if max <= 0.0 {
        0.0
    } else {
        value / max * 100.0
    }
}

/// Evaluate weight and height against limits. Total, never fails.
pub fn evaluate(weight: f64, height: f64, max_weight: f64, max_height: f64) -> LimitReport {
    let weight_percent = percent(weight, max_weight);
    let height_percent = percent(height, max_height);
    LimitReport {
        over_weight: float_cmp::exceeds(weight, max_weight),
        over_height: float_cmp::exceeds(height, max_height),
        weight_percent,
        height_percent,
        warn_weight: weight_percent >= WARN_PERCENT,
        warn_height: height_percent >= WARN_PERCENT,
    }
}

/// Check whether `candidate` can be added on top of `existing`.
///
/// The single gate for every mutation of a pallet's contents.
pub fn can_add(
    existing: &[Assignment],
    candidate: &[Assignment],
    max_weight: f64,
    max_height: f64,
) -> Verdict {
    let combined: Vec<Assignment> = existing.iter().chain(candidate).cloned().collect();
    let weight = stacked_weight(&combined);
    let height = stacked_height(&combined);

    if float_cmp::exceeds(weight, max_weight) {
        debug!(weight, max_weight, "addition rejected by weight");
        return Verdict::deny(format!(
            "Weight limit exceeded: {:.1} kg of {:.1} kg (over by {:.1} kg)",
            weight,
            max_weight,
            weight - max_weight
        ));
    }
    if float_cmp::exceeds(height, max_height) {
        debug!(height, max_height, "addition rejected by height");
        return Verdict::deny(format!(
            "Height limit exceeded: {:.0} mm of {:.0} mm (over by {:.0} mm)",
            height,
            max_height,
            height - max_height
        ));
    }
    Verdict::allow()
}
