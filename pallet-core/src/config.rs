//! Configuration constants and settings for pallet planning.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PalletError, Result};

/// Floating-point comparison epsilon.
pub const EPS: f64 = 0.0001;

/// Density of particleboard in kg/m³.
pub const DENSITY_PARTICLEBOARD: f64 = 650.0;

/// Pieces laid side by side on one stack level before the height grows.
pub const UNITS_PER_LEVEL: u32 = 50;

/// Default panel thickness in mm.
pub const DEFAULT_THICKNESS_MM: f64 = 18.0;

/// Default pallet weight limit in kg.
pub const DEFAULT_MAX_WEIGHT_KG: f64 = 700.0;

/// Default pallet stack height limit in mm.
pub const DEFAULT_MAX_HEIGHT_MM: f64 = 1440.0;

/// Utilization percentage at which a limit is reported as a warning.
pub const WARN_PERCENT: f64 = 90.0;

/// Interval between silent background refreshes of the pallet cache.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Planning configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PalletConfig {
    /// Weight limit applied to new pallets.
    pub max_weight_kg: f64,
    /// Height limit applied to new pallets.
    pub max_height_mm: f64,
    /// Periodic refresh interval in seconds.
    pub refresh_secs: u64,
}

impl Default for PalletConfig {
    fn default() -> Self {
        Self {
            max_weight_kg: DEFAULT_MAX_WEIGHT_KG,
            max_height_mm: DEFAULT_MAX_HEIGHT_MM,
            refresh_secs: REFRESH_INTERVAL.as_secs(),
        }
    }
}

impl PalletConfig {
    /// Load configuration from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PalletError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config: PalletConfig = serde_json::from_str(&content)?;
        config.check()?;
        Ok(config)
    }

    /// Reject limits that would make every capacity check meaningless.
    pub fn check(&self) -> Result<()> {
        if self.max_weight_kg <= 0.0 {
            return Err(PalletError::InvalidConfig {
                field: "max_weight_kg".into(),
                value: self.max_weight_kg.to_string(),
            });
        }
        if self.max_height_mm <= 0.0 {
            return Err(PalletError::InvalidConfig {
                field: "max_height_mm".into(),
                value: self.max_height_mm.to_string(),
            });
        }
        if self.refresh_secs == 0 {
            return Err(PalletError::InvalidConfig {
                field: "refresh_secs".into(),
                value: "0".into(),
            });
        }
        Ok(())
    }

    /// Refresh interval as a duration.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }
}

/// Utility functions for floating-point comparisons.
pub mod float_cmp {
    use super::EPS;

    /// Check if two floats are approximately equal.
    #[inline]
    pub fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPS
    }

    /// Check if `a` exceeds `limit` by more than the epsilon.
    #[inline]
    pub fn exceeds(a: f64, limit: f64) -> bool {
        a > limit + EPS
    }
}
