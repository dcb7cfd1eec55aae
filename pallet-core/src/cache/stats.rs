//! Aggregate statistics over the cached pallet list.

use serde::{Deserialize, Serialize};

use crate::model::Pallet;

/// Totals across every visible pallet of an order.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub pallet_count: usize,
    pub open_count: usize,
    pub closed_count: usize,
    pub total_pieces: u32,
    pub total_weight_kg: f64,
    /// Sum of every pallet's weight limit.
    pub total_capacity_kg: f64,
    /// Total weight against total capacity.
    pub utilization_percent: f64,
    /// Mean of the per-pallet weight utilization.
    pub average_utilization_percent: f64,
}

impl CacheStats {
    /// Compute statistics from a pallet list.
    pub fn from_pallets<'a>(pallets: impl IntoIterator<Item = &'a Pallet>) -> Self {
        let mut stats = CacheStats::default();
        let mut percent_sum = 0.0;

        for pallet in pallets {
            stats.pallet_count += 1;
            if pallet.is_closed() {
                stats.closed_count += 1;
            } else {
                stats.open_count += 1;
            }
            stats.total_pieces += pallet.total_pieces();
            stats.total_weight_kg += pallet.total_weight();
            stats.total_capacity_kg += pallet.max_weight_kg;
            percent_sum += pallet.limit_report().weight_percent;
        }

        if stats.total_capacity_kg > 0.0 {
            stats.utilization_percent = stats.total_weight_kg / stats.total_capacity_kg * 100.0;
        }
        if stats.pallet_count > 0 {
            stats.average_utilization_percent = percent_sum / stats.pallet_count as f64;
        }
        stats
    }
}
