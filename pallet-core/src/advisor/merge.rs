//! Merge advisor: can two pallets be combined into one.

use tracing::debug;

use crate::config::float_cmp;
use crate::model::Pallet;
use crate::validation::Verdict;

/// Check whether `source` can be merged into `target`.
///
/// The target's limits apply. Height uses `max(height_a, height_b)` on the
/// assumption that pieces are re-levelled across the merge rather than
/// stacked; this is an approximation.
pub fn can_merge(target: &Pallet, source: &Pallet) -> Verdict {
    if target.id == source.id {
        return Verdict::deny("Cannot merge a pallet with itself");
    }
    if target.destination != source.destination {
        return Verdict::deny(format!(
            "Different destinations: {} and {}",
            target.destination, source.destination
        ));
    }
    if target.is_closed() || source.is_closed() {
        return Verdict::deny("Closed pallets cannot be merged");
    }

    let weight = target.total_weight() + source.total_weight();
    if float_cmp::exceeds(weight, target.max_weight_kg) {
        debug!(weight, max = target.max_weight_kg, "merge rejected by weight");
        return Verdict::deny(format!(
            "Combined weight {:.1} kg exceeds {:.1} kg",
            weight, target.max_weight_kg
        ));
    }

    let height = target.stack_height().max(source.stack_height());
    if float_cmp::exceeds(height, target.max_height_mm) {
        return Verdict::deny(format!(
            "Height {:.0} mm exceeds {:.0} mm",
            height, target.max_height_mm
        ));
    }

    Verdict::allow()
}
