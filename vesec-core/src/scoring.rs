//! Scoring heuristics for module rebalancing and backfill
//!
//! The weights steer scarce modules toward depleted batteries. All tunables
//! live here so the allocation loop stays free of magic numbers and the
//! policy can be unit-tested on its own.

/// Minimum SOC gap (percentage points) before a donor is preferred on SOC
pub const DEFAULT_SOC_GAP_THRESHOLD: f64 = 20.0;

/// Additive offset in the backfill weight numerator
pub const DEFAULT_SOC_OFFSET: f64 = 10.0;

/// Divisor normalizing the backfill weight
pub const DEFAULT_SOC_DIVISOR: f64 = 110.0;

/// Tunable scoring policy injected into the allocation engine
#[derive(Debug, Clone, Copy)]
pub struct ScoringPolicy {
    /// SOC gap a donor must exceed to score on SOC
    pub soc_gap_threshold: f64,
    /// Offset applied to the inverted SOC in the backfill weight
    pub soc_offset: f64,
    /// Normalizing divisor of the backfill weight
    pub soc_divisor: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            soc_gap_threshold: DEFAULT_SOC_GAP_THRESHOLD,
            soc_offset: DEFAULT_SOC_OFFSET,
            soc_divisor: DEFAULT_SOC_DIVISOR,
        }
    }
}

impl ScoringPolicy {
    /// Score a donor gun for the starvation rebalance pass.
    ///
    /// Returns `None` when the donor's SOC lead over the requester does not
    /// clear the threshold; such donors are only reachable through the
    /// largest-holder fallback.
    pub fn donor_score(
        &self,
        donor_module_count: usize,
        donor_soc: f64,
        requester_soc: f64,
    ) -> Option<f64> {
        let gap = donor_soc - requester_soc;
        if gap > self.soc_gap_threshold {
            Some(donor_module_count as f64 * gap / 100.0)
        } else {
            None
        }
    }

    /// Weight of a gun in the proportional backfill pass.
    ///
    /// Higher capped demand and lower SOC both raise the weight.
    pub fn backfill_weight(&self, capped_demand_kw: f64, soc: f64) -> f64 {
        capped_demand_kw * (100.0 - soc + self.soc_offset) / self.soc_divisor
    }
}
