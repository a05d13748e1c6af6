use crate::error::{PipelineError, Result};
use crate::models::{ModelRow, ModelTable};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Nominal consumption of the modelled large consumer, TJ/day.
pub const DEFAULT_BASELINE_TJ: f64 = 80.0;
pub const CONSUMPTION_RANGE: RangeInclusive<f64> = 0.0..=100.0;

/// A what-if on a single large consumer's gas use. Demand in the published
/// flows already contains the baseline, so only the difference is applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub baseline_tj: f64,
    pub consumption_tj: f64,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            baseline_tj: DEFAULT_BASELINE_TJ,
            consumption_tj: DEFAULT_BASELINE_TJ,
        }
    }
}

impl Scenario {
    pub fn new(consumption_tj: f64) -> Result<Self> {
        Self::with_baseline(consumption_tj, DEFAULT_BASELINE_TJ)
    }

    pub fn with_baseline(consumption_tj: f64, baseline_tj: f64) -> Result<Self> {
        if !CONSUMPTION_RANGE.contains(&consumption_tj) {
            return Err(PipelineError::InvalidScenario(consumption_tj));
        }
        Ok(Self {
            baseline_tj,
            consumption_tj,
        })
    }

    pub fn demand_offset(&self) -> f64 {
        self.consumption_tj - self.baseline_tj
    }

    /// Adjusted copy of `model`; the input table is left as built.
    pub fn apply(&self, model: &ModelTable) -> ModelTable {
        let offset = self.demand_offset();
        ModelTable::new(
            model
                .rows()
                .iter()
                .map(|row| ModelRow::new(row.gas_day, row.total_supply_tj, row.total_demand_tj + offset))
                .collect(),
        )
    }
}
