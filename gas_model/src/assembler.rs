use crate::config::PipelineConfig;
use crate::diagnostics::{Diagnostics, Stage};
use crate::error::PipelineError;
use crate::fetcher::Fetcher;
use crate::models::{DemandProfile, ModelRow, ModelTable, SupplyProfile};
use crate::profile::{build_demand_profile, build_supply_profile};
use log::info;

/// Everything one pipeline run produces.
#[derive(Debug, Default)]
pub struct ModelOutput {
    pub supply: SupplyProfile,
    pub model: ModelTable,
    pub diagnostics: Diagnostics,
}

impl ModelOutput {
    /// True when there is nothing to present.
    pub fn is_empty(&self) -> bool {
        self.supply.is_empty() || self.model.is_empty()
    }

    pub fn into_parts(self) -> (SupplyProfile, ModelTable) {
        (self.supply, self.model)
    }
}

pub struct ModelAssembler {
    fetcher: Fetcher,
}

impl ModelAssembler {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }

    pub fn from_config(config: PipelineConfig) -> Self {
        Self::new(Fetcher::new(config))
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Build the supply profile and the daily balance from the cached (or
    /// freshly fetched) bulletin files. Never fails: a degraded run yields
    /// empty tables and populated diagnostics.
    pub fn build_model(&self) -> ModelOutput {
        let mut diagnostics = Diagnostics::new();
        let supply = build_supply_profile(&self.fetcher, &mut diagnostics);
        let demand = build_demand_profile(&self.fetcher, &mut diagnostics);

        if supply.is_empty() || demand.is_empty() {
            diagnostics.report(Stage::Model, PipelineError::NoUsableData("model"));
            return ModelOutput {
                diagnostics,
                ..ModelOutput::default()
            };
        }

        let model = assemble(&supply, &demand);
        info!(
            "Model: {} gas days, {} in deficit",
            model.len(),
            model.deficit_days().count()
        );

        ModelOutput {
            supply,
            model,
            diagnostics,
        }
    }
}

/// Demand-driven join of daily totals: every demand day appears, supply-only
/// days are dropped, and a day without supply keeps `None` rather than zero.
pub fn assemble(supply: &SupplyProfile, demand: &DemandProfile) -> ModelTable {
    let totals = supply.totals_by_day();

    let rows = demand
        .rows()
        .iter()
        .map(|d| ModelRow::new(d.gas_day, totals.get(&d.gas_day).copied(), d.total_demand_tj))
        .collect();

    ModelTable::new(rows)
}
