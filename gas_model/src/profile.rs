use crate::config::DatasetKey;
use crate::diagnostics::{Diagnostics, Stage};
use crate::error::PipelineError;
use crate::fetcher::Fetcher;
use crate::models::{DemandProfile, DemandRow, SupplyProfile, SupplyRow};
use crate::normalizer::{
    normalize_demand, normalize_nameplate, normalize_outlook, DemandRecord, NameplateRow,
    OutlookRow,
};
use chrono::NaiveDate;
use log::info;
use std::collections::{BTreeMap, HashMap};

/// Left-join outlook rows to nameplate ratings by facility name. A missing
/// outlook figure falls back to the facility's nameplate rating.
pub fn merge_supply(nameplate: &[NameplateRow], outlook: &[OutlookRow]) -> SupplyProfile {
    let ratings: HashMap<&str, Option<f64>> = nameplate
        .iter()
        .map(|row| (row.facility_name.as_str(), row.nameplate_tj))
        .collect();

    let rows = outlook
        .iter()
        .map(|row| {
            let nameplate_tj = ratings.get(row.facility_name.as_str()).copied().flatten();
            SupplyRow {
                facility_name: row.facility_name.clone(),
                gas_day: row.gas_day,
                available_tj: row.available_tj.or(nameplate_tj),
                nameplate_tj,
            }
        })
        .collect();

    SupplyProfile::new(rows)
}

pub fn aggregate_demand(records: &[DemandRecord]) -> DemandProfile {
    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for record in records {
        *totals.entry(record.gas_day).or_insert(0.0) += record.quantity_tj;
    }

    DemandProfile::new(
        totals
            .into_iter()
            .map(|(gas_day, total_demand_tj)| DemandRow {
                gas_day,
                total_demand_tj,
            })
            .collect(),
    )
}

pub fn build_supply_profile(fetcher: &Fetcher, diagnostics: &mut Diagnostics) -> SupplyProfile {
    let nameplate_raw = fetcher.fetch_or_empty(DatasetKey::Nameplate, false, diagnostics);
    let nameplate = normalize_nameplate(&nameplate_raw, diagnostics);

    let outlook_raw = fetcher.fetch_or_empty(DatasetKey::MediumTermOutlook, false, diagnostics);
    let outlook = normalize_outlook(&outlook_raw, diagnostics);

    if nameplate.is_empty() || outlook.is_empty() {
        diagnostics.report(Stage::Profile, PipelineError::NoUsableData("supply"));
        return SupplyProfile::default();
    }

    let profile = merge_supply(&nameplate, &outlook);
    info!(
        "Supply profile: {} rows across {} facilities",
        profile.len(),
        profile.facilities().len()
    );
    profile
}

pub fn build_demand_profile(fetcher: &Fetcher, diagnostics: &mut Diagnostics) -> DemandProfile {
    let flows_raw = fetcher.fetch_or_empty(DatasetKey::Flows, false, diagnostics);
    let records = normalize_demand(&flows_raw, &fetcher.config().demand_zone, diagnostics);

    if records.is_empty() {
        diagnostics.report(Stage::Profile, PipelineError::NoUsableData("demand"));
        return DemandProfile::default();
    }

    let profile = aggregate_demand(&records);
    info!("Demand profile: {} gas days", profile.len());
    profile
}
