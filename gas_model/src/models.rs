use crate::error::Result;
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplyRow {
    #[serde(rename = "FacilityName")]
    pub facility_name: String,
    #[serde(rename = "GasDay")]
    pub gas_day: NaiveDate,
    #[serde(rename = "TJ_Available")]
    pub available_tj: Option<f64>,
    #[serde(rename = "TJ_Nameplate")]
    pub nameplate_tj: Option<f64>,
}

/// Per-facility, per-day available capacity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupplyProfile {
    rows: Vec<SupplyRow>,
}

impl SupplyProfile {
    /// Rows are kept ordered by (gas day, facility).
    pub fn new(mut rows: Vec<SupplyRow>) -> Self {
        rows.sort_by(|a, b| {
            (a.gas_day, &a.facility_name).cmp(&(b.gas_day, &b.facility_name))
        });
        Self { rows }
    }

    pub fn rows(&self) -> &[SupplyRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Forward window: rows on or after `day`.
    pub fn from_day(&self, day: NaiveDate) -> SupplyProfile {
        Self {
            rows: self.rows.iter().filter(|r| r.gas_day >= day).cloned().collect(),
        }
    }

    pub fn facilities(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rows.iter().map(|r| r.facility_name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Available capacity summed across facilities per gas day. Facilities
    /// with no figure contribute nothing.
    pub fn totals_by_day(&self) -> BTreeMap<NaiveDate, f64> {
        let mut totals = BTreeMap::new();
        for row in &self.rows {
            *totals.entry(row.gas_day).or_insert(0.0) += row.available_tj.unwrap_or(0.0);
        }
        totals
    }

    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let df = DataFrame::new(vec![
            Series::new(
                "FacilityName".into(),
                self.rows.iter().map(|r| r.facility_name.as_str()).collect::<Vec<_>>(),
            ),
            date_series("GasDay", self.rows.iter().map(|r| r.gas_day)),
            Series::new(
                "TJ_Available".into(),
                self.rows.iter().map(|r| r.available_tj).collect::<Vec<_>>(),
            ),
            Series::new(
                "TJ_Nameplate".into(),
                self.rows.iter().map(|r| r.nameplate_tj).collect::<Vec<_>>(),
            ),
        ])?;
        Ok(df)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandRow {
    #[serde(rename = "GasDay")]
    pub gas_day: NaiveDate,
    #[serde(rename = "TJ_Demand")]
    pub total_demand_tj: f64,
}

/// Total system demand per gas day, ordered by day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DemandProfile {
    rows: Vec<DemandRow>,
}

impl DemandProfile {
    pub fn new(mut rows: Vec<DemandRow>) -> Self {
        rows.sort_by_key(|r| r.gas_day);
        Self { rows }
    }

    pub fn rows(&self) -> &[DemandRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRow {
    #[serde(rename = "GasDay")]
    pub gas_day: NaiveDate,
    /// `None` when no supply figure exists for the day.
    #[serde(rename = "TJ_Available")]
    pub total_supply_tj: Option<f64>,
    #[serde(rename = "TJ_Demand")]
    pub total_demand_tj: f64,
    /// Supply minus demand; negative means demand exceeds supply.
    #[serde(rename = "Shortfall")]
    pub shortfall_tj: Option<f64>,
}

impl ModelRow {
    pub fn new(gas_day: NaiveDate, total_supply_tj: Option<f64>, total_demand_tj: f64) -> Self {
        Self {
            gas_day,
            total_supply_tj,
            total_demand_tj,
            shortfall_tj: total_supply_tj.map(|supply| supply - total_demand_tj),
        }
    }

    pub fn is_deficit(&self) -> bool {
        self.shortfall_tj.is_some_and(|s| s < 0.0)
    }
}

/// Daily supply/demand balance, one row per demand day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelTable {
    rows: Vec<ModelRow>,
}

impl ModelTable {
    pub fn new(mut rows: Vec<ModelRow>) -> Self {
        rows.sort_by_key(|r| r.gas_day);
        Self { rows }
    }

    pub fn rows(&self) -> &[ModelRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn deficit_days(&self) -> impl Iterator<Item = &ModelRow> {
        self.rows.iter().filter(|r| r.is_deficit())
    }

    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let df = DataFrame::new(vec![
            date_series("GasDay", self.rows.iter().map(|r| r.gas_day)),
            Series::new(
                "TJ_Available".into(),
                self.rows.iter().map(|r| r.total_supply_tj).collect::<Vec<_>>(),
            ),
            Series::new(
                "TJ_Demand".into(),
                self.rows.iter().map(|r| r.total_demand_tj).collect::<Vec<_>>(),
            ),
            Series::new(
                "Shortfall".into(),
                self.rows.iter().map(|r| r.shortfall_tj).collect::<Vec<_>>(),
            ),
        ])?;
        Ok(df)
    }
}

fn date_series(name: &str, days: impl Iterator<Item = NaiveDate>) -> Series {
    DateChunked::from_naive_date(name.into(), days).into_series()
}
