use crate::diagnostics::{Diagnostics, Stage};
use crate::error::PipelineError;
use crate::raw::RawRecordSet;
use crate::schema::{ColumnMap, Field};
use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, warn};
use polars::prelude::StringChunked;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameplateRow {
    pub facility_name: String,
    pub nameplate_tj: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlookRow {
    pub facility_name: String,
    pub gas_day: NaiveDate,
    pub available_tj: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandRecord {
    pub gas_day: NaiveDate,
    pub zone_type: String,
    pub zone_name: String,
    pub quantity_tj: f64,
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d %b %Y", "%d-%b-%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

pub fn parse_gas_day(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Parses a TJ figure; thousands separators are tolerated.
pub fn parse_quantity(value: &str) -> Option<f64> {
    let cleaned: String = value.trim().chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn matches_label(value: Option<&str>, expected: &str) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case(expected))
}

/// Resolve the required fields or report a schema mismatch.
fn resolve<'a>(
    raw: &'a RawRecordSet,
    fields: &[Field],
    diagnostics: &mut Diagnostics,
) -> Option<Vec<&'a StringChunked>> {
    let missing = match ColumnMap::resolve(&raw.column_names(), fields) {
        Ok(map) => {
            let columns: Option<Vec<_>> = fields
                .iter()
                .map(|f| map.get(*f).and_then(|name| raw.column(name)))
                .collect();
            match columns {
                Some(columns) => return Some(columns),
                None => fields.iter().map(|f| f.canonical()).collect(),
            }
        }
        Err(missing) => missing,
    };

    diagnostics.report(
        Stage::Normalize,
        PipelineError::SchemaMismatch {
            key: raw.key(),
            missing,
        },
    );
    None
}

#[derive(Clone, Copy)]
enum Dropped {
    GasDay,
    Quantity,
}

/// Cells that failed to parse during one normalization call, reported once.
struct ParseFailures {
    kind: Dropped,
    count: usize,
    first: Option<String>,
}

impl ParseFailures {
    fn new(kind: Dropped) -> Self {
        Self { kind, count: 0, first: None }
    }

    fn record(&mut self, value: Option<&str>) {
        self.count += 1;
        if self.first.is_none() {
            self.first = Some(value.unwrap_or_default().to_string());
        }
    }

    /// Quantity of a cell that may be blank. A present but non-numeric value
    /// is recorded and read as missing.
    fn quantity(&mut self, value: Option<&str>) -> Option<f64> {
        let value = value?;
        let parsed = parse_quantity(value);
        if parsed.is_none() {
            self.record(Some(value));
        }
        parsed
    }

    fn flush(self, raw: &RawRecordSet, diagnostics: &mut Diagnostics) {
        if self.count == 0 {
            return;
        }
        let (key, count, first) = (raw.key(), self.count, self.first.unwrap_or_default());
        let error = match self.kind {
            Dropped::GasDay => PipelineError::DateParseFailure { key, count, first },
            Dropped::Quantity => PipelineError::QuantityParseFailure { key, count, first },
        };
        diagnostics.report(Stage::Normalize, error);
    }
}

/// Production facilities with their nameplate rating, one row per facility.
pub fn normalize_nameplate(raw: &RawRecordSet, diagnostics: &mut Diagnostics) -> Vec<NameplateRow> {
    let fields = [Field::FacilityName, Field::FacilityType, Field::NameplateCapacity];
    let Some(columns) = resolve(raw, &fields, diagnostics) else {
        return Vec::new();
    };
    let (names, types, ratings) = (columns[0], columns[1], columns[2]);

    let mut rows: Vec<NameplateRow> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut bad_ratings = ParseFailures::new(Dropped::Quantity);

    for idx in 0..raw.height() {
        if !matches_label(types.get(idx), "production") {
            continue;
        }
        let Some(name) = names.get(idx).map(str::trim).filter(|n| !n.is_empty()) else {
            continue;
        };
        let rating = bad_ratings.quantity(ratings.get(idx));

        match index.get(name) {
            Some(&existing) => {
                if rows[existing].nameplate_tj.is_none() {
                    rows[existing].nameplate_tj = rating;
                } else if rating.is_some() {
                    warn!("Duplicate nameplate rating for '{}', keeping the first", name);
                }
            }
            None => {
                index.insert(name.to_string(), rows.len());
                rows.push(NameplateRow {
                    facility_name: name.to_string(),
                    nameplate_tj: rating,
                });
            }
        }
    }

    bad_ratings.flush(raw, diagnostics);
    debug!("nameplate: {} production facilities from {} rows", rows.len(), raw.height());
    rows
}

/// Per-facility, per-day outlook capacity for production facilities.
pub fn normalize_outlook(raw: &RawRecordSet, diagnostics: &mut Diagnostics) -> Vec<OutlookRow> {
    let fields = [Field::FacilityName, Field::FacilityType, Field::GasDay, Field::Capacity];
    let Some(columns) = resolve(raw, &fields, diagnostics) else {
        return Vec::new();
    };
    let (names, types, days, capacities) = (columns[0], columns[1], columns[2], columns[3]);

    let mut rows = Vec::new();
    let mut bad_days = ParseFailures::new(Dropped::GasDay);
    let mut bad_capacities = ParseFailures::new(Dropped::Quantity);

    for idx in 0..raw.height() {
        let Some(gas_day) = days.get(idx).and_then(parse_gas_day) else {
            bad_days.record(days.get(idx));
            continue;
        };
        if !matches_label(types.get(idx), "production") {
            continue;
        }
        let Some(name) = names.get(idx).map(str::trim).filter(|n| !n.is_empty()) else {
            continue;
        };

        rows.push(OutlookRow {
            facility_name: name.to_string(),
            gas_day,
            available_tj: bad_capacities.quantity(capacities.get(idx)),
        });
    }

    bad_days.flush(raw, diagnostics);
    bad_capacities.flush(raw, diagnostics);
    debug!("outlook: {} production rows from {} rows", rows.len(), raw.height());
    rows
}

/// Demand rows for the system-wide zone named `zone`.
pub fn normalize_demand(
    raw: &RawRecordSet,
    zone: &str,
    diagnostics: &mut Diagnostics,
) -> Vec<DemandRecord> {
    let fields = [Field::GasDay, Field::ZoneType, Field::ZoneName, Field::Quantity];
    let Some(columns) = resolve(raw, &fields, diagnostics) else {
        return Vec::new();
    };
    let (days, zone_types, zone_names, quantities) = (columns[0], columns[1], columns[2], columns[3]);

    let mut rows = Vec::new();
    let mut bad_days = ParseFailures::new(Dropped::GasDay);
    let mut bad_quantities = ParseFailures::new(Dropped::Quantity);

    for idx in 0..raw.height() {
        let Some(gas_day) = days.get(idx).and_then(parse_gas_day) else {
            bad_days.record(days.get(idx));
            continue;
        };
        if !matches_label(zone_types.get(idx), "demand") || !matches_label(zone_names.get(idx), zone) {
            continue;
        }
        // Blank or non-numeric demand drops the row.
        let Some(quantity_tj) = quantities.get(idx).and_then(parse_quantity) else {
            bad_quantities.record(quantities.get(idx));
            continue;
        };

        rows.push(DemandRecord {
            gas_day,
            zone_type: zone_types.get(idx).unwrap_or_default().trim().to_string(),
            zone_name: zone_names.get(idx).unwrap_or_default().trim().to_string(),
            quantity_tj,
        });
    }

    bad_days.flush(raw, diagnostics);
    bad_quantities.flush(raw, diagnostics);
    debug!("flows: {} demand rows for zone '{}'", rows.len(), zone);
    rows
}
