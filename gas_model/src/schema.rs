//! Column-name mapping for the bulletin files.
//!
//! The published headers have changed spelling and casing between releases
//! (`NamePlateRating`, `nameplaterating`, `CapacityQuantity`, ...). Each
//! canonical field lists every spelling seen so far, tagged with the
//! revision that introduced it. Headers are folded (ASCII lower-case,
//! separators removed) before comparison, which absorbs casing drift.

use std::collections::HashMap;

/// Source header revisions the mapping knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SchemaRevision {
    /// CamelCase headers of the original bulletin layout.
    Rev1,
    /// Capacity reporting layout: `CapacityQuantity`, `GasDate`, `OutlookQuantity`.
    Rev2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    FacilityName,
    FacilityType,
    NameplateCapacity,
    GasDay,
    Capacity,
    ZoneType,
    ZoneName,
    Quantity,
}

struct Spelling {
    field: Field,
    folded: &'static str,
    since: SchemaRevision,
}

const fn spelling(field: Field, folded: &'static str, since: SchemaRevision) -> Spelling {
    Spelling { field, folded, since }
}

// Order matters: the first spelling present in a file wins.
#[rustfmt::skip]
const SPELLINGS: &[Spelling] = &[
    spelling(Field::FacilityName, "facilityname", SchemaRevision::Rev1),
    spelling(Field::FacilityType, "facilitytype", SchemaRevision::Rev1),
    spelling(Field::NameplateCapacity, "nameplaterating", SchemaRevision::Rev1),
    spelling(Field::NameplateCapacity, "capacityquantity", SchemaRevision::Rev2),
    spelling(Field::GasDay, "gasday", SchemaRevision::Rev1),
    spelling(Field::GasDay, "gasdate", SchemaRevision::Rev2),
    spelling(Field::Capacity, "capacity", SchemaRevision::Rev1),
    spelling(Field::Capacity, "outlookquantity", SchemaRevision::Rev2),
    spelling(Field::Capacity, "capacityquantity", SchemaRevision::Rev2),
    spelling(Field::ZoneType, "zonetype", SchemaRevision::Rev1),
    spelling(Field::ZoneName, "zonename", SchemaRevision::Rev1),
    spelling(Field::Quantity, "quantity", SchemaRevision::Rev1),
    spelling(Field::Quantity, "actualquantity", SchemaRevision::Rev2),
];

impl Field {
    /// Canonical (folded) name, as used by the empty fallback record sets.
    pub fn canonical(self) -> &'static str {
        match self {
            Field::FacilityName => "facilityname",
            Field::FacilityType => "facilitytype",
            Field::NameplateCapacity => "nameplaterating",
            Field::GasDay => "gasday",
            Field::Capacity => "capacity",
            Field::ZoneType => "zonetype",
            Field::ZoneName => "zonename",
            Field::Quantity => "quantity",
        }
    }

    pub fn synonyms(self) -> impl Iterator<Item = &'static str> {
        SPELLINGS
            .iter()
            .filter(move |s| s.field == self)
            .map(|s| s.folded)
    }

    pub fn synonyms_in(self, revision: SchemaRevision) -> impl Iterator<Item = &'static str> {
        SPELLINGS
            .iter()
            .filter(move |s| s.field == self && s.since == revision)
            .map(|s| s.folded)
    }
}

pub fn fold(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Actual column names chosen for a set of canonical fields.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    columns: HashMap<Field, String>,
}

impl ColumnMap {
    /// Resolve `fields` against `columns`; the error lists the canonical
    /// names of every field with no matching column.
    pub fn resolve(columns: &[String], fields: &[Field]) -> Result<Self, Vec<&'static str>> {
        let folded: Vec<String> = columns.iter().map(|c| fold(c)).collect();
        let mut resolved = HashMap::new();
        let mut missing = Vec::new();

        for &field in fields {
            let found = field
                .synonyms()
                .find_map(|syn| folded.iter().position(|f| f == syn));
            match found {
                Some(idx) => {
                    resolved.insert(field, columns[idx].clone());
                }
                None => missing.push(field.canonical()),
            }
        }

        if missing.is_empty() {
            Ok(Self { columns: resolved })
        } else {
            Err(missing)
        }
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.columns.get(&field).map(String::as_str)
    }
}
