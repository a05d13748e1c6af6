use crate::config::DatasetKey;
use crate::error::{PipelineError, Result};
use csv::{ReaderBuilder, Trim};
use log::{debug, warn};
use polars::prelude::*;

/// A bulletin file as retrieved: every cell is kept as an (optional) string
/// and header names are lower-cased, so callers never see source casing.
#[derive(Debug, Clone)]
pub struct RawRecordSet {
    key: DatasetKey,
    frame: DataFrame,
}

impl RawRecordSet {
    /// Empty set carrying the key's canonical columns.
    pub fn empty(key: DatasetKey) -> Self {
        let columns: Vec<Series> = key
            .canonical_columns()
            .iter()
            .map(|name| Series::new_empty((*name).into(), &DataType::String))
            .collect();
        let frame = DataFrame::new(columns).unwrap_or_default();
        Self { key, frame }
    }

    pub fn from_csv_bytes(key: DatasetKey, bytes: &[u8]) -> Result<Self> {
        let parse_err = |e: csv::Error| PipelineError::Parse {
            key,
            reason: e.to_string(),
        };

        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .trim(Trim::All)
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()
            .map_err(parse_err)?
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();

        // Later duplicates of a lower-cased header are ignored.
        let mut keep = Vec::with_capacity(headers.len());
        for (idx, name) in headers.iter().enumerate() {
            if name.is_empty() || headers[..idx].contains(name) {
                warn!("{}: ignoring duplicate or blank column #{} '{}'", key, idx, name);
            } else {
                keep.push(idx);
            }
        }

        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); keep.len()];
        for record in reader.records() {
            let record = record.map_err(parse_err)?;
            if record.iter().all(str::is_empty) {
                continue;
            }
            for (slot, &idx) in keep.iter().enumerate() {
                let value = record.get(idx).filter(|v| !v.is_empty()).map(str::to_string);
                cells[slot].push(value);
            }
        }

        let columns: Vec<Series> = keep
            .iter()
            .zip(cells)
            .map(|(&idx, values)| Series::new(headers[idx].as_str().into(), values))
            .collect();
        let frame = DataFrame::new(columns)?;

        debug!("{}: parsed {} rows x {} columns", key, frame.height(), frame.width());
        Ok(Self { key, frame })
    }

    pub fn key(&self) -> DatasetKey {
        self.key
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn width(&self) -> usize {
        self.frame.width()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&StringChunked> {
        self.frame.column(name).ok().and_then(|c| c.str().ok())
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }
}
