use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://nemweb.com.au/Reports/Current/GBB/";
pub const DEFAULT_CACHE_DIR: &str = "data_cache";
pub const DEFAULT_DEMAND_ZONE: &str = "Whole WA";

/// The three bulletin files the pipeline knows how to consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKey {
    Nameplate,
    #[serde(rename = "mto_future")]
    MediumTermOutlook,
    Flows,
}

impl DatasetKey {
    pub const ALL: [DatasetKey; 3] = [
        DatasetKey::Nameplate,
        DatasetKey::MediumTermOutlook,
        DatasetKey::Flows,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKey::Nameplate => "nameplate",
            DatasetKey::MediumTermOutlook => "mto_future",
            DatasetKey::Flows => "flows",
        }
    }

    /// Remote file name as published on the bulletin board.
    pub fn default_file_name(&self) -> &'static str {
        match self {
            DatasetKey::Nameplate => "GasBBNameplateRatingCurrent.csv",
            DatasetKey::MediumTermOutlook => "GasBBMediumTermCapacityOutlookFuture.csv",
            DatasetKey::Flows => "GasBBActualFlowStorageLast31.CSV",
        }
    }

    /// Columns of the empty record set handed out when a fetch fails.
    pub fn canonical_columns(&self) -> &'static [&'static str] {
        match self {
            DatasetKey::Nameplate => &["facilityname", "facilitytype", "nameplaterating"],
            DatasetKey::MediumTermOutlook => &["facilityname", "facilitytype", "gasday", "capacity"],
            DatasetKey::Flows => &["gasday", "zonetype", "zonename", "quantity"],
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            DatasetKey::Nameplate => 0,
            DatasetKey::MediumTermOutlook => 1,
            DatasetKey::Flows => 2,
        }
    }
}

impl fmt::Display for DatasetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetKey {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nameplate" => Ok(DatasetKey::Nameplate),
            "mto_future" | "mto" | "medium-term-outlook" => Ok(DatasetKey::MediumTermOutlook),
            "flows" => Ok(DatasetKey::Flows),
            _ => Err(PipelineError::UnknownDatasetKey(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub base_url: String,
    pub files: BTreeMap<DatasetKey, String>,
    pub cache_dir: PathBuf,
    pub max_age_hours: i64,
    pub timeout_secs: u64,
    pub demand_zone: String, // system-wide zone summed into total demand
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            files: DatasetKey::ALL
                .iter()
                .map(|key| (*key, key.default_file_name().to_string()))
                .collect(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            max_age_hours: 24,
            timeout_secs: 40,
            demand_zone: DEFAULT_DEMAND_ZONE.to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Self::default()
        }
    }

    pub fn file_name(&self, key: DatasetKey) -> &str {
        self.files
            .get(&key)
            .map(String::as_str)
            .unwrap_or_else(|| key.default_file_name())
    }

    pub fn url(&self, key: DatasetKey) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{}/{}", base, self.file_name(key))
    }

    /// Cached files are named identically to their remote counterpart.
    pub fn cache_path(&self, key: DatasetKey) -> PathBuf {
        self.cache_dir.join(self.file_name(key))
    }

    pub fn max_age(&self) -> chrono::Duration {
        chrono::Duration::hours(self.max_age_hours)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
