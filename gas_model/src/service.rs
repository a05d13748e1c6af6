use crate::assembler::{ModelAssembler, ModelOutput};
use crate::config::DatasetKey;
use crate::error::Result;
use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use std::sync::{Arc, Mutex, PoisonError};

/// Datasets a manual refresh re-downloads; nameplate ratings rarely change.
pub const DEFAULT_REFRESH: [DatasetKey; 2] = [DatasetKey::MediumTermOutlook, DatasetKey::Flows];

struct CachedModel {
    built_at: DateTime<Utc>,
    output: Arc<ModelOutput>,
}

/// Result cache in front of the assembler, as used by a presentation layer.
pub struct ModelService {
    assembler: ModelAssembler,
    ttl: Duration,
    cached: Mutex<Option<CachedModel>>,
}

impl ModelService {
    pub fn new(assembler: ModelAssembler, ttl: Duration) -> Self {
        Self {
            assembler,
            ttl,
            cached: Mutex::new(None),
        }
    }

    pub fn with_default_ttl(assembler: ModelAssembler) -> Self {
        Self::new(assembler, Duration::hours(1))
    }

    pub fn assembler(&self) -> &ModelAssembler {
        &self.assembler
    }

    /// Cached output while younger than the TTL, otherwise a fresh build.
    pub fn model(&self) -> Arc<ModelOutput> {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(entry) = cached.as_ref() {
            if Utc::now() - entry.built_at < self.ttl {
                debug!("Serving model built at {}", entry.built_at);
                return Arc::clone(&entry.output);
            }
        }

        let output = Arc::new(self.assembler.build_model());
        *cached = Some(CachedModel {
            built_at: Utc::now(),
            output: Arc::clone(&output),
        });
        output
    }

    pub fn invalidate(&self) {
        *self.cached.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Force re-download of `keys`, then drop the cached model so the next
    /// read reflects the new files. Returns the row count per key.
    pub fn refresh(&self, keys: &[DatasetKey]) -> Vec<(DatasetKey, Result<usize>)> {
        let results = keys
            .iter()
            .map(|&key| {
                let rows = self.assembler.fetcher().fetch(key, true).map(|raw| raw.height());
                (key, rows)
            })
            .collect();

        self.invalidate();
        info!("Refreshed {} datasets", keys.len());
        results
    }
}
