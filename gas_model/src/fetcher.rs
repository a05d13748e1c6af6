use crate::config::{DatasetKey, PipelineConfig};
use crate::diagnostics::{Diagnostics, Stage};
use crate::error::{PipelineError, Result};
use crate::raw::RawRecordSet;
use chrono::{DateTime, Utc};
use log::{debug, info};
use regex::bytes::Regex;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};
use std::time::Duration;
use tempfile::NamedTempFile;

/// Bytes inspected when deciding whether a payload is an HTML page.
const SNIFF_LEN: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("{0}")]
    Transport(String),
}

/// Blocking retrieval of a remote resource.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str) -> std::result::Result<Vec<u8>, TransportError>;
}

pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn get(&self, url: &str) -> std::result::Result<Vec<u8>, TransportError> {
        match self.agent.get(url).call() {
            Ok(response) => {
                let mut body = Vec::new();
                response
                    .into_reader()
                    .read_to_end(&mut body)
                    .map_err(|e| TransportError::Transport(e.to_string()))?;
                Ok(body)
            }
            Err(ureq::Error::Status(code, _)) => Err(TransportError::Status(code)),
            Err(ureq::Error::Transport(t)) => Err(TransportError::Transport(t.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: DatasetKey,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub retrieved_at: DateTime<Utc>,
    pub stale: bool,
}

/// Retrieves bulletin files and keeps one cached copy per dataset key.
pub struct Fetcher {
    config: PipelineConfig,
    transport: Box<dyn Transport>,
    write_locks: [Mutex<()>; 3],
}

impl Fetcher {
    pub fn new(config: PipelineConfig) -> Self {
        let transport = UreqTransport::new(config.timeout());
        Self::with_transport(config, Box::new(transport))
    }

    pub fn with_transport(config: PipelineConfig, transport: Box<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            write_locks: [Mutex::new(()), Mutex::new(()), Mutex::new(())],
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fetch by textual key. An unknown key is a caller bug and is never softened.
    pub fn fetch_named(&self, key: &str, force_refresh: bool) -> Result<RawRecordSet> {
        let key: DatasetKey = key.parse()?;
        self.fetch(key, force_refresh)
    }

    pub fn fetch(&self, key: DatasetKey, force_refresh: bool) -> Result<RawRecordSet> {
        let path = self.config.cache_path(key);

        if force_refresh || self.is_stale(key) {
            self.download(key)?;
        } else {
            debug!("Using cached {} at {}", key, path.display());
        }

        let bytes = fs::read(&path).map_err(|e| PipelineError::cache(&path, e))?;
        RawRecordSet::from_csv_bytes(key, &bytes)
    }

    /// Best-effort fetch: any failure is reported to `diagnostics` and an
    /// empty record set with the key's canonical columns is returned.
    pub fn fetch_or_empty(
        &self,
        key: DatasetKey,
        force_refresh: bool,
        diagnostics: &mut Diagnostics,
    ) -> RawRecordSet {
        match self.fetch(key, force_refresh) {
            Ok(raw) => raw,
            Err(e) => {
                diagnostics.report(Stage::Fetch, e);
                RawRecordSet::empty(key)
            }
        }
    }

    /// Stale when missing, unreadable, or older than the configured max age.
    pub fn is_stale(&self, key: DatasetKey) -> bool {
        match last_retrieved(&self.config.cache_path(key)) {
            Some(retrieved_at) => Utc::now() - retrieved_at > self.config.max_age(),
            None => true,
        }
    }

    pub fn cache_entries(&self) -> Vec<CacheEntry> {
        DatasetKey::ALL
            .iter()
            .filter_map(|&key| {
                let path = self.config.cache_path(key);
                let metadata = fs::metadata(&path).ok()?;
                let retrieved_at = metadata.modified().ok().map(DateTime::<Utc>::from)?;
                Some(CacheEntry {
                    key,
                    stale: self.is_stale(key),
                    size_bytes: metadata.len(),
                    retrieved_at,
                    path,
                })
            })
            .collect()
    }

    fn download(&self, key: DatasetKey) -> Result<()> {
        let url = self.config.url(key);
        info!("Downloading {} from {}", key, url);

        let body = self.transport.get(&url).map_err(|e| PipelineError::Retrieval {
            key,
            reason: e.to_string(),
        })?;

        let _guard = self.write_locks[key.index()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let dir = &self.config.cache_dir;
        fs::create_dir_all(dir).map_err(|e| PipelineError::cache(dir, e))?;

        // Staged beside the final path so the rename below is atomic.
        let mut staged = NamedTempFile::new_in(dir).map_err(|e| PipelineError::cache(dir, e))?;
        staged
            .write_all(&body)
            .and_then(|_| staged.flush())
            .map_err(|e| PipelineError::cache(staged.path(), e))?;

        if let Err(reason) = validate_payload(&body) {
            // Dropping the staged file deletes it.
            drop(staged);
            return Err(PipelineError::InvalidPayload { key, reason });
        }

        let path = self.config.cache_path(key);
        staged
            .persist(&path)
            .map_err(|e| PipelineError::cache(&path, e.error))?;

        info!("Cached {} ({} bytes) at {}", key, body.len(), path.display());
        Ok(())
    }
}

fn last_retrieved(path: &Path) -> Option<DateTime<Utc>> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Utc>::from)
}

fn html_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"(?i-u)^(?:\xEF\xBB\xBF)?\s*<(?:!doctype\s+html|html|head|body|\?xml)")
            .expect("static pattern")
    })
}

/// Rejects empty bodies and error/redirect pages served in place of a CSV.
/// A bulletin header never starts with a tag, so any leading `<` is markup.
pub fn validate_payload(body: &[u8]) -> std::result::Result<(), String> {
    let head = &body[..body.len().min(SNIFF_LEN)];
    let text = head.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(head);
    match text.iter().copied().find(|b| !b.is_ascii_whitespace()) {
        None => Err("empty body".to_string()),
        Some(b'<') if html_marker().is_match(head) => {
            Err("body is an HTML document, not CSV".to_string())
        }
        Some(b'<') => Err("body starts with markup, not CSV".to_string()),
        Some(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_payload() {
        assert!(validate_payload(b"FacilityName,Capacity\nA,1\n").is_ok());
        assert!(validate_payload(b"").is_err());
        assert!(validate_payload(b"  \n ").is_err());
        assert!(validate_payload(b"<!DOCTYPE html><html><body>404</body></html>").is_err());
        assert!(validate_payload(b"\n  <HTML>\n<head><title>Moved</title>").is_err());
        assert!(validate_payload(b"\xEF\xBB\xBF<html>").is_err());
        assert!(validate_payload(b"<?xml version=\"1.0\"?><error/>").is_err());
        assert!(validate_payload(b"<!-- maintenance -->\n<html><body>Service unavailable</body></html>").is_err());
        assert!(validate_payload(b"<script>location='/x'</script>").is_err());
        assert!(validate_payload(b"\xEF\xBB\xBF \r\n<p>moved</p>").is_err());
        assert!(validate_payload(b"\xEF\xBB\xBFFacilityName,Capacity\nA,1\n").is_ok());
        // markup further down a valid CSV is not a page
        assert!(validate_payload(b"Name,Note\nA,<html>\n").is_ok());
    }
}
