use chrono::NaiveDate;
use gas_model::{
    DatasetKey, Fetcher, ModelAssembler, ModelRow, ModelService, PipelineConfig, PipelineError,
    Stage, Transport, TransportError,
};
use std::collections::HashMap;
use std::fs::{self, File};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

const NAMEPLATE: &str = "FacilityName,FacilityType,NamePlateRating\n\
                         A,Production,50\n\
                         Pipe,Pipeline,900\n";
const OUTLOOK: &str = "FacilityName,FacilityType,GasDay,Capacity\n\
                       A,Production,2024-01-01,40\n\
                       A,Production,2024-01-02,\n";
const FLOWS: &str = "GasDay,ZoneType,ZoneName,Quantity\n\
                     2024-01-01,Demand,Whole WA,45\n\
                     2024-01-02,Demand,Whole WA,38\n\
                     2024-01-02,Demand,Pilbara,12\n";

/// Serves canned bodies by file name and records every request.
#[derive(Clone, Default)]
struct FakeTransport {
    responses: Arc<Mutex<HashMap<String, Result<Vec<u8>, TransportError>>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl FakeTransport {
    fn serving_all() -> Self {
        let fake = Self::default();
        fake.serve(DatasetKey::Nameplate, NAMEPLATE);
        fake.serve(DatasetKey::MediumTermOutlook, OUTLOOK);
        fake.serve(DatasetKey::Flows, FLOWS);
        fake
    }

    fn serve(&self, key: DatasetKey, body: &str) {
        self.set(key, Ok(body.as_bytes().to_vec()));
    }

    fn set(&self, key: DatasetKey, response: Result<Vec<u8>, TransportError>) {
        self.responses
            .lock()
            .unwrap()
            .insert(key.default_file_name().to_string(), response);
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Transport for FakeTransport {
    fn get(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        self.requests.lock().unwrap().push(url.to_string());
        let file = url.rsplit('/').next().unwrap_or_default();
        self.responses
            .lock()
            .unwrap()
            .get(file)
            .cloned()
            .unwrap_or(Err(TransportError::Status(404)))
    }
}

fn fetcher(dir: &TempDir, transport: &FakeTransport) -> Fetcher {
    let config = PipelineConfig::with_cache_dir(dir.path());
    Fetcher::with_transport(config, Box::new(transport.clone()))
}

fn age_file(path: &Path, age: Duration) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - age).unwrap();
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

#[test]
fn test_end_to_end_scenario() {
    let dir = TempDir::new().unwrap();
    let transport = FakeTransport::serving_all();
    let assembler = ModelAssembler::new(fetcher(&dir, &transport));

    let output = assembler.build_model();
    assert!(!output.diagnostics.is_degraded(), "{:?}", output.diagnostics);

    let supply: Vec<_> = output
        .supply
        .rows()
        .iter()
        .map(|r| (r.facility_name.as_str(), r.gas_day, r.available_tj))
        .collect();
    assert_eq!(supply, vec![("A", day(1), Some(40.0)), ("A", day(2), Some(50.0))]);

    assert_eq!(
        output.model.rows(),
        &[
            ModelRow::new(day(1), Some(40.0), 45.0),
            ModelRow::new(day(2), Some(50.0), 38.0),
        ]
    );
    assert_eq!(output.model.rows()[0].shortfall_tj, Some(-5.0));
    assert_eq!(output.model.rows()[1].shortfall_tj, Some(12.0));
}

#[test]
fn test_build_model_is_idempotent_over_warm_cache() {
    let dir = TempDir::new().unwrap();
    let transport = FakeTransport::serving_all();
    let assembler = ModelAssembler::new(fetcher(&dir, &transport));

    let (supply_a, model_a) = assembler.build_model().into_parts();
    assert_eq!(transport.request_count(), 3);

    let (supply_b, model_b) = assembler.build_model().into_parts();
    assert_eq!(transport.request_count(), 3);
    assert_eq!(supply_a, supply_b);
    assert_eq!(model_a, model_b);
}

#[test]
fn test_fresh_cache_is_served_without_download() {
    let dir = TempDir::new().unwrap();
    let transport = FakeTransport::serving_all();
    let fetcher = fetcher(&dir, &transport);

    fetcher.fetch(DatasetKey::Flows, false).unwrap();
    transport.serve(DatasetKey::Flows, "GasDay,ZoneType,ZoneName,Quantity\n");

    let raw = fetcher.fetch(DatasetKey::Flows, false).unwrap();
    assert_eq!(transport.request_count(), 1);
    assert_eq!(raw.height(), 3);
    assert!(!fetcher.is_stale(DatasetKey::Flows));
}

#[test]
fn test_stale_cache_is_downloaded_again() {
    let dir = TempDir::new().unwrap();
    let transport = FakeTransport::serving_all();
    let fetcher = fetcher(&dir, &transport);

    fetcher.fetch(DatasetKey::Flows, false).unwrap();
    age_file(
        &fetcher.config().cache_path(DatasetKey::Flows),
        Duration::from_secs(25 * 3600),
    );
    assert!(fetcher.is_stale(DatasetKey::Flows));

    transport.serve(DatasetKey::Flows, "GasDay,ZoneType,ZoneName,Quantity\n2024-01-03,Demand,Whole WA,1\n");
    let raw = fetcher.fetch(DatasetKey::Flows, false).unwrap();

    assert_eq!(transport.request_count(), 2);
    assert_eq!(raw.height(), 1);
    assert!(!fetcher.is_stale(DatasetKey::Flows));
}

#[test]
fn test_force_refresh_always_downloads() {
    let dir = TempDir::new().unwrap();
    let transport = FakeTransport::serving_all();
    let fetcher = fetcher(&dir, &transport);

    fetcher.fetch(DatasetKey::Nameplate, false).unwrap();
    fetcher.fetch(DatasetKey::Nameplate, true).unwrap();
    fetcher.fetch(DatasetKey::Nameplate, true).unwrap();
    assert_eq!(transport.request_count(), 3);
}

#[test]
fn test_html_payload_is_rejected_and_not_cached() {
    let dir = TempDir::new().unwrap();
    let transport = FakeTransport::default();
    transport.serve(DatasetKey::Nameplate, "<!DOCTYPE html>\n<html><body>Maintenance</body></html>");
    let fetcher = fetcher(&dir, &transport);

    let err = fetcher.fetch(DatasetKey::Nameplate, false).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidPayload { key: DatasetKey::Nameplate, .. }));
    assert!(!fetcher.config().cache_path(DatasetKey::Nameplate).exists());

    // no staged leftovers either
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_failed_retrieval_keeps_previous_cache() {
    let dir = TempDir::new().unwrap();
    let transport = FakeTransport::serving_all();
    let fetcher = fetcher(&dir, &transport);

    fetcher.fetch(DatasetKey::MediumTermOutlook, false).unwrap();
    transport.set(DatasetKey::MediumTermOutlook, Err(TransportError::Status(503)));

    let err = fetcher.fetch(DatasetKey::MediumTermOutlook, true).unwrap_err();
    assert!(matches!(err, PipelineError::Retrieval { .. }));

    let cached = fs::read_to_string(fetcher.config().cache_path(DatasetKey::MediumTermOutlook)).unwrap();
    assert_eq!(cached, OUTLOOK);
}

#[test]
fn test_rejected_payload_keeps_previous_cache() {
    let dir = TempDir::new().unwrap();
    let transport = FakeTransport::serving_all();
    let fetcher = fetcher(&dir, &transport);

    fetcher.fetch(DatasetKey::Nameplate, false).unwrap();
    transport.serve(
        DatasetKey::Nameplate,
        "<!-- maintenance -->\n<html><body>Service unavailable</body></html>",
    );

    let err = fetcher.fetch(DatasetKey::Nameplate, true).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidPayload { key: DatasetKey::Nameplate, .. }));

    let cached = fs::read_to_string(fetcher.config().cache_path(DatasetKey::Nameplate)).unwrap();
    assert_eq!(cached, NAMEPLATE);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);

    // the good copy keeps serving unforced reads
    assert_eq!(fetcher.fetch(DatasetKey::Nameplate, false).unwrap().height(), 2);
    assert_eq!(transport.request_count(), 2);
}

#[test]
fn test_staleness_threshold() {
    let dir = TempDir::new().unwrap();
    let transport = FakeTransport::serving_all();
    let fetcher = fetcher(&dir, &transport);
    let path = fetcher.config().cache_path(DatasetKey::Flows);

    fetcher.fetch(DatasetKey::Flows, false).unwrap();

    age_file(&path, Duration::from_secs(24 * 3600 - 60));
    assert!(!fetcher.is_stale(DatasetKey::Flows));
    fetcher.fetch(DatasetKey::Flows, false).unwrap();
    assert_eq!(transport.request_count(), 1);

    age_file(&path, Duration::from_secs(24 * 3600 + 60));
    assert!(fetcher.is_stale(DatasetKey::Flows));
    fetcher.fetch(DatasetKey::Flows, false).unwrap();
    assert_eq!(transport.request_count(), 2);
}

#[test]
fn test_unknown_key_fails_fast() {
    let dir = TempDir::new().unwrap();
    let transport = FakeTransport::serving_all();
    let fetcher = fetcher(&dir, &transport);

    let err = fetcher.fetch_named("storage", false).unwrap_err();
    assert!(matches!(err, PipelineError::UnknownDatasetKey(_)));
    assert_eq!(transport.request_count(), 0);

    assert_eq!(fetcher.fetch_named("mto_future", false).unwrap().height(), 2);
}

#[test]
fn test_failed_dataset_degrades_to_empty_model() {
    let dir = TempDir::new().unwrap();
    let transport = FakeTransport::serving_all();
    transport.set(DatasetKey::Flows, Err(TransportError::Transport("timed out".into())));
    let assembler = ModelAssembler::new(fetcher(&dir, &transport));

    let output = assembler.build_model();
    assert!(output.is_empty());
    assert!(output.supply.is_empty());
    assert!(output.model.is_empty());
    assert!(output.diagnostics.is_degraded());
    assert_eq!(output.diagnostics.at_stage(Stage::Fetch).count(), 1);
}

#[test]
fn test_schema_drift_in_published_files() {
    let dir = TempDir::new().unwrap();
    let transport = FakeTransport::default();
    transport.serve(
        DatasetKey::Nameplate,
        "facilityid,facilityname,facilitytype,capacityquantity\n1,A,PRODUCTION,50\n",
    );
    transport.serve(
        DatasetKey::MediumTermOutlook,
        "FacilityName,FacilityType,GasDate,OutlookQuantity\nA,Production,2024/01/01,\n",
    );
    transport.serve(
        DatasetKey::Flows,
        "gasdate,zonetype,zonename,actualquantity\n2024-01-01,demand,WHOLE WA,70\n",
    );
    let assembler = ModelAssembler::new(fetcher(&dir, &transport));

    let output = assembler.build_model();
    assert_eq!(output.model.rows(), &[ModelRow::new(day(1), Some(50.0), 70.0)]);
}

#[test]
fn test_cache_entries_list_cached_files() {
    let dir = TempDir::new().unwrap();
    let transport = FakeTransport::serving_all();
    let fetcher = fetcher(&dir, &transport);
    assert!(fetcher.cache_entries().is_empty());

    fetcher.fetch(DatasetKey::Flows, false).unwrap();
    let entries = fetcher.cache_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].key, DatasetKey::Flows);
    assert_eq!(entries[0].size_bytes, FLOWS.len() as u64);
    assert!(!entries[0].stale);
}

#[test]
fn test_service_caches_until_refresh() {
    let dir = TempDir::new().unwrap();
    let transport = FakeTransport::serving_all();
    let service = ModelService::with_default_ttl(ModelAssembler::new(fetcher(&dir, &transport)));

    let first = service.model();
    let second = service.model();
    assert!(Arc::ptr_eq(&first, &second));

    transport.serve(
        DatasetKey::Flows,
        "GasDay,ZoneType,ZoneName,Quantity\n2024-01-01,Demand,Whole WA,60\n",
    );
    let results = service.refresh(&[DatasetKey::Flows]);
    assert_eq!(results.len(), 1);
    assert_eq!(*results[0].1.as_ref().unwrap(), 1);

    let third = service.model();
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(third.model.rows(), &[ModelRow::new(day(1), Some(40.0), 60.0)]);
}

#[test]
fn test_service_rebuilds_after_ttl() {
    let dir = TempDir::new().unwrap();
    let transport = FakeTransport::serving_all();
    let service = ModelService::new(
        ModelAssembler::new(fetcher(&dir, &transport)),
        chrono::Duration::zero(),
    );

    let first = service.model();
    let second = service.model();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(first.model, second.model);
}

#[test]
fn test_concurrent_fetches_share_one_cache_file() {
    let dir = TempDir::new().unwrap();
    let transport = FakeTransport::serving_all();
    let fetcher = Arc::new(fetcher(&dir, &transport));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let fetcher = Arc::clone(&fetcher);
            std::thread::spawn(move || fetcher.fetch(DatasetKey::Flows, true).map(|raw| raw.height()))
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap().unwrap(), 3);
    }
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}
