pub mod assembler;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod normalizer;
pub mod profile;
pub mod raw;
pub mod scenario;
pub mod schema;
pub mod service;

pub use assembler::{assemble, ModelAssembler, ModelOutput};
pub use config::{DatasetKey, PipelineConfig};
pub use diagnostics::{Diagnostic, Diagnostics, Stage};
pub use error::{PipelineError, Result};
pub use fetcher::{CacheEntry, Fetcher, Transport, TransportError, UreqTransport};
pub use models::{DemandProfile, DemandRow, ModelRow, ModelTable, SupplyProfile, SupplyRow};
pub use raw::RawRecordSet;
pub use scenario::Scenario;
pub use service::ModelService;
