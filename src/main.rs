use anyhow::{bail, Result};
use chrono::{Local, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use gas_model::service::DEFAULT_REFRESH;
use gas_model::{DatasetKey, Fetcher, ModelAssembler, ModelService, PipelineConfig, Scenario};
use log::{info, warn};
use std::path::PathBuf;
use std::time::Duration;

mod report;

#[derive(Parser)]
#[command(name = "gas_balance")]
#[command(about = "Daily gas supply/demand balance from published bulletin board files")]
struct Args {
    /// Local directory holding the cached bulletin files
    #[arg(long, env = "GAS_BALANCE_CACHE_DIR", default_value = gas_model::config::DEFAULT_CACHE_DIR)]
    cache_dir: PathBuf,

    /// Base URL of the bulletin board reports
    #[arg(long, env = "GAS_BALANCE_BASE_URL", default_value = gas_model::config::DEFAULT_BASE_URL)]
    base_url: String,

    /// Re-download cached files older than this many hours
    #[arg(long, default_value = "24")]
    max_age_hours: i64,

    /// Network timeout per request in seconds
    #[arg(long, default_value = "40")]
    timeout_secs: u64,

    /// Zone whose demand is summed into total demand
    #[arg(long, default_value = gas_model::config::DEFAULT_DEMAND_ZONE)]
    zone: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch one dataset (nameplate, mto_future or flows)
    Fetch {
        key: String,
        /// Download even if the cached copy is fresh
        #[arg(long)]
        force: bool,
    },
    /// Force re-download of datasets (default: mto_future and flows)
    Refresh { keys: Vec<String> },
    /// Build the supply profile and daily balance
    Model {
        #[command(flatten)]
        view: ViewArgs,
    },
    /// List cached files
    Cache,
    /// Rebuild the model on a fixed interval
    Watch {
        #[arg(long, default_value = "3600")]
        interval_secs: u64,
        /// Stop after this many cycles (runs forever when omitted)
        #[arg(long)]
        iterations: Option<u64>,
        #[command(flatten)]
        view: ViewArgs,
    },
}

#[derive(clap::Args, Clone)]
struct ViewArgs {
    /// Large-consumer gas use for the scenario, TJ/day (0-100)
    #[arg(long)]
    scenario: Option<f64>,

    /// Consumption already contained in the published demand, TJ/day
    #[arg(long, default_value_t = gas_model::scenario::DEFAULT_BASELINE_TJ)]
    baseline: f64,

    /// Only show supply from this gas day onwards (YYYY-MM-DD)
    #[arg(long, conflicts_with = "today")]
    from: Option<String>,

    /// Only show supply from today onwards
    #[arg(long)]
    today: bool,

    #[arg(short, long, value_enum, default_value = "summary")]
    format: OutputFormat,

    /// Also write supply_profile.csv and model.csv here
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Summary,
    Csv,
    Json,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = PipelineConfig {
        base_url: args.base_url,
        cache_dir: args.cache_dir,
        max_age_hours: args.max_age_hours,
        timeout_secs: args.timeout_secs,
        demand_zone: args.zone,
        ..PipelineConfig::default()
    };

    match args.command {
        Command::Fetch { key, force } => {
            let key: DatasetKey = key.parse()?;
            let fetcher = Fetcher::new(config);
            let raw = fetcher.fetch(key, force)?;
            println!(
                "{}: {} rows x {} columns ({})",
                key,
                raw.height(),
                raw.width(),
                raw.column_names().join(", ")
            );
        }
        Command::Refresh { keys } => {
            let keys = parse_keys(&keys)?;
            let service = ModelService::with_default_ttl(ModelAssembler::from_config(config));
            let mut failed = 0;
            for (key, result) in service.refresh(&keys) {
                match result {
                    Ok(rows) => println!("✅ {}: {} rows", key, rows),
                    Err(e) => {
                        println!("❌ {}: {}", key, e);
                        failed += 1;
                    }
                }
            }
            if failed > 0 {
                bail!("{} of {} datasets failed to refresh", failed, keys.len());
            }
        }
        Command::Model { view } => {
            let service = ModelService::with_default_ttl(ModelAssembler::from_config(config));
            if !render(&service, &view)? {
                bail!("No data available");
            }
        }
        Command::Cache => {
            let fetcher = Fetcher::new(config);
            let entries = fetcher.cache_entries();
            if entries.is_empty() {
                println!("No cached files in {}", fetcher.config().cache_dir.display());
            }
            for entry in entries {
                let age = Utc::now() - entry.retrieved_at;
                println!(
                    "{:<12} {:<45} {:>10} bytes  {:>5}h old{}",
                    entry.key.as_str(),
                    entry.path.display().to_string(),
                    entry.size_bytes,
                    age.num_hours(),
                    if entry.stale { "  (stale)" } else { "" }
                );
            }
        }
        Command::Watch {
            interval_secs,
            iterations,
            view,
        } => {
            // Results are rebuilt every cycle; the file cache decides what is re-downloaded.
            let service = ModelService::new(ModelAssembler::from_config(config), chrono::Duration::zero());
            let mut cycle = 0u64;
            loop {
                cycle += 1;
                info!("Watch cycle {}", cycle);
                if let Err(e) = render(&service, &view) {
                    warn!("Cycle {} failed: {}", cycle, e);
                }
                if iterations.is_some_and(|n| cycle >= n) {
                    break;
                }
                std::thread::sleep(Duration::from_secs(interval_secs));
            }
        }
    }

    Ok(())
}

fn parse_keys(keys: &[String]) -> Result<Vec<DatasetKey>> {
    if keys.is_empty() {
        return Ok(DEFAULT_REFRESH.to_vec());
    }
    Ok(keys
        .iter()
        .map(|k| k.parse::<DatasetKey>())
        .collect::<Result<Vec<_>, _>>()?)
}

/// Print the model per `view`. Returns false when there is nothing to show.
fn render(service: &ModelService, view: &ViewArgs) -> Result<bool> {
    let output = service.model();
    if output.is_empty() {
        println!("⚠️  No data available. Check connectivity to the bulletin board or run `refresh`.");
        for diagnostic in output.diagnostics.entries() {
            println!("   [{}] {}", diagnostic.stage, diagnostic.error);
        }
        return Ok(false);
    }

    let model = match view.scenario {
        Some(consumption) => Scenario::with_baseline(consumption, view.baseline)?.apply(&output.model),
        None => output.model.clone(),
    };

    let from = if view.today {
        Some(Local::now().date_naive())
    } else {
        view.from
            .as_deref()
            .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
            .transpose()?
    };
    let supply = match from {
        Some(day) => output.supply.from_day(day),
        None => output.supply.clone(),
    };

    match view.format {
        OutputFormat::Summary => report::print_summary(&supply, &model),
        OutputFormat::Csv => report::print_csv(&model)?,
        OutputFormat::Json => report::print_json(&supply, &model)?,
    }

    if let Some(out_dir) = &view.out_dir {
        for path in report::write_tables(out_dir, &supply, &model)? {
            println!("Wrote {}", path.display());
        }
    }

    Ok(true)
}
