use anyhow::{Context, Result};
use gas_model::{ModelTable, SupplyProfile};
use polars::prelude::*;
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

fn fmt_tj(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:>9.1}", v))
        .unwrap_or_else(|| format!("{:>9}", "n/a"))
}

pub fn print_summary(supply: &SupplyProfile, model: &ModelTable) {
    println!("\n📊 Daily Supply and Demand Balance");
    println!("{}", "=".repeat(60));
    println!(
        "{:<12} {:>9} {:>9} {:>9}",
        "Date", "Supply", "Demand", "Shortfall"
    );
    for row in model.rows() {
        let marker = if row.is_deficit() { "  ⚠️" } else { "" };
        println!(
            "{:<12} {} {:>9.1} {}{}",
            row.gas_day.to_string(),
            fmt_tj(row.total_supply_tj),
            row.total_demand_tj,
            fmt_tj(row.shortfall_tj),
            marker
        );
    }

    let deficit_days = model.deficit_days().count();
    let unknown_days = model.rows().iter().filter(|r| r.shortfall_tj.is_none()).count();
    println!("{}", "-".repeat(60));
    println!("Gas days: {}", model.len());
    println!("Facilities: {}", supply.facilities().join(", "));
    println!("Days in deficit: {}", deficit_days);
    if unknown_days > 0 {
        println!("Days without supply data: {}", unknown_days);
    }
    if let Some(worst) = model
        .rows()
        .iter()
        .filter_map(|r| r.shortfall_tj.map(|s| (r.gas_day, s)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
    {
        println!("Tightest day: {} ({:+.1} TJ)", worst.0, worst.1);
    }
}

pub fn print_csv(model: &ModelTable) -> Result<()> {
    let mut df = model.to_dataframe()?;
    CsvWriter::new(std::io::stdout())
        .include_header(true)
        .finish(&mut df)?;
    Ok(())
}

#[derive(Serialize)]
struct JsonReport<'a> {
    supply: &'a SupplyProfile,
    model: &'a ModelTable,
}

pub fn print_json(supply: &SupplyProfile, model: &ModelTable) -> Result<()> {
    let json = serde_json::to_string_pretty(&JsonReport { supply, model })?;
    println!("{}", json);
    Ok(())
}

/// Write both tables as CSV into `out_dir`; returns the written paths.
pub fn write_tables(out_dir: &Path, supply: &SupplyProfile, model: &ModelTable) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;

    let mut written = Vec::new();
    for (name, mut df) in [
        ("supply_profile.csv", supply.to_dataframe()?),
        ("model.csv", model.to_dataframe()?),
    ] {
        let path = out_dir.join(name);
        let mut file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;
        written.push(path);
    }
    Ok(written)
}
