use gas_model::normalizer::{normalize_demand, normalize_nameplate, normalize_outlook};
use gas_model::profile::{aggregate_demand, merge_supply};
use gas_model::{assemble, DatasetKey, Diagnostics, RawRecordSet, Scenario};

const NAMEPLATE: &str = "FacilityName,FacilityType,NamePlateRating\n\
                         North Field,Production,50\n\
                         South Field,Production,120\n";
const OUTLOOK: &str = "FacilityName,FacilityType,GasDay,Capacity\n\
                       North Field,Production,2024-01-15,40\n\
                       North Field,Production,2024-01-16,\n\
                       South Field,Production,2024-01-15,80\n\
                       South Field,Production,2024-01-16,60\n";
const FLOWS: &str = "GasDay,ZoneType,ZoneName,Quantity\n\
                     2024-01-15,Demand,Whole WA,125\n\
                     2024-01-16,Demand,Whole WA,118\n\
                     2024-01-17,Demand,Whole WA,121\n";

fn main() {
    // Offline run over in-memory bulletin files
    let mut diagnostics = Diagnostics::new();
    let nameplate = RawRecordSet::from_csv_bytes(DatasetKey::Nameplate, NAMEPLATE.as_bytes()).unwrap();
    let outlook = RawRecordSet::from_csv_bytes(DatasetKey::MediumTermOutlook, OUTLOOK.as_bytes()).unwrap();
    let flows = RawRecordSet::from_csv_bytes(DatasetKey::Flows, FLOWS.as_bytes()).unwrap();

    let supply = merge_supply(
        &normalize_nameplate(&nameplate, &mut diagnostics),
        &normalize_outlook(&outlook, &mut diagnostics),
    );
    let demand = aggregate_demand(&normalize_demand(&flows, "Whole WA", &mut diagnostics));
    let model = assemble(&supply, &demand);

    println!("Supply by Facility");
    println!("==================");
    for row in supply.rows() {
        println!(
            "  {} {:<12} {:>6.1} TJ",
            row.gas_day,
            row.facility_name,
            row.available_tj.unwrap_or(f64::NAN)
        );
    }
    println!();

    // Scenario: the large consumer runs at 100 TJ/day instead of 80
    let scenario = Scenario::new(100.0).unwrap();
    let adjusted = scenario.apply(&model);

    println!("Daily Balance (scenario offset {:+.0} TJ)", scenario.demand_offset());
    println!("=========================================");
    for (base, adj) in model.rows().iter().zip(adjusted.rows()) {
        let fmt = |v: Option<f64>| v.map(|v| format!("{v:>7.1}")).unwrap_or_else(|| "    n/a".into());
        println!(
            "  {}  supply {}  demand {:>7.1}  shortfall {}  (scenario {})",
            base.gas_day,
            fmt(base.total_supply_tj),
            base.total_demand_tj,
            fmt(base.shortfall_tj),
            fmt(adj.shortfall_tj)
        );
    }
}
