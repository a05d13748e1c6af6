use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gas_model::normalizer::{normalize_demand, normalize_nameplate, normalize_outlook};
use gas_model::profile::{aggregate_demand, merge_supply};
use gas_model::{assemble, DatasetKey, Diagnostics, RawRecordSet};

const FACILITIES: usize = 40;
const DAYS: u32 = 365;

fn synthetic_files() -> (String, String, String) {
    let mut nameplate = String::from("FacilityName,FacilityType,NamePlateRating\n");
    let mut outlook = String::from("FacilityName,FacilityType,GasDay,Capacity\n");
    let mut flows = String::from("GasDay,ZoneType,ZoneName,Quantity\n");

    let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    for facility in 0..FACILITIES {
        nameplate.push_str(&format!("Facility {facility},Production,{}\n", 50 + facility));
    }
    for offset in 0..DAYS {
        let day = start + chrono::Duration::days(offset as i64);
        for facility in 0..FACILITIES {
            // every fifth figure missing to exercise the nameplate fallback
            let capacity = if (facility + offset as usize) % 5 == 0 {
                String::new()
            } else {
                format!("{}", 40 + facility)
            };
            outlook.push_str(&format!("Facility {facility},Production,{day},{capacity}\n"));
        }
        flows.push_str(&format!("{day},Demand,Whole WA,{}\n", 900 + offset));
        flows.push_str(&format!("{day},Demand,Pilbara,{}\n", 200 + offset));
    }

    (nameplate, outlook, flows)
}

fn benchmark_raw_parsing(c: &mut Criterion) {
    let (_, outlook, _) = synthetic_files();

    c.bench_function("parse_outlook_csv", |b| {
        b.iter(|| {
            let _raw = black_box(RawRecordSet::from_csv_bytes(
                DatasetKey::MediumTermOutlook,
                outlook.as_bytes(),
            ));
        });
    });
}

fn benchmark_model_assembly(c: &mut Criterion) {
    let (nameplate, outlook, flows) = synthetic_files();
    let nameplate = RawRecordSet::from_csv_bytes(DatasetKey::Nameplate, nameplate.as_bytes()).unwrap();
    let outlook = RawRecordSet::from_csv_bytes(DatasetKey::MediumTermOutlook, outlook.as_bytes()).unwrap();
    let flows = RawRecordSet::from_csv_bytes(DatasetKey::Flows, flows.as_bytes()).unwrap();

    c.bench_function("normalize_and_assemble", |b| {
        b.iter(|| {
            let mut diagnostics = Diagnostics::new();
            let supply = merge_supply(
                &normalize_nameplate(&nameplate, &mut diagnostics),
                &normalize_outlook(&outlook, &mut diagnostics),
            );
            let demand = aggregate_demand(&normalize_demand(&flows, "Whole WA", &mut diagnostics));
            let _model = black_box(assemble(&supply, &demand));
        });
    });
}

criterion_group!(benches, benchmark_raw_parsing, benchmark_model_assembly);
criterion_main!(benches);
