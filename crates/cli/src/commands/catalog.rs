//! Tier catalog listing

use advisor_lib::catalog::PriceUnit;
use advisor_lib::{StorageClass, TierCatalog, TierSpec};
use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::output::{format_currency, print_json, OutputFormat};

#[derive(Tabled)]
struct TierRow {
    #[tabled(rename = "Tier")]
    id: String,
    #[tabled(rename = "Capacity (GB)")]
    capacity_gb: u64,
    #[tabled(rename = "IOPS")]
    iops: String,
    #[tabled(rename = "MB/s")]
    throughput: String,
    #[tabled(rename = "Price")]
    price: String,
}

impl From<&TierSpec> for TierRow {
    fn from(tier: &TierSpec) -> Self {
        let with_burst = |baseline: u32, burst: u32| {
            if burst > baseline {
                format!("{} (burst {})", baseline, burst)
            } else {
                baseline.to_string()
            }
        };
        let unit = match tier.price_unit {
            PriceUnit::PerDisk => "/mo",
            PriceUnit::PerGb => "/GB-mo",
        };

        Self {
            id: tier.id.clone(),
            capacity_gb: tier.capacity_gb,
            iops: with_burst(tier.baseline_iops, tier.burst_iops),
            throughput: with_burst(tier.baseline_throughput_mbps, tier.burst_throughput_mbps),
            price: format!("{}{}", format_currency(tier.unit_price, "USD"), unit),
        }
    }
}

/// Print the built-in tier tables, optionally for one storage class
pub fn show_catalog(class: Option<String>, format: OutputFormat) -> Result<()> {
    let catalog = TierCatalog::builtin();
    let classes: Vec<StorageClass> = match class {
        Some(name) => vec![name.parse::<StorageClass>().map_err(anyhow::Error::msg)?],
        None => catalog.classes().collect(),
    };

    match format {
        OutputFormat::Json => {
            let mut tiers: Vec<&TierSpec> = Vec::new();
            for class in &classes {
                tiers.extend(catalog.tiers(*class)?);
            }
            print_json(&tiers)?;
        }
        OutputFormat::Table => {
            for class in classes {
                println!("{}", class.as_str().bold());
                let rows: Vec<TierRow> = catalog.tiers(class)?.iter().map(TierRow::from).collect();
                println!(
                    "{}",
                    tabled::Table::new(rows).with(tabled::settings::Style::rounded())
                );
                println!();
            }
        }
    }

    Ok(())
}
