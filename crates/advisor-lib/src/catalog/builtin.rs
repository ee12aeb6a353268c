//! Built-in tier tables (East US pay-as-you-go list prices)

use super::{PriceUnit, StorageClass, TierSpec};

/// Largest provisionable disk size
const MAX_DISK_GB: u64 = 32_767;

/// Storage account capacity limit (5 PiB)
const ACCOUNT_CAPACITY_GB: u64 = 5 * 1024 * 1024;

/// (id, capacity GB, baseline IOPS, baseline MB/s, burst IOPS, burst MB/s, monthly price)
type DiskRow = (&'static str, u64, u32, u32, u32, u32, f64);

const PREMIUM_SSD: &[DiskRow] = &[
    ("P1", 4, 120, 25, 3500, 170, 0.77),
    ("P2", 8, 120, 25, 3500, 170, 1.54),
    ("P3", 16, 120, 25, 3500, 170, 3.08),
    ("P4", 32, 120, 25, 3500, 170, 5.28),
    ("P6", 64, 240, 50, 3500, 170, 10.21),
    ("P10", 128, 500, 100, 3500, 170, 19.71),
    ("P15", 256, 1100, 125, 3500, 170, 38.01),
    ("P20", 512, 2300, 150, 3500, 170, 73.60),
    // Above 512 GB burst equals baseline
    ("P30", 1024, 5000, 200, 5000, 200, 135.17),
    ("P40", 2048, 7500, 250, 7500, 250, 259.05),
    ("P50", 4096, 7500, 250, 7500, 250, 495.57),
    ("P60", 8192, 16000, 500, 16000, 500, 946.08),
    ("P70", 16384, 18000, 750, 18000, 750, 1802.44),
    ("P80", MAX_DISK_GB, 20000, 900, 20000, 900, 3604.89),
];

const STANDARD_SSD: &[DiskRow] = &[
    ("E1", 4, 500, 100, 600, 150, 0.30),
    ("E2", 8, 500, 100, 600, 150, 0.60),
    ("E3", 16, 500, 100, 600, 150, 1.20),
    ("E4", 32, 500, 100, 600, 150, 2.40),
    ("E6", 64, 500, 100, 600, 150, 4.80),
    ("E10", 128, 500, 100, 600, 150, 9.60),
    ("E15", 256, 500, 100, 600, 150, 19.20),
    ("E20", 512, 500, 100, 600, 150, 38.40),
    ("E30", 1024, 500, 100, 600, 150, 76.80),
    ("E40", 2048, 500, 150, 500, 150, 153.60),
    ("E50", 4096, 500, 250, 500, 250, 307.20),
    ("E60", 8192, 2000, 400, 2000, 400, 614.40),
    ("E70", 16384, 4000, 600, 4000, 600, 1228.80),
    ("E80", MAX_DISK_GB, 6000, 750, 6000, 750, 2457.60),
];

const STANDARD_HDD: &[DiskRow] = &[
    ("S4", 32, 500, 60, 500, 60, 1.54),
    ("S6", 64, 500, 60, 500, 60, 3.01),
    ("S10", 128, 500, 60, 500, 60, 5.89),
    ("S15", 256, 500, 60, 500, 60, 11.33),
    ("S20", 512, 500, 60, 500, 60, 21.76),
    ("S30", 1024, 500, 60, 500, 60, 40.96),
    ("S40", 2048, 500, 60, 500, 60, 77.83),
    ("S50", 4096, 500, 60, 500, 60, 143.36),
    ("S60", 8192, 1300, 300, 1300, 300, 276.48),
    ("S70", 16384, 2000, 500, 2000, 500, 552.96),
    ("S80", MAX_DISK_GB, 2000, 500, 2000, 500, 1105.92),
];

/// (id, LRS price per GB)
const OBJECT_TIERS: &[(&str, f64)] = &[
    ("Hot", 0.018),
    ("Cool", 0.010),
    ("Cold", 0.0036),
    ("Archive", 0.00099),
];

fn disk_tiers(class: StorageClass, rows: &[DiskRow]) -> impl Iterator<Item = TierSpec> + '_ {
    rows.iter().map(
        move |&(id, capacity_gb, iops, mbps, burst_iops, burst_mbps, price)| TierSpec {
            id: id.to_string(),
            class,
            capacity_gb,
            baseline_iops: iops,
            baseline_throughput_mbps: mbps,
            burst_iops,
            burst_throughput_mbps: burst_mbps,
            unit_price: price,
            price_unit: PriceUnit::PerDisk,
        },
    )
}

pub(super) fn tiers() -> Vec<TierSpec> {
    let object = OBJECT_TIERS.iter().map(|&(id, price)| TierSpec {
        id: id.to_string(),
        class: StorageClass::ObjectStorage,
        capacity_gb: ACCOUNT_CAPACITY_GB,
        baseline_iops: 20_000,
        baseline_throughput_mbps: 7_500,
        burst_iops: 20_000,
        burst_throughput_mbps: 7_500,
        unit_price: price,
        price_unit: PriceUnit::PerGb,
    });

    disk_tiers(StorageClass::PremiumSsd, PREMIUM_SSD)
        .chain(disk_tiers(StorageClass::StandardSsd, STANDARD_SSD))
        .chain(disk_tiers(StorageClass::StandardHdd, STANDARD_HDD))
        .chain(object)
        .collect()
}
