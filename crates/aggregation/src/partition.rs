//! Named output partitions and routing of rows into them.

use std::collections::BTreeMap;
use std::fmt;

use forecast_common::Period;
use zonal::AdminLevel;

use crate::aggregator::StatRow;
use crate::country::RegionIndex;

/// Length of the trailing window kept by the recent partition.
pub const RECENT_WINDOW_MONTHS: i32 = 36;

pub const RESOURCE_PREFIX: &str = "forecast_precipitation_anomalies_";
pub const TABLE_EXTENSION: &str = ".csv";

const ADMIN0_ALL: &str = "adm0";
const ADMIN1_RECENT: &str = "adm1_global_recent";
const ADMIN1_REGION_PREFIX: &str = "adm1_";

/// A named, independently retained slice of history.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Partition {
    /// Every level-0 row
    Admin0All,
    /// Level-1 rows whose valid period is inside the trailing window
    Admin1Recent,
    /// Level-1 rows of countries in one region, keyed by region key
    Admin1Region(String),
}

/// The filter a partition applies to rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Retention<'a> {
    Level(AdminLevel),
    TrailingWindow { level: AdminLevel, months: i32 },
    Region { level: AdminLevel, region: &'a str },
}

impl Partition {
    pub fn name(&self) -> String {
        match self {
            Partition::Admin0All => ADMIN0_ALL.to_string(),
            Partition::Admin1Recent => ADMIN1_RECENT.to_string(),
            Partition::Admin1Region(region) => format!("{}{}", ADMIN1_REGION_PREFIX, region),
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            ADMIN0_ALL => Some(Partition::Admin0All),
            ADMIN1_RECENT => Some(Partition::Admin1Recent),
            _ => name
                .strip_prefix(ADMIN1_REGION_PREFIX)
                .filter(|region| !region.is_empty())
                .map(|region| Partition::Admin1Region(region.to_string())),
        }
    }

    pub fn admin_level(&self) -> AdminLevel {
        match self {
            Partition::Admin0All => AdminLevel::Adm0,
            Partition::Admin1Recent | Partition::Admin1Region(_) => AdminLevel::Adm1,
        }
    }

    pub fn retention(&self) -> Retention<'_> {
        match self {
            Partition::Admin0All => Retention::Level(AdminLevel::Adm0),
            Partition::Admin1Recent => Retention::TrailingWindow {
                level: AdminLevel::Adm1,
                months: RECENT_WINDOW_MONTHS,
            },
            Partition::Admin1Region(region) => Retention::Region {
                level: AdminLevel::Adm1,
                region: region.as_str(),
            },
        }
    }

    /// Published file name, e.g. `forecast_precipitation_anomalies_adm0.csv`.
    pub fn resource_name(&self) -> String {
        format!("{}{}{}", RESOURCE_PREFIX, self.name(), TABLE_EXTENSION)
    }

    pub fn from_resource_name(name: &str) -> Option<Self> {
        name.strip_prefix(RESOURCE_PREFIX)?
            .strip_suffix(TABLE_EXTENSION)
            .and_then(Partition::parse)
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Whether a valid period falls inside the trailing window ending at the
/// run period. Exactly `RECENT_WINDOW_MONTHS` back is already outside.
pub fn is_recent(valid: Period, run_period: Period) -> bool {
    within_window(valid, run_period, RECENT_WINDOW_MONTHS)
}

fn within_window(valid: Period, run_period: Period, months: i32) -> bool {
    valid > run_period.add_months(-months)
}

/// Assigns rows to partitions for one run.
pub struct Router<'a> {
    run_period: Period,
    regions: &'a RegionIndex,
}

impl<'a> Router<'a> {
    pub fn new(run_period: Period, regions: &'a RegionIndex) -> Self {
        Self {
            run_period,
            regions,
        }
    }

    /// Whether `partition` retains `row`.
    pub fn admits(&self, partition: &Partition, row: &StatRow) -> bool {
        match partition.retention() {
            Retention::Level(level) => row.admin_level == level,
            Retention::TrailingWindow { level, months } => {
                row.admin_level == level && within_window(row.valid, self.run_period, months)
            }
            Retention::Region { level, region } => {
                row.admin_level == level && self.region_of(row) == Some(region)
            }
        }
    }

    fn region_of(&self, row: &StatRow) -> Option<&'a str> {
        let regions = self.regions;
        row.iso_code.as_deref().and_then(|iso3| regions.region_of(iso3))
    }

    /// Every partition a row belongs to. A level-1 row lands in at most one
    /// region partition and, independently, in the recent partition.
    pub fn partitions_for(&self, row: &StatRow) -> Vec<Partition> {
        let mut partitions = Vec::with_capacity(2);
        match row.admin_level {
            AdminLevel::Adm0 => partitions.push(Partition::Admin0All),
            AdminLevel::Adm1 => {
                if self.admits(&Partition::Admin1Recent, row) {
                    partitions.push(Partition::Admin1Recent);
                }
                if let Some(region) = self.region_of(row) {
                    partitions.push(Partition::Admin1Region(region.to_string()));
                }
            }
        }
        partitions
    }

    /// Split rows into per-partition tables, preserving input order.
    pub fn route(&self, rows: Vec<StatRow>) -> BTreeMap<Partition, Vec<StatRow>> {
        let mut routed: BTreeMap<Partition, Vec<StatRow>> = BTreeMap::new();
        for row in rows {
            for partition in self.partitions_for(&row) {
                routed.entry(partition).or_default().push(row.clone());
            }
        }
        routed
    }
}
