//! Per-admin-unit statistics rows from surfaces.

use tracing::debug;

use forecast_common::{LeadTime, Period};
use raster::Surface;
use zonal::{AdminBoundaries, AdminLevel, AdminUnit, ZonalStatistics, ZonalStats};

use crate::country::CountryResolver;

/// One aggregation result for an admin unit, issue period and lead time.
#[derive(Debug, Clone, PartialEq)]
pub struct StatRow {
    pub iso_code: Option<String>,
    /// Country name from the reference data
    pub adm0_name: Option<String>,
    pub adm1_pcode: Option<String>,
    pub adm1_name: Option<String>,
    pub admin_level: AdminLevel,
    pub issue: Period,
    pub lead_time: LeadTime,
    pub valid: Period,
    pub pixel_count: f64,
    pub mean_anomaly: Option<f64>,
    pub median_anomaly: Option<f64>,
}

/// Computes statistics rows for every admin unit of both levels.
pub struct ZonalAggregator<'a> {
    boundaries: &'a AdminBoundaries,
    statistics: &'a dyn ZonalStatistics,
    resolver: CountryResolver<'a>,
}

impl<'a> ZonalAggregator<'a> {
    pub fn new(
        boundaries: &'a AdminBoundaries,
        statistics: &'a dyn ZonalStatistics,
        resolver: CountryResolver<'a>,
    ) -> Self {
        Self {
            boundaries,
            statistics,
            resolver,
        }
    }

    /// Rows for one surface: all level-0 units, then all level-1 units.
    pub fn aggregate(&mut self, surface: &Surface) -> Vec<StatRow> {
        let boundaries = self.boundaries;
        let mut rows = Vec::new();
        for level in AdminLevel::ALL {
            let units = boundaries.units(level);
            let stats = self.statistics.compute(&surface.grid, units);
            rows.extend(
                units
                    .iter()
                    .zip(stats)
                    .map(|(unit, stats)| self.row(surface, unit, stats)),
            );
        }

        debug!(
            issue = %surface.issue,
            lead_time = %surface.lead_time,
            rows = rows.len(),
            "Aggregated surface"
        );
        rows
    }

    fn row(&mut self, surface: &Surface, unit: &AdminUnit, stats: ZonalStats) -> StatRow {
        let country = self.resolver.resolve(&unit.adm0_pcode);
        StatRow {
            iso_code: country.iso_code,
            adm0_name: country.name,
            adm1_pcode: unit.adm1_pcode.clone(),
            adm1_name: unit.adm1_name.clone(),
            admin_level: unit.level,
            issue: surface.issue,
            lead_time: surface.lead_time,
            valid: surface.valid,
            pixel_count: stats.pixel_count,
            mean_anomaly: stats.mean,
            median_anomaly: stats.median,
        }
    }
}
