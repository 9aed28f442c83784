//! Rebuilds history from the tables published by earlier runs.

use tracing::{info, warn};

use storage::PublishingTarget;

use crate::error::Result;
use crate::history::History;
use crate::partition::{Partition, Router};
use crate::table::decode_table;

/// Load every published partition table.
///
/// Tables of unknown partitions are skipped. The recent partition keeps only
/// rows still inside its trailing window for this run.
pub async fn recover(target: &dyn PublishingTarget, router: &Router<'_>) -> Result<History> {
    let mut history = History::new();

    for table in target.published_tables().await? {
        let Some(partition) = Partition::from_resource_name(&table.name) else {
            warn!(name = %table.name, "Skipping published table of unknown partition");
            continue;
        };

        let mut rows = decode_table(&table.name, &table.bytes)?;
        if partition == Partition::Admin1Recent {
            let before = rows.len();
            rows.retain(|row| router.admits(&partition, row));
            if rows.len() < before {
                info!(
                    partition = %partition,
                    dropped = before - rows.len(),
                    "Dropped rows outside the recent window"
                );
            }
        }

        info!(partition = %partition, rows = rows.len(), "Recovered published rows");
        history = history.merge(partition, rows);
    }

    Ok(history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::StatRow;
    use crate::country::{CountryTable, RegionIndex};
    use crate::table::encode_table;
    use bytes::Bytes;
    use forecast_common::{LeadTime, Period};
    use storage::{ObjectStorage, Publication, Resource, StorePublisher};
    use test_utils::COUNTRY_TABLE_CSV;
    use zonal::AdminLevel;

    fn p(year: i32, month: u32) -> Period {
        Period::new(year, month).unwrap()
    }

    fn row(level: AdminLevel, issue: Period) -> StatRow {
        let lead_time = LeadTime::new(0).unwrap();
        StatRow {
            iso_code: Some("KEN".into()),
            adm0_name: Some("Kenya".into()),
            adm1_pcode: (level == AdminLevel::Adm1).then(|| "KE01".to_string()),
            adm1_name: (level == AdminLevel::Adm1).then(|| "Nairobi".to_string()),
            admin_level: level,
            issue,
            lead_time,
            valid: lead_time.valid_period(issue),
            pixel_count: 4.0,
            mean_anomaly: Some(1.5),
            median_anomaly: Some(1.0),
        }
    }

    fn resource(partition: &Partition, rows: &[StatRow]) -> Resource {
        Resource {
            name: partition.resource_name(),
            description: String::new(),
            bytes: Bytes::from(encode_table(rows, partition.admin_level()).unwrap()),
        }
    }

    #[tokio::test]
    async fn test_recover_published_partitions() {
        let publisher = StorePublisher::new(ObjectStorage::in_memory(), "dataset");
        let publication = Publication {
            time_period: None,
            resources: vec![
                resource(&Partition::Admin0All, &[row(AdminLevel::Adm0, p(2024, 1))]),
                resource(
                    &Partition::Admin1Recent,
                    &[row(AdminLevel::Adm1, p(2022, 3)), row(AdminLevel::Adm1, p(2024, 1))],
                ),
                resource(
                    &Partition::Admin1Region("africa".into()),
                    &[row(AdminLevel::Adm1, p(2022, 3))],
                ),
                Resource {
                    name: "forecast_precipitation_anomalies_adm2.csv".into(),
                    description: String::new(),
                    bytes: Bytes::from_static(b"ignored"),
                },
            ],
        };
        publisher.publish(&publication).await.unwrap();

        let table = CountryTable::from_csv_reader(COUNTRY_TABLE_CSV.as_bytes()).unwrap();
        let regions = RegionIndex::from_reference(&table);
        let router = Router::new(p(2025, 3), &regions);
        let history = recover(&publisher, &router).await.unwrap();

        assert_eq!(history.partitions().count(), 3);
        assert_eq!(history.table(&Partition::Admin0All).unwrap().len(), 1);
        // 2022-03 is exactly three years before the run
        let recent = history.table(&Partition::Admin1Recent).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].issue, p(2024, 1));
        assert_eq!(
            history
                .table(&Partition::Admin1Region("africa".into()))
                .unwrap()
                .len(),
            1
        );
        assert_eq!(history.known_periods().len(), 1);
    }

    #[tokio::test]
    async fn test_recover_nothing_published() {
        let publisher = StorePublisher::new(ObjectStorage::in_memory(), "dataset");
        let regions = RegionIndex::default();
        let router = Router::new(p(2025, 3), &regions);
        let history = recover(&publisher, &router).await.unwrap();
        assert!(history.is_empty());
        assert!(history.known_periods().is_empty());
    }
}
