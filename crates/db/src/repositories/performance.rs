use sqlx::{sqlite::SqliteRow, Row};
use vendorhub_core::chrono::{DateTime, Utc};

use vendorhub_core::domain::performance::HistoricalPerformance;
use vendorhub_core::domain::vendor::VendorId;

use super::{parse_timestamp, PerformanceRepository, RepositoryError};
use crate::DbPool;

pub struct SqlPerformanceRepository {
    pool: DbPool,
}

impl SqlPerformanceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl PerformanceRepository for SqlPerformanceRepository {
    async fn find_for_vendor(
        &self,
        vendor_id: VendorId,
    ) -> Result<Option<HistoricalPerformance>, RepositoryError> {
        let row = sqlx::query(
            "SELECT
                vendor_id,
                on_time_delivery_rate,
                quality_rating_avg,
                average_response_time,
                fulfillment_rate,
                updated_at
             FROM historical_performance
             WHERE vendor_id = ?",
        )
        .bind(vendor_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(performance_from_row).transpose()
    }

    async fn get_or_create(
        &self,
        vendor_id: VendorId,
        at: DateTime<Utc>,
    ) -> Result<HistoricalPerformance, RepositoryError> {
        sqlx::query(
            "INSERT INTO historical_performance (vendor_id, updated_at)
             VALUES (?, ?)
             ON CONFLICT(vendor_id) DO NOTHING",
        )
        .bind(vendor_id.0)
        .bind(at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.find_for_vendor(vendor_id).await?.ok_or_else(|| {
            RepositoryError::Decode(format!(
                "historical performance for vendor {vendor_id} vanished after get-or-create"
            ))
        })
    }

    async fn save(&self, performance: HistoricalPerformance) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO historical_performance (
                vendor_id,
                on_time_delivery_rate,
                quality_rating_avg,
                average_response_time,
                fulfillment_rate,
                updated_at
             ) VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(vendor_id) DO UPDATE SET
                on_time_delivery_rate = excluded.on_time_delivery_rate,
                quality_rating_avg = excluded.quality_rating_avg,
                average_response_time = excluded.average_response_time,
                fulfillment_rate = excluded.fulfillment_rate,
                updated_at = excluded.updated_at",
        )
        .bind(performance.vendor_id.0)
        .bind(performance.on_time_delivery_rate)
        .bind(performance.quality_rating_avg)
        .bind(performance.average_response_time)
        .bind(performance.fulfillment_rate)
        .bind(performance.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn performance_from_row(row: SqliteRow) -> Result<HistoricalPerformance, RepositoryError> {
    Ok(HistoricalPerformance {
        vendor_id: VendorId(row.try_get("vendor_id")?),
        on_time_delivery_rate: row.try_get("on_time_delivery_rate")?,
        quality_rating_avg: row.try_get("quality_rating_avg")?,
        average_response_time: row.try_get("average_response_time")?,
        fulfillment_rate: row.try_get("fulfillment_rate")?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}
