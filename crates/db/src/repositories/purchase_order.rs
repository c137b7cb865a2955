use sqlx::{sqlite::SqliteRow, Row};

use vendorhub_core::domain::purchase_order::{
    PurchaseOrder, PurchaseOrderId, PurchaseOrderInput, PurchaseOrderStatus,
};
use vendorhub_core::domain::vendor::VendorId;

use super::{
    parse_optional_timestamp, parse_timestamp, parse_u32, PurchaseOrderRepository,
    RepositoryError,
};
use crate::DbPool;

const SELECT_COLUMNS: &str = "SELECT
        id,
        po_number,
        vendor_id,
        order_date,
        delivery_date,
        items_json,
        quantity,
        status,
        quality_rating,
        issue_date,
        acknowledgement_date
     FROM purchase_order";

pub struct SqlPurchaseOrderRepository {
    pool: DbPool,
}

impl SqlPurchaseOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl PurchaseOrderRepository for SqlPurchaseOrderRepository {
    async fn list(&self, vendor_id: Option<VendorId>) -> Result<Vec<PurchaseOrder>, RepositoryError> {
        let rows = if let Some(vendor_id) = vendor_id {
            let sql = format!("{SELECT_COLUMNS} WHERE vendor_id = ? ORDER BY id ASC");
            sqlx::query(&sql).bind(vendor_id.0).fetch_all(&self.pool).await?
        } else {
            let sql = format!("{SELECT_COLUMNS} ORDER BY id ASC");
            sqlx::query(&sql).fetch_all(&self.pool).await?
        };

        rows.into_iter().map(order_from_row).collect()
    }

    async fn find_by_id(
        &self,
        id: PurchaseOrderId,
    ) -> Result<Option<PurchaseOrder>, RepositoryError> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?");
        let row = sqlx::query(&sql).bind(id.0).fetch_optional(&self.pool).await?;

        row.map(order_from_row).transpose()
    }

    async fn create_batch(
        &self,
        inputs: Vec<PurchaseOrderInput>,
    ) -> Result<Vec<PurchaseOrder>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(inputs.len());

        for input in inputs {
            let items_json = encode_items(&input.items)?;
            let po_number = input.po_number.trim().to_string();
            let result = sqlx::query(
                "INSERT INTO purchase_order (
                    po_number,
                    vendor_id,
                    order_date,
                    delivery_date,
                    items_json,
                    quantity,
                    status,
                    quality_rating,
                    issue_date,
                    acknowledgement_date
                 ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&po_number)
            .bind(input.vendor_id.0)
            .bind(input.order_date.to_rfc3339())
            .bind(input.delivery_date.to_rfc3339())
            .bind(items_json)
            .bind(i64::from(input.quantity))
            .bind(input.status.as_str())
            .bind(input.quality_rating)
            .bind(input.issue_date.to_rfc3339())
            .bind(input.acknowledgement_date.map(|value| value.to_rfc3339()))
            .execute(&mut *tx)
            .await
            .map_err(|error| {
                RepositoryError::classify(error, || {
                    format!("po_number `{po_number}` is already in use")
                })
            })?;

            created.push(input.into_order(PurchaseOrderId(result.last_insert_rowid())));
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn save(&self, order: PurchaseOrder) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE purchase_order SET
                po_number = ?,
                vendor_id = ?,
                order_date = ?,
                delivery_date = ?,
                items_json = ?,
                quantity = ?,
                status = ?,
                quality_rating = ?,
                issue_date = ?,
                acknowledgement_date = ?
             WHERE id = ?",
        )
        .bind(&order.po_number)
        .bind(order.vendor_id.0)
        .bind(order.order_date.to_rfc3339())
        .bind(order.delivery_date.to_rfc3339())
        .bind(encode_items(&order.items)?)
        .bind(i64::from(order.quantity))
        .bind(order.status.as_str())
        .bind(order.quality_rating)
        .bind(order.issue_date.to_rfc3339())
        .bind(order.acknowledgement_date.map(|value| value.to_rfc3339()))
        .bind(order.id.0)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            RepositoryError::classify(error, || {
                format!("po_number `{}` is already in use", order.po_number)
            })
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: PurchaseOrderId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM purchase_order WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn encode_items(items: &serde_json::Value) -> Result<String, RepositoryError> {
    serde_json::to_string(items)
        .map_err(|error| RepositoryError::Decode(format!("could not encode items: {error}")))
}

fn order_from_row(row: SqliteRow) -> Result<PurchaseOrder, RepositoryError> {
    let status_raw = row.try_get::<String, _>("status")?;
    let status = PurchaseOrderStatus::parse(&status_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown purchase order status `{status_raw}`"))
    })?;

    let items_raw = row.try_get::<String, _>("items_json")?;
    let items = serde_json::from_str(&items_raw)
        .map_err(|error| RepositoryError::Decode(format!("invalid items_json: {error}")))?;

    Ok(PurchaseOrder {
        id: PurchaseOrderId(row.try_get("id")?),
        po_number: row.try_get("po_number")?,
        vendor_id: VendorId(row.try_get("vendor_id")?),
        order_date: parse_timestamp("order_date", row.try_get("order_date")?)?,
        delivery_date: parse_timestamp("delivery_date", row.try_get("delivery_date")?)?,
        items,
        quantity: parse_u32("quantity", row.try_get("quantity")?)?,
        status,
        quality_rating: row.try_get("quality_rating")?,
        issue_date: parse_timestamp("issue_date", row.try_get("issue_date")?)?,
        acknowledgement_date: parse_optional_timestamp(
            "acknowledgement_date",
            row.try_get("acknowledgement_date")?,
        )?,
    })
}
