use sqlx::{sqlite::SqliteRow, Row};

use vendorhub_core::domain::vendor::{Vendor, VendorId, VendorInput};

use super::{RepositoryError, VendorRepository};
use crate::DbPool;

pub struct SqlVendorRepository {
    pool: DbPool,
}

impl SqlVendorRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl VendorRepository for SqlVendorRepository {
    async fn list(&self) -> Result<Vec<Vendor>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, contact_details, address, vendor_code
             FROM vendor
             ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(vendor_from_row).collect()
    }

    async fn find_by_id(&self, id: VendorId) -> Result<Option<Vendor>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, contact_details, address, vendor_code
             FROM vendor
             WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(vendor_from_row).transpose()
    }

    async fn find_by_code(&self, vendor_code: &str) -> Result<Option<Vendor>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, contact_details, address, vendor_code
             FROM vendor
             WHERE vendor_code = ?",
        )
        .bind(vendor_code)
        .fetch_optional(&self.pool)
        .await?;

        row.map(vendor_from_row).transpose()
    }

    async fn create(&self, input: VendorInput) -> Result<Vendor, RepositoryError> {
        let vendor_code = input.vendor_code.clone();
        let result = sqlx::query(
            "INSERT INTO vendor (name, contact_details, address, vendor_code)
             VALUES (?, ?, ?, ?)",
        )
        .bind(input.name.trim())
        .bind(input.contact_details.trim())
        .bind(input.address.trim())
        .bind(&input.vendor_code)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            RepositoryError::classify(error, || {
                format!("vendor_code `{vendor_code}` is already registered")
            })
        })?;

        Ok(input.into_vendor(VendorId(result.last_insert_rowid())))
    }

    async fn update(&self, vendor: Vendor) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE vendor
             SET name = ?, contact_details = ?, address = ?, vendor_code = ?
             WHERE id = ?",
        )
        .bind(&vendor.name)
        .bind(&vendor.contact_details)
        .bind(&vendor.address)
        .bind(&vendor.vendor_code)
        .bind(vendor.id.0)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            RepositoryError::classify(error, || {
                format!("vendor_code `{}` is already registered", vendor.vendor_code)
            })
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: VendorId) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM vendor WHERE id = ?").bind(id.0).execute(&self.pool).await?;

        Ok(result.rows_affected() > 0)
    }
}

fn vendor_from_row(row: SqliteRow) -> Result<Vendor, RepositoryError> {
    Ok(Vendor {
        id: VendorId(row.try_get("id")?),
        name: row.try_get("name")?,
        contact_details: row.try_get("contact_details")?,
        address: row.try_get("address")?,
        vendor_code: row.try_get("vendor_code")?,
    })
}
