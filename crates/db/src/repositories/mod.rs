use async_trait::async_trait;
use thiserror::Error;
use vendorhub_core::chrono::{DateTime, Utc};

use vendorhub_core::domain::performance::HistoricalPerformance;
use vendorhub_core::domain::purchase_order::{PurchaseOrder, PurchaseOrderId, PurchaseOrderInput};
use vendorhub_core::domain::vendor::{Vendor, VendorId, VendorInput};
use vendorhub_core::errors::{ApplicationError, DomainError};

pub mod memory;
pub mod performance;
pub mod purchase_order;
pub mod vendor;

pub use memory::InMemoryStore;
pub use performance::SqlPerformanceRepository;
pub use purchase_order::SqlPurchaseOrderRepository;
pub use vendor::SqlVendorRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Turns unique-constraint violations into `Conflict`; everything else stays a database error.
    pub(crate) fn classify(error: sqlx::Error, conflict_message: impl FnOnce() -> String) -> Self {
        match &error {
            sqlx::Error::Database(database) if database.is_unique_violation() => {
                Self::Conflict(conflict_message())
            }
            _ => Self::Database(error),
        }
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict(message) => {
                ApplicationError::Domain(DomainError::Validation(message))
            }
            other => ApplicationError::Persistence(other.to_string()),
        }
    }
}

#[async_trait]
pub trait VendorRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Vendor>, RepositoryError>;
    async fn find_by_id(&self, id: VendorId) -> Result<Option<Vendor>, RepositoryError>;
    async fn find_by_code(&self, vendor_code: &str) -> Result<Option<Vendor>, RepositoryError>;
    async fn create(&self, input: VendorInput) -> Result<Vendor, RepositoryError>;
    /// Returns `false` when no vendor with `vendor.id` exists.
    async fn update(&self, vendor: Vendor) -> Result<bool, RepositoryError>;
    /// Removes the vendor together with its orders and performance record.
    async fn delete(&self, id: VendorId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait PurchaseOrderRepository: Send + Sync {
    async fn list(&self, vendor_id: Option<VendorId>) -> Result<Vec<PurchaseOrder>, RepositoryError>;
    async fn find_by_id(
        &self,
        id: PurchaseOrderId,
    ) -> Result<Option<PurchaseOrder>, RepositoryError>;
    /// Inserts every order or none of them.
    async fn create_batch(
        &self,
        inputs: Vec<PurchaseOrderInput>,
    ) -> Result<Vec<PurchaseOrder>, RepositoryError>;
    /// Returns `false` when no order with `order.id` exists.
    async fn save(&self, order: PurchaseOrder) -> Result<bool, RepositoryError>;
    async fn delete(&self, id: PurchaseOrderId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait PerformanceRepository: Send + Sync {
    async fn find_for_vendor(
        &self,
        vendor_id: VendorId,
    ) -> Result<Option<HistoricalPerformance>, RepositoryError>;
    async fn get_or_create(
        &self,
        vendor_id: VendorId,
        at: DateTime<Utc>,
    ) -> Result<HistoricalPerformance, RepositoryError>;
    async fn save(&self, performance: HistoricalPerformance) -> Result<(), RepositoryError>;
}

pub(crate) fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}

pub(crate) fn parse_optional_timestamp(
    column: &str,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    value.map(|timestamp| parse_timestamp(column, timestamp)).transpose()
}

pub(crate) fn parse_u32(column: &str, value: i64) -> Result<u32, RepositoryError> {
    u32::try_from(value).map_err(|_| {
        RepositoryError::Decode(format!(
            "invalid value for `{column}` (expected non-negative u32): {value}"
        ))
    })
}
