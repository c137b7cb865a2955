pub mod config;
pub mod domain;
pub mod errors;
pub mod metrics;

pub use chrono;

pub use domain::performance::HistoricalPerformance;
pub use domain::purchase_order::{
    PurchaseOrder, PurchaseOrderId, PurchaseOrderInput, PurchaseOrderStatus,
};
pub use domain::vendor::{Vendor, VendorId, VendorInput};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use metrics::MetricUpdate;
