pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;
pub mod service;

pub use connection::{connect_with_settings, DbPool};
pub use fixtures::{DemoDataset, SeedResult, SeedVendorInfo, VerificationResult};
pub use service::{Clock, FixedClock, ProcurementService, SystemClock, VendorLocks};
