use serde_json::json;
use vendorhub_core::chrono::{DateTime, Duration, Utc};

use vendorhub_core::domain::purchase_order::{PurchaseOrderInput, PurchaseOrderStatus};
use vendorhub_core::domain::vendor::{VendorId, VendorInput};
use vendorhub_core::errors::ApplicationError;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;
use crate::service::{FixedClock, ProcurementService};

/// Every seeded timestamp is an offset from this instant.
const SEED_EPOCH: &str = "2026-01-05T08:00:00Z";

/// Deterministic demo vendors and their purchase-order histories.
const SEED_VENDORS: &[SeedVendorContract] = &[
    SeedVendorContract {
        vendor_code: "DEMO-ACME",
        name: "Acme Industrial Supply",
        contact_details: "orders@acme-industrial.test",
        address: "100 Foundry Road, Springfield",
        orders: &[
            SeedOrderContract {
                po_number: "DEMO-PO-1001",
                sku: "BOLT-M8",
                quantity: 500,
                delivery_offset_days: 5,
                status: PurchaseOrderStatus::Completed,
                quality_rating: Some(4.5),
                acknowledged_after_secs: Some(3_600),
            },
            SeedOrderContract {
                po_number: "DEMO-PO-1002",
                sku: "NUT-M8",
                quantity: 500,
                delivery_offset_days: 9,
                status: PurchaseOrderStatus::Completed,
                quality_rating: Some(3.5),
                acknowledged_after_secs: Some(7_200),
            },
            SeedOrderContract {
                po_number: "DEMO-PO-1003",
                sku: "WASHER-M8",
                quantity: 1_000,
                delivery_offset_days: 12,
                status: PurchaseOrderStatus::Pending,
                quality_rating: None,
                acknowledged_after_secs: None,
            },
        ],
    },
    SeedVendorContract {
        vendor_code: "DEMO-GLOBEX",
        name: "Globex Components",
        contact_details: "supply@globex.test",
        address: "42 Harbour Lane, Cypress Creek",
        orders: &[
            SeedOrderContract {
                po_number: "DEMO-PO-2001",
                sku: "BEARING-6204",
                quantity: 40,
                delivery_offset_days: 7,
                status: PurchaseOrderStatus::Completed,
                quality_rating: None,
                acknowledged_after_secs: Some(1_800),
            },
            SeedOrderContract {
                po_number: "DEMO-PO-2002",
                sku: "SEAL-KIT-A",
                quantity: 15,
                delivery_offset_days: 3,
                status: PurchaseOrderStatus::Canceled,
                quality_rating: None,
                acknowledged_after_secs: None,
            },
        ],
    },
    SeedVendorContract {
        vendor_code: "DEMO-INITECH",
        name: "Initech Fabrication",
        contact_details: "procurement@initech.test",
        address: "9 Office Park Drive, Austin",
        orders: &[SeedOrderContract {
            po_number: "DEMO-PO-3001",
            sku: "BRACKET-L",
            quantity: 250,
            delivery_offset_days: 14,
            status: PurchaseOrderStatus::Pending,
            quality_rating: None,
            acknowledged_after_secs: None,
        }],
    },
];

/// Demo dataset for local development and smoke checks.
///
/// Orders are created pending and then moved to their final state through
/// [`ProcurementService`], so the stored performance figures are the ones the
/// live workflows would produce.
pub struct DemoDataset;

impl DemoDataset {
    /// Loads missing vendors and orders. Records that already exist (matched by
    /// `vendor_code` / `po_number`) are left as they are.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, ApplicationError> {
        let epoch = seed_epoch()?;
        let service = ProcurementService::sqlite(pool.clone()).with_clock(FixedClock(epoch));
        let existing_orders = service.list_purchase_orders(None).await?;

        let mut result = SeedResult::default();
        for contract in SEED_VENDORS {
            let vendor = match service.find_vendor_by_code(contract.vendor_code).await? {
                Some(vendor) => vendor,
                None => {
                    result.vendors_created += 1;
                    service.create_vendor(contract.vendor_input()).await?
                }
            };

            let missing: Vec<&SeedOrderContract> = contract
                .orders
                .iter()
                .filter(|order| {
                    !existing_orders.iter().any(|existing| existing.po_number == order.po_number)
                })
                .collect();
            if missing.is_empty() {
                result.vendors_seeded.push(contract.info());
                continue;
            }

            let created = service
                .create_purchase_orders(
                    missing.iter().map(|order| order.pending_input(vendor.id, epoch)).collect(),
                )
                .await?;
            result.orders_created += created.len();

            for (order, contract_order) in created.iter().zip(&missing) {
                if let Some(final_input) = contract_order.final_input(vendor.id, epoch) {
                    service.update_purchase_order(order.id, final_input).await?;
                }
            }
            result.vendors_seeded.push(contract.info());
        }

        Ok(result)
    }

    /// Verify that every seeded vendor, order and expected performance record exists.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for contract in SEED_VENDORS {
            let vendor_id: Option<i64> =
                sqlx::query_scalar("SELECT id FROM vendor WHERE vendor_code = ?1")
                    .bind(contract.vendor_code)
                    .fetch_optional(pool)
                    .await?;
            checks.push((format!("{}:vendor", contract.vendor_code), vendor_id.is_some()));
            let Some(vendor_id) = vendor_id else {
                continue;
            };

            for order in contract.orders {
                let order_ok: i64 = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM purchase_order WHERE po_number = ?1 AND vendor_id = ?2 AND status = ?3)",
                )
                .bind(order.po_number)
                .bind(vendor_id)
                .bind(order.status.as_str())
                .fetch_one(pool)
                .await?;
                checks.push((format!("{}:order", order.po_number), order_ok == 1));
            }

            let performance_exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM historical_performance WHERE vendor_id = ?1)",
            )
            .bind(vendor_id)
            .fetch_one(pool)
            .await?;
            checks.push((
                format!("{}:performance", contract.vendor_code),
                (performance_exists == 1) == contract.expects_performance(),
            ));
        }

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    /// Remove seeded vendors; orders and performance records go with them.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;
        for contract in SEED_VENDORS {
            sqlx::query("DELETE FROM vendor WHERE vendor_code = ?1")
                .bind(contract.vendor_code)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedVendorContract {
    vendor_code: &'static str,
    name: &'static str,
    contact_details: &'static str,
    address: &'static str,
    orders: &'static [SeedOrderContract],
}

impl SeedVendorContract {
    fn vendor_input(&self) -> VendorInput {
        VendorInput {
            name: self.name.to_string(),
            contact_details: self.contact_details.to_string(),
            address: self.address.to_string(),
            vendor_code: self.vendor_code.to_string(),
        }
    }

    fn info(&self) -> SeedVendorInfo {
        SeedVendorInfo { vendor_code: self.vendor_code, name: self.name }
    }

    fn expects_performance(&self) -> bool {
        self.orders.iter().any(|order| order.triggers_recompute())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedOrderContract {
    po_number: &'static str,
    sku: &'static str,
    quantity: u32,
    delivery_offset_days: i64,
    status: PurchaseOrderStatus,
    quality_rating: Option<f64>,
    acknowledged_after_secs: Option<i64>,
}

impl SeedOrderContract {
    fn pending_input(&self, vendor_id: VendorId, epoch: DateTime<Utc>) -> PurchaseOrderInput {
        PurchaseOrderInput {
            po_number: self.po_number.to_string(),
            vendor_id,
            order_date: epoch,
            delivery_date: epoch + Duration::days(self.delivery_offset_days),
            items: json!([{ "sku": self.sku, "qty": self.quantity }]),
            quantity: self.quantity,
            status: PurchaseOrderStatus::Pending,
            quality_rating: None,
            issue_date: epoch,
            acknowledgement_date: None,
        }
    }

    fn triggers_recompute(&self) -> bool {
        self.status == PurchaseOrderStatus::Completed || self.acknowledged_after_secs.is_some()
    }

    /// The second save that moves a pending order to its seeded state, if any.
    fn final_input(&self, vendor_id: VendorId, epoch: DateTime<Utc>) -> Option<PurchaseOrderInput> {
        if self.status == PurchaseOrderStatus::Pending && self.acknowledged_after_secs.is_none() {
            return None;
        }

        Some(PurchaseOrderInput {
            status: self.status,
            quality_rating: self.quality_rating,
            acknowledgement_date: self
                .acknowledged_after_secs
                .map(|seconds| epoch + Duration::seconds(seconds)),
            ..self.pending_input(vendor_id, epoch)
        })
    }
}

fn seed_epoch() -> Result<DateTime<Utc>, ApplicationError> {
    DateTime::parse_from_rfc3339(SEED_EPOCH)
        .map(|epoch| epoch.with_timezone(&Utc))
        .map_err(|error| ApplicationError::Configuration(format!("invalid seed epoch: {error}")))
}

#[derive(Debug, Default)]
pub struct SeedResult {
    pub vendors_created: usize,
    pub orders_created: usize,
    pub vendors_seeded: Vec<SeedVendorInfo>,
}

#[derive(Debug)]
pub struct SeedVendorInfo {
    pub vendor_code: &'static str,
    pub name: &'static str,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(String, bool)>,
}
