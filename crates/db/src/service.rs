//! Procurement workflows over the repository traits.
//!
//! Every mutation that can move a vendor's performance figures runs under that
//! vendor's lock, and the recomputation is an explicit step after the write
//! rather than a storage hook. Purchase-order creation never recomputes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OwnedMutexGuard;
use tracing::info;
use vendorhub_core::chrono::{DateTime, Utc};

use vendorhub_core::domain::performance::HistoricalPerformance;
use vendorhub_core::domain::purchase_order::{PurchaseOrder, PurchaseOrderId, PurchaseOrderInput};
use vendorhub_core::domain::vendor::{Vendor, VendorId, VendorInput};
use vendorhub_core::errors::{ApplicationError, DomainError};
use vendorhub_core::metrics::{self, MetricUpdate};

use crate::repositories::{
    InMemoryStore, PerformanceRepository, PurchaseOrderRepository, SqlPerformanceRepository,
    SqlPurchaseOrderRepository, SqlVendorRepository, VendorRepository,
};
use crate::DbPool;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always reports the same instant. Used by tests and deterministic seeding.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// One async mutex per vendor, created on first use.
#[derive(Default)]
pub struct VendorLocks {
    locks: Mutex<HashMap<VendorId, Arc<tokio::sync::Mutex<()>>>>,
}

impl VendorLocks {
    pub async fn acquire(&self, vendor_id: VendorId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(vendor_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Locks every distinct vendor in ascending id order, so two callers
    /// locking overlapping sets cannot deadlock.
    pub async fn acquire_all(&self, vendor_ids: &[VendorId]) -> Vec<OwnedMutexGuard<()>> {
        let mut ordered = vendor_ids.to_vec();
        ordered.sort_unstable();
        ordered.dedup();
        let mut guards = Vec::with_capacity(ordered.len());
        for vendor_id in ordered {
            guards.push(self.acquire(vendor_id).await);
        }
        guards
    }
}

#[derive(Clone)]
pub struct ProcurementService {
    vendors: Arc<dyn VendorRepository>,
    orders: Arc<dyn PurchaseOrderRepository>,
    performance: Arc<dyn PerformanceRepository>,
    locks: Arc<VendorLocks>,
    clock: Arc<dyn Clock>,
}

impl ProcurementService {
    pub fn new(
        vendors: Arc<dyn VendorRepository>,
        orders: Arc<dyn PurchaseOrderRepository>,
        performance: Arc<dyn PerformanceRepository>,
    ) -> Self {
        Self {
            vendors,
            orders,
            performance,
            locks: Arc::new(VendorLocks::default()),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn sqlite(pool: DbPool) -> Self {
        Self::new(
            Arc::new(SqlVendorRepository::new(pool.clone())),
            Arc::new(SqlPurchaseOrderRepository::new(pool.clone())),
            Arc::new(SqlPerformanceRepository::new(pool)),
        )
    }

    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::default());
        Self::new(store.clone(), store.clone(), store)
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub async fn list_vendors(&self) -> Result<Vec<Vendor>, ApplicationError> {
        Ok(self.vendors.list().await?)
    }

    pub async fn get_vendor(&self, id: VendorId) -> Result<Vendor, ApplicationError> {
        self.vendors.find_by_id(id).await?.ok_or_else(|| ApplicationError::not_found("vendor", id))
    }

    /// Looks a vendor up by its unique `vendor_code`.
    pub async fn find_vendor_by_code(
        &self,
        vendor_code: &str,
    ) -> Result<Option<Vendor>, ApplicationError> {
        Ok(self.vendors.find_by_code(vendor_code).await?)
    }

    pub async fn create_vendor(&self, input: VendorInput) -> Result<Vendor, ApplicationError> {
        input.validate()?;
        let vendor = self.vendors.create(input).await?;
        info!(
            event_name = "procurement.vendor.created",
            vendor_id = %vendor.id,
            vendor_code = %vendor.vendor_code,
            "vendor created"
        );
        Ok(vendor)
    }

    pub async fn update_vendor(
        &self,
        id: VendorId,
        input: VendorInput,
    ) -> Result<Vendor, ApplicationError> {
        input.validate()?;
        let vendor = input.into_vendor(id);
        if !self.vendors.update(vendor.clone()).await? {
            return Err(ApplicationError::not_found("vendor", id));
        }
        Ok(vendor)
    }

    pub async fn delete_vendor(&self, id: VendorId) -> Result<(), ApplicationError> {
        let _guard = self.locks.acquire(id).await;
        if !self.vendors.delete(id).await? {
            return Err(ApplicationError::not_found("vendor", id));
        }
        info!(event_name = "procurement.vendor.deleted", vendor_id = %id, "vendor deleted");
        Ok(())
    }

    pub async fn list_purchase_orders(
        &self,
        vendor_id: Option<VendorId>,
    ) -> Result<Vec<PurchaseOrder>, ApplicationError> {
        Ok(self.orders.list(vendor_id).await?)
    }

    pub async fn get_purchase_order(
        &self,
        id: PurchaseOrderId,
    ) -> Result<PurchaseOrder, ApplicationError> {
        self.find_order(id).await
    }

    /// Validates every entry before writing any of them; the insert itself is atomic.
    pub async fn create_purchase_orders(
        &self,
        inputs: Vec<PurchaseOrderInput>,
    ) -> Result<Vec<PurchaseOrder>, ApplicationError> {
        if inputs.is_empty() {
            return Err(DomainError::Validation(
                "at least one purchase order is required".to_string(),
            )
            .into());
        }

        for input in &inputs {
            input.validate()?;
            self.ensure_vendor_exists(input.vendor_id).await?;
        }

        let created = self.orders.create_batch(inputs).await?;
        info!(
            event_name = "procurement.purchase_orders.created",
            count = created.len(),
            "purchase orders created"
        );
        Ok(created)
    }

    pub async fn update_purchase_order(
        &self,
        id: PurchaseOrderId,
        input: PurchaseOrderInput,
    ) -> Result<PurchaseOrder, ApplicationError> {
        input.validate()?;
        self.ensure_vendor_exists(input.vendor_id).await?;

        // Moving an order changes both vendors' order sets, so both are locked.
        // Retry if the order moved again before the locks were held.
        let _guards = loop {
            let current_vendor = self.find_order(id).await?.vendor_id;
            let guards = self.locks.acquire_all(&[current_vendor, input.vendor_id]).await;
            if self.find_order(id).await?.vendor_id == current_vendor {
                break guards;
            }
        };
        let order = input.into_order(id);
        if !self.orders.save(order.clone()).await? {
            return Err(ApplicationError::not_found("purchase order", id));
        }

        self.after_save(&order).await?;
        Ok(order)
    }

    pub async fn delete_purchase_order(&self, id: PurchaseOrderId) -> Result<(), ApplicationError> {
        let vendor_id = self.find_order(id).await?.vendor_id;
        let _guard = self.locks.acquire(vendor_id).await;
        let order = self.find_order(id).await?;

        if !self.orders.delete(id).await? {
            return Err(ApplicationError::not_found("purchase order", id));
        }
        info!(
            event_name = "procurement.purchase_order.deleted",
            purchase_order_id = %id,
            vendor_id = %order.vendor_id,
            "purchase order deleted"
        );

        if order.is_completed() {
            let remaining: Vec<PurchaseOrder> = self
                .orders
                .list(Some(order.vendor_id))
                .await?
                .into_iter()
                .filter(|candidate| candidate.id != order.id)
                .collect();
            self.record(order.vendor_id, metrics::fulfillment_update(&remaining)).await?;
        }
        Ok(())
    }

    pub async fn acknowledge_purchase_order(
        &self,
        id: PurchaseOrderId,
    ) -> Result<PurchaseOrder, ApplicationError> {
        let vendor_id = self.find_order(id).await?.vendor_id;
        let _guard = self.locks.acquire(vendor_id).await;
        let mut order = self.find_order(id).await?;

        order.acknowledge(self.clock.now())?;
        if !self.orders.save(order.clone()).await? {
            return Err(ApplicationError::not_found("purchase order", id));
        }
        info!(
            event_name = "procurement.purchase_order.acknowledged",
            purchase_order_id = %id,
            vendor_id = %order.vendor_id,
            "purchase order acknowledged"
        );

        self.after_save(&order).await?;
        Ok(order)
    }

    /// `None` when the vendor exists but no metric has been recorded yet.
    pub async fn vendor_performance(
        &self,
        vendor_id: VendorId,
    ) -> Result<Option<HistoricalPerformance>, ApplicationError> {
        self.get_vendor(vendor_id).await?;
        Ok(self.performance.find_for_vendor(vendor_id).await?)
    }

    async fn find_order(&self, id: PurchaseOrderId) -> Result<PurchaseOrder, ApplicationError> {
        self.orders
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("purchase order", id))
    }

    async fn ensure_vendor_exists(&self, vendor_id: VendorId) -> Result<(), ApplicationError> {
        if self.vendors.find_by_id(vendor_id).await?.is_none() {
            return Err(DomainError::Validation(format!(
                "purchase_order.vendor_id {vendor_id} does not reference an existing vendor"
            ))
            .into());
        }
        Ok(())
    }

    /// Caller must hold the vendor lock for `order.vendor_id`.
    async fn after_save(&self, order: &PurchaseOrder) -> Result<(), ApplicationError> {
        if !order.is_completed() && !order.is_acknowledged() {
            return Ok(());
        }

        let history = self.orders.list(Some(order.vendor_id)).await?;
        if order.is_completed() {
            self.record(order.vendor_id, metrics::delivery_update(&history, order)).await?;
        }
        if order.is_acknowledged() {
            self.record(order.vendor_id, metrics::response_time_update(&history)).await?;
        }
        Ok(())
    }

    async fn record(
        &self,
        vendor_id: VendorId,
        update: MetricUpdate,
    ) -> Result<(), ApplicationError> {
        let now = self.clock.now();
        let mut performance = self.performance.get_or_create(vendor_id, now).await?;
        performance.apply(&update, now);
        self.performance.save(performance).await?;

        info!(
            event_name = "procurement.metrics.recomputed",
            vendor_id = %vendor_id,
            update = ?update,
            "vendor performance recomputed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};
    use serde_json::json;

    use vendorhub_core::domain::purchase_order::{
        PurchaseOrder, PurchaseOrderId, PurchaseOrderInput, PurchaseOrderStatus,
    };
    use vendorhub_core::domain::vendor::{VendorId, VendorInput};
    use vendorhub_core::errors::{ApplicationError, DomainError};

    use super::{FixedClock, ProcurementService, VendorLocks};
    use crate::repositories::{InMemoryStore, PurchaseOrderRepository, RepositoryError};
    use crate::{connect_with_settings, migrations};

    /// Order store whose delete always reports that the row was already gone.
    struct VanishingOrders(Arc<InMemoryStore>);

    #[async_trait]
    impl PurchaseOrderRepository for VanishingOrders {
        async fn list(
            &self,
            vendor_id: Option<VendorId>,
        ) -> Result<Vec<PurchaseOrder>, RepositoryError> {
            PurchaseOrderRepository::list(self.0.as_ref(), vendor_id).await
        }

        async fn find_by_id(
            &self,
            id: PurchaseOrderId,
        ) -> Result<Option<PurchaseOrder>, RepositoryError> {
            PurchaseOrderRepository::find_by_id(self.0.as_ref(), id).await
        }

        async fn create_batch(
            &self,
            inputs: Vec<PurchaseOrderInput>,
        ) -> Result<Vec<PurchaseOrder>, RepositoryError> {
            self.0.create_batch(inputs).await
        }

        async fn save(&self, order: PurchaseOrder) -> Result<bool, RepositoryError> {
            PurchaseOrderRepository::save(self.0.as_ref(), order).await
        }

        async fn delete(&self, _id: PurchaseOrderId) -> Result<bool, RepositoryError> {
            Ok(false)
        }
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-05-04T09:00:00Z").expect("valid").with_timezone(&Utc)
    }

    fn vendor_input(vendor_code: &str) -> VendorInput {
        VendorInput {
            name: "Northwind Components".to_string(),
            contact_details: "buyer@northwind.test".to_string(),
            address: "12 Mill Street".to_string(),
            vendor_code: vendor_code.to_string(),
        }
    }

    fn order_input(vendor_id: VendorId, po_number: &str) -> PurchaseOrderInput {
        PurchaseOrderInput {
            po_number: po_number.to_string(),
            vendor_id,
            order_date: t0(),
            delivery_date: t0() + Duration::days(3),
            items: json!([{"sku": "GEAR-12", "qty": 20}]),
            quantity: 20,
            status: PurchaseOrderStatus::Pending,
            quality_rating: None,
            issue_date: t0(),
            acknowledgement_date: None,
        }
    }

    fn completed_input(
        vendor_id: VendorId,
        po_number: &str,
        rating: Option<f64>,
    ) -> PurchaseOrderInput {
        PurchaseOrderInput {
            status: PurchaseOrderStatus::Completed,
            quality_rating: rating,
            ..order_input(vendor_id, po_number)
        }
    }

    async fn sqlite_service() -> ProcurementService {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("run migrations");
        ProcurementService::sqlite(pool)
    }

    #[tokio::test]
    async fn acknowledge_after_one_hour_records_3600_seconds() {
        let service =
            ProcurementService::in_memory().with_clock(FixedClock(t0() + Duration::seconds(3600)));
        let vendor = service.create_vendor(vendor_input("NW-1")).await.expect("vendor");
        let created = service
            .create_purchase_orders(vec![order_input(vendor.id, "PO-100")])
            .await
            .expect("create order");

        let acknowledged =
            service.acknowledge_purchase_order(created[0].id).await.expect("acknowledge");
        assert_eq!(acknowledged.acknowledgement_date, Some(t0() + Duration::seconds(3600)));

        let performance =
            service.vendor_performance(vendor.id).await.expect("performance").expect("recorded");
        assert_eq!(performance.average_response_time, Some(3600.0));
        assert_eq!(performance.on_time_delivery_rate, None);
        assert_eq!(performance.fulfillment_rate, None);
    }

    #[tokio::test]
    async fn re_acknowledging_keeps_the_first_date_and_reports_invalid_state() {
        let service =
            ProcurementService::in_memory().with_clock(FixedClock(t0() + Duration::minutes(5)));
        let vendor = service.create_vendor(vendor_input("NW-2")).await.expect("vendor");
        let created = service
            .create_purchase_orders(vec![order_input(vendor.id, "PO-200")])
            .await
            .expect("create");
        let first = service.acknowledge_purchase_order(created[0].id).await.expect("first ack");

        let error = service
            .acknowledge_purchase_order(created[0].id)
            .await
            .expect_err("second acknowledge must fail");

        assert!(matches!(error, ApplicationError::Domain(DomainError::InvalidState(_))));
        let stored = service.get_purchase_order(created[0].id).await.expect("reload");
        assert_eq!(stored.acknowledgement_date, first.acknowledgement_date);
    }

    #[tokio::test]
    async fn acknowledging_missing_order_is_not_found_and_writes_nothing() {
        let service = ProcurementService::in_memory();
        let vendor = service.create_vendor(vendor_input("NW-3")).await.expect("vendor");

        let error = service
            .acknowledge_purchase_order(PurchaseOrderId(999))
            .await
            .expect_err("missing order");

        assert!(matches!(error, ApplicationError::NotFound { entity: "purchase order", .. }));
        assert_eq!(service.vendor_performance(vendor.id).await.expect("performance"), None);
        assert!(service.list_purchase_orders(None).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn creating_orders_never_touches_performance() {
        let service = ProcurementService::in_memory();
        let vendor = service.create_vendor(vendor_input("NW-4")).await.expect("vendor");

        service
            .create_purchase_orders(vec![
                completed_input(vendor.id, "PO-401", Some(5.0)),
                order_input(vendor.id, "PO-402"),
            ])
            .await
            .expect("create");

        assert_eq!(service.vendor_performance(vendor.id).await.expect("performance"), None);
    }

    #[tokio::test]
    async fn completed_ratings_average_and_delete_recomputes_fulfillment_over_remaining() {
        let service = sqlite_service().await;
        let vendor = service.create_vendor(vendor_input("NW-5")).await.expect("vendor");
        let created = service
            .create_purchase_orders(vec![
                order_input(vendor.id, "PO-501"),
                order_input(vendor.id, "PO-502"),
                order_input(vendor.id, "PO-503"),
            ])
            .await
            .expect("create");

        service
            .update_purchase_order(created[0].id, completed_input(vendor.id, "PO-501", Some(4.0)))
            .await
            .expect("complete first");
        service
            .update_purchase_order(created[1].id, completed_input(vendor.id, "PO-502", None))
            .await
            .expect("complete second");
        service
            .update_purchase_order(created[2].id, completed_input(vendor.id, "PO-503", Some(2.0)))
            .await
            .expect("complete third");

        let performance =
            service.vendor_performance(vendor.id).await.expect("performance").expect("recorded");
        assert_eq!(performance.quality_rating_avg, Some(3.0));
        assert_eq!(performance.on_time_delivery_rate, Some(1.0));
        assert_eq!(performance.fulfillment_rate, None);

        service.delete_purchase_order(created[2].id).await.expect("delete rating-2 order");

        let performance =
            service.vendor_performance(vendor.id).await.expect("performance").expect("recorded");
        assert_eq!(performance.fulfillment_rate, Some(0.5));
        assert_eq!(performance.quality_rating_avg, Some(3.0), "delete only owns fulfillment_rate");
        assert_eq!(service.list_purchase_orders(Some(vendor.id)).await.expect("list").len(), 2);
    }

    #[tokio::test]
    async fn deleting_last_completed_order_yields_zero_fulfillment() {
        let service = ProcurementService::in_memory();
        let vendor = service.create_vendor(vendor_input("NW-6")).await.expect("vendor");
        let created = service
            .create_purchase_orders(vec![completed_input(vendor.id, "PO-601", Some(4.0))])
            .await
            .expect("create");

        service.delete_purchase_order(created[0].id).await.expect("delete");

        let performance =
            service.vendor_performance(vendor.id).await.expect("performance").expect("recorded");
        assert_eq!(performance.fulfillment_rate, Some(0.0));
    }

    #[tokio::test]
    async fn deleting_pending_order_leaves_performance_untouched() {
        let service = ProcurementService::in_memory();
        let vendor = service.create_vendor(vendor_input("NW-7")).await.expect("vendor");
        let created = service
            .create_purchase_orders(vec![order_input(vendor.id, "PO-701")])
            .await
            .expect("create");

        service.delete_purchase_order(created[0].id).await.expect("delete");

        assert_eq!(service.vendor_performance(vendor.id).await.expect("performance"), None);
        let error = service.delete_purchase_order(created[0].id).await.expect_err("gone");
        assert!(matches!(error, ApplicationError::NotFound { .. }));
    }

    #[tokio::test]
    async fn on_time_rate_uses_triggering_order_delivery_date_as_reference() {
        let service = ProcurementService::in_memory();
        let vendor = service.create_vendor(vendor_input("NW-8")).await.expect("vendor");
        let mut early = completed_input(vendor.id, "PO-801", Some(4.0));
        early.delivery_date = t0() + Duration::days(1);
        let mut late = completed_input(vendor.id, "PO-802", Some(4.0));
        late.delivery_date = t0() + Duration::days(9);
        let created = service
            .create_purchase_orders(vec![early.clone(), late.clone()])
            .await
            .expect("create");

        service.update_purchase_order(created[0].id, early).await.expect("save early");
        let performance =
            service.vendor_performance(vendor.id).await.expect("performance").expect("recorded");
        assert_eq!(performance.on_time_delivery_rate, Some(0.5));

        service.update_purchase_order(created[1].id, late).await.expect("save late");
        let performance =
            service.vendor_performance(vendor.id).await.expect("performance").expect("recorded");
        assert_eq!(performance.on_time_delivery_rate, Some(1.0));
    }

    #[tokio::test]
    async fn update_with_acknowledgement_recomputes_response_time() {
        let service = ProcurementService::in_memory();
        let vendor = service.create_vendor(vendor_input("NW-9")).await.expect("vendor");
        let created = service
            .create_purchase_orders(vec![order_input(vendor.id, "PO-901")])
            .await
            .expect("create");

        let mut acknowledged = order_input(vendor.id, "PO-901");
        acknowledged.acknowledgement_date = Some(t0() + Duration::seconds(90));
        service.update_purchase_order(created[0].id, acknowledged).await.expect("update");

        let performance =
            service.vendor_performance(vendor.id).await.expect("performance").expect("recorded");
        assert_eq!(performance.average_response_time, Some(90.0));
        assert_eq!(performance.on_time_delivery_rate, None);
    }

    #[tokio::test]
    async fn batch_with_unknown_vendor_is_rejected_before_any_write() {
        let service = ProcurementService::in_memory();
        let vendor = service.create_vendor(vendor_input("NW-10")).await.expect("vendor");

        let error = service
            .create_purchase_orders(vec![
                order_input(vendor.id, "PO-1001"),
                order_input(VendorId(77), "PO-1002"),
            ])
            .await
            .expect_err("unknown vendor");

        assert!(matches!(error, ApplicationError::Domain(DomainError::Validation(_))));
        assert!(service.list_purchase_orders(None).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn empty_batch_is_a_validation_error() {
        let service = ProcurementService::in_memory();
        let error = service.create_purchase_orders(Vec::new()).await.expect_err("empty batch");
        assert!(matches!(error, ApplicationError::Domain(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn vendor_lifecycle_reports_not_found_and_conflicts() {
        let service = sqlite_service().await;
        let vendor = service.create_vendor(vendor_input("NW-11")).await.expect("vendor");

        let duplicate = service.create_vendor(vendor_input("NW-11")).await.expect_err("duplicate");
        assert!(matches!(duplicate, ApplicationError::Domain(DomainError::Validation(_))));

        let mut renamed = vendor_input("NW-11");
        renamed.name = "Northwind Precision".to_string();
        let updated = service.update_vendor(vendor.id, renamed).await.expect("update");
        assert_eq!(service.get_vendor(vendor.id).await.expect("get"), updated);

        let missing = service.update_vendor(VendorId(404), vendor_input("NW-X")).await;
        assert!(matches!(missing, Err(ApplicationError::NotFound { entity: "vendor", .. })));

        service.delete_vendor(vendor.id).await.expect("delete");
        let gone = service.delete_vendor(vendor.id).await.expect_err("second delete");
        assert!(matches!(gone, ApplicationError::NotFound { .. }));
        let performance = service.vendor_performance(vendor.id).await.expect_err("no vendor");
        assert!(matches!(performance, ApplicationError::NotFound { .. }));
    }

    #[tokio::test]
    async fn concurrent_acknowledgements_for_one_vendor_all_count() {
        let service =
            ProcurementService::in_memory().with_clock(FixedClock(t0() + Duration::seconds(60)));
        let vendor = service.create_vendor(vendor_input("NW-12")).await.expect("vendor");
        let inputs =
            (0..8).map(|index| order_input(vendor.id, &format!("PO-12{index:02}"))).collect();
        let created = service.create_purchase_orders(inputs).await.expect("create");

        let handles: Vec<_> = created
            .iter()
            .map(|order| {
                let service = service.clone();
                let id = order.id;
                tokio::spawn(async move { service.acknowledge_purchase_order(id).await })
            })
            .collect();
        for handle in handles {
            handle.await.expect("join").expect("acknowledge");
        }

        let orders = service.list_purchase_orders(Some(vendor.id)).await.expect("list");
        assert!(orders.iter().all(|order| order.acknowledgement_date.is_some()));
        let performance =
            service.vendor_performance(vendor.id).await.expect("performance").expect("recorded");
        assert_eq!(performance.average_response_time, Some(60.0));
    }

    #[tokio::test]
    async fn acknowledging_a_completed_order_also_recomputes_delivery_and_quality() {
        let service =
            ProcurementService::in_memory().with_clock(FixedClock(t0() + Duration::seconds(120)));
        let vendor = service.create_vendor(vendor_input("NW-13")).await.expect("vendor");
        let created = service
            .create_purchase_orders(vec![completed_input(vendor.id, "PO-1301", Some(4.5))])
            .await
            .expect("create completed order");
        assert_eq!(service.vendor_performance(vendor.id).await.expect("performance"), None);

        service.acknowledge_purchase_order(created[0].id).await.expect("acknowledge");

        let performance =
            service.vendor_performance(vendor.id).await.expect("performance").expect("recorded");
        assert_eq!(performance.average_response_time, Some(120.0));
        assert_eq!(performance.on_time_delivery_rate, Some(1.0));
        assert_eq!(performance.quality_rating_avg, Some(4.5));
        assert_eq!(performance.fulfillment_rate, None);
    }

    #[tokio::test]
    async fn moving_an_order_to_another_vendor_recomputes_for_the_new_vendor() {
        let service = ProcurementService::in_memory();
        let from = service.create_vendor(vendor_input("NW-14A")).await.expect("vendor a");
        let to = service.create_vendor(vendor_input("NW-14B")).await.expect("vendor b");
        let created = service
            .create_purchase_orders(vec![order_input(from.id, "PO-1401")])
            .await
            .expect("create");

        let moved = service
            .update_purchase_order(created[0].id, completed_input(to.id, "PO-1401", Some(3.0)))
            .await
            .expect("move order");

        assert_eq!(moved.vendor_id, to.id);
        assert!(service.list_purchase_orders(Some(from.id)).await.expect("list a").is_empty());
        assert_eq!(service.list_purchase_orders(Some(to.id)).await.expect("list b").len(), 1);
        let performance =
            service.vendor_performance(to.id).await.expect("performance").expect("recorded");
        assert_eq!(performance.quality_rating_avg, Some(3.0));
        assert_eq!(service.vendor_performance(from.id).await.expect("performance"), None);
    }

    #[tokio::test]
    async fn crossing_moves_between_two_vendors_do_not_deadlock() {
        let service = ProcurementService::in_memory();
        let left = service.create_vendor(vendor_input("NW-15A")).await.expect("vendor a");
        let right = service.create_vendor(vendor_input("NW-15B")).await.expect("vendor b");
        let mut inputs = Vec::new();
        for index in 0..4 {
            inputs.push(order_input(left.id, &format!("PO-15L{index}")));
            inputs.push(order_input(right.id, &format!("PO-15R{index}")));
        }
        let created = service.create_purchase_orders(inputs).await.expect("create");

        let handles: Vec<_> = created
            .iter()
            .map(|order| {
                let service = service.clone();
                let target = if order.vendor_id == left.id { right.id } else { left.id };
                let input = completed_input(target, &order.po_number, Some(4.0));
                let id = order.id;
                tokio::spawn(async move { service.update_purchase_order(id, input).await })
            })
            .collect();
        let all_moves = async {
            for handle in handles {
                handle.await.expect("join").expect("move");
            }
        };
        tokio::time::timeout(std::time::Duration::from_secs(5), all_moves)
            .await
            .expect("moves finish without deadlock");

        assert_eq!(service.list_purchase_orders(Some(left.id)).await.expect("list a").len(), 4);
        assert_eq!(service.list_purchase_orders(Some(right.id)).await.expect("list b").len(), 4);
    }

    #[tokio::test]
    async fn acquire_all_locks_each_vendor_once() {
        let locks = VendorLocks::default();
        let guards = locks.acquire_all(&[VendorId(2), VendorId(1), VendorId(2)]).await;
        assert_eq!(guards.len(), 2);
        drop(guards);

        let again = locks.acquire_all(&[VendorId(1)]).await;
        assert_eq!(again.len(), 1);
    }

    #[tokio::test]
    async fn delete_that_finds_no_row_reports_not_found_and_keeps_performance() {
        let store = Arc::new(InMemoryStore::default());
        let service = ProcurementService::new(
            store.clone(),
            Arc::new(VanishingOrders(store.clone())),
            store,
        );
        let vendor = service.create_vendor(vendor_input("NW-16")).await.expect("vendor");
        let created = service
            .create_purchase_orders(vec![completed_input(vendor.id, "PO-1601", Some(4.0))])
            .await
            .expect("create");

        let error = service.delete_purchase_order(created[0].id).await.expect_err("lost delete");

        assert!(matches!(error, ApplicationError::NotFound { entity: "purchase order", .. }));
        assert_eq!(service.vendor_performance(vendor.id).await.expect("performance"), None);
    }
}
