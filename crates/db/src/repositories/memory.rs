use std::collections::BTreeMap;

use tokio::sync::RwLock;
use vendorhub_core::chrono::{DateTime, Utc};

use vendorhub_core::domain::performance::HistoricalPerformance;
use vendorhub_core::domain::purchase_order::{PurchaseOrder, PurchaseOrderId, PurchaseOrderInput};
use vendorhub_core::domain::vendor::{Vendor, VendorId, VendorInput};

use super::{PerformanceRepository, PurchaseOrderRepository, RepositoryError, VendorRepository};

/// Process-local store implementing every repository trait over one lock, so
/// vendor deletes can cascade the way the SQL schema does.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    next_vendor_id: i64,
    next_order_id: i64,
    vendors: BTreeMap<VendorId, Vendor>,
    orders: BTreeMap<PurchaseOrderId, PurchaseOrder>,
    performance: BTreeMap<VendorId, HistoricalPerformance>,
}

impl MemoryState {
    fn vendor_code_taken(&self, vendor_code: &str, except: Option<VendorId>) -> bool {
        self.vendors
            .values()
            .any(|vendor| vendor.vendor_code == vendor_code && Some(vendor.id) != except)
    }

    fn po_number_taken(&self, po_number: &str, except: Option<PurchaseOrderId>) -> bool {
        self.orders.values().any(|order| order.po_number == po_number && Some(order.id) != except)
    }
}

#[async_trait::async_trait]
impl VendorRepository for InMemoryStore {
    async fn list(&self) -> Result<Vec<Vendor>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.vendors.values().cloned().collect())
    }

    async fn find_by_id(&self, id: VendorId) -> Result<Option<Vendor>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.vendors.get(&id).cloned())
    }

    async fn find_by_code(&self, vendor_code: &str) -> Result<Option<Vendor>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.vendors.values().find(|vendor| vendor.vendor_code == vendor_code).cloned())
    }

    async fn create(&self, input: VendorInput) -> Result<Vendor, RepositoryError> {
        let mut state = self.state.write().await;
        if state.vendor_code_taken(&input.vendor_code, None) {
            return Err(RepositoryError::Conflict(format!(
                "vendor_code `{}` is already registered",
                input.vendor_code
            )));
        }

        state.next_vendor_id += 1;
        let vendor = input.into_vendor(VendorId(state.next_vendor_id));
        state.vendors.insert(vendor.id, vendor.clone());
        Ok(vendor)
    }

    async fn update(&self, vendor: Vendor) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        if !state.vendors.contains_key(&vendor.id) {
            return Ok(false);
        }
        if state.vendor_code_taken(&vendor.vendor_code, Some(vendor.id)) {
            return Err(RepositoryError::Conflict(format!(
                "vendor_code `{}` is already registered",
                vendor.vendor_code
            )));
        }

        state.vendors.insert(vendor.id, vendor);
        Ok(true)
    }

    async fn delete(&self, id: VendorId) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        if state.vendors.remove(&id).is_none() {
            return Ok(false);
        }

        state.orders.retain(|_, order| order.vendor_id != id);
        state.performance.remove(&id);
        Ok(true)
    }
}

#[async_trait::async_trait]
impl PurchaseOrderRepository for InMemoryStore {
    async fn list(&self, vendor_id: Option<VendorId>) -> Result<Vec<PurchaseOrder>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .values()
            .filter(|order| vendor_id.map_or(true, |vendor_id| order.vendor_id == vendor_id))
            .cloned()
            .collect())
    }

    async fn find_by_id(
        &self,
        id: PurchaseOrderId,
    ) -> Result<Option<PurchaseOrder>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.orders.get(&id).cloned())
    }

    async fn create_batch(
        &self,
        inputs: Vec<PurchaseOrderInput>,
    ) -> Result<Vec<PurchaseOrder>, RepositoryError> {
        let mut state = self.state.write().await;

        for (index, input) in inputs.iter().enumerate() {
            let po_number = input.po_number.trim();
            let repeated_in_batch =
                inputs[..index].iter().any(|earlier| earlier.po_number.trim() == po_number);
            if repeated_in_batch || state.po_number_taken(po_number, None) {
                return Err(RepositoryError::Conflict(format!(
                    "po_number `{po_number}` is already in use"
                )));
            }
            if !state.vendors.contains_key(&input.vendor_id) {
                return Err(RepositoryError::Decode(format!(
                    "purchase order references unknown vendor {}",
                    input.vendor_id
                )));
            }
        }

        let mut created = Vec::with_capacity(inputs.len());
        for input in inputs {
            state.next_order_id += 1;
            let order = input.into_order(PurchaseOrderId(state.next_order_id));
            state.orders.insert(order.id, order.clone());
            created.push(order);
        }
        Ok(created)
    }

    async fn save(&self, order: PurchaseOrder) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        if !state.orders.contains_key(&order.id) {
            return Ok(false);
        }
        if state.po_number_taken(&order.po_number, Some(order.id)) {
            return Err(RepositoryError::Conflict(format!(
                "po_number `{}` is already in use",
                order.po_number
            )));
        }

        state.orders.insert(order.id, order);
        Ok(true)
    }

    async fn delete(&self, id: PurchaseOrderId) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        Ok(state.orders.remove(&id).is_some())
    }
}

#[async_trait::async_trait]
impl PerformanceRepository for InMemoryStore {
    async fn find_for_vendor(
        &self,
        vendor_id: VendorId,
    ) -> Result<Option<HistoricalPerformance>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.performance.get(&vendor_id).cloned())
    }

    async fn get_or_create(
        &self,
        vendor_id: VendorId,
        at: DateTime<Utc>,
    ) -> Result<HistoricalPerformance, RepositoryError> {
        let mut state = self.state.write().await;
        let performance = state
            .performance
            .entry(vendor_id)
            .or_insert_with(|| HistoricalPerformance::empty(vendor_id, at));
        Ok(performance.clone())
    }

    async fn save(&self, performance: HistoricalPerformance) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        state.performance.insert(performance.vendor_id, performance);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use vendorhub_core::domain::purchase_order::{PurchaseOrderInput, PurchaseOrderStatus};
    use vendorhub_core::domain::vendor::{VendorId, VendorInput};

    use super::InMemoryStore;
    use crate::repositories::{
        PerformanceRepository, PurchaseOrderRepository, RepositoryError, VendorRepository,
    };

    fn vendor_input(vendor_code: &str) -> VendorInput {
        VendorInput {
            name: "Memory Vendor".to_string(),
            contact_details: "memory@vendor.test".to_string(),
            address: "4 Harbour Row".to_string(),
            vendor_code: vendor_code.to_string(),
        }
    }

    fn order_input(vendor_id: VendorId, po_number: &str) -> PurchaseOrderInput {
        let now = Utc::now();
        PurchaseOrderInput {
            po_number: po_number.to_string(),
            vendor_id,
            order_date: now,
            delivery_date: now,
            items: json!([]),
            quantity: 1,
            status: PurchaseOrderStatus::Pending,
            quality_rating: None,
            issue_date: now,
            acknowledgement_date: None,
        }
    }

    #[tokio::test]
    async fn in_memory_vendor_ids_are_assigned_sequentially() {
        let store = InMemoryStore::default();

        let first = store.create(vendor_input("MEM-1")).await.expect("first vendor");
        let second = store.create(vendor_input("MEM-2")).await.expect("second vendor");

        assert_eq!(first.id, VendorId(1));
        assert_eq!(second.id, VendorId(2));
        assert_eq!(VendorRepository::list(&store).await.expect("list").len(), 2);
    }

    #[tokio::test]
    async fn in_memory_batch_rejects_duplicates_without_partial_writes() {
        let store = InMemoryStore::default();
        let vendor = store.create(vendor_input("MEM-3")).await.expect("vendor");

        let error = store
            .create_batch(vec![order_input(vendor.id, "PO-1"), order_input(vendor.id, "PO-1")])
            .await
            .expect_err("duplicate in batch");

        assert!(matches!(error, RepositoryError::Conflict(_)));
        assert!(PurchaseOrderRepository::list(&store, None).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn in_memory_vendor_delete_cascades() {
        let store = InMemoryStore::default();
        let vendor = store.create(vendor_input("MEM-4")).await.expect("vendor");
        store.create_batch(vec![order_input(vendor.id, "PO-9")]).await.expect("orders");
        store.get_or_create(vendor.id, Utc::now()).await.expect("performance");

        assert!(VendorRepository::delete(&store, vendor.id).await.expect("delete"));

        assert!(PurchaseOrderRepository::list(&store, None).await.expect("list").is_empty());
        assert_eq!(store.find_for_vendor(vendor.id).await.expect("find"), None);
    }
}
