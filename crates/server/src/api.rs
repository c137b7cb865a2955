//! JSON API routes for vendors, purchase orders and vendor performance.
//!
//! - `GET|POST          /api/vendors`
//! - `GET|PUT|DELETE    /api/vendors/{id}`
//! - `GET               /api/vendors/{id}/performance`
//! - `GET|POST          /api/purchase_orders[?vendor_id=]`
//! - `GET|PUT|DELETE    /api/purchase_orders/{id}`
//! - `POST              /api/purchase_orders/{id}/acknowledge`

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequestParts, Path, Query, State,
    },
    http::{request::Parts, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use uuid::Uuid;
use vendorhub_core::domain::performance::HistoricalPerformance;
use vendorhub_core::domain::purchase_order::{PurchaseOrder, PurchaseOrderId, PurchaseOrderInput};
use vendorhub_core::domain::vendor::{Vendor, VendorId, VendorInput};
use vendorhub_core::errors::{ApplicationError, InterfaceError};
use vendorhub_db::ProcurementService;

#[derive(Clone)]
pub struct ApiState {
    service: ProcurementService,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub correlation_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct PurchaseOrderFilter {
    pub vendor_id: Option<i64>,
}

/// Purchase-order creation accepts a single object or an array of them and
/// answers in the same shape.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

/// Performance figures as exposed to clients. A vendor without a recorded
/// metric yet reports every figure and `updated_at` as null.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct PerformanceView {
    pub vendor_id: VendorId,
    pub on_time_delivery_rate: Option<f64>,
    pub quality_rating_avg: Option<f64>,
    pub average_response_time: Option<f64>,
    pub fulfillment_rate: Option<f64>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PerformanceView {
    fn from_record(vendor_id: VendorId, record: Option<HistoricalPerformance>) -> Self {
        match record {
            Some(record) => Self {
                vendor_id: record.vendor_id,
                on_time_delivery_rate: record.on_time_delivery_rate,
                quality_rating_avg: record.quality_rating_avg,
                average_response_time: record.average_response_time,
                fulfillment_rate: record.fulfillment_rate,
                updated_at: Some(record.updated_at),
            },
            None => Self {
                vendor_id,
                on_time_delivery_rate: None,
                quality_rating_avg: None,
                average_response_time: None,
                fulfillment_rate: None,
                updated_at: None,
            },
        }
    }
}

type ApiFailure = (StatusCode, Json<ApiError>);
type ApiResult<T> = Result<T, ApiFailure>;

/// Integer `{id}` path segment. Anything else answers 404 with the JSON error body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityId(pub i64);

impl<S: Send + Sync> FromRequestParts<S> for EntityId {
    type Rejection = ApiFailure;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<i64>::from_request_parts(parts, state).await {
            Ok(Path(id)) => Ok(Self(id)),
            Err(rejection) => Err(rejected(
                StatusCode::NOT_FOUND,
                format!("no resource at `{}`", parts.uri.path()),
                &rejection.body_text(),
            )),
        }
    }
}

pub fn router(service: ProcurementService) -> Router {
    Router::new()
        .route("/api/vendors", get(list_vendors).post(create_vendor))
        .route("/api/vendors/{id}", get(get_vendor).put(update_vendor).delete(delete_vendor))
        .route("/api/vendors/{id}/performance", get(vendor_performance))
        .route("/api/purchase_orders", get(list_purchase_orders).post(create_purchase_orders))
        .route(
            "/api/purchase_orders/{id}",
            get(get_purchase_order).put(update_purchase_order).delete(delete_purchase_order),
        )
        .route("/api/purchase_orders/{id}/acknowledge", post(acknowledge_purchase_order))
        .with_state(ApiState { service })
}

// ---------------------------------------------------------------------------
// Vendors
// ---------------------------------------------------------------------------

async fn list_vendors(State(state): State<ApiState>) -> ApiResult<Json<Vec<Vendor>>> {
    let vendors = state.service.list_vendors().await.map_err(failure("vendor.list"))?;
    Ok(Json(vendors))
}

async fn create_vendor(
    State(state): State<ApiState>,
    payload: Result<Json<VendorInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Vendor>)> {
    let input = parse_body(payload)?;
    let vendor = state.service.create_vendor(input).await.map_err(failure("vendor.create"))?;
    Ok((StatusCode::CREATED, Json(vendor)))
}

async fn get_vendor(
    EntityId(id): EntityId,
    State(state): State<ApiState>,
) -> ApiResult<Json<Vendor>> {
    let vendor = state.service.get_vendor(VendorId(id)).await.map_err(failure("vendor.get"))?;
    Ok(Json(vendor))
}

async fn update_vendor(
    EntityId(id): EntityId,
    State(state): State<ApiState>,
    payload: Result<Json<VendorInput>, JsonRejection>,
) -> ApiResult<Json<Vendor>> {
    let input = parse_body(payload)?;
    let vendor = state
        .service
        .update_vendor(VendorId(id), input)
        .await
        .map_err(failure("vendor.update"))?;
    Ok(Json(vendor))
}

async fn delete_vendor(
    EntityId(id): EntityId,
    State(state): State<ApiState>,
) -> ApiResult<Json<ActionResponse>> {
    state.service.delete_vendor(VendorId(id)).await.map_err(failure("vendor.delete"))?;
    Ok(Json(ActionResponse { success: true, message: format!("vendor {id} deleted") }))
}

async fn vendor_performance(
    EntityId(id): EntityId,
    State(state): State<ApiState>,
) -> ApiResult<Json<PerformanceView>> {
    let vendor_id = VendorId(id);
    let record = state
        .service
        .vendor_performance(vendor_id)
        .await
        .map_err(failure("vendor.performance"))?;
    Ok(Json(PerformanceView::from_record(vendor_id, record)))
}

// ---------------------------------------------------------------------------
// Purchase orders
// ---------------------------------------------------------------------------

async fn list_purchase_orders(
    filter: Result<Query<PurchaseOrderFilter>, QueryRejection>,
    State(state): State<ApiState>,
) -> ApiResult<Json<Vec<PurchaseOrder>>> {
    let Query(filter) = filter.map_err(|rejection| {
        rejected(StatusCode::BAD_REQUEST, rejection.body_text(), &rejection.body_text())
    })?;
    let orders = state
        .service
        .list_purchase_orders(filter.vendor_id.map(VendorId))
        .await
        .map_err(failure("purchase_order.list"))?;
    Ok(Json(orders))
}

async fn create_purchase_orders(
    State(state): State<ApiState>,
    payload: Result<Json<OneOrMany<PurchaseOrderInput>>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<OneOrMany<PurchaseOrder>>)> {
    let (inputs, single) = match parse_body(payload)? {
        OneOrMany::One(input) => (vec![input], true),
        OneOrMany::Many(inputs) => (inputs, false),
    };

    let mut created = state
        .service
        .create_purchase_orders(inputs)
        .await
        .map_err(failure("purchase_order.create"))?;

    let body = match (single, created.pop()) {
        (true, Some(order)) => OneOrMany::One(order),
        (_, last) => {
            created.extend(last);
            OneOrMany::Many(created)
        }
    };
    Ok((StatusCode::CREATED, Json(body)))
}

async fn get_purchase_order(
    EntityId(id): EntityId,
    State(state): State<ApiState>,
) -> ApiResult<Json<PurchaseOrder>> {
    let order = state
        .service
        .get_purchase_order(PurchaseOrderId(id))
        .await
        .map_err(failure("purchase_order.get"))?;
    Ok(Json(order))
}

async fn update_purchase_order(
    EntityId(id): EntityId,
    State(state): State<ApiState>,
    payload: Result<Json<PurchaseOrderInput>, JsonRejection>,
) -> ApiResult<Json<PurchaseOrder>> {
    let input = parse_body(payload)?;
    let order = state
        .service
        .update_purchase_order(PurchaseOrderId(id), input)
        .await
        .map_err(failure("purchase_order.update"))?;
    Ok(Json(order))
}

async fn delete_purchase_order(
    EntityId(id): EntityId,
    State(state): State<ApiState>,
) -> ApiResult<Json<ActionResponse>> {
    state
        .service
        .delete_purchase_order(PurchaseOrderId(id))
        .await
        .map_err(failure("purchase_order.delete"))?;
    Ok(Json(ActionResponse { success: true, message: format!("purchase order {id} deleted") }))
}

async fn acknowledge_purchase_order(
    EntityId(id): EntityId,
    State(state): State<ApiState>,
) -> ApiResult<Json<PurchaseOrder>> {
    let order = state
        .service
        .acknowledge_purchase_order(PurchaseOrderId(id))
        .await
        .map_err(failure("purchase_order.acknowledge"))?;
    Ok(Json(order))
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload.map(|Json(value)| value).map_err(|rejection| {
        rejected(StatusCode::BAD_REQUEST, rejection.body_text(), &rejection.body_text())
    })
}

/// Error response for a request axum could not extract.
fn rejected(status: StatusCode, message: String, detail: &str) -> ApiFailure {
    let correlation_id = new_correlation_id();
    warn!(
        event_name = "api.request.rejected",
        correlation_id = %correlation_id,
        status = status.as_u16(),
        error = %detail,
        "request could not be extracted"
    );
    (status, Json(ApiError { error: message, correlation_id }))
}

fn failure(operation: &'static str) -> impl Fn(ApplicationError) -> ApiFailure {
    move |application_error| {
        let correlation_id = new_correlation_id();
        let detail = application_error.to_string();
        let interface = application_error.into_interface(correlation_id.clone());

        let status = match &interface {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(
                event_name = "api.request.failed",
                correlation_id = %correlation_id,
                operation,
                error = %detail,
                "request failed"
            );
        } else {
            warn!(
                event_name = "api.request.rejected",
                correlation_id = %correlation_id,
                operation,
                error = %detail,
                "request rejected"
            );
        }

        (status, Json(ApiError { error: interface.message().to_string(), correlation_id }))
    }
}

fn new_correlation_id() -> String {
    format!("req-{}", Uuid::new_v4().simple())
}
