//! Vendor performance metrics.
//!
//! Every function here is a pure function of a vendor's purchase-order
//! history at the moment of the call. Nothing is maintained incrementally:
//! callers pass the full live set of orders and persist whatever comes back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::purchase_order::PurchaseOrder;

/// The subset of performance fields written by one recomputation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "metric", rename_all = "snake_case")]
pub enum MetricUpdate {
    ResponseTime { average_response_time: Option<f64> },
    Delivery { on_time_delivery_rate: f64, quality_rating_avg: Option<f64> },
    Fulfillment { fulfillment_rate: f64 },
}

/// Mean seconds from issue to acknowledgement over acknowledged orders.
/// `None` when no order has been acknowledged.
pub fn average_response_time(orders: &[PurchaseOrder]) -> Option<f64> {
    mean(orders.iter().filter_map(PurchaseOrder::response_time_secs))
}

/// Share of completed orders delivered on or before `reference`.
///
/// `reference` is the delivery date of the order whose save triggered the
/// recomputation, not a promised due date, so the result depends on which
/// order was saved last.
pub fn on_time_delivery_rate(orders: &[PurchaseOrder], reference: DateTime<Utc>) -> f64 {
    let completed = orders.iter().filter(|order| order.is_completed());
    let (on_time, total) = completed.fold((0usize, 0usize), |(on_time, total), order| {
        (on_time + usize::from(order.delivery_date <= reference), total + 1)
    });
    ratio(on_time, total)
}

/// Mean quality rating over completed orders that carry a rating.
pub fn quality_rating_avg(orders: &[PurchaseOrder]) -> Option<f64> {
    mean(orders.iter().filter(|order| order.is_completed()).filter_map(|order| order.quality_rating))
}

/// Completed-and-rated orders as a share of all orders in any status.
pub fn fulfillment_rate(orders: &[PurchaseOrder]) -> f64 {
    let fulfilled =
        orders.iter().filter(|order| order.is_completed() && order.quality_rating.is_some()).count();
    ratio(fulfilled, orders.len())
}

pub fn response_time_update(orders: &[PurchaseOrder]) -> MetricUpdate {
    MetricUpdate::ResponseTime { average_response_time: average_response_time(orders) }
}

pub fn delivery_update(orders: &[PurchaseOrder], trigger: &PurchaseOrder) -> MetricUpdate {
    MetricUpdate::Delivery {
        on_time_delivery_rate: on_time_delivery_rate(orders, trigger.delivery_date),
        quality_rating_avg: quality_rating_avg(orders),
    }
}

pub fn fulfillment_update(orders: &[PurchaseOrder]) -> MetricUpdate {
    MetricUpdate::Fulfillment { fulfillment_rate: fulfillment_rate(orders) }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0_f64, 0usize), |(sum, count), value| (sum + value, count + 1));
    (count > 0).then(|| sum / count as f64)
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64
}
