use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::vendor::VendorId;
use crate::metrics::MetricUpdate;

/// Derived performance figures for one vendor. Every field is recomputed from
/// the vendor's purchase orders and has no independent source of truth.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPerformance {
    pub vendor_id: VendorId,
    pub on_time_delivery_rate: Option<f64>,
    pub quality_rating_avg: Option<f64>,
    pub average_response_time: Option<f64>,
    pub fulfillment_rate: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

impl HistoricalPerformance {
    pub fn empty(vendor_id: VendorId, at: DateTime<Utc>) -> Self {
        Self {
            vendor_id,
            on_time_delivery_rate: None,
            quality_rating_avg: None,
            average_response_time: None,
            fulfillment_rate: None,
            updated_at: at,
        }
    }

    /// Writes only the fields owned by `update`; the rest keep their prior value.
    pub fn apply(&mut self, update: &MetricUpdate, at: DateTime<Utc>) {
        match *update {
            MetricUpdate::ResponseTime { average_response_time } => {
                self.average_response_time = average_response_time;
            }
            MetricUpdate::Delivery { on_time_delivery_rate, quality_rating_avg } => {
                self.on_time_delivery_rate = Some(on_time_delivery_rate);
                self.quality_rating_avg = quality_rating_avg;
            }
            MetricUpdate::Fulfillment { fulfillment_rate } => {
                self.fulfillment_rate = Some(fulfillment_rate);
            }
        }
        self.updated_at = at;
    }
}
