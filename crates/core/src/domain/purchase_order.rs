use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::vendor::VendorId;
use crate::errors::DomainError;

pub const MAX_QUALITY_RATING: f64 = 5.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchaseOrderId(pub i64);

impl fmt::Display for PurchaseOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseOrderStatus {
    #[default]
    Pending,
    Completed,
    Canceled,
}

impl PurchaseOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "canceled" => Some(Self::Canceled),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: PurchaseOrderId,
    pub po_number: String,
    pub vendor_id: VendorId,
    pub order_date: DateTime<Utc>,
    pub delivery_date: DateTime<Utc>,
    pub items: serde_json::Value,
    pub quantity: u32,
    pub status: PurchaseOrderStatus,
    pub quality_rating: Option<f64>,
    pub issue_date: DateTime<Utc>,
    pub acknowledgement_date: Option<DateTime<Utc>>,
}

impl PurchaseOrder {
    pub fn is_completed(&self) -> bool {
        self.status == PurchaseOrderStatus::Completed
    }

    pub fn is_acknowledged(&self) -> bool {
        self.acknowledgement_date.is_some()
    }

    /// Seconds between issue and acknowledgement, if acknowledged, with
    /// microsecond resolution.
    pub fn response_time_secs(&self) -> Option<f64> {
        self.acknowledgement_date.map(|acknowledged_at| {
            let elapsed = acknowledged_at - self.issue_date;
            match elapsed.num_microseconds() {
                Some(micros) => micros as f64 / 1_000_000.0,
                None => elapsed.num_seconds() as f64,
            }
        })
    }

    pub fn acknowledge(&mut self, at: DateTime<Utc>) -> Result<(), DomainError> {
        if let Some(existing) = self.acknowledgement_date {
            return Err(DomainError::InvalidState(format!(
                "purchase order {} was already acknowledged at {}",
                self.id,
                existing.to_rfc3339()
            )));
        }

        self.acknowledgement_date = Some(at);
        Ok(())
    }
}

/// Client-supplied purchase order fields, used for batch create and full update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrderInput {
    pub po_number: String,
    pub vendor_id: VendorId,
    pub order_date: DateTime<Utc>,
    pub delivery_date: DateTime<Utc>,
    #[serde(default)]
    pub items: serde_json::Value,
    pub quantity: u32,
    #[serde(default)]
    pub status: PurchaseOrderStatus,
    #[serde(default)]
    pub quality_rating: Option<f64>,
    pub issue_date: DateTime<Utc>,
    #[serde(default)]
    pub acknowledgement_date: Option<DateTime<Utc>>,
}

impl PurchaseOrderInput {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.po_number.trim().is_empty() {
            return Err(DomainError::Validation(
                "purchase_order.po_number must not be blank".to_string(),
            ));
        }

        if self.quantity == 0 {
            return Err(DomainError::Validation(
                "purchase_order.quantity must be greater than zero".to_string(),
            ));
        }

        if let Some(rating) = self.quality_rating {
            if !rating.is_finite() || !(0.0..=MAX_QUALITY_RATING).contains(&rating) {
                return Err(DomainError::Validation(format!(
                    "purchase_order.quality_rating must be in range 0..={MAX_QUALITY_RATING}"
                )));
            }
        }

        if self.delivery_date < self.order_date {
            return Err(DomainError::Validation(
                "purchase_order.delivery_date must not precede order_date".to_string(),
            ));
        }

        Ok(())
    }

    pub fn into_order(self, id: PurchaseOrderId) -> PurchaseOrder {
        PurchaseOrder {
            id,
            po_number: self.po_number.trim().to_string(),
            vendor_id: self.vendor_id,
            order_date: self.order_date,
            delivery_date: self.delivery_date,
            items: self.items,
            quantity: self.quantity,
            status: self.status,
            quality_rating: self.quality_rating,
            issue_date: self.issue_date,
            acknowledgement_date: self.acknowledgement_date,
        }
    }
}
