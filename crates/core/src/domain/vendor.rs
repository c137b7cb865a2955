use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VendorId(pub i64);

impl fmt::Display for VendorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: VendorId,
    pub name: String,
    pub contact_details: String,
    pub address: String,
    pub vendor_code: String,
}

/// Client-supplied vendor fields, used for both create and full update.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorInput {
    pub name: String,
    pub contact_details: String,
    pub address: String,
    pub vendor_code: String,
}

impl VendorInput {
    pub fn validate(&self) -> Result<(), DomainError> {
        let required = [
            ("name", &self.name),
            ("contact_details", &self.contact_details),
            ("address", &self.address),
            ("vendor_code", &self.vendor_code),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(DomainError::Validation(format!("vendor.{field} must not be blank")));
            }
        }

        if self.vendor_code.chars().any(char::is_whitespace) {
            return Err(DomainError::Validation(
                "vendor.vendor_code must not contain whitespace".to_string(),
            ));
        }

        Ok(())
    }

    pub fn into_vendor(self, id: VendorId) -> Vendor {
        Vendor {
            id,
            name: self.name.trim().to_string(),
            contact_details: self.contact_details.trim().to_string(),
            address: self.address.trim().to_string(),
            vendor_code: self.vendor_code,
        }
    }
}
