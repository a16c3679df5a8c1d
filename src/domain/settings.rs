//! Bulk-purchase pricing configuration, stored as a singleton document.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const BULK_PRICING_DOC_ID: &str = "bulk_buy";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkPricingSettings {
    #[serde(default)]
    pub packages: Vec<BulkPackage>,
    pub updated_at: DateTime<Utc>,
}

/// One advertised bundle: buy `quantity` numbers for `price` total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkPackage {
    pub quantity: u32,
    pub price: BigDecimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl BulkPricingSettings {
    pub fn empty() -> Self {
        Self {
            packages: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn with_packages(packages: Vec<BulkPackage>) -> Self {
        Self {
            packages,
            updated_at: Utc::now(),
        }
    }
}
