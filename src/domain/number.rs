//! Sellable inventory record for one virtual phone number.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Number {
    pub id: String,
    pub phone_number: String,
    /// Provider endpoint the buyer polls for inbound messages.
    pub api_url: String,
    pub price: BigDecimal,
    #[serde(rename = "type")]
    pub number_type: String,
    pub status: NumberStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sold_to: Option<String>,
    pub added_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sold_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberStatus {
    Available,
    Sold,
}

impl NumberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NumberStatus::Available => "available",
            NumberStatus::Sold => "sold",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "available" => Some(NumberStatus::Available),
            "sold" => Some(NumberStatus::Sold),
            _ => None,
        }
    }
}

impl Number {
    pub fn new(
        phone_number: String,
        api_url: String,
        price: BigDecimal,
        number_type: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            phone_number,
            api_url,
            price,
            number_type,
            status: NumberStatus::Available,
            sold_to: None,
            added_at: Utc::now(),
            sold_at: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == NumberStatus::Available
    }

    pub fn mark_sold(&mut self, buyer_uid: &str, at: DateTime<Utc>) {
        self.status = NumberStatus::Sold;
        self.sold_to = Some(buyer_uid.to_string());
        self.sold_at = Some(at);
    }
}
