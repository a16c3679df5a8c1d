//! Marketplace account with a prepaid credit balance.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::money;
use super::number::Number;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub uid: String,
    pub email: String,
    pub credits: BigDecimal,
    /// Snapshots of everything the user has bought. The plain display
    /// list is derived from this, never stored separately.
    #[serde(default)]
    pub purchased_numbers_data: Vec<PurchaseRecord>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseKind {
    Single,
    Bulk,
}

/// What a number looked like at the moment it was bought. Survives later
/// deletion of the inventory record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRecord {
    pub phone_number: String,
    pub api_url: String,
    #[serde(rename = "type")]
    pub number_type: String,
    pub original_id: String,
    pub purchased_at: DateTime<Utc>,
    pub purchase_type: PurchaseKind,
    pub price: BigDecimal,
}

impl User {
    pub fn new(uid: String, email: String, role: Role) -> Self {
        Self {
            uid,
            email,
            credits: money::zero().with_scale(2),
            purchased_numbers_data: Vec::new(),
            role,
            created_at: Utc::now(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Plain phone-number list for display, derived from the snapshots.
    pub fn purchased_numbers(&self) -> Vec<String> {
        self.purchased_numbers_data
            .iter()
            .map(|record| record.phone_number.clone())
            .collect()
    }
}

impl PurchaseRecord {
    pub fn snapshot(
        number: &Number,
        kind: PurchaseKind,
        price: BigDecimal,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            phone_number: number.phone_number.clone(),
            api_url: number.api_url.clone(),
            number_type: number.number_type.clone(),
            original_id: number.id.clone(),
            purchased_at: at,
            purchase_type: kind,
            price,
        }
    }
}
