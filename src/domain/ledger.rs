//! Append-only audit entries for credit and ownership changes.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::{PurchaseRecord, User};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: Uuid,
    pub user_id: String,
    pub user_email: String,
    #[serde(rename = "type")]
    pub kind: LedgerKind,
    /// Total amount moved: debited for purchases, credited for top-ups.
    pub amount: BigDecimal,
    /// Numbers involved: one for a single purchase, all of them for a
    /// bulk purchase, empty for a credit top-up.
    #[serde(default)]
    pub numbers: Vec<PurchaseRecord>,
    pub timestamp: DateTime<Utc>,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    SinglePurchase,
    BulkPurchase,
    CreditAdded,
}

impl LedgerEntry {
    fn new(user: &User, kind: LedgerKind, amount: BigDecimal, numbers: Vec<PurchaseRecord>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user.uid.clone(),
            user_email: user.email.clone(),
            kind,
            amount,
            numbers,
            timestamp: Utc::now(),
            status: "completed".to_string(),
        }
    }

    pub fn single_purchase(user: &User, record: PurchaseRecord, amount: BigDecimal) -> Self {
        Self::new(user, LedgerKind::SinglePurchase, amount, vec![record])
    }

    pub fn bulk_purchase(user: &User, records: Vec<PurchaseRecord>, amount: BigDecimal) -> Self {
        Self::new(user, LedgerKind::BulkPurchase, amount, records)
    }

    pub fn credit_added(user: &User, amount: BigDecimal) -> Self {
        Self::new(user, LedgerKind::CreditAdded, amount, Vec::new())
    }
}
