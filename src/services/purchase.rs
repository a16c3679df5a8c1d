//! Purchase coordination: the atomic exchange of credits for numbers.
//!
//! Both operations run an optimistic read-validate-commit loop. Each
//! attempt re-reads every involved record, re-checks every precondition
//! against the fresh state, and commits through a guarded batch. When a
//! competing write lands first the commit fails with a conflict and the
//! loop starts over, so a number sold in the gap is reported as
//! unavailable and a balance drained in the gap as insufficient credits,
//! never as a stale success.

use std::collections::HashSet;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::Utc;
use serde::Serialize;

use crate::domain::{money, LedgerEntry, Number, PurchaseKind, PurchaseRecord, User};
use crate::error::AppError;
use crate::store::{docs, Collection, RecordStore, StoreError, WriteBatch};
use crate::validation::{validate_uid, BULK_BUY_MAX};

/// Commit attempts before the operation reports contention. Generous
/// enough that a burst of parallel purchases against one account settles.
const COMMIT_ATTEMPTS: usize = 16;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReceipt {
    pub purchased_number: String,
    pub price: BigDecimal,
    pub new_balance: BigDecimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkReceipt {
    pub purchased_count: usize,
    pub total_price: BigDecimal,
    pub new_balance: BigDecimal,
}

#[derive(Clone)]
pub struct PurchaseCoordinator {
    store: Arc<dyn RecordStore>,
}

impl PurchaseCoordinator {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Buy one number. The charged price prefers a positive client price,
    /// then the listed price, then the default unit price.
    pub async fn purchase_single(
        &self,
        uid: &str,
        number_id: &str,
        requested_price: Option<&BigDecimal>,
    ) -> Result<PurchaseReceipt, AppError> {
        validate_uid("uid", uid)?;
        validate_uid("numberId", number_id)?;

        for _ in 0..COMMIT_ATTEMPTS {
            let number_doc = docs::fetch::<Number>(self.store.as_ref(), Collection::Numbers, number_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("number {number_id} does not exist")))?;
            let number_version = number_doc.version;
            let number = number_doc.record;

            if !number.is_available() {
                return Err(AppError::Conflict(format!(
                    "number {} is no longer available",
                    number.phone_number
                )));
            }

            let user_doc = docs::fetch::<User>(self.store.as_ref(), Collection::Users, uid)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("user {uid} does not exist")))?;
            let user_version = user_doc.version;
            let user = user_doc.record;

            let price = money::effective_price(requested_price, &number.price);
            if user.credits < price {
                return Err(AppError::InsufficientCredits(format!(
                    "balance {} does not cover the price {}",
                    user.credits, price
                )));
            }

            let now = Utc::now();
            let mut sold = number;
            sold.mark_sold(uid, now);
            let snapshot = PurchaseRecord::snapshot(&sold, PurchaseKind::Single, price.clone(), now);

            let mut buyer = user;
            buyer.credits = (&buyer.credits - &price).with_scale(2);
            buyer.purchased_numbers_data.push(snapshot.clone());

            let entry = LedgerEntry::single_purchase(&buyer, snapshot, price.clone());
            let entry_id = entry.id.to_string();

            let batch = WriteBatch::new()
                .guard_version(Collection::Numbers, &sold.id, number_version)
                .guard_version(Collection::Users, uid, user_version)
                .guard_absent(Collection::Transactions, &entry_id)
                .put(Collection::Numbers, &sold.id, docs::encode(&sold)?)
                .put(Collection::Users, uid, docs::encode(&buyer)?)
                .put(Collection::Transactions, &entry_id, docs::encode(&entry)?);

            match self.store.apply(batch).await {
                Ok(()) => {
                    tracing::info!(
                        uid = %uid,
                        number = %sold.phone_number,
                        amount = %price,
                        "single purchase completed"
                    );
                    return Ok(PurchaseReceipt {
                        purchased_number: sold.phone_number,
                        price,
                        new_balance: buyer.credits,
                    });
                }
                Err(StoreError::Conflict(reason)) => {
                    tracing::debug!(uid = %uid, %reason, "purchase commit conflicted, retrying");
                    continue;
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(AppError::Conflict(
            "purchase could not be completed under concurrent updates".to_string(),
        ))
    }

    /// Buy a batch of numbers for a package total. Either every requested
    /// number transfers and the full total is debited, or nothing changes.
    pub async fn purchase_bulk(
        &self,
        uid: &str,
        number_ids: &[String],
        total_price: &BigDecimal,
        quantity: usize,
    ) -> Result<BulkReceipt, AppError> {
        validate_uid("uid", uid)?;

        if number_ids.is_empty() {
            return Err(AppError::Validation("numberIds must not be empty".into()));
        }
        if number_ids.len() > BULK_BUY_MAX {
            return Err(AppError::Validation(format!(
                "numberIds must contain at most {BULK_BUY_MAX} entries"
            )));
        }
        if quantity != number_ids.len() {
            return Err(AppError::Validation(format!(
                "quantity {} does not match the {} submitted numbers",
                quantity,
                number_ids.len()
            )));
        }
        let mut seen = HashSet::new();
        if number_ids.iter().any(|id| !seen.insert(id.as_str())) {
            return Err(AppError::Validation(
                "numberIds must not contain duplicates".into(),
            ));
        }
        if total_price <= &money::zero() {
            return Err(AppError::Validation(
                "totalPrice must be greater than zero".into(),
            ));
        }
        let total = money::round_to_cents(total_price);

        for _ in 0..COMMIT_ATTEMPTS {
            let user_doc = docs::fetch::<User>(self.store.as_ref(), Collection::Users, uid)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("user {uid} does not exist")))?;
            let user_version = user_doc.version;
            let user = user_doc.record;

            if user.credits < total {
                return Err(AppError::InsufficientCredits(format!(
                    "balance {} does not cover the total {}",
                    user.credits, total
                )));
            }

            // Every number is re-read and re-checked on each attempt; the
            // guards below make the availability check and the sale one
            // atomic step.
            let mut numbers = Vec::with_capacity(number_ids.len());
            for id in number_ids {
                let doc = docs::fetch::<Number>(self.store.as_ref(), Collection::Numbers, id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("number {id} does not exist")))?;
                if !doc.record.is_available() {
                    return Err(AppError::Conflict(format!(
                        "number {} is no longer available",
                        doc.record.phone_number
                    )));
                }
                numbers.push(doc);
            }

            let now = Utc::now();
            let prices = money::split_total(&total, numbers.len());

            let mut buyer = user;
            let mut batch = WriteBatch::new().guard_version(Collection::Users, uid, user_version);
            let mut snapshots = Vec::with_capacity(numbers.len());

            for (doc, price) in numbers.into_iter().zip(prices) {
                let version = doc.version;
                let mut sold = doc.record;
                sold.mark_sold(uid, now);
                let snapshot = PurchaseRecord::snapshot(&sold, PurchaseKind::Bulk, price, now);

                batch = batch
                    .guard_version(Collection::Numbers, &sold.id, version)
                    .put(Collection::Numbers, &sold.id, docs::encode(&sold)?);
                snapshots.push(snapshot);
            }

            buyer.credits = (&buyer.credits - &total).with_scale(2);
            buyer
                .purchased_numbers_data
                .extend(snapshots.iter().cloned());

            let entry = LedgerEntry::bulk_purchase(&buyer, snapshots, total.clone());
            let entry_id = entry.id.to_string();

            batch = batch
                .guard_absent(Collection::Transactions, &entry_id)
                .put(Collection::Users, uid, docs::encode(&buyer)?)
                .put(Collection::Transactions, &entry_id, docs::encode(&entry)?);

            match self.store.apply(batch).await {
                Ok(()) => {
                    tracing::info!(
                        uid = %uid,
                        count = number_ids.len(),
                        amount = %total,
                        "bulk purchase completed"
                    );
                    return Ok(BulkReceipt {
                        purchased_count: number_ids.len(),
                        total_price: total,
                        new_balance: buyer.credits,
                    });
                }
                Err(StoreError::Conflict(reason)) => {
                    tracing::debug!(uid = %uid, %reason, "bulk commit conflicted, retrying");
                    continue;
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(AppError::Conflict(
            "bulk purchase could not be completed under concurrent updates".to_string(),
        ))
    }
}
