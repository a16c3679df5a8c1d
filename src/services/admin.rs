//! Admin-side operations: credit grants, user administration, settings
//! and marketplace stats.

use std::sync::Arc;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::{
    money, BulkPackage, BulkPricingSettings, LedgerEntry, LedgerKind, Role, User,
    BULK_PRICING_DOC_ID,
};
use crate::error::AppError;
use crate::store::{docs, Collection, RecordStore, StoreError, WriteBatch};
use crate::validation::{normalize_email, validate_email, validate_positive_amount, validate_uid};

const COMMIT_ATTEMPTS: usize = 16;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditReceipt {
    pub amount: BigDecimal,
    pub new_balance: BigDecimal,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub email: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub total_users: usize,
    pub total_numbers: usize,
    pub available_numbers: usize,
    pub sold_numbers: usize,
    pub total_transactions: usize,
    pub credits_issued: BigDecimal,
    pub purchase_revenue: BigDecimal,
}

#[derive(Clone)]
pub struct AdminService {
    store: Arc<dyn RecordStore>,
}

impl AdminService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Top a user's balance up and write the matching ledger entry in the
    /// same commit.
    pub async fn add_credit(&self, uid: &str, amount: &BigDecimal) -> Result<CreditReceipt, AppError> {
        validate_uid("uid", uid)?;
        validate_positive_amount("amount", amount)?;
        let amount = money::round_to_cents(amount);
        if amount <= money::zero() {
            return Err(AppError::Validation(
                "amount: must be at least one cent".into(),
            ));
        }

        for _ in 0..COMMIT_ATTEMPTS {
            let doc = docs::fetch::<User>(self.store.as_ref(), Collection::Users, uid)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("user {uid} does not exist")))?;
            let version = doc.version;
            let mut user = doc.record;

            user.credits = (&user.credits + &amount).with_scale(2);
            let entry = LedgerEntry::credit_added(&user, amount.clone());
            let entry_id = entry.id.to_string();

            let batch = WriteBatch::new()
                .guard_version(Collection::Users, uid, version)
                .guard_absent(Collection::Transactions, &entry_id)
                .put(Collection::Users, uid, docs::encode(&user)?)
                .put(Collection::Transactions, &entry_id, docs::encode(&entry)?);

            match self.store.apply(batch).await {
                Ok(()) => {
                    tracing::info!(uid = %uid, amount = %amount, "credits added");
                    return Ok(CreditReceipt {
                        amount,
                        new_balance: user.credits,
                    });
                }
                Err(StoreError::Conflict(_)) => continue,
                Err(err) => return Err(err.into()),
            }
        }

        Err(AppError::Conflict(
            "credit top-up could not be completed under concurrent updates".to_string(),
        ))
    }

    /// All accounts, oldest first.
    pub async fn users(&self) -> Result<Vec<User>, AppError> {
        let mut users: Vec<User> = docs::fetch_all(self.store.as_ref(), Collection::Users)
            .await?
            .into_iter()
            .map(|doc| doc.record)
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.uid.cmp(&b.uid)));
        Ok(users)
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<User, AppError> {
        validate_email("email", email)?;
        let email = normalize_email(email);

        let claim = self
            .store
            .get(Collection::EmailIndex, &email)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("no user with email {email}")))?;
        let uid = claim.data["uid"]
            .as_str()
            .ok_or_else(|| AppError::Internal(format!("email claim {email} is malformed")))?
            .to_string();

        docs::fetch::<User>(self.store.as_ref(), Collection::Users, &uid)
            .await?
            .map(|doc| doc.record)
            .ok_or_else(|| AppError::NotFound(format!("no user with email {email}")))
    }

    /// Change email or role. An email change releases the old claim and
    /// takes the new one in the same commit.
    pub async fn update_user(&self, uid: &str, patch: UserPatch) -> Result<User, AppError> {
        validate_uid("uid", uid)?;
        if patch.email.is_none() && patch.role.is_none() {
            return Err(AppError::Validation("no fields to update".into()));
        }
        if let Some(email) = &patch.email {
            validate_email("email", email)?;
        }

        for _ in 0..COMMIT_ATTEMPTS {
            let doc = docs::fetch::<User>(self.store.as_ref(), Collection::Users, uid)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("user {uid} does not exist")))?;
            let version = doc.version;
            let mut user = doc.record;

            let mut batch = WriteBatch::new().guard_version(Collection::Users, uid, version);

            if let Some(email) = &patch.email {
                let email = normalize_email(email);
                if email != user.email {
                    if self
                        .store
                        .get(Collection::EmailIndex, &email)
                        .await?
                        .is_some()
                    {
                        return Err(AppError::Conflict(format!(
                            "email {email} is already in use"
                        )));
                    }
                    batch = batch
                        .guard_absent(Collection::EmailIndex, &email)
                        .delete(Collection::EmailIndex, &user.email)
                        .put(Collection::EmailIndex, &email, json!({ "uid": uid }));
                    user.email = email;
                }
            }
            if let Some(role) = patch.role {
                user.role = role;
            }

            batch = batch.put(Collection::Users, uid, docs::encode(&user)?);

            match self.store.apply(batch).await {
                Ok(()) => {
                    tracing::info!(uid = %uid, "user updated");
                    return Ok(user);
                }
                Err(StoreError::Conflict(_)) => continue,
                Err(err) => return Err(err.into()),
            }
        }

        Err(AppError::Conflict(
            "user update could not be completed under concurrent updates".to_string(),
        ))
    }

    /// Remove the account and release its email. Ledger history stays.
    pub async fn delete_user(&self, uid: &str) -> Result<(), AppError> {
        validate_uid("uid", uid)?;

        for _ in 0..COMMIT_ATTEMPTS {
            let doc = docs::fetch::<User>(self.store.as_ref(), Collection::Users, uid)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("user {uid} does not exist")))?;

            let batch = WriteBatch::new()
                .guard_version(Collection::Users, uid, doc.version)
                .delete(Collection::Users, uid)
                .delete(Collection::EmailIndex, &doc.record.email);

            match self.store.apply(batch).await {
                Ok(()) => {
                    tracing::info!(uid = %uid, "user deleted");
                    return Ok(());
                }
                Err(StoreError::Conflict(_)) => continue,
                Err(err) => return Err(err.into()),
            }
        }

        Err(AppError::Conflict(
            "user deletion could not be completed under concurrent updates".to_string(),
        ))
    }

    /// Marketplace totals for the dashboard.
    pub async fn stats(&self) -> Result<StatsSummary, AppError> {
        let users = self.store.list(Collection::Users).await?;
        let transactions: Vec<docs::Versioned<LedgerEntry>> =
            docs::fetch_all(self.store.as_ref(), Collection::Transactions).await?;
        let numbers = self.store.list(Collection::Numbers).await?;

        let available_numbers = numbers
            .iter()
            .filter(|doc| doc.data["status"] == json!("available"))
            .count();

        let mut credits_issued = money::zero();
        let mut purchase_revenue = money::zero();
        for doc in &transactions {
            match doc.record.kind {
                LedgerKind::CreditAdded => credits_issued = credits_issued + &doc.record.amount,
                LedgerKind::SinglePurchase | LedgerKind::BulkPurchase => {
                    purchase_revenue = purchase_revenue + &doc.record.amount
                }
            }
        }

        Ok(StatsSummary {
            total_users: users.len(),
            total_numbers: numbers.len(),
            available_numbers,
            sold_numbers: numbers.len() - available_numbers,
            total_transactions: transactions.len(),
            credits_issued: credits_issued.with_scale(2),
            purchase_revenue: purchase_revenue.with_scale(2),
        })
    }

    /// Current bulk pricing, or an empty package list before the first
    /// save.
    pub async fn bulk_pricing(&self) -> Result<BulkPricingSettings, AppError> {
        let settings =
            docs::fetch::<BulkPricingSettings>(self.store.as_ref(), Collection::Settings, BULK_PRICING_DOC_ID)
                .await?
                .map(|doc| doc.record)
                .unwrap_or_else(BulkPricingSettings::empty);
        Ok(settings)
    }

    /// Replace the advertised bulk packages. Last write wins; purchases
    /// read prices from the request, so stale reads cannot corrupt money.
    pub async fn update_bulk_pricing(
        &self,
        packages: Vec<BulkPackage>,
    ) -> Result<BulkPricingSettings, AppError> {
        let mut cleaned = Vec::with_capacity(packages.len());
        for package in packages {
            if package.quantity == 0 {
                return Err(AppError::Validation(
                    "quantity: must be greater than zero".into(),
                ));
            }
            validate_positive_amount("price", &package.price)?;
            cleaned.push(BulkPackage {
                quantity: package.quantity,
                price: money::round_to_cents(&package.price),
                label: package.label,
            });
        }

        let settings = BulkPricingSettings::with_packages(cleaned);
        self.store
            .apply(WriteBatch::new().put(
                Collection::Settings,
                BULK_PRICING_DOC_ID,
                docs::encode(&settings)?,
            ))
            .await?;

        tracing::info!(packages = settings.packages.len(), "bulk pricing updated");
        Ok(settings)
    }
}
