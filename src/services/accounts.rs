//! Signup, login, and user-facing account reads and bookkeeping.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::domain::{LedgerEntry, Role, User};
use crate::error::AppError;
use crate::store::{docs, Collection, RecordStore, StoreError, WriteBatch};
use crate::validation::{normalize_email, validate_email, validate_uid};

/// Ledger entries returned with a profile, newest first.
const RECENT_ACTIVITY_LIMIT: usize = 10;

const COMMIT_ATTEMPTS: usize = 16;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovalSummary {
    pub removed: usize,
    pub remaining: usize,
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn RecordStore>,
    bootstrap_admin_email: Option<String>,
}

impl AccountService {
    pub fn new(store: Arc<dyn RecordStore>, bootstrap_admin_email: Option<String>) -> Self {
        Self {
            store,
            bootstrap_admin_email: bootstrap_admin_email.map(|email| normalize_email(&email)),
        }
    }

    /// Create an account. The email claim is taken in the same commit as
    /// the user record, so two signups for one address cannot both win.
    pub async fn signup(&self, email: &str, requested_uid: Option<&str>) -> Result<User, AppError> {
        validate_email("email", email)?;
        let email = normalize_email(email);

        let uid = match requested_uid.map(str::trim).filter(|uid| !uid.is_empty()) {
            Some(uid) => {
                validate_uid("uid", uid)?;
                uid.to_string()
            }
            None => Uuid::new_v4().to_string(),
        };

        let role = if self.bootstrap_admin_email.as_deref() == Some(email.as_str()) {
            Role::Admin
        } else {
            Role::User
        };

        let user = User::new(uid.clone(), email.clone(), role);

        let batch = WriteBatch::new()
            .guard_absent(Collection::Users, &uid)
            .guard_absent(Collection::EmailIndex, &email)
            .put(Collection::Users, &uid, docs::encode(&user)?)
            .put(Collection::EmailIndex, &email, json!({ "uid": uid }));

        match self.store.apply(batch).await {
            Ok(()) => {
                tracing::info!(uid = %user.uid, role = ?user.role, "account created");
                Ok(user)
            }
            Err(StoreError::Conflict(_)) => Err(AppError::Conflict(
                "an account with this email or uid already exists".to_string(),
            )),
            Err(err) => Err(err.into()),
        }
    }

    /// Look an account up by email.
    pub async fn login(&self, email: &str) -> Result<User, AppError> {
        validate_email("email", email)?;
        let email = normalize_email(email);

        let claim = self
            .store
            .get(Collection::EmailIndex, &email)
            .await?
            .ok_or_else(|| AppError::NotFound("no account exists for this email".to_string()))?;

        let uid = claim.data["uid"]
            .as_str()
            .ok_or_else(|| AppError::Internal(format!("email claim {email} is malformed")))?
            .to_string();

        match docs::fetch::<User>(self.store.as_ref(), Collection::Users, &uid).await? {
            Some(doc) => Ok(doc.record),
            None => {
                tracing::warn!(%email, %uid, "email claim points at a missing user");
                Err(AppError::NotFound("no account exists for this email".to_string()))
            }
        }
    }

    pub async fn get_user(&self, uid: &str) -> Result<User, AppError> {
        validate_uid("uid", uid)?;
        docs::fetch::<User>(self.store.as_ref(), Collection::Users, uid)
            .await?
            .map(|doc| doc.record)
            .ok_or_else(|| AppError::NotFound(format!("user {uid} does not exist")))
    }

    /// Profile read: the account plus its most recent ledger activity.
    pub async fn profile(&self, uid: &str) -> Result<(User, Vec<LedgerEntry>), AppError> {
        let user = self.get_user(uid).await?;

        let mut entries: Vec<LedgerEntry> =
            docs::find_eq(self.store.as_ref(), Collection::Transactions, "userId", &json!(uid))
                .await?
                .into_iter()
                .map(|doc| doc.record)
                .collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(RECENT_ACTIVITY_LIMIT);

        Ok((user, entries))
    }

    /// Drop snapshots from the buyer's own list. Pure bookkeeping: the
    /// inventory records and the ledger are not touched, so nothing goes
    /// back on sale.
    pub async fn remove_purchased_numbers(
        &self,
        uid: &str,
        phone_numbers: &[String],
    ) -> Result<RemovalSummary, AppError> {
        validate_uid("uid", uid)?;
        if phone_numbers.is_empty() {
            return Err(AppError::Validation("phoneNumbers must not be empty".into()));
        }

        let targets: std::collections::HashSet<&str> =
            phone_numbers.iter().map(String::as_str).collect();

        for _ in 0..COMMIT_ATTEMPTS {
            let doc = docs::fetch::<User>(self.store.as_ref(), Collection::Users, uid)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("user {uid} does not exist")))?;
            let version = doc.version;
            let mut user = doc.record;

            let before = user.purchased_numbers_data.len();
            user.purchased_numbers_data
                .retain(|record| !targets.contains(record.phone_number.as_str()));
            let removed = before - user.purchased_numbers_data.len();

            if removed == 0 {
                return Ok(RemovalSummary {
                    removed: 0,
                    remaining: before,
                });
            }

            let batch = WriteBatch::new()
                .guard_version(Collection::Users, uid, version)
                .put(Collection::Users, uid, docs::encode(&user)?);

            match self.store.apply(batch).await {
                Ok(()) => {
                    return Ok(RemovalSummary {
                        removed,
                        remaining: user.purchased_numbers_data.len(),
                    })
                }
                Err(StoreError::Conflict(_)) => continue,
                Err(err) => return Err(err.into()),
            }
        }

        Err(AppError::Conflict(
            "purchased-number removal could not be completed under concurrent updates".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn service(store: &MemoryStore) -> AccountService {
        AccountService::new(Arc::new(store.clone()), Some("boss@numhub.test".into()))
    }

    #[tokio::test]
    async fn signup_normalizes_email_and_starts_at_zero() {
        let store = MemoryStore::new();
        let user = service(&store)
            .signup("  Ada@Example.COM ", Some("u1"))
            .await
            .expect("signup");

        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.uid, "u1");
        assert_eq!(user.credits, bigdecimal::BigDecimal::from(0));
        assert_eq!(user.role, Role::User);
    }

    #[tokio::test]
    async fn signup_generates_uid_when_absent() {
        let store = MemoryStore::new();
        let user = service(&store)
            .signup("ada@example.com", None)
            .await
            .expect("signup");

        assert!(!user.uid.is_empty());
    }

    #[tokio::test]
    async fn bootstrap_email_gets_admin_role() {
        let store = MemoryStore::new();
        let user = service(&store)
            .signup("Boss@numhub.test", None)
            .await
            .expect("signup");

        assert_eq!(user.role, Role::Admin);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_even_with_different_case() {
        let store = MemoryStore::new();
        let service = service(&store);
        service.signup("ada@example.com", None).await.expect("first");

        let err = service
            .signup("ADA@example.com", None)
            .await
            .expect_err("duplicate must fail");
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn duplicate_uid_conflicts() {
        let store = MemoryStore::new();
        let service = service(&store);
        service.signup("one@example.com", Some("u1")).await.expect("first");

        let err = service
            .signup("two@example.com", Some("u1"))
            .await
            .expect_err("uid reuse must fail");
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn login_finds_account_case_insensitively() {
        let store = MemoryStore::new();
        let service = service(&store);
        service.signup("ada@example.com", Some("u1")).await.expect("signup");

        let user = service.login("ADA@EXAMPLE.COM").await.expect("login");
        assert_eq!(user.uid, "u1");
    }

    #[tokio::test]
    async fn login_unknown_email_is_not_found() {
        let store = MemoryStore::new();
        let err = service(&store)
            .login("ghost@example.com")
            .await
            .expect_err("must fail");
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn invalid_email_is_rejected_before_any_write() {
        let store = MemoryStore::new();
        let err = service(&store)
            .signup("not-an-email", None)
            .await
            .expect_err("must fail");
        assert!(matches!(err, AppError::Validation(_)));
        assert!(store.list(Collection::Users).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_purchased_numbers_is_bookkeeping_only() {
        use crate::domain::{Number, PurchaseKind, PurchaseRecord};
        use chrono::Utc;

        let store = MemoryStore::new();
        let service = service(&store);
        let user = service.signup("ada@example.com", Some("u1")).await.expect("signup");

        let number = Number::new(
            "+15550100".into(),
            "https://api.test.local/n/1".into(),
            bigdecimal::BigDecimal::from(1),
            "standard".into(),
        );
        let mut owner = user;
        owner.purchased_numbers_data.push(PurchaseRecord::snapshot(
            &number,
            PurchaseKind::Single,
            bigdecimal::BigDecimal::from(1),
            Utc::now(),
        ));
        store
            .apply(
                WriteBatch::new()
                    .put(Collection::Users, "u1", docs::encode(&owner).unwrap())
                    .put(Collection::Numbers, &number.id, docs::encode(&number).unwrap()),
            )
            .await
            .expect("seed ownership");

        let summary = service
            .remove_purchased_numbers("u1", &["+15550100".to_string()])
            .await
            .expect("removal");

        assert_eq!(summary.removed, 1);
        assert_eq!(summary.remaining, 0);

        let user = service.get_user("u1").await.expect("user");
        assert!(user.purchased_numbers_data.is_empty());
        // The inventory record is untouched.
        assert!(store
            .get(Collection::Numbers, &number.id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn remove_unknown_phone_removes_nothing() {
        let store = MemoryStore::new();
        let service = service(&store);
        service.signup("ada@example.com", Some("u1")).await.expect("signup");

        let summary = service
            .remove_purchased_numbers("u1", &["+10000000".to_string()])
            .await
            .expect("no-op removal");

        assert_eq!(summary.removed, 0);
        assert_eq!(summary.remaining, 0);
    }

    #[tokio::test]
    async fn profile_orders_recent_activity_newest_first() {
        let store = MemoryStore::new();
        let service = service(&store);
        let user = service.signup("ada@example.com", Some("u1")).await.expect("signup");

        for n in 0..3u32 {
            let entry = LedgerEntry::credit_added(&user, bigdecimal::BigDecimal::from(n + 1));
            store
                .apply(WriteBatch::new().put(
                    Collection::Transactions,
                    &entry.id.to_string(),
                    docs::encode(&entry).unwrap(),
                ))
                .await
                .expect("seed entry");
        }

        let (_, entries) = service.profile("u1").await.expect("profile");
        assert_eq!(entries.len(), 3);
        assert!(entries[0].timestamp >= entries[1].timestamp);
        assert!(entries[1].timestamp >= entries[2].timestamp);
    }
}
