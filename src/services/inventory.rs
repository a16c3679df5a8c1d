//! Inventory lifecycle: listings, uploads, edits, deletions.

use std::collections::HashSet;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::{money, Number, NumberStatus};
use crate::error::AppError;
use crate::store::{docs, Collection, RecordStore, StoreError, WriteBatch};
use crate::validation::{
    sanitize_string, validate_max_len, validate_non_negative_amount, validate_phone_number,
    validate_required, ValidationResult, API_URL_MAX_LEN, NUMBER_TYPE_MAX_LEN, UPLOAD_BATCH_MAX,
};

const COMMIT_ATTEMPTS: usize = 16;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNumberInput {
    pub phone_number: String,
    pub api_url: String,
    pub price: BigDecimal,
    #[serde(rename = "type")]
    pub number_type: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberPatch {
    pub phone_number: Option<String>,
    pub api_url: Option<String>,
    pub price: Option<BigDecimal>,
    #[serde(rename = "type")]
    pub number_type: Option<String>,
}

impl NumberPatch {
    fn is_empty(&self) -> bool {
        self.phone_number.is_none()
            && self.api_url.is_none()
            && self.price.is_none()
            && self.number_type.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    pub added: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionSummary {
    pub deleted: usize,
}

fn validate_new_number(input: &NewNumberInput) -> ValidationResult {
    validate_phone_number("phoneNumber", &input.phone_number)?;
    validate_required("apiUrl", &input.api_url)?;
    validate_max_len("apiUrl", &input.api_url, API_URL_MAX_LEN)?;
    validate_required("type", &input.number_type)?;
    validate_max_len("type", &input.number_type, NUMBER_TYPE_MAX_LEN)?;
    validate_non_negative_amount("price", &input.price)?;
    Ok(())
}

#[derive(Clone)]
pub struct InventoryService {
    store: Arc<dyn RecordStore>,
}

impl InventoryService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Numbers currently on sale, oldest first.
    pub async fn available(&self) -> Result<Vec<Number>, AppError> {
        let mut numbers: Vec<Number> =
            docs::find_eq(self.store.as_ref(), Collection::Numbers, "status", &json!("available"))
                .await?
                .into_iter()
                .map(|doc| doc.record)
                .collect();
        numbers.sort_by(|a, b| a.added_at.cmp(&b.added_at).then(a.id.cmp(&b.id)));
        Ok(numbers)
    }

    /// Full inventory, optionally narrowed to one status.
    pub async fn list(&self, status: Option<NumberStatus>) -> Result<Vec<Number>, AppError> {
        let docs = match status {
            Some(status) => {
                docs::find_eq(
                    self.store.as_ref(),
                    Collection::Numbers,
                    "status",
                    &json!(status.as_str()),
                )
                .await?
            }
            None => docs::fetch_all(self.store.as_ref(), Collection::Numbers).await?,
        };

        let mut numbers: Vec<Number> = docs.into_iter().map(|doc| doc.record).collect();
        numbers.sort_by(|a, b| a.added_at.cmp(&b.added_at).then(a.id.cmp(&b.id)));
        Ok(numbers)
    }

    /// Add a batch of numbers. Phones already in inventory and repeats
    /// within the batch are skipped rather than rejected; the phone claim
    /// is taken in the same commit as the record.
    pub async fn upload(&self, items: Vec<NewNumberInput>) -> Result<UploadSummary, AppError> {
        if items.is_empty() {
            return Err(AppError::Validation("numbers must not be empty".into()));
        }
        if items.len() > UPLOAD_BATCH_MAX {
            return Err(AppError::Validation(format!(
                "numbers must contain at most {UPLOAD_BATCH_MAX} entries"
            )));
        }
        for item in &items {
            validate_new_number(item)?;
        }

        for _ in 0..COMMIT_ATTEMPTS {
            let mut batch = WriteBatch::new();
            let mut seen = HashSet::new();
            let mut added = 0usize;
            let mut skipped = 0usize;

            for item in &items {
                let phone = sanitize_string(&item.phone_number);
                if !seen.insert(phone.clone()) {
                    skipped += 1;
                    continue;
                }
                if self
                    .store
                    .get(Collection::PhoneIndex, &phone)
                    .await?
                    .is_some()
                {
                    skipped += 1;
                    continue;
                }

                let number = Number::new(
                    phone.clone(),
                    sanitize_string(&item.api_url),
                    money::round_to_cents(&item.price),
                    sanitize_string(&item.number_type),
                );
                batch = batch
                    .guard_absent(Collection::PhoneIndex, &phone)
                    .put(Collection::Numbers, &number.id, docs::encode(&number)?)
                    .put(
                        Collection::PhoneIndex,
                        &phone,
                        json!({ "numberId": number.id }),
                    );
                added += 1;
            }

            if batch.is_empty() {
                return Ok(UploadSummary { added: 0, skipped });
            }

            match self.store.apply(batch).await {
                Ok(()) => {
                    tracing::info!(added, skipped, "inventory upload committed");
                    return Ok(UploadSummary { added, skipped });
                }
                Err(StoreError::Conflict(_)) => continue,
                Err(err) => return Err(err.into()),
            }
        }

        Err(AppError::Conflict(
            "inventory upload could not be completed under concurrent updates".to_string(),
        ))
    }

    /// Edit listing fields. Status and sale details are owned by the
    /// purchase path and cannot be changed here.
    pub async fn update(&self, id: &str, patch: NumberPatch) -> Result<Number, AppError> {
        validate_required("id", id)?;
        if patch.is_empty() {
            return Err(AppError::Validation("no fields to update".into()));
        }
        if let Some(price) = &patch.price {
            validate_non_negative_amount("price", price)?;
        }
        if let Some(api_url) = &patch.api_url {
            validate_required("apiUrl", api_url)?;
            validate_max_len("apiUrl", api_url, API_URL_MAX_LEN)?;
        }
        if let Some(number_type) = &patch.number_type {
            validate_required("type", number_type)?;
            validate_max_len("type", number_type, NUMBER_TYPE_MAX_LEN)?;
        }
        if let Some(phone) = &patch.phone_number {
            validate_phone_number("phoneNumber", phone)?;
        }

        for _ in 0..COMMIT_ATTEMPTS {
            let doc = docs::fetch::<Number>(self.store.as_ref(), Collection::Numbers, id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("number {id} does not exist")))?;
            let version = doc.version;
            let mut number = doc.record;

            let mut batch = WriteBatch::new().guard_version(Collection::Numbers, id, version);

            if let Some(price) = &patch.price {
                number.price = money::round_to_cents(price);
            }
            if let Some(api_url) = &patch.api_url {
                number.api_url = sanitize_string(api_url);
            }
            if let Some(number_type) = &patch.number_type {
                number.number_type = sanitize_string(number_type);
            }
            if let Some(phone) = &patch.phone_number {
                let phone = sanitize_string(phone);
                if phone != number.phone_number {
                    if self
                        .store
                        .get(Collection::PhoneIndex, &phone)
                        .await?
                        .is_some()
                    {
                        return Err(AppError::Conflict(format!(
                            "phone number {phone} is already in inventory"
                        )));
                    }
                    batch = batch
                        .guard_absent(Collection::PhoneIndex, &phone)
                        .delete(Collection::PhoneIndex, &number.phone_number)
                        .put(
                            Collection::PhoneIndex,
                            &phone,
                            json!({ "numberId": number.id }),
                        );
                    number.phone_number = phone;
                }
            }

            batch = batch.put(Collection::Numbers, id, docs::encode(&number)?);

            match self.store.apply(batch).await {
                Ok(()) => return Ok(number),
                Err(StoreError::Conflict(_)) => continue,
                Err(err) => return Err(err.into()),
            }
        }

        Err(AppError::Conflict(
            "number update could not be completed under concurrent updates".to_string(),
        ))
    }

    /// Remove records by id, releasing their phone claims. Unknown ids
    /// are ignored. Ledger history is never touched.
    pub async fn delete(&self, ids: &[String]) -> Result<DeletionSummary, AppError> {
        if ids.is_empty() {
            return Err(AppError::Validation("ids must not be empty".into()));
        }
        let mut unique: Vec<&String> = ids.iter().collect();
        unique.sort();
        unique.dedup();

        for _ in 0..COMMIT_ATTEMPTS {
            let mut batch = WriteBatch::new();
            let mut deleted = 0usize;

            for id in &unique {
                if let Some(doc) =
                    docs::fetch::<Number>(self.store.as_ref(), Collection::Numbers, id).await?
                {
                    batch = batch
                        .guard_version(Collection::Numbers, id, doc.version)
                        .delete(Collection::Numbers, id)
                        .delete(Collection::PhoneIndex, &doc.record.phone_number);
                    deleted += 1;
                }
            }

            if batch.is_empty() {
                return Ok(DeletionSummary { deleted: 0 });
            }

            match self.store.apply(batch).await {
                Ok(()) => {
                    tracing::info!(deleted, "inventory records deleted");
                    return Ok(DeletionSummary { deleted });
                }
                Err(StoreError::Conflict(_)) => continue,
                Err(err) => return Err(err.into()),
            }
        }

        Err(AppError::Conflict(
            "inventory deletion could not be completed under concurrent updates".to_string(),
        ))
    }

    /// Purge every sold record in one commit. Buyer snapshots and the
    /// ledger keep the full purchase history.
    pub async fn delete_sold(&self) -> Result<DeletionSummary, AppError> {
        for _ in 0..COMMIT_ATTEMPTS {
            let sold: Vec<docs::Versioned<Number>> =
                docs::find_eq(self.store.as_ref(), Collection::Numbers, "status", &json!("sold"))
                    .await?;

            if sold.is_empty() {
                return Ok(DeletionSummary { deleted: 0 });
            }

            let mut batch = WriteBatch::new();
            let deleted = sold.len();
            for doc in &sold {
                batch = batch
                    .guard_version(Collection::Numbers, &doc.record.id, doc.version)
                    .delete(Collection::Numbers, &doc.record.id)
                    .delete(Collection::PhoneIndex, &doc.record.phone_number);
            }

            match self.store.apply(batch).await {
                Ok(()) => {
                    tracing::info!(deleted, "sold inventory purged");
                    return Ok(DeletionSummary { deleted });
                }
                Err(StoreError::Conflict(_)) => continue,
                Err(err) => return Err(err.into()),
            }
        }

        Err(AppError::Conflict(
            "sold-inventory purge could not be completed under concurrent updates".to_string(),
        ))
    }
}
