//! Domain records persisted in the marketplace's collections.

pub mod money;

mod ledger;
mod number;
mod settings;
mod user;

pub use ledger::{LedgerEntry, LedgerKind};
pub use number::{Number, NumberStatus};
pub use settings::{BulkPackage, BulkPricingSettings, BULK_PRICING_DOC_ID};
pub use user::{PurchaseKind, PurchaseRecord, Role, User};
