pub mod accounts;
pub mod admin;
pub mod inventory;
pub mod purchase;

pub use accounts::AccountService;
pub use admin::AdminService;
pub use inventory::InventoryService;
pub use purchase::PurchaseCoordinator;
