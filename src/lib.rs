pub mod config;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod health;
pub mod middleware;
pub mod response;
pub mod services;
pub mod store;
pub mod validation;

use std::sync::Arc;
use std::time::Instant;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::middleware::admin_gate::require_admin;
use crate::middleware::request_log::request_log;
use crate::services::{AccountService, AdminService, InventoryService, PurchaseCoordinator};
use crate::store::RecordStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub coordinator: PurchaseCoordinator,
    pub accounts: AccountService,
    pub inventory: InventoryService,
    pub admin: AdminService,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, bootstrap_admin_email: Option<String>) -> Self {
        Self {
            coordinator: PurchaseCoordinator::new(store.clone()),
            accounts: AccountService::new(store.clone(), bootstrap_admin_email),
            inventory: InventoryService::new(store.clone()),
            admin: AdminService::new(store.clone()),
            store,
            started_at: Instant::now(),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/stats", get(handlers::admin::stats))
        .route("/add-credit", post(handlers::admin::add_credit))
        .route("/users", get(handlers::admin::list_users))
        .route("/users/search", get(handlers::admin::search_user))
        .route("/users/update", post(handlers::admin::update_user))
        .route("/users/delete", post(handlers::admin::delete_user))
        .route("/numbers", get(handlers::admin::list_numbers))
        .route("/numbers/upload", post(handlers::admin::upload_numbers))
        .route("/numbers/update", post(handlers::admin::update_number))
        .route("/numbers/delete", post(handlers::admin::delete_numbers))
        .route(
            "/numbers/delete-sold",
            post(handlers::admin::delete_sold_numbers),
        )
        .route(
            "/settings/bulk-buy",
            get(handlers::admin::bulk_pricing).post(handlers::admin::update_bulk_pricing),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_admin,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/signup", post(handlers::auth::signup))
        .route("/auth/login", post(handlers::auth::login))
        .route("/user/:uid", get(handlers::user::profile))
        .route("/user/:uid/numbers", get(handlers::user::purchased_numbers))
        .route("/user/numbers/delete", post(handlers::user::remove_numbers))
        .route("/numbers/available", get(handlers::numbers::available))
        .route("/numbers/buy", post(handlers::numbers::buy))
        .route("/numbers/bulk-buy", post(handlers::numbers::bulk_buy))
        .nest("/admin", admin_routes)
        .layer(axum::middleware::from_fn(request_log))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
