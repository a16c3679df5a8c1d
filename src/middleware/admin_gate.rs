use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::domain::User;
use crate::error::AppError;
use crate::store::{docs, Collection};
use crate::AppState;

/// Header identifying the caller on `/admin` routes.
pub const ADMIN_HEADER: &str = "x-admin-uid";

/// Gate for the admin subtree. The caller names an account through the
/// `x-admin-uid` header; the request only proceeds when that account exists
/// and holds the admin role. Every admin route goes through this one check.
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let uid = req
        .headers()
        .get(ADMIN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| AppError::Forbidden("admin identity header missing".into()))?;

    let caller = docs::fetch::<User>(state.store.as_ref(), Collection::Users, &uid).await?;
    match caller {
        Some(doc) if doc.record.is_admin() => {
            tracing::debug!(admin = %uid, "admin request authorized");
            Ok(next.run(req).await)
        }
        _ => Err(AppError::Forbidden("admin privileges required".into())),
    }
}
