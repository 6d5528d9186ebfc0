// Operator route guard

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::handlers::AppError;
use super::SupportServer;
use crate::errors::ServiceError;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Reject operator requests whose `x-admin-token` does not match.
/// Routes stay open when no token is configured.
pub async fn require_admin_token(
    State(server): State<Arc<SupportServer>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(expected) = server.admin_token() {
        let presented = request
            .headers()
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok());
        if presented != Some(expected) {
            tracing::warn!(path = %request.uri().path(), "Rejected operator request");
            return Err(ServiceError::Unauthorized.into());
        }
    }
    Ok(next.run(request).await)
}
