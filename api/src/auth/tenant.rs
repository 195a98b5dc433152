//! Tenant resolution middleware

use axum::{body::Body, http::Request, middleware::Next, response::Response};

use crate::domain::tenant::{TenantContext, TenantId};
use crate::error::AppError;

pub const TENANT_HEADER: &str = "X-Tenant-Id";

/// Resolve the tenant from the request headers
fn extract_tenant(request: &Request<Body>) -> Result<TenantId, AppError> {
    let value = request
        .headers()
        .get(TENANT_HEADER)
        .ok_or(AppError::MissingTenant)?;

    let value = value
        .to_str()
        .map_err(|_| AppError::InvalidTenant("Tenant header is not valid text".to_string()))?;
    if value.trim().is_empty() {
        return Err(AppError::MissingTenant);
    }

    value.parse().map_err(AppError::InvalidTenant)
}

/// Tenant middleware
///
/// Rejects requests without a usable `X-Tenant-Id` header and injects the
/// resolved `TenantContext` into request extensions for the handlers.
pub async fn tenant_middleware(
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let tenant_id = extract_tenant(&request).inspect_err(|e| {
        tracing::warn!(error = %e, path = %request.uri().path(), "Rejected request without tenant");
    })?;

    request
        .extensions_mut()
        .insert(TenantContext::new(tenant_id));

    Ok(next.run(request).await)
}
