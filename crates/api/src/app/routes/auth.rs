use axum::Extension;

use tenantdesk_infra::Services;
use tenantdesk_infra::services::LoginRequest;
use tenantdesk_tenancy::Registration;

use crate::app::dto;
use crate::app::errors::{self, ApiResult};
use crate::app::extract::{ApiJson, ClientIp};
use crate::context::PrincipalContext;

pub async fn register_tenant(
    Extension(services): Extension<Services>,
    ClientIp(ip): ClientIp,
    ApiJson(body): ApiJson<Registration>,
) -> ApiResult {
    let registered = services.tenants.register(body, ip).await?;
    errors::created(
        "Tenant registered successfully",
        dto::RegisterTenantResponse::from(registered),
    )
}

pub async fn login(
    Extension(services): Extension<Services>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ApiResult {
    let outcome = services.auth.login(body).await?;
    errors::ok(dto::LoginResponse::from(outcome))
}

pub async fn me(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    errors::ok(services.auth.me(&principal.caller()).await?)
}

pub async fn logout(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    services.auth.logout(&principal.caller()).await?;
    errors::done("Logged out successfully")
}
