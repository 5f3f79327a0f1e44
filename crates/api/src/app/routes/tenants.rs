use axum::{Extension, extract::Path};

use tenantdesk_core::TenantId;
use tenantdesk_infra::Services;
use tenantdesk_tenancy::TenantPatch;

use super::parse_id;
use crate::app::dto;
use crate::app::errors::{self, ApiResult};
use crate::app::extract::{ApiJson, ApiQuery};
use crate::context::PrincipalContext;

pub async fn list_tenants(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    ApiQuery(query): ApiQuery<dto::TenantListQuery>,
) -> ApiResult {
    let (filter, page) = query.into_parts();
    let tenants = services.tenants.list(&principal.caller(), filter, page).await?;
    errors::ok(dto::listing("tenants", tenants)?)
}

pub async fn get_tenant(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: TenantId = parse_id(&id)?;
    errors::ok(services.tenants.get(&principal.caller(), id).await?)
}

pub async fn update_tenant(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<TenantPatch>,
) -> ApiResult {
    let id: TenantId = parse_id(&id)?;
    let tenant = services.tenants.update(&principal.caller(), id, body).await?;
    errors::ok_with_message("Tenant updated successfully", tenant)
}
