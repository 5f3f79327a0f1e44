use axum::{Extension, extract::Path};

use tenantdesk_core::{TenantId, UserId};
use tenantdesk_infra::Services;
use tenantdesk_tenancy::{NewUser, UserPatch};

use super::parse_id;
use crate::app::dto;
use crate::app::errors::{self, ApiResult};
use crate::app::extract::{ApiJson, ApiQuery};
use crate::context::PrincipalContext;

pub async fn create_user(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(tenant_id): Path<String>,
    ApiJson(body): ApiJson<NewUser>,
) -> ApiResult {
    let tenant_id: TenantId = parse_id(&tenant_id)?;
    let user = services.users.create(&principal.caller(), tenant_id, body).await?;
    errors::created("User created successfully", user)
}

pub async fn list_users(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(tenant_id): Path<String>,
    ApiQuery(query): ApiQuery<dto::UserListQuery>,
) -> ApiResult {
    let tenant_id: TenantId = parse_id(&tenant_id)?;
    let (filter, page) = query.into_parts();
    let users = services
        .users
        .list(&principal.caller(), tenant_id, filter, page)
        .await?;
    errors::ok(dto::listing("users", users)?)
}

pub async fn update_user(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UserPatch>,
) -> ApiResult {
    let id: UserId = parse_id(&id)?;
    let user = services.users.update(&principal.caller(), id, body).await?;
    errors::ok_with_message("User updated successfully", user)
}

pub async fn delete_user(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: UserId = parse_id(&id)?;
    services.users.delete(&principal.caller(), id).await?;
    errors::done("User deleted successfully")
}
