use axum::{Extension, extract::Path};

use tenantdesk_core::ProjectId;
use tenantdesk_infra::Services;
use tenantdesk_projects::{NewProject, ProjectPatch};

use super::parse_id;
use crate::app::dto;
use crate::app::errors::{self, ApiResult};
use crate::app::extract::{ApiJson, ApiQuery};
use crate::context::PrincipalContext;

pub async fn create_project(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    ApiJson(body): ApiJson<NewProject>,
) -> ApiResult {
    let project = services.projects.create(&principal.caller(), body).await?;
    errors::created("Project created successfully", project)
}

pub async fn list_projects(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    ApiQuery(query): ApiQuery<dto::ProjectListQuery>,
) -> ApiResult {
    let (filter, page) = query.into_parts();
    let projects = services.projects.list(&principal.caller(), filter, page).await?;
    errors::ok(dto::listing("projects", projects)?)
}

pub async fn get_project(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: ProjectId = parse_id(&id)?;
    errors::ok(services.projects.get(&principal.caller(), id).await?)
}

pub async fn update_project(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ProjectPatch>,
) -> ApiResult {
    let id: ProjectId = parse_id(&id)?;
    let project = services.projects.update(&principal.caller(), id, body).await?;
    errors::ok_with_message("Project updated successfully", project)
}

pub async fn delete_project(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: ProjectId = parse_id(&id)?;
    services.projects.delete(&principal.caller(), id).await?;
    errors::done("Project deleted successfully")
}
