use axum::{Extension, extract::Path};
use serde_json::json;

use tenantdesk_core::{ProjectId, TaskId};
use tenantdesk_infra::Services;
use tenantdesk_projects::{NewTask, TaskPatch};

use super::parse_id;
use crate::app::dto;
use crate::app::errors::{self, ApiResult};
use crate::app::extract::{ApiJson, ApiQuery};
use crate::context::PrincipalContext;

pub async fn create_task(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(project_id): Path<String>,
    ApiJson(body): ApiJson<NewTask>,
) -> ApiResult {
    let project_id: ProjectId = parse_id(&project_id)?;
    let task = services.tasks.create(&principal.caller(), project_id, body).await?;
    errors::created("Task created successfully", task)
}

/// Unpaginated; ordered by priority, then due date.
pub async fn list_tasks(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(project_id): Path<String>,
    ApiQuery(query): ApiQuery<dto::TaskListQuery>,
) -> ApiResult {
    let project_id: ProjectId = parse_id(&project_id)?;
    let filter = query.into_filter()?;
    let tasks = services.tasks.list(&principal.caller(), project_id, filter).await?;
    let total = tasks.len();
    errors::ok(json!({ "tasks": tasks, "total": total }))
}

pub async fn update_task_status(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<dto::TaskStatusRequest>,
) -> ApiResult {
    let id: TaskId = parse_id(&id)?;
    let task = services
        .tasks
        .update_status(&principal.caller(), id, body.status)
        .await?;
    errors::ok_with_message("Task status updated successfully", task)
}

pub async fn update_task(
    Extension(services): Extension<Services>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<TaskPatch>,
) -> ApiResult {
    let id: TaskId = parse_id(&id)?;
    let task = services.tasks.update(&principal.caller(), id, body).await?;
    errors::ok_with_message("Task updated successfully", task)
}
