//! Task resource service.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use tenantdesk_auth::{Action, Target};
use tenantdesk_core::{DomainError, DomainResult, ProjectId, TaskId};
use tenantdesk_projects::{NewTask, Project, Task, TaskFilter, TaskPatch, TaskStatus, TaskView};

use super::{Caller, enforce};
use crate::audit::{AuditAction, AuditLog};
use crate::store::Store;

#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn Store>,
    audit: AuditLog,
}

impl TaskService {
    pub fn new(store: Arc<dyn Store>, audit: AuditLog) -> Self {
        Self { store, audit }
    }

    async fn load_project(&self, id: ProjectId) -> DomainResult<Project> {
        self.store
            .get_project(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Project"))
    }

    /// The task and the target describing it. Ownership comes from the
    /// parent project.
    async fn load(&self, id: TaskId) -> DomainResult<(Task, Target)> {
        let task = self
            .store
            .get_task(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Task"))?;
        let project = self
            .store
            .get_project(task.project_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Task"))?;
        let target = Target::Task {
            tenant_id: task.tenant_id,
            project_created_by: project.created_by,
            assigned_to: task.assigned_to,
        };
        Ok((task, target))
    }

    /// Create a task under `project_id`. The assignee, if any, must be a user
    /// of the same tenant.
    #[instrument(skip(self, caller, new), fields(project_id = %project_id), err)]
    pub async fn create(&self, caller: &Caller, project_id: ProjectId, new: NewTask) -> DomainResult<Task> {
        let project = self.load_project(project_id).await?;
        enforce(
            caller,
            Action::Create,
            &Target::Tasks {
                tenant_id: project.tenant_id,
            },
        )?;
        let new = new.validate()?;

        let task = Task::new(&project, new, Utc::now());
        let task = self.store.insert_task(task).await?;

        self.audit.record(caller.audit(AuditAction::CreateTask).entity(&task)).await;
        Ok(task)
    }

    /// Tasks of a project by priority rank, then due date (undated last).
    pub async fn list(&self, caller: &Caller, project_id: ProjectId, filter: TaskFilter) -> DomainResult<Vec<TaskView>> {
        let project = self.load_project(project_id).await?;
        enforce(
            caller,
            Action::List,
            &Target::Tasks {
                tenant_id: project.tenant_id,
            },
        )?;
        Ok(self.store.list_tasks(project_id, &filter).await?)
    }

    /// Status-only update; also open to the task's assignee.
    pub async fn update_status(&self, caller: &Caller, id: TaskId, status: TaskStatus) -> DomainResult<Task> {
        self.apply(caller, id, TaskPatch::status_only(status), AuditAction::UpdateTaskStatus)
            .await
    }

    pub async fn update(&self, caller: &Caller, id: TaskId, patch: TaskPatch) -> DomainResult<Task> {
        self.apply(caller, id, patch, AuditAction::UpdateTask).await
    }

    #[instrument(skip(self, caller, patch), fields(task_id = %id, action = action.as_str()), err)]
    async fn apply(&self, caller: &Caller, id: TaskId, patch: TaskPatch, action: AuditAction) -> DomainResult<Task> {
        let (mut task, target) = self.load(id).await?;
        enforce(caller, Action::Update(patch.fields()), &target)?;
        let patch = patch.validate()?;

        task.apply(patch, Utc::now());
        self.store.update_task(&task).await?;

        self.audit.record(caller.audit(action).entity(&task)).await;
        Ok(task)
    }
}
