//! Project resource service.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use tenantdesk_auth::{Action, Target};
use tenantdesk_core::{DomainError, DomainResult, Page, PageRequest, ProjectId};
use tenantdesk_projects::{NewProject, Project, ProjectFilter, ProjectPatch, ProjectSummary};

use super::{Caller, enforce};
use crate::audit::{AuditAction, AuditLog};
use crate::store::Store;

#[derive(Clone)]
pub struct ProjectService {
    store: Arc<dyn Store>,
    audit: AuditLog,
}

fn project_target(project: &Project) -> Target {
    Target::Project {
        tenant_id: project.tenant_id,
        created_by: project.created_by,
    }
}

impl ProjectService {
    pub fn new(store: Arc<dyn Store>, audit: AuditLog) -> Self {
        Self { store, audit }
    }

    async fn load(&self, id: ProjectId) -> DomainResult<Project> {
        self.store
            .get_project(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Project"))
    }

    /// Create a project in the caller's tenant, within the plan's quota.
    #[instrument(skip(self, caller, new), fields(user_id = %caller.claims.user_id), err)]
    pub async fn create(&self, caller: &Caller, new: NewProject) -> DomainResult<Project> {
        enforce(caller, Action::Create, &Target::Projects)?;
        let tenant_id = caller
            .claims
            .tenant_id
            .ok_or_else(|| DomainError::forbidden("caller has no tenant"))?;
        let new = new.validate()?;

        let project = Project::new(tenant_id, caller.claims.user_id, new, Utc::now());
        let project = self.store.insert_project_within_quota(project).await?;

        self.audit.record(caller.audit(AuditAction::CreateProject).entity(&project)).await;
        tracing::info!(project_id = %project.id, tenant_id = %tenant_id, "project created");
        Ok(project)
    }

    /// Projects of the caller's tenant, newest first.
    pub async fn list(&self, caller: &Caller, filter: ProjectFilter, page: PageRequest) -> DomainResult<Page<ProjectSummary>> {
        enforce(caller, Action::List, &Target::Projects)?;
        let tenant_id = caller
            .claims
            .tenant_id
            .ok_or_else(|| DomainError::forbidden("caller has no tenant"))?;
        Ok(self.store.list_projects(tenant_id, &filter, page).await?)
    }

    pub async fn get(&self, caller: &Caller, id: ProjectId) -> DomainResult<Project> {
        let project = self.load(id).await?;
        enforce(caller, Action::Read, &project_target(&project))?;
        Ok(project)
    }

    #[instrument(skip(self, caller, patch), fields(project_id = %id), err)]
    pub async fn update(&self, caller: &Caller, id: ProjectId, patch: ProjectPatch) -> DomainResult<Project> {
        let mut project = self.load(id).await?;
        enforce(caller, Action::Update(patch.fields()), &project_target(&project))?;
        let patch = patch.validate()?;

        project.apply(patch, Utc::now());
        self.store.update_project(&project).await?;

        self.audit.record(caller.audit(AuditAction::UpdateProject).entity(&project)).await;
        Ok(project)
    }

    /// Delete a project and every task in it.
    #[instrument(skip(self, caller), fields(project_id = %id), err)]
    pub async fn delete(&self, caller: &Caller, id: ProjectId) -> DomainResult<()> {
        let project = self.load(id).await?;
        enforce(caller, Action::Delete, &project_target(&project))?;
        self.store.delete_project(id).await?;

        self.audit.record(caller.audit(AuditAction::DeleteProject).entity(&project)).await;
        tracing::info!(project_id = %id, "project deleted");
        Ok(())
    }
}
