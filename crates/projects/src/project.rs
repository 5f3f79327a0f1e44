use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tenantdesk_auth::{Field, FieldMask};
use tenantdesk_core::{DomainError, DomainResult, Entity, Patch, ProjectId, TenantId, UserId, validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Active,
    Completed,
    Archived,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s {
            "active" => Ok(ProjectStatus::Active),
            "completed" => Ok(ProjectStatus::Completed),
            "archived" => Ok(ProjectStatus::Archived),
            other => Err(DomainError::validation(format!("unknown project status '{other}'"))),
        }
    }
}

/// Project record. `tenant_id` and `created_by` are fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub tenant_id: TenantId,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(tenant_id: TenantId, created_by: UserId, new: NewProject, now: DateTime<Utc>) -> Self {
        Self {
            id: ProjectId::new(),
            tenant_id,
            name: new.name,
            description: new.description,
            status: new.status.unwrap_or(ProjectStatus::Active),
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: ProjectPatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        patch.description.apply_to(&mut self.description);
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.updated_at = now;
    }
}

impl Entity for Project {
    type Id = ProjectId;
    const ENTITY_TYPE: &'static str = "project";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<ProjectStatus>,
}

impl NewProject {
    pub fn validate(self) -> DomainResult<Self> {
        Ok(Self {
            name: validate::required_text("name", &self.name)?,
            ..self
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    pub name: Option<String>,
    #[serde(default)]
    pub description: Patch<String>,
    pub status: Option<ProjectStatus>,
}

impl ProjectPatch {
    pub fn fields(&self) -> FieldMask {
        let mut mask = FieldMask::EMPTY;
        if self.name.is_some() {
            mask.insert(Field::Name);
        }
        if self.description.is_present() {
            mask.insert(Field::Description);
        }
        if self.status.is_some() {
            mask.insert(Field::Status);
        }
        mask
    }

    pub fn validate(mut self) -> DomainResult<Self> {
        if let Some(name) = &self.name {
            self.name = Some(validate::required_text("name", name)?);
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProjectFilter {
    pub status: Option<ProjectStatus>,
    /// Case-insensitive substring of name or description.
    pub search: Option<String>,
}

impl ProjectFilter {
    pub fn matches(&self, project: &Project) -> bool {
        if self.status.is_some_and(|s| s != project.status) {
            return false;
        }
        match &self.search {
            Some(q) => {
                let q = q.to_lowercase();
                project.name.to_lowercase().contains(&q)
                    || project
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&q))
            }
            None => true,
        }
    }
}

/// Listing row: the project with its creator's name and task counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    #[serde(flatten)]
    pub project: Project,
    pub creator_name: Option<String>,
    pub task_count: i64,
    pub completed_task_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> Project {
        let new = NewProject {
            name: " Website ".into(),
            description: Some("Relaunch".into()),
            status: None,
        }
        .validate()
        .unwrap();
        Project::new(TenantId::new(), UserId::new(), new, Utc::now())
    }

    #[test]
    fn new_project_defaults_to_active() {
        let p = project();
        assert_eq!(p.status, ProjectStatus::Active);
        assert_eq!(p.name, "Website");
    }

    #[test]
    fn patch_can_clear_description_but_keeps_tenant() {
        let mut p = project();
        let tenant = p.tenant_id;
        let patch: ProjectPatch = serde_json::from_str(r#"{"description":null}"#).unwrap();
        assert_eq!(patch.fields(), FieldMask::of(&[Field::Description]));
        p.apply(patch, Utc::now());
        assert_eq!(p.description, None);
        assert_eq!(p.tenant_id, tenant);
    }

    #[test]
    fn filter_searches_name_and_description() {
        let p = project();
        let f = ProjectFilter { search: Some("relaunch".into()), ..Default::default() };
        assert!(f.matches(&p));
        let f = ProjectFilter { status: Some(ProjectStatus::Archived), ..Default::default() };
        assert!(!f.matches(&p));
    }
}
