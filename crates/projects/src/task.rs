use core::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use tenantdesk_auth::{Field, FieldMask};
use tenantdesk_core::{DomainError, DomainResult, Entity, Patch, ProjectId, TaskId, TenantId, UserId, validate};

use crate::Project;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s {
            "todo" => Ok(TaskStatus::Todo),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(DomainError::validation(format!("unknown task status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s {
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            other => Err(DomainError::validation(format!("unknown task priority '{other}'"))),
        }
    }

    /// Listing rank: high=1, medium=2, low=3.
    pub fn rank(&self) -> u8 {
        match self {
            TaskPriority::High => 1,
            TaskPriority::Medium => 2,
            TaskPriority::Low => 3,
        }
    }
}

/// Task record.
///
/// `tenant_id` is copied from the parent project at creation and always
/// equals it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub tenant_id: TenantId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assigned_to: Option<UserId>,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(project: &Project, new: NewTask, now: DateTime<Utc>) -> Self {
        Self {
            id: TaskId::new(),
            project_id: project.id,
            tenant_id: project.tenant_id,
            title: new.title,
            description: new.description,
            status: new.status.unwrap_or(TaskStatus::Todo),
            priority: new.priority.unwrap_or(TaskPriority::Medium),
            assigned_to: new.assigned_to,
            due_date: new.due_date,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: TaskPatch, now: DateTime<Utc>) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        patch.description.apply_to(&mut self.description);
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        patch.assigned_to.apply_to(&mut self.assigned_to);
        patch.due_date.apply_to(&mut self.due_date);
        self.updated_at = now;
    }
}

impl Entity for Task {
    type Id = TaskId;
    const ENTITY_TYPE: &'static str = "task";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Listing order: priority rank, then due date ascending with undated
/// tasks last, then creation time.
pub fn priority_order(a: &Task, b: &Task) -> Ordering {
    a.priority
        .rank()
        .cmp(&b.priority.rank())
        .then_with(|| match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.created_at.cmp(&b.created_at))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub assigned_to: Option<UserId>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

impl NewTask {
    pub fn validate(self) -> DomainResult<Self> {
        Ok(Self {
            title: validate::required_text("title", &self.title)?,
            ..self
        })
    }
}

/// Partial task update. Nullable fields distinguish keep / clear / set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    pub title: Option<String>,
    #[serde(default)]
    pub description: Patch<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub assigned_to: Patch<UserId>,
    #[serde(default)]
    pub due_date: Patch<NaiveDate>,
}

impl TaskPatch {
    pub fn status_only(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn fields(&self) -> FieldMask {
        let mut mask = FieldMask::EMPTY;
        if self.title.is_some() {
            mask.insert(Field::Title);
        }
        if self.description.is_present() {
            mask.insert(Field::Description);
        }
        if self.status.is_some() {
            mask.insert(Field::Status);
        }
        if self.priority.is_some() {
            mask.insert(Field::Priority);
        }
        if self.assigned_to.is_present() {
            mask.insert(Field::AssignedTo);
        }
        if self.due_date.is_present() {
            mask.insert(Field::DueDate);
        }
        mask
    }

    pub fn validate(mut self) -> DomainResult<Self> {
        if let Some(title) = &self.title {
            self.title = Some(validate::required_text("title", title)?);
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub assigned_to: Option<UserId>,
    pub priority: Option<TaskPriority>,
    /// Case-insensitive substring of title or description.
    pub search: Option<String>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        if self.status.is_some_and(|s| s != task.status) {
            return false;
        }
        if self.priority.is_some_and(|p| p != task.priority) {
            return false;
        }
        if self.assigned_to.is_some() && self.assigned_to != task.assigned_to {
            return false;
        }
        match &self.search {
            Some(q) => {
                let q = q.to_lowercase();
                task.title.to_lowercase().contains(&q)
                    || task
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&q))
            }
            None => true,
        }
    }
}

/// Listing row: the task with its assignee's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub assignee_name: Option<String>,
}
