//! `tenantdesk-projects`: projects and the tasks inside them.

pub mod project;
pub mod task;

pub use project::{NewProject, Project, ProjectFilter, ProjectPatch, ProjectStatus, ProjectSummary};
pub use task::{
    NewTask, Task, TaskFilter, TaskPatch, TaskPriority, TaskStatus, TaskView, priority_order,
};
