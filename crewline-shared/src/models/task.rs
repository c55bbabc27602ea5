//! Task model and database operations
//!
//! Tasks are the unit of work inside a project. Assignment couples a task to
//! a user and flips that user's availability; the coupling itself lives in the
//! engine, this module only knows how to read and write rows.
//!
//! # State Machine
//!
//! ```text
//! open → in_progress → done
//! in_progress → open        (assignee removed)
//! any active  → archived    (project archived)
//! ```
//!
//! # Schema
//!
//! ```sql
//! CREATE TYPE task_status AS ENUM ('open', 'in_progress', 'done');
//! CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high', 'urgent');
//!
//! CREATE TABLE tasks (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
//!     title VARCHAR(255) NOT NULL,
//!     description TEXT NOT NULL DEFAULT '',
//!     status task_status NOT NULL DEFAULT 'open',
//!     priority task_priority NOT NULL DEFAULT 'medium',
//!     assignee_id UUID REFERENCES users(id) ON DELETE SET NULL,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     completed_at TIMESTAMPTZ,
//!     archived BOOLEAN NOT NULL DEFAULT FALSE,
//!     archived_at TIMESTAMPTZ
//! );
//!
//! CREATE TABLE task_required_skills (
//!     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
//!     skill_id UUID NOT NULL REFERENCES skills(id) ON DELETE CASCADE,
//!     PRIMARY KEY (task_id, skill_id)
//! );
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;

const TASK_COLUMNS: &str = "id, project_id, title, description, status, priority, assignee_id, \
                            created_at, completed_at, archived, archived_at";

/// Task workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started, nobody working on it
    Open,

    /// Someone is working on it
    InProgress,

    /// Finished
    Done,
}

impl TaskStatus {
    /// Converts status to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Open => "open",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }
}

/// Task priority
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

/// Task model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Owning project
    pub project_id: Uuid,

    /// Short title
    pub title: String,

    /// Free-text description (fed to skill extraction)
    pub description: String,

    /// Workflow status
    pub status: TaskStatus,

    /// Priority
    pub priority: TaskPriority,

    /// Assigned user (None when unassigned)
    pub assignee_id: Option<Uuid>,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was completed (None until done)
    pub completed_at: Option<DateTime<Utc>>,

    /// Whether the task was archived with its project
    pub archived: bool,

    /// When the task was archived
    pub archived_at: Option<DateTime<Utc>>,
}

/// Input for creating a new task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    pub project_id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub priority: TaskPriority,
}

impl Task {
    /// True while the task holds its assignee busy
    pub fn holds_assignee(&self) -> bool {
        !self.archived && self.status == TaskStatus::InProgress && self.assignee_id.is_some()
    }

    /// Creates a new open, unassigned task
    pub async fn create(conn: &mut PgConnection, data: CreateTask) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (project_id, title, description, priority)
            VALUES ($1, $2, $3, $4)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(data.project_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.priority)
        .fetch_one(conn)
        .await?;

        Ok(task)
    }

    /// Finds a task by ID
    pub async fn find_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(task)
    }

    /// Sets the assignee and moves the task to `in_progress`
    ///
    /// Overwrites any previous assignee.
    pub async fn assign(
        conn: &mut PgConnection,
        id: Uuid,
        assignee_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET assignee_id = $2, status = 'in_progress'
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(assignee_id)
        .fetch_optional(conn)
        .await?;

        Ok(task)
    }

    /// Marks the task done
    pub async fn complete(
        conn: &mut PgConnection,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET status = 'done', completed_at = $2
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(at)
        .fetch_optional(conn)
        .await?;

        Ok(task)
    }

    /// Lists every task assigned to a user, archived ones included
    pub async fn list_assigned_to(
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE assignee_id = $1
            ORDER BY created_at ASC
            "#
        ))
        .bind(user_id)
        .fetch_all(conn)
        .await?;

        Ok(tasks)
    }

    /// Clears the assignee on every task held by a user and reopens it
    ///
    /// Archived tasks are released too but keep their archived flag, so they
    /// stay out of active work.
    ///
    /// # Arguments
    ///
    /// * `conn` - Connection inside the deleting transaction
    /// * `user_id` - User being removed
    ///
    /// # Returns
    ///
    /// The tasks as they look after the update
    pub async fn release_assigned_to(
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET assignee_id = NULL,
                status = 'open',
                completed_at = NULL
            WHERE assignee_id = $1
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(user_id)
        .fetch_all(conn)
        .await?;

        Ok(tasks)
    }

    /// Lists active tasks of a project
    pub async fn list_active_in_project(
        conn: &mut PgConnection,
        project_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE project_id = $1 AND archived = FALSE
            ORDER BY created_at ASC
            "#
        ))
        .bind(project_id)
        .fetch_all(conn)
        .await?;

        Ok(tasks)
    }

    /// Archives every active task of a project
    ///
    /// # Returns
    ///
    /// Number of tasks archived
    pub async fn archive_in_project(
        conn: &mut PgConnection,
        project_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET archived = TRUE, archived_at = $2
            WHERE project_id = $1 AND archived = FALSE
            "#,
        )
        .bind(project_id)
        .bind(at)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Links required skills to a task, ignoring links that already exist
    pub async fn link_required_skills(
        conn: &mut PgConnection,
        task_id: Uuid,
        skill_ids: &[Uuid],
    ) -> Result<(), sqlx::Error> {
        if skill_ids.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO task_required_skills (task_id, skill_id)
            SELECT $1, UNNEST($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(task_id)
        .bind(skill_ids)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Returns the IDs of the skills a task requires
    pub async fn required_skill_ids(
        conn: &mut PgConnection,
        task_id: Uuid,
    ) -> Result<Vec<Uuid>, sqlx::Error> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT skill_id FROM task_required_skills WHERE task_id = $1",
        )
        .bind(task_id)
        .fetch_all(conn)
        .await?;

        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(status: TaskStatus, assignee: Option<Uuid>, archived: bool) -> Task {
        Task {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            title: "Write migration".to_string(),
            description: String::new(),
            status,
            priority: TaskPriority::default(),
            assignee_id: assignee,
            created_at: Utc::now(),
            completed_at: None,
            archived,
            archived_at: None,
        }
    }

    #[test]
    fn test_task_status_as_str() {
        assert_eq!(TaskStatus::Open.as_str(), "open");
        assert_eq!(TaskStatus::InProgress.as_str(), "in_progress");
        assert_eq!(TaskStatus::Done.as_str(), "done");
    }

    #[test]
    fn test_status_serde_is_snake_case() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn test_priority_default_and_order() {
        assert_eq!(TaskPriority::default(), TaskPriority::Medium);
        assert!(TaskPriority::Urgent > TaskPriority::Low);
    }

    #[test]
    fn test_holds_assignee() {
        let user = Some(Uuid::new_v4());
        assert!(task(TaskStatus::InProgress, user, false).holds_assignee());
        assert!(!task(TaskStatus::Done, user, false).holds_assignee());
        assert!(!task(TaskStatus::InProgress, None, false).holds_assignee());
        assert!(!task(TaskStatus::InProgress, user, true).holds_assignee());
    }
}
