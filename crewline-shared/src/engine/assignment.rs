//! Task assignment and completion
//!
//! Each operation couples task state with the assignee's availability in one
//! unit of work:
//!
//! ```text
//! assign:   task.assignee = user, task.status = in_progress, user → busy
//! complete: task.status = done, task.completed_at = now, assignee → available
//! ```
//!
//! Assigning a task that already has an assignee replaces the assignee. The
//! replaced user's availability is left as it was; the overwrite is logged.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::skills::SkillResolver;
use super::transaction::TransactionCoordinator;
use crate::collaborators::SkillExtractor;
use crate::error::{EngineError, EngineResult, EntityKind};
use crate::models::{Availability, CreateTask, Skill, Task, User};

/// Result of [`TaskAssignments::assign_task`]
#[derive(Debug, Clone, Serialize)]
pub struct Assignment {
    pub task: Task,
    pub assignee: User,

    /// Assignee the task had before, if it was a different user
    pub replaced_assignee: Option<Uuid>,
}

/// Result of [`TaskAssignments::complete_task`]
#[derive(Debug, Clone, Serialize)]
pub struct Completion {
    pub task: Task,

    /// The assignee, now available again
    pub released: Option<User>,
}

/// Result of [`TaskAssignments::create_task`]
#[derive(Debug, Clone, Serialize)]
pub struct CreatedTask {
    pub task: Task,
    pub required_skills: Vec<Skill>,
}

/// Assignment operations
#[derive(Clone)]
pub struct TaskAssignments {
    coordinator: TransactionCoordinator,
    extractor: Arc<dyn SkillExtractor>,
}

impl TaskAssignments {
    pub fn new(coordinator: TransactionCoordinator, extractor: Arc<dyn SkillExtractor>) -> Self {
        Self {
            coordinator,
            extractor,
        }
    }

    /// Assigns `task_id` to `user_id` and marks the user busy
    ///
    /// There is no precondition on the task's current state. Assigning a task
    /// that already has someone replaces them; the replaced user keeps
    /// whatever availability they had, and the replacement is logged.
    ///
    /// # Arguments
    ///
    /// * `task_id` - Task to assign; must not be archived
    /// * `user_id` - New assignee
    ///
    /// # Returns
    ///
    /// The updated task and user, plus the assignee that was replaced
    ///
    /// # Errors
    ///
    /// - `NotFound` when the task or the user is missing
    /// - `TaskArchived` when the task belongs to an archived project
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use crewline_shared::engine::Engine;
    /// # async fn example(engine: Engine, task_id: uuid::Uuid, user_id: uuid::Uuid)
    /// #     -> Result<(), crewline_shared::error::EngineError> {
    /// let assignment = engine.assignments().assign_task(task_id, user_id).await?;
    /// if let Some(previous) = assignment.replaced_assignee {
    ///     println!("took the task over from {previous}");
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn assign_task(&self, task_id: Uuid, user_id: Uuid) -> EngineResult<Assignment> {
        let assignment = self
            .coordinator
            .run("assign_task", move |tx| {
                Box::pin(async move {
                    let task = tx
                        .find_task(task_id)
                        .await?
                        .ok_or_else(|| EngineError::not_found(EntityKind::Task, task_id))?;
                    if task.archived {
                        return Err(EngineError::TaskArchived(task_id));
                    }
                    if tx.find_user(user_id).await?.is_none() {
                        return Err(EngineError::not_found(EntityKind::User, user_id));
                    }

                    let replaced_assignee = task.assignee_id.filter(|prev| *prev != user_id);
                    if let Some(previous) = replaced_assignee {
                        warn!(
                            %task_id,
                            %previous,
                            assignee = %user_id,
                            "Overwriting existing assignee; previous assignee availability unchanged"
                        );
                    }

                    let task = tx
                        .assign_task(task_id, user_id)
                        .await?
                        .ok_or_else(|| EngineError::not_found(EntityKind::Task, task_id))?;
                    let assignee = tx
                        .set_user_availability(user_id, Availability::Busy)
                        .await?
                        .ok_or_else(|| EngineError::not_found(EntityKind::User, user_id))?;

                    Ok(Assignment {
                        task,
                        assignee,
                        replaced_assignee,
                    })
                })
            })
            .await?;

        info!(%task_id, %user_id, "Task assigned");
        Ok(assignment)
    }

    /// Marks `task_id` done and frees its assignee
    ///
    /// Sets `completed_at` to now. The assignee stays recorded on the task
    /// and becomes available.
    ///
    /// # Errors
    ///
    /// - `NotFound` when the task is missing
    /// - `TaskArchived` when the task is archived
    pub async fn complete_task(&self, task_id: Uuid) -> EngineResult<Completion> {
        let completion = self
            .coordinator
            .run("complete_task", move |tx| {
                Box::pin(async move {
                    let task = tx
                        .find_task(task_id)
                        .await?
                        .ok_or_else(|| EngineError::not_found(EntityKind::Task, task_id))?;
                    if task.archived {
                        return Err(EngineError::TaskArchived(task_id));
                    }

                    let task = tx
                        .complete_task(task_id, Utc::now())
                        .await?
                        .ok_or_else(|| EngineError::not_found(EntityKind::Task, task_id))?;

                    let released = match task.assignee_id {
                        Some(assignee) => {
                            tx.set_user_availability(assignee, Availability::Available)
                                .await?
                        }
                        None => None,
                    };

                    Ok(Completion { task, released })
                })
            })
            .await?;

        info!(%task_id, "Task completed");
        Ok(completion)
    }

    /// Creates a task and links the skills its text mentions
    ///
    /// Extraction runs before the unit opens. If the extractor fails the task
    /// is created without required skills.
    ///
    /// # Arguments
    ///
    /// * `data` - Project, title, description and priority of the new task
    ///
    /// # Returns
    ///
    /// The open, unassigned task and the skills linked to it
    ///
    /// # Errors
    ///
    /// - `NotFound` when the project is missing
    /// - `ProjectArchived` when the project is archived
    pub async fn create_task(&self, data: CreateTask) -> EngineResult<CreatedTask> {
        let text = format!("{}\n{}", data.title, data.description);
        let skill_names = match self.extractor.extract(&text).await {
            Ok(extracted) => extracted.skills,
            Err(e) => {
                warn!(error = %e, "Skill extraction failed; creating task without skills");
                Vec::new()
            }
        };
        debug!(candidates = skill_names.len(), "Extracted task skills");

        let project_id = data.project_id;
        let created = self
            .coordinator
            .run("create_task", move |tx| {
                Box::pin(async move {
                    let project = tx
                        .find_project(project_id)
                        .await?
                        .ok_or_else(|| EngineError::not_found(EntityKind::Project, project_id))?;
                    if project.archived {
                        return Err(EngineError::ProjectArchived(project_id));
                    }

                    let task = tx.insert_task(data).await?;

                    let resolved = SkillResolver::resolve(tx, &skill_names).await?;
                    let mut required_skills: Vec<Skill> = Vec::new();
                    for skill in resolved.into_values() {
                        if !required_skills.iter().any(|s| s.id == skill.id) {
                            required_skills.push(skill);
                        }
                    }
                    required_skills.sort_by(|a, b| a.name.cmp(&b.name));

                    let ids: Vec<Uuid> = required_skills.iter().map(|s| s.id).collect();
                    if !ids.is_empty() {
                        tx.link_task_skills(task.id, &ids).await?;
                    }

                    Ok(CreatedTask {
                        task,
                        required_skills,
                    })
                })
            })
            .await?;

        info!(
            task_id = %created.task.id,
            %project_id,
            skills = created.required_skills.len(),
            "Task created"
        );
        Ok(created)
    }
}
