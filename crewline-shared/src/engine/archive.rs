//! Project archiving
//!
//! Archiving is terminal. In one unit: people holding in-progress tasks in
//! the project become available, every active task is archived, then the
//! project itself. Archived tasks keep their assignee for history.

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::transaction::TransactionCoordinator;
use crate::error::{EngineError, EngineResult, EntityKind};
use crate::models::{Availability, Project};

/// Result of [`ProjectArchiver::archive_project`]
#[derive(Debug, Clone, Serialize)]
pub struct ArchivedProject {
    pub project: Project,
    pub archived_tasks_count: u64,

    /// Users set back to available
    pub released_users: Vec<Uuid>,
}

/// Archives projects together with their tasks
#[derive(Debug, Clone)]
pub struct ProjectArchiver {
    coordinator: TransactionCoordinator,
}

impl ProjectArchiver {
    pub fn new(coordinator: TransactionCoordinator) -> Self {
        Self { coordinator }
    }

    /// Archives `project_id`, which must belong to `team_id`
    ///
    /// # Arguments
    ///
    /// * `project_id` - Project to archive
    /// * `team_id` - Team the caller acts for; a project of another team is
    ///   reported as missing
    ///
    /// # Returns
    ///
    /// The archived project, the number of tasks archived with it and the
    /// users made available
    ///
    /// # Errors
    ///
    /// - `NotFound` when the project is missing or owned by another team
    /// - `ProjectAlreadyArchived` on a second call
    pub async fn archive_project(
        &self,
        project_id: Uuid,
        team_id: Uuid,
    ) -> EngineResult<ArchivedProject> {
        let archived = self
            .coordinator
            .run("archive_project", move |tx| {
                Box::pin(async move {
                    let project = tx
                        .find_project(project_id)
                        .await?
                        .filter(|p| p.team_id == team_id)
                        .ok_or_else(|| EngineError::not_found(EntityKind::Project, project_id))?;
                    if project.archived {
                        return Err(EngineError::ProjectAlreadyArchived(project_id));
                    }

                    let active = tx.active_tasks_in_project(project_id).await?;

                    let mut released_users: Vec<Uuid> = Vec::new();
                    for task in active.iter().filter(|t| t.holds_assignee()) {
                        let Some(assignee) = task.assignee_id else {
                            continue;
                        };
                        if released_users.contains(&assignee) {
                            continue;
                        }
                        tx.set_user_availability(assignee, Availability::Available)
                            .await?;
                        released_users.push(assignee);
                    }
                    debug!(%project_id, released = released_users.len(), "Released assignees");

                    let now = Utc::now();
                    let archived_tasks_count = tx.archive_tasks_in_project(project_id, now).await?;

                    let project = tx
                        .archive_project(project_id, now)
                        .await?
                        .ok_or(EngineError::ProjectAlreadyArchived(project_id))?;

                    Ok(ArchivedProject {
                        project,
                        archived_tasks_count,
                        released_users,
                    })
                })
            })
            .await?;

        info!(
            %project_id,
            archived_tasks = archived.archived_tasks_count,
            "Project archived"
        );
        Ok(archived)
    }
}
