//! Transactional store port
//!
//! The engine never talks to a database directly. It asks a [`Store`] for a
//! transaction ([`StoreTx`]), issues reads and writes through it, and either
//! commits or rolls back. Two adapters ship with the crate:
//!
//! - [`postgres::PgStore`]: PostgreSQL via sqlx, one database transaction per
//!   unit of work
//! - [`memory::InMemoryStore`]: whole-unit serialized snapshot store used by
//!   tests and embedders
//!
//! Dropping a transaction without committing discards its writes.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    AliasMatch, Availability, CreateInvitation, CreateProject, CreateTask, CreateTeam, CreateUser,
    Invitation, Proficiency, Project, Role, Skill, Task, Team, User, UserSkill,
};

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Names of the constraints the engine reacts to
///
/// Shared by the SQL migrations and the in-memory store so both report the
/// same name for the same violation.
pub mod constraints {
    pub const USERS_EMAIL: &str = "users_email_key";
    pub const USERS_TEAM_FK: &str = "users_team_id_fkey";
    pub const TEAMS_NAME: &str = "teams_name_key";
    pub const TEAMS_MANAGER: &str = "teams_manager_id_key";
    pub const TEAMS_MANAGER_FK: &str = "teams_manager_id_fkey";
    pub const PROJECTS_TEAM_FK: &str = "projects_team_id_fkey";
    pub const TASKS_PROJECT_FK: &str = "tasks_project_id_fkey";
    pub const TASKS_ASSIGNEE_FK: &str = "tasks_assignee_id_fkey";
    pub const SKILLS_NAME: &str = "skills_name_key";
    pub const SKILL_ALIASES_ALIAS: &str = "skill_aliases_alias_key";
    pub const SKILL_ALIASES_SKILL_FK: &str = "skill_aliases_skill_id_fkey";
    pub const USER_SKILLS_USER_FK: &str = "user_skills_user_id_fkey";
    pub const USER_SKILLS_SKILL_FK: &str = "user_skills_skill_id_fkey";
    pub const TASK_SKILLS_SKILL_FK: &str = "task_required_skills_skill_id_fkey";
    pub const INVITATIONS_PENDING_EMAIL: &str = "invitations_pending_email_key";
    pub const INVITATIONS_TOKEN_HASH: &str = "invitations_token_hash_key";
    pub const INVITATIONS_INVITER_FK: &str = "invitations_inviter_id_fkey";
    pub const INVITATIONS_TEAM_FK: &str = "invitations_team_id_fkey";
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by store implementations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// A foreign key constraint rejected the write
    #[error("foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),

    /// The store could not be reached or refused to work
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Any other database failure
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl StoreError {
    /// Returns the violated constraint name, if this is a constraint error
    pub fn constraint(&self) -> Option<&str> {
        match self {
            StoreError::UniqueViolation(name) | StoreError::ForeignKeyViolation(name) => {
                Some(name.as_str())
            }
            _ => None,
        }
    }

    /// True if this is a unique violation on `constraint`
    pub fn is_unique_violation_of(&self, constraint: &str) -> bool {
        matches!(self, StoreError::UniqueViolation(name) if name == constraint)
    }
}

/// Classifies sqlx errors so callers can match on constraint names
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                match db_err.kind() {
                    sqlx::error::ErrorKind::UniqueViolation => StoreError::UniqueViolation(constraint),
                    sqlx::error::ErrorKind::ForeignKeyViolation => {
                        StoreError::ForeignKeyViolation(constraint)
                    }
                    _ => StoreError::Database(sqlx::Error::Database(db_err)),
                }
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                StoreError::Unavailable(err.to_string())
            }
            other => StoreError::Database(other),
        }
    }
}

/// Source of transactions
#[async_trait]
pub trait Store: Send + Sync {
    /// Opens a new transaction
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;
}

/// One open transaction
///
/// Reads observe the transaction's own uncommitted writes. Nothing is visible
/// to other transactions until [`StoreTx::commit`].
#[async_trait]
pub trait StoreTx: Send {
    // Users

    async fn insert_user(&mut self, data: CreateUser) -> StoreResult<User>;

    async fn find_user(&mut self, id: Uuid) -> StoreResult<Option<User>>;

    async fn set_user_availability(
        &mut self,
        id: Uuid,
        availability: Availability,
    ) -> StoreResult<Option<User>>;

    async fn update_user_role(
        &mut self,
        id: Uuid,
        role: Role,
        team_id: Option<Uuid>,
    ) -> StoreResult<Option<User>>;

    /// Deletes a user, applying the schema's referential actions: skill links
    /// and sent invitations are removed, task assignments and team manager
    /// slots pointing at the user are cleared.
    async fn delete_user(&mut self, id: Uuid) -> StoreResult<bool>;

    // Teams

    async fn insert_team(&mut self, data: CreateTeam) -> StoreResult<Team>;

    async fn find_team(&mut self, id: Uuid) -> StoreResult<Option<Team>>;

    async fn find_team_managed_by(&mut self, user_id: Uuid) -> StoreResult<Option<Team>>;

    async fn set_team_manager(
        &mut self,
        team_id: Uuid,
        manager_id: Option<Uuid>,
    ) -> StoreResult<Option<Team>>;

    // Projects

    async fn insert_project(&mut self, data: CreateProject) -> StoreResult<Project>;

    async fn find_project(&mut self, id: Uuid) -> StoreResult<Option<Project>>;

    /// Archives an active project; None if missing or already archived
    async fn archive_project(
        &mut self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Project>>;

    // Tasks

    async fn insert_task(&mut self, data: CreateTask) -> StoreResult<Task>;

    async fn find_task(&mut self, id: Uuid) -> StoreResult<Option<Task>>;

    /// Sets assignee and `in_progress`, overwriting any previous assignee
    async fn assign_task(&mut self, id: Uuid, assignee_id: Uuid) -> StoreResult<Option<Task>>;

    async fn complete_task(&mut self, id: Uuid, at: DateTime<Utc>) -> StoreResult<Option<Task>>;

    /// Tasks whose assignee is `user_id`, archived ones included
    async fn tasks_assigned_to(&mut self, user_id: Uuid) -> StoreResult<Vec<Task>>;

    /// Clears `user_id` from every task it holds and resets them to open
    async fn release_tasks_assigned_to(&mut self, user_id: Uuid) -> StoreResult<Vec<Task>>;

    async fn active_tasks_in_project(&mut self, project_id: Uuid) -> StoreResult<Vec<Task>>;

    async fn archive_tasks_in_project(
        &mut self,
        project_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<u64>;

    async fn link_task_skills(&mut self, task_id: Uuid, skill_ids: &[Uuid]) -> StoreResult<()>;

    async fn task_skill_ids(&mut self, task_id: Uuid) -> StoreResult<Vec<Uuid>>;

    // Skills

    /// Case-insensitive name lookup
    async fn find_skills_by_names(&mut self, names: &[String]) -> StoreResult<Vec<Skill>>;

    /// Case-insensitive alias lookup
    async fn find_skills_by_aliases(&mut self, names: &[String]) -> StoreResult<Vec<AliasMatch>>;

    /// Inserts unverified skills, skipping existing names; returns inserted rows
    async fn insert_unverified_skills(&mut self, names: &[String]) -> StoreResult<Vec<Skill>>;

    async fn upsert_verified_skill(&mut self, name: &str) -> StoreResult<Skill>;

    async fn add_skill_alias(&mut self, alias: &str, skill_id: Uuid) -> StoreResult<()>;

    async fn upsert_user_skills(
        &mut self,
        user_id: Uuid,
        links: &[(Uuid, Proficiency)],
    ) -> StoreResult<()>;

    async fn user_skills(&mut self, user_id: Uuid) -> StoreResult<Vec<UserSkill>>;

    async fn count_user_skills(&mut self, user_id: Uuid) -> StoreResult<i64>;

    // Invitations

    async fn insert_invitation(&mut self, data: CreateInvitation) -> StoreResult<Invitation>;

    async fn find_invitation(&mut self, id: Uuid) -> StoreResult<Option<Invitation>>;

    async fn find_pending_invitation_by_email(
        &mut self,
        email: &str,
    ) -> StoreResult<Option<Invitation>>;

    /// Pending, unexpired invitation with this token hash
    async fn find_acceptable_invitation(
        &mut self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Invitation>>;

    async fn mark_invitation_accepted(
        &mut self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Invitation>>;

    /// Expires overdue pending invitations, optionally for one email only
    async fn expire_stale_invitations(
        &mut self,
        now: DateTime<Utc>,
        email: Option<&str>,
    ) -> StoreResult<u64>;

    async fn count_invitations_sent_by(&mut self, inviter_id: Uuid) -> StoreResult<i64>;

    // Finalization

    /// Makes every write of this transaction visible at once
    async fn commit(self: Box<Self>) -> StoreResult<()>;

    /// Discards every write of this transaction
    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_accessor() {
        let err = StoreError::UniqueViolation(constraints::USERS_EMAIL.to_string());
        assert_eq!(err.constraint(), Some("users_email_key"));
        assert!(err.is_unique_violation_of(constraints::USERS_EMAIL));
        assert!(!err.is_unique_violation_of(constraints::TEAMS_NAME));

        let err = StoreError::Unavailable("down".to_string());
        assert_eq!(err.constraint(), None);
    }

    #[test]
    fn test_row_not_found_is_database_error() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(sqlx::Error::RowNotFound)));
    }
}
