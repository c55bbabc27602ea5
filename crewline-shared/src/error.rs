//! Engine error taxonomy
//!
//! Every operation returns [`EngineResult`]. Errors fall into three classes
//! (see [`ErrorClass`]): business-rule rejections a client can act on,
//! missing entities, and infrastructure failures that are opaque to clients.

use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::engine::lifecycle::RoleChangeRejection;
use crate::models::Role;
use crate::store::StoreError;

/// Entity kinds reported by [`EngineError::NotFound`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Team,
    Project,
    Task,
    Skill,
    Invitation,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::User => "user",
            EntityKind::Team => "team",
            EntityKind::Project => "project",
            EntityKind::Task => "task",
            EntityKind::Skill => "skill",
            EntityKind::Invitation => "invitation",
        };
        f.write_str(name)
    }
}

/// Broad error category, for mapping onto client-facing outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    BusinessRule,
    NotFound,
    Infrastructure,
}

/// Engine error types
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Caller's role may not perform the operation
    #[error("Permission denied for role {role}")]
    PermissionDenied { role: Role },

    /// Inviter asked for a role other than the one directly below theirs
    #[error("Role {inviter} may not invite role {requested}")]
    InvalidRoleSequence { inviter: Role, requested: Role },

    /// Manager invitation without a team
    #[error("A team is required when inviting a manager")]
    TeamRequired,

    /// Manager tried to invite but does not run a team
    #[error("Manager must belong to a team to invite engineers")]
    ManagerWithoutTeam,

    #[error("Team not found: {0}")]
    TeamNotFound(Uuid),

    /// Team manager slot already taken
    #[error("Team {0} already has a manager")]
    TeamHasManager(Uuid),

    /// A pending invitation exists for the email
    #[error("A pending invitation already exists for {0}")]
    DuplicateInvitation(String),

    /// Token unknown, expired or already consumed
    #[error("Invitation is not pending or does not exist")]
    InvitationNotPending,

    /// Email belongs to an existing user
    #[error("Email already in use: {0}")]
    EmailTaken(String),

    /// Alias collides with an existing skill name or alias
    #[error("Skill name already taken: {0}")]
    SkillNameTaken(String),

    #[error("Project {0} is already archived")]
    ProjectAlreadyArchived(Uuid),

    /// Project is archived and no longer accepts work
    #[error("Project {0} is archived")]
    ProjectArchived(Uuid),

    /// Task was archived with its project
    #[error("Task {0} is archived")]
    TaskArchived(Uuid),

    #[error("Admin user {0} cannot be deleted")]
    AdminNotDeletable(Uuid),

    #[error("Role change rejected: {0}")]
    RoleChangeRejected(RoleChangeRejection),

    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: Uuid },

    /// Unit of work exceeded the configured deadline and was rolled back
    #[error("Operation {operation} timed out")]
    Timeout { operation: &'static str },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Engine result type alias
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    pub fn not_found(entity: EntityKind, id: Uuid) -> Self {
        EngineError::NotFound { entity, id }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            EngineError::NotFound { .. } | EngineError::TeamNotFound(_) => ErrorClass::NotFound,
            EngineError::Timeout { .. } | EngineError::Store(_) => ErrorClass::Infrastructure,
            _ => ErrorClass::BusinessRule,
        }
    }

    /// Short machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::PermissionDenied { .. } => "permission_denied",
            EngineError::InvalidRoleSequence { .. } => "invalid_role_sequence",
            EngineError::TeamRequired => "team_required",
            EngineError::ManagerWithoutTeam => "manager_without_team",
            EngineError::TeamNotFound(_) => "team_not_found",
            EngineError::TeamHasManager(_) => "team_has_manager",
            EngineError::DuplicateInvitation(_) => "duplicate_invitation",
            EngineError::InvitationNotPending => "invitation_not_pending",
            EngineError::EmailTaken(_) => "email_taken",
            EngineError::SkillNameTaken(_) => "skill_name_taken",
            EngineError::ProjectAlreadyArchived(_) => "project_already_archived",
            EngineError::ProjectArchived(_) => "project_archived",
            EngineError::TaskArchived(_) => "task_archived",
            EngineError::AdminNotDeletable(_) => "admin_not_deletable",
            EngineError::RoleChangeRejected(_) => "role_change_rejected",
            EngineError::NotFound { .. } => "not_found",
            EngineError::Timeout { .. } => "timeout",
            EngineError::Store(_) => "internal",
        }
    }
}
