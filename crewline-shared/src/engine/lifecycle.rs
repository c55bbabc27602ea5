//! User lifecycle: onboarding, role changes, safe deletion
//!
//! Role-change validation and deletion impact are read-only and run in units
//! that are always rolled back. Their mutating counterparts recompute the
//! same analysis inside the writing unit, so what they do matches what the
//! analysis would have reported at that moment.

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::invitation::{email_taken_or, Onboarded};
use super::skills::{SkillInput, SkillResolver};
use super::transaction::TransactionCoordinator;
use crate::error::{EngineError, EngineResult, EntityKind};
use crate::models::{CreateUser, Role, Task, Team, User};
use crate::store::{constraints, StoreTx};

/// Why a role change is not allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum RoleChangeRejection {
    #[error("user already has this role")]
    SameRole,

    #[error("admin role cannot be changed")]
    AdminImmutable,

    #[error("nobody can be promoted to admin")]
    AdminPromotionForbidden,

    #[error("promotion to manager requires a team")]
    TeamRequired,

    #[error("team does not exist")]
    TeamNotFound,

    #[error("team already has a manager")]
    TeamHasManager,
}

/// Outcome of a role-change check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleChangeValidation {
    pub user_id: Uuid,
    pub current_role: Role,
    pub requested_role: Role,

    /// None when the change is allowed
    pub rejection: Option<RoleChangeRejection>,

    /// Team the user would take over (promotion to manager)
    pub team_to_manage: Option<Uuid>,

    /// Team the user currently manages and would leave (demotion)
    pub team_to_vacate: Option<Uuid>,
}

impl RoleChangeValidation {
    pub fn is_valid(&self) -> bool {
        self.rejection.is_none()
    }
}

/// What deleting a user does (or did)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeletionImpact {
    pub user: User,

    /// Tasks that lose their assignee and return to open, archived ones included
    pub tasks_to_unassign: Vec<Task>,

    /// Team whose manager slot is cleared
    pub team_losing_manager: Option<Team>,

    /// Skill ratings removed with the user
    pub skill_associations: i64,

    /// Invitations the user issued, removed with the user
    pub sent_invitations: i64,

    pub can_delete: bool,
    pub reason: Option<String>,
}

/// Applied role change
#[derive(Debug, Clone, Serialize)]
pub struct RoleChange {
    pub user: User,
    pub validation: RoleChangeValidation,
}

/// Role changes, onboarding and deletion of users
#[derive(Debug, Clone)]
pub struct UserLifecycleManager {
    coordinator: TransactionCoordinator,
}

async fn check_role_change(
    tx: &mut dyn StoreTx,
    user_id: Uuid,
    new_role: Role,
    team_id: Option<Uuid>,
) -> EngineResult<(User, RoleChangeValidation)> {
    let user = tx
        .find_user(user_id)
        .await?
        .ok_or_else(|| EngineError::not_found(EntityKind::User, user_id))?;

    let mut validation = RoleChangeValidation {
        user_id,
        current_role: user.role,
        requested_role: new_role,
        rejection: None,
        team_to_manage: None,
        team_to_vacate: None,
    };

    let rejection = if user.role == new_role {
        Some(RoleChangeRejection::SameRole)
    } else if user.role == Role::Admin {
        Some(RoleChangeRejection::AdminImmutable)
    } else if new_role == Role::Admin {
        Some(RoleChangeRejection::AdminPromotionForbidden)
    } else if new_role == Role::Manager {
        match team_id {
            None => Some(RoleChangeRejection::TeamRequired),
            Some(team_id) => match tx.find_team(team_id).await? {
                None => Some(RoleChangeRejection::TeamNotFound),
                Some(team) if !team.is_vacant() => Some(RoleChangeRejection::TeamHasManager),
                Some(team) => {
                    validation.team_to_manage = Some(team.id);
                    None
                }
            },
        }
    } else {
        if user.role == Role::Manager {
            validation.team_to_vacate = tx.find_team_managed_by(user_id).await?.map(|t| t.id);
        }
        None
    };

    validation.rejection = rejection;
    Ok((user, validation))
}

async fn compute_deletion_impact(tx: &mut dyn StoreTx, user_id: Uuid) -> EngineResult<DeletionImpact> {
    let user = tx
        .find_user(user_id)
        .await?
        .ok_or_else(|| EngineError::not_found(EntityKind::User, user_id))?;

    let tasks_to_unassign = tx.tasks_assigned_to(user_id).await?;
    let team_losing_manager = tx.find_team_managed_by(user_id).await?;
    let skill_associations = tx.count_user_skills(user_id).await?;
    let sent_invitations = tx.count_invitations_sent_by(user_id).await?;

    let (can_delete, reason) = if user.role == Role::Admin {
        (false, Some("admin accounts cannot be deleted".to_string()))
    } else {
        (true, None)
    };

    Ok(DeletionImpact {
        user,
        tasks_to_unassign,
        team_losing_manager,
        skill_associations,
        sent_invitations,
        can_delete,
        reason,
    })
}

impl UserLifecycleManager {
    pub fn new(coordinator: TransactionCoordinator) -> Self {
        Self { coordinator }
    }

    /// Checks whether `user_id` may move to `new_role`
    ///
    /// Never mutates. A rule violation is reported in the result, not as an
    /// error; only a missing user (or a store failure) is an `Err`.
    ///
    /// # Arguments
    ///
    /// * `user_id` - User whose role would change
    /// * `new_role` - Requested role
    /// * `team_id` - Team to manage; required when promoting to manager
    ///
    /// # Returns
    ///
    /// The validation, with the team to take over or to vacate filled in
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use crewline_shared::engine::Engine;
    /// # use crewline_shared::models::Role;
    /// # async fn example(engine: Engine, user_id: uuid::Uuid, team_id: uuid::Uuid)
    /// #     -> Result<(), crewline_shared::error::EngineError> {
    /// let check = engine
    ///     .lifecycle()
    ///     .validate_role_change(user_id, Role::Manager, Some(team_id))
    ///     .await?;
    /// if let Some(rejection) = check.rejection {
    ///     println!("cannot promote: {rejection}");
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn validate_role_change(
        &self,
        user_id: Uuid,
        new_role: Role,
        team_id: Option<Uuid>,
    ) -> EngineResult<RoleChangeValidation> {
        self.coordinator
            .read("validate_role_change", move |tx| {
                Box::pin(async move {
                    let (_, validation) = check_role_change(tx, user_id, new_role, team_id).await?;
                    Ok(validation)
                })
            })
            .await
    }

    /// Validates and applies a role change in one unit
    ///
    /// Promotion to manager moves the user into the team and takes its
    /// manager slot. Demotion clears the slot of the team they managed and
    /// keeps their team membership.
    pub async fn apply_role_change(
        &self,
        user_id: Uuid,
        new_role: Role,
        team_id: Option<Uuid>,
    ) -> EngineResult<RoleChange> {
        let change = self
            .coordinator
            .run("apply_role_change", move |tx| {
                Box::pin(async move {
                    let (user, validation) =
                        check_role_change(tx, user_id, new_role, team_id).await?;
                    if let Some(rejection) = validation.rejection {
                        return Err(EngineError::RoleChangeRejected(rejection));
                    }

                    if let Some(team_id) = validation.team_to_vacate {
                        tx.set_team_manager(team_id, None).await?;
                        debug!(%user_id, %team_id, "Vacated team manager slot");
                    }

                    let new_team = validation.team_to_manage.or(user.team_id);
                    let updated = tx
                        .update_user_role(user_id, new_role, new_team)
                        .await?
                        .ok_or_else(|| EngineError::not_found(EntityKind::User, user_id))?;

                    if let Some(team_id) = validation.team_to_manage {
                        tx.set_team_manager(team_id, Some(user_id))
                            .await
                            .map_err(|e| match e {
                                e if e.is_unique_violation_of(constraints::TEAMS_MANAGER) => {
                                    EngineError::RoleChangeRejected(
                                        RoleChangeRejection::TeamHasManager,
                                    )
                                }
                                e => EngineError::from(e),
                            })?;
                    }

                    Ok(RoleChange {
                        user: updated,
                        validation,
                    })
                })
            })
            .await?;

        info!(
            %user_id,
            from = %change.validation.current_role,
            to = %change.validation.requested_role,
            "Role changed"
        );
        Ok(change)
    }

    /// Creates a user and rates them on `skills` in one unit
    ///
    /// # Errors
    ///
    /// - `EmailTaken` when the email is already registered
    pub async fn onboard_new_user(
        &self,
        data: CreateUser,
        skills: Vec<SkillInput>,
    ) -> EngineResult<Onboarded> {
        let onboarded = self
            .coordinator
            .run("onboard_new_user", move |tx| {
                Box::pin(async move {
                    let email = data.email.clone();
                    let user = tx
                        .insert_user(data)
                        .await
                        .map_err(|e| email_taken_or(e, &email))?;

                    if skills.is_empty() {
                        return Ok(Onboarded {
                            user,
                            managed_team: None,
                            skills: Vec::new(),
                        });
                    }

                    let skills = SkillResolver::link_user_skills(tx, user.id, &skills).await?;
                    Ok(Onboarded {
                        user,
                        managed_team: None,
                        skills,
                    })
                })
            })
            .await?;

        info!(user_id = %onboarded.user.id, skills = onboarded.skills.len(), "User onboarded");
        Ok(onboarded)
    }

    /// Reports what [`Self::safe_delete_user`] would do, without doing it
    ///
    /// Runs in a unit that is always rolled back. Admins are reported with
    /// `can_delete = false` and a reason rather than as an error.
    pub async fn get_deletion_impact(&self, user_id: Uuid) -> EngineResult<DeletionImpact> {
        self.coordinator
            .read("get_deletion_impact", move |tx| {
                Box::pin(async move { compute_deletion_impact(tx, user_id).await })
            })
            .await
    }

    /// Deletes a non-admin user and everything that hangs off them
    ///
    /// Every task assigned to the user loses its assignee and returns to
    /// open, archived ones included. A managed team loses its manager. Skill
    /// ratings and sent invitations are removed with the user.
    ///
    /// # Returns
    ///
    /// The impact that was applied, equal to what
    /// [`Self::get_deletion_impact`] reports right before
    ///
    /// # Errors
    ///
    /// - `NotFound` when the user is missing
    /// - `AdminNotDeletable` for admins; nothing is changed
    pub async fn safe_delete_user(&self, user_id: Uuid) -> EngineResult<DeletionImpact> {
        let impact = self
            .coordinator
            .run("safe_delete_user", move |tx| {
                Box::pin(async move {
                    let impact = compute_deletion_impact(tx, user_id).await?;
                    if !impact.can_delete {
                        return Err(EngineError::AdminNotDeletable(user_id));
                    }

                    let released = tx.release_tasks_assigned_to(user_id).await?;
                    debug!(%user_id, released = released.len(), "Released assigned tasks");

                    if let Some(team) = &impact.team_losing_manager {
                        tx.set_team_manager(team.id, None).await?;
                    }

                    if !tx.delete_user(user_id).await? {
                        return Err(EngineError::not_found(EntityKind::User, user_id));
                    }

                    Ok(impact)
                })
            })
            .await?;

        info!(
            %user_id,
            unassigned_tasks = impact.tasks_to_unassign.len(),
            skill_associations = impact.skill_associations,
            sent_invitations = impact.sent_invitations,
            "User deleted"
        );
        Ok(impact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_serializes_snake_case() {
        let json = serde_json::to_value(RoleChangeRejection::AdminPromotionForbidden).unwrap();
        assert_eq!(json, "admin_promotion_forbidden");
        assert_eq!(
            RoleChangeRejection::TeamHasManager.to_string(),
            "team already has a manager"
        );
    }
}
