//! Invitation issuance and acceptance
//!
//! # Flow
//!
//! ```text
//! create_invitation (inviter session)
//!   ├─> hierarchy check (who may invite whom, which team)
//!   ├─> expire stale invitations for the email
//!   ├─> reject if one is still pending
//!   └─> store SHA-256(token), return plaintext token once
//!
//! accept_invitation (token)
//!   ├─> pending + unexpired invitation by token hash
//!   ├─> create user with the invitation's email/role/team
//!   ├─> manager invite: claim the team's manager slot
//!   ├─> mark accepted
//!   ├─> link skills
//!   └─> after commit: spawn recommendation refresh
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::hierarchy::{invite_policy, TeamRule};
use super::skills::{SkillInput, SkillResolver};
use super::transaction::TransactionCoordinator;
use crate::auth::token::{generate_invitation_token, hash_token, is_well_formed};
use crate::auth::SessionContext;
use crate::collaborators::{CollaboratorError, CollaboratorResult, RecommendationNotifier};
use crate::config::EngineSettings;
use crate::error::{EngineError, EngineResult, EntityKind};
use crate::models::{CreateInvitation, CreateUser, Invitation, Role, Team, User, UserSkill};
use crate::store::{constraints, StoreError};

/// Invitation request from an authenticated inviter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvitationRequest {
    pub email: String,
    pub role: Role,

    /// Required when an admin invites a manager; managers' invitations
    /// always go to their own team
    #[serde(default)]
    pub team_id: Option<Uuid>,
}

/// Newly issued invitation with its one-time plaintext token
#[derive(Debug, Clone, Serialize)]
pub struct IssuedInvitation {
    pub invitation: Invitation,
    pub token: String,
}

/// Acceptance payload
#[derive(Debug, Clone, Deserialize)]
pub struct AcceptInvitation {
    pub token: String,
    pub name: String,

    /// Already hashed by the caller
    pub password_hash: String,

    #[serde(default)]
    pub skills: Vec<SkillInput>,
}

/// A freshly onboarded user
#[derive(Debug, Clone, Serialize)]
pub struct Onboarded {
    pub user: User,

    /// Team whose manager slot the user took, for manager invitations
    pub managed_team: Option<Team>,

    pub skills: Vec<UserSkill>,
}

/// Invitation workflow
#[derive(Clone)]
pub struct InvitationWorkflow {
    coordinator: TransactionCoordinator,
    notifier: Arc<dyn RecommendationNotifier>,
    invitation_ttl: chrono::Duration,
    notify_timeout: Duration,
}

impl InvitationWorkflow {
    pub fn new(
        coordinator: TransactionCoordinator,
        notifier: Arc<dyn RecommendationNotifier>,
        settings: &EngineSettings,
    ) -> Self {
        Self {
            coordinator,
            notifier,
            invitation_ttl: settings.invitation_ttl,
            notify_timeout: settings.notify_timeout,
        }
    }

    /// Issues an invitation on behalf of `session`
    ///
    /// The inviter's role and team are re-read from the store; the session
    /// only identifies who is asking.
    ///
    /// # Arguments
    ///
    /// * `session` - Authenticated inviter
    /// * `request` - Email, role to invite and (for admins) the target team
    ///
    /// # Returns
    ///
    /// The stored invitation and its plaintext token. The token is not kept
    /// anywhere and cannot be recovered later.
    ///
    /// # Errors
    ///
    /// - `PermissionDenied` for engineers
    /// - `InvalidRoleSequence` when the role is not the one directly below
    /// - `TeamRequired`, `ManagerWithoutTeam`, `TeamNotFound`, `TeamHasManager`
    /// - `DuplicateInvitation` when the email already has a live invitation
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use crewline_shared::auth::SessionContext;
    /// # use crewline_shared::engine::{Engine, InvitationRequest};
    /// # use crewline_shared::models::Role;
    /// # async fn example(engine: Engine, manager: SessionContext)
    /// #     -> Result<(), crewline_shared::error::EngineError> {
    /// let issued = engine
    ///     .invitations()
    ///     .create_invitation(
    ///         &manager,
    ///         InvitationRequest {
    ///             email: "eve@example.com".into(),
    ///             role: Role::Engineer,
    ///             team_id: None,
    ///         },
    ///     )
    ///     .await?;
    /// println!("send {} to the invitee", issued.token);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create_invitation(
        &self,
        session: &SessionContext,
        request: InvitationRequest,
    ) -> EngineResult<IssuedInvitation> {
        let inviter_id = session.user_id;
        let ttl = self.invitation_ttl;
        let email = request.email.trim().to_string();

        let issued = self
            .coordinator
            .run("create_invitation", move |tx| {
                Box::pin(async move {
                    let inviter = tx
                        .find_user(inviter_id)
                        .await?
                        .ok_or_else(|| EngineError::not_found(EntityKind::User, inviter_id))?;

                    let policy = invite_policy(inviter.role)
                        .ok_or(EngineError::PermissionDenied { role: inviter.role })?;
                    if request.role != policy.invites {
                        return Err(EngineError::InvalidRoleSequence {
                            inviter: inviter.role,
                            requested: request.role,
                        });
                    }

                    let team_id = match policy.team_rule {
                        TeamRule::RequiredVacant => {
                            let team_id = request.team_id.ok_or(EngineError::TeamRequired)?;
                            let team = tx
                                .find_team(team_id)
                                .await?
                                .ok_or(EngineError::TeamNotFound(team_id))?;
                            if !team.is_vacant() {
                                return Err(EngineError::TeamHasManager(team_id));
                            }
                            team_id
                        }
                        TeamRule::InheritFromInviter => {
                            let team_id = inviter.team_id.ok_or(EngineError::ManagerWithoutTeam)?;
                            if request.team_id.is_some_and(|t| t != team_id) {
                                debug!(
                                    requested = ?request.team_id,
                                    %team_id,
                                    "Ignoring requested team; invitation joins inviter's team"
                                );
                            }
                            team_id
                        }
                    };

                    let now = Utc::now();
                    let expired = tx.expire_stale_invitations(now, Some(email.as_str())).await?;
                    if expired > 0 {
                        debug!(expired, "Expired stale invitations before issuing");
                    }
                    if tx.find_pending_invitation_by_email(&email).await?.is_some() {
                        return Err(EngineError::DuplicateInvitation(email));
                    }

                    let (token, token_hash) = generate_invitation_token();
                    let invitation = tx
                        .insert_invitation(CreateInvitation {
                            email: email.clone(),
                            token_hash,
                            role: request.role,
                            inviter_id,
                            team_id: Some(team_id),
                            created_at: now,
                            expires_at: now + ttl,
                        })
                        .await
                        .map_err(|e| match e {
                            e if e.is_unique_violation_of(constraints::INVITATIONS_PENDING_EMAIL) => {
                                EngineError::DuplicateInvitation(email.clone())
                            }
                            e => EngineError::from(e),
                        })?;

                    Ok(IssuedInvitation { invitation, token })
                })
            })
            .await?;

        info!(
            invitation_id = %issued.invitation.id,
            %inviter_id,
            role = %issued.invitation.role,
            "Invitation issued"
        );
        Ok(issued)
    }

    /// Onboards the holder of an invitation token
    ///
    /// Unknown, expired and already used tokens all yield
    /// [`EngineError::InvitationNotPending`].
    ///
    /// Email, role and team come from the invitation, never from the
    /// request. In one unit the user is created, a manager takes the team's
    /// manager slot, the invitation is marked accepted and the skills are
    /// linked. The recommendation refresh is dispatched after commit.
    ///
    /// # Errors
    ///
    /// - `InvitationNotPending` for any token that cannot be used
    /// - `EmailTaken` when the email was registered in the meantime
    /// - `TeamHasManager` when the team was claimed in the meantime
    pub async fn accept_invitation(&self, request: AcceptInvitation) -> EngineResult<Onboarded> {
        if !is_well_formed(&request.token) {
            return Err(EngineError::InvitationNotPending);
        }
        let token_hash = hash_token(&request.token);

        let onboarded = self
            .coordinator
            .run("accept_invitation", move |tx| {
                Box::pin(async move {
                    let now = Utc::now();
                    let invitation = tx
                        .find_acceptable_invitation(&token_hash, now)
                        .await?
                        .ok_or(EngineError::InvitationNotPending)?;

                    let email = invitation.email.clone();
                    let user = tx
                        .insert_user(CreateUser {
                            name: request.name,
                            email: invitation.email.clone(),
                            password_hash: request.password_hash,
                            role: invitation.role,
                            team_id: invitation.team_id,
                        })
                        .await
                        .map_err(|e| email_taken_or(e, &email))?;

                    let managed_team = if invitation.role == Role::Manager {
                        let team_id = invitation.team_id.ok_or(EngineError::TeamRequired)?;
                        let team = tx
                            .find_team(team_id)
                            .await?
                            .ok_or(EngineError::TeamNotFound(team_id))?;
                        if !team.is_vacant() {
                            return Err(EngineError::TeamHasManager(team_id));
                        }
                        let team = tx
                            .set_team_manager(team_id, Some(user.id))
                            .await
                            .map_err(|e| match e {
                                e if e.is_unique_violation_of(constraints::TEAMS_MANAGER) => {
                                    EngineError::TeamHasManager(team_id)
                                }
                                e => EngineError::from(e),
                            })?
                            .ok_or(EngineError::TeamNotFound(team_id))?;
                        Some(team)
                    } else {
                        None
                    };

                    tx.mark_invitation_accepted(invitation.id, now)
                        .await?
                        .ok_or(EngineError::InvitationNotPending)?;

                    let skills = if request.skills.is_empty() {
                        Vec::new()
                    } else {
                        SkillResolver::link_user_skills(tx, user.id, &request.skills).await?
                    };

                    Ok(Onboarded {
                        user,
                        managed_team,
                        skills,
                    })
                })
            })
            .await?;

        info!(
            user_id = %onboarded.user.id,
            role = %onboarded.user.role,
            "Invitation accepted"
        );

        self.dispatch_refresh(onboarded.user.id);
        Ok(onboarded)
    }

    /// Expires every pending invitation past its deadline
    ///
    /// # Returns
    ///
    /// Number of invitations moved to `expired`
    pub async fn expire_stale_invitations(&self) -> EngineResult<u64> {
        let expired = self
            .coordinator
            .run("expire_stale_invitations", |tx| {
                Box::pin(async move { Ok(tx.expire_stale_invitations(Utc::now(), None).await?) })
            })
            .await?;

        info!(expired, "Expired stale invitations");
        Ok(expired)
    }

    /// Fire-and-forget recommendation refresh
    ///
    /// Spawns the notification on the runtime with its own deadline. Failures
    /// and timeouts are logged; the operation that triggered the refresh
    /// never sees them.
    ///
    /// # Arguments
    ///
    /// * `user_id` - Newly onboarded user
    ///
    /// # Returns
    ///
    /// Handle to the spawned task. Callers normally drop it; awaiting it
    /// yields the outcome, with an overrun reported as
    /// [`CollaboratorError::Timeout`].
    pub fn dispatch_refresh(&self, user_id: Uuid) -> JoinHandle<CollaboratorResult<()>> {
        let notifier = self.notifier.clone();
        let limit = self.notify_timeout;

        tokio::spawn(async move {
            let outcome = tokio::time::timeout(limit, notifier.refresh(user_id))
                .await
                .unwrap_or(Err(CollaboratorError::Timeout));

            match &outcome {
                Ok(()) => debug!(%user_id, "Recommendation refresh sent"),
                Err(e) => warn!(
                    %user_id,
                    error = %e,
                    timeout_ms = limit.as_millis() as u64,
                    "Recommendation refresh failed"
                ),
            }
            outcome
        })
    }
}

/// Maps a duplicate-email insert onto [`EngineError::EmailTaken`]
pub(crate) fn email_taken_or(err: StoreError, email: &str) -> EngineError {
    if err.is_unique_violation_of(constraints::USERS_EMAIL) {
        EngineError::EmailTaken(email.to_string())
    } else {
        EngineError::from(err)
    }
}
