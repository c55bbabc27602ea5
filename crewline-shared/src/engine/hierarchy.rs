//! Role hierarchy as data
//!
//! Each role that may invite has exactly one row: the role it invites and how
//! the invitation's team is chosen. A role without a row cannot invite.

use crate::models::Role;

/// How an invitation's team is determined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamRule {
    /// Caller names a team, which must exist and have no manager
    RequiredVacant,

    /// Invitation joins the inviter's own team; inviter must have one
    InheritFromInviter,
}

/// One row of the hierarchy table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvitePolicy {
    pub inviter: Role,
    pub invites: Role,
    pub team_rule: TeamRule,
}

/// Who may invite whom
pub const INVITE_POLICIES: &[InvitePolicy] = &[
    InvitePolicy {
        inviter: Role::Admin,
        invites: Role::Manager,
        team_rule: TeamRule::RequiredVacant,
    },
    InvitePolicy {
        inviter: Role::Manager,
        invites: Role::Engineer,
        team_rule: TeamRule::InheritFromInviter,
    },
];

/// Looks up the policy row for an inviter role
pub fn invite_policy(inviter: Role) -> Option<&'static InvitePolicy> {
    INVITE_POLICIES.iter().find(|p| p.inviter == inviter)
}
