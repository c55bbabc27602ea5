//! Typed caller identity
//!
//! The request layer verifies whatever credential the caller presented and
//! builds a [`SessionContext`] once. Engine operations that act on behalf of
//! a caller take it explicitly.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Role, User};

/// Authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    /// Acting user
    pub user_id: Uuid,

    /// Role at the time the session was issued
    pub role: Role,

    /// Team at the time the session was issued
    pub team_id: Option<Uuid>,
}

impl SessionContext {
    pub fn new(user_id: Uuid, role: Role, team_id: Option<Uuid>) -> Self {
        Self {
            user_id,
            role,
            team_id,
        }
    }

    /// Builds a session for an already loaded user
    pub fn for_user(user: &User) -> Self {
        Self::new(user.id, user.role, user.team_id)
    }
}
