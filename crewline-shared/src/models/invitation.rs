//! Invitation model and database operations
//!
//! An invitation carries the role and team a new person will be onboarded
//! with. The plaintext token is handed to the inviter exactly once; only its
//! SHA-256 hash is stored (see [`crate::auth::token`]).
//!
//! # Lifecycle
//!
//! ```text
//! pending → accepted
//! pending → expired   (expires_at passed)
//! ```
//!
//! # Schema
//!
//! ```sql
//! CREATE TYPE invitation_status AS ENUM ('pending', 'accepted', 'expired');
//!
//! CREATE TABLE invitations (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     email VARCHAR(255) NOT NULL,
//!     token_hash CHAR(64) NOT NULL UNIQUE,
//!     role user_role NOT NULL,
//!     inviter_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
//!     team_id UUID REFERENCES teams(id) ON DELETE CASCADE,
//!     status invitation_status NOT NULL DEFAULT 'pending',
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     expires_at TIMESTAMPTZ NOT NULL,
//!     accepted_at TIMESTAMPTZ
//! );
//! CREATE UNIQUE INDEX invitations_pending_email_key
//!     ON invitations (LOWER(email)) WHERE status = 'pending';
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;

use super::user::Role;

const INVITATION_COLUMNS: &str = "id, email, token_hash, role, inviter_id, team_id, status, \
                                  created_at, expires_at, accepted_at";

/// Invitation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "invitation_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Expired,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Expired => "expired",
        }
    }
}

/// Invitation model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Invitation {
    /// Unique invitation ID
    pub id: Uuid,

    /// Invitee email
    pub email: String,

    /// SHA-256 of the secret token (never serialized)
    #[serde(skip_serializing)]
    pub token_hash: String,

    /// Role the invitee will receive
    pub role: Role,

    /// Who issued the invitation
    pub inviter_id: Uuid,

    /// Team the invitee joins (always set for manager invitations)
    pub team_id: Option<Uuid>,

    /// Current status
    pub status: InvitationStatus,

    /// When the invitation was issued
    pub created_at: DateTime<Utc>,

    /// When the invitation stops being acceptable
    pub expires_at: DateTime<Utc>,

    /// When the invitation was accepted
    pub accepted_at: Option<DateTime<Utc>>,
}

/// Input for persisting a new invitation
#[derive(Debug, Clone)]
pub struct CreateInvitation {
    pub email: String,
    pub token_hash: String,
    pub role: Role,
    pub inviter_id: Uuid,
    pub team_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Invitation {
    /// True if the invitation can still be accepted at `now`
    pub fn is_acceptable(&self, now: DateTime<Utc>) -> bool {
        self.status == InvitationStatus::Pending && self.expires_at > now
    }

    /// Persists a pending invitation
    ///
    /// # Errors
    ///
    /// Unique violation on `invitations_pending_email_key` when another
    /// pending invitation exists for the email.
    pub async fn create(
        conn: &mut PgConnection,
        data: CreateInvitation,
    ) -> Result<Self, sqlx::Error> {
        let invitation = sqlx::query_as::<_, Invitation>(&format!(
            r#"
            INSERT INTO invitations (email, token_hash, role, inviter_id, team_id, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {INVITATION_COLUMNS}
            "#
        ))
        .bind(data.email)
        .bind(data.token_hash)
        .bind(data.role)
        .bind(data.inviter_id)
        .bind(data.team_id)
        .bind(data.created_at)
        .bind(data.expires_at)
        .fetch_one(conn)
        .await?;

        Ok(invitation)
    }

    /// Finds an invitation by ID
    pub async fn find_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let invitation = sqlx::query_as::<_, Invitation>(&format!(
            "SELECT {INVITATION_COLUMNS} FROM invitations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(invitation)
    }

    /// Finds the pending invitation for an email (case-insensitive)
    pub async fn find_pending_by_email(
        conn: &mut PgConnection,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let invitation = sqlx::query_as::<_, Invitation>(&format!(
            r#"
            SELECT {INVITATION_COLUMNS}
            FROM invitations
            WHERE LOWER(email) = LOWER($1) AND status = 'pending'
            "#
        ))
        .bind(email)
        .fetch_optional(conn)
        .await?;

        Ok(invitation)
    }

    /// Finds an acceptable invitation by token hash and locks it
    ///
    /// The row lock keeps two concurrent acceptances of the same token from
    /// both seeing it pending.
    pub async fn find_acceptable_by_token_hash(
        conn: &mut PgConnection,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let invitation = sqlx::query_as::<_, Invitation>(&format!(
            r#"
            SELECT {INVITATION_COLUMNS}
            FROM invitations
            WHERE token_hash = $1 AND status = 'pending' AND expires_at > $2
            FOR UPDATE
            "#
        ))
        .bind(token_hash)
        .bind(now)
        .fetch_optional(conn)
        .await?;

        Ok(invitation)
    }

    /// Marks a pending invitation accepted
    pub async fn mark_accepted(
        conn: &mut PgConnection,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let invitation = sqlx::query_as::<_, Invitation>(&format!(
            r#"
            UPDATE invitations
            SET status = 'accepted', accepted_at = $2
            WHERE id = $1 AND status = 'pending'
            RETURNING {INVITATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(at)
        .fetch_optional(conn)
        .await?;

        Ok(invitation)
    }

    /// Expires pending invitations whose deadline has passed
    ///
    /// When `email` is given only that address is swept.
    ///
    /// # Returns
    ///
    /// Number of invitations expired
    pub async fn expire_stale(
        conn: &mut PgConnection,
        now: DateTime<Utc>,
        email: Option<&str>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE invitations
            SET status = 'expired'
            WHERE status = 'pending'
              AND expires_at <= $1
              AND ($2::text IS NULL OR LOWER(email) = LOWER($2))
            "#,
        )
        .bind(now)
        .bind(email)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Counts invitations issued by a user (any status)
    pub async fn count_sent_by(conn: &mut PgConnection, inviter_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM invitations WHERE inviter_id = $1")
                .bind(inviter_id)
                .fetch_one(conn)
                .await?;

        Ok(count)
    }
}
