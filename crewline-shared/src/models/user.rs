//! User model and database operations
//!
//! Users are the people the engine organizes: admins curate teams, managers
//! run a single team, engineers pick up tasks. A user's `availability` mirrors
//! whether they currently hold an in-progress assignment.
//!
//! # Schema
//!
//! ```sql
//! CREATE TYPE user_role AS ENUM ('admin', 'manager', 'engineer');
//! CREATE TYPE availability AS ENUM ('available', 'busy');
//!
//! CREATE TABLE users (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     name VARCHAR(255) NOT NULL,
//!     email VARCHAR(255) NOT NULL,
//!     password_hash VARCHAR(255) NOT NULL,
//!     role user_role NOT NULL DEFAULT 'engineer',
//!     team_id UUID REFERENCES teams(id) ON DELETE SET NULL,
//!     availability availability NOT NULL DEFAULT 'available',
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! CREATE UNIQUE INDEX users_email_key ON users (LOWER(email));
//! ```
//!
//! All query functions take a `&mut PgConnection` so they can run inside the
//! transaction opened by the Postgres store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, team_id, availability, created_at, updated_at";

/// Organizational role of a user
///
/// Hierarchy: Admin > Manager > Engineer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Curates teams and invites managers
    Admin,

    /// Runs exactly one team and invites engineers into it
    Manager,

    /// Works on tasks
    Engineer,
}

impl Role {
    /// Converts role to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Engineer => "engineer",
        }
    }

    /// Returns numeric level for hierarchy comparison
    pub fn level(&self) -> u8 {
        match self {
            Role::Admin => 3,
            Role::Manager => 2,
            Role::Engineer => 1,
        }
    }

    /// Checks if this role sits strictly above `other`
    pub fn outranks(&self, other: &Role) -> bool {
        self.level() > other.level()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct ParseRoleError(pub String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "engineer" => Ok(Role::Engineer),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

/// Whether a user is free to pick up work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "availability", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    /// No in-progress assignment
    Available,

    /// Holding an in-progress assignment
    Busy,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Available => "available",
            Availability::Busy => "busy",
        }
    }
}

/// User model representing a person in the organization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Email address, unique case-insensitively
    pub email: String,

    /// Password hash produced by the authentication layer
    ///
    /// Never serialized back out to callers.
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Organizational role
    pub role: Role,

    /// Team the user belongs to (None for admins and unassigned users)
    pub team_id: Option<Uuid>,

    /// Current availability
    pub availability: Availability,

    /// When the user was created
    pub created_at: DateTime<Utc>,

    /// When the user was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Display name
    pub name: String,

    /// Email address
    pub email: String,

    /// Already-hashed password (hashing happens outside the engine)
    pub password_hash: String,

    /// Role to create the user with
    pub role: Role,

    /// Optional team membership
    pub team_id: Option<Uuid>,
}

impl User {
    /// Inserts a new user
    ///
    /// New users always start `available`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Email already exists (unique violation on `users_email_key`)
    /// - The referenced team does not exist (foreign key violation)
    /// - Database connection fails
    pub async fn create(conn: &mut PgConnection, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, role, team_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(data.name)
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.role)
        .bind(data.team_id)
        .fetch_one(conn)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    ///
    /// # Returns
    ///
    /// The user if found, None otherwise
    pub async fn find_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(user)
    }

    /// Finds a user by email address (case-insensitive)
    pub async fn find_by_email(
        conn: &mut PgConnection,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(conn)
        .await?;

        Ok(user)
    }

    /// Sets a user's availability
    ///
    /// # Returns
    ///
    /// The updated user, None if the user doesn't exist
    pub async fn set_availability(
        conn: &mut PgConnection,
        id: Uuid,
        availability: Availability,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET availability = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(availability)
        .fetch_optional(conn)
        .await?;

        Ok(user)
    }

    /// Updates a user's role and team together
    ///
    /// Role and team always move as a pair: promotion to manager binds a
    /// team, demotion may keep or drop it.
    pub async fn update_role(
        conn: &mut PgConnection,
        id: Uuid,
        role: Role,
        team_id: Option<Uuid>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET role = $2, team_id = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(role)
        .bind(team_id)
        .fetch_optional(conn)
        .await?;

        Ok(user)
    }

    /// Deletes a user by ID
    ///
    /// Dependent rows follow the schema's referential actions: skill links and
    /// sent invitations cascade, task assignments and team manager slots are
    /// set to NULL.
    ///
    /// # Returns
    ///
    /// True if the user was deleted, false if the user didn't exist
    pub async fn delete(conn: &mut PgConnection, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
