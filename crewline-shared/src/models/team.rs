//! Team model and database operations
//!
//! A team has at most one manager and a manager runs at most one team. Both
//! directions are enforced by the `teams_manager_id_key` unique index; the
//! engine checks vacancy up front so callers get a typed error instead of a
//! constraint violation.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE teams (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     name VARCHAR(255) NOT NULL UNIQUE,
//!     manager_id UUID UNIQUE REFERENCES users(id) ON DELETE SET NULL,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;

/// Team model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Team {
    /// Unique team ID
    pub id: Uuid,

    /// Team name (unique)
    pub name: String,

    /// Current manager, if the slot is filled
    pub manager_id: Option<Uuid>,

    /// When the team was created
    pub created_at: DateTime<Utc>,
}

/// Input for creating a team
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTeam {
    /// Team name
    pub name: String,

    /// Initial manager (usually None; managers arrive through invitations)
    pub manager_id: Option<Uuid>,
}

impl Team {
    /// Returns true when nobody manages this team
    pub fn is_vacant(&self) -> bool {
        self.manager_id.is_none()
    }

    /// Creates a new team
    ///
    /// # Errors
    ///
    /// Returns an error if the name is taken or the manager already runs a
    /// team (unique violations)
    pub async fn create(conn: &mut PgConnection, data: CreateTeam) -> Result<Self, sqlx::Error> {
        let team = sqlx::query_as::<_, Team>(
            r#"
            INSERT INTO teams (name, manager_id)
            VALUES ($1, $2)
            RETURNING id, name, manager_id, created_at
            "#,
        )
        .bind(data.name)
        .bind(data.manager_id)
        .fetch_one(conn)
        .await?;

        Ok(team)
    }

    /// Finds a team by ID
    pub async fn find_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let team = sqlx::query_as::<_, Team>(
            "SELECT id, name, manager_id, created_at FROM teams WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(team)
    }

    /// Finds the team managed by a user, if any
    pub async fn find_by_manager(
        conn: &mut PgConnection,
        manager_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let team = sqlx::query_as::<_, Team>(
            "SELECT id, name, manager_id, created_at FROM teams WHERE manager_id = $1",
        )
        .bind(manager_id)
        .fetch_optional(conn)
        .await?;

        Ok(team)
    }

    /// Fills or clears the manager slot
    ///
    /// # Returns
    ///
    /// The updated team, None if the team doesn't exist
    pub async fn set_manager(
        conn: &mut PgConnection,
        id: Uuid,
        manager_id: Option<Uuid>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let team = sqlx::query_as::<_, Team>(
            r#"
            UPDATE teams
            SET manager_id = $2
            WHERE id = $1
            RETURNING id, name, manager_id, created_at
            "#,
        )
        .bind(id)
        .bind(manager_id)
        .fetch_optional(conn)
        .await?;

        Ok(team)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vacancy() {
        let mut team = Team {
            id: Uuid::new_v4(),
            name: "Platform".to_string(),
            manager_id: None,
            created_at: Utc::now(),
        };
        assert!(team.is_vacant());

        team.manager_id = Some(Uuid::new_v4());
        assert!(!team.is_vacant());
    }
}
