//! Project model and database operations
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE projects (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     team_id UUID NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
//!     name VARCHAR(255) NOT NULL,
//!     description TEXT NOT NULL DEFAULT '',
//!     archived BOOLEAN NOT NULL DEFAULT FALSE,
//!     archived_at TIMESTAMPTZ,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```
//!
//! Archiving is terminal: once `archived` is set no further edits are made.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;

/// Project model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,
    pub team_id: Uuid,
    pub name: String,
    pub description: String,
    pub archived: bool,
    pub archived_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProject {
    pub team_id: Uuid,
    pub name: String,
    pub description: String,
}

impl Project {
    /// Creates a new (active) project
    pub async fn create(conn: &mut PgConnection, data: CreateProject) -> Result<Self, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (team_id, name, description)
            VALUES ($1, $2, $3)
            RETURNING id, team_id, name, description, archived, archived_at, created_at
            "#,
        )
        .bind(data.team_id)
        .bind(data.name)
        .bind(data.description)
        .fetch_one(conn)
        .await?;

        Ok(project)
    }

    /// Finds a project by ID
    pub async fn find_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, team_id, name, description, archived, archived_at, created_at
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(project)
    }

    /// Marks a project archived
    ///
    /// Only transitions active projects; returns None when the project is
    /// missing or was already archived.
    pub async fn archive(
        conn: &mut PgConnection,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
            SET archived = TRUE, archived_at = $2
            WHERE id = $1 AND archived = FALSE
            RETURNING id, team_id, name, description, archived, archived_at, created_at
            "#,
        )
        .bind(id)
        .bind(at)
        .fetch_optional(conn)
        .await?;

        Ok(project)
    }
}
