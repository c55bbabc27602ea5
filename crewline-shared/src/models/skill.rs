//! Skill catalog: skills, aliases and user-skill links
//!
//! Skill names are unique case-insensitively. Aliases map alternative
//! spellings ("k8s") to a canonical skill ("Kubernetes"). Skills created
//! automatically from free text start unverified; curated skills are verified.
//!
//! # Schema
//!
//! ```sql
//! CREATE TYPE proficiency AS ENUM ('beginner', 'intermediate', 'expert');
//!
//! CREATE TABLE skills (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     name VARCHAR(100) NOT NULL,
//!     verified BOOLEAN NOT NULL DEFAULT FALSE,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! CREATE UNIQUE INDEX skills_name_key ON skills (LOWER(name));
//!
//! CREATE TABLE skill_aliases (
//!     alias VARCHAR(100) NOT NULL,
//!     skill_id UUID NOT NULL REFERENCES skills(id) ON DELETE CASCADE
//! );
//! CREATE UNIQUE INDEX skill_aliases_alias_key ON skill_aliases (LOWER(alias));
//!
//! CREATE TABLE user_skills (
//!     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
//!     skill_id UUID NOT NULL REFERENCES skills(id) ON DELETE CASCADE,
//!     proficiency proficiency NOT NULL DEFAULT 'beginner',
//!     PRIMARY KEY (user_id, skill_id)
//! );
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;

/// Skill competence level on a user-skill link
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "proficiency", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Proficiency {
    #[default]
    Beginner,
    Intermediate,
    Expert,
}

impl Proficiency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Proficiency::Beginner => "beginner",
            Proficiency::Intermediate => "intermediate",
            Proficiency::Expert => "expert",
        }
    }

    /// Parses a proficiency label, falling back to `Beginner`
    ///
    /// Missing or unrecognized labels are not an error: onboarding accepts
    /// whatever the caller sent and files it at the lowest level.
    pub fn parse_or_default(label: Option<&str>) -> Self {
        match label.map(|l| l.trim().to_ascii_lowercase()).as_deref() {
            Some("intermediate") => Proficiency::Intermediate,
            Some("expert") => Proficiency::Expert,
            _ => Proficiency::Beginner,
        }
    }
}

/// Canonical skill record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Skill {
    pub id: Uuid,
    pub name: String,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

/// An alias lookup hit: the alias that matched and the skill it points to
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AliasMatch {
    pub alias: String,
    #[sqlx(flatten)]
    pub skill: Skill,
}

/// A user's rating on one skill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserSkill {
    pub user_id: Uuid,
    pub skill_id: Uuid,
    pub proficiency: Proficiency,
}

/// Lowercases and trims names for case-insensitive matching
pub fn normalize_skill_name(name: &str) -> String {
    name.trim().to_lowercase()
}

impl Skill {
    /// Finds skills whose names match any of `names`, case-insensitively
    pub async fn find_by_names(
        conn: &mut PgConnection,
        names: &[String],
    ) -> Result<Vec<Self>, sqlx::Error> {
        let lowered: Vec<String> = names.iter().map(|n| normalize_skill_name(n)).collect();

        let skills = sqlx::query_as::<_, Skill>(
            r#"
            SELECT id, name, verified, created_at
            FROM skills
            WHERE LOWER(name) = ANY($1)
            "#,
        )
        .bind(&lowered)
        .fetch_all(conn)
        .await?;

        Ok(skills)
    }

    /// Finds aliases matching any of `names` together with their skills
    pub async fn find_by_aliases(
        conn: &mut PgConnection,
        names: &[String],
    ) -> Result<Vec<AliasMatch>, sqlx::Error> {
        let lowered: Vec<String> = names.iter().map(|n| normalize_skill_name(n)).collect();

        let matches = sqlx::query_as::<_, AliasMatch>(
            r#"
            SELECT a.alias, s.id, s.name, s.verified, s.created_at
            FROM skill_aliases a
            JOIN skills s ON s.id = a.skill_id
            WHERE LOWER(a.alias) = ANY($1)
            "#,
        )
        .bind(&lowered)
        .fetch_all(conn)
        .await?;

        Ok(matches)
    }

    /// Inserts unverified skills, silently skipping names that already exist
    ///
    /// # Returns
    ///
    /// Only the rows actually inserted; callers re-fetch the rest.
    pub async fn insert_unverified(
        conn: &mut PgConnection,
        names: &[String],
    ) -> Result<Vec<Self>, sqlx::Error> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let skills = sqlx::query_as::<_, Skill>(
            r#"
            INSERT INTO skills (name, verified)
            SELECT UNNEST($1::text[]), FALSE
            ON CONFLICT DO NOTHING
            RETURNING id, name, verified, created_at
            "#,
        )
        .bind(names)
        .fetch_all(conn)
        .await?;

        Ok(skills)
    }

    /// Creates a verified skill, or verifies an existing one with the same name
    pub async fn upsert_verified(conn: &mut PgConnection, name: &str) -> Result<Self, sqlx::Error> {
        let skill = sqlx::query_as::<_, Skill>(
            r#"
            INSERT INTO skills (name, verified)
            VALUES ($1, TRUE)
            ON CONFLICT ((LOWER(name))) DO UPDATE SET verified = TRUE
            RETURNING id, name, verified, created_at
            "#,
        )
        .bind(name.trim())
        .fetch_one(conn)
        .await?;

        Ok(skill)
    }

    /// Registers an alias for a skill
    ///
    /// # Errors
    ///
    /// Unique violation when the alias is already taken; foreign key
    /// violation when the skill doesn't exist
    pub async fn add_alias(
        conn: &mut PgConnection,
        alias: &str,
        skill_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO skill_aliases (alias, skill_id) VALUES ($1, $2)")
            .bind(alias.trim())
            .bind(skill_id)
            .execute(conn)
            .await?;

        Ok(())
    }
}

impl UserSkill {
    /// Inserts or re-rates a batch of user-skill links
    pub async fn upsert_many(
        conn: &mut PgConnection,
        user_id: Uuid,
        links: &[(Uuid, Proficiency)],
    ) -> Result<(), sqlx::Error> {
        for (skill_id, proficiency) in links {
            sqlx::query(
                r#"
                INSERT INTO user_skills (user_id, skill_id, proficiency)
                VALUES ($1, $2, $3)
                ON CONFLICT (user_id, skill_id) DO UPDATE SET proficiency = EXCLUDED.proficiency
                "#,
            )
            .bind(user_id)
            .bind(skill_id)
            .bind(proficiency)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Lists a user's skill links
    pub async fn list_for_user(
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let links = sqlx::query_as::<_, UserSkill>(
            "SELECT user_id, skill_id, proficiency FROM user_skills WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(conn)
        .await?;

        Ok(links)
    }

    /// Counts a user's skill links
    pub async fn count_for_user(conn: &mut PgConnection, user_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM user_skills WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(conn)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proficiency_parse_or_default() {
        assert_eq!(Proficiency::parse_or_default(Some("Expert")), Proficiency::Expert);
        assert_eq!(
            Proficiency::parse_or_default(Some(" intermediate ")),
            Proficiency::Intermediate
        );
        assert_eq!(Proficiency::parse_or_default(Some("guru")), Proficiency::Beginner);
        assert_eq!(Proficiency::parse_or_default(None), Proficiency::Beginner);
    }

    #[test]
    fn test_normalize_skill_name() {
        assert_eq!(normalize_skill_name("  Rust "), "rust");
        assert_eq!(normalize_skill_name("PostgreSQL"), "postgresql");
    }
}
