//! Skill resolution: free-text names → canonical skill records
//!
//! Resolution runs inside whatever unit of work the caller has open, so a
//! failure later in the unit also discards any skills created here.
//!
//! Lookup order for each name (case-insensitive, trimmed):
//!
//! 1. a skill with that name
//! 2. an alias with that name, resolved to its skill
//! 3. otherwise a new unverified skill is created
//!
//! Concurrent units creating the same name are settled by the unique index:
//! the loser skips its insert and re-reads the winner's row.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

use super::transaction::TransactionCoordinator;
use crate::error::{EngineError, EngineResult, EntityKind};
use crate::models::skill::normalize_skill_name;
use crate::models::{Proficiency, Skill, UserSkill};
use crate::store::{constraints, StoreTx};

/// A skill name as supplied by a caller, with an optional proficiency label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillInput {
    pub name: String,

    /// `beginner`, `intermediate` or `expert`; anything else means beginner
    #[serde(default)]
    pub proficiency: Option<String>,
}

impl SkillInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            proficiency: None,
        }
    }

    pub fn with_proficiency(name: impl Into<String>, proficiency: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            proficiency: Some(proficiency.into()),
        }
    }

    pub fn proficiency(&self) -> Proficiency {
        Proficiency::parse_or_default(self.proficiency.as_deref())
    }
}

/// Resolve-or-create for skill names
#[derive(Debug, Clone)]
pub struct SkillResolver {
    coordinator: TransactionCoordinator,
}

impl SkillResolver {
    pub fn new(coordinator: TransactionCoordinator) -> Self {
        Self { coordinator }
    }

    /// Resolves `names` inside an open transaction
    ///
    /// The result is keyed by each name as given (trimmed). Blank names are
    /// skipped; an input with no usable names never touches the store.
    ///
    /// Lookup goes by skill name first, then by alias. Whatever is still
    /// unmatched is created unverified, under the first spelling seen. A
    /// creation that loses a race on the unique name is re-read instead.
    ///
    /// # Arguments
    ///
    /// * `tx` - The enclosing unit of work
    /// * `names` - Free-text skill names, any case
    ///
    /// # Returns
    ///
    /// Map from each trimmed input spelling to its canonical skill
    pub async fn resolve(
        tx: &mut dyn StoreTx,
        names: &[String],
    ) -> EngineResult<HashMap<String, Skill>> {
        let requested: Vec<(String, String)> = names
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .map(|n| (n.to_string(), normalize_skill_name(n)))
            .collect();

        if requested.is_empty() {
            return Ok(HashMap::new());
        }

        // First spelling wins when several inputs normalize the same way
        let mut unique: Vec<(String, String)> = Vec::new();
        for (spelling, key) in &requested {
            if !unique.iter().any(|(_, k)| k == key) {
                unique.push((spelling.clone(), key.clone()));
            }
        }
        let keys: Vec<String> = unique.iter().map(|(_, k)| k.clone()).collect();

        let mut found: HashMap<String, Skill> = tx
            .find_skills_by_names(&keys)
            .await?
            .into_iter()
            .map(|s| (normalize_skill_name(&s.name), s))
            .collect();

        let unmatched: Vec<String> = keys
            .iter()
            .filter(|k| !found.contains_key(*k))
            .cloned()
            .collect();
        if !unmatched.is_empty() {
            for hit in tx.find_skills_by_aliases(&unmatched).await? {
                found
                    .entry(normalize_skill_name(&hit.alias))
                    .or_insert(hit.skill);
            }
        }

        let missing: Vec<String> = unique
            .iter()
            .filter(|(_, k)| !found.contains_key(k))
            .map(|(spelling, _)| spelling.clone())
            .collect();
        if !missing.is_empty() {
            let created = tx.insert_unverified_skills(&missing).await?;
            debug!(requested = missing.len(), created = created.len(), "Created unverified skills");
            for skill in created {
                found.insert(normalize_skill_name(&skill.name), skill);
            }

            // Rows another unit committed between our lookup and insert
            let raced: Vec<String> = missing
                .iter()
                .filter(|n| !found.contains_key(&normalize_skill_name(n)))
                .cloned()
                .collect();
            if !raced.is_empty() {
                for skill in tx.find_skills_by_names(&raced).await? {
                    found.insert(normalize_skill_name(&skill.name), skill);
                }
            }
        }

        let mut resolved = HashMap::with_capacity(requested.len());
        for (spelling, key) in requested {
            match found.get(&key) {
                Some(skill) => {
                    resolved.insert(spelling, skill.clone());
                }
                None => warn!(name = %spelling, "Skill could not be resolved"),
            }
        }
        Ok(resolved)
    }

    /// Resolves `skills` and rates `user_id` on each, inside an open transaction
    ///
    /// A skill listed twice keeps the last proficiency given.
    pub async fn link_user_skills(
        tx: &mut dyn StoreTx,
        user_id: Uuid,
        skills: &[SkillInput],
    ) -> EngineResult<Vec<UserSkill>> {
        let names: Vec<String> = skills.iter().map(|s| s.name.clone()).collect();
        let resolved = Self::resolve(tx, &names).await?;
        if resolved.is_empty() {
            return Ok(Vec::new());
        }

        let mut ratings: Vec<(Uuid, Proficiency)> = Vec::new();
        for input in skills {
            let Some(skill) = resolved.get(input.name.trim()) else {
                continue;
            };
            let proficiency = input.proficiency();
            match ratings.iter_mut().find(|(id, _)| *id == skill.id) {
                Some(existing) => existing.1 = proficiency,
                None => ratings.push((skill.id, proficiency)),
            }
        }

        tx.upsert_user_skills(user_id, &ratings).await?;
        debug!(%user_id, linked = ratings.len(), "Linked user skills");

        Ok(ratings
            .into_iter()
            .map(|(skill_id, proficiency)| UserSkill {
                user_id,
                skill_id,
                proficiency,
            })
            .collect())
    }

    /// Resolves names in their own unit of work
    pub async fn resolve_skills(&self, names: Vec<String>) -> EngineResult<HashMap<String, Skill>> {
        self.coordinator
            .run("resolve_skills", move |tx| {
                Box::pin(async move { Self::resolve(tx, &names).await })
            })
            .await
    }

    /// Rates an existing user on a set of skills
    pub async fn link_skills_to_user(
        &self,
        user_id: Uuid,
        skills: Vec<SkillInput>,
    ) -> EngineResult<Vec<UserSkill>> {
        self.coordinator
            .run("link_user_skills", move |tx| {
                Box::pin(async move {
                    if tx.find_user(user_id).await?.is_none() {
                        return Err(EngineError::not_found(EntityKind::User, user_id));
                    }
                    Self::link_user_skills(tx, user_id, &skills).await
                })
            })
            .await
    }

    /// Creates a curated (verified) skill, or verifies an existing one
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use crewline_shared::engine::Engine;
    /// # async fn example(engine: Engine) -> Result<(), crewline_shared::error::EngineError> {
    /// let skill = engine.skills().create_curated_skill("PostgreSQL".into()).await?;
    /// assert!(skill.verified);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create_curated_skill(&self, name: String) -> EngineResult<Skill> {
        self.coordinator
            .run("create_curated_skill", move |tx| {
                Box::pin(async move {
                    let skill = tx.upsert_verified_skill(name.trim()).await?;
                    debug!(skill_id = %skill.id, name = %skill.name, "Curated skill");
                    Ok(skill)
                })
            })
            .await
    }

    /// Points `alias` at an existing skill
    ///
    /// Returns the skill the alias now resolves to.
    ///
    /// # Errors
    ///
    /// - `NotFound` when `skill_id` does not exist
    /// - `SkillNameTaken` when the alias is already a skill name or an alias
    pub async fn register_alias(&self, alias: String, skill_id: Uuid) -> EngineResult<Skill> {
        self.coordinator
            .run("register_alias", move |tx| {
                Box::pin(async move {
                    let alias = alias.trim().to_string();
                    let taken = tx.find_skills_by_names(&[alias.clone()]).await?;
                    if let Some(existing) = taken.into_iter().next() {
                        // An alias equal to a skill name would never be consulted
                        return Err(EngineError::SkillNameTaken(existing.name));
                    }

                    match tx.add_skill_alias(&alias, skill_id).await {
                        Ok(()) => {}
                        Err(e) if e.constraint() == Some(constraints::SKILL_ALIASES_SKILL_FK) => {
                            return Err(EngineError::not_found(EntityKind::Skill, skill_id));
                        }
                        Err(e) if e.is_unique_violation_of(constraints::SKILL_ALIASES_ALIAS) => {
                            return Err(EngineError::SkillNameTaken(alias));
                        }
                        Err(e) => return Err(e.into()),
                    }

                    let mut resolved = Self::resolve(tx, &[alias.clone()]).await?;
                    resolved
                        .remove(&alias)
                        .ok_or_else(|| EngineError::not_found(EntityKind::Skill, skill_id))
                })
            })
            .await
    }
}
