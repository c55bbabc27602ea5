/// Integration tests for skill resolution, curation and aliases
///
/// Run with: cargo test --test skill_tests
mod common;

use common::Fixture;
use crewline_shared::engine::SkillInput;
use crewline_shared::error::{EngineError, EntityKind};
use crewline_shared::models::{Proficiency, Role};
use crewline_shared::store::StoreTx;
use uuid::Uuid;

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_resolution_is_idempotent_across_case() {
    let fx = Fixture::new();
    let skills = fx.engine.skills();

    let first = skills
        .resolve_skills(names(&["React", "GraphQL"]))
        .await
        .expect("first resolve");
    let second = skills
        .resolve_skills(names(&["react", "  GRAPHQL ", "Docker"]))
        .await
        .expect("second resolve");

    assert_eq!(first["React"].id, second["react"].id);
    assert_eq!(first["GraphQL"].id, second["GRAPHQL"].id);
    // The first spelling seen becomes the canonical name
    assert_eq!(second["react"].name, "React");
    assert!(!second["Docker"].verified);
    assert_eq!(second.len(), 3);
}

#[tokio::test]
async fn test_one_batch_with_case_variants_creates_one_skill() {
    let fx = Fixture::new();

    let resolved = fx
        .engine
        .skills()
        .resolve_skills(names(&["Terraform", "terraform", "TERRAFORM", " ", ""]))
        .await
        .expect("resolve");

    assert_eq!(resolved.len(), 3);
    let id = resolved["Terraform"].id;
    assert!(resolved.values().all(|s| s.id == id));
}

#[tokio::test]
async fn test_empty_input_resolves_to_nothing() {
    let fx = Fixture::new();
    // Even a broken store is never consulted
    fx.store.fail_on("find_skills_by_names");

    let resolved = fx
        .engine
        .skills()
        .resolve_skills(Vec::new())
        .await
        .expect("resolve");
    assert!(resolved.is_empty());
}

#[tokio::test]
async fn test_curated_skill_verifies_existing_name() {
    let fx = Fixture::new();
    let skills = fx.engine.skills();

    let discovered = skills
        .resolve_skills(names(&["kubernetes"]))
        .await
        .expect("resolve");
    assert!(!discovered["kubernetes"].verified);

    let curated = skills
        .create_curated_skill("Kubernetes".to_string())
        .await
        .expect("curate");
    assert_eq!(curated.id, discovered["kubernetes"].id);
    assert!(curated.verified);

    let again = skills
        .create_curated_skill(" KUBERNETES ".to_string())
        .await
        .expect("curate again");
    assert_eq!(again.id, curated.id);
}

#[tokio::test]
async fn test_alias_resolves_to_its_skill() {
    let fx = Fixture::new();
    let skills = fx.engine.skills();
    let postgres = skills
        .create_curated_skill("PostgreSQL".to_string())
        .await
        .expect("curate");

    let target = skills
        .register_alias("Postgres".to_string(), postgres.id)
        .await
        .expect("alias");
    assert_eq!(target.id, postgres.id);

    let resolved = skills
        .resolve_skills(names(&["postgres", "POSTGRESQL"]))
        .await
        .expect("resolve");
    assert_eq!(resolved["postgres"].id, postgres.id);
    assert_eq!(resolved["POSTGRESQL"].id, postgres.id);
}

#[tokio::test]
async fn test_alias_conflicts_are_rejected() {
    let fx = Fixture::new();
    let skills = fx.engine.skills();
    let postgres = skills
        .create_curated_skill("PostgreSQL".to_string())
        .await
        .expect("curate");
    let mysql = skills
        .create_curated_skill("MySQL".to_string())
        .await
        .expect("curate");
    skills
        .register_alias("pg".to_string(), postgres.id)
        .await
        .expect("alias");

    let err = skills
        .register_alias("mysql".to_string(), postgres.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SkillNameTaken(ref name) if name == "MySQL"));

    let err = skills
        .register_alias("PG".to_string(), mysql.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SkillNameTaken(_)));

    let missing = Uuid::new_v4();
    let err = skills
        .register_alias("maria".to_string(), missing)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { entity: EntityKind::Skill, id } if id == missing));
}

#[tokio::test]
async fn test_link_skills_to_user_upserts_ratings() {
    let fx = Fixture::new();
    let engineer = fx.user("eve@crewline.dev", Role::Engineer, None).await;
    let skills = fx.engine.skills();

    skills
        .link_skills_to_user(engineer.id, vec![SkillInput::new("Rust")])
        .await
        .expect("first link");
    let linked = skills
        .link_skills_to_user(
            engineer.id,
            vec![SkillInput::with_proficiency("RUST", "Expert")],
        )
        .await
        .expect("second link");

    assert_eq!(linked.len(), 1);
    let stored = fx.user_skills(engineer.id).await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].proficiency, Proficiency::Expert);
}

#[tokio::test]
async fn test_link_skills_to_missing_user() {
    let fx = Fixture::new();
    let ghost = Uuid::new_v4();

    let err = fx
        .engine
        .skills()
        .link_skills_to_user(ghost, vec![SkillInput::new("Rust")])
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::NotFound { entity: EntityKind::User, id } if id == ghost));
    // Nothing was created on the way
    let mut tx = fx.tx().await;
    let created = tx.find_skills_by_names(&names(&["rust"])).await.expect("skills");
    tx.rollback().await.expect("rollback");
    assert!(created.is_empty());
}
