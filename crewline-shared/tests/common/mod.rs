//! Shared fixtures for engine integration tests
//!
//! Everything runs against the in-memory store. Seed data is written through
//! a raw store transaction so tests start from exactly the state they need.

#![allow(dead_code)]

use std::sync::Arc;

use crewline_shared::collaborators::{RecommendationNotifier, SkillExtractor};
use crewline_shared::config::EngineSettings;
use crewline_shared::engine::Engine;
use crewline_shared::models::{
    CreateProject, CreateTask, CreateTeam, CreateUser, Invitation, Project, Role, Task,
    TaskPriority, Team, User, UserSkill,
};
use crewline_shared::store::{InMemoryStore, Store, StoreTx};
use uuid::Uuid;

pub struct Fixture {
    pub store: InMemoryStore,
    pub engine: Engine,
}

impl Fixture {
    pub fn new() -> Self {
        let store = InMemoryStore::new();
        let engine = Engine::builder(Arc::new(store.clone())).build();
        Self { store, engine }
    }

    pub fn with_extractor(extractor: Arc<dyn SkillExtractor>) -> Self {
        let store = InMemoryStore::new();
        let engine = Engine::builder(Arc::new(store.clone()))
            .extractor(extractor)
            .build();
        Self { store, engine }
    }

    pub fn with_notifier(notifier: Arc<dyn RecommendationNotifier>, settings: EngineSettings) -> Self {
        let store = InMemoryStore::new();
        let engine = Engine::builder(Arc::new(store.clone()))
            .settings(settings)
            .notifier(notifier)
            .build();
        Self { store, engine }
    }

    pub async fn tx(&self) -> Box<dyn StoreTx> {
        self.store.begin().await.expect("begin")
    }

    pub async fn team(&self, name: &str) -> Team {
        let mut tx = self.tx().await;
        let team = tx
            .insert_team(CreateTeam {
                name: name.to_string(),
                manager_id: None,
            })
            .await
            .expect("insert team");
        tx.commit().await.expect("commit");
        team
    }

    pub async fn user(&self, email: &str, role: Role, team_id: Option<Uuid>) -> User {
        let mut tx = self.tx().await;
        let user = tx
            .insert_user(CreateUser {
                name: email.split('@').next().unwrap_or(email).to_string(),
                email: email.to_string(),
                password_hash: "argon2-hash".to_string(),
                role,
                team_id,
            })
            .await
            .expect("insert user");
        tx.commit().await.expect("commit");
        user
    }

    pub async fn admin(&self) -> User {
        self.user("admin@crewline.dev", Role::Admin, None).await
    }

    /// A team with a manager who belongs to it
    pub async fn managed_team(&self, name: &str, manager_email: &str) -> (Team, User) {
        let team = self.team(name).await;
        let manager = self.user(manager_email, Role::Manager, Some(team.id)).await;

        let mut tx = self.tx().await;
        let team = tx
            .set_team_manager(team.id, Some(manager.id))
            .await
            .expect("set manager")
            .expect("team exists");
        tx.commit().await.expect("commit");
        (team, manager)
    }

    pub async fn project(&self, team_id: Uuid, name: &str) -> Project {
        let mut tx = self.tx().await;
        let project = tx
            .insert_project(CreateProject {
                team_id,
                name: name.to_string(),
                description: String::new(),
            })
            .await
            .expect("insert project");
        tx.commit().await.expect("commit");
        project
    }

    pub async fn task(&self, project_id: Uuid, title: &str) -> Task {
        let mut tx = self.tx().await;
        let task = tx
            .insert_task(CreateTask {
                project_id,
                title: title.to_string(),
                description: String::new(),
                priority: TaskPriority::Medium,
            })
            .await
            .expect("insert task");
        tx.commit().await.expect("commit");
        task
    }

    // Committed-state readers; each opens and discards its own transaction

    pub async fn find_user(&self, id: Uuid) -> Option<User> {
        let mut tx = self.tx().await;
        let user = tx.find_user(id).await.expect("find user");
        tx.rollback().await.expect("rollback");
        user
    }

    pub async fn reload_user(&self, id: Uuid) -> User {
        self.find_user(id).await.expect("user exists")
    }

    pub async fn reload_team(&self, id: Uuid) -> Team {
        let mut tx = self.tx().await;
        let team = tx.find_team(id).await.expect("find team").expect("team exists");
        tx.rollback().await.expect("rollback");
        team
    }

    pub async fn reload_project(&self, id: Uuid) -> Project {
        let mut tx = self.tx().await;
        let project = tx
            .find_project(id)
            .await
            .expect("find project")
            .expect("project exists");
        tx.rollback().await.expect("rollback");
        project
    }

    pub async fn reload_task(&self, id: Uuid) -> Task {
        let mut tx = self.tx().await;
        let task = tx.find_task(id).await.expect("find task").expect("task exists");
        tx.rollback().await.expect("rollback");
        task
    }

    pub async fn reload_invitation(&self, id: Uuid) -> Invitation {
        let mut tx = self.tx().await;
        let invitation = tx
            .find_invitation(id)
            .await
            .expect("find invitation")
            .expect("invitation exists");
        tx.rollback().await.expect("rollback");
        invitation
    }

    pub async fn user_skills(&self, user_id: Uuid) -> Vec<UserSkill> {
        let mut tx = self.tx().await;
        let skills = tx.user_skills(user_id).await.expect("user skills");
        tx.rollback().await.expect("rollback");
        skills
    }

    pub async fn task_skill_ids(&self, task_id: Uuid) -> Vec<Uuid> {
        let mut tx = self.tx().await;
        let ids = tx.task_skill_ids(task_id).await.expect("task skills");
        tx.rollback().await.expect("rollback");
        ids
    }
}
