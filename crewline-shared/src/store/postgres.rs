//! PostgreSQL store backed by sqlx
//!
//! Every [`StoreTx`] wraps one `sqlx::Transaction`. Model query functions are
//! handed `&mut *self.tx`, so all of a unit's statements share the same
//! database transaction. Dropping the transaction without committing rolls it
//! back (sqlx issues the ROLLBACK on drop).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use super::{Store, StoreResult, StoreTx};
use crate::models::{
    AliasMatch, Availability, CreateInvitation, CreateProject, CreateTask, CreateTeam, CreateUser,
    Invitation, Proficiency, Project, Role, Skill, Task, Team, User, UserSkill,
};

/// Store over a PostgreSQL connection pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wraps an existing pool (see [`crate::db::pool::create_pool`])
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        debug!("Opened database transaction");
        Ok(Box::new(PgStoreTx { tx }))
    }
}

/// One open PostgreSQL transaction
pub struct PgStoreTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgStoreTx {
    async fn insert_user(&mut self, data: CreateUser) -> StoreResult<User> {
        Ok(User::create(&mut *self.tx, data).await?)
    }

    async fn find_user(&mut self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&mut *self.tx, id).await?)
    }

    async fn set_user_availability(
        &mut self,
        id: Uuid,
        availability: Availability,
    ) -> StoreResult<Option<User>> {
        Ok(User::set_availability(&mut *self.tx, id, availability).await?)
    }

    async fn update_user_role(
        &mut self,
        id: Uuid,
        role: Role,
        team_id: Option<Uuid>,
    ) -> StoreResult<Option<User>> {
        Ok(User::update_role(&mut *self.tx, id, role, team_id).await?)
    }

    async fn delete_user(&mut self, id: Uuid) -> StoreResult<bool> {
        Ok(User::delete(&mut *self.tx, id).await?)
    }

    async fn insert_team(&mut self, data: CreateTeam) -> StoreResult<Team> {
        Ok(Team::create(&mut *self.tx, data).await?)
    }

    async fn find_team(&mut self, id: Uuid) -> StoreResult<Option<Team>> {
        Ok(Team::find_by_id(&mut *self.tx, id).await?)
    }

    async fn find_team_managed_by(&mut self, user_id: Uuid) -> StoreResult<Option<Team>> {
        Ok(Team::find_by_manager(&mut *self.tx, user_id).await?)
    }

    async fn set_team_manager(
        &mut self,
        team_id: Uuid,
        manager_id: Option<Uuid>,
    ) -> StoreResult<Option<Team>> {
        Ok(Team::set_manager(&mut *self.tx, team_id, manager_id).await?)
    }

    async fn insert_project(&mut self, data: CreateProject) -> StoreResult<Project> {
        Ok(Project::create(&mut *self.tx, data).await?)
    }

    async fn find_project(&mut self, id: Uuid) -> StoreResult<Option<Project>> {
        Ok(Project::find_by_id(&mut *self.tx, id).await?)
    }

    async fn archive_project(
        &mut self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Project>> {
        Ok(Project::archive(&mut *self.tx, id, at).await?)
    }

    async fn insert_task(&mut self, data: CreateTask) -> StoreResult<Task> {
        Ok(Task::create(&mut *self.tx, data).await?)
    }

    async fn find_task(&mut self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(Task::find_by_id(&mut *self.tx, id).await?)
    }

    async fn assign_task(&mut self, id: Uuid, assignee_id: Uuid) -> StoreResult<Option<Task>> {
        Ok(Task::assign(&mut *self.tx, id, assignee_id).await?)
    }

    async fn complete_task(&mut self, id: Uuid, at: DateTime<Utc>) -> StoreResult<Option<Task>> {
        Ok(Task::complete(&mut *self.tx, id, at).await?)
    }

    async fn tasks_assigned_to(&mut self, user_id: Uuid) -> StoreResult<Vec<Task>> {
        Ok(Task::list_assigned_to(&mut *self.tx, user_id).await?)
    }

    async fn release_tasks_assigned_to(&mut self, user_id: Uuid) -> StoreResult<Vec<Task>> {
        Ok(Task::release_assigned_to(&mut *self.tx, user_id).await?)
    }

    async fn active_tasks_in_project(&mut self, project_id: Uuid) -> StoreResult<Vec<Task>> {
        Ok(Task::list_active_in_project(&mut *self.tx, project_id).await?)
    }

    async fn archive_tasks_in_project(
        &mut self,
        project_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        Ok(Task::archive_in_project(&mut *self.tx, project_id, at).await?)
    }

    async fn link_task_skills(&mut self, task_id: Uuid, skill_ids: &[Uuid]) -> StoreResult<()> {
        Ok(Task::link_required_skills(&mut *self.tx, task_id, skill_ids).await?)
    }

    async fn task_skill_ids(&mut self, task_id: Uuid) -> StoreResult<Vec<Uuid>> {
        Ok(Task::required_skill_ids(&mut *self.tx, task_id).await?)
    }

    async fn find_skills_by_names(&mut self, names: &[String]) -> StoreResult<Vec<Skill>> {
        Ok(Skill::find_by_names(&mut *self.tx, names).await?)
    }

    async fn find_skills_by_aliases(&mut self, names: &[String]) -> StoreResult<Vec<AliasMatch>> {
        Ok(Skill::find_by_aliases(&mut *self.tx, names).await?)
    }

    async fn insert_unverified_skills(&mut self, names: &[String]) -> StoreResult<Vec<Skill>> {
        Ok(Skill::insert_unverified(&mut *self.tx, names).await?)
    }

    async fn upsert_verified_skill(&mut self, name: &str) -> StoreResult<Skill> {
        Ok(Skill::upsert_verified(&mut *self.tx, name).await?)
    }

    async fn add_skill_alias(&mut self, alias: &str, skill_id: Uuid) -> StoreResult<()> {
        Ok(Skill::add_alias(&mut *self.tx, alias, skill_id).await?)
    }

    async fn upsert_user_skills(
        &mut self,
        user_id: Uuid,
        links: &[(Uuid, Proficiency)],
    ) -> StoreResult<()> {
        Ok(UserSkill::upsert_many(&mut *self.tx, user_id, links).await?)
    }

    async fn user_skills(&mut self, user_id: Uuid) -> StoreResult<Vec<UserSkill>> {
        Ok(UserSkill::list_for_user(&mut *self.tx, user_id).await?)
    }

    async fn count_user_skills(&mut self, user_id: Uuid) -> StoreResult<i64> {
        Ok(UserSkill::count_for_user(&mut *self.tx, user_id).await?)
    }

    async fn insert_invitation(&mut self, data: CreateInvitation) -> StoreResult<Invitation> {
        Ok(Invitation::create(&mut *self.tx, data).await?)
    }

    async fn find_invitation(&mut self, id: Uuid) -> StoreResult<Option<Invitation>> {
        Ok(Invitation::find_by_id(&mut *self.tx, id).await?)
    }

    async fn find_pending_invitation_by_email(
        &mut self,
        email: &str,
    ) -> StoreResult<Option<Invitation>> {
        Ok(Invitation::find_pending_by_email(&mut *self.tx, email).await?)
    }

    async fn find_acceptable_invitation(
        &mut self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Invitation>> {
        Ok(Invitation::find_acceptable_by_token_hash(&mut *self.tx, token_hash, now).await?)
    }

    async fn mark_invitation_accepted(
        &mut self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Invitation>> {
        Ok(Invitation::mark_accepted(&mut *self.tx, id, at).await?)
    }

    async fn expire_stale_invitations(
        &mut self,
        now: DateTime<Utc>,
        email: Option<&str>,
    ) -> StoreResult<u64> {
        Ok(Invitation::expire_stale(&mut *self.tx, now, email).await?)
    }

    async fn count_invitations_sent_by(&mut self, inviter_id: Uuid) -> StoreResult<i64> {
        Ok(Invitation::count_sent_by(&mut *self.tx, inviter_id).await?)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        debug!("Committed database transaction");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx.rollback().await?;
        debug!("Rolled back database transaction");
        Ok(())
    }
}
