//! In-memory store for tests and embedded use
//!
//! A transaction takes the store-wide lock, works on a private copy of the
//! data and writes the copy back on commit. Transactions are therefore fully
//! serialized, and an uncommitted transaction is invisible to everyone else.
//!
//! Constraint and referential behaviour mirrors the PostgreSQL schema,
//! including the constraint names reported on violation (see
//! [`super::constraints`]).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{constraints, Store, StoreError, StoreResult, StoreTx};
use crate::models::skill::normalize_skill_name;
use crate::models::{
    AliasMatch, Availability, CreateInvitation, CreateProject, CreateTask, CreateTeam, CreateUser,
    Invitation, InvitationStatus, Proficiency, Project, Role, Skill, Task, TaskStatus, Team, User,
    UserSkill,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    teams: HashMap<Uuid, Team>,
    projects: HashMap<Uuid, Project>,
    tasks: HashMap<Uuid, Task>,
    skills: HashMap<Uuid, Skill>,
    /// lower(alias) → (alias as registered, skill id)
    aliases: HashMap<String, (String, Uuid)>,
    user_skills: HashMap<(Uuid, Uuid), Proficiency>,
    task_skills: HashSet<(Uuid, Uuid)>,
    invitations: HashMap<Uuid, Invitation>,
}

impl MemoryState {
    fn skill_by_normalized_name(&self, normalized: &str) -> Option<&Skill> {
        self.skills
            .values()
            .find(|s| normalize_skill_name(&s.name) == normalized)
    }
}

/// Thread-safe in-memory store
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
    faults: Arc<StdMutex<HashSet<String>>>,
}

impl InMemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later call of the named [`StoreTx`] method fail with
    /// [`StoreError::Unavailable`]
    pub fn fail_on(&self, operation: &str) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(operation.to_string());
    }

    /// Removes all injected failures
    pub fn clear_faults(&self) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            working,
            faults: self.faults.clone(),
        }))
    }
}

/// One open in-memory transaction
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    faults: Arc<StdMutex<HashSet<String>>>,
}

impl MemoryTx {
    fn check(&self, operation: &str) -> StoreResult<()> {
        let faults = self.faults.lock().unwrap_or_else(PoisonError::into_inner);
        if faults.contains(operation) {
            return Err(StoreError::Unavailable(format!(
                "injected failure in {operation}"
            )));
        }
        Ok(())
    }

    fn require_team(&self, team_id: Option<Uuid>, constraint: &str) -> StoreResult<()> {
        match team_id {
            Some(id) if !self.working.teams.contains_key(&id) => {
                Err(StoreError::ForeignKeyViolation(constraint.to_string()))
            }
            _ => Ok(()),
        }
    }
}

fn by_creation(mut tasks: Vec<Task>) -> Vec<Task> {
    tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    tasks
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn insert_user(&mut self, data: CreateUser) -> StoreResult<User> {
        self.check("insert_user")?;
        let email = data.email.to_lowercase();
        if self
            .working
            .users
            .values()
            .any(|u| u.email.to_lowercase() == email)
        {
            return Err(StoreError::UniqueViolation(constraints::USERS_EMAIL.to_string()));
        }
        self.require_team(data.team_id, constraints::USERS_TEAM_FK)?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: data.name,
            email: data.email,
            password_hash: data.password_hash,
            role: data.role,
            team_id: data.team_id,
            availability: Availability::Available,
            created_at: now,
            updated_at: now,
        };
        self.working.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&mut self, id: Uuid) -> StoreResult<Option<User>> {
        self.check("find_user")?;
        Ok(self.working.users.get(&id).cloned())
    }

    async fn set_user_availability(
        &mut self,
        id: Uuid,
        availability: Availability,
    ) -> StoreResult<Option<User>> {
        self.check("set_user_availability")?;
        Ok(self.working.users.get_mut(&id).map(|user| {
            user.availability = availability;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn update_user_role(
        &mut self,
        id: Uuid,
        role: Role,
        team_id: Option<Uuid>,
    ) -> StoreResult<Option<User>> {
        self.check("update_user_role")?;
        self.require_team(team_id, constraints::USERS_TEAM_FK)?;
        Ok(self.working.users.get_mut(&id).map(|user| {
            user.role = role;
            user.team_id = team_id;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn delete_user(&mut self, id: Uuid) -> StoreResult<bool> {
        self.check("delete_user")?;
        if self.working.users.remove(&id).is_none() {
            return Ok(false);
        }

        // ON DELETE CASCADE
        self.working.user_skills.retain(|(user_id, _), _| *user_id != id);
        self.working.invitations.retain(|_, inv| inv.inviter_id != id);

        // ON DELETE SET NULL
        for task in self.working.tasks.values_mut() {
            if task.assignee_id == Some(id) {
                task.assignee_id = None;
            }
        }
        for team in self.working.teams.values_mut() {
            if team.manager_id == Some(id) {
                team.manager_id = None;
            }
        }

        Ok(true)
    }

    async fn insert_team(&mut self, data: CreateTeam) -> StoreResult<Team> {
        self.check("insert_team")?;
        if self.working.teams.values().any(|t| t.name == data.name) {
            return Err(StoreError::UniqueViolation(constraints::TEAMS_NAME.to_string()));
        }
        if let Some(manager_id) = data.manager_id {
            if self.working.teams.values().any(|t| t.manager_id == Some(manager_id)) {
                return Err(StoreError::UniqueViolation(constraints::TEAMS_MANAGER.to_string()));
            }
            if !self.working.users.contains_key(&manager_id) {
                return Err(StoreError::ForeignKeyViolation(
                    constraints::TEAMS_MANAGER_FK.to_string(),
                ));
            }
        }

        let team = Team {
            id: Uuid::new_v4(),
            name: data.name,
            manager_id: data.manager_id,
            created_at: Utc::now(),
        };
        self.working.teams.insert(team.id, team.clone());
        Ok(team)
    }

    async fn find_team(&mut self, id: Uuid) -> StoreResult<Option<Team>> {
        self.check("find_team")?;
        Ok(self.working.teams.get(&id).cloned())
    }

    async fn find_team_managed_by(&mut self, user_id: Uuid) -> StoreResult<Option<Team>> {
        self.check("find_team_managed_by")?;
        Ok(self
            .working
            .teams
            .values()
            .find(|t| t.manager_id == Some(user_id))
            .cloned())
    }

    async fn set_team_manager(
        &mut self,
        team_id: Uuid,
        manager_id: Option<Uuid>,
    ) -> StoreResult<Option<Team>> {
        self.check("set_team_manager")?;
        if let Some(manager_id) = manager_id {
            if self
                .working
                .teams
                .values()
                .any(|t| t.id != team_id && t.manager_id == Some(manager_id))
            {
                return Err(StoreError::UniqueViolation(constraints::TEAMS_MANAGER.to_string()));
            }
            if !self.working.users.contains_key(&manager_id) {
                return Err(StoreError::ForeignKeyViolation(
                    constraints::TEAMS_MANAGER_FK.to_string(),
                ));
            }
        }

        Ok(self.working.teams.get_mut(&team_id).map(|team| {
            team.manager_id = manager_id;
            team.clone()
        }))
    }

    async fn insert_project(&mut self, data: CreateProject) -> StoreResult<Project> {
        self.check("insert_project")?;
        self.require_team(Some(data.team_id), constraints::PROJECTS_TEAM_FK)?;

        let project = Project {
            id: Uuid::new_v4(),
            team_id: data.team_id,
            name: data.name,
            description: data.description,
            archived: false,
            archived_at: None,
            created_at: Utc::now(),
        };
        self.working.projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn find_project(&mut self, id: Uuid) -> StoreResult<Option<Project>> {
        self.check("find_project")?;
        Ok(self.working.projects.get(&id).cloned())
    }

    async fn archive_project(
        &mut self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Project>> {
        self.check("archive_project")?;
        Ok(self
            .working
            .projects
            .get_mut(&id)
            .filter(|p| !p.archived)
            .map(|project| {
                project.archived = true;
                project.archived_at = Some(at);
                project.clone()
            }))
    }

    async fn insert_task(&mut self, data: CreateTask) -> StoreResult<Task> {
        self.check("insert_task")?;
        if !self.working.projects.contains_key(&data.project_id) {
            return Err(StoreError::ForeignKeyViolation(
                constraints::TASKS_PROJECT_FK.to_string(),
            ));
        }

        let task = Task {
            id: Uuid::new_v4(),
            project_id: data.project_id,
            title: data.title,
            description: data.description,
            status: TaskStatus::Open,
            priority: data.priority,
            assignee_id: None,
            created_at: Utc::now(),
            completed_at: None,
            archived: false,
            archived_at: None,
        };
        self.working.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn find_task(&mut self, id: Uuid) -> StoreResult<Option<Task>> {
        self.check("find_task")?;
        Ok(self.working.tasks.get(&id).cloned())
    }

    async fn assign_task(&mut self, id: Uuid, assignee_id: Uuid) -> StoreResult<Option<Task>> {
        self.check("assign_task")?;
        if !self.working.users.contains_key(&assignee_id) {
            return Err(StoreError::ForeignKeyViolation(
                constraints::TASKS_ASSIGNEE_FK.to_string(),
            ));
        }
        Ok(self.working.tasks.get_mut(&id).map(|task| {
            task.assignee_id = Some(assignee_id);
            task.status = TaskStatus::InProgress;
            task.clone()
        }))
    }

    async fn complete_task(&mut self, id: Uuid, at: DateTime<Utc>) -> StoreResult<Option<Task>> {
        self.check("complete_task")?;
        Ok(self.working.tasks.get_mut(&id).map(|task| {
            task.status = TaskStatus::Done;
            task.completed_at = Some(at);
            task.clone()
        }))
    }

    async fn tasks_assigned_to(&mut self, user_id: Uuid) -> StoreResult<Vec<Task>> {
        self.check("tasks_assigned_to")?;
        Ok(by_creation(
            self.working
                .tasks
                .values()
                .filter(|t| t.assignee_id == Some(user_id))
                .cloned()
                .collect(),
        ))
    }

    async fn release_tasks_assigned_to(&mut self, user_id: Uuid) -> StoreResult<Vec<Task>> {
        self.check("release_tasks_assigned_to")?;
        let mut released = Vec::new();
        for task in self.working.tasks.values_mut() {
            if task.assignee_id == Some(user_id) {
                task.assignee_id = None;
                task.status = TaskStatus::Open;
                task.completed_at = None;
                released.push(task.clone());
            }
        }
        Ok(by_creation(released))
    }

    async fn active_tasks_in_project(&mut self, project_id: Uuid) -> StoreResult<Vec<Task>> {
        self.check("active_tasks_in_project")?;
        Ok(by_creation(
            self.working
                .tasks
                .values()
                .filter(|t| t.project_id == project_id && !t.archived)
                .cloned()
                .collect(),
        ))
    }

    async fn archive_tasks_in_project(
        &mut self,
        project_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        self.check("archive_tasks_in_project")?;
        let mut archived = 0;
        for task in self.working.tasks.values_mut() {
            if task.project_id == project_id && !task.archived {
                task.archived = true;
                task.archived_at = Some(at);
                archived += 1;
            }
        }
        Ok(archived)
    }

    async fn link_task_skills(&mut self, task_id: Uuid, skill_ids: &[Uuid]) -> StoreResult<()> {
        self.check("link_task_skills")?;
        if let Some(missing) = skill_ids
            .iter()
            .find(|id| !self.working.skills.contains_key(id))
        {
            return Err(StoreError::ForeignKeyViolation(format!(
                "{} ({missing})",
                constraints::TASK_SKILLS_SKILL_FK
            )));
        }
        for skill_id in skill_ids {
            self.working.task_skills.insert((task_id, *skill_id));
        }
        Ok(())
    }

    async fn task_skill_ids(&mut self, task_id: Uuid) -> StoreResult<Vec<Uuid>> {
        self.check("task_skill_ids")?;
        Ok(self
            .working
            .task_skills
            .iter()
            .filter(|(t, _)| *t == task_id)
            .map(|(_, s)| *s)
            .collect())
    }

    async fn find_skills_by_names(&mut self, names: &[String]) -> StoreResult<Vec<Skill>> {
        self.check("find_skills_by_names")?;
        let wanted: HashSet<String> = names.iter().map(|n| normalize_skill_name(n)).collect();
        Ok(self
            .working
            .skills
            .values()
            .filter(|s| wanted.contains(&normalize_skill_name(&s.name)))
            .cloned()
            .collect())
    }

    async fn find_skills_by_aliases(&mut self, names: &[String]) -> StoreResult<Vec<AliasMatch>> {
        self.check("find_skills_by_aliases")?;
        let wanted: HashSet<String> = names.iter().map(|n| normalize_skill_name(n)).collect();
        Ok(wanted
            .iter()
            .filter_map(|key| self.working.aliases.get(key))
            .filter_map(|(alias, skill_id)| {
                self.working.skills.get(skill_id).map(|skill| AliasMatch {
                    alias: alias.clone(),
                    skill: skill.clone(),
                })
            })
            .collect())
    }

    async fn insert_unverified_skills(&mut self, names: &[String]) -> StoreResult<Vec<Skill>> {
        self.check("insert_unverified_skills")?;
        let mut inserted = Vec::new();
        for name in names {
            let normalized = normalize_skill_name(name);
            if normalized.is_empty() || self.working.skill_by_normalized_name(&normalized).is_some() {
                continue;
            }
            let skill = Skill {
                id: Uuid::new_v4(),
                name: name.trim().to_string(),
                verified: false,
                created_at: Utc::now(),
            };
            self.working.skills.insert(skill.id, skill.clone());
            inserted.push(skill);
        }
        Ok(inserted)
    }

    async fn upsert_verified_skill(&mut self, name: &str) -> StoreResult<Skill> {
        self.check("upsert_verified_skill")?;
        let normalized = normalize_skill_name(name);
        let existing = self
            .working
            .skill_by_normalized_name(&normalized)
            .map(|s| s.id);

        let skill = match existing.and_then(|id| self.working.skills.get_mut(&id)) {
            Some(skill) => {
                skill.verified = true;
                skill.clone()
            }
            None => {
                let skill = Skill {
                    id: Uuid::new_v4(),
                    name: name.trim().to_string(),
                    verified: true,
                    created_at: Utc::now(),
                };
                self.working.skills.insert(skill.id, skill.clone());
                skill
            }
        };
        Ok(skill)
    }

    async fn add_skill_alias(&mut self, alias: &str, skill_id: Uuid) -> StoreResult<()> {
        self.check("add_skill_alias")?;
        let key = normalize_skill_name(alias);
        if self.working.aliases.contains_key(&key) {
            return Err(StoreError::UniqueViolation(
                constraints::SKILL_ALIASES_ALIAS.to_string(),
            ));
        }
        if !self.working.skills.contains_key(&skill_id) {
            return Err(StoreError::ForeignKeyViolation(
                constraints::SKILL_ALIASES_SKILL_FK.to_string(),
            ));
        }
        self.working
            .aliases
            .insert(key, (alias.trim().to_string(), skill_id));
        Ok(())
    }

    async fn upsert_user_skills(
        &mut self,
        user_id: Uuid,
        links: &[(Uuid, Proficiency)],
    ) -> StoreResult<()> {
        self.check("upsert_user_skills")?;
        if !self.working.users.contains_key(&user_id) {
            return Err(StoreError::ForeignKeyViolation(
                constraints::USER_SKILLS_USER_FK.to_string(),
            ));
        }
        for (skill_id, proficiency) in links {
            if !self.working.skills.contains_key(skill_id) {
                return Err(StoreError::ForeignKeyViolation(
                    constraints::USER_SKILLS_SKILL_FK.to_string(),
                ));
            }
            self.working
                .user_skills
                .insert((user_id, *skill_id), *proficiency);
        }
        Ok(())
    }

    async fn user_skills(&mut self, user_id: Uuid) -> StoreResult<Vec<UserSkill>> {
        self.check("user_skills")?;
        Ok(self
            .working
            .user_skills
            .iter()
            .filter(|((u, _), _)| *u == user_id)
            .map(|((u, s), p)| UserSkill {
                user_id: *u,
                skill_id: *s,
                proficiency: *p,
            })
            .collect())
    }

    async fn count_user_skills(&mut self, user_id: Uuid) -> StoreResult<i64> {
        self.check("count_user_skills")?;
        let count = self
            .working
            .user_skills
            .keys()
            .filter(|(u, _)| *u == user_id)
            .count();
        Ok(count as i64)
    }

    async fn insert_invitation(&mut self, data: CreateInvitation) -> StoreResult<Invitation> {
        self.check("insert_invitation")?;
        let email = data.email.to_lowercase();
        if self
            .working
            .invitations
            .values()
            .any(|i| i.status == InvitationStatus::Pending && i.email.to_lowercase() == email)
        {
            return Err(StoreError::UniqueViolation(
                constraints::INVITATIONS_PENDING_EMAIL.to_string(),
            ));
        }
        if self
            .working
            .invitations
            .values()
            .any(|i| i.token_hash == data.token_hash)
        {
            return Err(StoreError::UniqueViolation(
                constraints::INVITATIONS_TOKEN_HASH.to_string(),
            ));
        }
        if !self.working.users.contains_key(&data.inviter_id) {
            return Err(StoreError::ForeignKeyViolation(
                constraints::INVITATIONS_INVITER_FK.to_string(),
            ));
        }
        self.require_team(data.team_id, constraints::INVITATIONS_TEAM_FK)?;

        let invitation = Invitation {
            id: Uuid::new_v4(),
            email: data.email,
            token_hash: data.token_hash,
            role: data.role,
            inviter_id: data.inviter_id,
            team_id: data.team_id,
            status: InvitationStatus::Pending,
            created_at: data.created_at,
            expires_at: data.expires_at,
            accepted_at: None,
        };
        self.working
            .invitations
            .insert(invitation.id, invitation.clone());
        Ok(invitation)
    }

    async fn find_invitation(&mut self, id: Uuid) -> StoreResult<Option<Invitation>> {
        self.check("find_invitation")?;
        Ok(self.working.invitations.get(&id).cloned())
    }

    async fn find_pending_invitation_by_email(
        &mut self,
        email: &str,
    ) -> StoreResult<Option<Invitation>> {
        self.check("find_pending_invitation_by_email")?;
        let email = email.to_lowercase();
        Ok(self
            .working
            .invitations
            .values()
            .find(|i| i.status == InvitationStatus::Pending && i.email.to_lowercase() == email)
            .cloned())
    }

    async fn find_acceptable_invitation(
        &mut self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Invitation>> {
        self.check("find_acceptable_invitation")?;
        Ok(self
            .working
            .invitations
            .values()
            .find(|i| i.token_hash == token_hash && i.is_acceptable(now))
            .cloned())
    }

    async fn mark_invitation_accepted(
        &mut self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Invitation>> {
        self.check("mark_invitation_accepted")?;
        Ok(self
            .working
            .invitations
            .get_mut(&id)
            .filter(|i| i.status == InvitationStatus::Pending)
            .map(|invitation| {
                invitation.status = InvitationStatus::Accepted;
                invitation.accepted_at = Some(at);
                invitation.clone()
            }))
    }

    async fn expire_stale_invitations(
        &mut self,
        now: DateTime<Utc>,
        email: Option<&str>,
    ) -> StoreResult<u64> {
        self.check("expire_stale_invitations")?;
        let email = email.map(str::to_lowercase);
        let mut expired = 0;
        for invitation in self.working.invitations.values_mut() {
            let matches_email = email
                .as_deref()
                .map_or(true, |e| invitation.email.to_lowercase() == e);
            if invitation.status == InvitationStatus::Pending
                && invitation.expires_at <= now
                && matches_email
            {
                invitation.status = InvitationStatus::Expired;
                expired += 1;
            }
        }
        Ok(expired)
    }

    async fn count_invitations_sent_by(&mut self, inviter_id: Uuid) -> StoreResult<i64> {
        self.check("count_invitations_sent_by")?;
        let count = self
            .working
            .invitations
            .values()
            .filter(|i| i.inviter_id == inviter_id)
            .count();
        Ok(count as i64)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.check("commit")?;
        let MemoryTx {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> CreateUser {
        CreateUser {
            name: "Test User".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role: Role::Engineer,
            team_id: None,
        }
    }

    #[tokio::test]
    async fn test_uncommitted_writes_are_discarded() {
        let store = InMemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        let user = tx.insert_user(new_user("a@example.com")).await.unwrap();
        tx.rollback().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert!(tx.find_user(user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_dropped_transaction_is_discarded() {
        let store = InMemoryStore::new();

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_user(new_user("a@example.com")).await.unwrap();
        }

        let mut tx = store.begin().await.unwrap();
        assert!(tx.find_pending_invitation_by_email("a@example.com").await.unwrap().is_none());
        let err = tx.insert_user(new_user("a@example.com")).await;
        assert!(err.is_ok(), "email should be free after the dropped insert");
    }

    #[tokio::test]
    async fn test_committed_writes_are_visible() {
        let store = InMemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        let user = tx.insert_user(new_user("a@example.com")).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.find_user(user.id).await.unwrap(), Some(user));
    }

    #[tokio::test]
    async fn test_email_unique_case_insensitive() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_user(new_user("Dup@Example.com")).await.unwrap();

        let err = tx.insert_user(new_user("dup@example.com")).await.unwrap_err();
        assert!(err.is_unique_violation_of(constraints::USERS_EMAIL));
    }

    #[tokio::test]
    async fn test_delete_user_applies_referential_actions() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();

        let user = tx.insert_user(new_user("gone@example.com")).await.unwrap();
        let team = tx
            .insert_team(CreateTeam {
                name: "Core".to_string(),
                manager_id: Some(user.id),
            })
            .await
            .unwrap();
        let project = tx
            .insert_project(CreateProject {
                team_id: team.id,
                name: "P".to_string(),
                description: String::new(),
            })
            .await
            .unwrap();
        let task = tx
            .insert_task(CreateTask {
                project_id: project.id,
                title: "T".to_string(),
                description: String::new(),
                priority: Default::default(),
            })
            .await
            .unwrap();
        tx.assign_task(task.id, user.id).await.unwrap();
        let skills = tx
            .insert_unverified_skills(&["Rust".to_string()])
            .await
            .unwrap();
        tx.upsert_user_skills(user.id, &[(skills[0].id, Proficiency::Expert)])
            .await
            .unwrap();

        assert!(tx.delete_user(user.id).await.unwrap());

        assert_eq!(tx.count_user_skills(user.id).await.unwrap(), 0);
        assert_eq!(tx.find_task(task.id).await.unwrap().unwrap().assignee_id, None);
        assert_eq!(tx.find_team(team.id).await.unwrap().unwrap().manager_id, None);
        assert!(!tx.delete_user(user.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let store = InMemoryStore::new();
        store.fail_on("find_user");

        let mut tx = store.begin().await.unwrap();
        let err = tx.find_user(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));

        store.clear_faults();
        assert!(tx.find_user(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_unverified_skips_existing_names() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();

        let first = tx
            .insert_unverified_skills(&["Go".to_string(), "go".to_string()])
            .await
            .unwrap();
        assert_eq!(first.len(), 1);

        let second = tx.insert_unverified_skills(&["GO".to_string()]).await.unwrap();
        assert!(second.is_empty());
    }
}
