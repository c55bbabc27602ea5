//! Database models for Crewline
//!
//! Each model owns its SQL. Query functions take a `&mut PgConnection` so the
//! Postgres store can run them inside one transaction.
//!
//! # Models
//!
//! - `user`: people, their role and availability
//! - `team`: teams and their (single) manager
//! - `project`: projects owned by a team
//! - `task`: tasks, assignment and required skills
//! - `skill`: skill catalog, aliases and user-skill links
//! - `invitation`: onboarding invitations

pub mod invitation;
pub mod project;
pub mod skill;
pub mod task;
pub mod team;
pub mod user;

pub use invitation::{CreateInvitation, Invitation, InvitationStatus};
pub use project::{CreateProject, Project};
pub use skill::{AliasMatch, Proficiency, Skill, UserSkill};
pub use task::{CreateTask, Task, TaskPriority, TaskStatus};
pub use team::{CreateTeam, Team};
pub use user::{Availability, CreateUser, Role, User};
