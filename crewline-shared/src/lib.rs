//! # Crewline Shared Library
//!
//! Transactional business-rule engine for teams, projects, tasks, skills and
//! onboarding. Every multi-entity operation runs as one unit of work: all of
//! its writes commit together or none do.
//!
//! ## Module Organization
//!
//! - `engine`: the operations (assignment, archiving, invitations, lifecycle,
//!   skill resolution) and the transaction coordinator
//! - `store`: transactional store port with PostgreSQL and in-memory adapters
//! - `models`: database models and their SQL
//! - `db`: connection pool and migrations
//! - `auth`: session context and invitation tokens
//! - `collaborators`: text-analysis and recommendation service clients
//! - `config`: environment configuration
//! - `error`: engine error taxonomy

pub mod auth;
pub mod collaborators;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod store;

/// Current version of the Crewline shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
