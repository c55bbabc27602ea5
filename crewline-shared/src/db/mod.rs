//! Database plumbing: connection pool and migrations
//!
//! Queries live with their models in [`crate::models`]; the engine reaches
//! them through [`crate::store::PgStore`].

pub mod migrations;
pub mod pool;
