//! External collaborators the engine talks to
//!
//! Two services sit outside the transactional core:
//!
//! - a text-analysis service that turns free text into candidate skill names
//!   ([`SkillExtractor`])
//! - a recommendation service that is told to refresh after someone is
//!   onboarded ([`RecommendationNotifier`])
//!
//! Neither is ever called while a store transaction is open. HTTP clients
//! live in [`http`]; [`NoopExtractor`] and [`NoopNotifier`] stand in when a
//! service is not configured.

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use http::{HttpRecommendationNotifier, HttpSkillExtractor};

/// Collaborator error types
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    /// Request never completed (connect failure, timeout, TLS)
    #[error("Collaborator request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Service answered with a non-success status
    #[error("Collaborator returned status {status}")]
    Status { status: u16 },

    /// Service answered with something we could not use
    #[error("Invalid collaborator response: {0}")]
    InvalidResponse(String),

    /// Call exceeded its own deadline
    #[error("Collaborator call timed out")]
    Timeout,
}

/// Collaborator result type alias
pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

/// Skill names found in a piece of text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedSkills {
    /// Candidate skill names, as spelled by the service
    #[serde(default)]
    pub skills: Vec<String>,
}

impl ExtractedSkills {
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

/// Text-analysis collaborator
#[async_trait]
pub trait SkillExtractor: Send + Sync {
    /// Returns candidate skill names found in `text`
    async fn extract(&self, text: &str) -> CollaboratorResult<ExtractedSkills>;
}

/// Recommendation collaborator
#[async_trait]
pub trait RecommendationNotifier: Send + Sync {
    /// Signals that recommendations for `user_id` should be recomputed
    async fn refresh(&self, user_id: Uuid) -> CollaboratorResult<()>;
}

/// Extractor that never finds anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopExtractor;

#[async_trait]
impl SkillExtractor for NoopExtractor {
    async fn extract(&self, _text: &str) -> CollaboratorResult<ExtractedSkills> {
        Ok(ExtractedSkills::default())
    }
}

/// Notifier that drops every signal
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl RecommendationNotifier for NoopNotifier {
    async fn refresh(&self, _user_id: Uuid) -> CollaboratorResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracted_skills_tolerates_missing_fields() {
        let parsed: ExtractedSkills =
            serde_json::from_str(r#"{"skills": ["Rust"], "levels": {"Rust": "expert"}}"#).unwrap();
        assert_eq!(parsed.skills, vec!["Rust"]);

        let parsed: ExtractedSkills = serde_json::from_str("{}").unwrap();
        assert!(parsed.is_empty());
    }

    #[tokio::test]
    async fn test_noop_collaborators() {
        assert!(NoopExtractor.extract("anything").await.unwrap().is_empty());
        assert!(NoopNotifier.refresh(Uuid::new_v4()).await.is_ok());
    }
}
