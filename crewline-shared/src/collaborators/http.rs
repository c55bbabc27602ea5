//! reqwest clients for the collaborator services

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use super::{
    CollaboratorError, CollaboratorResult, ExtractedSkills, RecommendationNotifier,
    SkillExtractor,
};

fn build_client(timeout: Duration) -> CollaboratorResult<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}

/// Text-analysis service client
///
/// `POST {base}/extract` with `{"text": ...}`, expecting
/// `{"skills": [...]}`. Extra fields in the answer are ignored.
#[derive(Debug, Clone)]
pub struct HttpSkillExtractor {
    url: String,
    client: reqwest::Client,
}

impl HttpSkillExtractor {
    pub fn new(base_url: &str, timeout: Duration) -> CollaboratorResult<Self> {
        Ok(Self {
            url: endpoint(base_url, "extract"),
            client: build_client(timeout)?,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SkillExtractor for HttpSkillExtractor {
    async fn extract(&self, text: &str) -> CollaboratorResult<ExtractedSkills> {
        debug!(url = %self.url, chars = text.len(), "Requesting skill extraction");

        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "text": text }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::Status {
                status: status.as_u16(),
            });
        }

        response
            .json::<ExtractedSkills>()
            .await
            .map_err(|e| CollaboratorError::InvalidResponse(e.to_string()))
    }
}

/// Recommendation service client
///
/// `POST {base}/refresh` with `{"user_id": ...}`; any 2xx is an ack.
#[derive(Debug, Clone)]
pub struct HttpRecommendationNotifier {
    url: String,
    client: reqwest::Client,
}

impl HttpRecommendationNotifier {
    pub fn new(base_url: &str, timeout: Duration) -> CollaboratorResult<Self> {
        Ok(Self {
            url: endpoint(base_url, "refresh"),
            client: build_client(timeout)?,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RecommendationNotifier for HttpRecommendationNotifier {
    async fn refresh(&self, user_id: Uuid) -> CollaboratorResult<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "user_id": user_id }))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                debug!(%user_id, "Recommendation refresh acknowledged");
                Ok(())
            }
            status => Err(CollaboratorError::Status {
                status: status.as_u16(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_paths() {
        assert_eq!(endpoint("http://nlp:8000", "extract"), "http://nlp:8000/extract");
        assert_eq!(endpoint("http://nlp:8000/", "extract"), "http://nlp:8000/extract");
    }

    #[test]
    fn test_clients_build() {
        let extractor = HttpSkillExtractor::new("http://localhost:9", Duration::from_secs(1)).unwrap();
        assert_eq!(extractor.url(), "http://localhost:9/extract");

        let notifier =
            HttpRecommendationNotifier::new("http://localhost:9/", Duration::from_secs(1)).unwrap();
        assert_eq!(notifier.url(), "http://localhost:9/refresh");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_error() {
        // Port 9 (discard) is closed on test machines.
        let notifier =
            HttpRecommendationNotifier::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let err = notifier.refresh(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Transport(_)));
    }
}
