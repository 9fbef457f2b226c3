// Recommendation service (Overcoach API) client.

use async_trait::async_trait;
use overcoach_core::{RawRecommendationResponse, RecommendationRequest};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{decode_json, endpoint, ClientError};

pub const DEFAULT_COACH_URL: &str = "http://localhost:8000";

/// `GET /health` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub ollama_connected: bool,
    #[serde(default)]
    pub heroes_indexed: u64,
    #[serde(default)]
    pub maps_indexed: u64,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Response of `POST /counter`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterResponse {
    pub hero: String,
    pub counters: String,
}

#[derive(Serialize)]
struct CounterRequest<'a> {
    hero_name: &'a str,
}

/// The external recommendation engine.
#[async_trait]
pub trait RecommendationService: Send + Sync {
    async fn suggest(
        &self,
        request: &RecommendationRequest,
    ) -> Result<RawRecommendationResponse, ClientError>;

    async fn health(&self) -> Result<HealthStatus, ClientError>;

    async fn counters(&self, hero_name: &str) -> Result<CounterResponse, ClientError>;
}

/// HTTP client for the Overcoach API.
pub struct CoachClient {
    http: reqwest::Client,
    base_url: String,
}

impl CoachClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http(reqwest::Client::new(), base_url)
    }

    pub fn with_http(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl RecommendationService for CoachClient {
    async fn suggest(
        &self,
        request: &RecommendationRequest,
    ) -> Result<RawRecommendationResponse, ClientError> {
        let url = endpoint(&self.base_url, "suggest");
        debug!(
            enemy = request.enemy_team.len(),
            current = request.current_team.len(),
            "POST {}",
            url
        );
        let response = self.http.post(&url).json(request).send().await?;
        decode_json(response, &url).await
    }

    async fn health(&self) -> Result<HealthStatus, ClientError> {
        let url = endpoint(&self.base_url, "health");
        let response = self.http.get(&url).send().await?;
        decode_json(response, &url).await
    }

    async fn counters(&self, hero_name: &str) -> Result<CounterResponse, ClientError> {
        let url = endpoint(&self.base_url, "counter");
        let response = self
            .http
            .post(&url)
            .json(&CounterRequest { hero_name })
            .send()
            .await?;
        decode_json(response, &url).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::serve_once;

    const SUGGEST_BODY: &str = r#"{
        "recommended_team": [
            { "name": "Winston", "role": "tank", "reasoning": "Dive the Bastion" }
        ],
        "strategy": "Flank through the side door.",
        "synergies": "Winston + Ana",
        "alternatives": [],
        "raw_response": "RECOMMENDED TEAM: ..."
    }"#;

    #[tokio::test]
    async fn suggest_posts_request_and_decodes_response() {
        let (base, captured) = serve_once(200, SUGGEST_BODY).await;
        let client = CoachClient::new(base);

        let request = RecommendationRequest {
            map_name: None,
            enemy_team: vec!["Bastion".into(), "Mercy".into()],
            current_team: vec![],
            difficulties: Some("Strong bunker".into()),
        };
        let response = client.suggest(&request).await.unwrap();

        assert_eq!(response.recommended_team[0].name, "Winston");
        assert!(response.alternatives.is_empty());
        assert_eq!(response.raw_response, "RECOMMENDED TEAM: ...");

        let captured = captured.await.unwrap();
        assert_eq!(captured.request_line, "POST /suggest HTTP/1.1");
        let sent: serde_json::Value = serde_json::from_str(&captured.body).unwrap();
        assert_eq!(
            sent,
            serde_json::json!({
                "enemy_team": ["Bastion", "Mercy"],
                "current_team": [],
                "difficulties": "Strong bunker"
            })
        );
    }

    #[tokio::test]
    async fn suggest_maps_server_error_to_status() {
        let (base, _captured) = serve_once(500, r#"{"detail":"boom"}"#).await;
        let client = CoachClient::new(base);
        let request = RecommendationRequest {
            map_name: Some("Ilios".into()),
            enemy_team: vec!["Ana".into()],
            current_team: vec![],
            difficulties: None,
        };
        assert!(matches!(
            client.suggest(&request).await,
            Err(ClientError::Status { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn suggest_reports_transport_failure() {
        // Bind and immediately drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = CoachClient::new(format!("http://{addr}"));
        let request = RecommendationRequest {
            map_name: None,
            enemy_team: vec!["Ana".into()],
            current_team: vec![],
            difficulties: None,
        };
        assert!(matches!(
            client.suggest(&request).await,
            Err(ClientError::Http(_))
        ));
    }

    #[tokio::test]
    async fn health_decodes_status() {
        let body = r#"{"status":"degraded","ollama_connected":false,"heroes_indexed":42,"maps_indexed":0}"#;
        let (base, captured) = serve_once(200, body).await;
        let health = CoachClient::new(base).health().await.unwrap();

        assert!(!health.is_healthy());
        assert_eq!(health.heroes_indexed, 42);
        assert_eq!(captured.await.unwrap().request_line, "GET /health HTTP/1.1");
    }

    #[tokio::test]
    async fn counters_posts_hero_name() {
        let body = r#"{"hero":"Bastion","counters":"Genji deflects, Junkrat spams."}"#;
        let (base, captured) = serve_once(200, body).await;
        let resp = CoachClient::new(base).counters("Bastion").await.unwrap();

        assert_eq!(resp.hero, "Bastion");
        let captured = captured.await.unwrap();
        assert_eq!(captured.request_line, "POST /counter HTTP/1.1");
        let sent: serde_json::Value = serde_json::from_str(&captured.body).unwrap();
        assert_eq!(sent, serde_json::json!({ "hero_name": "Bastion" }));
    }
}
