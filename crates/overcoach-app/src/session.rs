// Suggestion lifecycle: one current submission, superseded results dropped.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use overcoach_client::RecommendationService;
use overcoach_core::{
    reconcile, HeroCatalog, RawRecommendationResponse, ReconciledRecommendation,
    RecommendationRequest,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::protocol::{ServiceEvent, SuggestionPhase};

/// User-facing message for any transport or non-2xx failure of `/suggest`.
pub const SUGGESTION_FAILED_MESSAGE: &str = "Failed to get suggestion from Coach AI";

#[derive(Debug, Clone, PartialEq)]
pub enum SuggestionStatus {
    Idle,
    Submitting {
        generation: u64,
    },
    Succeeded {
        recommendation: Box<ReconciledRecommendation>,
        completed_at: DateTime<Utc>,
    },
    Failed {
        message: String,
    },
}

impl SuggestionStatus {
    pub fn phase(&self) -> SuggestionPhase {
        match self {
            SuggestionStatus::Idle => SuggestionPhase::Idle,
            SuggestionStatus::Submitting { .. } => SuggestionPhase::Submitting,
            SuggestionStatus::Succeeded { .. } => SuggestionPhase::Succeeded,
            SuggestionStatus::Failed { .. } => SuggestionPhase::Failed,
        }
    }
}

/// Owns the current suggestion attempt.
///
/// Every `submit` bumps `generation` and spawns the service call. Calls are
/// never cancelled; a completion whose generation is no longer current is
/// discarded in `complete`, so the latest submission always wins.
pub struct SuggestionSession {
    service: Arc<dyn RecommendationService>,
    events_tx: mpsc::Sender<ServiceEvent>,
    /// u64 overflow is not a practical concern.
    generation: u64,
    status: SuggestionStatus,
    in_flight: Vec<JoinHandle<()>>,
}

impl SuggestionSession {
    pub fn new(
        service: Arc<dyn RecommendationService>,
        events_tx: mpsc::Sender<ServiceEvent>,
    ) -> Self {
        SuggestionSession {
            service,
            events_tx,
            generation: 0,
            status: SuggestionStatus::Idle,
            in_flight: Vec::new(),
        }
    }

    pub fn status(&self) -> &SuggestionStatus {
        &self.status
    }

    /// The reconciled result of the current successful attempt, if any.
    pub fn recommendation(&self) -> Option<&ReconciledRecommendation> {
        match &self.status {
            SuggestionStatus::Succeeded { recommendation, .. } => Some(recommendation),
            _ => None,
        }
    }

    /// Start a new attempt, superseding whatever is current. Returns the new
    /// generation.
    pub fn submit(&mut self, request: RecommendationRequest) -> u64 {
        self.in_flight.retain(|h| !h.is_finished());

        self.generation += 1;
        let generation = self.generation;
        self.status = SuggestionStatus::Submitting { generation };

        let service = Arc::clone(&self.service);
        let tx = self.events_tx.clone();
        let handle = tokio::spawn(async move {
            let result = service
                .suggest(&request)
                .await
                .map_err(|e| e.to_string());
            if tx
                .send(ServiceEvent::SuggestionCompleted { generation, result })
                .await
                .is_err()
            {
                debug!("Event channel closed before suggestion gen {} completed", generation);
            }
        });
        self.in_flight.push(handle);

        info!(
            "Submitted suggestion request (gen: {}, in flight: {})",
            generation,
            self.in_flight.len()
        );
        generation
    }

    /// Apply a completed call. Returns the new status, or `None` when the
    /// completion was stale and dropped.
    pub fn complete(
        &mut self,
        generation: u64,
        result: Result<RawRecommendationResponse, String>,
        catalog: &HeroCatalog,
    ) -> Option<&SuggestionStatus> {
        let current = matches!(
            self.status,
            SuggestionStatus::Submitting { generation: g } if g == generation
        );
        if !current {
            debug!(
                "Discarding stale suggestion result (event gen: {}, current gen: {})",
                generation, self.generation
            );
            return None;
        }

        self.status = match result {
            Ok(raw) => {
                let recommendation = reconcile(&raw, catalog);
                if recommendation.parse_failed {
                    warn!("Recommendation service could not structure its answer (gen: {})", generation);
                }
                info!(
                    "Suggestion gen {} succeeded: {} heroes, {} portraits resolved",
                    generation,
                    recommendation.entries.len(),
                    recommendation.resolved_count()
                );
                SuggestionStatus::Succeeded {
                    recommendation: Box::new(recommendation),
                    completed_at: Utc::now(),
                }
            }
            Err(e) => {
                warn!("Suggestion gen {} failed: {}", generation, e);
                SuggestionStatus::Failed {
                    message: SUGGESTION_FAILED_MESSAGE.to_string(),
                }
            }
        };
        Some(&self.status)
    }

    /// Return a terminal state to `Idle`. Returns whether anything changed.
    pub fn dismiss(&mut self) -> bool {
        match self.status {
            SuggestionStatus::Succeeded { .. } | SuggestionStatus::Failed { .. } => {
                self.status = SuggestionStatus::Idle;
                true
            }
            SuggestionStatus::Idle | SuggestionStatus::Submitting { .. } => false,
        }
    }

    /// Abort outstanding calls. Used on shutdown only.
    pub fn shutdown(&mut self) {
        for handle in self.in_flight.drain(..) {
            handle.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{catalog, raw_for, GatedService};

    fn request(enemy: &str) -> RecommendationRequest {
        RecommendationRequest {
            map_name: None,
            enemy_team: vec![enemy.to_string()],
            current_team: vec![],
            difficulties: None,
        }
    }

    async fn next_completion(rx: &mut mpsc::Receiver<ServiceEvent>) -> (u64, Result<RawRecommendationResponse, String>) {
        match rx.recv().await {
            Some(ServiceEvent::SuggestionCompleted { generation, result }) => (generation, result),
            other => panic!("expected SuggestionCompleted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn submit_moves_to_submitting_and_bumps_generation() {
        let service = GatedService::new();
        let (tx, _rx) = mpsc::channel(8);
        let mut session = SuggestionSession::new(service.clone(), tx);

        assert_eq!(session.status(), &SuggestionStatus::Idle);
        let gen = session.submit(request("Bastion"));
        assert_eq!(gen, 1);
        assert_eq!(session.status(), &SuggestionStatus::Submitting { generation: 1 });
        assert_eq!(session.status().phase(), SuggestionPhase::Submitting);
    }

    #[tokio::test]
    async fn success_reconciles_against_catalog() {
        let service = GatedService::new();
        let (tx, mut rx) = mpsc::channel(8);
        let mut session = SuggestionSession::new(service.clone(), tx);
        let catalog = catalog();

        session.submit(request("Bastion"));
        service.release("Bastion", Ok(raw_for("winston")));
        let (gen, result) = next_completion(&mut rx).await;

        let status = session.complete(gen, result, &catalog).unwrap();
        assert_eq!(status.phase(), SuggestionPhase::Succeeded);
        let rec = session.recommendation().unwrap();
        assert_eq!(rec.entries[0].name, "winston");
        assert!(rec.entries[0].portrait.is_some());
    }

    #[tokio::test]
    async fn failure_uses_generic_message() {
        let service = GatedService::new();
        let (tx, mut rx) = mpsc::channel(8);
        let mut session = SuggestionSession::new(service.clone(), tx);

        session.submit(request("Bastion"));
        service.release("Bastion", Err(503));
        let (gen, result) = next_completion(&mut rx).await;
        assert!(result.is_err());

        session.complete(gen, result, &catalog());
        assert_eq!(
            session.status(),
            &SuggestionStatus::Failed {
                message: SUGGESTION_FAILED_MESSAGE.to_string()
            }
        );
    }

    #[tokio::test]
    async fn late_result_of_superseded_submission_is_discarded() {
        let service = GatedService::new();
        let (tx, mut rx) = mpsc::channel(8);
        let mut session = SuggestionSession::new(service.clone(), tx);
        let catalog = catalog();

        let gen_a = session.submit(request("A"));
        let gen_b = session.submit(request("B"));
        assert!(gen_b > gen_a);

        // B resolves first.
        service.release("B", Ok(raw_for("Ana")));
        let (gen, result) = next_completion(&mut rx).await;
        assert_eq!(gen, gen_b);
        assert!(session.complete(gen, result, &catalog).is_some());

        // A arrives late and must not overwrite B.
        service.release("A", Ok(raw_for("Reinhardt")));
        let (gen, result) = next_completion(&mut rx).await;
        assert_eq!(gen, gen_a);
        assert!(session.complete(gen, result, &catalog).is_none());

        assert_eq!(session.recommendation().unwrap().entries[0].name, "Ana");
    }

    #[tokio::test]
    async fn late_failure_does_not_overwrite_newer_success() {
        let service = GatedService::new();
        let (tx, mut rx) = mpsc::channel(8);
        let mut session = SuggestionSession::new(service.clone(), tx);
        let catalog = catalog();

        session.submit(request("A"));
        session.submit(request("B"));
        service.release("B", Ok(raw_for("Mercy")));
        let (gen, result) = next_completion(&mut rx).await;
        session.complete(gen, result, &catalog);

        service.release("A", Err(500));
        let (gen, result) = next_completion(&mut rx).await;
        assert!(session.complete(gen, result, &catalog).is_none());
        assert_eq!(session.status().phase(), SuggestionPhase::Succeeded);
    }

    #[tokio::test]
    async fn duplicate_completion_for_current_generation_is_ignored() {
        let service = GatedService::new();
        let (tx, _rx) = mpsc::channel(8);
        let mut session = SuggestionSession::new(service.clone(), tx);
        let catalog = catalog();

        let gen = session.submit(request("A"));
        assert!(session.complete(gen, Ok(raw_for("Ana")), &catalog).is_some());
        assert!(session.complete(gen, Err("late".into()), &catalog).is_none());
        assert_eq!(session.status().phase(), SuggestionPhase::Succeeded);
    }

    #[tokio::test]
    async fn resubmit_from_terminal_state_goes_back_through_submitting() {
        let service = GatedService::new();
        let (tx, _rx) = mpsc::channel(8);
        let mut session = SuggestionSession::new(service.clone(), tx);
        let catalog = catalog();

        let gen = session.submit(request("A"));
        session.complete(gen, Err("down".into()), &catalog);
        assert_eq!(session.status().phase(), SuggestionPhase::Failed);

        let gen = session.submit(request("A"));
        assert_eq!(session.status(), &SuggestionStatus::Submitting { generation: gen });
        assert!(session.recommendation().is_none());
    }

    #[tokio::test]
    async fn dismiss_only_leaves_terminal_states() {
        let service = GatedService::new();
        let (tx, _rx) = mpsc::channel(8);
        let mut session = SuggestionSession::new(service.clone(), tx);

        assert!(!session.dismiss());
        let gen = session.submit(request("A"));
        assert!(!session.dismiss());
        session.complete(gen, Err("down".into()), &catalog());
        assert!(session.dismiss());
        assert_eq!(session.status(), &SuggestionStatus::Idle);
    }

    #[tokio::test]
    async fn parse_failed_response_still_succeeds() {
        let service = GatedService::new();
        let (tx, _rx) = mpsc::channel(8);
        let mut session = SuggestionSession::new(service.clone(), tx);

        let gen = session.submit(request("A"));
        let mut raw = raw_for("Parsing failed - see raw_response");
        raw.recommended_team[0].role = "various".into();
        session.complete(gen, Ok(raw), &catalog());

        let rec = session.recommendation().unwrap();
        assert!(rec.parse_failed);
        assert!(rec.entries[0].portrait.is_none());
    }
}
