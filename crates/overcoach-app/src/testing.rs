//! Testing utilities: an in-memory recommendation service and fixtures.
//!
//! `GatedService` lets a test decide exactly when each `/suggest` call
//! resolves, which is what out-of-order completion tests need.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use overcoach_client::{
    CatalogSource, ClientError, CounterResponse, HealthStatus, RecommendationService,
};
use overcoach_core::{
    Hero, HeroCatalog, HeroRecommendation, OverwatchMap, RawRecommendationResponse,
    RecommendationRequest, Role,
};
use tokio::sync::oneshot;

/// Outcome handed to a gated call: a response or an HTTP status to fail with.
pub type GateResult = Result<RawRecommendationResponse, u16>;

type Gate = (Option<oneshot::Sender<GateResult>>, Option<oneshot::Receiver<GateResult>>);

/// Recommendation service whose `suggest` calls block until released.
///
/// Calls are keyed by the first enemy hero name of the request. `release`
/// may be called before or after the matching `suggest`.
pub struct GatedService {
    gates: Mutex<HashMap<String, Gate>>,
    requests: Mutex<Vec<RecommendationRequest>>,
    health: Mutex<Result<HealthStatus, u16>>,
}

impl GatedService {
    pub fn new() -> Arc<Self> {
        Arc::new(GatedService {
            gates: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            health: Mutex::new(Ok(HealthStatus {
                status: "healthy".into(),
                ollama_connected: true,
                heroes_indexed: 9,
                maps_indexed: 3,
            })),
        })
    }

    /// Resolve the call keyed by `enemy` with `result`.
    pub fn release(&self, enemy: &str, result: GateResult) {
        let sender = {
            let mut gates = self.gates.lock().unwrap_or_else(|e| e.into_inner());
            let gate = gates.entry(enemy.to_string()).or_insert_with(new_gate);
            gate.0.take()
        };
        if let Some(sender) = sender {
            let _ = sender.send(result);
        }
    }

    /// Every request `suggest` has seen, in arrival order.
    pub fn requests(&self) -> Vec<RecommendationRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Make `/health` fail with `status`.
    pub fn fail_health(&self, status: u16) {
        *self.health.lock().unwrap_or_else(|e| e.into_inner()) = Err(status);
    }
}

fn new_gate() -> Gate {
    let (tx, rx) = oneshot::channel();
    (Some(tx), Some(rx))
}

fn status_error(status: u16, path: &str) -> ClientError {
    ClientError::Status {
        status,
        url: format!("http://gated.test/{path}"),
    }
}

#[async_trait]
impl RecommendationService for GatedService {
    async fn suggest(
        &self,
        request: &RecommendationRequest,
    ) -> Result<RawRecommendationResponse, ClientError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        let key = request.enemy_team.first().cloned().unwrap_or_default();
        let receiver = {
            let mut gates = self.gates.lock().unwrap_or_else(|e| e.into_inner());
            let gate = gates.entry(key).or_insert_with(new_gate);
            gate.1.take()
        };
        let Some(receiver) = receiver else {
            return Err(status_error(409, "suggest"));
        };
        match receiver.await {
            Ok(Ok(raw)) => Ok(raw),
            Ok(Err(status)) => Err(status_error(status, "suggest")),
            Err(_) => Err(status_error(499, "suggest")),
        }
    }

    async fn health(&self) -> Result<HealthStatus, ClientError> {
        self.health
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .map_err(|s| status_error(s, "health"))
    }

    async fn counters(&self, hero_name: &str) -> Result<CounterResponse, ClientError> {
        Ok(CounterResponse {
            hero: hero_name.to_string(),
            counters: format!("Pick heroes that punish {hero_name}."),
        })
    }
}

/// Catalog source returning fixed data, optionally failing one side.
pub struct StaticCatalogSource {
    pub heroes: Result<Vec<Hero>, u16>,
    pub maps: Result<Vec<OverwatchMap>, u16>,
}

#[async_trait]
impl CatalogSource for StaticCatalogSource {
    async fn fetch_heroes(&self) -> Result<Vec<Hero>, ClientError> {
        self.heroes.clone().map_err(|s| status_error(s, "heroes"))
    }

    async fn fetch_maps(&self) -> Result<Vec<OverwatchMap>, ClientError> {
        self.maps.clone().map_err(|s| status_error(s, "maps"))
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn hero(name: &str, role: Role) -> Hero {
    let key = name.to_lowercase().replace(['.', ' ', ':'], "");
    Hero {
        portrait: format!("https://cdn.example/heroes/{key}.png"),
        key,
        name: name.to_string(),
        role,
    }
}

pub fn map(name: &str, modes: &[&str]) -> OverwatchMap {
    OverwatchMap {
        name: name.to_string(),
        screenshot: format!("https://cdn.example/maps/{}.jpg", name.to_lowercase().replace(' ', "-")),
        gamemodes: modes.iter().map(|m| m.to_string()).collect(),
        location: None,
    }
}

pub fn heroes() -> Vec<Hero> {
    vec![
        hero("Reinhardt", Role::Tank),
        hero("Winston", Role::Tank),
        hero("D.Va", Role::Tank),
        hero("Bastion", Role::Damage),
        hero("Widowmaker", Role::Damage),
        hero("Genji", Role::Damage),
        hero("Mercy", Role::Support),
        hero("Ana", Role::Support),
        hero("Lúcio", Role::Support),
    ]
}

pub fn maps() -> Vec<OverwatchMap> {
    vec![
        map("King's Row", &["hybrid"]),
        map("Ilios", &["control"]),
        map("Route 66", &["escort"]),
    ]
}

pub fn catalog() -> HeroCatalog {
    HeroCatalog::new(heroes(), maps())
}

/// A well-formed response recommending a single hero.
pub fn raw_for(name: &str) -> RawRecommendationResponse {
    let role = catalog()
        .find_hero(name)
        .map(|h| h.role.as_str())
        .unwrap_or("damage")
        .to_string();
    RawRecommendationResponse {
        recommended_team: vec![HeroRecommendation {
            name: name.to_string(),
            role,
            reasoning: format!("{name} fits the plan"),
        }],
        strategy: "Group up and take space.".into(),
        synergies: "Shield plus sustain.".into(),
        alternatives: vec!["Genji".into()],
        raw_response: format!("RECOMMENDED TEAM:\n- {name}"),
    }
}
