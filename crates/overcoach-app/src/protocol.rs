// Messages exchanged between the front end, the app event loop and the
// spawned service tasks.

use std::fmt;

use overcoach_client::{CounterResponse, HealthStatus};
use overcoach_core::{
    Hero, OverwatchMap, RawRecommendationResponse, ReconciledRecommendation, Role, TeamSlot,
};

/// Which roster a command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Enemy,
    Mine,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Enemy => write!(f, "Enemy Team"),
            Side::Mine => write!(f, "Your Team"),
        }
    }
}

/// Commands from the front end to the app loop.
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    /// Put a hero in a slot, or clear it with `hero: None`.
    SelectHero {
        side: Side,
        slot: TeamSlot,
        hero: Option<String>,
    },
    /// Select a map by name, or clear the selection.
    SelectMap(Option<String>),
    SetDifficulty(String),
    Suggest,
    /// Return a finished or failed suggestion to idle.
    Dismiss,
    SearchHeroes {
        query: String,
        role: Option<Role>,
    },
    SearchMaps(String),
    ShowRoster,
    CheckHealth,
    Counters(String),
    Help,
    Quit,
}

/// Results coming back from spawned service calls.
#[derive(Debug)]
pub enum ServiceEvent {
    /// A `/suggest` call finished. `generation` identifies the submission so
    /// superseded results can be dropped.
    SuggestionCompleted {
        generation: u64,
        result: Result<RawRecommendationResponse, String>,
    },
    Health(Result<HealthStatus, String>),
    Counters {
        hero: String,
        result: Result<CounterResponse, String>,
    },
}

/// Coarse suggestion state for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionPhase {
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

/// Everything the front end needs to redraw the team builder.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub enemy: Vec<(TeamSlot, Option<String>)>,
    pub mine: Vec<(TeamSlot, Option<String>)>,
    pub map: Option<OverwatchMap>,
    pub difficulty: String,
    pub can_suggest: bool,
    pub phase: SuggestionPhase,
}

/// Updates pushed from the app loop to the front end.
#[derive(Debug, Clone)]
pub enum UiUpdate {
    Snapshot(Box<SessionSnapshot>),
    HeroResults {
        role: Option<Role>,
        heroes: Vec<Hero>,
    },
    MapResults(Vec<OverwatchMap>),
    SuggestionStarted {
        generation: u64,
    },
    SuggestionReady(Box<ReconciledRecommendation>),
    /// Transport or service failure. Rosters are untouched.
    SuggestionFailed(String),
    Dismissed,
    /// The command was rejected before reaching any service.
    ValidationError(String),
    Health(HealthStatus),
    Counters(CounterResponse),
    /// An auxiliary call (health, counters) failed.
    ServiceError(String),
    Help,
}
