// Application orchestrator: owns the session context and runs the event loop.
//
// The app layer receives commands from the front end and completions from
// spawned service calls, updates rosters and the suggestion session, and
// pushes UI updates back out.

use std::sync::Arc;

use overcoach_client::RecommendationService;
use overcoach_core::request::build;
use overcoach_core::{
    can_suggest, Hero, HeroCatalog, OverwatchMap, RecommendationRequest, Role, RosterState,
    TeamSlot,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::protocol::{ServiceEvent, SessionSnapshot, Side, UiUpdate, UserCommand};
use crate::session::{SuggestionSession, SuggestionStatus};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A command rejected before it reached any service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("unknown hero: {0}")]
    UnknownHero(String),

    #[error("{hero} is a {role} hero and cannot fill the {slot} slot")]
    RoleMismatch {
        hero: String,
        role: Role,
        slot: TeamSlot,
    },

    #[error("unknown map: {0}")]
    UnknownMap(String),

    #[error("add at least one enemy hero before asking for a suggestion")]
    NoEnemyHeroes,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// The complete session context.
pub struct AppState {
    pub config: Config,
    pub catalog: Arc<HeroCatalog>,
    pub enemy: RosterState,
    pub mine: RosterState,
    pub selected_map: Option<OverwatchMap>,
    /// Free-text note sent as `difficulties`.
    pub difficulty: String,
    pub session: SuggestionSession,
    /// Shared with spawned health and counter calls.
    pub service: Arc<dyn RecommendationService>,
    pub service_tx: mpsc::Sender<ServiceEvent>,
}

impl AppState {
    pub fn new(
        config: Config,
        catalog: Arc<HeroCatalog>,
        service: Arc<dyn RecommendationService>,
        service_tx: mpsc::Sender<ServiceEvent>,
    ) -> Self {
        let session = SuggestionSession::new(Arc::clone(&service), service_tx.clone());
        AppState {
            config,
            catalog,
            enemy: RosterState::new(),
            mine: RosterState::new(),
            selected_map: None,
            difficulty: String::new(),
            session,
            service,
            service_tx,
        }
    }

    /// Place a catalog hero in `slot`, or clear the slot with `None`.
    ///
    /// Heroes are looked up case-insensitively and must play the slot's role.
    /// On error the roster is left as it was.
    pub fn select_hero(
        &mut self,
        side: Side,
        slot: TeamSlot,
        hero_name: Option<&str>,
    ) -> Result<(), SelectionError> {
        let hero = match hero_name {
            None => None,
            Some(name) => {
                let hero = self
                    .catalog
                    .find_hero(name)
                    .ok_or_else(|| SelectionError::UnknownHero(name.to_string()))?;
                if hero.role != slot.required_role() {
                    return Err(SelectionError::RoleMismatch {
                        hero: hero.name.clone(),
                        role: hero.role,
                        slot,
                    });
                }
                Some(Arc::clone(hero))
            }
        };

        match &hero {
            Some(h) => info!("{}: {} -> {}", side, slot, h.name),
            None => info!("{}: cleared {}", side, slot),
        }
        let roster = match side {
            Side::Enemy => &mut self.enemy,
            Side::Mine => &mut self.mine,
        };
        *roster = roster.set_slot(slot, hero);
        Ok(())
    }

    pub fn select_map(&mut self, map_name: Option<&str>) -> Result<(), SelectionError> {
        self.selected_map = match map_name {
            None => None,
            Some(name) => Some(
                self.catalog
                    .find_map(name)
                    .cloned()
                    .ok_or_else(|| SelectionError::UnknownMap(name.to_string()))?,
            ),
        };
        info!(
            "Selected map: {}",
            self.selected_map.as_ref().map_or("none", |m| m.name.as_str())
        );
        Ok(())
    }

    pub fn set_difficulty(&mut self, text: String) {
        self.difficulty = text;
    }

    pub fn can_suggest(&self) -> bool {
        can_suggest(&self.enemy)
    }

    pub fn build_request(&self) -> RecommendationRequest {
        build(
            &self.enemy,
            &self.mine,
            self.selected_map.as_ref(),
            &self.difficulty,
        )
    }

    /// Submit the current context for a suggestion. Supersedes any attempt
    /// already in flight.
    pub fn trigger_suggestion(&mut self) -> Result<u64, SelectionError> {
        if !self.can_suggest() {
            return Err(SelectionError::NoEnemyHeroes);
        }
        let request = self.build_request();
        debug!(
            "Suggestion request: enemy={:?} mine={:?} map={:?}",
            request.enemy_team, request.current_team, request.map_name
        );
        Ok(self.session.submit(request))
    }

    pub fn trigger_health_check(&self) {
        let service = Arc::clone(&self.service);
        let tx = self.service_tx.clone();
        tokio::spawn(async move {
            let result = service.health().await.map_err(|e| e.to_string());
            let _ = tx.send(ServiceEvent::Health(result)).await;
        });
    }

    /// Ask the service for counters to `hero_name`. Catalog spelling is used
    /// when the hero is known; unknown names are passed through.
    pub fn trigger_counters(&self, hero_name: &str) {
        let hero = self
            .catalog
            .find_hero(hero_name)
            .map_or_else(|| hero_name.to_string(), |h| h.name.clone());
        let service = Arc::clone(&self.service);
        let tx = self.service_tx.clone();
        tokio::spawn(async move {
            let result = service.counters(&hero).await.map_err(|e| e.to_string());
            let _ = tx.send(ServiceEvent::Counters { hero, result }).await;
        });
    }

    pub fn search_heroes(&self, query: &str, role: Option<Role>) -> Vec<Hero> {
        self.catalog
            .search_heroes(query, role)
            .into_iter()
            .map(|h| Hero::clone(h))
            .collect()
    }

    pub fn search_maps(&self, query: &str) -> Vec<OverwatchMap> {
        self.catalog.search_maps(query).into_iter().cloned().collect()
    }

    pub fn build_snapshot(&self) -> SessionSnapshot {
        let names = |roster: &RosterState| {
            roster
                .iter()
                .map(|(slot, hero)| (slot, hero.map(|h| h.name.clone())))
                .collect()
        };
        SessionSnapshot {
            enemy: names(&self.enemy),
            mine: names(&self.mine),
            map: self.selected_map.clone(),
            difficulty: self.difficulty.clone(),
            can_suggest: self.can_suggest(),
            phase: self.session.status().phase(),
        }
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the main application event loop.
///
/// Listens on two channels using `tokio::select!`:
/// 1. User commands from the front end
/// 2. Completions from spawned service calls
///
/// Pushes UI updates through `ui_tx`. Outstanding suggestion calls are
/// aborted on exit.
pub async fn run(
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    mut service_rx: mpsc::Receiver<ServiceEvent>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!(
        "Application event loop started ({} heroes, {} maps)",
        state.catalog.heroes().len(),
        state.catalog.maps().len()
    );

    let mut service_open = true;

    let _ = ui_tx
        .send(UiUpdate::Snapshot(Box::new(state.build_snapshot())))
        .await;

    loop {
        tokio::select! {
            // --- Service completions (only poll when channel is open) ---
            event = service_rx.recv(), if service_open => {
                match event {
                    Some(event) => handle_service_event(&mut state, event, &ui_tx).await,
                    None => {
                        info!("Service channel closed");
                        service_open = false;
                    }
                }
            }

            // --- User commands ---
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => handle_user_command(&mut state, cmd, &ui_tx).await,
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }
        }
    }

    state.session.shutdown();
    info!("Application event loop exiting");
    Ok(())
}

/// Handle a completion from a spawned service call.
///
/// Suggestion completions go through `SuggestionSession::complete`, which
/// drops results from superseded submissions.
async fn handle_service_event(
    state: &mut AppState,
    event: ServiceEvent,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    let update = match event {
        ServiceEvent::SuggestionCompleted { generation, result } => {
            match state.session.complete(generation, result, &state.catalog) {
                Some(SuggestionStatus::Succeeded { recommendation, .. }) => {
                    Some(UiUpdate::SuggestionReady(recommendation.clone()))
                }
                Some(SuggestionStatus::Failed { message }) => {
                    Some(UiUpdate::SuggestionFailed(message.clone()))
                }
                Some(_) | None => None,
            }
        }
        ServiceEvent::Health(Ok(status)) => {
            info!("Service health: {} ({} heroes indexed)", status.status, status.heroes_indexed);
            Some(UiUpdate::Health(status))
        }
        ServiceEvent::Health(Err(e)) => {
            warn!("Health check failed: {}", e);
            Some(UiUpdate::ServiceError(format!("Health check failed: {e}")))
        }
        ServiceEvent::Counters { result: Ok(counters), .. } => Some(UiUpdate::Counters(counters)),
        ServiceEvent::Counters { hero, result: Err(e) } => {
            warn!("Counter lookup for {} failed: {}", hero, e);
            Some(UiUpdate::ServiceError(format!("Failed to get counters for {hero}")))
        }
    };

    if let Some(update) = update {
        let _ = ui_tx.send(update).await;
    }
}

/// Handle a user command from the front end.
async fn handle_user_command(
    state: &mut AppState,
    cmd: UserCommand,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    let update = match cmd {
        UserCommand::SelectHero { side, slot, hero } => {
            match state.select_hero(side, slot, hero.as_deref()) {
                Ok(()) => UiUpdate::Snapshot(Box::new(state.build_snapshot())),
                Err(e) => UiUpdate::ValidationError(e.to_string()),
            }
        }
        UserCommand::SelectMap(name) => match state.select_map(name.as_deref()) {
            Ok(()) => UiUpdate::Snapshot(Box::new(state.build_snapshot())),
            Err(e) => UiUpdate::ValidationError(e.to_string()),
        },
        UserCommand::SetDifficulty(text) => {
            state.set_difficulty(text);
            UiUpdate::Snapshot(Box::new(state.build_snapshot()))
        }
        UserCommand::Suggest => match state.trigger_suggestion() {
            Ok(generation) => UiUpdate::SuggestionStarted { generation },
            Err(e) => UiUpdate::ValidationError(e.to_string()),
        },
        UserCommand::Dismiss => {
            if !state.session.dismiss() {
                debug!("Nothing to dismiss");
                return;
            }
            UiUpdate::Dismissed
        }
        UserCommand::SearchHeroes { query, role } => UiUpdate::HeroResults {
            role,
            heroes: state.search_heroes(&query, role),
        },
        UserCommand::SearchMaps(query) => UiUpdate::MapResults(state.search_maps(&query)),
        UserCommand::ShowRoster => UiUpdate::Snapshot(Box::new(state.build_snapshot())),
        UserCommand::CheckHealth => {
            state.trigger_health_check();
            return;
        }
        UserCommand::Counters(hero) => {
            state.trigger_counters(&hero);
            return;
        }
        UserCommand::Help => UiUpdate::Help,
        UserCommand::Quit => {
            // Handled in the main loop
            return;
        }
    };

    let _ = ui_tx.send(update).await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
