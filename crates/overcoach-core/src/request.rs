// Recommendation request construction.

use serde::{Deserialize, Serialize};

use crate::hero::OverwatchMap;
use crate::roster::RosterState;

/// Body of `POST /suggest`.
///
/// Absent optionals are omitted from the JSON so the service can tell "no map
/// selected" apart from an empty map name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_name: Option<String>,
    pub enemy_team: Vec<String>,
    pub current_team: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulties: Option<String>,
}

/// Derive a request from both rosters plus the optional map and free-text
/// difficulty note. Never fails; gating is done with [`can_suggest`].
pub fn build(
    enemy: &RosterState,
    mine: &RosterState,
    selected_map: Option<&OverwatchMap>,
    difficulty_text: &str,
) -> RecommendationRequest {
    let note = difficulty_text.trim();
    RecommendationRequest {
        map_name: selected_map.map(|m| m.name.clone()),
        enemy_team: enemy.name_list(),
        current_team: mine.name_list(),
        difficulties: (!note.is_empty()).then(|| note.to_string()),
    }
}

/// A suggestion can be requested once at least one enemy hero is selected.
pub fn can_suggest(enemy: &RosterState) -> bool {
    !enemy.is_empty()
}
