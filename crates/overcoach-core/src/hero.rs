// Hero and map catalog: the canonical data every other component looks up.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Hero role category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Tank,
    Damage,
    Support,
}

impl Role {
    /// Parse a role string, case-insensitively.
    ///
    /// Accepts the catalog's lower-case names plus the common "dps" and
    /// "healer" aliases people type into the terminal.
    pub fn from_str_role(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "tank" => Some(Role::Tank),
            "damage" | "dps" => Some(Role::Damage),
            "support" | "healer" => Some(Role::Support),
            _ => None,
        }
    }

    /// Bucket used when displaying a role string from the recommendation
    /// service. Unrecognized strings land in the Damage bucket.
    pub fn display_bucket(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "tank" => Role::Tank,
            "support" => Role::Support,
            _ => Role::Damage,
        }
    }

    /// Lower-case name as used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Tank => "tank",
            Role::Damage => "damage",
            Role::Support => "support",
        }
    }

    /// Icon shown when no portrait is available.
    pub fn icon(&self) -> &'static str {
        match self {
            Role::Tank => "shield",
            Role::Damage => "swords",
            Role::Support => "heart",
        }
    }

    /// Color token for role-tinted text.
    pub fn color(&self) -> &'static str {
        match self {
            Role::Tank => "tank",
            Role::Damage => "damage",
            Role::Support => "support",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Hero / OverwatchMap
// ---------------------------------------------------------------------------

/// A playable hero as served by the catalog service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hero {
    pub key: String,
    pub name: String,
    /// Portrait image URL.
    pub portrait: String,
    pub role: Role,
}

/// A map as served by the catalog service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverwatchMap {
    pub name: String,
    /// Screenshot image URL.
    pub screenshot: String,
    #[serde(default)]
    pub gamemodes: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl OverwatchMap {
    /// Game modes joined for display, e.g. `ESCORT • HYBRID`.
    pub fn gamemodes_label(&self) -> String {
        self.gamemodes
            .iter()
            .map(|m| m.to_uppercase())
            .collect::<Vec<_>>()
            .join(" • ")
    }
}

// ---------------------------------------------------------------------------
// HeroCatalog
// ---------------------------------------------------------------------------

/// The immutable set of heroes and maps for a session.
///
/// Heroes are held behind `Arc` so rosters can reference them without
/// copying or owning the data.
#[derive(Debug, Clone, Default)]
pub struct HeroCatalog {
    heroes: Vec<Arc<Hero>>,
    maps: Vec<OverwatchMap>,
}

impl HeroCatalog {
    pub fn new(heroes: Vec<Hero>, maps: Vec<OverwatchMap>) -> Self {
        HeroCatalog {
            heroes: heroes.into_iter().map(Arc::new).collect(),
            maps,
        }
    }

    pub fn heroes(&self) -> &[Arc<Hero>] {
        &self.heroes
    }

    pub fn maps(&self) -> &[OverwatchMap] {
        &self.maps
    }

    /// Case-insensitive exact lookup by hero name. First match wins.
    pub fn find_hero(&self, name: &str) -> Option<&Arc<Hero>> {
        let needle = name.to_lowercase();
        self.heroes.iter().find(|h| h.name.to_lowercase() == needle)
    }

    /// Case-insensitive exact lookup by map name.
    pub fn find_map(&self, name: &str) -> Option<&OverwatchMap> {
        let needle = name.to_lowercase();
        self.maps.iter().find(|m| m.name.to_lowercase() == needle)
    }

    /// Heroes whose name contains `query` (case-insensitive), optionally
    /// restricted to one role. Catalog order is preserved; an empty query
    /// matches everything.
    pub fn search_heroes(&self, query: &str, role: Option<Role>) -> Vec<&Arc<Hero>> {
        let needle = query.to_lowercase();
        self.heroes
            .iter()
            .filter(|h| h.name.to_lowercase().contains(&needle))
            .filter(|h| role.map_or(true, |r| h.role == r))
            .collect()
    }

    /// Maps whose name contains `query` (case-insensitive).
    pub fn search_maps(&self, query: &str) -> Vec<&OverwatchMap> {
        let needle = query.to_lowercase();
        self.maps
            .iter()
            .filter(|m| m.name.to_lowercase().contains(&needle))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
