// Five-slot team roster and slot addressing.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hero::{Hero, Role};

// ---------------------------------------------------------------------------
// TeamSlot
// ---------------------------------------------------------------------------

/// One of the five fixed roster positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamSlot {
    Tank,
    Damage1,
    Damage2,
    Support1,
    Support2,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown team slot `{0}` (expected tank, damage1, damage2, support1 or support2)")]
pub struct ParseSlotError(pub String);

impl TeamSlot {
    /// All slots in canonical order. Request bodies follow this order.
    pub const ALL: [TeamSlot; 5] = [
        TeamSlot::Tank,
        TeamSlot::Damage1,
        TeamSlot::Damage2,
        TeamSlot::Support1,
        TeamSlot::Support2,
    ];

    /// The hero role this slot accepts.
    pub fn required_role(&self) -> Role {
        match self {
            TeamSlot::Tank => Role::Tank,
            TeamSlot::Damage1 | TeamSlot::Damage2 => Role::Damage,
            TeamSlot::Support1 | TeamSlot::Support2 => Role::Support,
        }
    }

    fn index(&self) -> usize {
        match self {
            TeamSlot::Tank => 0,
            TeamSlot::Damage1 => 1,
            TeamSlot::Damage2 => 2,
            TeamSlot::Support1 => 3,
            TeamSlot::Support2 => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TeamSlot::Tank => "tank",
            TeamSlot::Damage1 => "damage1",
            TeamSlot::Damage2 => "damage2",
            TeamSlot::Support1 => "support1",
            TeamSlot::Support2 => "support2",
        }
    }
}

impl FromStr for TeamSlot {
    type Err = ParseSlotError;

    /// Accepts `tank`, `damage1`/`dps1`/`d1`, `support1`/`s1` and so on.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tank" | "t" => Ok(TeamSlot::Tank),
            "damage1" | "dps1" | "d1" => Ok(TeamSlot::Damage1),
            "damage2" | "dps2" | "d2" => Ok(TeamSlot::Damage2),
            "support1" | "s1" => Ok(TeamSlot::Support1),
            "support2" | "s2" => Ok(TeamSlot::Support2),
            other => Err(ParseSlotError(other.to_string())),
        }
    }
}

impl fmt::Display for TeamSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RosterState
// ---------------------------------------------------------------------------

/// One side's slot assignment.
///
/// Slots hold shared references into the catalog. Role compatibility is not
/// checked here: any hero can be placed in any slot, and callers that care
/// (the selection layer) must filter by `TeamSlot::required_role` first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RosterState {
    slots: [Option<Arc<Hero>>; 5],
}

impl RosterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a new roster with `slot` set to `hero` (or cleared for `None`).
    /// `self` is left untouched.
    pub fn set_slot(&self, slot: TeamSlot, hero: Option<Arc<Hero>>) -> RosterState {
        let mut next = self.clone();
        next.slots[slot.index()] = hero;
        next
    }

    pub fn get(&self, slot: TeamSlot) -> Option<&Arc<Hero>> {
        self.slots[slot.index()].as_ref()
    }

    /// Filled hero names in canonical slot order, skipping empty slots.
    pub fn name_list(&self) -> Vec<String> {
        self.iter()
            .filter_map(|(_, hero)| hero.map(|h| h.name.clone()))
            .collect()
    }

    /// `(slot, hero)` pairs in canonical order, including empty slots.
    pub fn iter(&self) -> impl Iterator<Item = (TeamSlot, Option<&Arc<Hero>>)> + '_ {
        TeamSlot::ALL.iter().map(move |&slot| (slot, self.get(slot)))
    }

    pub fn filled_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.filled_count() == 0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
