// Team-composition model: hero catalog, rosters, request building and
// response reconciliation. Pure data and functions, no I/O.

pub mod hero;
pub mod reconcile;
pub mod request;
pub mod roster;

pub use hero::{Hero, HeroCatalog, OverwatchMap, Role};
pub use reconcile::{
    reconcile, HeroRecommendation, RawRecommendationResponse, ReconciledEntry,
    ReconciledRecommendation,
};
pub use request::{can_suggest, RecommendationRequest};
pub use roster::{ParseSlotError, RosterState, TeamSlot};
