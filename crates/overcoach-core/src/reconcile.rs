// Reconciliation of recommendation responses against the hero catalog.
//
// The recommendation service is a generative upstream: hero names arrive as
// free text and the whole payload may be only loosely structured. Nothing in
// here fails. Every anomaly degrades to a fallback the UI knows how to show.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::hero::{HeroCatalog, Role};

/// In-band marker the service puts in the first entry's name when it could
/// not structure its own answer.
pub const PARSE_FAILED_MARKER: &str = "Parsing failed";

/// Shown in place of the hero grid when the service reported a parse failure.
pub const PARSE_FAILED_WARNING: &str = "Unable to parse the response format. \
     Please check the raw response below for the full recommendation.";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// A single recommended hero as returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeroRecommendation {
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub reasoning: String,
}

/// Body of a `POST /suggest` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecommendationResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub recommended_team: Vec<HeroRecommendation>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub strategy: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub synergies: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub alternatives: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub raw_response: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Reconciled types
// ---------------------------------------------------------------------------

/// A recommended hero enriched for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciledEntry {
    pub name: String,
    /// Role string exactly as the service sent it.
    pub role: String,
    pub reasoning: String,
    /// Catalog portrait, when the name matched a catalog hero.
    pub portrait: Option<String>,
    /// Bucket driving icon and color. Unknown role strings map to Damage.
    pub display_role: Role,
}

impl ReconciledEntry {
    /// Portrait URL, or the role icon name when no portrait resolved.
    pub fn image_or_icon(&self) -> &str {
        self.portrait
            .as_deref()
            .unwrap_or_else(|| self.display_role.icon())
    }
}

/// A recommendation ready to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciledRecommendation {
    pub entries: Vec<ReconciledEntry>,
    pub strategy: String,
    pub synergies: String,
    pub alternatives: Vec<String>,
    pub raw_response: String,
    /// The service signalled it could not structure its answer. Entries are
    /// passed through untouched and the raw response is authoritative.
    pub parse_failed: bool,
}

impl ReconciledRecommendation {
    /// Re-serialize into the wire shape, dropping display enrichment.
    pub fn to_raw(&self) -> RawRecommendationResponse {
        RawRecommendationResponse {
            recommended_team: self
                .entries
                .iter()
                .map(|e| HeroRecommendation {
                    name: e.name.clone(),
                    role: e.role.clone(),
                    reasoning: e.reasoning.clone(),
                })
                .collect(),
            strategy: self.strategy.clone(),
            synergies: self.synergies.clone(),
            alternatives: self.alternatives.clone(),
            raw_response: self.raw_response.clone(),
        }
    }

    /// Number of entries that resolved to a catalog portrait.
    pub fn resolved_count(&self) -> usize {
        self.entries.iter().filter(|e| e.portrait.is_some()).count()
    }
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// Whether the service flagged its own output as unparseable. Only the first
/// entry carries the marker.
pub fn is_parse_failed(raw: &RawRecommendationResponse) -> bool {
    raw.recommended_team
        .first()
        .is_some_and(|first| first.name.contains(PARSE_FAILED_MARKER))
}

/// Map a raw response onto the catalog for display.
pub fn reconcile(raw: &RawRecommendationResponse, catalog: &HeroCatalog) -> ReconciledRecommendation {
    let parse_failed = is_parse_failed(raw);

    let entries = raw
        .recommended_team
        .iter()
        .map(|rec| {
            let portrait = if parse_failed {
                None
            } else {
                catalog.find_hero(&rec.name).map(|h| h.portrait.clone())
            };
            if portrait.is_none() && !parse_failed {
                debug!("No catalog hero matches recommended name '{}'", rec.name);
            }
            ReconciledEntry {
                name: rec.name.clone(),
                role: rec.role.clone(),
                reasoning: rec.reasoning.clone(),
                portrait,
                display_role: Role::display_bucket(&rec.role),
            }
        })
        .collect();

    ReconciledRecommendation {
        entries,
        strategy: raw.strategy.clone(),
        synergies: raw.synergies.clone(),
        alternatives: raw.alternatives.clone(),
        raw_response: raw.raw_response.clone(),
        parse_failed,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hero::tests::test_catalog;

    fn rec(name: &str, role: &str, reasoning: &str) -> HeroRecommendation {
        HeroRecommendation {
            name: name.into(),
            role: role.into(),
            reasoning: reasoning.into(),
        }
    }

    fn raw(team: Vec<HeroRecommendation>) -> RawRecommendationResponse {
        RawRecommendationResponse {
            recommended_team: team,
            strategy: "Pressure the bunker from high ground.".into(),
            synergies: "Ana nades enable Winston dives.".into(),
            alternatives: vec!["D.Va".into()],
            raw_response: "RECOMMENDED TEAM:\nTank: Winston - dives backline".into(),
        }
    }

    #[test]
    fn lowercase_name_resolves_portrait() {
        let catalog = test_catalog();
        let out = reconcile(&raw(vec![rec("reinhardt", "tank", "shield")]), &catalog);

        assert!(!out.parse_failed);
        assert_eq!(
            out.entries[0].portrait.as_deref(),
            Some(catalog.find_hero("Reinhardt").unwrap().portrait.as_str())
        );
        assert_eq!(out.entries[0].display_role, Role::Tank);
    }

    #[test]
    fn unknown_name_has_no_portrait_and_falls_back_to_icon() {
        let catalog = test_catalog();
        let out = reconcile(&raw(vec![rec("Hanzo Jr", "support", "")]), &catalog);

        assert_eq!(out.entries[0].portrait, None);
        assert_eq!(out.entries[0].image_or_icon(), "heart");
        assert_eq!(out.resolved_count(), 0);
    }

    #[test]
    fn name_match_is_exact_not_substring() {
        let catalog = test_catalog();
        let out = reconcile(&raw(vec![rec("Rein", "tank", "")]), &catalog);
        assert_eq!(out.entries[0].portrait, None);
    }

    #[test]
    fn parse_failed_marker_skips_matching() {
        let catalog = test_catalog();
        let team = vec![
            rec("Parsing failed - see raw_response", "various", "Check raw_response"),
            rec("Reinhardt", "tank", "would otherwise match"),
        ];
        let input = raw(team.clone());
        let out = reconcile(&input, &catalog);

        assert!(out.parse_failed);
        assert!(out.entries.iter().all(|e| e.portrait.is_none()));
        assert_eq!(out.to_raw().recommended_team, team);
    }

    #[test]
    fn marker_only_counts_on_first_entry() {
        let catalog = test_catalog();
        let out = reconcile(
            &raw(vec![
                rec("Winston", "tank", ""),
                rec("Parsing failed", "various", ""),
            ]),
            &catalog,
        );
        assert!(!out.parse_failed);
        assert!(out.entries[0].portrait.is_some());
    }

    #[test]
    fn empty_team_is_not_a_parse_failure() {
        let catalog = test_catalog();
        let out = reconcile(&raw(vec![]), &catalog);
        assert!(!out.parse_failed);
        assert!(out.entries.is_empty());
    }

    #[test]
    fn unknown_role_buckets_as_damage_but_keeps_text() {
        let catalog = test_catalog();
        let out = reconcile(&raw(vec![rec("Ana", "Flex Support?", "")]), &catalog);

        assert_eq!(out.entries[0].display_role, Role::Damage);
        assert_eq!(out.entries[0].role, "Flex Support?");
        assert!(out.entries[0].portrait.is_some());
    }

    #[test]
    fn role_bucket_is_case_insensitive() {
        let catalog = test_catalog();
        let out = reconcile(&raw(vec![rec("Mercy", "SUPPORT", "")]), &catalog);
        assert_eq!(out.entries[0].display_role, Role::Support);
    }

    #[test]
    fn reconcile_is_idempotent_across_reserialization() {
        let catalog = test_catalog();
        let first = reconcile(
            &raw(vec![
                rec("winston", "tank", "dive"),
                rec("Soldier: 76", "damage", "hitscan"),
                rec("Nobody", "damage", "?"),
                rec("ana", "support", "anti-heal"),
            ]),
            &catalog,
        );

        let json = serde_json::to_string(&first.to_raw()).unwrap();
        let reparsed: RawRecommendationResponse = serde_json::from_str(&json).unwrap();
        let second = reconcile(&reparsed, &catalog);

        let portraits = |r: &ReconciledRecommendation| {
            r.entries.iter().map(|e| e.portrait.clone()).collect::<Vec<_>>()
        };
        assert_eq!(portraits(&first), portraits(&second));
        assert_eq!(first, second);
    }

    #[test]
    fn text_fields_pass_through() {
        let catalog = test_catalog();
        let input = raw(vec![rec("Ana", "support", "")]);
        let out = reconcile(&input, &catalog);
        assert_eq!(out.strategy, input.strategy);
        assert_eq!(out.synergies, input.synergies);
        assert_eq!(out.alternatives, input.alternatives);
        assert_eq!(out.raw_response, input.raw_response);
    }

    #[test]
    fn response_tolerates_null_and_missing_alternatives() {
        let json = r#"{
            "recommended_team": [{ "name": "Winston", "role": "tank", "reasoning": "dive" }],
            "strategy": "s",
            "synergies": "y",
            "alternatives": null,
            "raw_response": "raw"
        }"#;
        let parsed: RawRecommendationResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.alternatives.is_empty());

        let json = r#"{ "recommended_team": [], "strategy": "s", "synergies": "y", "raw_response": "r" }"#;
        let parsed: RawRecommendationResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.alternatives.is_empty());
        assert_eq!(parsed.raw_response, "r");
    }
}
