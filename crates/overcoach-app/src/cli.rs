// Line-oriented terminal front end.
//
// Parses typed lines into UserCommand messages for the app loop and renders
// UiUpdate messages as plain text.

use std::fmt::Write as _;

use overcoach_core::reconcile::PARSE_FAILED_WARNING;
use overcoach_core::{ParseSlotError, ReconciledRecommendation, Role, TeamSlot};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::protocol::{SessionSnapshot, Side, SuggestionPhase, UiUpdate, UserCommand};

pub const HELP_TEXT: &str = "\
Commands:
  enemy <slot> <hero>     set an enemy slot (hero `-` or `none` clears it)
  mine <slot> <hero>      set one of your slots
  map <name> | map none   select or clear the map
  note <text>             what you are struggling with (empty clears)
  suggest                 ask the coach for a team
  dismiss                 clear the last suggestion or error
  heroes [role] [query]   search heroes
  maps [query]            search maps
  roster                  show both teams
  counters <hero>         ask how to counter a hero
  health                  check the recommendation service
  help                    show this text
  quit                    exit
Slots: tank, damage1, damage2, support1, support2 (also t, d1, dps2, s1...)";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCommandError {
    #[error("unknown command `{0}` (type `help`)")]
    Unknown(String),

    #[error("usage: {0}")]
    MissingArgument(&'static str),

    #[error(transparent)]
    Slot(#[from] ParseSlotError),
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<UserCommand>, ParseCommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let cmd = match word.to_lowercase().as_str() {
        "enemy" => parse_select(Side::Enemy, rest, "enemy <slot> <hero|->")?,
        "mine" => parse_select(Side::Mine, rest, "mine <slot> <hero|->")?,
        "map" => {
            if rest.is_empty() {
                return Err(ParseCommandError::MissingArgument("map <name> | map none"));
            }
            UserCommand::SelectMap(clearable(rest))
        }
        "note" => UserCommand::SetDifficulty(rest.to_string()),
        "suggest" => UserCommand::Suggest,
        "dismiss" => UserCommand::Dismiss,
        "heroes" => {
            let (role, query) = match rest.split_once(char::is_whitespace) {
                Some((first, tail)) => match Role::from_str_role(first) {
                    Some(role) => (Some(role), tail.trim()),
                    None => (None, rest),
                },
                None => match Role::from_str_role(rest) {
                    Some(role) => (Some(role), ""),
                    None => (None, rest),
                },
            };
            UserCommand::SearchHeroes {
                query: query.to_string(),
                role,
            }
        }
        "maps" => UserCommand::SearchMaps(rest.to_string()),
        "roster" => UserCommand::ShowRoster,
        "counters" => {
            if rest.is_empty() {
                return Err(ParseCommandError::MissingArgument("counters <hero>"));
            }
            UserCommand::Counters(rest.to_string())
        }
        "health" => UserCommand::CheckHealth,
        "help" | "?" => UserCommand::Help,
        "quit" | "exit" | "q" => UserCommand::Quit,
        _ => return Err(ParseCommandError::Unknown(word.to_string())),
    };
    Ok(Some(cmd))
}

fn parse_select(
    side: Side,
    rest: &str,
    usage: &'static str,
) -> Result<UserCommand, ParseCommandError> {
    let Some((slot, hero)) = rest.split_once(char::is_whitespace) else {
        return Err(ParseCommandError::MissingArgument(usage));
    };
    Ok(UserCommand::SelectHero {
        side,
        slot: slot.parse::<TeamSlot>()?,
        hero: clearable(hero.trim()),
    })
}

/// `-` and `none` mean "clear"; anything else is a name.
fn clearable(arg: &str) -> Option<String> {
    if arg == "-" || arg.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(arg.to_string())
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render an update as text. `max_alternatives` caps the alternatives list.
pub fn render(update: &UiUpdate, max_alternatives: usize) -> String {
    match update {
        UiUpdate::Snapshot(snapshot) => render_snapshot(snapshot),
        UiUpdate::HeroResults { role, heroes } => {
            let mut out = match role {
                Some(role) => format!("{} heroes:", role.as_str()),
                None => "Heroes:".to_string(),
            };
            if heroes.is_empty() {
                out.push_str(" no matches");
            }
            for hero in heroes {
                let _ = write!(out, "\n  {} [{}]", hero.name, hero.role.as_str().to_uppercase());
            }
            out
        }
        UiUpdate::MapResults(maps) => {
            let mut out = "Maps:".to_string();
            if maps.is_empty() {
                out.push_str(" no matches");
            }
            for map in maps {
                let _ = write!(out, "\n  {} ({})", map.name, map.gamemodes_label());
            }
            out
        }
        UiUpdate::SuggestionStarted { .. } => "Getting suggestions...".to_string(),
        UiUpdate::SuggestionReady(rec) => render_recommendation(rec, max_alternatives),
        UiUpdate::SuggestionFailed(message) => format!("Error: {message} (type `dismiss`)"),
        UiUpdate::Dismissed => "Dismissed.".to_string(),
        UiUpdate::ValidationError(message) => format!("Invalid: {message}"),
        UiUpdate::Health(status) => format!(
            "Coach API: {} (ollama connected: {}, heroes indexed: {}, maps indexed: {})",
            status.status, status.ollama_connected, status.heroes_indexed, status.maps_indexed
        ),
        UiUpdate::Counters(counters) => {
            format!("Counters to {}:\n{}", counters.hero, counters.counters)
        }
        UiUpdate::ServiceError(message) => format!("Error: {message}"),
        UiUpdate::Help => HELP_TEXT.to_string(),
    }
}

fn render_snapshot(snapshot: &SessionSnapshot) -> String {
    let mut out = String::new();
    for (side, roster) in [(Side::Enemy, &snapshot.enemy), (Side::Mine, &snapshot.mine)] {
        let _ = writeln!(out, "{side}:");
        for (slot, hero) in roster {
            let _ = writeln!(out, "  {:<9} {}", slot.as_str(), hero.as_deref().unwrap_or("-"));
        }
    }
    match &snapshot.map {
        Some(map) => {
            let _ = writeln!(out, "Map: {} ({})", map.name, map.gamemodes_label());
        }
        None => out.push_str("Map: none\n"),
    }
    if !snapshot.difficulty.trim().is_empty() {
        let _ = writeln!(out, "Note: {}", snapshot.difficulty.trim());
    }
    let status = match snapshot.phase {
        SuggestionPhase::Submitting => "waiting for the coach",
        _ if snapshot.can_suggest => "ready to suggest",
        _ => "add an enemy hero to get suggestions",
    };
    let _ = write!(out, "Status: {status}");
    out
}

fn render_recommendation(rec: &ReconciledRecommendation, max_alternatives: usize) -> String {
    let mut out = String::from("Recommended team:");
    if rec.parse_failed {
        let _ = write!(out, "\n  {PARSE_FAILED_WARNING}");
    } else {
        for entry in &rec.entries {
            let _ = write!(
                out,
                "\n  {} [{}] ({}) <{}> - {}",
                entry.name,
                entry.role.to_uppercase(),
                entry.image_or_icon(),
                entry.display_role.color(),
                entry.reasoning
            );
        }
    }
    if !rec.strategy.is_empty() {
        let _ = write!(out, "\nStrategy: {}", rec.strategy);
    }
    if !rec.synergies.is_empty() {
        let _ = write!(out, "\nSynergies: {}", rec.synergies);
    }
    if !rec.alternatives.is_empty() {
        let shown: Vec<&str> = rec
            .alternatives
            .iter()
            .take(max_alternatives)
            .map(String::as_str)
            .collect();
        let _ = write!(out, "\nAlternatives: {}", shown.join(", "));
    }
    if !rec.raw_response.is_empty() {
        let _ = write!(out, "\nRaw response:\n{}", rec.raw_response);
    }
    out
}

// ---------------------------------------------------------------------------
// Front-end loop
// ---------------------------------------------------------------------------

/// Run the terminal front end until the user quits, stdin closes or the app
/// loop drops its UI channel.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
    max_alternatives: usize,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Overcoach ready. Type `help` for commands.");

    loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    Some(update) => println!("{}", render(&update, max_alternatives)),
                    None => break,
                }
            }

            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        info!("stdin closed, quitting");
                        let _ = cmd_tx.send(UserCommand::Quit).await;
                        break;
                    }
                    Err(e) => {
                        warn!("Failed to read stdin: {}", e);
                        let _ = cmd_tx.send(UserCommand::Quit).await;
                        break;
                    }
                };
                match parse_command(&line) {
                    Ok(Some(cmd)) => {
                        let quit = cmd == UserCommand::Quit;
                        if cmd_tx.send(cmd).await.is_err() || quit {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => println!("{e}"),
                }
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
