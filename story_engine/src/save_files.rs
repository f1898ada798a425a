//! Save documents and save-slot files.
//!
//! [`save`] and [`load`] convert between a [`GameState`] and a RON or JSON document. `load`
//! builds a complete new state or fails; it never touches an existing one. The file helpers
//! below wrap those with slot naming and discovery.
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use story_data::{SaveDoc, SavedAchievement, SavedEffect, SavedHealthEffect, SavedItem, SavedPuzzle};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use crate::STORY_ENGINE_VERSION;
use crate::effect::Effect;
use crate::error::EngineError;
use crate::health::{Health, HealthEffect};
use crate::inventory::{Inventory, Item};
use crate::puzzle::Puzzle;
use crate::state::GameState;

const SLOT_MARKER: &str = "-story-";

/// On-disk document syntax.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveFormat {
    #[default]
    Ron,
    Json,
}

impl SaveFormat {
    pub fn extension(self) -> &'static str {
        match self {
            SaveFormat::Ron => "ron",
            SaveFormat::Json => "json",
        }
    }

    /// Pick a format from a file extension.
    pub fn from_path(path: &Path) -> Option<SaveFormat> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("ron") => Some(SaveFormat::Ron),
            Some("json") => Some(SaveFormat::Json),
            _ => None,
        }
    }
}

/// Capture the persistable parts of `state`. Item `on_use` hooks are left out; puzzle and
/// effect hooks are kept by name.
pub fn to_save_doc(state: &GameState, session: Option<Uuid>) -> SaveDoc {
    let saved_at = OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
    SaveDoc {
        version: STORY_ENGINE_VERSION.to_string(),
        saved_at,
        session: session.map(|id| id.to_string()),
        path: state.path.clone(),
        health: state.health.current(),
        inventory: state
            .inventory
            .slots()
            .iter()
            .map(|slot| {
                let item = slot.item.as_ref().map(|item| SavedItem {
                    name: item.name.clone(),
                    description: item.description.clone(),
                });
                (slot.name.clone(), item)
            })
            .collect(),
        achievements: state
            .achievements
            .iter()
            .map(|a| SavedAchievement {
                name: a.name.clone(),
                description: a.description.clone(),
            })
            .collect(),
        values: state.values.clone(),
        visited: state.visited.clone(),
        ticks: state.ticks,
        health_effects: state.health.effects().iter().map(SavedHealthEffect::from).collect(),
        effects: state.effects.iter().map(SavedEffect::from).collect(),
        puzzle: state.puzzle.as_ref().map(SavedPuzzle::from),
        conversations: state.conversations.clone(),
    }
}

/// Build a fresh state from a save document. Puzzle and effect hooks come back unbound.
pub fn from_save_doc(doc: SaveDoc) -> GameState {
    let mut inventory = Inventory::with_slots(Vec::<String>::new());
    for (slot, saved) in doc.inventory {
        match saved {
            Some(saved) => {
                inventory.insert(&slot, Item::new(saved.name, saved.description));
            },
            None => inventory.add_slot(&slot),
        }
    }

    let mut health = Health::new(doc.health);
    for fx in doc.health_effects {
        health.add_effect(HealthEffect::from(fx));
    }

    let mut state = GameState::new(0).with_inventory(inventory).with_values(doc.values);
    state.health = health;
    for a in &doc.achievements {
        state.achievements.add(&a.name, &a.description);
    }
    state.path = doc.path;
    state.visited = doc.visited;
    state.ticks = doc.ticks;
    state.effects = doc.effects.into_iter().map(Effect::from).collect();
    state.puzzle = doc.puzzle.map(Puzzle::from);
    state.conversations = doc.conversations;
    state
}

/// Serialize `state` into a document string.
///
/// # Errors
/// - if the serializer rejects the document
pub fn save(state: &GameState, format: SaveFormat) -> Result<String> {
    encode(&to_save_doc(state, None), format)
}

fn encode(doc: &SaveDoc, format: SaveFormat) -> Result<String> {
    match format {
        SaveFormat::Ron => ron::ser::to_string_pretty(doc, ron::ser::PrettyConfig::default())
            .context("serializing save document as RON"),
        SaveFormat::Json => serde_json::to_string_pretty(doc).context("serializing save document as JSON"),
    }
}

/// Parse a save document into the document type without building a state.
///
/// # Errors
/// - `Deserialization` on malformed input, missing required fields or type mismatches
pub fn decode(raw: &str, format: SaveFormat) -> Result<SaveDoc, EngineError> {
    match format {
        SaveFormat::Ron => ron::from_str::<SaveDoc>(raw).map_err(|e| EngineError::Deserialization(e.to_string())),
        SaveFormat::Json => serde_json::from_str::<SaveDoc>(raw).map_err(|e| EngineError::Deserialization(e.to_string())),
    }
}

/// Parse a save document into a complete new `GameState`.
///
/// # Errors
/// - `Deserialization` on malformed input, missing required fields or type mismatches
pub fn load(raw: &str, format: SaveFormat) -> Result<GameState, EngineError> {
    let doc = decode(raw, format)?;
    if doc.version != STORY_ENGINE_VERSION && !doc.version.is_empty() {
        warn!(
            "save written by version {} (running {STORY_ENGINE_VERSION})",
            doc.version
        );
    }
    Ok(from_save_doc(doc))
}

/// Write `doc` to `path`, going through a sibling temp file so a crash never leaves a
/// half-written save behind.
///
/// # Errors
/// - on serialization or file IO failure
pub fn write_doc(path: &Path, doc: &SaveDoc, format: SaveFormat) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating save directory {}", dir.display()))?;
    }
    let body = encode(doc, format)?;
    let tmp = path.with_extension(format!("{}.tmp", format.extension()));
    fs::write(&tmp, body).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("moving save into place at {}", path.display()))?;
    info!("game saved to {}", path.display());
    Ok(())
}

/// Load a save file, picking the format from its extension (RON if unknown).
///
/// # Errors
/// - if the file cannot be read or parsed
pub fn load_save_file(path: &Path) -> Result<GameState> {
    let format = SaveFormat::from_path(path).unwrap_or_default();
    let raw = fs::read_to_string(path).with_context(|| format!("reading save file {}", path.display()))?;
    let state = load(&raw, format).with_context(|| format!("parsing save file {}", path.display()))?;
    info!("game loaded from {}", path.display());
    Ok(state)
}

/// File name for a save slot: `<slot>-story-<version>.<ext>`.
pub fn slot_file_name(slot: &str, format: SaveFormat) -> String {
    format!(
        "{}{SLOT_MARKER}{STORY_ENGINE_VERSION}.{}",
        sanitize_slot(slot),
        format.extension()
    )
}

/// A save file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveSlot {
    pub slot: String,
    pub version: String,
    pub format: SaveFormat,
    pub path: PathBuf,
    pub file_name: String,
    pub modified: Option<SystemTime>,
}

/// Discover save slot files stored in `dir`.
///
/// # Errors
/// Returns an error if the directory contents cannot be read or enumerated.
pub fn collect_save_slots(dir: &Path) -> Result<Vec<SaveSlot>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut slots = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let entry = entry.with_context(|| format!("enumerating {}", dir.display()))?;
        if let Some(slot) = slot_from_entry(&entry) {
            slots.push(slot);
        }
    }
    slots.sort_by(|a, b| a.slot.cmp(&b.slot).then(a.version.cmp(&b.version)));
    Ok(slots)
}

fn slot_from_entry(entry: &fs::DirEntry) -> Option<SaveSlot> {
    let path = entry.path();
    if !path.is_file() {
        return None;
    }
    let format = SaveFormat::from_path(&path)?;
    let file_name = path.file_name().and_then(|name| name.to_str())?.to_string();
    let stem = path.file_stem().and_then(|stem| stem.to_str())?;
    let (slot, version) = stem.rsplit_once(SLOT_MARKER)?;
    if slot.is_empty() {
        return None;
    }
    let modified = entry.metadata().ok().and_then(|meta| meta.modified().ok());
    Some(SaveSlot {
        slot: slot.to_string(),
        version: version.to_string(),
        format,
        path,
        file_name,
        modified,
    })
}

/// Normalize a user-provided slot name into a filesystem-safe slug.
pub fn sanitize_slot(raw: &str) -> String {
    let mut slug = String::new();
    let mut pending_dash = false;
    for ch in raw.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(ch.to_ascii_lowercase());
            pending_dash = false;
        } else if ch == '_' {
            if !slug.is_empty() {
                slug.push(ch);
            }
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }

    let trimmed = slug.trim_matches(&['-', '_'][..]).to_string();
    if trimmed.is_empty() { "save".to_string() } else { trimmed }
}

/// Format a human-friendly modified time relative to now.
pub fn format_modified(modified: SystemTime) -> String {
    match SystemTime::now().duration_since(modified) {
        Ok(delta) => format_duration(delta),
        Err(_) => "in the future".to_string(),
    }
}

/// Convert a duration into a compact "time ago" string.
fn format_duration(duration: Duration) -> String {
    const MINUTE: u64 = 60;
    const HOUR: u64 = MINUTE * 60;
    const DAY: u64 = HOUR * 24;
    const WEEK: u64 = DAY * 7;

    let secs = duration.as_secs();
    if secs < 30 {
        "just now".to_string()
    } else if secs < MINUTE {
        format!("{secs}s ago")
    } else if secs < HOUR {
        format!("{}m ago", secs / MINUTE)
    } else if secs < DAY {
        format!("{}h ago", secs / HOUR)
    } else if secs < WEEK {
        format!("{}d ago", secs / DAY)
    } else {
        format!("{}w ago", secs / WEEK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;
    use tempfile::tempdir;

    fn populated() -> GameState {
        let mut state = GameState::new(10);
        state.set_path(vec!["Go north".into(), "Climb".into()]);
        state.add_item("Right hand", "Torch", "Smoky", None);
        state.add_achievement("First Steps", "Left the cave");
        state.modify_hp(-3);
        state.set_value("coins", 4);
        state.set_value("door", "open");
        state.add_health_effect(HealthEffect::DamageOverTime {
            cause: "poison".into(),
            amount: 1,
            times: 2,
        });
        state.add_health_effect(HealthEffect::HealOverTime {
            cause: "salve".into(),
            amount: 2,
            times: 1,
        });
        state.apply_effect(Effect::new("Lantern", 3).on_expire(crate::hook::Hook::new("dark", |_: &mut GameState| {})));
        state.pose_puzzle(Puzzle::new("Which way?", vec!["Up".into(), "Down".into()], 0).unwrap());
        state.set_conversation("Miller", vec!["mill".into()]);
        state
    }

    fn assert_same_persisted(a: &GameState, b: &GameState) {
        assert_eq!(a.path(), b.path());
        assert_eq!(a.health(), b.health());
        let slots = |s: &GameState| -> Vec<(String, Option<(String, String)>)> {
            s.inventory()
                .slots()
                .iter()
                .map(|slot| {
                    let item = slot.item.as_ref().map(|i| (i.name.clone(), i.description.clone()));
                    (slot.name.clone(), item)
                })
                .collect()
        };
        assert_eq!(slots(a), slots(b));
        assert_eq!(a.achievement_list(), b.achievement_list());
        assert_eq!(a.values(), b.values());
        assert_eq!(a.visited(), b.visited());
        assert_eq!(a.health_effects(), b.health_effects());
        let effects = |s: &GameState| -> Vec<SavedEffect> { s.effects().iter().map(SavedEffect::from).collect() };
        assert_eq!(effects(a), effects(b));
        assert_eq!(a.puzzle().map(SavedPuzzle::from), b.puzzle().map(SavedPuzzle::from));
        assert_eq!(a.conversation("Miller"), b.conversation("Miller"));
    }

    #[test]
    fn json_round_trip_keeps_persisted_fields() -> Result<()> {
        let state = populated();
        let raw = save(&state, SaveFormat::Json)?;
        let back = load(&raw, SaveFormat::Json)?;
        assert_same_persisted(&state, &back);
        assert!(back.events().is_empty());
        Ok(())
    }

    #[test]
    fn ron_round_trip_keeps_persisted_fields() -> Result<()> {
        let state = populated();
        let raw = save(&state, SaveFormat::Ron)?;
        let back = load(&raw, SaveFormat::Ron)?;
        assert_same_persisted(&state, &back);
        assert_eq!(back.health_effects().len(), 2);
        Ok(())
    }

    #[test]
    fn on_use_hooks_are_not_persisted() -> Result<()> {
        let mut state = GameState::new(1);
        let hook = crate::hook::Hook::new("light", |_: &mut GameState| {});
        state.add_item("Left hand", "Lamp", "Brass", Some(hook));
        let back = load(&save(&state, SaveFormat::Json)?, SaveFormat::Json)?;
        let lamp = back.inventory().get("Left hand").unwrap();
        assert_eq!(lamp.name, "Lamp");
        assert!(lamp.on_use.is_none());
        Ok(())
    }

    #[test]
    fn malformed_input_is_a_deserialization_error() {
        let missing_health = json!({
            "path": [],
            "inventory": {},
            "achievements": [],
            "values": {}
        })
        .to_string();
        assert!(matches!(
            load(&missing_health, SaveFormat::Json),
            Err(EngineError::Deserialization(_))
        ));

        let wrong_type = json!({
            "path": "north",
            "health": 3,
            "inventory": {},
            "achievements": [],
            "values": {}
        })
        .to_string();
        assert!(matches!(load(&wrong_type, SaveFormat::Json), Err(EngineError::Deserialization(_))));
        assert!(matches!(load("not ron at all (", SaveFormat::Ron), Err(EngineError::Deserialization(_))));
    }

    #[test]
    fn slot_files_are_written_and_discovered() -> Result<()> {
        let dir = tempdir()?;
        let state = populated();
        let path = dir.path().join(slot_file_name("My Slot!", SaveFormat::Ron));
        write_doc(&path, &to_save_doc(&state, Some(Uuid::new_v4())), SaveFormat::Ron)?;
        fs::write(dir.path().join("notes.txt"), "ignore me")?;

        let slots = collect_save_slots(dir.path())?;
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].slot, "my-slot");
        assert_eq!(slots[0].version, STORY_ENGINE_VERSION);
        assert_eq!(slots[0].format, SaveFormat::Ron);

        let back = load_save_file(&slots[0].path)?;
        assert_same_persisted(&state, &back);
        Ok(())
    }

    #[test]
    fn missing_save_directory_lists_nothing() -> Result<()> {
        let dir = tempdir()?;
        assert!(collect_save_slots(&dir.path().join("missing"))?.is_empty());
        Ok(())
    }

    #[test]
    fn sanitize_slot_falls_back() {
        assert_eq!(sanitize_slot("  Chapter 2: Caves "), "chapter-2-caves");
        assert_eq!(sanitize_slot("!!!"), "save");
    }

    #[test]
    fn durations_read_naturally() {
        assert_eq!(format_duration(Duration::from_secs(5)), "just now");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m ago");
        assert_eq!(format_duration(Duration::from_secs(3 * 86_400)), "3d ago");
    }
}
