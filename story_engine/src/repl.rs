//! Terminal presenter.
//!
//! A small read-eval-print loop over the [`StoryEngine`] presentation contract: it draws the
//! current node and its numbered choices, shows queued messages (including ones produced by
//! the tick thread since the last prompt), and maps input onto engine calls.
use std::path::{Path, PathBuf};

use anyhow::Result;
use colored::Colorize;
use log::{info, warn};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use textwrap::{fill, termwidth};

use crate::config::EngineConfig;
use crate::engine::StoryEngine;
use crate::error::EngineError;
use crate::graph::StoryNode;
use crate::health::HealthEffect;
use crate::hook::HookRegistry;
use crate::save_files::{format_modified, sanitize_slot, slot_file_name};
use crate::state::StoryMap;
use crate::style::{StoryStyle, message_style};

/// Parsed player input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Choose(usize),
    ChooseLabel(String),
    Look,
    Inventory,
    Achievements,
    Map,
    Use(String),
    Talk(String),
    Say(String),
    Solve(usize),
    Status,
    Save(String),
    Load(String),
    Slots,
    Help,
    Quit,
}

/// Turn a line of input into a command. Anything unrecognized is treated as a choice label.
pub fn parse_command(input: &str) -> Option<Command> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(n) = input.parse::<usize>() {
        return Some(Command::Choose(n));
    }
    let (verb, rest) = input.split_once(' ').map_or((input, ""), |(v, r)| (v, r.trim()));
    let command = match verb.to_lowercase().as_str() {
        "look" | "l" => Command::Look,
        "inventory" | "inv" | "i" => Command::Inventory,
        "achievements" | "ach" => Command::Achievements,
        "map" => Command::Map,
        "use" if !rest.is_empty() => Command::Use(rest.to_string()),
        "talk" if !rest.is_empty() => Command::Talk(rest.to_string()),
        "say" if !rest.is_empty() => Command::Say(rest.to_string()),
        "solve" => match rest.parse::<usize>() {
            Ok(n) => Command::Solve(n),
            Err(_) => Command::ChooseLabel(input.to_string()),
        },
        "status" | "st" => Command::Status,
        "save" => Command::Save(if rest.is_empty() { "quick".into() } else { rest.to_string() }),
        "load" => Command::Load(if rest.is_empty() { "quick".into() } else { rest.to_string() }),
        "slots" => Command::Slots,
        "help" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        _ => Command::ChooseLabel(input.to_string()),
    };
    Some(command)
}

/// Run the loop until the player quits or input ends.
///
/// # Errors
/// - if the terminal cannot be set up
pub fn run_repl(engine: &StoryEngine, config: &EngineConfig, hooks: &HookRegistry) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    let history = history_file_path();
    if let Some(path) = &history
        && editor.load_history(path).is_err()
    {
        info!("no input history at {}", path.display());
    }

    show_node(engine);
    let mut talking_to: Option<String> = None;
    loop {
        flush_messages(engine);
        let prompt = format!("\n[HP: {}]>> ", engine.health()).prompt_style().to_string();
        let line = match editor.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("{}", "Command canceled.".prompt_style());
                continue;
            },
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        if let Err(e) = editor.add_history_entry(line.as_str()) {
            warn!("could not record input history: {e}");
        }

        let Some(command) = parse_command(&line) else {
            continue;
        };
        match command {
            Command::Choose(n) => {
                let label = engine
                    .current_node()
                    .ok()
                    .and_then(|node| node.labels().nth(n.wrapping_sub(1)).map(str::to_string));
                match label {
                    Some(label) => choose(engine, &label),
                    None => println!("{}", format!("There is no choice {n}.").error_style()),
                }
            },
            Command::ChooseLabel(label) => choose(engine, &label),
            Command::Look => show_node(engine),
            Command::Inventory => show_inventory(engine),
            Command::Achievements => show_achievements(engine),
            Command::Map => show_map(&engine.story_map(), 0),
            Command::Use(slot) => {
                if !engine.use_item(&slot) {
                    println!("{}", format!("Nothing in '{slot}'.").error_style());
                }
            },
            Command::Talk(query) => match find_npc(&engine.npc_names(), &query) {
                Some(name) => {
                    talk(engine, &name, None);
                    talking_to = Some(name);
                },
                None => println!("{}", format!("Nobody called '{query}' is here.").error_style()),
            },
            Command::Say(reply) => match &talking_to {
                Some(name) => talk(engine, name, Some(reply.as_str())),
                None => println!("{}", "You aren't talking to anyone.".error_style()),
            },
            Command::Solve(n) => solve(engine, n),
            Command::Status => show_status(engine),
            Command::Save(slot) => match engine.save_to_slot(&config.save_dir, &slot, config.save_format) {
                Ok(path) => println!("Saved to {}.", path.display()),
                Err(e) => println!("{}", format!("Save failed: {e:#}").error_style()),
            },
            Command::Load(slot) => load_slot(engine, config, hooks, &slot),
            Command::Slots => show_slots(&config.save_dir),
            Command::Help => show_help(),
            Command::Quit => break,
        }
    }

    if let Some(path) = &history
        && ensure_history_dir(path)
        && let Err(e) = editor.save_history(path)
    {
        warn!("could not save input history: {e}");
    }
    Ok(())
}

fn choose(engine: &StoryEngine, label: &str) {
    match engine.select_answer(label) {
        Ok(_) => show_node(engine),
        Err(EngineError::InvalidChoice { .. }) => {
            println!("{}", "That is not one of the choices.".error_style());
        },
        Err(e) => println!("{}", e.to_string().error_style()),
    }
}

/// First registered name containing `query`, ignoring case.
fn find_npc(names: &[&str], query: &str) -> Option<String> {
    let query = query.to_lowercase();
    names
        .iter()
        .find(|name| name.to_lowercase().contains(&query))
        .map(|name| (*name).to_string())
}

fn talk(engine: &StoryEngine, name: &str, reply: Option<&str>) {
    // a numeric reply picks from the listed responses
    let numbered = reply.and_then(|r| r.parse::<usize>().ok()).and_then(|n| {
        engine
            .npc_view(name)
            .ok()
            .and_then(|view| view.responses.get(n.wrapping_sub(1)).cloned())
    });
    let reply = numbered.as_deref().or(reply);
    match engine.talk_to(name, reply) {
        Ok(view) => {
            flush_messages(engine);
            if reply.is_some() {
                println!("{}: {}", view.npc.item_style(), view.text);
            }
            if view.responses.is_empty() {
                println!("{}", format!("{} has nothing more to say.", view.npc).ending_style());
            }
            for (n, label) in view.responses.iter().enumerate() {
                println!("  {}. {}", n + 1, label.choice_style());
            }
        },
        Err(EngineError::InvalidChoice { .. }) => {
            println!("{}", "That is not something you can say here.".error_style());
        },
        Err(e) => println!("{}", e.to_string().error_style()),
    }
}

fn solve(engine: &StoryEngine, n: usize) {
    match engine.attempt_puzzle(n.wrapping_sub(1)) {
        Ok(_) => flush_messages(engine),
        Err(EngineError::InvalidChoice { .. }) => println!("{}", format!("There is no option {n}.").error_style()),
        Err(e) => println!("{}", e.to_string().error_style()),
    }
}

fn load_slot(engine: &StoryEngine, config: &EngineConfig, hooks: &HookRegistry, slot: &str) {
    let wanted = sanitize_slot(slot);
    let path = match StoryEngine::list_slots(&config.save_dir) {
        Ok(slots) => slots
            .into_iter()
            .filter(|s| s.slot == wanted)
            .max_by(|a, b| a.modified.cmp(&b.modified))
            .map(|s| s.path),
        Err(e) => {
            println!("{}", format!("Could not list saves: {e:#}").error_style());
            return;
        },
    };
    let path = path.unwrap_or_else(|| config.save_dir.join(slot_file_name(slot, config.save_format)));
    match engine.load_from_path(&path, Some(hooks)) {
        Ok(_) => show_node(engine),
        Err(e) => println!("{}", format!("Load failed: {e:#}").error_style()),
    }
}

fn show_node(engine: &StoryEngine) {
    let width = termwidth();
    match engine.current_node() {
        Ok(node) => draw_node(node, width),
        Err(e) => println!("{}", e.to_string().error_style()),
    }
    show_puzzle(engine);
}

fn show_puzzle(engine: &StoryEngine) {
    if let Some(puzzle) = engine.current_puzzle() {
        println!("\n{}", puzzle.question().achievement_style());
        for (n, option) in puzzle.options().iter().enumerate() {
            println!("  ({}) {}", n + 1, option);
        }
        println!("{}", "Answer with 'solve <n>'.".prompt_style());
    }
}

fn draw_node(node: &StoryNode, width: usize) {
    println!("\n{:.>width$}\n", "scene".section_style());
    println!("{}", fill(node.condition(), width).condition_style());
    if node.is_terminal() {
        println!("\n{}", "No choices remain. The path ends here.".ending_style());
        return;
    }
    println!();
    for (n, label) in node.labels().enumerate() {
        println!("  {}. {}", n + 1, label.choice_style());
    }
}

fn flush_messages(engine: &StoryEngine) {
    let messages = engine.drain_messages();
    if messages.is_empty() {
        return;
    }
    println!("\n{:.>width$}\n", "messages".section_style(), width = termwidth());
    for message in messages {
        println!("{}", message_style(&message.text, message.kind));
    }
}

fn show_inventory(engine: &StoryEngine) {
    let slots = engine.inventory();
    let mut any = false;
    for slot in &slots {
        if let Some(item) = &slot.item {
            any = true;
            println!(
                "{}: {} - {}",
                slot.name.slot_style(),
                item.name.item_style(),
                item.description
            );
        }
    }
    if !any {
        println!("Your inventory is empty.");
    }
}

fn show_achievements(engine: &StoryEngine) {
    let achievements = engine.achievements();
    if achievements.is_empty() {
        println!("No achievements yet.");
    }
    for a in achievements {
        println!("{} {}: {}", "*".bold(), a.name.achievement_style(), a.description);
    }
}

fn show_status(engine: &StoryEngine) {
    let state = engine.snapshot();
    println!("{}", format!("Health: {}", state.health()).health_style());
    for fx in state.health_effects() {
        println!("  {} ({} more ticks)", fx.cause(), remaining_ticks(fx));
    }
    for fx in state.effects() {
        println!("  {} ({} more ticks)", fx.name().item_style(), fx.remaining());
    }
    println!("Ticks so far: {}", state.ticks());
}

fn remaining_ticks(fx: &HealthEffect) -> u32 {
    match fx {
        HealthEffect::DamageOverTime { times, .. } | HealthEffect::HealOverTime { times, .. } => *times,
    }
}

fn show_map(map: &StoryMap, depth: usize) {
    for (label, child) in &map.children {
        println!("{:indent$}- {}", "", label.choice_style(), indent = depth * 2);
        show_map(child, depth + 1);
    }
}

fn show_slots(dir: &Path) {
    match StoryEngine::list_slots(dir) {
        Ok(slots) if slots.is_empty() => println!("No saved games in {}.", dir.display()),
        Ok(slots) => {
            for slot in slots {
                let when = slot.modified.map_or_else(|| "unknown".to_string(), format_modified);
                println!("{} (v{}, {when})", slot.slot.item_style(), slot.version);
            }
        },
        Err(e) => println!("{}", format!("Could not list saves: {e:#}").error_style()),
    }
}

fn show_help() {
    println!("Enter a choice number or its text.");
    println!("  look | inv | ach | map | status | use <slot> | save [slot] | load [slot] | slots | quit");
    println!("  talk <name> | say <reply or number> | solve <option number>");
}

fn history_file_path() -> Option<PathBuf> {
    dirs::data_dir()
        .or_else(dirs::data_local_dir)
        .map(|base| base.join("story_engine").join("history.txt"))
}

/// Create the directory the history file lives in. Failures are logged and reported as `false`.
fn ensure_history_dir(path: &Path) -> bool {
    let Some(dir) = path.parent() else {
        return true;
    };
    match std::fs::create_dir_all(dir) {
        Ok(()) => true,
        Err(e) => {
            warn!("could not create history directory {}: {e}", dir.display());
            false
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_pick_choices() {
        assert_eq!(parse_command(" 2 "), Some(Command::Choose(2)));
    }

    #[test]
    fn verbs_are_case_insensitive() {
        assert_eq!(parse_command("INV"), Some(Command::Inventory));
        assert_eq!(parse_command("use Right hand"), Some(Command::Use("Right hand".into())));
        assert_eq!(parse_command("save"), Some(Command::Save("quick".into())));
    }

    #[test]
    fn talk_say_and_solve_parse() {
        assert_eq!(parse_command("talk shep"), Some(Command::Talk("shep".into())));
        assert_eq!(parse_command("say Which way out?"), Some(Command::Say("Which way out?".into())));
        assert_eq!(parse_command("solve 2"), Some(Command::Solve(2)));
        assert_eq!(parse_command("solve it"), Some(Command::ChooseLabel("solve it".into())));
        assert_eq!(parse_command("status"), Some(Command::Status));
    }

    #[test]
    fn npc_names_match_partially() {
        let names = ["Old Miller", "Shepherd"];
        assert_eq!(find_npc(&names, "shep"), Some("Shepherd".to_string()));
        assert_eq!(find_npc(&names, "MILL"), Some("Old Miller".to_string()));
        assert_eq!(find_npc(&names, "wolf"), None);
    }

    #[test]
    fn other_text_is_a_label() {
        assert_eq!(parse_command("Go north"), Some(Command::ChooseLabel("Go north".into())));
        assert_eq!(parse_command("use"), Some(Command::ChooseLabel("use".into())));
        assert_eq!(parse_command("   "), None);
    }

    #[test]
    fn history_dir_is_created_or_reported() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("story").join("history.txt");
        assert!(ensure_history_dir(&nested));
        assert!(dir.path().join("story").is_dir());

        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        assert!(!ensure_history_dir(&blocker.join("history.txt")));
    }
}
