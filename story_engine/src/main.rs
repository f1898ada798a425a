#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
//! ** story_engine **
//! Terminal player for branching stories.

use story_engine::data_paths::data_path;
use story_engine::style::StoryStyle;
use story_engine::{Effect, GameState, Hook, HookRegistry, StoryEngine, build_npcs, load_config, load_story, run_repl};

use anyhow::{Context, Result};
use colored::Colorize;
use log::info;
use serde_json::json;

use std::env;
use std::io::Write;
use std::path::PathBuf;

fn main() -> Result<()> {
    env_logger::init();
    let story_path = env::args()
        .nth(1)
        .map_or_else(|| data_path("demo.ron"), PathBuf::from);
    let config = load_config(&data_path("engine.toml"));

    let hooks = demo_hooks();
    let (def, graph) = load_story(&story_path, &hooks).context("while loading story")?;
    info!("story \"{}\" loaded", def.title);

    let mut engine = StoryEngine::from_config(graph, &config, def.values.clone());
    for npc in build_npcs(&def).context("while building characters")? {
        engine.register_npc(npc);
    }
    engine.jump_to(def.start.clone()).context("while entering the start node")?;
    engine.start_ticker_from_config(Hook::new("lamp", burn_lamp_oil), &config)?;

    // clear the screen
    print!("\x1B[2J\x1B[H");
    std::io::stdout().flush()?;
    println!("{:^84}", def.title.to_uppercase().ending_style().underline());
    if !def.author.is_empty() {
        println!("{:^84}", format!("by {}", def.author));
    }

    let result = run_repl(&engine, &config, &hooks);
    engine.shutdown();
    result
}

/// Hooks the bundled demo story refers to by name.
fn demo_hooks() -> HookRegistry {
    // also registered by name: a saved effect looks its expire hook up on load
    let footing_fades = Hook::new("footing_fades", |s: &mut GameState| {
        s.print("Your legs remember how tired they are.");
    });
    let on_expire = footing_fades.clone();

    let mut hooks = HookRegistry::new();
    hooks
        .register_node_hook(Hook::new("find_lamp", |s: &mut GameState| {
            s.add_item("Right hand", "Oil lamp", "Dented brass, half full.", None);
            s.add_achievement("Light Bearer", "Found a lamp in the dark.");
        }))
        .register_node_hook(Hook::new("wolf_bite", |s: &mut GameState| {
            s.modify_hp(-4);
            s.add_health_effect(story_engine::HealthEffect::DamageOverTime {
                cause: "wolf bite".into(),
                amount: 1,
                times: 3,
            });
        }))
        .register_node_hook(Hook::new("cairn_blessing", move |s: &mut GameState| {
            s.apply_effect(Effect::new("Sure footing", 3).on_expire(on_expire.clone()));
        }))
        .register_node_hook(footing_fades)
        .register_node_hook(Hook::new("cairn_slip", |s: &mut GameState| {
            s.modify_hp(-1);
            s.print("A stone shifts under your hand and you scrape a knuckle.");
        }))
        .register_node_hook(Hook::new("summit", |s: &mut GameState| {
            s.add_achievement("Summit", "Climbed out of the valley.");
            s.set_value("escaped", true);
        }))
        .register_item_hook(
            "Oil lamp",
            Hook::new("refill_lamp", |s: &mut GameState| {
                s.set_value("lamp_oil", 5);
                s.print("You trim the wick. The flame steadies.");
            }),
        );
    hooks
}

/// Tick function: the lamp burns down while the player thinks.
fn burn_lamp_oil(state: &mut GameState) {
    if state.inventory().get("Right hand").is_none() {
        return;
    }
    let oil = state.value("lamp_oil").and_then(serde_json::Value::as_i64).unwrap_or(0);
    match oil {
        n if n > 1 => state.set_value("lamp_oil", json!(n - 1)),
        1 => {
            state.set_value("lamp_oil", 0);
            state.print_kind("Your lamp gutters out.", story_engine::MessageKind::Important);
        },
        _ => {},
    }
}
