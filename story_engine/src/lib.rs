#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]

pub const STORY_ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

// Core modules
pub mod achievement;
pub mod config;
pub mod data_paths;
pub mod effect;
pub mod engine;
pub mod error;
pub mod events;
pub mod graph;
pub mod health;
pub mod hook;
pub mod inventory;
pub mod loader;
pub mod npc;
pub mod puzzle;
pub mod repl;
pub mod save_files;
pub mod scheduler;
pub mod shared;
pub mod state;
pub mod style;

// Re-exports for convenience
pub use achievement::Achievement;
pub use config::{EngineConfig, load_config};
pub use effect::Effect;
pub use engine::StoryEngine;
pub use error::EngineError;
pub use events::{EventSink, Message, MessageKind};
pub use graph::{Label, StoryGraph, StoryNode};
pub use health::{HealthEffect, LifeState};
pub use hook::{Hook, HookRegistry};
pub use inventory::{Inventory, InventorySlot, Item};
pub use loader::{build_npcs, load_story};
pub use npc::{DialogueNode, DialogueView, Npc};
pub use puzzle::Puzzle;
pub use repl::run_repl;
pub use save_files::SaveFormat;
pub use state::GameState;
