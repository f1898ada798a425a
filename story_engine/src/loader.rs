//! Loader utilities for building a [`StoryGraph`] from serialized story content.
//!
//! Story files are RON (default) or TOML, chosen by extension. Node `on_enter` and puzzle hook
//! names are resolved against a [`HookRegistry`]; an unregistered name fails the load. NPCs are
//! built separately with [`build_npcs`].
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use story_data::{NodeDef, StoryDef, validate_story};

use crate::error::EngineError;
use crate::graph::{StoryGraph, StoryNode};
use crate::hook::HookRegistry;
use crate::npc::Npc;
use crate::puzzle::Puzzle;

/// Read and parse a story definition file.
///
/// # Errors
/// - on file IO or parse failure
pub fn load_story_def(path: &Path) -> Result<StoryDef> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading story file {}", path.display()))?;
    let def = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str::<StoryDef>(&raw).with_context(|| format!("parsing TOML story {}", path.display()))?,
        _ => ron::from_str::<StoryDef>(&raw).with_context(|| format!("parsing RON story {}", path.display()))?,
    };
    info!(
        "story \"{}\" read from {} ({} nodes)",
        def.title,
        path.display(),
        def.root.node_count()
    );
    Ok(def)
}

/// Check a story definition and build the runtime graph from it.
///
/// # Errors
/// - `InvalidStory` listing every validation problem
/// - `UnknownHook` if a node names a hook missing from `hooks`
pub fn build_graph(def: &StoryDef, hooks: &HookRegistry) -> Result<StoryGraph, EngineError> {
    let problems = validate_story(def);
    if !problems.is_empty() {
        let listed: Vec<String> = problems.iter().map(ToString::to_string).collect();
        return Err(EngineError::InvalidStory(listed.join("; ")));
    }
    let root = build_node(&def.root, hooks)?;
    Ok(StoryGraph::new(root))
}

fn build_node(def: &NodeDef, hooks: &HookRegistry) -> Result<StoryNode, EngineError> {
    let mut builder = StoryNode::builder(def.condition.clone());
    if let Some(name) = &def.on_enter {
        builder = builder.on_enter(hooks.node_hook(name)?);
    }
    if let Some(puzzle) = &def.puzzle {
        builder = builder.puzzle(Puzzle::from_def(puzzle, hooks)?);
    }
    for answer in &def.answers {
        builder = builder.answer(answer.label.clone(), build_node(&answer.node, hooks)?);
    }
    builder.build()
}

/// Build the characters defined in a story.
///
/// # Errors
/// - `InvalidStory` if a dialogue reply leads to a missing topic
pub fn build_npcs(def: &StoryDef) -> Result<Vec<Npc>, EngineError> {
    def.npcs.iter().map(Npc::from_def).collect()
}

/// Load a story file and build its graph in one step.
///
/// # Errors
/// - on IO, parse, validation or hook lookup failure
pub fn load_story(path: &Path, hooks: &HookRegistry) -> Result<(StoryDef, StoryGraph)> {
    let def = load_story_def(path)?;
    let graph = build_graph(&def, hooks).with_context(|| format!("building story graph from {}", path.display()))?;
    info!("story graph built with {} nodes", graph.len());
    Ok((def, graph))
}
