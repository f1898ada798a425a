//! Traversal engine and session.
//!
//! [`StoryEngine`] ties one read-only [`StoryGraph`] to one lock-guarded [`GameState`] and,
//! optionally, a [`TickScheduler`]. It is the whole presentation-layer contract: read the
//! current node, submit a choice, read health/inventory/achievements, drain messages and
//! wait for changes.
//!
//! Path changes only happen here, driven by the player. Node entry hooks run inside the same
//! lock the tick thread uses, and they finish before `enter`/`select_answer` return.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};
use uuid::Uuid;

use crate::achievement::Achievement;
use crate::config::EngineConfig;
use crate::effect::Effect;
use crate::error::{EngineError, show_path};
use crate::events::{Message, MessageKind};
use crate::graph::{Label, StoryGraph, StoryNode};
use crate::hook::{Hook, HookRegistry};
use crate::inventory::{Inventory, InventorySlot};
use crate::npc::{DialogueView, Npc};
use crate::puzzle::Puzzle;
use crate::save_files::{self, SaveFormat, SaveSlot, slot_file_name, to_save_doc, write_doc};
use crate::scheduler::{Autosave, TickScheduler};
use crate::shared::SharedState;
use crate::state::{GameState, StoryMap, Values};

pub struct StoryEngine {
    session: Uuid,
    graph: Arc<StoryGraph>,
    shared: SharedState,
    npcs: BTreeMap<String, Npc>,
    ticker: Option<TickScheduler>,
}

impl StoryEngine {
    /// Wrap a graph and an initial state. Nothing is entered yet; call [`StoryEngine::enter`]
    /// (or [`StoryEngine::begin`]) to run the first node's hook.
    pub fn new(graph: StoryGraph, state: GameState) -> StoryEngine {
        let session = Uuid::new_v4();
        info!("story session {session} created ({} nodes)", graph.len());
        StoryEngine {
            session,
            graph: Arc::new(graph),
            shared: SharedState::new(state),
            npcs: BTreeMap::new(),
            ticker: None,
        }
    }

    /// Build the initial state from config and story defaults.
    pub fn from_config(graph: StoryGraph, config: &EngineConfig, values: Values) -> StoryEngine {
        let state = GameState::new(config.starting_health)
            .with_inventory(Inventory::with_slots(config.inventory_slots.iter().cloned()))
            .with_values(values)
            .with_event_capacity(config.message_capacity);
        StoryEngine::new(graph, state)
    }

    /// Start the tick thread. Any previous ticker is stopped first.
    ///
    /// # Errors
    /// - if the tick thread cannot be spawned
    pub fn start_ticker(&mut self, tick: Hook, interval: Duration, autosave: Option<(PathBuf, SaveFormat)>) -> Result<()> {
        self.stop_ticker();
        let autosave = autosave.map(|(path, format)| Autosave {
            path,
            format,
            session: Some(self.session),
        });
        self.ticker = Some(TickScheduler::start(self.shared.clone(), tick, interval, autosave)?);
        Ok(())
    }

    /// Start ticking with the interval and autosave settings from `config`.
    ///
    /// # Errors
    /// - if the tick thread cannot be spawned
    pub fn start_ticker_from_config(&mut self, tick: Hook, config: &EngineConfig) -> Result<()> {
        let autosave = config.autosave.clone().map(|path| (path, config.save_format));
        self.start_ticker(tick, config.tick_interval(), autosave)
    }

    pub fn stop_ticker(&mut self) {
        if let Some(mut ticker) = self.ticker.take() {
            ticker.stop();
        }
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.as_ref().is_some_and(TickScheduler::is_running)
    }

    /// End the session: stop ticking and wait for any in-flight tick.
    pub fn shutdown(mut self) {
        self.stop_ticker();
        info!("story session {} ended", self.session);
    }

    pub fn session(&self) -> Uuid {
        self.session
    }

    pub fn graph(&self) -> &StoryGraph {
        &self.graph
    }

    /// Make a character available to [`StoryEngine::talk_to`]. A character with the same name
    /// is replaced; the conversation position kept in the state is not reset.
    pub fn register_npc(&mut self, npc: Npc) {
        info!("npc '{}' registered", npc.name());
        self.npcs.insert(npc.name().to_string(), npc);
    }

    pub fn npc_names(&self) -> Vec<&str> {
        self.npcs.keys().map(String::as_str).collect()
    }

    // TRAVERSAL ----------------------------------------

    /// Enter the state's current path, running its hook. Used at session start.
    ///
    /// # Errors
    /// - `NodeNotFound` / `EmptyGraph` if the stored path does not resolve
    pub fn begin(&self) -> Result<&StoryNode, EngineError> {
        let path = self.shared.read(|s| s.path.clone());
        self.enter(path)
    }

    /// Move to `path` and run the node's entry hook once.
    ///
    /// # Errors
    /// - `NodeNotFound` / `EmptyGraph` if `path` does not resolve; the state is untouched
    pub fn enter(&self, path: Vec<Label>) -> Result<&StoryNode, EngineError> {
        let node = self.graph.resolve(&path).inspect_err(|e| warn!("cannot enter {}: {e}", show_path(&path)))?;
        self.shared.update(|state| arrive(state, path, node));
        Ok(node)
    }

    /// Alias of [`StoryEngine::enter`] for jumping anywhere in the graph.
    ///
    /// # Errors
    /// - `NodeNotFound` / `EmptyGraph` if `path` does not resolve
    pub fn jump_to(&self, path: Vec<Label>) -> Result<&StoryNode, EngineError> {
        self.enter(path)
    }

    /// Follow `label` from the current node. The choice echo, the path change and the entry
    /// hook happen in one locked step, so a tick sees either none or all of them.
    ///
    /// # Errors
    /// - `InvalidChoice` if `label` is not an answer here (terminal nodes have none); the path
    ///   is left unchanged
    /// - `NodeNotFound` if the stored path itself no longer resolves
    pub fn select_answer(&self, label: &str) -> Result<&StoryNode, EngineError> {
        let graph: &StoryGraph = &self.graph;
        self.shared.try_update(|state| {
            let current = graph.resolve(&state.path)?;
            let Some(next) = current.answer(label) else {
                warn!("invalid choice '{label}' at {}", show_path(&state.path));
                return Err(EngineError::InvalidChoice { label: label.to_string() });
            };
            state.print_kind(format!("Chosen: {label}"), MessageKind::Info);
            let mut path = state.path.clone();
            path.push(label.to_string());
            arrive(state, path, next);
            Ok(next)
        })
    }

    /// The node at the current path.
    ///
    /// # Errors
    /// - `NodeNotFound` / `EmptyGraph` if the stored path does not resolve
    pub fn current_node(&self) -> Result<&StoryNode, EngineError> {
        let path = self.path();
        self.graph.resolve(&path)
    }

    pub fn path(&self) -> Vec<Label> {
        self.shared.read(|s| s.path.clone())
    }

    // PRESENTATION ACCESSORS ---------------------------

    pub fn health(&self) -> i64 {
        self.shared.read(GameState::health)
    }

    pub fn inventory(&self) -> Vec<InventorySlot> {
        self.shared.read(|s| s.inventory().slots().to_vec())
    }

    pub fn achievements(&self) -> Vec<Achievement> {
        self.shared.read(GameState::achievement_list)
    }

    pub fn value(&self, key: &str) -> Option<serde_json::Value> {
        self.shared.read(|s| s.value(key).cloned())
    }

    pub fn story_map(&self) -> StoryMap {
        self.shared.read(GameState::story_map)
    }

    pub fn drain_messages(&self) -> Vec<Message> {
        self.shared.update(GameState::drain_messages)
    }

    /// Current change counter; pass it to [`StoryEngine::wait_for_change`].
    pub fn revision(&self) -> u64 {
        self.shared.revision()
    }

    /// Block until state changes past `seen` or `timeout` passes.
    pub fn wait_for_change(&self, seen: u64, timeout: Duration) -> u64 {
        self.shared.wait_for_change(seen, timeout)
    }

    // MUTATION -----------------------------------------

    /// Run `f` with exclusive access to the state, the same lock the tick thread takes.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut GameState) -> R) -> R {
        self.shared.update(f)
    }

    pub fn add_item(&self, slot: &str, name: &str, description: &str, on_use: Option<Hook>) {
        self.shared.update(|s| s.add_item(slot, name, description, on_use));
    }

    pub fn remove_item(&self, slot: &str) {
        self.shared.update(|s| s.remove_item(slot));
    }

    pub fn use_item(&self, slot: &str) -> bool {
        self.shared.update(|s| s.use_item(slot))
    }

    pub fn add_achievement(&self, name: &str, description: &str) -> bool {
        self.shared.update(|s| s.add_achievement(name, description))
    }

    pub fn modify_hp(&self, delta: i64) -> i64 {
        self.shared.update(|s| s.modify_hp(delta))
    }

    pub fn set_value(&self, key: &str, value: impl Into<serde_json::Value>) {
        self.shared.update(|s| s.set_value(key, value));
    }

    /// Talk to a registered character, optionally giving one of its replies.
    ///
    /// # Errors
    /// - `UnknownNpc` if nobody by that name was registered
    /// - `InvalidChoice` if `choice` is not a reply to the current line
    pub fn talk_to(&self, name: &str, choice: Option<&str>) -> Result<DialogueView, EngineError> {
        let npc = self.npcs.get(name).ok_or_else(|| {
            warn!("talk to unknown npc '{name}'");
            EngineError::UnknownNpc { name: name.to_string() }
        })?;
        self.shared.update(|state| npc.talk(state, choice))
    }

    /// Where the conversation with `name` stands, without saying anything.
    ///
    /// # Errors
    /// - `UnknownNpc` if nobody by that name was registered
    pub fn npc_view(&self, name: &str) -> Result<DialogueView, EngineError> {
        let npc = self
            .npcs
            .get(name)
            .ok_or_else(|| EngineError::UnknownNpc { name: name.to_string() })?;
        Ok(self.shared.read(|state| npc.view(state)))
    }

    pub fn current_puzzle(&self) -> Option<Puzzle> {
        self.shared.read(|s| s.puzzle().cloned())
    }

    /// Answer the open puzzle with a zero-based option index. Returns `true` if solved.
    ///
    /// # Errors
    /// - `NoPuzzle` if nothing is open, `InvalidChoice` if the option does not exist
    pub fn attempt_puzzle(&self, choice: usize) -> Result<bool, EngineError> {
        self.shared.try_update(|s| s.attempt_puzzle(choice))
    }

    pub fn apply_effect(&self, fx: Effect) {
        self.shared.update(|s| s.apply_effect(fx));
    }

    pub fn effects(&self) -> Vec<Effect> {
        self.shared.read(|s| s.effects().to_vec())
    }

    // PERSISTENCE --------------------------------------

    /// A consistent copy of the state taken under the lock.
    pub fn snapshot(&self) -> GameState {
        self.shared.snapshot()
    }

    /// Serialize a consistent snapshot. The tick thread keeps running; the snapshot is taken
    /// in one lock acquisition so it never sees a half-applied tick.
    ///
    /// # Errors
    /// - if serialization fails
    pub fn save(&self, format: SaveFormat) -> Result<String> {
        save_files::save(&self.snapshot(), format)
    }

    /// Write a snapshot to `<dir>/<slot>-story-<version>.<ext>` and return the path.
    ///
    /// # Errors
    /// - on serialization or file IO failure
    pub fn save_to_slot(&self, dir: &Path, slot: &str, format: SaveFormat) -> Result<PathBuf> {
        let doc = self.shared.read(|s| to_save_doc(s, Some(self.session)));
        let path = dir.join(slot_file_name(slot, format));
        write_doc(&path, &doc, format)?;
        Ok(path)
    }

    /// Replace the whole state with `loaded`, which must point at a node in this graph.
    /// Item hooks are re-bound from `hooks` by item name; puzzle and effect hooks by hook name.
    /// The node's entry hook is not rerun and its puzzle is not posed again.
    ///
    /// # Errors
    /// - `NodeNotFound` / `EmptyGraph` if the loaded path does not resolve; the current state
    ///   is left as it was
    pub fn restore(&self, mut loaded: GameState, hooks: Option<&HookRegistry>) -> Result<&StoryNode, EngineError> {
        let node = self.graph.resolve(&loaded.path)?;
        if let Some(hooks) = hooks {
            loaded.rebind_hooks(hooks);
        }
        let capacity = self.shared.read(|s| s.events.capacity());
        loaded.events = crate::events::EventSink::with_capacity(capacity);
        info!("restoring saved state at {}", show_path(&loaded.path));
        self.shared.replace(loaded);
        Ok(node)
    }

    /// Parse `raw` and restore it.
    ///
    /// # Errors
    /// - `Deserialization` on malformed input, or the errors of [`StoryEngine::restore`]
    pub fn load(&self, raw: &str, format: SaveFormat, hooks: Option<&HookRegistry>) -> Result<&StoryNode, EngineError> {
        let loaded = save_files::load(raw, format)?;
        self.restore(loaded, hooks)
    }

    /// Read a save file and restore it.
    ///
    /// # Errors
    /// - on IO, parse, or path resolution failure
    pub fn load_from_path(&self, path: &Path, hooks: Option<&HookRegistry>) -> Result<&StoryNode> {
        let loaded = save_files::load_save_file(path)?;
        self.restore(loaded, hooks)
            .with_context(|| format!("restoring {}", path.display()))
    }

    /// Save slots found in `dir`.
    ///
    /// # Errors
    /// - if the directory cannot be read
    pub fn list_slots(dir: &Path) -> Result<Vec<SaveSlot>> {
        save_files::collect_save_slots(dir)
    }
}

/// Record the move to `path`, run the node's entry hook and pose its puzzle.
fn arrive(state: &mut GameState, path: Vec<Label>, node: &StoryNode) {
    info!("entering {}", show_path(&path));
    state.set_path(path);
    if let Some(hook) = node.on_enter() {
        hook.call(state);
    }
    if let Some(puzzle) = node.puzzle() {
        state.pose_puzzle(puzzle.clone());
    }
}

impl Drop for StoryEngine {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crossroads() -> StoryGraph {
        let north = StoryNode::builder("A cold ridge.")
            .on_enter(Hook::new("chill", |s: &mut GameState| {
                s.modify_hp(-1);
            }))
            .build()
            .unwrap();
        let root = StoryNode::builder("A crossroads.")
            .answer("Go north", north)
            .answer("Go south", StoryNode::ending("A warm valley."))
            .build()
            .unwrap();
        StoryGraph::new(root)
    }

    #[test]
    fn select_answer_moves_and_runs_hook() {
        let engine = StoryEngine::new(crossroads(), GameState::new(10));
        engine.begin().unwrap();

        let node = engine.select_answer("Go north").unwrap();
        assert_eq!(node.condition(), "A cold ridge.");
        assert_eq!(engine.path(), vec!["Go north".to_string()]);
        assert_eq!(engine.health(), 9);

        let texts: Vec<_> = engine.drain_messages().into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["Chosen: Go north", "Health -1 (now 9)."]);
    }

    #[test]
    fn choice_commits_as_one_change() {
        let engine = StoryEngine::new(crossroads(), GameState::new(10));
        engine.begin().unwrap();
        let before = engine.revision();
        engine.select_answer("Go north").unwrap();
        assert_eq!(engine.revision(), before + 1);

        assert!(engine.select_answer("Go west").is_err());
        assert_eq!(engine.revision(), before + 1);
    }

    #[test]
    fn invalid_choice_leaves_path_alone() {
        let engine = StoryEngine::new(crossroads(), GameState::new(10));
        engine.begin().unwrap();
        let err = engine.select_answer("Go east").unwrap_err();
        assert!(matches!(err, EngineError::InvalidChoice { label } if label == "Go east"));
        assert!(engine.path().is_empty());
        assert!(engine.drain_messages().is_empty());
    }

    #[test]
    fn terminal_node_rejects_any_choice() {
        let engine = StoryEngine::new(crossroads(), GameState::new(10));
        assert!(engine.enter(vec!["Go south".into()]).unwrap().is_terminal());
        assert!(matches!(
            engine.select_answer("Go south"),
            Err(EngineError::InvalidChoice { .. })
        ));
    }

    #[test]
    fn enter_bad_path_is_node_not_found() {
        let engine = StoryEngine::new(crossroads(), GameState::new(10));
        assert!(matches!(
            engine.enter(vec!["Fly".into()]),
            Err(EngineError::NodeNotFound { .. })
        ));
        assert!(engine.path().is_empty());
    }

    #[test]
    fn restore_rejects_path_outside_graph() {
        let engine = StoryEngine::new(crossroads(), GameState::new(10));
        engine.modify_hp(5);
        let mut foreign = GameState::new(1);
        foreign.set_path(vec!["Nowhere".into()]);
        assert!(engine.restore(foreign, None).is_err());
        assert_eq!(engine.health(), 15);
    }

    #[test]
    fn restore_rebinds_item_hooks() {
        let engine = StoryEngine::new(crossroads(), GameState::new(3));
        engine.add_item("Right hand", "Potion", "Red", None);
        let raw = engine.save(SaveFormat::Json).unwrap();

        let mut hooks = HookRegistry::new();
        hooks.register_item_hook("Potion", Hook::new("drink", |s: &mut GameState| {
            s.modify_hp(4);
        }));
        engine.load(&raw, SaveFormat::Json, Some(&hooks)).unwrap();
        assert!(engine.use_item("Right hand"));
        assert_eq!(engine.health(), 7);
    }

    #[test]
    fn entering_a_node_poses_its_puzzle() {
        let gate = StoryNode::builder("A gate with a riddle carved on it.")
            .puzzle(
                Puzzle::new("What walks on four legs at dawn?", vec!["A dog".into(), "A man".into()], 1)
                    .unwrap()
                    .on_success(Hook::new("open", |s: &mut GameState| s.set_value("gate", "open"))),
            )
            .build()
            .unwrap();
        let root = StoryNode::builder("A road.").answer("Approach", gate).build().unwrap();
        let engine = StoryEngine::new(StoryGraph::new(root), GameState::new(5));
        engine.begin().unwrap();
        assert!(engine.current_puzzle().is_none());

        engine.select_answer("Approach").unwrap();
        assert_eq!(engine.current_puzzle().unwrap().question(), "What walks on four legs at dawn?");
        assert!(matches!(engine.attempt_puzzle(5), Err(EngineError::InvalidChoice { .. })));
        assert!(engine.attempt_puzzle(1).unwrap());
        assert_eq!(engine.value("gate"), Some(serde_json::json!("open")));
        assert!(matches!(engine.attempt_puzzle(1), Err(EngineError::NoPuzzle)));
    }

    #[test]
    fn talk_to_needs_a_registered_npc() {
        let mut engine = StoryEngine::new(crossroads(), GameState::new(5));
        assert!(matches!(
            engine.talk_to("Ghost", None),
            Err(EngineError::UnknownNpc { name }) if name == "Ghost"
        ));

        let dialogue = crate::npc::DialogueNode::new("Well met.")
            .reply("Who are you?", vec!["who".into()])
            .topic("who", crate::npc::DialogueNode::new("A wanderer, like you."));
        engine.register_npc(Npc::new("Pilgrim", dialogue).unwrap());
        assert_eq!(engine.npc_names(), vec!["Pilgrim"]);

        assert_eq!(engine.npc_view("Pilgrim").unwrap().responses, vec!["Who are you?"]);
        assert!(engine.drain_messages().is_empty());

        let view = engine.talk_to("Pilgrim", Some("Who are you?")).unwrap();
        assert_eq!(view.text, "A wanderer, like you.");
        assert!(view.responses.is_empty());
        assert_eq!(engine.snapshot().conversation("Pilgrim"), ["who".to_string()]);
    }

    #[test]
    fn restore_rebinds_effect_and_puzzle_hooks() {
        let engine = StoryEngine::new(crossroads(), GameState::new(5));
        let mut hooks = HookRegistry::new();
        hooks
            .register_node_hook(Hook::new("thaw", |s: &mut GameState| {
                s.modify_hp(1);
            }))
            .register_node_hook(Hook::new("right", |s: &mut GameState| s.set_value("solved", true)));

        engine.apply_effect(Effect::new("Frostbite", 1).on_expire(hooks.node_hook("thaw").unwrap()));
        engine.with_state(|s| {
            s.pose_puzzle(
                Puzzle::new("Yes?", vec!["yes".into()], 0)
                    .unwrap()
                    .on_success(hooks.node_hook("right").unwrap()),
            );
        });
        let raw = engine.save(SaveFormat::Ron).unwrap();

        let other = StoryEngine::new(crossroads(), GameState::new(1));
        other.load(&raw, SaveFormat::Ron, Some(&hooks)).unwrap();
        assert!(other.attempt_puzzle(0).unwrap());
        assert_eq!(other.value("solved"), Some(serde_json::json!(true)));
        other.with_state(GameState::tick_timed_effects);
        assert_eq!(other.health(), 6);
    }
}
