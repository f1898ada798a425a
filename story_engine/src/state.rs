//! Mutable game state for one running session.
//!
//! [`GameState`] is only ever reached through the engine's lock, so every mutator here can
//! assume exclusive access. Each mutator queues a message on the state's [`EventSink`].
use std::collections::BTreeMap;

use log::{debug, info, warn};

use crate::achievement::{Achievement, Achievements};
use crate::effect::Effect;
use crate::error::EngineError;
use crate::events::{EventSink, Message, MessageKind};
use crate::graph::Label;
use crate::health::{Health, HealthEffect, HealthTickResult, LifeState};
use crate::hook::{Hook, HookRegistry};
use crate::inventory::{Inventory, Item};
use crate::puzzle::Puzzle;

/// Free-form story values.
pub type Values = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone)]
pub struct GameState {
    pub(crate) path: Vec<Label>,
    pub(crate) health: Health,
    pub(crate) inventory: Inventory,
    pub(crate) achievements: Achievements,
    pub(crate) values: Values,
    pub(crate) visited: Vec<Vec<Label>>,
    pub(crate) ticks: u64,
    pub(crate) effects: Vec<Effect>,
    pub(crate) puzzle: Option<Puzzle>,
    pub(crate) conversations: BTreeMap<String, Vec<Label>>,
    pub(crate) events: EventSink,
}

impl GameState {
    /// Fresh state at the story root with the default equipment slots.
    pub fn new(starting_health: i64) -> GameState {
        GameState {
            path: Vec::new(),
            health: Health::new(starting_health),
            inventory: Inventory::default(),
            achievements: Achievements::new(),
            values: Values::new(),
            visited: Vec::new(),
            ticks: 0,
            effects: Vec::new(),
            puzzle: None,
            conversations: BTreeMap::new(),
            events: EventSink::new(),
        }
    }

    #[must_use]
    pub fn with_values(mut self, values: Values) -> Self {
        self.values = values;
        self
    }

    #[must_use]
    pub fn with_inventory(mut self, inventory: Inventory) -> Self {
        self.inventory = inventory;
        self
    }

    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.events = EventSink::with_capacity(capacity);
        self
    }

    pub fn path(&self) -> &[Label] {
        &self.path
    }

    pub fn health(&self) -> i64 {
        self.health.current()
    }

    pub fn life_state(&self) -> LifeState {
        self.health.life_state()
    }

    pub fn health_effects(&self) -> &[HealthEffect] {
        self.health.effects()
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn achievements(&self) -> &Achievements {
        &self.achievements
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Every path entered this session, in first-visit order.
    pub fn visited(&self) -> &[Vec<Label>] {
        &self.visited
    }

    /// Timed effects still running, in the order they were first applied.
    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn puzzle(&self) -> Option<&Puzzle> {
        self.puzzle.as_ref()
    }

    /// Topic path the conversation with `npc` has reached; empty for the opening line.
    pub fn conversation(&self, npc: &str) -> &[Label] {
        self.conversations.get(npc).map_or(&[], Vec::as_slice)
    }

    // MUTATORS -----------------------------------------

    /// Put an item in `slot`, replacing anything already there.
    pub fn add_item(&mut self, slot: &str, name: &str, description: &str, on_use: Option<Hook>) {
        let item = Item {
            name: name.to_string(),
            description: description.to_string(),
            on_use,
        };
        self.inventory.insert(slot, item);
        info!("item '{name}' placed in slot '{slot}'");
        self.events.push(format!("{name} added to {slot}."));
    }

    /// Empty `slot`. Nothing happens if it was already empty.
    pub fn remove_item(&mut self, slot: &str) {
        if let Some(item) = self.inventory.remove(slot) {
            info!("item '{}' removed from slot '{slot}'", item.name);
            self.events.push(format!("{} removed from {slot}.", item.name));
        }
    }

    /// Run the `on_use` hook of the item in `slot`. Returns `false` if the slot is empty.
    pub fn use_item(&mut self, slot: &str) -> bool {
        let Some(item) = self.inventory.get(slot) else {
            debug!("use of empty slot '{slot}' ignored");
            return false;
        };
        let name = item.name.clone();
        let hook = item.on_use.clone();
        self.events.push(format!("You use the {name}."));
        if let Some(hook) = hook {
            hook.call(self);
        }
        true
    }

    /// Unlock an achievement. A name that is already unlocked is ignored and keeps its
    /// original description. Returns whether anything was added.
    pub fn add_achievement(&mut self, name: &str, description: &str) -> bool {
        if self.achievements.add(name, description) {
            info!("achievement unlocked: '{name}'");
            self.events
                .push_kind(format!("Achievement unlocked: {name} ({description})"), MessageKind::Important);
            true
        } else {
            debug!("achievement '{name}' already unlocked");
            false
        }
    }

    /// Add `delta` to health (no clamping) and return the new value.
    pub fn modify_hp(&mut self, delta: i64) -> i64 {
        let now = self.health.modify(delta);
        info!("health {delta:+} (now {now})");
        self.events.push(format!("Health {delta:+} (now {now})."));
        now
    }

    pub fn add_health_effect(&mut self, fx: HealthEffect) {
        info!("health effect '{}' queued", fx.cause());
        self.health.add_effect(fx);
    }

    pub fn remove_health_effect(&mut self, cause: &str) -> Option<HealthEffect> {
        self.health.remove_effect(cause)
    }

    /// Apply queued over-time effects once, one message per application.
    pub fn tick_health_effects(&mut self) -> HealthTickResult {
        let result = self.health.tick_effects();
        for applied in &result.applied {
            self.events.push(format!(
                "{}: {:+} health (now {}).",
                applied.cause, applied.delta, applied.hp_after
            ));
        }
        result
    }

    /// Start a timed effect and run its `on_apply` hook. An active effect with the same name
    /// is replaced in place.
    pub fn apply_effect(&mut self, fx: Effect) {
        info!("effect '{}' applied for {} ticks", fx.name(), fx.remaining());
        self.events.push(format!("{} takes hold.", fx.name()));
        let hook = fx.apply_hook().cloned();
        match self.effects.iter_mut().find(|active| active.name() == fx.name()) {
            Some(active) => *active = fx,
            None => self.effects.push(fx),
        }
        if let Some(hook) = hook {
            hook.call(self);
        }
    }

    /// End an effect early without running its `on_expire` hook.
    pub fn remove_effect(&mut self, name: &str) -> Option<Effect> {
        let idx = self.effects.iter().position(|fx| fx.name() == name)?;
        info!("effect '{name}' removed");
        Some(self.effects.remove(idx))
    }

    /// Count every timed effect down one tick, then run the `on_expire` hooks of the ones that
    /// ran out. Returns the names of the expired effects.
    pub fn tick_timed_effects(&mut self) -> Vec<String> {
        let mut expired = Vec::new();
        let mut running = Vec::with_capacity(self.effects.len());
        for mut fx in std::mem::take(&mut self.effects) {
            if fx.count_down() {
                expired.push(fx);
            } else {
                running.push(fx);
            }
        }
        self.effects = running;

        let mut names = Vec::with_capacity(expired.len());
        for fx in expired {
            info!("effect '{}' expired", fx.name());
            self.events.push(format!("{} wears off.", fx.name()));
            if let Some(hook) = fx.expire_hook() {
                hook.call(self);
            }
            names.push(fx.name().to_string());
        }
        names
    }

    /// Put a question to the player, replacing any puzzle still open.
    pub fn pose_puzzle(&mut self, puzzle: Puzzle) {
        info!("puzzle posed: \"{}\"", puzzle.question());
        self.events
            .push_kind(format!("Puzzle: {}", puzzle.question()), MessageKind::Important);
        self.puzzle = Some(puzzle);
    }

    pub fn clear_puzzle(&mut self) -> Option<Puzzle> {
        self.puzzle.take()
    }

    /// Answer the open puzzle with a zero-based option index. A solved puzzle is closed; a
    /// failed one stays open for another try.
    ///
    /// # Errors
    /// - `NoPuzzle` if nothing is open
    /// - `InvalidChoice` if `choice` is not one of the options; nothing runs
    pub fn attempt_puzzle(&mut self, choice: usize) -> Result<bool, EngineError> {
        let Some(puzzle) = self.puzzle.take() else {
            return Err(EngineError::NoPuzzle);
        };
        if choice >= puzzle.options().len() {
            warn!("puzzle option {choice} out of range");
            self.puzzle = Some(puzzle);
            return Err(EngineError::InvalidChoice {
                label: choice.to_string(),
            });
        }
        let solved = puzzle.attempt(self, choice);
        // a hook may have posed a follow-up puzzle
        if !solved && self.puzzle.is_none() {
            self.puzzle = Some(puzzle);
        }
        Ok(solved)
    }

    pub fn set_value(&mut self, key: &str, value: impl Into<serde_json::Value>) {
        let value = value.into();
        debug!("value '{key}' set to {value}");
        self.values.insert(key.to_string(), value);
    }

    pub fn value(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    /// Queue a message for the presentation layer.
    pub fn print(&mut self, text: impl Into<String>) {
        self.events.push(text);
    }

    pub fn print_kind(&mut self, text: impl Into<String>, kind: MessageKind) {
        self.events.push_kind(text, kind);
    }

    pub fn drain_messages(&mut self) -> Vec<Message> {
        self.events.drain()
    }

    pub fn events(&self) -> &EventSink {
        &self.events
    }

    // ENGINE-ONLY --------------------------------------

    pub(crate) fn set_path(&mut self, path: Vec<Label>) {
        if !self.visited.contains(&path) {
            self.visited.push(path.clone());
        }
        self.path = path;
    }

    pub(crate) fn set_conversation(&mut self, npc: &str, position: Vec<Label>) {
        self.conversations.insert(npc.to_string(), position);
    }

    /// Re-attach hooks that were only known by name after a load.
    pub(crate) fn rebind_hooks(&mut self, hooks: &HookRegistry) {
        self.inventory.rebind_hooks(|name| hooks.item_hook(name));
        if let Some(puzzle) = &mut self.puzzle {
            puzzle.rebind_hooks(hooks);
        }
        for fx in &mut self.effects {
            fx.rebind_hooks(hooks);
        }
    }

    pub(crate) fn record_tick(&mut self) -> u64 {
        self.ticks += 1;
        self.ticks
    }

    /// Owned copies of the display-facing parts of the state.
    pub fn achievement_list(&self) -> Vec<Achievement> {
        self.achievements.iter().cloned().collect()
    }

    /// Visited paths folded into a tree of labels.
    pub fn story_map(&self) -> StoryMap {
        let mut map = StoryMap::default();
        for path in &self.visited {
            let mut node = &mut map;
            for label in path {
                node = node.child_mut(label);
            }
        }
        map
    }
}

/// Tree of labels the player has followed, in first-visit order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoryMap {
    pub children: Vec<(Label, StoryMap)>,
}

impl StoryMap {
    pub fn child(&self, label: &str) -> Option<&StoryMap> {
        self.children.iter().find(|(l, _)| l == label).map(|(_, m)| m)
    }

    fn child_mut(&mut self, label: &str) -> &mut StoryMap {
        let idx = match self.children.iter().position(|(l, _)| l == label) {
            Some(idx) => idx,
            None => {
                self.children.push((label.to_string(), StoryMap::default()));
                self.children.len() - 1
            },
        };
        &mut self.children[idx].1
    }
}
