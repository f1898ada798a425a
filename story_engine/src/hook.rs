//! Named callback handles.
//!
//! Node entry hooks, item `on_use` hooks, puzzle and effect hooks and the tick function are
//! all plain closures over `&mut GameState`. They carry a name so they can be logged, compared
//! and re-bound after a save is loaded (closures themselves are never persisted).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::{debug, warn};

use crate::error::EngineError;
use crate::state::GameState;

type HookFn = dyn Fn(&mut GameState) + Send + Sync;

/// A named, shareable callback over the game state.
#[derive(Clone)]
pub struct Hook {
    name: Arc<str>,
    func: Arc<HookFn>,
    bound: bool,
}

impl Hook {
    pub fn new(name: impl Into<String>, func: impl Fn(&mut GameState) + Send + Sync + 'static) -> Self {
        Self {
            name: Arc::from(name.into()),
            func: Arc::new(func),
            bound: true,
        }
    }

    /// Placeholder for a hook known only by name, as read back from a save. Calling it does
    /// nothing until [`HookRegistry::rebind`] swaps in the registered hook.
    pub fn unbound(name: impl Into<String>) -> Self {
        let name: Arc<str> = Arc::from(name.into());
        let logged = Arc::clone(&name);
        Self {
            name,
            func: Arc::new(move |_: &mut GameState| warn!("hook '{logged}' called before being bound")),
            bound: false,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the hook against `state`.
    pub fn call(&self, state: &mut GameState) {
        debug!("running hook '{}'", self.name);
        (self.func)(state);
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Hook").field(&self.name).finish()
    }
}

impl PartialEq for Hook {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// Hooks available to story files, looked up by name.
#[derive(Debug, Clone, Default)]
pub struct HookRegistry {
    node_hooks: HashMap<String, Hook>,
    item_hooks: HashMap<String, Hook>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook that story nodes may name in `on_enter`.
    pub fn register_node_hook(&mut self, hook: Hook) -> &mut Self {
        self.node_hooks.insert(hook.name().to_string(), hook);
        self
    }

    /// Register the `on_use` hook for items with the given name.
    pub fn register_item_hook(&mut self, item_name: impl Into<String>, hook: Hook) -> &mut Self {
        self.item_hooks.insert(item_name.into(), hook);
        self
    }

    /// Look up a node hook.
    ///
    /// # Errors
    /// - `UnknownHook` if nothing was registered under `name`
    pub fn node_hook(&self, name: &str) -> Result<Hook, EngineError> {
        self.node_hooks
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownHook { name: name.to_string() })
    }

    pub fn item_hook(&self, item_name: &str) -> Option<Hook> {
        self.item_hooks.get(item_name).cloned()
    }

    /// Replace an unbound placeholder with the node hook registered under the same name.
    pub fn rebind(&self, hook: &mut Hook) {
        if hook.is_bound() {
            return;
        }
        match self.node_hooks.get(hook.name()) {
            Some(found) => *hook = found.clone(),
            None => warn!("no hook registered as '{}'; it stays unbound", hook.name()),
        }
    }
}
