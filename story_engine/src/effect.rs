//! Timed Effects
//!
//! Named effects that last a number of ticks. The `on_apply` hook runs once when the effect is
//! applied and `on_expire` runs on the tick that uses up its duration. Applying an effect
//! whose name is already active replaces it in place.
use story_data::SavedEffect;

use crate::hook::{Hook, HookRegistry};

#[derive(Debug, Clone, PartialEq)]
pub struct Effect {
    name: String,
    remaining: u32,
    on_apply: Option<Hook>,
    on_expire: Option<Hook>,
}

impl Effect {
    /// An effect lasting `duration` ticks. A duration of zero expires on the next tick.
    pub fn new(name: impl Into<String>, duration: u32) -> Effect {
        Effect {
            name: name.into(),
            remaining: duration,
            on_apply: None,
            on_expire: None,
        }
    }

    #[must_use]
    pub fn on_apply(mut self, hook: Hook) -> Self {
        self.on_apply = Some(hook);
        self
    }

    #[must_use]
    pub fn on_expire(mut self, hook: Hook) -> Self {
        self.on_expire = Some(hook);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ticks left before the effect wears off.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub(crate) fn apply_hook(&self) -> Option<&Hook> {
        self.on_apply.as_ref()
    }

    pub(crate) fn expire_hook(&self) -> Option<&Hook> {
        self.on_expire.as_ref()
    }

    /// Count one tick down. Returns `true` once the effect has run out.
    pub(crate) fn count_down(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining == 0
    }

    pub(crate) fn rebind_hooks(&mut self, hooks: &HookRegistry) {
        for hook in [&mut self.on_apply, &mut self.on_expire].into_iter().flatten() {
            hooks.rebind(hook);
        }
    }
}

impl From<&Effect> for SavedEffect {
    fn from(fx: &Effect) -> Self {
        SavedEffect {
            name: fx.name.clone(),
            remaining: fx.remaining,
            on_apply: fx.on_apply.as_ref().map(|h| h.name().to_string()),
            on_expire: fx.on_expire.as_ref().map(|h| h.name().to_string()),
        }
    }
}

impl From<SavedEffect> for Effect {
    fn from(saved: SavedEffect) -> Self {
        Effect {
            name: saved.name,
            remaining: saved.remaining,
            on_apply: saved.on_apply.map(Hook::unbound),
            on_expire: saved.on_expire.map(Hook::unbound),
        }
    }
}
