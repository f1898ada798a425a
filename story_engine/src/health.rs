//! Health Module
//!
//! Tracks hit points and queued over-time effects. Nothing here clamps or ends the session;
//! what a depleted value means is up to story content.
use log::info;
use story_data::SavedHealthEffect;

/// One effect application during a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedEffect {
    pub cause: String,
    pub delta: i64,
    pub hp_after: i64,
}

/// Outcome of ticking queued health effects.
#[derive(Debug, Clone, Default)]
pub struct HealthTickResult {
    pub applied: Vec<AppliedEffect>,
    /// Cause of the first effect that took health from positive to zero or below.
    pub depleted_by: Option<String>,
}

/// Hit points plus the queue of pending over-time effects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Health {
    current: i64,
    pub(crate) effects: Vec<HealthEffect>,
}

impl Health {
    pub fn new(current: i64) -> Health {
        Health {
            current,
            effects: Vec::new(),
        }
    }

    pub fn current(&self) -> i64 {
        self.current
    }

    pub fn life_state(&self) -> LifeState {
        if self.current > 0 {
            LifeState::Alive
        } else {
            LifeState::Depleted
        }
    }

    /// Apply `delta` without clamping and return the new value.
    pub fn modify(&mut self, delta: i64) -> i64 {
        self.current = self.current.saturating_add(delta);
        self.current
    }

    pub fn add_effect(&mut self, fx: HealthEffect) {
        self.effects.push(fx);
    }

    /// Take the first effect with a matching cause out of the queue.
    pub fn remove_effect(&mut self, cause: &str) -> Option<HealthEffect> {
        let idx = self.effects.iter().position(|fx| fx.cause() == cause)?;
        Some(self.effects.remove(idx))
    }

    pub fn effects(&self) -> &[HealthEffect] {
        &self.effects
    }

    /// Apply each pending effect once, in queue order, keeping the ones with ticks left.
    pub fn tick_effects(&mut self) -> HealthTickResult {
        let mut result = HealthTickResult::default();
        let mut ongoing = Vec::new();
        for fx in std::mem::take(&mut self.effects) {
            let was_alive = self.current > 0;
            let (delta, follow_up) = fx.apply();
            let hp_after = self.modify(delta);
            info!("health effect '{}' applied ({delta:+} hp, now {hp_after})", fx.cause());
            if was_alive && hp_after <= 0 && result.depleted_by.is_none() {
                result.depleted_by = Some(fx.cause().to_string());
            }
            result.applied.push(AppliedEffect {
                cause: fx.cause().to_string(),
                delta,
                hp_after,
            });
            if let Some(contd) = follow_up {
                ongoing.push(contd);
            }
        }
        self.effects = ongoing;
        result
    }
}

/// Possible life states as seen by content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeState {
    Alive,
    Depleted,
}

/// Effects applied once per tick for a number of ticks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HealthEffect {
    DamageOverTime { cause: String, amount: u32, times: u32 },
    HealOverTime { cause: String, amount: u32, times: u32 },
}

impl HealthEffect {
    pub fn cause(&self) -> &str {
        match self {
            Self::DamageOverTime { cause, .. } | Self::HealOverTime { cause, .. } => cause,
        }
    }

    /// Signed hp change for one application plus the follow-up effect, if ticks remain.
    pub fn apply(&self) -> (i64, Option<HealthEffect>) {
        match self {
            Self::DamageOverTime { cause, amount, times } => {
                let times_left = times.saturating_sub(1);
                let follow_up = (times_left > 0).then(|| Self::DamageOverTime {
                    cause: cause.clone(),
                    amount: *amount,
                    times: times_left,
                });
                (-i64::from(*amount), follow_up)
            },
            Self::HealOverTime { cause, amount, times } => {
                let times_left = times.saturating_sub(1);
                let follow_up = (times_left > 0).then(|| Self::HealOverTime {
                    cause: cause.clone(),
                    amount: *amount,
                    times: times_left,
                });
                (i64::from(*amount), follow_up)
            },
        }
    }
}

impl From<&HealthEffect> for SavedHealthEffect {
    fn from(fx: &HealthEffect) -> Self {
        match fx.clone() {
            HealthEffect::DamageOverTime { cause, amount, times } => SavedHealthEffect::DamageOverTime { cause, amount, times },
            HealthEffect::HealOverTime { cause, amount, times } => SavedHealthEffect::HealOverTime { cause, amount, times },
        }
    }
}

impl From<SavedHealthEffect> for HealthEffect {
    fn from(saved: SavedHealthEffect) -> Self {
        match saved {
            SavedHealthEffect::DamageOverTime { cause, amount, times } => HealthEffect::DamageOverTime { cause, amount, times },
            SavedHealthEffect::HealOverTime { cause, amount, times } => HealthEffect::HealOverTime { cause, amount, times },
        }
    }
}
