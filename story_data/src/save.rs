//! The persisted save document.
//!
//! `path`, `health`, `inventory`, `achievements` and `values` are required. Everything else
//! defaults when absent so older documents keep loading.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::Label;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveDoc {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub saved_at: String,
    #[serde(default)]
    pub session: Option<String>,
    pub path: Vec<Label>,
    pub health: i64,
    /// Slot name to item; `None` marks an empty slot. Slot order is preserved.
    #[serde(with = "ordered_slots")]
    pub inventory: Vec<(String, Option<SavedItem>)>,
    pub achievements: Vec<SavedAchievement>,
    pub values: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub visited: Vec<Vec<Label>>,
    #[serde(default)]
    pub ticks: u64,
    #[serde(default)]
    pub health_effects: Vec<SavedHealthEffect>,
    /// Timed effects still running.
    #[serde(default)]
    pub effects: Vec<SavedEffect>,
    /// The puzzle waiting for an answer, if any.
    #[serde(default)]
    pub puzzle: Option<SavedPuzzle>,
    /// NPC name to the topic path its conversation has reached.
    #[serde(default)]
    pub conversations: BTreeMap<String, Vec<Label>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedItem {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedAchievement {
    pub name: String,
    pub description: String,
}

/// A pending over-time health effect.
///
/// Must stay externally tagged: RON cannot read internally tagged enums back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SavedHealthEffect {
    DamageOverTime { cause: String, amount: u32, times: u32 },
    HealOverTime { cause: String, amount: u32, times: u32 },
}

/// A running timed effect. Hooks are stored by name and re-bound on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedEffect {
    pub name: String,
    pub remaining: u32,
    #[serde(default)]
    pub on_apply: Option<String>,
    #[serde(default)]
    pub on_expire: Option<String>,
}

/// An unanswered puzzle. Hooks are stored by name and re-bound on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedPuzzle {
    pub question: String,
    pub options: Vec<String>,
    pub answer: usize,
    #[serde(default)]
    pub on_success: Option<String>,
    #[serde(default)]
    pub on_fail: Option<String>,
}

/// Writes the slot list as a map while keeping document order on the way back in.
mod ordered_slots {
    use super::SavedItem;
    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S>(slots: &[(String, Option<SavedItem>)], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(slots.len()))?;
        for (slot, item) in slots {
            map.serialize_entry(slot, item)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<(String, Option<SavedItem>)>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SlotsVisitor;

        impl<'de> Visitor<'de> for SlotsVisitor {
            type Value = Vec<(String, Option<SavedItem>)>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of slot names to items or null")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut slots = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((slot, item)) = access.next_entry::<String, Option<SavedItem>>()? {
                    if slots.iter().any(|(existing, _)| *existing == slot) {
                        return Err(serde::de::Error::custom(format!("duplicate inventory slot '{slot}'")));
                    }
                    slots.push((slot, item));
                }
                Ok(slots)
            }
        }

        deserializer.deserialize_map(SlotsVisitor)
    }
}
