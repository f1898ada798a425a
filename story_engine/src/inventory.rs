//! Equipment slots and the items they hold.
use crate::hook::Hook;

/// Slots a new inventory starts with, in display order.
pub const DEFAULT_SLOTS: [&str; 11] = [
    "Head",
    "Neck",
    "Ears",
    "Mouth",
    "Right hand",
    "Left hand",
    "Back",
    "Right leg",
    "Left leg",
    "Right leg bottom",
    "Left leg bottom",
];

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub name: String,
    pub description: String,
    /// Not persisted; re-bound by item name after a load.
    pub on_use: Option<Hook>,
}

impl Item {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            on_use: None,
        }
    }

    #[must_use]
    pub fn with_use(mut self, hook: Hook) -> Self {
        self.on_use = Some(hook);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InventorySlot {
    pub name: String,
    pub item: Option<Item>,
}

/// Ordered mapping of slot name to at most one item.
#[derive(Debug, Clone, PartialEq)]
pub struct Inventory {
    slots: Vec<InventorySlot>,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::with_slots(DEFAULT_SLOTS)
    }
}

impl Inventory {
    /// Create an inventory with the given empty slots. Repeated names are kept once.
    pub fn with_slots<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut inventory = Self { slots: Vec::new() };
        for name in names {
            inventory.slot_mut(name.into());
        }
        inventory
    }

    /// Put `item` in `slot`, creating the slot if needed. Returns whatever was there before.
    pub fn insert(&mut self, slot: &str, item: Item) -> Option<Item> {
        self.slot_mut(slot.to_string()).item.replace(item)
    }

    /// Add an empty slot if no slot of that name exists.
    pub fn add_slot(&mut self, slot: &str) {
        self.slot_mut(slot.to_string());
    }

    /// Empty `slot`, returning its item. Unknown slots are left alone.
    pub fn remove(&mut self, slot: &str) -> Option<Item> {
        self.slots.iter_mut().find(|s| s.name == slot).and_then(|s| s.item.take())
    }

    pub fn get(&self, slot: &str) -> Option<&Item> {
        self.slots
            .iter()
            .find(|s| s.name == slot)
            .and_then(|s| s.item.as_ref())
    }

    pub fn slots(&self) -> &[InventorySlot] {
        &self.slots
    }

    /// Filled slots only, in slot order.
    pub fn occupied(&self) -> impl Iterator<Item = (&str, &Item)> {
        self.slots
            .iter()
            .filter_map(|s| s.item.as_ref().map(|item| (s.name.as_str(), item)))
    }

    pub fn is_empty(&self) -> bool {
        self.occupied().next().is_none()
    }

    /// Re-attach `on_use` hooks by item name.
    pub fn rebind_hooks(&mut self, lookup: impl Fn(&str) -> Option<Hook>) {
        for item in self.slots.iter_mut().filter_map(|s| s.item.as_mut()) {
            if item.on_use.is_none() {
                item.on_use = lookup(&item.name);
            }
        }
    }

    fn slot_mut(&mut self, name: String) -> &mut InventorySlot {
        let idx = match self.slots.iter().position(|s| s.name == name) {
            Some(idx) => idx,
            None => {
                self.slots.push(InventorySlot { name, item: None });
                self.slots.len() - 1
            },
        };
        &mut self.slots[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_inventory_has_empty_equipment_slots() {
        let inv = Inventory::default();
        assert_eq!(inv.slots().len(), DEFAULT_SLOTS.len());
        assert_eq!(inv.slots()[4].name, "Right hand");
        assert!(inv.is_empty());
    }

    #[test]
    fn insert_overwrites_and_returns_previous() {
        let mut inv = Inventory::default();
        assert!(inv.insert("Right hand", Item::new("Torch", "Smoky")).is_none());
        let old = inv.insert("Right hand", Item::new("Sword", "Sharp"));
        assert_eq!(old.map(|i| i.name), Some("Torch".to_string()));
        assert_eq!(inv.get("Right hand").map(|i| i.name.as_str()), Some("Sword"));
    }

    #[test]
    fn unknown_slot_is_appended() {
        let mut inv = Inventory::with_slots(["Head"]);
        inv.insert("Tail", Item::new("Ribbon", "Red"));
        let names: Vec<_> = inv.slots().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Head", "Tail"]);
    }

    #[test]
    fn remove_empty_or_unknown_slot_is_noop() {
        let mut inv = Inventory::with_slots(["Head", "Head"]);
        assert_eq!(inv.slots().len(), 1);
        assert!(inv.remove("Head").is_none());
        assert!(inv.remove("Nowhere").is_none());
        assert_eq!(inv.slots().len(), 1);
    }
}
