//! Unlocked achievements.
//!
//! Names are unique. Adding a name that is already unlocked is ignored and the first
//! description is kept.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Achievement {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Achievements {
    unlocked: Vec<Achievement>,
}

impl Achievements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unlock an achievement. Returns `false` if the name was already unlocked.
    pub fn add(&mut self, name: &str, description: &str) -> bool {
        if self.contains(name) {
            return false;
        }
        self.unlocked.push(Achievement {
            name: name.to_string(),
            description: description.to_string(),
        });
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.unlocked.iter().any(|a| a.name == name)
    }

    /// Achievements in unlock order.
    pub fn iter(&self) -> impl Iterator<Item = &Achievement> {
        self.unlocked.iter()
    }

    pub fn len(&self) -> usize {
        self.unlocked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unlocked.is_empty()
    }
}
