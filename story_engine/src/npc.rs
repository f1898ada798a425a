//! NPC Module
//!
//! Characters the player can talk to. The dialogue tree is fixed story content held by the
//! engine; how far each conversation has got lives in [`GameState`] so it is saved with the
//! rest of the session.
use std::collections::BTreeMap;

use log::{info, warn};
use story_data::{DialogueDef, NpcDef};

use crate::error::{EngineError, show_path};
use crate::graph::Label;
use crate::state::GameState;

/// One line of dialogue, the replies available after it and the topics nested below it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialogueNode {
    text: String,
    responses: Vec<(Label, Vec<Label>)>,
    topics: BTreeMap<Label, DialogueNode>,
}

impl DialogueNode {
    pub fn new(text: impl Into<String>) -> DialogueNode {
        DialogueNode {
            text: text.into(),
            ..DialogueNode::default()
        }
    }

    /// Add a reply leading to the topic at `next`. An empty path leads back to the opening line.
    #[must_use]
    pub fn reply(mut self, label: impl Into<Label>, next: Vec<Label>) -> Self {
        self.responses.push((label.into(), next));
        self
    }

    #[must_use]
    pub fn topic(mut self, key: impl Into<Label>, line: DialogueNode) -> Self {
        self.topics.insert(key.into(), line);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.responses.iter().map(|(label, _)| label.as_str())
    }

    /// Follow `path` through nested topics.
    pub fn resolve(&self, path: &[Label]) -> Option<&DialogueNode> {
        let mut line = self;
        for key in path {
            line = line.topics.get(key)?;
        }
        Some(line)
    }

    fn next_for(&self, label: &str) -> Option<&[Label]> {
        self.responses
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, next)| next.as_slice())
    }

    fn check_replies(&self, root: &DialogueNode, npc: &str) -> Result<(), EngineError> {
        for (label, next) in &self.responses {
            if root.resolve(next).is_none() {
                return Err(EngineError::InvalidStory(format!(
                    "{npc}: response '{label}' leads to missing topic {}",
                    show_path(next)
                )));
            }
        }
        self.topics.values().try_for_each(|topic| topic.check_replies(root, npc))
    }
}

impl From<&DialogueDef> for DialogueNode {
    fn from(def: &DialogueDef) -> Self {
        DialogueNode {
            text: def.text.clone(),
            responses: def
                .responses
                .iter()
                .map(|r| (r.label.clone(), r.next.clone()))
                .collect(),
            topics: def
                .topics
                .iter()
                .map(|(key, topic)| (key.clone(), DialogueNode::from(topic)))
                .collect(),
        }
    }
}

/// What a presenter shows after talking to someone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueView {
    pub npc: String,
    pub text: String,
    pub responses: Vec<Label>,
}

/// A non-playable character with a dialogue tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Npc {
    name: String,
    dialogue: DialogueNode,
}

impl Npc {
    /// # Errors
    /// - `InvalidStory` if any reply leads to a topic that does not exist
    pub fn new(name: impl Into<String>, dialogue: DialogueNode) -> Result<Npc, EngineError> {
        let name = name.into();
        dialogue.check_replies(&dialogue, &name)?;
        Ok(Npc { name, dialogue })
    }

    /// # Errors
    /// - `InvalidStory` if any reply leads to a topic that does not exist
    pub fn from_def(def: &NpcDef) -> Result<Npc, EngineError> {
        Npc::new(&def.name, DialogueNode::from(&def.dialogue))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dialogue(&self) -> &DialogueNode {
        &self.dialogue
    }

    /// The line this character's conversation has reached in `state`.
    pub fn current(&self, state: &GameState) -> &DialogueNode {
        let position = state.conversation(&self.name);
        self.dialogue.resolve(position).unwrap_or_else(|| {
            warn!("{}: stale conversation position {}, starting over", self.name, show_path(position));
            &self.dialogue
        })
    }

    pub fn view(&self, state: &GameState) -> DialogueView {
        let line = self.current(state);
        DialogueView {
            npc: self.name.clone(),
            text: line.text.clone(),
            responses: line.labels().map(str::to_string).collect(),
        }
    }

    /// Say the current line, then follow `choice` if one is given.
    ///
    /// # Errors
    /// - `InvalidChoice` if `choice` is not a reply to the current line; the conversation
    ///   stays where it was
    pub fn talk(&self, state: &mut GameState, choice: Option<&str>) -> Result<DialogueView, EngineError> {
        let line = self.current(state);
        state.print(format!("Talking to {}: {}", self.name, line.text));
        if let Some(choice) = choice {
            let Some(next) = line.next_for(choice) else {
                warn!("invalid reply '{choice}' to {}", self.name);
                return Err(EngineError::InvalidChoice {
                    label: choice.to_string(),
                });
            };
            info!("{}: conversation moves to {}", self.name, show_path(next));
            state.set_conversation(&self.name, next.to_vec());
        }
        Ok(self.view(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn miller() -> Npc {
        let dialogue = DialogueNode::new("Good day, traveller.")
            .reply("Ask about the mill", vec!["mill".into()])
            .reply("Leave", Vec::new())
            .topic(
                "mill",
                DialogueNode::new("The wheel jammed last spring.")
                    .reply("Can I help?", vec!["mill".into(), "help".into()])
                    .reply("Goodbye", Vec::new())
                    .topic("help", DialogueNode::new("Bring me a crowbar.").reply("I will", Vec::new())),
            );
        Npc::new("Miller", dialogue).unwrap()
    }

    #[test]
    fn talking_without_a_choice_stays_put() {
        let npc = miller();
        let mut state = GameState::new(1);
        let view = npc.talk(&mut state, None).unwrap();
        assert_eq!(view.text, "Good day, traveller.");
        assert_eq!(view.responses, vec!["Ask about the mill", "Leave"]);
        assert!(state.conversation("Miller").is_empty());
        assert_eq!(state.drain_messages()[0].text, "Talking to Miller: Good day, traveller.");
    }

    #[test]
    fn replies_walk_the_tree() {
        let npc = miller();
        let mut state = GameState::new(1);
        let view = npc.talk(&mut state, Some("Ask about the mill")).unwrap();
        assert_eq!(view.text, "The wheel jammed last spring.");

        let view = npc.talk(&mut state, Some("Can I help?")).unwrap();
        assert_eq!(view.text, "Bring me a crowbar.");
        assert_eq!(state.conversation("Miller"), ["mill".to_string(), "help".to_string()]);

        let view = npc.talk(&mut state, Some("I will")).unwrap();
        assert_eq!(view.text, "Good day, traveller.");
    }

    #[test]
    fn unknown_reply_is_an_invalid_choice() {
        let npc = miller();
        let mut state = GameState::new(1);
        assert!(matches!(
            npc.talk(&mut state, Some("Sing")),
            Err(EngineError::InvalidChoice { label }) if label == "Sing"
        ));
        assert!(state.conversation("Miller").is_empty());
    }

    #[test]
    fn replies_must_lead_somewhere() {
        let broken = DialogueNode::new("Hm?").reply("Ask", vec!["nowhere".into()]);
        assert!(matches!(Npc::new("Hermit", broken), Err(EngineError::InvalidStory(_))));
    }
}
