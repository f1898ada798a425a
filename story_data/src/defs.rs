use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A label on an edge between two story nodes.
pub type Label = String;

/// Top-level story content loaded by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoryDef {
    pub title: String,
    #[serde(default)]
    pub author: String,
    /// Labels leading from the root to the node where a new session starts.
    #[serde(default)]
    pub start: Vec<Label>,
    /// Initial free-form values for a new session.
    #[serde(default)]
    pub values: BTreeMap<String, serde_json::Value>,
    pub root: NodeDef,
    /// Characters the player can talk to.
    #[serde(default)]
    pub npcs: Vec<NpcDef>,
}

/// One scene and the choices leading out of it.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NodeDef {
    pub condition: String,
    /// Name of a registered hook run when the node is entered.
    #[serde(default)]
    pub on_enter: Option<String>,
    /// Choices in display order.
    #[serde(default)]
    pub answers: Vec<AnswerDef>,
    /// Puzzle posed to the player on entry.
    #[serde(default)]
    pub puzzle: Option<PuzzleDef>,
}

/// A labeled choice and the node it leads to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerDef {
    pub label: Label,
    pub node: NodeDef,
}

impl NodeDef {
    /// Count this node and every node below it.
    pub fn node_count(&self) -> usize {
        1 + self.answers.iter().map(|a| a.node.node_count()).sum::<usize>()
    }
}

/// A multiple-choice question with hooks for either outcome.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PuzzleDef {
    pub question: String,
    pub options: Vec<String>,
    /// Zero-based index into `options`.
    pub answer: usize,
    #[serde(default)]
    pub on_success: Option<String>,
    #[serde(default)]
    pub on_fail: Option<String>,
}

/// A character with a branching conversation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NpcDef {
    pub name: String,
    pub dialogue: DialogueDef,
}

/// One line of dialogue. Nested `topics` are addressed by the `next` paths of responses.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DialogueDef {
    pub text: String,
    #[serde(default)]
    pub responses: Vec<ResponseDef>,
    #[serde(default)]
    pub topics: BTreeMap<Label, DialogueDef>,
}

/// A reply the player can give and the topic path it leads to (empty: the opening line).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseDef {
    pub label: Label,
    #[serde(default)]
    pub next: Vec<Label>,
}

impl DialogueDef {
    /// Follow `path` through nested topics.
    pub fn topic(&self, path: &[Label]) -> Option<&DialogueDef> {
        let mut line = self;
        for key in path {
            line = line.topics.get(key)?;
        }
        Some(line)
    }
}
