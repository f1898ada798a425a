//! The story graph.
//!
//! A [`StoryGraph`] is a tree of [`StoryNode`]s built once per run and never mutated after
//! that, so it can be shared between threads without locking. The player's position is a
//! path of answer labels from the root.
use std::collections::HashSet;

use log::warn;

use crate::error::EngineError;
use crate::hook::Hook;
use crate::puzzle::Puzzle;

pub use story_data::Label;

/// One scene: descriptive text plus labeled choices in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct StoryNode {
    condition: String,
    answers: Vec<(Label, StoryNode)>,
    on_enter: Option<Hook>,
    puzzle: Option<Puzzle>,
}

impl StoryNode {
    /// Start building a node with the given scene text.
    pub fn builder(condition: impl Into<String>) -> StoryNodeBuilder {
        StoryNodeBuilder {
            condition: condition.into(),
            answers: Vec::new(),
            on_enter: None,
            puzzle: None,
        }
    }

    /// A terminal node with no choices.
    pub fn ending(condition: impl Into<String>) -> StoryNode {
        StoryNode {
            condition: condition.into(),
            answers: Vec::new(),
            on_enter: None,
            puzzle: None,
        }
    }

    pub fn condition(&self) -> &str {
        &self.condition
    }

    /// Follow one labeled answer.
    pub fn answer(&self, label: &str) -> Option<&StoryNode> {
        self.answers.iter().find(|(l, _)| l == label).map(|(_, node)| node)
    }

    /// Choice labels in display order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.answers.iter().map(|(l, _)| l.as_str())
    }

    pub fn answers(&self) -> &[(Label, StoryNode)] {
        &self.answers
    }

    pub fn on_enter(&self) -> Option<&Hook> {
        self.on_enter.as_ref()
    }

    /// Puzzle posed when the node is entered, after the entry hook.
    pub fn puzzle(&self) -> Option<&Puzzle> {
        self.puzzle.as_ref()
    }

    /// No further choices from here.
    pub fn is_terminal(&self) -> bool {
        self.answers.is_empty()
    }
}

/// Collects answers for a [`StoryNode`] and rejects duplicate labels on `build`.
#[derive(Debug)]
pub struct StoryNodeBuilder {
    condition: String,
    answers: Vec<(Label, StoryNode)>,
    on_enter: Option<Hook>,
    puzzle: Option<Puzzle>,
}

impl StoryNodeBuilder {
    #[must_use]
    pub fn answer(mut self, label: impl Into<Label>, node: StoryNode) -> Self {
        self.answers.push((label.into(), node));
        self
    }

    #[must_use]
    pub fn on_enter(mut self, hook: Hook) -> Self {
        self.on_enter = Some(hook);
        self
    }

    #[must_use]
    pub fn puzzle(mut self, puzzle: Puzzle) -> Self {
        self.puzzle = Some(puzzle);
        self
    }

    /// Finish the node.
    ///
    /// # Errors
    /// - `DuplicateAnswer` if two answers share a label
    pub fn build(self) -> Result<StoryNode, EngineError> {
        let mut seen = HashSet::new();
        for (label, _) in &self.answers {
            if !seen.insert(label.as_str()) {
                warn!("duplicate answer '{label}' on node \"{}\"", self.condition);
                return Err(EngineError::DuplicateAnswer { label: label.clone() });
            }
        }
        Ok(StoryNode {
            condition: self.condition,
            answers: self.answers,
            on_enter: self.on_enter,
            puzzle: self.puzzle,
        })
    }
}

/// Read-only story content for a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoryGraph {
    root: Option<StoryNode>,
}

impl StoryGraph {
    pub fn new(root: StoryNode) -> StoryGraph {
        StoryGraph { root: Some(root) }
    }

    /// A graph with no root; every lookup fails with `EmptyGraph`.
    pub fn empty() -> StoryGraph {
        StoryGraph { root: None }
    }

    pub fn root(&self) -> Option<&StoryNode> {
        self.root.as_ref()
    }

    /// Follow `path` from the root.
    ///
    /// # Errors
    /// - `EmptyGraph` if there is no root
    /// - `NodeNotFound` naming the first label that is not an answer of the node reached so far
    pub fn resolve(&self, path: &[Label]) -> Result<&StoryNode, EngineError> {
        let mut node = self.root.as_ref().ok_or(EngineError::EmptyGraph)?;
        for (depth, label) in path.iter().enumerate() {
            node = node.answer(label).ok_or_else(|| EngineError::NodeNotFound {
                path: path[..depth].to_vec(),
                label: label.clone(),
            })?;
        }
        Ok(node)
    }

    /// Number of nodes in the graph.
    pub fn len(&self) -> usize {
        fn count(node: &StoryNode) -> usize {
            1 + node.answers.iter().map(|(_, n)| count(n)).sum::<usize>()
        }
        self.root.as_ref().map_or(0, count)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }
}
