use std::collections::HashSet;
use std::fmt;

use crate::*;

/// Problem found while checking the shape of a `StoryDef`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    DuplicateLabel { at: Vec<Label>, label: Label },
    EmptyLabel { at: Vec<Label> },
    UnresolvedStart { start: Vec<Label> },
    PuzzleAnswerOutOfRange { at: Vec<Label>, answer: usize, options: usize },
    UnresolvedResponse { npc: String, label: Label, next: Vec<Label> },
    DuplicateNpc { name: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::DuplicateLabel { at, label } => {
                write!(f, "duplicate answer '{label}' at {}", show_path(at))
            },
            ValidationError::EmptyLabel { at } => {
                write!(f, "empty answer label at {}", show_path(at))
            },
            ValidationError::UnresolvedStart { start } => {
                write!(f, "start path {} does not lead to a node", show_path(start))
            },
            ValidationError::PuzzleAnswerOutOfRange { at, answer, options } => {
                write!(f, "puzzle at {} has answer {answer} but only {options} options", show_path(at))
            },
            ValidationError::UnresolvedResponse { npc, label, next } => {
                write!(f, "{npc}: response '{label}' leads to missing topic {}", show_path(next))
            },
            ValidationError::DuplicateNpc { name } => write!(f, "npc '{name}' is defined twice"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Check label uniqueness, the start path, puzzles and NPC dialogue of a `StoryDef`.
///
/// ```
/// use story_data::{AnswerDef, NodeDef, StoryDef, validate_story};
///
/// let story = StoryDef {
///     title: "Demo".into(),
///     start: vec!["Go north".into()],
///     root: NodeDef {
///         condition: "A crossroads.".into(),
///         answers: vec![AnswerDef {
///             label: "Go north".into(),
///             node: NodeDef::default(),
///         }],
///         ..NodeDef::default()
///     },
///     ..StoryDef::default()
/// };
/// assert!(validate_story(&story).is_empty());
/// ```
pub fn validate_story(story: &StoryDef) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut at = Vec::new();
    check_node(&story.root, &mut at, &mut errors);

    if !start_resolves(&story.root, &story.start) {
        errors.push(ValidationError::UnresolvedStart {
            start: story.start.clone(),
        });
    }

    let mut names = HashSet::new();
    for npc in &story.npcs {
        if !names.insert(npc.name.as_str()) {
            errors.push(ValidationError::DuplicateNpc { name: npc.name.clone() });
        }
        check_dialogue(&npc.name, &npc.dialogue, &npc.dialogue, &mut errors);
    }
    errors
}

fn check_dialogue(npc: &str, root: &DialogueDef, line: &DialogueDef, errors: &mut Vec<ValidationError>) {
    for response in &line.responses {
        if root.topic(&response.next).is_none() {
            errors.push(ValidationError::UnresolvedResponse {
                npc: npc.to_string(),
                label: response.label.clone(),
                next: response.next.clone(),
            });
        }
    }
    for topic in line.topics.values() {
        check_dialogue(npc, root, topic, errors);
    }
}

fn check_node(node: &NodeDef, at: &mut Vec<Label>, errors: &mut Vec<ValidationError>) {
    if let Some(puzzle) = &node.puzzle
        && puzzle.answer >= puzzle.options.len()
    {
        errors.push(ValidationError::PuzzleAnswerOutOfRange {
            at: at.clone(),
            answer: puzzle.answer,
            options: puzzle.options.len(),
        });
    }
    let mut seen = HashSet::new();
    for answer in &node.answers {
        if answer.label.trim().is_empty() {
            errors.push(ValidationError::EmptyLabel { at: at.clone() });
        }
        if !seen.insert(answer.label.as_str()) {
            errors.push(ValidationError::DuplicateLabel {
                at: at.clone(),
                label: answer.label.clone(),
            });
            // the shadowed subtree is unreachable; don't report inside it
            continue;
        }
        at.push(answer.label.clone());
        check_node(&answer.node, at, errors);
        at.pop();
    }
}

fn start_resolves(root: &NodeDef, start: &[Label]) -> bool {
    let mut node = root;
    for label in start {
        match node.answers.iter().find(|a| &a.label == label) {
            Some(answer) => node = &answer.node,
            None => return false,
        }
    }
    true
}

fn show_path(path: &[Label]) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.join(" > ")
    }
}
