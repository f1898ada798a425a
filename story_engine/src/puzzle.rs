//! Puzzle Module
//!
//! Multiple-choice questions posed to the player. A node may carry one that is posed on entry,
//! and any hook can pose one through [`GameState::pose_puzzle`]. At most one puzzle is open at
//! a time.
use log::info;
use story_data::{PuzzleDef, SavedPuzzle};

use crate::error::EngineError;
use crate::hook::{Hook, HookRegistry};
use crate::state::GameState;

#[derive(Debug, Clone, PartialEq)]
pub struct Puzzle {
    question: String,
    options: Vec<String>,
    answer: usize,
    on_success: Option<Hook>,
    on_fail: Option<Hook>,
}

impl Puzzle {
    /// `answer` is a zero-based index into `options`.
    ///
    /// # Errors
    /// - `InvalidStory` if `answer` does not pick one of `options`
    pub fn new(question: impl Into<String>, options: Vec<String>, answer: usize) -> Result<Puzzle, EngineError> {
        let question = question.into();
        if answer >= options.len() {
            return Err(EngineError::InvalidStory(format!(
                "puzzle \"{question}\" has answer {answer} but only {} options",
                options.len()
            )));
        }
        Ok(Puzzle {
            question,
            options,
            answer,
            on_success: None,
            on_fail: None,
        })
    }

    #[must_use]
    pub fn on_success(mut self, hook: Hook) -> Self {
        self.on_success = Some(hook);
        self
    }

    #[must_use]
    pub fn on_fail(mut self, hook: Hook) -> Self {
        self.on_fail = Some(hook);
        self
    }

    /// Build from story content, resolving hook names through `hooks`.
    ///
    /// # Errors
    /// - `InvalidStory` for an out-of-range answer, `UnknownHook` for an unregistered hook
    pub fn from_def(def: &PuzzleDef, hooks: &HookRegistry) -> Result<Puzzle, EngineError> {
        let mut puzzle = Puzzle::new(&def.question, def.options.clone(), def.answer)?;
        if let Some(name) = &def.on_success {
            puzzle = puzzle.on_success(hooks.node_hook(name)?);
        }
        if let Some(name) = &def.on_fail {
            puzzle = puzzle.on_fail(hooks.node_hook(name)?);
        }
        Ok(puzzle)
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Check `choice`, run the matching hook and report the outcome. Returns `true` if solved.
    pub fn attempt(&self, state: &mut GameState, choice: usize) -> bool {
        let solved = choice == self.answer;
        let outcome = if solved { "solved" } else { "failed" };
        info!("puzzle \"{}\" {outcome} with option {choice}", self.question);
        let hook = if solved { &self.on_success } else { &self.on_fail };
        if let Some(hook) = hook {
            hook.call(state);
        }
        state.print(format!("Puzzle {outcome}: {}", self.question));
        solved
    }

    pub(crate) fn rebind_hooks(&mut self, hooks: &HookRegistry) {
        for hook in [&mut self.on_success, &mut self.on_fail].into_iter().flatten() {
            hooks.rebind(hook);
        }
    }
}

impl From<&Puzzle> for SavedPuzzle {
    fn from(puzzle: &Puzzle) -> Self {
        SavedPuzzle {
            question: puzzle.question.clone(),
            options: puzzle.options.clone(),
            answer: puzzle.answer,
            on_success: puzzle.on_success.as_ref().map(|h| h.name().to_string()),
            on_fail: puzzle.on_fail.as_ref().map(|h| h.name().to_string()),
        }
    }
}

impl From<SavedPuzzle> for Puzzle {
    fn from(saved: SavedPuzzle) -> Self {
        Puzzle {
            question: saved.question,
            options: saved.options,
            answer: saved.answer,
            on_success: saved.on_success.map(Hook::unbound),
            on_fail: saved.on_fail.map(Hook::unbound),
        }
    }
}
