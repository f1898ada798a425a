//! Shared data model for story content and saved sessions.

pub mod defs;
pub mod save;
pub mod validate;

pub use defs::*;
pub use save::*;
pub use validate::{ValidationError, validate_story};
