//! Conversational dialogue engine access.

pub mod base;
pub mod teneo;

pub use base::{DialogueEngine, DialogueError, DialogueReply, DialogueResult, strip_markup};
pub use teneo::TeneoClient;
