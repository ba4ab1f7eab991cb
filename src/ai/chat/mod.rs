mod core;
mod models;

pub use self::core::{ChatSession, Submission};
pub use models::{Conversation, GenerationToken, StreamState, Transcript};
