// The core module contains all business logic.
// Nothing in here knows about HTTP, files or the terminal.

#[path = "assistant/mod.rs"]
pub mod assistant;
