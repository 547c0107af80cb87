//! Agent module - model server client and the interactive terminal chat

pub mod llm;
pub mod interactive;

pub use interactive::run_interactive;
