pub mod client;
pub mod orchestrator;
pub mod prompt;

pub use client::*;
pub use orchestrator::*;
