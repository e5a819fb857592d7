pub mod bot;
pub mod commands;
pub mod gallery;

pub use bot::*;
pub use gallery::*;
