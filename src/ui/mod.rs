//! User-facing command-line and terminal interfaces

pub mod cli;
pub mod tui;
