//! Command-line argument parsing

pub mod parser;

pub use parser::{Cli, Command, EffectCommand};
