//! CLI module for ItemRAG
//!
//! Handles command-line argument parsing and terminal rendering of results.

pub mod args;
pub mod display;

pub use args::{Args, Commands, Verbosity};
pub use display::{default_filter, render_result};
