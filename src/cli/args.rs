//! Command-line argument parsing for ItemRAG
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ItemRAG - Answer questions about catalogue items from a knowledge base
#[derive(Parser, Debug)]
#[command(name = "itemrag")]
#[command(version)]
#[command(about = "Retrieval-augmented answers grounded in your knowledge store", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (only warnings and errors are logged)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Answer a question through the RAG pipeline
    Ask {
        /// The question to answer
        #[arg(value_name = "QUESTION")]
        question: String,

        /// Item the question is about; scopes retrieval and boosts its documents
        #[arg(long)]
        item_id: Option<String>,

        /// Tenant passed through to the knowledge store
        #[arg(long)]
        tenant: Option<String>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Display current configuration
    Config {
        /// Write the default configuration to the config path
        #[arg(long)]
        init: bool,
    },
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }

    /// Check argument combinations clap cannot express
    pub fn validate(&self) -> Result<(), String> {
        if self.quiet && self.verbose > 0 {
            return Err("Cannot combine --quiet with --verbose.".to_string());
        }

        if let Commands::Ask { question, .. } = &self.command {
            if question.trim().is_empty() {
                return Err("Question must not be empty.".to_string());
            }
        }

        Ok(())
    }
}

impl Verbosity {
    /// Log level for the crate's own targets
    pub fn log_level(&self, configured: &str) -> String {
        match self {
            Verbosity::Quiet => "warn".to_string(),
            Verbosity::Normal => configured.to_string(),
            Verbosity::Verbose => "debug".to_string(),
            Verbosity::VeryVerbose => "trace".to_string(),
        }
    }

    /// Check if should show the progress spinner
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }

    /// Check if should show per-stage timings
    pub fn show_timings(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }
}
