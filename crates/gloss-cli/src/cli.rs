//! Command-line argument definitions

use clap::{Parser, Subcommand};

/// Gloss - drive annotation and edge-case synthesis rounds
#[derive(Parser)]
#[command(name = "gloss", version, about)]
pub struct Cli {
    /// Base URL of a running gloss-api server
    #[arg(long, default_value = "http://127.0.0.1:8000", env = "GLOSS_SERVER")]
    pub server: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand)]
pub enum Command {
    /// Annotate a file of examples (one per line)
    Annotate {
        /// File with one example text per line
        #[arg(long)]
        file: String,

        /// File holding the annotation guideline
        #[arg(long)]
        guideline: String,

        /// Task identifier
        #[arg(long)]
        task: String,

        /// Re-annotation round number
        #[arg(long)]
        round: Option<u32>,
    },

    /// Annotate a single example against fitted models
    AnnotateOne {
        /// The example text
        #[arg(long)]
        text: String,

        /// File holding the annotation guideline
        #[arg(long)]
        guideline: String,

        /// Task identifier
        #[arg(long)]
        task: String,
    },

    /// Synthesize edge-case categories from an annotation result file
    Synthesize {
        /// JSON file with an `annotations` array (an annotate snapshot)
        #[arg(long)]
        results: String,

        /// File holding the annotation guideline
        #[arg(long)]
        guideline: String,

        /// Task identifier
        #[arg(long)]
        task: String,

        /// Re-annotation round number
        #[arg(long)]
        round: Option<u32>,
    },
}
