use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "muninn", version, about = "Context intelligence for coding sessions")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project root (defaults to the current directory).
    #[arg(long, global = true)]
    pub cd: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the startup planner: health check, resume markdown, session open.
    Start {
        /// Goal for the new session.
        goal: Option<String>,
    },
    /// End the active session: record outcome, extract learnings, settle decisions.
    End {
        /// Free-text outcome summary.
        #[arg(long)]
        outcome: Option<String>,
        /// 0=failure, 1=partial, 2=success.
        #[arg(long)]
        success: Option<u8>,
        /// Free-text next steps, one per line.
        #[arg(long)]
        next_steps: Option<String>,
        /// Send the session transcript (read from stdin) to the configured
        /// transcript analyzer instead of extracting learnings locally.
        #[arg(long)]
        analyze: bool,
    },
    /// Run the enrichment pipeline for one tool call (JSON read from stdin).
    Enrich {
        /// Tool name as the hook reports it (e.g. "Edit", "Write", "Bash").
        tool: String,
    },
    /// Approve a pending hard-block operation.
    Approve {
        operation_id: String,
    },
}
