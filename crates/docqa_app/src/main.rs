//! `docqa`: command-line front end for a document question-answering service.
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docqa health` | One liveness check |
//! | `docqa watch` | Poll liveness until Ctrl-C |
//! | `docqa docs` | List documents known to the service |
//! | `docqa ingest <files>...` | Upload files as one batch |
//! | `docqa ask "<question>"` | Ask against selected documents |
//! | `docqa delete <filename>` | Remove a document from the service |
//! | `docqa history` | Show the stored question history |
//! | `docqa shell` | Interactive session with all of the above |

mod app;
mod config;
mod logging;
mod session;
mod shell;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::logging::LogDestination;

#[derive(Debug, Parser)]
#[command(name = "docqa", version, about = "Upload documents and ask questions about them")]
pub struct Cli {
    /// RON configuration file (defaults to ./docqa.ron when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Base address of the analysis service; overrides config and DOCQA_API_BASE.
    #[arg(long, global = true)]
    pub api_base: Option<String>,

    /// Directory for the history file and the log file.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "file", global = true)]
    pub log: LogDestination,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check service liveness once.
    Health,
    /// Poll service liveness until interrupted.
    Watch,
    /// List documents in the registry.
    Docs,
    /// Upload files as one batch.
    Ingest {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Ask a question.
    Ask {
        question: String,
        /// Number of chunks to retrieve (1-20).
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=20))]
        top_k: Option<u32>,
        /// Restrict the answer to this document; repeatable.
        #[arg(long = "doc")]
        docs: Vec<String>,
    },
    /// Delete a document from the registry.
    Delete { filename: String },
    /// Print the stored question history.
    History,
    /// Start an interactive session.
    Shell,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    app::run(cli).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ask_accepts_repeated_docs() {
        let cli = Cli::parse_from([
            "docqa",
            "ask",
            "Summarize the lease",
            "--top-k",
            "7",
            "--doc",
            "lease.pdf",
            "--doc",
            "addendum.pdf",
        ]);
        match cli.command {
            Command::Ask {
                question,
                top_k,
                docs,
            } => {
                assert_eq!(question, "Summarize the lease");
                assert_eq!(top_k, Some(7));
                assert_eq!(docs, vec!["lease.pdf", "addendum.pdf"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn top_k_out_of_range_is_rejected() {
        assert!(Cli::try_parse_from(["docqa", "ask", "q", "--top-k", "0"]).is_err());
        assert!(Cli::try_parse_from(["docqa", "ask", "q", "--top-k", "21"]).is_err());
    }

    #[test]
    fn ingest_requires_paths() {
        assert!(Cli::try_parse_from(["docqa", "ingest"]).is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["docqa", "docs", "--api-base", "http://h:1", "--log", "terminal"]);
        assert_eq!(cli.api_base.as_deref(), Some("http://h:1"));
        assert_eq!(cli.log, LogDestination::Terminal);
    }
}
