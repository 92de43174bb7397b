//! CLI argument definitions for feishu-doc.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

/// Markdown to Feishu/Lark documents.
#[derive(Parser)]
#[command(
    name = "feishu-doc",
    version,
    about = "Convert Markdown into Feishu/Lark documents",
    long_about = "Parses Markdown into docx blocks, creates a document, hands it over to a \
                  collaborator, writes the blocks, and optionally checks the result in a \
                  headless browser. Each step can also be run on its own."
)]
pub struct Cli {
    /// Path to the `feishu-config.env` file.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// More log output (`-v` debug, `-vv` trace). `RUST_LOG` wins.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse a Markdown file into `blocks.json`.
    Parse {
        markdown: PathBuf,
        #[arg(default_value = "output")]
        out_dir: PathBuf,
        /// Keep the first H1 instead of treating it as the document title.
        #[arg(long)]
        keep_title: bool,
    },

    /// Create a document and hand it over to the configured collaborator.
    Create {
        title: String,
        #[arg(default_value = "output")]
        out_dir: PathBuf,
    },

    /// Write the blocks of `blocks.json` into the document of `doc_info.json`.
    AddBlocks {
        blocks: PathBuf,
        doc_info: PathBuf,
        #[arg(default_value = "output")]
        out_dir: PathBuf,
    },

    /// Load the document in headless Chromium and record what it shows.
    Verify {
        doc_info: PathBuf,
        #[arg(default_value = "output")]
        out_dir: PathBuf,
        /// Seconds to wait after navigation before reading the page.
        #[arg(long, default_value_t = 5)]
        wait: u64,
    },

    /// Append a workflow's outcome to the run log.
    Log {
        workflow_dir: PathBuf,
        #[arg(default_value = ".")]
        log_dir: PathBuf,
        /// Markdown file the document was made from.
        #[arg(long)]
        source: Option<String>,
    },

    /// Run every step, each as its own process.
    Run {
        markdown: PathBuf,
        /// Document title; defaults to the file name without extension.
        #[arg(long)]
        title: Option<String>,
        #[arg(long, default_value = "workflow")]
        workflow_dir: PathBuf,
        #[arg(long, default_value = ".")]
        log_dir: PathBuf,
        #[arg(long)]
        skip_verify: bool,
    },

    /// Obtain a user access token through the browser OAuth flow.
    Auth {
        /// Only print the authorization URL.
        #[arg(long)]
        no_browser: bool,
    },

    /// Show which configuration keys are set.
    CheckConfig,
}
