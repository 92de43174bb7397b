//! CLI entry point for feishu-docflow.
//!
//! This binary provides the `feishu-doc` command. Every workflow step is a
//! subcommand of its own; `run` chains them by spawning this same binary.

mod cli;
mod helpers;
mod setup;
mod steps;
mod workflow;

use anyhow::Result;
use clap::Parser;
use feishu_workflow::RunOptions;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    helpers::init_tracing(cli.verbose);

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Parse {
            markdown,
            out_dir,
            keep_title,
        } => steps::cmd_parse(&markdown, &out_dir, keep_title),
        Commands::Create { title, out_dir } => steps::cmd_create(config, &title, &out_dir).await,
        Commands::AddBlocks {
            blocks,
            doc_info,
            out_dir,
        } => steps::cmd_add_blocks(config, &blocks, &doc_info, &out_dir).await,
        Commands::Verify {
            doc_info,
            out_dir,
            wait,
        } => steps::cmd_verify(config, &doc_info, &out_dir, wait).await,
        Commands::Log {
            workflow_dir,
            log_dir,
            source,
        } => steps::cmd_log(&workflow_dir, &log_dir, source.as_deref()),
        Commands::Run {
            markdown,
            title,
            workflow_dir,
            log_dir,
            skip_verify,
        } => {
            let options = RunOptions {
                markdown,
                title,
                workflow_dir,
                log_dir,
                skip_verify,
            };
            workflow::cmd_run(config, cli.verbose, options).await
        }
        Commands::Auth { no_browser } => setup::cmd_auth(config, no_browser).await,
        Commands::CheckConfig => setup::cmd_check_config(config).await,
    }
}
