//! Shared helper functions used across CLI subcommands.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use feishu_config::FeishuConfig;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber on stderr.
///
/// Stdout is reserved for progress lines, ending with `[OUTPUT] <path>`.
pub fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

pub fn load_config(explicit: Option<&Path>) -> Result<FeishuConfig> {
    FeishuConfig::load(explicit).context("failed to load Feishu configuration")
}

/// Raw key/value pairs as the loader sees them, plus the file they came from.
pub fn raw_config(explicit: Option<&Path>) -> Result<(BTreeMap<String, String>, Option<PathBuf>)> {
    let source = feishu_config::locate(explicit);
    let mut map = match &source {
        Some(path) => feishu_config::load_env_file(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => BTreeMap::new(),
    };
    feishu_config::overlay_env(&mut map, std::env::vars());
    Ok((map, source))
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Final line of every step that writes a file.
pub fn print_output(path: &Path) {
    println!("\n[OUTPUT] {}", path.display());
}

pub fn ok_or_fail(flag: bool) -> &'static str {
    if flag { "[OK]" } else { "[FAIL]" }
}
