//! `auth` and `check-config`.

use std::path::Path;

use anyhow::{Context, Result, bail};
use feishu_auth::TokenProvider;
use feishu_config::{CheckItem, FeishuConfig};

use crate::helpers::{load_config, print_output, raw_config};

pub async fn cmd_auth(config_path: Option<&Path>, no_browser: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let provider = TokenProvider::new(config);

    let token = provider
        .authorize(!no_browser)
        .await
        .context("authorization failed")?;

    println!("[OK] user access token saved");
    if !token.scope.is_empty() {
        println!("     scope: {}", token.scope);
    }
    print_output(provider.store().path());
    Ok(())
}

pub async fn cmd_check_config(config_path: Option<&Path>) -> Result<()> {
    let (map, source) = raw_config(config_path)?;

    match &source {
        Some(path) => println!("Config file: {}", path.display()),
        None => println!("Config file: not found (environment only)"),
    }

    let report = feishu_config::check(&map);
    println!("\nRequired:");
    for item in &report.required {
        print_item(item, "[FAIL]");
    }
    println!("\nRecommended:");
    for item in &report.recommended {
        print_item(item, "[WARN]");
    }

    if !report.required_ok() {
        bail!("required configuration is missing");
    }

    let config = FeishuConfig::from_map(&map).context("configuration is invalid")?;
    println!("\nToken file: {}", config.token_file.display());
    if config.token_file.is_file() {
        println!("[OK] user token present");
    } else {
        println!("[WARN] no user token yet; run `feishu-doc auth` before transferring ownership");
    }

    println!("\nAPI connection ({}):", config.api_domain);
    if let Err(e) = TokenProvider::new(config).tenant_token().await {
        println!("  [FAIL] tenant token request failed: {e}");
        bail!("cannot reach the Feishu API with these credentials");
    }
    println!("  [OK] API connection");
    println!("\n[OK] configuration is usable");
    Ok(())
}

fn print_item(item: &CheckItem, missing: &str) {
    match &item.display_value {
        Some(value) => println!("  [OK] {} = {value}", item.key),
        None => println!("  {missing} {} not set ({})", item.key, item.description),
    }
}
