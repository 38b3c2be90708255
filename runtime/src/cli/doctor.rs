//! Environment readiness check.

use crate::cli::output;
use crate::config::{find_chromium, HarvestConfig, CHROMIUM_PATH_ENV};
use anyhow::Result;

/// Check Chromium availability and report the effective settings.
pub async fn run() -> Result<()> {
    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;
    let chromium_path = find_chromium();
    let config = HarvestConfig::default();

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "os": os,
            "arch": arch,
            "chromium": chromium_path.as_ref().map(|p| p.display().to_string()),
            "ready": chromium_path.is_some(),
            "config": config,
        }));
        return Ok(());
    }

    println!("PatentScope Doctor");
    println!("==================");
    println!();
    println!("OS:   {os}");
    println!("Arch: {arch}");
    println!();

    match &chromium_path {
        Some(path) => println!("[OK] Chromium found: {}", path.display()),
        None => println!(
            "[!!] Chromium NOT found. Install Chrome or set {CHROMIUM_PATH_ENV}."
        ),
    }

    println!();
    println!("Search:      {}", config.search_url);
    println!("Detail:      {}", config.detail_url);
    println!(
        "Timeouts:    navigate {}ms, settle {}ms, content {}ms, unit {}ms",
        config.navigation_timeout_ms,
        config.settle_timeout_ms,
        config.content_gate_timeout_ms,
        config.unit_ceiling_ms
    );
    println!("Pacing:      {}ms", config.pacing_ms);

    println!();
    if chromium_path.is_some() {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }

    Ok(())
}
