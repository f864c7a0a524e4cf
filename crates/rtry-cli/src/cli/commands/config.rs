//! Config command: show where defaults come from and what they resolve to.

use anyhow::Result;
use rtry_core::config::{self, RtryConfig};
use std::path::Path;

pub fn run_config(cfg: &RtryConfig, explicit: Option<&Path>) -> Result<()> {
    match explicit {
        Some(path) => println!("config: {}", path.display()),
        None => println!("config: {}", config::config_path()?.display()),
    }

    let defaults = cfg.retry.to_defaults()?;
    match defaults.attempts {
        Some(n) => println!("attempts: {n}"),
        None => println!("attempts: unbounded"),
    }
    println!("delay: {:?}", defaults.delay);
    match defaults.timeout {
        Some(t) if !t.is_zero() => println!("timeout: {t:?}"),
        _ => println!("timeout: none"),
    }
    println!(
        "swallow: {}",
        if defaults.swallow_all { "all" } else { "none" }
    );
    Ok(())
}
