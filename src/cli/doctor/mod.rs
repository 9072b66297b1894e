//! `reelay check`: load and validate the config, then report what the
//! server would run with.

use crate::config::credentials::{CREDENTIAL_NAMES, detect_source};
use crate::config::{Config, load_config};
use crate::utils::media::media_dir;
use anyhow::Result;
use std::path::Path;
use tracing::debug;

#[derive(Debug)]
enum CheckResult {
    Pass(String),
    Fail(String),
    Skip(String),
}

impl CheckResult {
    fn label(&self) -> &'static str {
        match self {
            Self::Pass(_) => "PASS",
            Self::Fail(_) => "FAIL",
            Self::Skip(_) => "SKIP",
        }
    }

    fn detail(&self) -> &str {
        match self {
            Self::Pass(s) | Self::Fail(s) | Self::Skip(s) => s,
        }
    }

    fn is_fail(&self) -> bool {
        matches!(self, Self::Fail(_))
    }
}

fn print_check(name: &str, result: &CheckResult) {
    println!("  {:<6} {:<26} {}", result.label(), name, result.detail());
}

fn check_config_exists(path: &Path) -> CheckResult {
    if path.exists() {
        CheckResult::Pass(format!("{}", path.display()))
    } else {
        CheckResult::Skip(format!("not found at {} (using defaults)", path.display()))
    }
}

fn check_serve_ready(config: &Config) -> CheckResult {
    match config.validate_for_serve() {
        Ok(()) => CheckResult::Pass("all required settings present".to_string()),
        Err(e) => CheckResult::Fail(e.to_string()),
    }
}

fn check_config_file_permissions(path: &Path) -> CheckResult {
    if !path.exists() {
        return CheckResult::Skip("config file not found".to_string());
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(meta) = std::fs::metadata(path) {
            let mode = meta.permissions().mode() & 0o777;
            if mode.trailing_zeros() >= 6 {
                CheckResult::Pass(format!("{:o}", mode))
            } else {
                CheckResult::Fail(format!(
                    "{:o} (group/world readable, run: chmod 600 {})",
                    mode,
                    path.display()
                ))
            }
        } else {
            CheckResult::Skip("cannot read metadata".to_string())
        }
    }

    #[cfg(not(unix))]
    CheckResult::Skip("permission check not available on this platform".to_string())
}

fn check_media_dir(config: &Config) -> CheckResult {
    let dir = match media_dir(config.relay.media_dir.as_deref()) {
        Ok(dir) => dir,
        Err(e) => return CheckResult::Fail(format!("{:#}", e)),
    };
    match tempfile::tempfile_in(&dir) {
        Ok(_) => CheckResult::Pass(format!("{} (writable)", dir.display())),
        Err(e) => CheckResult::Fail(format!("{} (not writable: {})", dir.display(), e)),
    }
}

fn credential_report(config: &Config) -> Vec<(&'static str, &'static str)> {
    CREDENTIAL_NAMES
        .iter()
        .map(|name| (*name, detect_source(name, config)))
        .collect()
}

pub fn check_command(path: &Path) -> Result<()> {
    println!("reelay check\n");
    println!("{}", "=".repeat(60));

    let mut fail_count = 0u32;
    let mut record = |name: &str, result: &CheckResult| {
        print_check(name, result);
        if result.is_fail() {
            fail_count += 1;
        }
    };

    println!("\n  Config");
    println!("  {}", "-".repeat(56));
    record("Config file", &check_config_exists(path));
    record("File permissions", &check_config_file_permissions(path));

    let config = match load_config(Some(path)) {
        Ok(config) => {
            record("Config validates", &CheckResult::Pass("ok".to_string()));
            config
        }
        Err(e) => {
            record("Config validates", &CheckResult::Fail(format!("{:#}", e)));
            anyhow::bail!("config is invalid");
        }
    };
    record("Ready to serve", &check_serve_ready(&config));
    record("Media directory", &check_media_dir(&config));

    println!("\n  Credentials");
    println!("  {}", "-".repeat(56));
    for (name, source) in credential_report(&config) {
        println!("  {:<33} {}", name, source);
    }

    debug!("effective config: {:?}", config);
    println!("\n  Effective config");
    println!("  {}", "-".repeat(56));
    println!("{:#?}", config);

    println!("\n{}", "=".repeat(60));
    if fail_count > 0 {
        anyhow::bail!("{} check(s) failed", fail_count);
    }
    println!("  All checks passed!");
    Ok(())
}
