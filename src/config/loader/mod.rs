use crate::config::Config;
use crate::utils::{ensure_dir, get_reelay_home};
use anyhow::{Context, Result};
use fs2::FileExt;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_reelay_home()?.join("config.json"))
}

pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let default_path = get_config_path().unwrap_or_else(|_| PathBuf::from("config.json"));
    let path = config_path.unwrap_or(default_path.as_path());

    let mut config = if path.exists() {
        // Shared lock: concurrent readers are fine, writers wait
        let file = fs::File::open(path)
            .with_context(|| format!("Failed to open config at {}", path.display()))?;
        file.lock_shared()
            .with_context(|| "Failed to acquire shared lock on config file")?;

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let data: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config JSON from {}", path.display()))?;
        let data = migrate_config(data);

        check_file_permissions(path);
        serde_json::from_value(data).with_context(|| "Failed to deserialize config")?
    } else {
        Config::default()
    };

    crate::config::credentials::apply_env_overrides(&mut config);
    config
        .validate()
        .with_context(|| "Configuration validation failed")?;
    Ok(config)
}

/// Warn if the config file or its parent directory is readable by others.
#[cfg(unix)]
fn check_file_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    use std::sync::Once;

    static WARNED: Once = Once::new();
    WARNED.call_once(|| {
        if let Ok(meta) = fs::metadata(path) {
            let mode = meta.permissions().mode();
            if mode & 0o077 != 0 {
                warn!(
                    "config file {} has permissions {:o}, recommend 0600",
                    path.display(),
                    mode & 0o777
                );
            }
        }
    });
}

#[cfg(not(unix))]
fn check_file_permissions(_path: &Path) {}

/// Upper-case keys of the flat secrets file used by older deployments, and
/// where each one lives now.
const LEGACY_KEYS: &[(&str, &str, &str)] = &[
    ("DISCORD_BOT_TOKEN", "discord", "token"),
    ("DISCORD_CHANNEL_ID", "discord", "channelId"),
    ("DISCORD_PUBLIC_KEY", "discord", "publicKey"),
    ("DISCORD_USER_IDS", "discord", "userIds"),
    ("INSTAGRAM_BOT_USER_ID", "instagram", "botUserId"),
    ("INSTAGRAM_ACCESS_TOKEN", "instagram", "accessToken"),
    ("VERIFY_TOKEN", "instagram", "verifyToken"),
];

/// Ids in the flat file were often written as JSON numbers.
fn stringify_ids(value: Value) -> Value {
    match value {
        Value::Number(n) => Value::String(n.to_string()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, stringify_ids(v)))
                .collect(),
        ),
        other => other,
    }
}

fn migrate_config(data: Value) -> Value {
    let mut map = match data {
        Value::Object(map) => map,
        other => return other,
    };
    let mut migrated = 0;
    for (legacy, section, key) in LEGACY_KEYS {
        let Some(value) = map.remove(*legacy) else {
            continue;
        };
        let section_map = map
            .entry(section.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(section_map) = section_map
            && !section_map.contains_key(*key)
        {
            section_map.insert((*key).to_string(), stringify_ids(value));
            migrated += 1;
        }
    }
    if migrated > 0 {
        info!("migrated {} legacy secret(s) into the sectioned config", migrated);
    }
    Value::Object(map)
}

pub fn save_config(config: &Config, config_path: Option<&Path>) -> Result<()> {
    let default_path = get_config_path().unwrap_or_else(|_| PathBuf::from("config.json"));
    let path = config_path.unwrap_or(default_path.as_path());

    ensure_dir(path.parent().context("Config path has no parent")?)?;

    // atomic_write() renames over the target, which would drop a lock held on
    // the old inode, so writers serialise on a sibling lock file.
    let lock_path = path.with_extension("json.lock");
    let lock_file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&lock_path)
        .with_context(|| format!("Failed to create lock file at {}", lock_path.display()))?;
    lock_file
        .lock_exclusive()
        .with_context(|| "Failed to acquire exclusive lock on config lock file")?;

    let content = serde_json::to_string_pretty(config)?;
    crate::utils::atomic_write(path, &content)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
    }

    Ok(())
}
