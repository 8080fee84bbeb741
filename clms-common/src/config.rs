//! Configuration loading and root folder resolution

use crate::{Error, Result};
use std::path::PathBuf;

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "clms.db";

/// Module configuration from database
#[derive(Debug, Clone)]
pub struct ModuleConfig {
    pub module_name: String,
    pub host: String,
    pub port: u16,
    pub enabled: bool,
}

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&str>, env_var_name: &str) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = load_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                    return PathBuf::from(root_folder);
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    get_default_root_folder()
}

/// Ensure the root folder exists, creating it if necessary
pub fn ensure_root_folder(root: &PathBuf) -> Result<()> {
    std::fs::create_dir_all(root)?;
    Ok(())
}

/// Full path of the shared database file inside the root folder
pub fn database_path(root: &PathBuf) -> PathBuf {
    root.join(DATABASE_FILE)
}

/// Get default configuration file path for the platform
fn load_config_file() -> Result<PathBuf> {
    if cfg!(target_os = "linux") {
        // Try ~/.config/clms/config.toml first, then /etc/clms/config.toml
        let user_config = dirs::config_dir().map(|d| d.join("clms").join("config.toml"));
        let system_config = PathBuf::from("/etc/clms/config.toml");

        if let Some(path) = user_config {
            if path.exists() {
                return Ok(path);
            }
        }
        if system_config.exists() {
            return Ok(system_config);
        }
        Err(Error::Config("No config file found".to_string()))
    } else {
        let config_path = dirs::config_dir()
            .map(|d| d.join("clms").join("config.toml"))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

        if config_path.exists() {
            Ok(config_path)
        } else {
            Err(Error::Config(format!(
                "Config file not found: {:?}",
                config_path
            )))
        }
    }
}

/// Get OS-dependent default root folder path
fn get_default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/clms (or /var/lib/clms for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("clms"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/clms"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/clms
        dirs::data_dir()
            .map(|d| d.join("clms"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/clms"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\clms
        dirs::data_local_dir()
            .map(|d| d.join("clms"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\clms"))
    } else {
        PathBuf::from("./clms_data")
    }
}

/// Load module configuration from database
///
/// Returns `Error::NotFound` when the module has no row; callers fall back
/// to compiled defaults in that case.
pub async fn load_module_config(db: &sqlx::SqlitePool, module_name: &str) -> Result<ModuleConfig> {
    let record = sqlx::query_as::<_, (String, String, i64, i64)>(
        "SELECT module_name, host, port, enabled FROM module_config WHERE module_name = ?",
    )
    .bind(module_name)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| Error::NotFound(format!("module_config entry for {}", module_name)))?;

    Ok(ModuleConfig {
        module_name: record.0,
        host: record.1,
        port: record.2 as u16,
        enabled: record.3 != 0,
    })
}

/// Load an integer setting from the settings table, falling back to a default
pub async fn load_setting_i64(db: &sqlx::SqlitePool, key: &str, default: i64) -> Result<i64> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await?;

    match value {
        Some(s) => s
            .parse::<i64>()
            .map_err(|_| Error::Config(format!("Setting '{}' is not an integer: {}", key, s))),
        None => Ok(default),
    }
}
