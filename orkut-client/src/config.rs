use anyhow::{Context, Result};
use std::path::PathBuf;

/// Server used when `ORKUT_SERVER_URL` is not set
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

/// Name of the local state file inside the data directory
const STORE_FILE: &str = "smartsave.json";

/// Determine the server URL to use:
/// 1. Explicit override (e.g. a CLI flag)
/// 2. Environment variable ORKUT_SERVER_URL
/// 3. Default local server
pub fn determine_server_url(cli_override: Option<String>) -> String {
    if let Some(url) = cli_override {
        return url;
    }

    match std::env::var("ORKUT_SERVER_URL") {
        Ok(url) if !url.trim().is_empty() => url,
        _ => DEFAULT_SERVER_URL.to_string(),
    }
}

/// `~/.orkut`, home of the client's local files
pub fn data_dir() -> Result<PathBuf> {
    let home_dir = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home_dir.join(".orkut"))
}

/// Default location of the SmartSave store
pub fn default_store_path() -> Result<PathBuf> {
    Ok(data_dir()?.join(STORE_FILE))
}
