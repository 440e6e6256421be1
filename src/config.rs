//! Optional config file loading. Search order: ./farms-epub.toml, then
//! $XDG_CONFIG_HOME/farms-epub/config.toml (or ~/.config/farms-epub/config.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file contents. All fields optional; only present keys override defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default, deny_unknown_fields)]
pub struct Config {
    /// Directory the package is written into when -o is not set. Relative to CWD.
    pub output_dir: Option<PathBuf>,
    /// `epub` (default) or `directory`.
    pub output_mode: Option<String>,
    /// HTTP User-Agent header.
    pub user_agent: Option<String>,
    /// Request timeout in seconds. Unset means the HTTP client's default.
    pub timeout_secs: Option<u64>,
    /// Publications endpoint; `?bookid=...` is appended.
    pub base_url: Option<String>,
}

const LOCAL_FILE: &str = "farms-epub.toml";

/// Candidate config files, highest priority first: `<cwd>/farms-epub.toml`, then
/// `farms-epub/config.toml` under the platform config dir when one exists.
fn candidate_paths(cwd: &Path) -> Vec<PathBuf> {
    std::iter::once(cwd.join(LOCAL_FILE))
        .chain(dirs::config_dir().map(|d| d.join("farms-epub").join("config.toml")))
        .collect()
}

/// Parse one config file. Unknown keys and a bad `timeout_secs` type are errors.
fn read_config(path: &Path) -> Result<Config, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
    toml::from_str(&text).map_err(|e| format!("Invalid config {}: {}", path.display(), e))
}

/// Settings for `output_dir`, `output_mode`, `user_agent`, `timeout_secs` and `base_url`
/// from the first config file that exists. `Ok(None)` when there is none; the run then
/// uses CLI flags and built-in defaults only.
pub fn load_config() -> Result<Option<Config>, String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Cannot determine current directory: {}", e))?;
    let Some(path) = candidate_paths(&cwd).into_iter().find(|p| p.is_file()) else {
        return Ok(None);
    };
    let config = read_config(&path)?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(Some(config))
}
