//! `testify.toml` configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use testify_core::model::Mode;

/// Top-level testify configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestifyConfig {
    /// Mode new sessions start in.
    #[serde(default)]
    pub mode: Mode,
    /// Where reports are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// Used when `output_dir` cannot be written, and for builder exports
    /// without an explicit destination.
    #[serde(default = "default_fallback_dir")]
    pub fallback_dir: String,
    /// Overall percentage to aim for.
    #[serde(default = "default_goal_overall")]
    pub goal_overall: f64,
    /// Per-section percentage to aim for.
    #[serde(default = "default_goal_per_section")]
    pub goal_per_section: f64,
}

fn default_output_dir() -> String {
    "./testify-results".to_string()
}
fn default_fallback_dir() -> String {
    "${HOME}/.local/share/testify".to_string()
}
fn default_goal_overall() -> f64 {
    85.0
}
fn default_goal_per_section() -> f64 {
    80.0
}

impl Default for TestifyConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            output_dir: default_output_dir(),
            fallback_dir: default_fallback_dir(),
            goal_overall: default_goal_overall(),
            goal_per_section: default_goal_per_section(),
        }
    }
}

impl TestifyConfig {
    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.output_dir)
    }

    pub fn fallback_dir(&self) -> PathBuf {
        PathBuf::from(&self.fallback_dir)
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// Substituted values are copied as-is and never re-scanned.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        let var_name = &rest[start + 2..start + end];
        result.push_str(&rest[..start]);
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

/// Load config from an explicit path, or search the default locations.
///
/// Search order:
/// 1. `testify.toml` in the current directory
/// 2. `~/.config/testify/config.toml`
///
/// `TESTIFY_MODE` overrides the configured mode.
pub fn load_config_from(path: Option<&Path>) -> Result<TestifyConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("testify.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = toml::from_str::<TestifyConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!("using config {}", path.display());
            config
        }
        None => TestifyConfig::default(),
    };

    if let Ok(mode) = std::env::var("TESTIFY_MODE") {
        config.mode = mode
            .parse()
            .map_err(|e: String| anyhow::anyhow!("TESTIFY_MODE: {e}"))?;
    }

    config.output_dir = resolve_env_vars(&config.output_dir);
    config.fallback_dir = resolve_env_vars(&config.fallback_dir);

    anyhow::ensure!(
        (0.0..=100.0).contains(&config.goal_overall)
            && (0.0..=100.0).contains(&config.goal_per_section),
        "goals must be percentages between 0 and 100"
    );

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("testify"))
}
