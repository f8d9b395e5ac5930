//! Configuration management for glamlens
//!
//! Uses XDG-compliant paths:
//! - Config: ~/.config/glamlens/config.toml
//! - Data: ~/.local/share/glamlens/

mod paths;

pub use paths::Paths;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Collection used when a command does not name one
    pub default_collection: Option<String>,

    /// Game object whose resolved paths describe the local player
    pub player_object_id: u32,

    pub matcher: MatcherConfig,

    pub extractor: ExtractorConfig,

    pub resolver: ResolverConfig,

    pub lifecycle: LifecycleConfig,

    pub options: OptionsConfig,

    #[serde(skip)]
    pub paths: Paths,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_collection: None,
            player_object_id: 0,
            matcher: MatcherConfig::default(),
            extractor: ExtractorConfig::default(),
            resolver: ResolverConfig::default(),
            lifecycle: LifecycleConfig::default(),
            options: OptionsConfig::default(),
            paths: Paths::new(),
        }
    }
}

/// Fuzzy name matching
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Words never counted as keywords
    pub stopwords: Vec<String>,

    /// Game names, treated like stopwords
    pub game_names: Vec<String>,

    /// Keywords shorter than this are ignored
    pub min_token_len: usize,

    /// Cleaned names shorter than this never take part in substring matching
    pub min_candidate_len: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            stopwords: to_strings(&["the", "and", "for", "with", "mod"]),
            game_names: to_strings(&["ffxiv", "xiv", "final", "fantasy"]),
            min_token_len: 3,
            min_candidate_len: 3,
        }
    }
}

/// Resource-tree label decoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Directory names whose next component is a mod folder
    pub mods_root_tokens: Vec<String>,

    /// Directory names skipped when looking for a mod folder
    pub system_dirs: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            mods_root_tokens: to_strings(&["penumbra", "penumbra mods", "mods"]),
            system_dirs: to_strings(&[
                "users",
                "home",
                "appdata",
                "roaming",
                "local",
                "documents",
                "desktop",
                "downloads",
                "program files",
                "program files (x86)",
                "xivlauncher",
                "mnt",
                "media",
                "tmp",
            ]),
        }
    }
}

/// Affecting-mods resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Changed-item paths inspected per mod by the priority heuristic
    pub visible_scan_limit: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            visible_scan_limit: 10,
        }
    }
}

/// Lifecycle cache behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Repeat deletion warnings for the same mod are suppressed within this window
    pub warning_debounce_secs: u64,

    /// Warning records older than this are pruned
    pub warning_retention_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            warning_debounce_secs: 5,
            warning_retention_secs: 600,
        }
    }
}

impl LifecycleConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_secs(self.warning_debounce_secs)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.warning_retention_secs)
    }
}

/// Option application through the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsConfig {
    /// Pause between successive option-set calls
    pub pacing_delay_ms: u64,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self { pacing_delay_ms: 50 }
    }
}

impl OptionsConfig {
    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl Config {
    /// Load configuration from disk, creating the default file on first run
    pub async fn load() -> Result<Self> {
        Self::load_with_paths(Paths::new()).await
    }

    pub async fn load_with_paths(paths: Paths) -> Result<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::read_file(&config_path).await?
        } else {
            let config = Config {
                paths: paths.clone(),
                ..Config::default()
            };
            config.save().await?;
            config
        };

        config.paths = paths;
        config.validate()?;
        Ok(config)
    }

    async fn read_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save configuration to disk
    pub async fn save(&self) -> Result<()> {
        let config_path = self.paths.config_file();

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content)
            .await
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Reject settings that would make matching or debouncing meaningless
    pub fn validate(&self) -> Result<()> {
        if self.matcher.min_token_len == 0 {
            bail!("matcher.min_token_len must be at least 1");
        }
        if self.lifecycle.warning_retention_secs < self.lifecycle.warning_debounce_secs {
            bail!(
                "lifecycle.warning_retention_secs ({}) must not be shorter than warning_debounce_secs ({})",
                self.lifecycle.warning_retention_secs,
                self.lifecycle.warning_debounce_secs
            );
        }
        Ok(())
    }
}
