//! XDG-compliant path management

use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Application paths
///
/// Resolved through the platform's base directories; falls back to a
/// `.glamlens` directory under the working directory when no home directory
/// can be determined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    pub fn new() -> Self {
        match ProjectDirs::from("", "", "glamlens") {
            Some(dirs) => Self {
                config_dir: dirs.config_dir().to_path_buf(),
                data_dir: dirs.data_dir().to_path_buf(),
            },
            None => Self::with_root(Path::new(".glamlens")),
        }
    }

    /// Keep config and data under a single root
    pub fn with_root(root: &Path) -> Self {
        Self {
            config_dir: root.join("config"),
            data_dir: root.join("data"),
        }
    }

    /// Config directory: ~/.config/glamlens/
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Main config file: ~/.config/glamlens/config.toml
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Data directory: ~/.local/share/glamlens/
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Database file: ~/.local/share/glamlens/glamlens.db
    pub fn database_file(&self) -> PathBuf {
        self.data_dir.join("glamlens.db")
    }

    /// Log file: ~/.local/share/glamlens/glamlens.log
    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("glamlens.log")
    }

    /// Ensure all required directories exist
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}
