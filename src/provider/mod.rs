//! Mod provider boundary
//!
//! The provider is the external modding framework that owns the installed-mod
//! catalog. Every call can fault; callers inside the engine turn faults into
//! "no data" instead of propagating them.

mod snapshot;

pub use snapshot::*;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// Errors reported by a mod provider call
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("mod provider is unavailable: {0}")]
    Unavailable(String),

    #[error("mod provider call '{0}' timed out")]
    Timeout(String),

    #[error("'{0}' is not known to the mod provider")]
    NotFound(String),

    #[error("mod provider returned invalid data: {0}")]
    InvalidData(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// An installed mod as reported by the provider catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModDescriptor {
    /// Stable, unique directory identifier
    pub directory_id: String,

    /// Human-readable name shown by the provider
    pub display_name: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Higher number = higher priority
    #[serde(default)]
    pub priority: i32,
}

fn default_enabled() -> bool {
    true
}

impl ModDescriptor {
    pub fn new(directory_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            directory_id: directory_id.into(),
            display_name: display_name.into(),
            enabled: true,
            priority: 0,
        }
    }

    pub fn with_state(mut self, enabled: bool, priority: i32) -> Self {
        self.enabled = enabled;
        self.priority = priority;
        self
    }
}

/// Per-collection state of a single mod
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModSettings {
    pub enabled: bool,
    #[serde(default)]
    pub priority: i32,
}

/// One node of a resource tree: which on-disk file currently supplies
/// which nominal game path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTreeNode {
    #[serde(default)]
    pub actual_path: Option<String>,

    #[serde(default)]
    pub game_path: Option<String>,

    #[serde(default)]
    pub children: Vec<ResourceTreeNode>,
}

impl ResourceTreeNode {
    pub fn new(actual_path: Option<&str>, game_path: Option<&str>) -> Self {
        Self {
            actual_path: actual_path.map(str::to_string),
            game_path: game_path.map(str::to_string),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<ResourceTreeNode>) -> Self {
        self.children = children;
        self
    }
}

/// Resolved-path table of a game object: actual path -> game paths it serves
pub type ResolvedPaths = HashMap<String, BTreeSet<String>>;

/// Lifecycle events emitted by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ModEvent {
    #[serde(rename_all = "camelCase")]
    Added { directory_id: String },
    #[serde(rename_all = "camelCase")]
    Deleted { directory_id: String },
    #[serde(rename_all = "camelCase")]
    Moved { old_id: String, new_id: String },
}

/// Request/response interface of the external modding framework
///
/// All calls are blocking. Implementations are expected to enforce their own
/// timeouts and report them as [`ProviderError::Timeout`].
#[cfg_attr(test, mockall::automock)]
pub trait ModProvider: Send + Sync {
    /// Installed-mod catalog with the provider's current enabled/priority state
    fn catalog(&self) -> Result<Vec<ModDescriptor>, ProviderError>;

    /// Changed-item identifiers declared by a mod (item names and game paths)
    fn changed_items(&self, directory_id: &str) -> Result<BTreeSet<String>, ProviderError>;

    /// Resource trees of every currently loaded player-related object
    fn loaded_resource_trees(&self) -> Result<Vec<ResourceTreeNode>, ProviderError>;

    /// Resolved-path table for one game object
    fn resolved_paths(&self, object_id: u32) -> Result<ResolvedPaths, ProviderError>;

    /// Enabled/priority state of every mod in a collection
    fn mod_settings(&self, collection_id: &str)
        -> Result<HashMap<String, ModSettings>, ProviderError>;

    /// Select options of one option group of a mod within a collection
    fn set_mod_setting(
        &self,
        collection_id: &str,
        directory_id: &str,
        group: &str,
        options: &[String],
    ) -> Result<(), ProviderError>;
}

/// Fetch the catalog with collection settings applied, keeping only enabled mods.
///
/// A faulting catalog call yields an empty list. A faulting settings call
/// keeps the catalog's own enabled/priority values.
pub fn enabled_catalog(provider: &dyn ModProvider, collection_id: Option<&str>) -> Vec<ModDescriptor> {
    let mut catalog = match provider.catalog() {
        Ok(catalog) => catalog,
        Err(e) => {
            tracing::warn!("Failed to read mod catalog: {}", e);
            return Vec::new();
        }
    };

    if let Some(collection) = collection_id {
        match provider.mod_settings(collection) {
            Ok(settings) => {
                for descriptor in &mut catalog {
                    match settings.get(&descriptor.directory_id) {
                        Some(state) => {
                            descriptor.enabled = state.enabled;
                            descriptor.priority = state.priority;
                        }
                        None => descriptor.enabled = false,
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to read settings for collection '{}', using catalog state: {}",
                    collection,
                    e
                );
            }
        }
    }

    catalog.retain(|m| m.enabled);
    catalog
}

/// Look up a single catalog entry; faults and unknown ids yield `None`
pub fn find_in_catalog(provider: &dyn ModProvider, directory_id: &str) -> Option<ModDescriptor> {
    match provider.catalog() {
        Ok(catalog) => catalog.into_iter().find(|m| m.directory_id == directory_id),
        Err(e) => {
            tracing::debug!("Catalog lookup for '{}' failed: {}", directory_id, e);
            None
        }
    }
}

/// Changed items of a mod; faults yield an empty set
pub fn changed_items_or_empty(provider: &dyn ModProvider, directory_id: &str) -> BTreeSet<String> {
    provider.changed_items(directory_id).unwrap_or_else(|e| {
        tracing::debug!("Failed to read changed items for '{}': {}", directory_id, e);
        BTreeSet::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabled_catalog_applies_collection_settings() {
        let mut provider = MockModProvider::new();
        provider.expect_catalog().returning(|| {
            Ok(vec![
                ModDescriptor::new("a", "Alpha"),
                ModDescriptor::new("b", "Beta").with_state(false, 0),
                ModDescriptor::new("c", "Gamma"),
            ])
        });
        provider.expect_mod_settings().returning(|_| {
            let mut settings = HashMap::new();
            settings.insert("a".to_string(), ModSettings { enabled: false, priority: 0 });
            settings.insert("b".to_string(), ModSettings { enabled: true, priority: 4 });
            Ok(settings)
        });

        let catalog = enabled_catalog(&provider, Some("Default"));
        let ids: Vec<_> = catalog.iter().map(|m| m.directory_id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
        assert_eq!(catalog[0].priority, 4);
    }

    #[test]
    fn enabled_catalog_survives_settings_fault() {
        let mut provider = MockModProvider::new();
        provider
            .expect_catalog()
            .returning(|| Ok(vec![ModDescriptor::new("a", "Alpha"), ModDescriptor::new("b", "Beta").with_state(false, 0)]));
        provider
            .expect_mod_settings()
            .returning(|_| Err(ProviderError::Timeout("GetModSettings".to_string())));

        let catalog = enabled_catalog(&provider, Some("Default"));
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].directory_id, "a");
    }

    #[test]
    fn enabled_catalog_is_empty_when_catalog_faults() {
        let mut provider = MockModProvider::new();
        provider
            .expect_catalog()
            .returning(|| Err(ProviderError::Unavailable("not loaded".to_string())));

        assert!(enabled_catalog(&provider, None).is_empty());
        assert!(find_in_catalog(&provider, "a").is_none());
    }

    #[test]
    fn mod_events_use_tagged_json() {
        let event: ModEvent =
            serde_json::from_str(r#"{"type":"moved","oldId":"Old Dir","newId":"New Dir"}"#).unwrap();
        assert_eq!(
            event,
            ModEvent::Moved {
                old_id: "Old Dir".to_string(),
                new_id: "New Dir".to_string()
            }
        );
    }
}
