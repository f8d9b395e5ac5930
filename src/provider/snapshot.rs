//! JSON snapshot provider
//!
//! Serves a captured provider state from a JSON document. Used by the CLI to
//! inspect captured sessions and by tests as a deterministic provider.

use super::{ModDescriptor, ModEvent, ModProvider, ModSettings, ProviderError, ResolvedPaths, ResourceTreeNode};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

/// Captured provider state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Snapshot {
    pub catalog: Vec<ModDescriptor>,

    /// directory id -> changed-item identifiers
    pub changed_items: HashMap<String, BTreeSet<String>>,

    pub resource_trees: Vec<ResourceTreeNode>,

    /// object id -> resolved-path table
    pub resolved_paths: HashMap<u32, ResolvedPaths>,

    /// collection id -> directory id -> settings
    pub collections: HashMap<String, HashMap<String, ModSettings>>,

    /// Lifecycle events queued for replay
    pub events: Vec<ModEvent>,

    /// Names of provider calls that should fault
    /// (`catalog`, `changedItems`, `resourceTrees`, `resolvedPaths`, `modSettings`, `setModSetting`)
    pub faults: BTreeSet<String>,
}

/// An option-set call recorded by the snapshot provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedSetting {
    pub collection_id: String,
    pub directory_id: String,
    pub group: String,
    pub options: Vec<String>,
}

/// [`ModProvider`] backed by a [`Snapshot`]
#[derive(Debug, Default)]
pub struct SnapshotProvider {
    snapshot: Snapshot,
    applied: Mutex<Vec<AppliedSetting>>,
}

impl SnapshotProvider {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            applied: Mutex::new(Vec::new()),
        }
    }

    /// Provider with no mods installed
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(json).context("Failed to parse provider snapshot")?;
        Ok(Self::new(snapshot))
    }

    /// Load a snapshot file from disk
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        Self::from_json(&content)
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn events(&self) -> &[ModEvent] {
        &self.snapshot.events
    }

    /// Option-set calls received so far, in call order
    pub fn applied_settings(&self) -> Vec<AppliedSetting> {
        self.applied
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn check_fault(&self, call: &str) -> Result<(), ProviderError> {
        if self.snapshot.faults.contains(call) {
            return Err(ProviderError::Unavailable(format!("{} is configured to fault", call)));
        }
        Ok(())
    }
}

impl ModProvider for SnapshotProvider {
    fn catalog(&self) -> Result<Vec<ModDescriptor>, ProviderError> {
        self.check_fault("catalog")?;
        Ok(self.snapshot.catalog.clone())
    }

    fn changed_items(&self, directory_id: &str) -> Result<BTreeSet<String>, ProviderError> {
        self.check_fault("changedItems")?;
        if !self.snapshot.catalog.iter().any(|m| m.directory_id == directory_id) {
            return Err(ProviderError::NotFound(directory_id.to_string()));
        }
        Ok(self
            .snapshot
            .changed_items
            .get(directory_id)
            .cloned()
            .unwrap_or_default())
    }

    fn loaded_resource_trees(&self) -> Result<Vec<ResourceTreeNode>, ProviderError> {
        self.check_fault("resourceTrees")?;
        Ok(self.snapshot.resource_trees.clone())
    }

    fn resolved_paths(&self, object_id: u32) -> Result<ResolvedPaths, ProviderError> {
        self.check_fault("resolvedPaths")?;
        Ok(self
            .snapshot
            .resolved_paths
            .get(&object_id)
            .cloned()
            .unwrap_or_default())
    }

    fn mod_settings(&self, collection_id: &str) -> Result<HashMap<String, ModSettings>, ProviderError> {
        self.check_fault("modSettings")?;
        self.snapshot
            .collections
            .get(collection_id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(collection_id.to_string()))
    }

    fn set_mod_setting(
        &self,
        collection_id: &str,
        directory_id: &str,
        group: &str,
        options: &[String],
    ) -> Result<(), ProviderError> {
        self.check_fault("setModSetting")?;
        if !self.snapshot.collections.contains_key(collection_id) {
            return Err(ProviderError::NotFound(collection_id.to_string()));
        }
        if !self.snapshot.catalog.iter().any(|m| m.directory_id == directory_id) {
            return Err(ProviderError::NotFound(directory_id.to_string()));
        }
        self.applied
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(AppliedSetting {
                collection_id: collection_id.to_string(),
                directory_id: directory_id.to_string(),
                group: group.to_string(),
                options: options.to_vec(),
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "catalog": [
            { "directoryId": "Cool Hair", "displayName": "[Hair] Cool Hair", "priority": 3 },
            { "directoryId": "Old Boots", "displayName": "Old Boots", "enabled": false }
        ],
        "changedItems": {
            "Cool Hair": ["Customization: Hyur Midlander Male Hair 3"]
        },
        "resolvedPaths": {
            "0": { "C:/Penumbra/Cool Hair/chara/hair.mdl": ["chara/human/c0101/obj/hair/h0003/model/c0101h0003_hir.mdl"] }
        },
        "collections": {
            "Default": { "Cool Hair": { "enabled": true, "priority": 7 } }
        },
        "events": [ { "type": "deleted", "directoryId": "Old Boots" } ],
        "faults": ["resourceTrees"]
    }"#;

    #[test]
    fn test_snapshot_parses_and_serves_calls() {
        let provider = SnapshotProvider::from_json(SNAPSHOT).unwrap();

        let catalog = provider.catalog().unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(catalog[0].enabled);
        assert!(!catalog[1].enabled);

        assert_eq!(provider.changed_items("Cool Hair").unwrap().len(), 1);
        assert!(provider.changed_items("Old Boots").unwrap().is_empty());
        assert!(matches!(
            provider.changed_items("Missing"),
            Err(ProviderError::NotFound(_))
        ));

        assert_eq!(provider.resolved_paths(0).unwrap().len(), 1);
        assert!(provider.resolved_paths(7).unwrap().is_empty());
        assert_eq!(provider.mod_settings("Default").unwrap()["Cool Hair"].priority, 7);
        assert_eq!(provider.events().len(), 1);
    }

    #[test]
    fn test_configured_faults() {
        let provider = SnapshotProvider::from_json(SNAPSHOT).unwrap();
        assert!(matches!(
            provider.loaded_resource_trees(),
            Err(ProviderError::Unavailable(_))
        ));
    }

    #[test]
    fn test_records_applied_settings() {
        let provider = SnapshotProvider::from_json(SNAPSHOT).unwrap();
        provider
            .set_mod_setting("Default", "Cool Hair", "Color", &["Red".to_string()])
            .unwrap();
        assert!(provider
            .set_mod_setting("Default", "Unknown", "Color", &[])
            .is_err());

        let applied = provider.applied_settings();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].group, "Color");
        assert_eq!(applied[0].options, vec!["Red".to_string()]);
    }
}
