//! Mod lifecycle cache
//!
//! Keeps a category per installed mod directory, driven by the provider's
//! added/deleted/moved events, and mirrors every change into a persistent
//! store. Deleting a mod that designs still reference produces one
//! consolidated warning, debounced per mod.

mod warnings;

pub use warnings::{DeletionWarningRecord, DeletionWarnings};

use crate::config::LifecycleConfig;
use crate::designs::DesignReference;
use crate::mods::{ItemIdentifierClassifier, ModType};
use crate::provider::{changed_items_or_empty, find_in_catalog, ModEvent, ModProvider};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Cached category of one mod directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModCacheEntry {
    pub directory_id: String,
    pub display_name: String,
    pub category: ModType,
    pub last_updated: DateTime<Utc>,
}

/// Durable mirror of the lifecycle cache
#[cfg_attr(test, mockall::automock)]
pub trait ModCacheStore: Send + Sync {
    fn update_mod_cache(&self, directory_id: &str, display_name: &str, category: ModType) -> Result<()>;

    fn remove_from_mod_cache(&self, directory_id: &str) -> Result<()>;

    fn move_in_mod_cache(
        &self,
        old_id: &str,
        new_id: &str,
        display_name: &str,
        category: ModType,
    ) -> Result<()>;

    fn load_mod_cache(&self) -> Result<Vec<ModCacheEntry>>;
}

/// Lookup of designs whose per-item mod state references a mod
#[cfg_attr(test, mockall::automock)]
pub trait DesignIndex: Send + Sync {
    fn designs_referencing(&self, directory_id: &str) -> Result<Vec<DesignReference>>;
}

/// Receiver of user-facing warnings
pub trait WarningSink: Send + Sync {
    fn warn(&self, directory_id: &str, message: &str);
}

/// Sends warnings to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogWarningSink;

impl WarningSink for LogWarningSink {
    fn warn(&self, directory_id: &str, message: &str) {
        tracing::warn!(mod_directory = directory_id, "{}", message);
    }
}

/// Result of reconciling the cache with the provider catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

struct CacheState {
    entries: HashMap<String, ModCacheEntry>,
    warnings: DeletionWarnings,
}

/// Category cache kept current by provider lifecycle events
///
/// Entry and warning mutations are serialized through one lock so events
/// arriving from a provider callback thread cannot interleave. Provider
/// lookups happen before the lock is taken.
pub struct ModLifecycleCache {
    provider: Arc<dyn ModProvider>,
    store: Arc<dyn ModCacheStore>,
    designs: Arc<dyn DesignIndex>,
    sink: Arc<dyn WarningSink>,
    classifier: ItemIdentifierClassifier,
    state: Mutex<CacheState>,
}

impl ModLifecycleCache {
    pub fn new(
        provider: Arc<dyn ModProvider>,
        store: Arc<dyn ModCacheStore>,
        designs: Arc<dyn DesignIndex>,
        config: &LifecycleConfig,
    ) -> Self {
        Self {
            provider,
            store,
            designs,
            sink: Arc::new(LogWarningSink),
            classifier: ItemIdentifierClassifier::new(),
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                warnings: DeletionWarnings::new(config.debounce(), config.retention()),
            }),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn WarningSink>) -> Self {
        self.sink = sink;
        self
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Dispatch a provider event
    pub fn handle(&self, event: &ModEvent) {
        let now = Utc::now();
        match event {
            ModEvent::Added { directory_id } => {
                self.on_added_at(directory_id, now);
            }
            ModEvent::Deleted { directory_id } => {
                self.on_deleted_at(directory_id, now);
            }
            ModEvent::Moved { old_id, new_id } => {
                self.on_moved_at(old_id, new_id, now);
            }
        }
    }

    pub fn on_added(&self, directory_id: &str) -> Option<ModCacheEntry> {
        self.on_added_at(directory_id, Utc::now())
    }

    /// Classify a newly added mod and cache it.
    ///
    /// A mod the catalog does not know about is ignored.
    pub fn on_added_at(&self, directory_id: &str, now: DateTime<Utc>) -> Option<ModCacheEntry> {
        let Some(descriptor) = find_in_catalog(self.provider.as_ref(), directory_id) else {
            tracing::debug!("Ignoring added mod '{}': not in catalog", directory_id);
            return None;
        };

        let items = changed_items_or_empty(self.provider.as_ref(), directory_id);
        let category = ModType::from_classification(&self.classifier.classify(&items));

        let entry = ModCacheEntry {
            directory_id: directory_id.to_string(),
            display_name: descriptor.display_name,
            category,
            last_updated: now,
        };

        let mut state = self.state();
        state.entries.insert(entry.directory_id.clone(), entry.clone());
        if let Err(e) = self
            .store
            .update_mod_cache(&entry.directory_id, &entry.display_name, entry.category)
        {
            tracing::warn!("Failed to persist cache entry for '{}': {:#}", directory_id, e);
        }

        tracing::info!("Cached '{}' as {}", entry.display_name, entry.category);
        Some(entry)
    }

    pub fn on_deleted(&self, directory_id: &str) -> Option<String> {
        self.on_deleted_at(directory_id, Utc::now())
    }

    /// Remove a deleted mod, warning once if designs still use it.
    ///
    /// Returns the warning text when one was emitted.
    pub fn on_deleted_at(&self, directory_id: &str, now: DateTime<Utc>) -> Option<String> {
        let references = self.designs.designs_referencing(directory_id).unwrap_or_else(|e| {
            tracing::warn!("Failed to look up designs using '{}': {:#}", directory_id, e);
            Vec::new()
        });

        let mut state = self.state();
        let pruned = state.warnings.prune(now);
        if pruned > 0 {
            tracing::debug!("Pruned {} old deletion warning record(s)", pruned);
        }

        let display_name = state
            .entries
            .get(directory_id)
            .map(|e| e.display_name.clone())
            .unwrap_or_else(|| directory_id.to_string());

        let warning = if !references.is_empty() && state.warnings.should_warn(directory_id, now) {
            let message = format_deletion_warning(&display_name, &references);
            self.sink.warn(directory_id, &message);
            Some(message)
        } else {
            None
        };

        state.entries.remove(directory_id);
        if let Err(e) = self.store.remove_from_mod_cache(directory_id) {
            tracing::warn!("Failed to remove cache entry for '{}': {:#}", directory_id, e);
        }

        warning
    }

    pub fn on_moved(&self, old_id: &str, new_id: &str) -> Option<ModCacheEntry> {
        self.on_moved_at(old_id, new_id, Utc::now())
    }

    /// Re-key a moved mod, keeping its category.
    ///
    /// The display name is refreshed from the catalog when possible. An
    /// unknown `old_id` is handled as an addition of `new_id`.
    pub fn on_moved_at(&self, old_id: &str, new_id: &str, now: DateTime<Utc>) -> Option<ModCacheEntry> {
        let refreshed_name = find_in_catalog(self.provider.as_ref(), new_id).map(|d| d.display_name);

        let mut state = self.state();
        let Some(previous) = state.entries.remove(old_id) else {
            drop(state);
            tracing::debug!("Moved mod '{}' was not cached, treating '{}' as added", old_id, new_id);
            return self.on_added_at(new_id, now);
        };

        let entry = ModCacheEntry {
            directory_id: new_id.to_string(),
            display_name: refreshed_name.unwrap_or(previous.display_name),
            category: previous.category,
            last_updated: now,
        };
        state.entries.insert(entry.directory_id.clone(), entry.clone());

        if let Err(e) = self
            .store
            .move_in_mod_cache(old_id, new_id, &entry.display_name, entry.category)
        {
            tracing::warn!("Failed to move cache entry '{}' -> '{}': {:#}", old_id, new_id, e);
        }

        tracing::info!("Moved '{}' -> '{}'", old_id, new_id);
        Some(entry)
    }

    pub fn category_of(&self, directory_id: &str) -> Option<ModType> {
        self.state().entries.get(directory_id).map(|e| e.category)
    }

    /// All cached entries, ordered by directory id
    pub fn entries(&self) -> Vec<ModCacheEntry> {
        let mut entries: Vec<_> = self.state().entries.values().cloned().collect();
        entries.sort_by(|a, b| a.directory_id.cmp(&b.directory_id));
        entries
    }

    pub fn warning_records(&self) -> Vec<DeletionWarningRecord> {
        self.state().warnings.records()
    }

    /// Replace the in-memory entries with the persisted ones
    pub fn load_from_store(&self) -> Result<usize> {
        let loaded = self.store.load_mod_cache()?;
        let mut state = self.state();
        state.entries = loaded
            .into_iter()
            .map(|e| (e.directory_id.clone(), e))
            .collect();
        Ok(state.entries.len())
    }

    /// Reconcile the cache with the provider catalog.
    ///
    /// Mods missing from the cache are added; cached mods the catalog no
    /// longer lists are removed. A faulting catalog leaves the cache untouched.
    pub fn sync_with_catalog(&self) -> SyncReport {
        let catalog = match self.provider.catalog() {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::warn!("Skipping cache sync, catalog unavailable: {}", e);
                return SyncReport::default();
            }
        };

        let installed: BTreeSet<&str> = catalog.iter().map(|m| m.directory_id.as_str()).collect();
        let cached: BTreeSet<String> = self.state().entries.keys().cloned().collect();

        let mut report = SyncReport::default();
        for id in cached.iter().filter(|id| !installed.contains(id.as_str())) {
            let mut state = self.state();
            state.entries.remove(id);
            if let Err(e) = self.store.remove_from_mod_cache(id) {
                tracing::warn!("Failed to remove stale cache entry '{}': {:#}", id, e);
            }
            report.removed.push(id.clone());
        }

        let now = Utc::now();
        for id in installed.into_iter().filter(|id| !cached.contains(*id)) {
            if self.on_added_at(id, now).is_some() {
                report.added.push(id.to_string());
            }
        }

        tracing::info!(
            "Cache sync: {} added, {} removed",
            report.added.len(),
            report.removed.len()
        );
        report
    }
}

/// One message naming every character/design that uses a deleted mod
pub fn format_deletion_warning(display_name: &str, references: &[DesignReference]) -> String {
    let mut grouped: BTreeMap<(&str, &str), Vec<&str>> = BTreeMap::new();
    for reference in references {
        grouped
            .entry((reference.character.as_str(), reference.design.as_str()))
            .or_default()
            .push(reference.slot.as_str());
    }

    let designs: Vec<String> = grouped
        .into_iter()
        .map(|((character, design), slots)| format!("{} / {} ({})", character, design, slots.join(", ")))
        .collect();

    format!(
        "Mod '{}' was deleted but is still used by {} design(s): {}",
        display_name,
        designs.len(),
        designs.join("; ")
    )
}
