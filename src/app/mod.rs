//! Engine wiring and the caller-facing API

mod actions;

pub use actions::parse_option_group;

use crate::config::Config;
use crate::db::Database;
use crate::lifecycle::ModLifecycleCache;
use crate::mods::{ClassificationResult, ConflictDependencyAnalyzer, ConflictResult, ItemIdentifierClassifier, ModType};
use crate::options::OptionApplier;
use crate::provider::{ModEvent, ModProvider};
use crate::resolve::{AffectingMods, AffectingModsResolver};

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Main engine struct that owns every component
///
/// Components receive their collaborators at construction; nothing is
/// looked up from global state.
pub struct Engine {
    /// Application configuration
    pub config: Config,

    /// Mod provider all evidence comes from
    pub provider: Arc<dyn ModProvider>,

    /// Persistent store
    pub db: Arc<Database>,

    classifier: ItemIdentifierClassifier,
    resolver: AffectingModsResolver,
    analyzer: ConflictDependencyAnalyzer,
    lifecycle: ModLifecycleCache,
    options: OptionApplier,
}

impl Engine {
    /// Build an engine over an already opened database
    pub fn new(config: Config, provider: Arc<dyn ModProvider>, db: Arc<Database>) -> Self {
        let lifecycle = ModLifecycleCache::new(provider.clone(), db.clone(), db.clone(), &config.lifecycle);
        let options = OptionApplier::new(provider.clone(), &config.options);

        Self {
            classifier: ItemIdentifierClassifier::new(),
            resolver: AffectingModsResolver::new(&config),
            analyzer: ConflictDependencyAnalyzer::new(),
            lifecycle,
            options,
            config,
            provider,
            db,
        }
    }

    /// Open the on-disk database and restore the persisted mod cache
    pub fn open(config: Config, provider: Arc<dyn ModProvider>) -> Result<Self> {
        config
            .paths
            .ensure_dirs()
            .context("Failed to create directories")?;

        let db = Database::open(&config.paths.database_file()).context("Failed to open database")?;
        let engine = Self::new(config, provider, Arc::new(db));

        let restored = engine.lifecycle.load_from_store()?;
        tracing::debug!("Restored {} cached mod(s)", restored);
        Ok(engine)
    }

    /// Classify a set of changed-item identifiers
    pub fn analyze_mod<I, S>(&self, identifiers: I) -> ClassificationResult
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.classifier.classify(identifiers)
    }

    /// Enabled mods currently affecting the player.
    ///
    /// `None` falls back to the configured default collection.
    pub fn currently_affecting_mods(&self, collection_id: Option<&str>) -> BTreeSet<String> {
        self.resolve_affecting(collection_id).mods
    }

    /// Like [`currently_affecting_mods`](Self::currently_affecting_mods), with the tier that answered
    pub fn resolve_affecting(&self, collection_id: Option<&str>) -> AffectingMods {
        let collection = collection_id.or(self.config.default_collection.as_deref());
        self.resolver.resolve_detailed(self.provider.as_ref(), collection)
    }

    pub fn analyze_for_conflicts(
        &self,
        mod_directory: &str,
        mod_type: ModType,
        selected_mods: &[String],
    ) -> ConflictResult {
        self.analyzer
            .analyze(self.provider.as_ref(), mod_directory, mod_type, selected_mods)
    }

    /// Cached category of a mod.
    ///
    /// Only reads the cache; events and [`ModLifecycleCache::sync_with_catalog`] fill it.
    pub fn category_of(&self, directory_id: &str) -> Option<ModType> {
        self.lifecycle.category_of(directory_id)
    }

    pub fn handle_event(&self, event: &ModEvent) {
        self.lifecycle.handle(event);
    }

    pub fn lifecycle(&self) -> &ModLifecycleCache {
        &self.lifecycle
    }

    pub fn resolver(&self) -> &AffectingModsResolver {
        &self.resolver
    }

    pub fn options(&self) -> &OptionApplier {
        &self.options
    }
}
