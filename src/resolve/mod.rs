//! Which installed mods currently affect the player
//!
//! Three evidence sources are tried in order, falling through only when a
//! tier produces nothing:
//!
//! 1. Resource trees of loaded objects, decoded into names and fuzzy-matched
//!    against the catalog
//! 2. The player's resolved-path table intersected with each mod's paths
//! 3. A priority heuristic over visible model/texture paths
//!
//! Provider faults are contained per tier; a faulting tier yields nothing.

mod matcher;
mod tree;

pub use matcher::*;
pub use tree::*;

use crate::config::Config;
use crate::mods::assets::{is_visible_path, normalize_game_path};
use crate::mods::ChangedItem;
use crate::provider::{changed_items_or_empty, enabled_catalog, ModDescriptor, ModProvider};
use serde::Serialize;
use std::collections::BTreeSet;

/// Evidence tier that produced an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionTier {
    ResourceTree,
    LoadedPaths,
    PriorityHeuristic,
}

impl ResolutionTier {
    pub fn display_name(&self) -> &'static str {
        match self {
            ResolutionTier::ResourceTree => "resource tree",
            ResolutionTier::LoadedPaths => "loaded paths",
            ResolutionTier::PriorityHeuristic => "priority heuristic",
        }
    }
}

/// Affecting mods plus the tier that found them
///
/// `tier` is `None` when every tier came up empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AffectingMods {
    pub mods: BTreeSet<String>,
    pub tier: Option<ResolutionTier>,
}

/// Three-tier affecting-mods pipeline
#[derive(Debug, Clone)]
pub struct AffectingModsResolver {
    extractor: ResourceTreeModExtractor,
    matcher: FuzzyModMatcher,
    player_object_id: u32,
    visible_scan_limit: usize,
}

impl Default for AffectingModsResolver {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl AffectingModsResolver {
    pub fn new(config: &Config) -> Self {
        Self {
            extractor: ResourceTreeModExtractor::new(&config.extractor),
            matcher: FuzzyModMatcher::new(&config.matcher),
            player_object_id: config.player_object_id,
            visible_scan_limit: config.resolver.visible_scan_limit,
        }
    }

    /// Use a customised extractor, e.g. one with a stricter acceptance predicate
    pub fn with_extractor(mut self, extractor: ResourceTreeModExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn matcher(&self) -> &FuzzyModMatcher {
        &self.matcher
    }

    pub fn extractor(&self) -> &ResourceTreeModExtractor {
        &self.extractor
    }

    /// Directory ids of enabled mods affecting the player
    pub fn resolve(&self, provider: &dyn ModProvider, collection_id: Option<&str>) -> BTreeSet<String> {
        self.resolve_detailed(provider, collection_id).mods
    }

    pub fn resolve_detailed(&self, provider: &dyn ModProvider, collection_id: Option<&str>) -> AffectingMods {
        let catalog = enabled_catalog(provider, collection_id);
        if catalog.is_empty() {
            tracing::debug!("No enabled mods, nothing can affect the player");
            return AffectingMods::default();
        }

        let tiers: [(ResolutionTier, &dyn Fn() -> BTreeSet<String>); 3] = [
            (ResolutionTier::ResourceTree, &|| self.from_resource_trees(provider, &catalog)),
            (ResolutionTier::LoadedPaths, &|| self.from_loaded_paths(provider, &catalog)),
            (ResolutionTier::PriorityHeuristic, &|| self.from_priority(provider, &catalog)),
        ];

        for (tier, run) in tiers {
            let mods = run();
            if !mods.is_empty() {
                tracing::info!("Found {} affecting mod(s) via {}", mods.len(), tier.display_name());
                return AffectingMods {
                    mods,
                    tier: Some(tier),
                };
            }
            tracing::debug!("Tier '{}' found nothing, falling through", tier.display_name());
        }

        AffectingMods::default()
    }

    fn from_resource_trees(&self, provider: &dyn ModProvider, catalog: &[ModDescriptor]) -> BTreeSet<String> {
        let trees = match provider.loaded_resource_trees() {
            Ok(trees) => trees,
            Err(e) => {
                tracing::warn!("Failed to read resource trees: {}", e);
                return BTreeSet::new();
            }
        };

        self.extractor
            .extract_candidates(&trees)
            .iter()
            .filter_map(|candidate| {
                let resolved = self.matcher.resolve(candidate, catalog);
                if resolved.is_none() {
                    tracing::debug!("Unresolved candidate '{}'", candidate);
                }
                resolved
            })
            .collect()
    }

    fn from_loaded_paths(&self, provider: &dyn ModProvider, catalog: &[ModDescriptor]) -> BTreeSet<String> {
        let table = match provider.resolved_paths(self.player_object_id) {
            Ok(table) => table,
            Err(e) => {
                tracing::warn!("Failed to read resolved paths for object {}: {}", self.player_object_id, e);
                return BTreeSet::new();
            }
        };

        let mut overridden = BTreeSet::new();
        for (actual, game_paths) in &table {
            let actual = normalize_game_path(actual);
            for game in game_paths {
                let game = normalize_game_path(game);
                if game != actual {
                    overridden.insert(game);
                }
            }
        }
        if overridden.is_empty() {
            return BTreeSet::new();
        }

        catalog
            .iter()
            .filter(|entry| {
                changed_items_or_empty(provider, &entry.directory_id)
                    .into_iter()
                    .map(ChangedItem::new)
                    .any(|item| item.game_path().is_some_and(|path| overridden.contains(path)))
            })
            .map(|entry| entry.directory_id.clone())
            .collect()
    }

    fn from_priority(&self, provider: &dyn ModProvider, catalog: &[ModDescriptor]) -> BTreeSet<String> {
        catalog
            .iter()
            .filter(|entry| entry.priority > 0)
            .filter(|entry| {
                changed_items_or_empty(provider, &entry.directory_id)
                    .into_iter()
                    .map(ChangedItem::new)
                    .filter_map(|item| item.game_path().map(str::to_string))
                    .take(self.visible_scan_limit)
                    .any(|path| is_visible_path(&path))
            })
            .map(|entry| entry.directory_id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{MockModProvider, ProviderError, ResolvedPaths, ResourceTreeNode};
    use std::collections::HashMap;

    const HELM: &str = "chara/equipment/e0100/model/c0101e0100_met.mdl";
    const BOOTS: &str = "chara/equipment/e0200/model/c0101e0200_sho.mdl";
    const GLOVES: &str = "chara/equipment/e0300/texture/v01_c0101e0300_glv_d.tex";

    fn catalog() -> Vec<ModDescriptor> {
        vec![
            ModDescriptor::new("A", "Crimson Helm"),
            ModDescriptor::new("B", "Eorzean Leather Boots"),
            ModDescriptor::new("C", "Velvet Gloves").with_state(true, 5),
        ]
    }

    fn items(id: &str) -> Result<BTreeSet<String>, ProviderError> {
        let paths: &[&str] = match id {
            "A" => &[HELM],
            "B" => &[BOOTS, "Leather Boots"],
            "C" => &[GLOVES],
            _ => return Err(ProviderError::NotFound(id.to_string())),
        };
        Ok(paths.iter().map(|s| s.to_string()).collect())
    }

    fn resolved(pairs: &[(&str, &str)]) -> ResolvedPaths {
        let mut table = ResolvedPaths::new();
        for (actual, game) in pairs {
            table
                .entry(actual.to_string())
                .or_default()
                .insert(game.to_string());
        }
        table
    }

    fn base_provider() -> MockModProvider {
        let mut provider = MockModProvider::new();
        provider.expect_catalog().times(1).returning(|| Ok(catalog()));
        provider.expect_mod_settings().returning(|_| Err(ProviderError::Unavailable("no collections".into())));
        provider
    }

    #[test]
    fn test_resource_tree_tier_wins() {
        let mut provider = base_provider();
        provider.expect_loaded_resource_trees().returning(|| {
            Ok(vec![ResourceTreeNode::new(Some("C:/Penumbra/Crimson Helm v2/chara/x.mdl"), Some(HELM))])
        });
        provider.expect_resolved_paths().never();

        let result = AffectingModsResolver::default().resolve_detailed(&provider, None);
        assert_eq!(result.tier, Some(ResolutionTier::ResourceTree));
        assert_eq!(result.mods, BTreeSet::from(["A".to_string()]));
    }

    #[test]
    fn test_loaded_paths_tier_skips_priority_scan() {
        let mut provider = base_provider();
        // Tree decodes to a name nothing in the catalog matches
        provider.expect_loaded_resource_trees().returning(|| {
            Ok(vec![ResourceTreeNode::new(Some("C:/Penumbra/Unknown Thing/chara/x.mdl"), Some(HELM))])
        });
        provider
            .expect_resolved_paths()
            .with(mockall::predicate::eq(0))
            .returning(|_| {
                Ok(resolved(&[
                    ("C:/Penumbra/Unknown Thing/chara/x.mdl", HELM),
                    ("C:/Penumbra/Boots/y.mdl", BOOTS),
                    (GLOVES, GLOVES),
                ]))
            });
        // One lookup per enabled mod in tier 2; a priority scan would add more
        provider.expect_changed_items().times(3).returning(items);

        let result = AffectingModsResolver::default().resolve_detailed(&provider, None);
        assert_eq!(result.tier, Some(ResolutionTier::LoadedPaths));
        assert_eq!(result.mods, BTreeSet::from(["A".to_string(), "B".to_string()]));
    }

    #[test]
    fn test_priority_tier_is_last_resort() {
        let mut provider = base_provider();
        provider
            .expect_loaded_resource_trees()
            .returning(|| Err(ProviderError::Timeout("GetResourceTrees".into())));
        provider
            .expect_resolved_paths()
            .returning(|_| Err(ProviderError::Unavailable("ipc down".into())));
        provider.expect_changed_items().returning(items);

        let result = AffectingModsResolver::default().resolve_detailed(&provider, None);
        assert_eq!(result.tier, Some(ResolutionTier::PriorityHeuristic));
        assert_eq!(result.mods, BTreeSet::from(["C".to_string()]));
    }

    #[test]
    fn test_collection_settings_limit_candidates() {
        let mut provider = MockModProvider::new();
        provider.expect_catalog().returning(|| Ok(catalog()));
        provider.expect_mod_settings().returning(|_| {
            let mut settings = HashMap::new();
            settings.insert("B".to_string(), crate::provider::ModSettings { enabled: true, priority: 0 });
            Ok(settings)
        });
        provider.expect_loaded_resource_trees().returning(|| {
            Ok(vec![ResourceTreeNode::new(Some("C:/Penumbra/Crimson Helm/chara/x.mdl"), Some(HELM))])
        });
        provider.expect_resolved_paths().returning(|_| Ok(ResolvedPaths::new()));
        provider.expect_changed_items().returning(items);

        // "A" is disabled in the collection, so its tree evidence resolves to nothing
        let result = AffectingModsResolver::default().resolve_detailed(&provider, Some("Default"));
        assert_eq!(result, AffectingMods::default());
    }

    #[test]
    fn test_catalog_fault_yields_empty_answer() {
        let mut provider = MockModProvider::new();
        provider
            .expect_catalog()
            .returning(|| Err(ProviderError::Unavailable("not loaded".into())));
        provider.expect_loaded_resource_trees().never();

        assert!(AffectingModsResolver::default().resolve(&provider, None).is_empty());
    }
}
