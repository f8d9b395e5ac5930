//! Conflict and dependency analysis between selected mods

use super::assets::{is_hair_path, is_skin_texture, AssetKind, ChangedItem};
use super::classify::is_hair_customization;
use super::ModType;
use crate::provider::{changed_items_or_empty, ModProvider};
use serde::Serialize;
use std::collections::BTreeSet;

/// Missing half of a gear mod
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    /// Only models changed; textures must come from another mod
    NeedsTexture,
    /// Only textures changed; models must come from another mod
    NeedsModel,
}

impl DependencyKind {
    pub fn description(&self) -> &'static str {
        match self {
            DependencyKind::NeedsTexture => "model-only mod, needs a texture mod",
            DependencyKind::NeedsModel => "texture-only mod, needs a model mod",
        }
    }
}

/// Outcome of analysing one mod against the other selected mods
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConflictResult {
    pub has_dependency: bool,
    pub dependency_type: Option<DependencyKind>,
    pub has_conflicts: bool,
    pub conflicting_mods: BTreeSet<String>,
    pub conflicting_paths: BTreeSet<String>,
}

/// Changed items of one mod split into identifiers and normalized game paths
struct ModFootprint {
    identifiers: Vec<ChangedItem>,
    paths: BTreeSet<String>,
}

impl ModFootprint {
    fn load(provider: &dyn ModProvider, directory_id: &str) -> Self {
        let identifiers: Vec<ChangedItem> = changed_items_or_empty(provider, directory_id)
            .into_iter()
            .map(ChangedItem::new)
            .collect();
        let paths = identifiers
            .iter()
            .filter_map(|item| item.game_path().map(str::to_string))
            .collect();
        Self { identifiers, paths }
    }

    fn is_hair_mod(&self) -> bool {
        self.identifiers.iter().any(|item| {
            is_hair_customization(&item.identifier)
                || item.game_path().is_some_and(is_hair_path)
        })
    }

    fn path_kinds(&self) -> impl Iterator<Item = AssetKind> + '_ {
        self.identifiers
            .iter()
            .filter(|item| item.is_path())
            .map(|item| item.kind)
    }
}

/// Detects path-level conflicts and model/texture dependency gaps
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictDependencyAnalyzer;

impl ConflictDependencyAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Analyze `mod_directory` against every other mod in `selected_mods`.
    ///
    /// Provider faults count as "no changed items" for the affected mod.
    pub fn analyze(
        &self,
        provider: &dyn ModProvider,
        mod_directory: &str,
        mod_type: ModType,
        selected_mods: &[String],
    ) -> ConflictResult {
        let mut result = ConflictResult::default();
        let footprint = ModFootprint::load(provider, mod_directory);

        if matches!(mod_type, ModType::Gear | ModType::Accessory) {
            result.dependency_type = dependency_of(&footprint);
            result.has_dependency = result.dependency_type.is_some();
        }

        for other_id in selected_mods {
            if other_id == mod_directory {
                continue;
            }
            let other = ModFootprint::load(provider, other_id);
            let mut overlap: BTreeSet<String> =
                footprint.paths.intersection(&other.paths).cloned().collect();

            if mod_type == ModType::Hair && other.is_hair_mod() {
                overlap.retain(|path| !is_skin_texture(path));
            }

            if !overlap.is_empty() {
                tracing::debug!(
                    "'{}' conflicts with '{}' on {} path(s)",
                    mod_directory,
                    other_id,
                    overlap.len()
                );
                result.conflicting_mods.insert(other_id.clone());
                result.conflicting_paths.extend(overlap);
            }
        }

        result.has_conflicts = !result.conflicting_mods.is_empty();
        result
    }
}

/// A dependency exists only when every changed path is a model, or every one
/// is a texture. Materials and other files count against both.
fn dependency_of(footprint: &ModFootprint) -> Option<DependencyKind> {
    let kinds: Vec<AssetKind> = footprint.path_kinds().collect();
    if kinds.is_empty() {
        return None;
    }
    if kinds.iter().all(|k| *k == AssetKind::Model) {
        Some(DependencyKind::NeedsTexture)
    } else if kinds.iter().all(|k| *k == AssetKind::Texture) {
        Some(DependencyKind::NeedsModel)
    } else {
        None
    }
}

/// Format a conflict result for display
pub fn format_conflict_result(mod_directory: &str, result: &ConflictResult) -> String {
    let mut lines = Vec::new();

    if let Some(dependency) = result.dependency_type {
        lines.push(format!("Dependency: {} ({})", mod_directory, dependency.description()));
    }

    if !result.has_conflicts {
        lines.push(format!("No conflicts for {}", mod_directory));
        return lines.join("\n");
    }

    lines.push(format!(
        "Conflict: {} vs {} ({} paths)",
        mod_directory,
        result
            .conflicting_mods
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", "),
        result.conflicting_paths.len()
    ));

    // Show first few paths
    for path in result.conflicting_paths.iter().take(5) {
        lines.push(format!("  - {}", path));
    }
    if result.conflicting_paths.len() > 5 {
        lines.push(format!("  ... and {} more", result.conflicting_paths.len() - 5));
    }

    lines.join("\n")
}
