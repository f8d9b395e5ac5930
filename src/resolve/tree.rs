//! Candidate mod names from resource trees
//!
//! A resource tree maps nominal game paths to the files that currently supply
//! them. When a node is redirected to a file on disk, the on-disk location
//! usually carries the mod's folder name; this module decodes it.

use crate::config::ExtractorConfig;
use crate::mods::assets::{has_file_extension, normalize_game_path};
use crate::provider::ResourceTreeNode;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

/// Directories of the game's own content layout; reaching one means the path
/// carries no mod folder.
const GAME_CONTENT_DIRS: &[&str] = &["chara", "common", "shader", "bgcommon", "vfx"];

/// Directories that hold a user name as their next component
const USER_ROOT_DIRS: &[&str] = &["users", "home"];

/// Decides whether a decoded label is worth matching
pub type LabelAcceptance = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Depth-first, parent-before-children traversal with an explicit stack
pub struct DepthFirst<'a> {
    stack: Vec<&'a ResourceTreeNode>,
}

impl<'a> DepthFirst<'a> {
    pub fn new(root: &'a ResourceTreeNode) -> Self {
        Self { stack: vec![root] }
    }
}

impl<'a> Iterator for DepthFirst<'a> {
    type Item = &'a ResourceTreeNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // Reversed so the first child is visited first
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Whether a node's file is redirected away from its game path
pub fn is_redirected(node: &ResourceTreeNode) -> bool {
    match (&node.actual_path, &node.game_path) {
        (Some(actual), Some(game)) => normalize_game_path(actual) != normalize_game_path(game),
        (Some(actual), None) => !actual.trim().is_empty(),
        (None, _) => false,
    }
}

/// Rejects labels that are too short or purely numeric
pub fn default_acceptance(label: &str) -> bool {
    label.chars().count() >= 2 && !label.chars().all(|c| c.is_ascii_digit())
}

/// Decodes human-readable mod labels out of resource-tree actual paths
#[derive(Clone)]
pub struct ResourceTreeModExtractor {
    mods_root_tokens: Vec<String>,
    system_dirs: HashSet<String>,
    accept: LabelAcceptance,
}

impl Default for ResourceTreeModExtractor {
    fn default() -> Self {
        Self::new(&ExtractorConfig::default())
    }
}

impl std::fmt::Debug for ResourceTreeModExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceTreeModExtractor")
            .field("mods_root_tokens", &self.mods_root_tokens)
            .field("system_dirs", &self.system_dirs)
            .finish_non_exhaustive()
    }
}

impl ResourceTreeModExtractor {
    pub fn new(config: &ExtractorConfig) -> Self {
        Self {
            mods_root_tokens: config.mods_root_tokens.iter().map(|t| t.to_lowercase()).collect(),
            system_dirs: config.system_dirs.iter().map(|d| d.to_lowercase()).collect(),
            accept: Arc::new(default_acceptance),
        }
    }

    /// Replace the label acceptance predicate
    pub fn with_acceptance<F>(mut self, accept: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.accept = Arc::new(accept);
        self
    }

    /// Candidate names from every redirected node of one tree
    pub fn extract_candidate_names(&self, tree: &ResourceTreeNode) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        for node in DepthFirst::new(tree) {
            if !is_redirected(node) {
                continue;
            }
            let Some(actual) = node.actual_path.as_deref() else {
                continue;
            };
            match self.decode_label(actual) {
                Some(label) => {
                    names.insert(label);
                }
                None => tracing::trace!("No mod label in '{}'", actual),
            }
        }
        names
    }

    /// Candidate names across several trees
    pub fn extract_candidates(&self, trees: &[ResourceTreeNode]) -> BTreeSet<String> {
        trees
            .iter()
            .flat_map(|tree| self.extract_candidate_names(tree))
            .collect()
    }

    /// Decode a mod label from a single on-disk path
    pub fn decode_label(&self, actual_path: &str) -> Option<String> {
        let path = actual_path.trim();

        let label = if path.starts_with('[') {
            bracketed_label(path)
        } else {
            let components: Vec<&str> = path
                .split(['/', '\\'])
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .collect();
            match self.mods_root_position(&components) {
                Some(root) => label_after(&components, root),
                None => self.first_meaningful_component(&components),
            }
        }?;

        (self.accept)(label.as_str()).then_some(label)
    }

    /// Innermost mods-root component; `mods/penumbra/<mod>` resolves on `penumbra`
    fn mods_root_position(&self, components: &[&str]) -> Option<usize> {
        components
            .iter()
            .rposition(|c| self.mods_root_tokens.contains(&c.to_lowercase()))
    }

    fn first_meaningful_component(&self, components: &[&str]) -> Option<String> {
        let mut iter = components.iter();
        while let Some(component) = iter.next() {
            let lower = component.to_lowercase();
            if lower.ends_with(':') {
                continue;
            }
            if self.system_dirs.contains(&lower) {
                if USER_ROOT_DIRS.contains(&lower.as_str()) {
                    iter.next();
                }
                continue;
            }
            if GAME_CONTENT_DIRS.contains(&lower.as_str()) || has_file_extension(component) {
                return None;
            }
            return Some(component.to_string());
        }
        None
    }
}

/// The folder right under a mods root. A file there carries no mod name.
fn label_after(components: &[&str], root: usize) -> Option<String> {
    components
        .get(root + 1)
        .filter(|next| !has_file_extension(next))
        .map(|next| next.to_string())
}

fn bracketed_label(path: &str) -> Option<String> {
    let end = path.find(['|', '/', '\\']).unwrap_or(path.len());
    let label = path[..end].trim();
    (!label.is_empty()).then(|| label.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redirected(actual: &str, game: &str) -> ResourceTreeNode {
        ResourceTreeNode::new(Some(actual), Some(game))
    }

    #[test]
    fn test_bracketed_label() {
        let extractor = ResourceTreeModExtractor::default();
        assert_eq!(
            extractor.decode_label("[Hair] Sleek Ponytail | Long | Black/chara/human/c0101/obj/hair/h0003/model/c0101h0003_hir.mdl"),
            Some("[Hair] Sleek Ponytail".to_string())
        );
    }

    #[test]
    fn test_label_after_mods_root() {
        let extractor = ResourceTreeModExtractor::default();
        assert_eq!(
            extractor.decode_label("C:\\Users\\kiri\\Penumbra\\Eorzean Leather Boots\\chara\\equipment\\e0100\\model\\c0101e0100_sho.mdl"),
            Some("Eorzean Leather Boots".to_string())
        );
        assert_eq!(
            extractor.decode_label("/mnt/games/Penumbra Mods/Bibo Plus/chara/human/c0201/obj/body/b0001/texture/c0201b0001_d.tex"),
            Some("Bibo Plus".to_string())
        );
    }

    #[test]
    fn test_file_under_mods_root_has_no_label() {
        let extractor = ResourceTreeModExtractor::default();
        assert_eq!(extractor.decode_label("C:/Users/kiri/Penumbra/c0101e0100_met.mdl"), None);
        assert_eq!(extractor.decode_label("C:/Users/kiri/Penumbra"), None);
    }

    #[test]
    fn test_innermost_mods_root_wins() {
        let extractor = ResourceTreeModExtractor::default();
        assert_eq!(
            extractor.decode_label("/home/kiri/mods/penumbra/Cool Mod/chara/human/c0101/obj/hair/h0003/model/c0101h0003_hir.mdl"),
            Some("Cool Mod".to_string())
        );
    }

    #[test]
    fn test_system_directory_walk() {
        let extractor = ResourceTreeModExtractor::default();
        assert_eq!(
            extractor.decode_label("D:/Users/kiri/Documents/Witch Cosmetics/chara/human/c0101/obj/face/f0001/texture/c0101f0001_fac_d.tex"),
            Some("Witch Cosmetics".to_string())
        );
        // The game's own content layout carries no mod name
        assert_eq!(
            extractor.decode_label("chara/equipment/e0100/model/c0101e0100_met.mdl"),
            None
        );
        assert_eq!(extractor.decode_label("D:/Users/kiri/c0101e0100_met.mdl"), None);
    }

    #[test]
    fn test_acceptance_predicate() {
        let extractor = ResourceTreeModExtractor::default();
        assert_eq!(extractor.decode_label("/home/kiri/12345/chara/x.mdl"), None);

        let strict = ResourceTreeModExtractor::default().with_acceptance(|label| label.starts_with('['));
        assert_eq!(
            strict.decode_label("C:/Users/kiri/Penumbra/Witch Cosmetics/chara/x.tex"),
            None
        );
        assert_eq!(strict.decode_label("[X] Name/chara/x.tex"), Some("[X] Name".to_string()));
    }

    #[test]
    fn test_only_redirected_nodes_are_decoded() {
        let tree = ResourceTreeNode::new(None, Some("chara/human/c0101/obj/body/b0001/model/c0101b0001_top.mdl"))
            .with_children(vec![
                // Vanilla file served from its own game path
                redirected(
                    "chara/human/c0101/obj/body/b0001/texture/c0101b0001_d.tex",
                    "Chara\\Human\\c0101\\obj\\body\\b0001\\texture\\c0101b0001_d.tex",
                ),
                redirected(
                    "C:/Users/kiri/Penumbra/Bibo Plus/chara/human/c0101/obj/body/b0001/texture/c0101b0001_d.tex",
                    "chara/human/c0101/obj/body/b0001/texture/c0101b0001_d.tex",
                )
                .with_children(vec![ResourceTreeNode::new(
                    Some("[Hair] Sleek Ponytail | Long/chara/human/c0101/obj/hair/h0003/model/c0101h0003_hir.mdl"),
                    None,
                )]),
            ]);

        let names = ResourceTreeModExtractor::default().extract_candidate_names(&tree);
        let expected: BTreeSet<String> = ["Bibo Plus", "[Hair] Sleek Ponytail"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_undecodable_node_does_not_stop_traversal() {
        let tree = redirected("D:/Users/kiri/c0101e0100_met.mdl", "chara/a.mdl").with_children(vec![
            redirected("C:/Penumbra/Witch Cosmetics/chara/b.tex", "chara/b.tex"),
        ]);
        let names = ResourceTreeModExtractor::default().extract_candidate_names(&tree);
        assert!(names.contains("Witch Cosmetics"));
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn test_depth_first_parent_before_children() {
        let tree = ResourceTreeNode::new(Some("root"), None).with_children(vec![
            ResourceTreeNode::new(Some("a"), None).with_children(vec![ResourceTreeNode::new(Some("a1"), None)]),
            ResourceTreeNode::new(Some("b"), None),
        ]);
        let order: Vec<_> = DepthFirst::new(&tree)
            .filter_map(|n| n.actual_path.as_deref())
            .collect();
        assert_eq!(order, vec!["root", "a", "a1", "b"]);
    }

    #[test]
    fn test_deep_tree_traversal() {
        let mut tree = redirected("C:/Penumbra/Deep Mod/chara/leaf.tex", "chara/leaf.tex");
        for depth in 0..2_000 {
            tree = ResourceTreeNode::new(None, Some(format!("chara/level{}.mdl", depth).as_str())).with_children(vec![tree]);
        }
        assert_eq!(DepthFirst::new(&tree).count(), 2_001);

        let names = ResourceTreeModExtractor::default().extract_candidate_names(&tree);
        assert!(names.contains("Deep Mod"));
    }
}
