//! Game-path helpers and asset kinds for changed items

use serde::{Deserialize, Serialize};

/// Kind of asset a changed item points at, decided once from its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Model,
    Texture,
    Material,
    Vfx,
    Animation,
    Unknown,
}

impl AssetKind {
    /// Classify a path by its file extension
    pub fn from_path(path: &str) -> Self {
        let Some(ext) = file_extension(path) else {
            return AssetKind::Unknown;
        };
        match ext.as_str() {
            "mdl" => AssetKind::Model,
            "tex" | "atex" | "dds" | "png" => AssetKind::Texture,
            "mtrl" => AssetKind::Material,
            "avfx" => AssetKind::Vfx,
            "pap" | "tmb" => AssetKind::Animation,
            _ => AssetKind::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Model => "model",
            AssetKind::Texture => "texture",
            AssetKind::Material => "material",
            AssetKind::Vfx => "vfx",
            AssetKind::Animation => "animation",
            AssetKind::Unknown => "unknown",
        }
    }

    pub fn is_model_or_texture(&self) -> bool {
        matches!(self, AssetKind::Model | AssetKind::Texture)
    }
}

/// A changed-item identifier together with what it was decided to be
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangedItem {
    pub identifier: String,
    pub kind: AssetKind,
    game_path: Option<String>,
}

impl ChangedItem {
    pub fn new(identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        let game_path = looks_like_game_path(&identifier).then(|| normalize_game_path(&identifier));
        let kind = match &game_path {
            Some(path) => AssetKind::from_path(path),
            None => AssetKind::Unknown,
        };
        Self {
            identifier,
            kind,
            game_path,
        }
    }

    /// Normalized game path, if the identifier is a path rather than an item name
    pub fn game_path(&self) -> Option<&str> {
        self.game_path.as_deref()
    }

    pub fn is_path(&self) -> bool {
        self.game_path.is_some()
    }
}

/// Lowercase, forward-slash form used for every path comparison
pub fn normalize_game_path(path: &str) -> String {
    path.trim().replace('\\', "/").to_lowercase()
}

/// Extension of the last path component, lowercased
pub fn file_extension(path: &str) -> Option<String> {
    let name = path.rsplit(['/', '\\']).next()?;
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || !is_extension_like(ext) {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Whether a single path component ends in a file extension
pub fn has_file_extension(component: &str) -> bool {
    match component.rsplit_once('.') {
        Some((stem, ext)) => !stem.is_empty() && is_extension_like(ext),
        None => false,
    }
}

fn is_extension_like(ext: &str) -> bool {
    (1..=5).contains(&ext.len())
        && ext.chars().all(|c| c.is_ascii_alphanumeric())
        && ext.chars().any(|c| c.is_ascii_alphabetic())
}

/// Whether an identifier is a game path (`dir/.../file.ext`) rather than an item name
pub fn looks_like_game_path(identifier: &str) -> bool {
    let trimmed = identifier.trim();
    (trimmed.contains('/') || trimmed.contains('\\'))
        && !trimmed.contains(':')
        && file_extension(trimmed).is_some()
}

/// Path prefixes whose models and textures show up on the rendered character.
/// A `None` segment accepts any path under the prefix.
const VISIBLE_PATHS: &[(&str, Option<&str>)] = &[
    ("chara/equipment/", None),
    ("chara/accessory/", None),
    ("chara/weapon/", None),
    ("chara/human/", Some("/obj/hair/")),
    ("chara/human/", Some("/obj/face/")),
    ("chara/human/", Some("/obj/body/")),
    ("chara/human/", Some("/obj/tail/")),
    ("chara/human/", Some("/obj/zear/")),
    ("chara/common/texture/", None),
];

/// Whether a game path is a visible model or texture
pub fn is_visible_path(path: &str) -> bool {
    let normalized = normalize_game_path(path);
    if !AssetKind::from_path(&normalized).is_model_or_texture() {
        return false;
    }
    VISIBLE_PATHS.iter().any(|(prefix, segment)| {
        normalized.starts_with(prefix) && segment.map_or(true, |s| normalized.contains(s))
    })
}

/// Whether a game path is a skin texture
pub fn is_skin_texture(path: &str) -> bool {
    let normalized = normalize_game_path(path);
    if AssetKind::from_path(&normalized) != AssetKind::Texture {
        return false;
    }
    let file_name = normalized.rsplit('/').next().unwrap_or_default();
    normalized.contains("/obj/body/") || normalized.contains("/skin/") || file_name.contains("skin")
}

/// Whether a game path lives under a hair directory
pub fn is_hair_path(path: &str) -> bool {
    normalize_game_path(path).contains("/hair/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_kind_from_extension() {
        assert_eq!(AssetKind::from_path("chara/equipment/e0100/model/c0101e0100_met.mdl"), AssetKind::Model);
        assert_eq!(AssetKind::from_path("chara/equipment/e0100/texture/v01_c0101e0100_met_n.TEX"), AssetKind::Texture);
        assert_eq!(AssetKind::from_path("chara/equipment/e0100/material/v0001/mt_c0101e0100_met_a.mtrl"), AssetKind::Material);
        assert_eq!(AssetKind::from_path("vfx/common/eff/cmfx_ok1.avfx"), AssetKind::Vfx);
        assert_eq!(AssetKind::from_path("chara/human/c0101/animation/a0001/bt_common/emote/pose01.pap"), AssetKind::Animation);
        assert_eq!(AssetKind::from_path("Heavy Plate Helm"), AssetKind::Unknown);
    }

    #[test]
    fn test_changed_item_decides_path_once() {
        let item = ChangedItem::new("Chara\\Equipment\\e0100\\model\\c0101e0100_top.mdl");
        assert!(item.is_path());
        assert_eq!(item.game_path(), Some("chara/equipment/e0100/model/c0101e0100_top.mdl"));
        assert_eq!(item.kind, AssetKind::Model);

        let item = ChangedItem::new("Customization: Hyur Midlander Male Hair 3");
        assert!(!item.is_path());
        assert_eq!(item.kind, AssetKind::Unknown);
    }

    #[test]
    fn test_version_numbers_are_not_extensions() {
        assert!(!has_file_extension("Cool Mod v1.2"));
        assert!(has_file_extension("c0101h0003_hir.mdl"));
        assert!(!has_file_extension(".hidden"));
    }

    #[test]
    fn test_visible_paths() {
        assert!(is_visible_path("chara/equipment/e0100/model/c0101e0100_met.mdl"));
        assert!(is_visible_path("chara/human/c0101/obj/hair/h0003/texture/c0101h0003_hir_n.tex"));
        assert!(!is_visible_path("chara/human/c0101/obj/hair/h0003/material/v0001/mt_c0101h0003_hir_a.mtrl"));
        assert!(!is_visible_path("chara/human/c0101/animation/a0001/bt_common/emote/pose01.pap"));
        assert!(!is_visible_path("bgcommon/hou/indoor/general/0001/bgparts/fun_b0_m0001.mdl"));
    }

    #[test]
    fn test_skin_and_hair_paths() {
        assert!(is_skin_texture("chara/human/c0101/obj/body/b0001/texture/c0101b0001_d.tex"));
        assert!(!is_skin_texture("chara/human/c0101/obj/body/b0001/model/c0101b0001_top.mdl"));
        assert!(is_hair_path("chara/human/c0101/obj/hair/h0003/model/c0101h0003_hir.mdl"));
        assert!(!is_hair_path("chara/equipment/e0100/model/c0101e0100_met.mdl"));
    }
}
