//! Mod analysis - classification, asset kinds and conflict detection

pub mod assets;
pub mod classify;
mod conflicts;

pub use assets::{AssetKind, ChangedItem};
pub use classify::{classify, ClassificationResult, ItemIdentifierClassifier};
pub use conflicts::*;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Category a mod is filed under
///
/// Derived from a [`ClassificationResult`]; the lifecycle cache stores it per
/// mod directory and the conflict analyzer uses it to pick its rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModType {
    Gear,
    Accessory,
    Weapon,
    Hair,
    Face,
    Body,
    Customization,
    Animation,
    Vfx,
    Mixed,
    #[default]
    Other,
}

impl ModType {
    pub fn all() -> &'static [ModType] {
        &[
            ModType::Gear,
            ModType::Accessory,
            ModType::Weapon,
            ModType::Hair,
            ModType::Face,
            ModType::Body,
            ModType::Customization,
            ModType::Animation,
            ModType::Vfx,
            ModType::Mixed,
            ModType::Other,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModType::Gear => "gear",
            ModType::Accessory => "accessory",
            ModType::Weapon => "weapon",
            ModType::Hair => "hair",
            ModType::Face => "face",
            ModType::Body => "body",
            ModType::Customization => "customization",
            ModType::Animation => "animation",
            ModType::Vfx => "vfx",
            ModType::Mixed => "mixed",
            ModType::Other => "other",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ModType::Gear => "Gear",
            ModType::Accessory => "Accessory",
            ModType::Weapon => "Weapon",
            ModType::Hair => "Hair",
            ModType::Face => "Face",
            ModType::Body => "Body",
            ModType::Customization => "Customization",
            ModType::Animation => "Animation",
            ModType::Vfx => "VFX",
            ModType::Mixed => "Mixed",
            ModType::Other => "Other",
        }
    }

    /// Parse the stored/CLI form
    pub fn from_cli(value: &str) -> Result<Self> {
        let lower = value.trim().to_ascii_lowercase();
        match ModType::all().iter().find(|t| t.as_str() == lower) {
            Some(t) => Ok(*t),
            None => bail!(
                "Unknown mod type '{}'. Valid types: {}",
                value,
                ModType::all()
                    .iter()
                    .map(|t| t.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }

    /// Pick the category that best describes a classification.
    ///
    /// Armor and accessories are both gear; a mod spanning gear, weapons and
    /// customization is mixed. Gear made of accessories alone is filed as
    /// [`ModType::Accessory`].
    pub fn from_classification(result: &ClassificationResult) -> Self {
        let gear = result.has_tag(classify::TAG_GEAR);
        let weapons = result.has_tag(classify::TAG_WEAPONS);
        let customization = result.has_tag(classify::TAG_CUSTOMIZATION);
        if [gear, weapons, customization].iter().filter(|present| **present).count() > 1 {
            return ModType::Mixed;
        }
        if gear {
            return if result.has_any_slot(classify::ARMOR_SLOTS) {
                ModType::Gear
            } else {
                ModType::Accessory
            };
        }
        if weapons {
            return ModType::Weapon;
        }

        let parts = &result.customization_slots;
        if !parts.is_empty() {
            let only = |allowed: &[&str]| parts.iter().all(|p| allowed.contains(&p.as_str()));
            return if only(&["Hair"]) {
                ModType::Hair
            } else if only(&["Face", "Eyes", "Face Paint"]) {
                ModType::Face
            } else if only(&["Skin", "Tail", "Ears"]) {
                ModType::Body
            } else {
                ModType::Customization
            };
        }

        let content = &result.content_types;
        if content.contains("Animation") || content.contains("Emote") {
            ModType::Animation
        } else if content.contains("VFX") {
            ModType::Vfx
        } else {
            ModType::Other
        }
    }
}

impl std::fmt::Display for ModType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}
