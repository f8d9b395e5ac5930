//! Changed-item classification
//!
//! Turns the opaque changed-item identifiers of a mod into semantic tags:
//! equipment slots, customization slots, races, gender specificity and
//! content types. Three kinds of identifiers are recognised:
//!
//! - structured customization descriptors (`Customization: <Race> <Gender> <Part> ...`)
//! - game paths (`chara/equipment/e0100/model/c0101e0100_met.mdl`)
//! - free-text item names (`Heavy Plate Helm`)
//!
//! Each identifier is handled by exactly one of these, tested in that order,
//! so a customization descriptor never reaches the free-text equipment table.

use super::assets::{AssetKind, ChangedItem};
use regex_lite::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::LazyLock;

pub const ARMOR_SLOTS: &[&str] = &["Head", "Body", "Hands", "Legs", "Feet"];
pub const ACCESSORY_SLOTS: &[&str] = &["Earrings", "Necklace", "Bracelets", "Rings"];
pub const WEAPON_SLOTS: &[&str] = &["Main Hand", "Off Hand"];
pub const CUSTOMIZATION_SLOTS: &[&str] =
    &["Hair", "Face", "Skin", "Tail", "Ears", "Face Paint", "Eyes"];

pub const TAG_GEAR: &str = "Gear";
pub const TAG_WEAPONS: &str = "Weapons";
pub const TAG_ACCESSORIES: &str = "Accessories";
pub const TAG_CUSTOMIZATION: &str = "Character Customization";
pub const TAG_COMPREHENSIVE: &str = "Comprehensive";
pub const TAG_MULTI_SLOT: &str = "Multi-Slot";
pub const TAG_RACE_SPECIFIC: &str = "Race-Specific";
pub const TAG_GENDER_SPECIFIC: &str = "Gender-Specific";

/// A tag and the alternation that detects it
struct Pattern {
    tag: &'static str,
    words: &'static str,
}

/// Free-text equipment names, matched on word boundaries
const EQUIPMENT_PATTERNS: &[Pattern] = &[
    Pattern {
        tag: "Head",
        words: r"helms?|helmets?|hats?|crowns?|circlets?|caps?|hoods?|masks?|headbands?|bandanas?|berets?|tiaras?|turbans?|visors?|veils?|headgear",
    },
    Pattern {
        tag: "Body",
        words: r"chest(?:piece)?|coats?|shirts?|robes?|jackets?|vests?|tunics?|dress(?:es)?|cuirass|armou?r|mail|harness|gowns?|doublets?|blouses?|hoodies?|sweaters?|tops?|breastplates?|corsets?|bodysuits?",
    },
    Pattern {
        tag: "Hands",
        words: r"gloves?|gauntlets?|mitts?|mittens|handwraps|hand\s+wraps|armguards?",
    },
    Pattern {
        tag: "Legs",
        words: r"pants|trousers|legs|leggings|skirts?|shorts|breeches|tights|bottoms|slacks|chaps|jeans|cuisses|tassets",
    },
    Pattern {
        tag: "Feet",
        words: r"boots?|shoes?|sandals?|sabatons?|greaves|heels|sollerets|socks|loafers|sneakers|feet|footwear",
    },
    Pattern {
        tag: "Earrings",
        words: r"earrings?|ear\s*cuffs?|studs",
    },
    Pattern {
        tag: "Necklace",
        words: r"necklaces?|chokers?|pendants?|amulets?|torques?",
    },
    Pattern {
        tag: "Bracelets",
        words: r"bracelets?|bangles?|wristlets?|armlets?|wristbands?",
    },
    Pattern {
        tag: "Rings",
        words: r"rings?",
    },
    Pattern {
        tag: "Main Hand",
        words: r"swords?|greatswords?|axes?|bows?|longbows?|staff|staves|canes?|lances?|spears?|polearms?|daggers?|guns?|pistols?|rifles?|katanas?|scythes?|knuckles|fists|rapiers?|gunblades?|grimoires?|codex|rods?|wands?|glaives?|chakrams?|nouliths?|weapons?",
    },
    Pattern {
        tag: "Off Hand",
        words: r"shields?|bucklers?|aegis",
    },
];

/// Content types recognisable from free text
const CONTENT_PATTERNS: &[Pattern] = &[
    Pattern {
        tag: "Emote",
        words: r"emotes?|dances?",
    },
    Pattern {
        tag: "Animation",
        words: r"animations?|poses?|idles?",
    },
    Pattern {
        tag: "VFX",
        words: r"vfx|effects?",
    },
    Pattern {
        tag: "Mount",
        words: r"mounts?",
    },
    Pattern {
        tag: "Minion",
        words: r"minions?",
    },
    Pattern {
        tag: "Housing",
        words: r"housing|furniture",
    },
];

/// Body parts a customization descriptor declares; the first match wins
const CUSTOMIZATION_PATTERNS: &[Pattern] = &[
    Pattern {
        tag: "Face Paint",
        words: r"face\s*paints?|face\s*decals?|facial\s*decals?|decals?",
    },
    Pattern {
        tag: "Hair",
        words: r"hair(?:styles?)?",
    },
    Pattern {
        tag: "Eyes",
        words: r"eyes?|iris(?:es)?",
    },
    Pattern {
        tag: "Ears",
        words: r"ears?",
    },
    Pattern {
        tag: "Tail",
        words: r"tails?",
    },
    Pattern {
        tag: "Skin",
        words: r"skins?|body",
    },
    Pattern {
        tag: "Face",
        words: r"faces?",
    },
];

/// Provider spellings (lowercase, no spaces or apostrophes) -> display race
const RACE_NAMES: &[(&str, &str)] = &[
    ("hyur", "Hyur"),
    ("elezen", "Elezen"),
    ("lalafell", "Lalafell"),
    ("miqote", "Miqo'te"),
    ("roegadyn", "Roegadyn"),
    ("aura", "Au Ra"),
    ("hrothgar", "Hrothgar"),
    ("viera", "Viera"),
    ("midlander", "Hyur"),
    ("highlander", "Hyur"),
    ("wildwood", "Elezen"),
    ("duskwight", "Elezen"),
    ("plainsfolk", "Lalafell"),
    ("dunesfolk", "Lalafell"),
    ("seekerofthesun", "Miqo'te"),
    ("keeperofthemoon", "Miqo'te"),
    ("seawolf", "Roegadyn"),
    ("hellsguard", "Roegadyn"),
    ("raen", "Au Ra"),
    ("xaela", "Au Ra"),
    ("helion", "Hrothgar"),
    ("thelost", "Hrothgar"),
    ("rava", "Viera"),
    ("veena", "Viera"),
];

/// Equipment file suffixes (`c0101e0100_met.mdl`)
const EQUIPMENT_SUFFIXES: &[(&str, &str)] = &[
    ("met", "Head"),
    ("top", "Body"),
    ("glv", "Hands"),
    ("dwn", "Legs"),
    ("sho", "Feet"),
    ("ear", "Earrings"),
    ("nek", "Necklace"),
    ("wrs", "Bracelets"),
    ("rir", "Rings"),
    ("ril", "Rings"),
];

/// Customization directories inside game paths, checked in order
const CUSTOMIZATION_PATHS: &[(&str, &str)] = &[
    ("chara/common/texture/decal_face/", "Face Paint"),
    ("chara/common/texture/eye/", "Eyes"),
    ("/obj/hair/", "Hair"),
    ("/obj/tail/", "Tail"),
    ("/obj/zear/", "Ears"),
    ("/obj/body/", "Skin"),
    ("/obj/face/", "Face"),
];

/// Content types recognisable from game paths
const CONTENT_PATHS: &[(&str, &str)] = &[
    ("bgcommon/hou/", "Housing"),
    ("chara/monster/", "Creature"),
    ("chara/demihuman/", "Creature"),
    ("ui/", "UI"),
    ("sound/", "Sound"),
];

static CUSTOMIZATION_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*customi[sz]ation\s*:\s*(.*)$").expect("valid regex")
});

static EQUIPMENT_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"_(met|top|glv|dwn|sho|ear|nek|wrs|rir|ril)(?:[._]|$)").expect("valid regex")
});

static EQUIPMENT_TABLE: LazyLock<Vec<(&'static str, Regex)>> =
    LazyLock::new(|| compile_patterns(EQUIPMENT_PATTERNS));
static CONTENT_TABLE: LazyLock<Vec<(&'static str, Regex)>> =
    LazyLock::new(|| compile_patterns(CONTENT_PATTERNS));
static CUSTOMIZATION_TABLE: LazyLock<Vec<(&'static str, Regex)>> =
    LazyLock::new(|| compile_patterns(CUSTOMIZATION_PATTERNS));

fn compile_patterns(patterns: &[Pattern]) -> Vec<(&'static str, Regex)> {
    patterns
        .iter()
        .map(|p| {
            let re = Regex::new(&format!(r"(?i)\b(?:{})\b", p.words)).expect("valid regex");
            (p.tag, re)
        })
        .collect()
}

/// Result of classifying a set of changed-item identifiers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    pub detected_tags: BTreeSet<String>,
    pub equipment_slots: BTreeSet<String>,
    pub customization_slots: BTreeSet<String>,
    pub content_types: BTreeSet<String>,
    pub races: BTreeSet<String>,
    pub is_multi_slot: bool,
    pub is_race_specific: bool,
    pub is_gender_specific: bool,
}

impl ClassificationResult {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.detected_tags.contains(tag)
    }

    pub fn has_any_slot(&self, slots: &[&str]) -> bool {
        slots.iter().any(|s| self.equipment_slots.contains(*s))
    }
}

/// Tracks which gender tokens were seen across all identifiers
#[derive(Debug, Default)]
struct GenderScan {
    first: Option<&'static str>,
    mixed: bool,
}

impl GenderScan {
    fn observe(&mut self, gender: &'static str) {
        match self.first {
            None => self.first = Some(gender),
            Some(first) if first != gender => self.mixed = true,
            Some(_) => {}
        }
    }

    fn only(&self) -> Option<&'static str> {
        if self.mixed {
            None
        } else {
            self.first
        }
    }
}

/// Classifier for changed-item identifiers. Never fails: identifiers that match
/// nothing contribute no tags.
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemIdentifierClassifier;

impl ItemIdentifierClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify<I, S>(&self, identifiers: I) -> ClassificationResult
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut result = ClassificationResult::default();
        let mut genders = GenderScan::default();

        for identifier in identifiers {
            let identifier = identifier.as_ref().trim();
            if identifier.is_empty() {
                continue;
            }

            if let Some(caps) = CUSTOMIZATION_PREFIX.captures(identifier) {
                let body = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                classify_customization(body, &mut result, &mut genders);
                continue;
            }

            let item = ChangedItem::new(identifier);
            if let Some(path) = item.game_path() {
                classify_game_path(path, item.kind, &mut result);
            } else {
                classify_free_text(identifier, &mut result);
            }
        }

        finalize(&mut result, &genders);
        result
    }
}

/// Classify identifiers with the default classifier
pub fn classify<I, S>(identifiers: I) -> ClassificationResult
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ItemIdentifierClassifier::new().classify(identifiers)
}

/// Map a provider race or clan spelling to its display race name.
///
/// The whole text must spell one name; "Au Ra", "Aura" and "Miqo'te" all
/// fold to a known spelling, "Laura's" does not.
pub fn canonical_race(text: &str) -> Option<&'static str> {
    let folded: String = text
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_lowercase();
    RACE_NAMES
        .iter()
        .find(|(alias, _)| *alias == folded)
        .map(|(_, race)| *race)
}

/// Race named by the leading tokens, with the number of tokens it used.
/// Shorter spellings win, so "Hyur Midlander" resolves on "Hyur".
fn leading_race(tokens: &[&str], max_tokens: usize) -> Option<(&'static str, usize)> {
    (1..=max_tokens.min(tokens.len()))
        .find_map(|n| canonical_race(&tokens[..n].join(" ")).map(|race| (race, n)))
}

fn gender_token(token: &str) -> Option<&'static str> {
    match token.to_ascii_lowercase().as_str() {
        "male" | "♂" => Some("Male"),
        "female" | "♀" => Some("Female"),
        _ => None,
    }
}

/// Whether an identifier is a customization descriptor declaring hair
pub fn is_hair_customization(identifier: &str) -> bool {
    CUSTOMIZATION_PREFIX
        .captures(identifier)
        .and_then(|caps| caps.get(1))
        .map(|body| customization_part(body.as_str()) == Some("Hair"))
        .unwrap_or(false)
}

fn customization_part(text: &str) -> Option<&'static str> {
    CUSTOMIZATION_TABLE
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(tag, _)| *tag)
}

fn classify_customization(body: &str, result: &mut ClassificationResult, genders: &mut GenderScan) {
    let tokens: Vec<&str> = body.split_whitespace().collect();
    let gender_at = tokens.iter().position(|t| gender_token(t).is_some());

    // With a gender token the race is everything before it; without one only
    // a short leading race name is split off the part text.
    let part_text = match gender_at {
        Some(i) => {
            if let Some(gender) = gender_token(tokens[i]) {
                genders.observe(gender);
            }
            if let Some((race, _)) = leading_race(&tokens[..i], i) {
                result.races.insert(race.to_string());
            }
            tokens[i + 1..].join(" ")
        }
        None => match leading_race(&tokens, 2) {
            Some((race, used)) => {
                result.races.insert(race.to_string());
                tokens[used..].join(" ")
            }
            None => tokens.join(" "),
        },
    };

    if let Some(part) = customization_part(&part_text) {
        result.customization_slots.insert(part.to_string());
    }
}

fn classify_game_path(path: &str, kind: AssetKind, result: &mut ClassificationResult) {
    let file_name = path.rsplit('/').next().unwrap_or(path);

    if path.starts_with("chara/equipment/") || path.starts_with("chara/accessory/") {
        if let Some(caps) = EQUIPMENT_SUFFIX.captures(file_name) {
            let suffix = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            if let Some((_, slot)) = EQUIPMENT_SUFFIXES.iter().find(|(s, _)| *s == suffix) {
                result.equipment_slots.insert(slot.to_string());
            }
        }
    } else if path.starts_with("chara/weapon/") {
        result.equipment_slots.insert("Main Hand".to_string());
    } else if path.starts_with("chara/human/") || path.starts_with("chara/common/") {
        let part = CUSTOMIZATION_PATHS
            .iter()
            .find(|(segment, _)| {
                if segment.starts_with("chara/") {
                    path.starts_with(segment)
                } else {
                    path.contains(segment)
                }
            })
            .map(|(_, part)| *part);
        if let Some(part) = part {
            let part = if part == "Face" && file_name.contains("_iri") { "Eyes" } else { part };
            result.customization_slots.insert(part.to_string());
        }
    }

    match kind {
        AssetKind::Animation => {
            result.content_types.insert("Animation".to_string());
        }
        AssetKind::Vfx => {
            result.content_types.insert("VFX".to_string());
        }
        _ => {}
    }
    if let Some((_, content)) = CONTENT_PATHS.iter().find(|(prefix, _)| path.starts_with(prefix)) {
        result.content_types.insert(content.to_string());
    }
}

fn classify_free_text(text: &str, result: &mut ClassificationResult) {
    for (slot, re) in EQUIPMENT_TABLE.iter() {
        if re.is_match(text) {
            result.equipment_slots.insert(slot.to_string());
        }
    }
    for (content, re) in CONTENT_TABLE.iter() {
        if re.is_match(text) {
            result.content_types.insert(content.to_string());
        }
    }
}

fn finalize(result: &mut ClassificationResult, genders: &GenderScan) {
    let mut tags: BTreeSet<String> = BTreeSet::new();
    tags.extend(result.equipment_slots.iter().cloned());
    tags.extend(result.customization_slots.iter().cloned());
    tags.extend(result.content_types.iter().cloned());
    tags.extend(result.races.iter().cloned());

    if !result.races.is_empty() {
        result.is_race_specific = true;
        tags.insert(TAG_RACE_SPECIFIC.to_string());
    }

    if let Some(gender) = genders.only() {
        result.is_gender_specific = true;
        tags.insert(format!("{} Only", gender));
        tags.insert(TAG_GENDER_SPECIFIC.to_string());
    }

    let has_gear = result
        .equipment_slots
        .iter()
        .any(|slot| !WEAPON_SLOTS.contains(&slot.as_str()));
    let has_weapons = result.has_any_slot(WEAPON_SLOTS);
    let has_accessories = result.has_any_slot(ACCESSORY_SLOTS);
    let has_customization = !result.customization_slots.is_empty();

    for (present, tag) in [
        (has_gear, TAG_GEAR),
        (has_weapons, TAG_WEAPONS),
        (has_accessories, TAG_ACCESSORIES),
        (has_customization, TAG_CUSTOMIZATION),
    ] {
        if present {
            tags.insert(tag.to_string());
        }
    }

    let categories = [has_gear, has_weapons, has_accessories, has_customization]
        .iter()
        .filter(|present| **present)
        .count();
    if categories > 1 {
        tags.insert(TAG_COMPREHENSIVE.to_string());
    }

    if result.equipment_slots.len() > 1 {
        result.is_multi_slot = true;
        tags.insert(TAG_MULTI_SLOT.to_string());
    }

    result.detected_tags = tags;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customization_descriptor() {
        let result = classify(["Customization: Hyur Midlander Male Hair 3"]);

        for tag in [
            "Hair",
            "Hyur",
            "Male Only",
            "Race-Specific",
            "Gender-Specific",
            "Character Customization",
        ] {
            assert!(result.has_tag(tag), "missing tag {tag}: {:?}", result.detected_tags);
        }
        assert!(result.equipment_slots.is_empty());
        for slot in ARMOR_SLOTS.iter().chain(ACCESSORY_SLOTS).chain(WEAPON_SLOTS) {
            assert!(!result.has_tag(slot));
        }
        assert!(result.is_race_specific);
        assert!(result.is_gender_specific);
        assert!(!result.is_multi_slot);
    }

    #[test]
    fn test_free_text_equipment() {
        let result = classify(["Heavy Plate Helm", "Steel Gauntlets"]);

        let slots: Vec<_> = result.equipment_slots.iter().map(String::as_str).collect();
        assert_eq!(slots, vec!["Hands", "Head"]);
        assert!(result.has_tag("Multi-Slot"));
        assert!(result.has_tag("Gear"));
        assert!(result.is_multi_slot);
        assert!(!result.has_tag("Comprehensive"));
    }

    #[test]
    fn test_provider_race_spelling_is_normalized() {
        let result = classify(["Customization: Aura Female Tail 2", "Customization: Miqote Female Ears"]);
        assert!(result.races.contains("Au Ra"));
        assert!(result.races.contains("Miqo'te"));
        assert!(result.has_tag("Female Only"));
        assert!(result.customization_slots.contains("Tail"));
        assert!(result.customization_slots.contains("Ears"));
    }

    #[test]
    fn test_mixed_genders_are_not_gender_specific() {
        let result = classify([
            "Customization: Hyur Midlander Male Hair 3",
            "Customization: Hyur Midlander Female Hair 3",
        ]);
        assert!(!result.is_gender_specific);
        assert!(!result.has_tag("Male Only"));
        assert!(!result.has_tag("Female Only"));
        assert!(!result.has_tag("Gender-Specific"));
        assert!(result.has_tag("Race-Specific"));
    }

    #[test]
    fn test_face_paint_is_not_face() {
        let result = classify(["Customization: Face Paint 5"]);
        assert!(result.customization_slots.contains("Face Paint"));
        assert!(!result.customization_slots.contains("Face"));
        assert!(!result.is_race_specific);
    }

    #[test]
    fn test_game_paths() {
        let result = classify([
            "chara/equipment/e0100/model/c0101e0100_top.mdl",
            "chara/accessory/a0001/model/c0101a0001_ear.mdl",
            "chara/human/c0101/obj/hair/h0003/model/c0101h0003_hir.mdl",
        ]);
        assert!(result.equipment_slots.contains("Body"));
        assert!(result.equipment_slots.contains("Earrings"));
        assert!(result.customization_slots.contains("Hair"));
        assert!(result.has_tag("Gear"));
        assert!(result.has_tag("Accessories"));
        assert!(result.has_tag("Character Customization"));
        assert!(result.has_tag("Comprehensive"));
        assert!(result.has_tag("Multi-Slot"));
    }

    #[test]
    fn test_accessory_only_mod_is_gear() {
        let result = classify(["Gold Earrings"]);
        assert!(result.has_tag("Earrings"));
        assert!(result.has_tag("Gear"));
        assert!(result.has_tag("Accessories"));
        assert!(!result.has_tag("Weapons"));
        assert!(!result.is_multi_slot);
    }

    #[test]
    fn test_race_needs_a_whole_name() {
        let result = classify(["Customization: Laura's Face Paint"]);
        assert!(result.races.is_empty());
        assert!(!result.has_tag("Race-Specific"));
        assert!(result.customization_slots.contains("Face Paint"));

        let result = classify(["Customization: Au Ra Tail 2"]);
        assert!(result.races.contains("Au Ra"));
        assert!(result.customization_slots.contains("Tail"));

        let result = classify(["Customization: Seeker of the Sun Female Ears"]);
        assert_eq!(result.races.len(), 1);
        assert!(result.races.contains("Miqo'te"));
        assert!(result.customization_slots.contains("Ears"));
    }

    #[test]
    fn test_canonical_race() {
        assert_eq!(canonical_race("Aura"), Some("Au Ra"));
        assert_eq!(canonical_race("Au Ra"), Some("Au Ra"));
        assert_eq!(canonical_race("Miqo'te"), Some("Miqo'te"));
        assert_eq!(canonical_race("The Lost"), Some("Hrothgar"));
        assert_eq!(canonical_race("Laura's"), None);
        assert_eq!(canonical_race(""), None);
    }

    #[test]
    fn test_weapons_and_content_types() {
        let result = classify(["Crystal Katana", "Victory Dance Emote", "chara/weapon/w0101/obj/body/b0001/vfx/eff/vw0001.avfx"]);
        assert!(result.has_tag("Weapons"));
        assert!(!result.has_tag("Gear"));
        assert!(result.content_types.contains("Emote"));
        assert!(result.content_types.contains("VFX"));
    }

    #[test]
    fn test_unmatched_identifiers_contribute_nothing() {
        let result = classify(["Something Entirely Different", "", "   "]);
        assert_eq!(result, ClassificationResult::default());
    }

    #[test]
    fn test_is_hair_customization() {
        assert!(is_hair_customization("Customization: Hyur Midlander Male Hair 3"));
        assert!(!is_hair_customization("Customization: Hyur Midlander Male Face 1"));
        assert!(!is_hair_customization("Hair Ribbon"));
    }
}
