//! Character designs and their per-item mod state
//!
//! A design records, for each equipment or customization slot, which mod
//! supplies the item and how it is configured. The lifecycle cache scans
//! these records to warn before a referenced mod disappears.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Mod state stored for one slot of a design
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemModState {
    pub mod_directory: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub priority: i32,

    /// Option group -> selected options
    #[serde(default)]
    pub options: BTreeMap<String, Vec<String>>,
}

fn default_enabled() -> bool {
    true
}

impl ItemModState {
    pub fn new(mod_directory: impl Into<String>) -> Self {
        Self {
            mod_directory: mod_directory.into(),
            enabled: true,
            priority: 0,
            options: BTreeMap::new(),
        }
    }

    pub fn with_option(mut self, group: impl Into<String>, options: &[&str]) -> Self {
        self.options
            .insert(group.into(), options.iter().map(|o| o.to_string()).collect());
        self
    }
}

/// A saved outfit/appearance of one character
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Design {
    pub name: String,
    pub character: String,

    /// Slot name -> mod state
    #[serde(default)]
    pub items: BTreeMap<String, ItemModState>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Design {
    pub fn new(character: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            character: character.into(),
            items: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_item(mut self, slot: impl Into<String>, state: ItemModState) -> Self {
        self.items.insert(slot.into(), state);
        self
    }

    /// Slots whose mod state points at `directory_id`
    pub fn slots_using(&self, directory_id: &str) -> Vec<&str> {
        self.items
            .iter()
            .filter(|(_, state)| state.mod_directory == directory_id)
            .map(|(slot, _)| slot.as_str())
            .collect()
    }

    /// Load designs from a JSON file holding either one design or an array
    pub async fn load_json(path: &Path) -> Result<Vec<Design>> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse_json(&content)
    }

    pub fn parse_json(content: &str) -> Result<Vec<Design>> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(Design),
            Many(Vec<Design>),
        }

        let parsed: OneOrMany = serde_json::from_str(content).context("Failed to parse design JSON")?;
        Ok(match parsed {
            OneOrMany::One(design) => vec![design],
            OneOrMany::Many(designs) => designs,
        })
    }
}

/// One slot of one design that references a mod
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct DesignReference {
    pub character: String,
    pub design: String,
    pub slot: String,
}

impl std::fmt::Display for DesignReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {} ({})", self.character, self.design, self.slot)
    }
}
