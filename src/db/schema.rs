//! Database schema and record types

use crate::lifecycle::ModCacheEntry;
use crate::mods::ModType;
use chrono::{DateTime, Utc};
use rusqlite::Row;

pub(super) const SCHEMA: &str = r#"
    -- Category cache mirrored from the lifecycle cache
    CREATE TABLE IF NOT EXISTS mod_cache (
        directory_id TEXT PRIMARY KEY,
        display_name TEXT NOT NULL,
        category TEXT NOT NULL,
        last_updated TEXT NOT NULL
    );

    -- Saved character designs
    CREATE TABLE IF NOT EXISTS designs (
        id INTEGER PRIMARY KEY,
        character TEXT NOT NULL,
        name TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE(character, name)
    );

    -- Per-slot mod state of a design
    CREATE TABLE IF NOT EXISTS design_items (
        id INTEGER PRIMARY KEY,
        design_id INTEGER NOT NULL,
        slot TEXT NOT NULL,
        mod_directory TEXT NOT NULL,
        enabled INTEGER NOT NULL DEFAULT 1,
        priority INTEGER NOT NULL DEFAULT 0,
        options TEXT NOT NULL DEFAULT '{}',
        FOREIGN KEY (design_id) REFERENCES designs(id) ON DELETE CASCADE,
        UNIQUE(design_id, slot)
    );

    CREATE INDEX IF NOT EXISTS idx_design_items_mod ON design_items(mod_directory);
"#;

/// Parse a stored RFC3339 timestamp; unreadable values map to the epoch
pub(super) fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            tracing::debug!("Unreadable timestamp '{}': {}", value, e);
            DateTime::<Utc>::default()
        })
}

pub(super) fn parse_category(value: &str) -> ModType {
    ModType::from_cli(value).unwrap_or_else(|e| {
        tracing::warn!("{}; treating as other", e);
        ModType::Other
    })
}

/// Row of `mod_cache`: directory_id, display_name, category, last_updated
pub(super) fn mod_cache_entry_from_row(row: &Row<'_>) -> rusqlite::Result<ModCacheEntry> {
    let category: String = row.get(2)?;
    let last_updated: String = row.get(3)?;
    Ok(ModCacheEntry {
        directory_id: row.get(0)?,
        display_name: row.get(1)?,
        category: parse_category(&category),
        last_updated: parse_timestamp(&last_updated),
    })
}

/// Design database record
#[derive(Debug, Clone)]
pub struct DesignRecord {
    pub id: i64,
    pub character: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

impl DesignRecord {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            character: row.get(1)?,
            name: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }
}

/// Design item database record
#[derive(Debug, Clone)]
pub struct DesignItemRecord {
    pub slot: String,
    pub mod_directory: String,
    pub enabled: bool,
    pub priority: i32,
    /// JSON object: option group -> selected options
    pub options: String,
}

impl DesignItemRecord {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            slot: row.get(0)?,
            mod_directory: row.get(1)?,
            enabled: row.get::<_, i32>(2)? != 0,
            priority: row.get(3)?,
            options: row.get(4)?,
        })
    }
}
