//! SQLite persistent store for the mod cache and designs

mod schema;

pub use schema::{DesignItemRecord, DesignRecord};

use crate::designs::{Design, DesignReference, ItemModState};
use crate::lifecycle::{DesignIndex, ModCacheEntry, ModCacheStore};
use crate::mods::ModType;
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Database wrapper with thread-safe access
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create the database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let conn = Connection::open(path).context("Failed to open database")?;
        Self::with_connection(conn)
    }

    /// Database that lives only as long as this value
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        conn.execute_batch(schema::SCHEMA)
            .context("Failed to initialize database schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ========== Mod cache ==========

    pub fn get_mod_cache_entry(&self, directory_id: &str) -> Result<Option<ModCacheEntry>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT directory_id, display_name, category, last_updated FROM mod_cache WHERE directory_id = ?1",
            params![directory_id],
            schema::mod_cache_entry_from_row,
        )
        .optional()
        .context("Failed to read mod cache entry")
    }

    // ========== Designs ==========

    /// Insert or replace a design and all of its items
    pub fn save_design(&self, design: &Design) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO designs (character, name, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(character, name) DO UPDATE SET updated_at = excluded.updated_at",
            params![
                design.character,
                design.name,
                design.created_at.to_rfc3339(),
                design.updated_at.to_rfc3339()
            ],
        )
        .context("Failed to save design")?;

        let design_id: i64 = tx.query_row(
            "SELECT id FROM designs WHERE character = ?1 AND name = ?2",
            params![design.character, design.name],
            |row| row.get(0),
        )?;

        tx.execute("DELETE FROM design_items WHERE design_id = ?1", params![design_id])?;
        for (slot, state) in &design.items {
            let options = serde_json::to_string(&state.options).context("Failed to encode design options")?;
            tx.execute(
                "INSERT INTO design_items (design_id, slot, mod_directory, enabled, priority, options)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    design_id,
                    slot,
                    state.mod_directory,
                    state.enabled as i32,
                    state.priority,
                    options
                ],
            )
            .with_context(|| format!("Failed to save item '{}' of design '{}'", slot, design.name))?;
        }

        tx.commit()?;
        tracing::debug!(
            "Saved design '{}' for {} ({} items)",
            design.name,
            design.character,
            design.items.len()
        );
        Ok(())
    }

    /// All designs, optionally limited to one character
    pub fn get_designs(&self, character: Option<&str>) -> Result<Vec<Design>> {
        let conn = self.conn();

        let records: Vec<DesignRecord> = {
            let mut stmt = conn.prepare(
                "SELECT id, character, name, created_at, updated_at FROM designs
                 WHERE ?1 IS NULL OR character = ?1
                 ORDER BY character, name",
            )?;
            let rows = stmt.query_map(params![character], DesignRecord::from_row)?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        let mut stmt = conn.prepare(
            "SELECT slot, mod_directory, enabled, priority, options FROM design_items
             WHERE design_id = ?1 ORDER BY slot",
        )?;

        let mut designs = Vec::with_capacity(records.len());
        for record in records {
            let items = stmt
                .query_map(params![record.id], DesignItemRecord::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut design = Design::new(record.character, record.name);
            design.created_at = schema::parse_timestamp(&record.created_at);
            design.updated_at = schema::parse_timestamp(&record.updated_at);
            for item in items {
                let options: BTreeMap<String, Vec<String>> = serde_json::from_str(&item.options)
                    .with_context(|| format!("Invalid options stored for slot '{}'", item.slot))?;
                design.items.insert(
                    item.slot,
                    ItemModState {
                        mod_directory: item.mod_directory,
                        enabled: item.enabled,
                        priority: item.priority,
                        options,
                    },
                );
            }
            designs.push(design);
        }

        Ok(designs)
    }

    /// Delete a design; returns whether it existed
    pub fn delete_design(&self, character: &str, name: &str) -> Result<bool> {
        let conn = self.conn();
        let deleted = conn
            .execute(
                "DELETE FROM designs WHERE character = ?1 AND name = ?2",
                params![character, name],
            )
            .context("Failed to delete design")?;
        Ok(deleted > 0)
    }
}

impl ModCacheStore for Database {
    fn update_mod_cache(&self, directory_id: &str, display_name: &str, category: ModType) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO mod_cache (directory_id, display_name, category, last_updated)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(directory_id) DO UPDATE SET
                display_name = excluded.display_name,
                category = excluded.category,
                last_updated = excluded.last_updated",
            params![directory_id, display_name, category.as_str(), Utc::now().to_rfc3339()],
        )
        .context("Failed to update mod cache")?;
        Ok(())
    }

    fn remove_from_mod_cache(&self, directory_id: &str) -> Result<()> {
        let conn = self.conn();
        conn.execute("DELETE FROM mod_cache WHERE directory_id = ?1", params![directory_id])
            .context("Failed to remove from mod cache")?;
        Ok(())
    }

    fn move_in_mod_cache(
        &self,
        old_id: &str,
        new_id: &str,
        display_name: &str,
        category: ModType,
    ) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM mod_cache WHERE directory_id = ?1", params![old_id])?;
        tx.execute(
            "INSERT OR REPLACE INTO mod_cache (directory_id, display_name, category, last_updated)
             VALUES (?1, ?2, ?3, ?4)",
            params![new_id, display_name, category.as_str(), Utc::now().to_rfc3339()],
        )?;
        tx.commit().context("Failed to move mod cache entry")?;
        Ok(())
    }

    fn load_mod_cache(&self) -> Result<Vec<ModCacheEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT directory_id, display_name, category, last_updated FROM mod_cache ORDER BY directory_id",
        )?;
        let entries = stmt
            .query_map([], schema::mod_cache_entry_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to load mod cache")?;
        Ok(entries)
    }
}

impl DesignIndex for Database {
    fn designs_referencing(&self, directory_id: &str) -> Result<Vec<DesignReference>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT d.character, d.name, i.slot FROM design_items i
             JOIN designs d ON d.id = i.design_id
             WHERE i.mod_directory = ?1
             ORDER BY d.character, d.name, i.slot",
        )?;
        let references = stmt
            .query_map(params![directory_id], |row| {
                Ok(DesignReference {
                    character: row.get(0)?,
                    design: row.get(1)?,
                    slot: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to look up design references")?;
        Ok(references)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_design() -> Design {
        Design::new("Alisaie", "Casual")
            .with_item("Head", ItemModState::new("Witch Hat").with_option("Color", &["Red", "Gold"]))
            .with_item("Hair", ItemModState::new("Sleek Ponytail"))
    }

    #[test]
    fn test_mod_cache_round_trip() {
        let db = Database::open_in_memory().unwrap();
        db.update_mod_cache("Sleek", "Sleek Ponytail", ModType::Hair).unwrap();
        db.update_mod_cache("Sleek", "Sleek Ponytail v2", ModType::Hair).unwrap();

        let entry = db.get_mod_cache_entry("Sleek").unwrap().unwrap();
        assert_eq!(entry.display_name, "Sleek Ponytail v2");
        assert_eq!(entry.category, ModType::Hair);
        assert_eq!(db.load_mod_cache().unwrap().len(), 1);

        db.remove_from_mod_cache("Sleek").unwrap();
        assert!(db.get_mod_cache_entry("Sleek").unwrap().is_none());
    }

    #[test]
    fn test_move_replaces_old_key() {
        let db = Database::open_in_memory().unwrap();
        db.update_mod_cache("old", "Plate", ModType::Gear).unwrap();
        db.update_mod_cache("new", "Something else", ModType::Other).unwrap();

        db.move_in_mod_cache("old", "new", "Plate", ModType::Gear).unwrap();

        let entries = db.load_mod_cache().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].directory_id, "new");
        assert_eq!(entries[0].category, ModType::Gear);
    }

    #[test]
    fn test_design_crud() {
        let db = Database::open_in_memory().unwrap();
        db.save_design(&sample_design()).unwrap();
        db.save_design(&Design::new("Thancred", "Formal")).unwrap();

        let designs = db.get_designs(Some("Alisaie")).unwrap();
        assert_eq!(designs.len(), 1);
        let design = &designs[0];
        assert_eq!(design.items.len(), 2);
        assert_eq!(design.items["Head"].options["Color"], vec!["Red", "Gold"]);
        assert_eq!(db.get_designs(None).unwrap().len(), 2);

        // Saving again replaces the item set
        let trimmed = Design::new("Alisaie", "Casual").with_item("Hair", ItemModState::new("Sleek Ponytail"));
        db.save_design(&trimmed).unwrap();
        assert_eq!(db.get_designs(Some("Alisaie")).unwrap()[0].items.len(), 1);

        assert!(db.delete_design("Alisaie", "Casual").unwrap());
        assert!(!db.delete_design("Alisaie", "Casual").unwrap());
        assert!(db.designs_referencing("Sleek Ponytail").unwrap().is_empty());
    }

    #[test]
    fn test_designs_referencing() {
        let db = Database::open_in_memory().unwrap();
        db.save_design(&sample_design()).unwrap();
        db.save_design(&Design::new("Thancred", "Formal").with_item("Body", ItemModState::new("Witch Hat")))
            .unwrap();

        let references = db.designs_referencing("Witch Hat").unwrap();
        assert_eq!(
            references,
            vec![
                DesignReference {
                    character: "Alisaie".into(),
                    design: "Casual".into(),
                    slot: "Head".into()
                },
                DesignReference {
                    character: "Thancred".into(),
                    design: "Formal".into(),
                    slot: "Body".into()
                },
            ]
        );
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("glamlens.db");
        {
            let db = Database::open(&path).unwrap();
            db.update_mod_cache("a", "A", ModType::Face).unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.load_mod_cache().unwrap()[0].category, ModType::Face);
    }
}
