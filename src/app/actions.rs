//! CLI command action handlers

use super::Engine;
use crate::designs::Design;
use crate::mods::{format_conflict_result, ModType};
use crate::provider::{changed_items_or_empty, enabled_catalog, ModEvent};
use crate::resolve::MatchStrategy;
use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// Parse `group=opt1,opt2` into a group name and its options
pub fn parse_option_group(arg: &str) -> Result<(String, Vec<String>)> {
    let Some((group, options)) = arg.split_once('=') else {
        bail!("Invalid option group '{}'. Expected GROUP=OPTION[,OPTION...]", arg);
    };
    let group = group.trim();
    if group.is_empty() {
        bail!("Option group name cannot be empty in '{}'", arg);
    }
    let options = options
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect();
    Ok((group.to_string(), options))
}

fn print_set(label: &str, values: &std::collections::BTreeSet<String>) {
    if values.is_empty() {
        return;
    }
    println!(
        "{:<15}{}",
        format!("{}:", label),
        values.iter().cloned().collect::<Vec<_>>().join(", ")
    );
}

impl Engine {
    fn collection<'a>(&'a self, collection: Option<&'a str>) -> Option<&'a str> {
        collection.or(self.config.default_collection.as_deref())
    }

    // ========== Analysis Commands ==========

    pub fn cmd_classify(&self, identifiers: &[String]) -> Result<()> {
        if identifiers.is_empty() {
            bail!("Nothing to classify. Pass one or more changed-item identifiers.");
        }

        let result = self.analyze_mod(identifiers);
        let mod_type = ModType::from_classification(&result);

        println!("Classification");
        println!("{:-<40}", "");
        println!("{:<15}{}", "Type:", mod_type);
        print_set("Tags", &result.detected_tags);
        print_set("Equipment", &result.equipment_slots);
        print_set("Customization", &result.customization_slots);
        print_set("Content", &result.content_types);
        print_set("Races", &result.races);
        Ok(())
    }

    pub fn cmd_match(&self, candidate: &str, collection: Option<&str>) -> Result<()> {
        let catalog = enabled_catalog(self.provider.as_ref(), self.collection(collection));
        let matcher = self.resolver().matcher();
        let prepared = matcher.candidate(candidate);

        println!("Candidate: {}", prepared.raw_name);
        println!("Cleaned:   {}", prepared.cleaned_name);
        println!(
            "Keywords:  {}",
            prepared.keywords.iter().cloned().collect::<Vec<_>>().join(" ")
        );

        match matcher.resolve_detailed(candidate, &catalog) {
            Some(outcome) => {
                let how = match outcome.strategy {
                    MatchStrategy::ExactDirectory => "exact directory".to_string(),
                    MatchStrategy::CleanedSubstring => "cleaned substring".to_string(),
                    MatchStrategy::KeywordOverlap { overlap } => format!("{} shared keyword(s)", overlap),
                };
                println!("Matched:   {} ({})", outcome.directory_id, how);
            }
            None => println!("No enabled mod matches ({} candidates searched).", catalog.len()),
        }
        Ok(())
    }

    pub fn cmd_tree(&self) -> Result<()> {
        let trees = self
            .provider
            .loaded_resource_trees()
            .context("Failed to read resource trees")?;

        if trees.is_empty() {
            println!("No resource trees loaded.");
            return Ok(());
        }

        let extractor = self.resolver().extractor();
        for (index, tree) in trees.iter().enumerate() {
            let names = extractor.extract_candidate_names(tree);
            println!("Tree {} ({} candidate name(s))", index + 1, names.len());
            for name in names {
                println!("  - {}", name);
            }
        }
        Ok(())
    }

    pub fn cmd_affecting(&self, collection: Option<&str>) -> Result<()> {
        let result = self.resolve_affecting(collection);

        match result.tier {
            Some(tier) => {
                println!(
                    "{} mod(s) affecting the player (via {}):",
                    result.mods.len(),
                    tier.display_name()
                );
                for id in &result.mods {
                    println!("  - {}", id);
                }
            }
            None => println!("No enabled mods appear to affect the player."),
        }
        Ok(())
    }

    pub fn cmd_conflicts(&self, mod_directory: &str, mod_type: Option<&str>, selected: &[String]) -> Result<()> {
        let mod_type = match mod_type {
            Some(value) => ModType::from_cli(value)?,
            None => {
                let items = changed_items_or_empty(self.provider.as_ref(), mod_directory);
                ModType::from_classification(&self.analyze_mod(&items))
            }
        };

        let result = self.analyze_for_conflicts(mod_directory, mod_type, selected);
        println!("Analyzed {} as {}", mod_directory, mod_type);
        println!("{}", format_conflict_result(mod_directory, &result));
        Ok(())
    }

    // ========== Lifecycle Commands ==========

    pub fn cmd_events(&self, events: &[ModEvent]) -> Result<()> {
        if events.is_empty() {
            println!("No events to replay.");
            return Ok(());
        }

        for event in events {
            match event {
                ModEvent::Added { directory_id } => println!("+ {}", directory_id),
                ModEvent::Deleted { directory_id } => println!("- {}", directory_id),
                ModEvent::Moved { old_id, new_id } => println!("~ {} -> {}", old_id, new_id),
            }
            self.handle_event(event);
        }

        println!();
        self.cmd_cache_list()
    }

    pub fn cmd_cache_list(&self) -> Result<()> {
        let entries = self.lifecycle().entries();
        if entries.is_empty() {
            println!("Mod cache is empty.");
            return Ok(());
        }

        println!("{:<40} {:<15} Display name", "Directory", "Category");
        println!("{:-<80}", "");
        for entry in entries {
            println!(
                "{:<40} {:<15} {}",
                entry.directory_id,
                entry.category.display_name(),
                entry.display_name
            );
        }
        Ok(())
    }

    pub fn cmd_cache_sync(&self) -> Result<()> {
        let report = self.lifecycle().sync_with_catalog();
        println!(
            "Cache synced: {} added, {} removed",
            report.added.len(),
            report.removed.len()
        );
        for id in &report.added {
            println!("  + {}", id);
        }
        for id in &report.removed {
            println!("  - {}", id);
        }
        Ok(())
    }

    // ========== Design Commands ==========

    pub fn cmd_design_list(&self, character: Option<&str>) -> Result<()> {
        let designs = self.db.get_designs(character)?;
        if designs.is_empty() {
            println!("No designs saved.");
            return Ok(());
        }

        for design in designs {
            println!("{} / {} ({} items)", design.character, design.name, design.items.len());
            for (slot, state) in &design.items {
                let marker = if state.enabled { "" } else { " [disabled]" };
                println!("    {:<12} {}{}", slot, state.mod_directory, marker);
            }
        }
        Ok(())
    }

    pub async fn cmd_design_import(&self, path: &Path) -> Result<()> {
        let designs = Design::load_json(path).await?;
        for design in &designs {
            self.db.save_design(design)?;
            println!("Imported {} / {}", design.character, design.name);
        }
        println!("{} design(s) imported.", designs.len());
        Ok(())
    }

    pub fn cmd_design_delete(&self, character: &str, name: &str) -> Result<()> {
        if !self.db.delete_design(character, name)? {
            bail!("Design '{}' for '{}' not found.", name, character);
        }
        println!("Deleted {} / {}", character, name);
        Ok(())
    }

    // ========== Option Commands ==========

    pub async fn cmd_apply(&self, collection: Option<&str>, mod_directory: &str, groups: &[String]) -> Result<()> {
        let Some(collection) = self.collection(collection) else {
            bail!("No collection given and no default_collection configured.");
        };

        let mut parsed = BTreeMap::new();
        for arg in groups {
            let (group, options) = parse_option_group(arg)?;
            parsed.insert(group, options);
        }
        if parsed.is_empty() {
            bail!("Nothing to apply. Pass one or more --group GROUP=OPTION[,OPTION...]");
        }

        let report = self.options().apply(collection, mod_directory, &parsed).await;
        self.print_apply_report(&report);
        Ok(())
    }

    pub async fn cmd_apply_design(&self, collection: Option<&str>, character: &str, name: &str) -> Result<()> {
        let Some(collection) = self.collection(collection) else {
            bail!("No collection given and no default_collection configured.");
        };

        let design = self
            .db
            .get_designs(Some(character))?
            .into_iter()
            .find(|d| d.name == name);
        let Some(design) = design else {
            bail!("Design '{}' for '{}' not found.", name, character);
        };

        let report = self.options().apply_design(collection, &design).await;
        self.print_apply_report(&report);
        Ok(())
    }

    fn print_apply_report(&self, report: &crate::options::ApplyReport) {
        for applied in &report.applied {
            println!("  ok    {}", applied);
        }
        for failed in &report.failed {
            println!("  fail  {}/{}: {}", failed.directory_id, failed.group, failed.error);
        }
        println!(
            "{} group(s) applied, {} failed",
            report.applied.len(),
            report.failed.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_option_group() {
        let (group, options) = parse_option_group("Color = Red, Gold ,").unwrap();
        assert_eq!(group, "Color");
        assert_eq!(options, vec!["Red", "Gold"]);

        let (_, options) = parse_option_group("Color=").unwrap();
        assert!(options.is_empty());

        assert!(parse_option_group("Color").is_err());
        assert!(parse_option_group("=Red").is_err());
    }
}
