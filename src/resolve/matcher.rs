//! Candidate-name to installed-mod matching
//!
//! Strategies are tried in a fixed order and the first hit wins:
//! exact directory id, substring of cleaned names, keyword overlap.

use crate::config::MatcherConfig;
use crate::provider::ModDescriptor;
use regex_lite::Regex;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

static LEADING_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\[[^\]]*\]\s*").expect("valid regex"));
static PIPE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\|.*$").expect("valid regex"));
static TRAILING_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+v?\d+(\.\d+)*$").expect("valid regex"));

const TOKEN_SEPARATORS: &[char] = &[' ', '-', '_', '+', '(', ')', '[', ']', '|'];

/// Strip decorations from a mod name: leading `[Tag]`, trailing `| option`
/// suffixes and trailing version numbers. Applied until nothing changes, so
/// cleaning an already-clean name is a no-op.
pub fn clean_mod_name(name: &str) -> String {
    let mut current = name.trim().to_string();
    loop {
        let without_tag = LEADING_TAG.replace(&current, "");
        let without_suffix = PIPE_SUFFIX.replace(&without_tag, "");
        let next = TRAILING_VERSION.replace(&without_suffix, "").trim().to_string();
        if next == current {
            return current;
        }
        current = next;
    }
}

/// A candidate mod name prepared for matching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCandidate {
    pub raw_name: String,
    pub cleaned_name: String,
    pub keywords: BTreeSet<String>,
}

/// Strategy that produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    ExactDirectory,
    CleanedSubstring,
    KeywordOverlap { overlap: usize },
}

/// A resolved candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchOutcome {
    pub directory_id: String,
    pub strategy: MatchStrategy,
}

/// Best keyword-overlap entry seen so far
struct KeywordHit<'a> {
    entry: &'a ModDescriptor,
    overlap: usize,
    token_count: usize,
}

impl KeywordHit<'_> {
    /// Higher overlap, then higher overlap ratio, then lexicographically smaller id
    fn beats(&self, other: &KeywordHit<'_>) -> bool {
        let ratio = (self.overlap * other.token_count).cmp(&(other.overlap * self.token_count));
        match self.overlap.cmp(&other.overlap).then(ratio) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => self.entry.directory_id < other.entry.directory_id,
        }
    }
}

/// Maps free-text candidate names onto enabled catalog entries
#[derive(Debug, Clone)]
pub struct FuzzyModMatcher {
    stopwords: HashSet<String>,
    min_token_len: usize,
    min_candidate_len: usize,
}

impl Default for FuzzyModMatcher {
    fn default() -> Self {
        Self::new(&MatcherConfig::default())
    }
}

impl FuzzyModMatcher {
    pub fn new(config: &MatcherConfig) -> Self {
        let stopwords = config
            .stopwords
            .iter()
            .chain(config.game_names.iter())
            .map(|w| w.to_lowercase())
            .collect();
        Self {
            stopwords,
            min_token_len: config.min_token_len,
            min_candidate_len: config.min_candidate_len,
        }
    }

    /// Significant lowercase tokens of a name
    pub fn keywords(&self, name: &str) -> BTreeSet<String> {
        name.split(TOKEN_SEPARATORS)
            .map(|t| t.trim().to_lowercase())
            .filter(|t| t.chars().count() >= self.min_token_len && !self.stopwords.contains(t))
            .collect()
    }

    pub fn candidate(&self, raw_name: &str) -> MatchCandidate {
        MatchCandidate {
            raw_name: raw_name.to_string(),
            cleaned_name: clean_mod_name(raw_name),
            keywords: self.keywords(raw_name),
        }
    }

    /// Resolve a candidate name to a directory id of an enabled catalog entry
    pub fn resolve(&self, candidate: &str, catalog: &[ModDescriptor]) -> Option<String> {
        self.resolve_detailed(candidate, catalog)
            .map(|outcome| outcome.directory_id)
    }

    /// Like [`resolve`](Self::resolve), also reporting which strategy matched
    pub fn resolve_detailed(&self, candidate: &str, catalog: &[ModDescriptor]) -> Option<MatchOutcome> {
        let candidate = self.candidate(candidate);
        let enabled: Vec<&ModDescriptor> = catalog.iter().filter(|m| m.enabled).collect();

        if let Some(entry) = enabled.iter().find(|m| m.directory_id == candidate.raw_name) {
            return Some(outcome(entry, MatchStrategy::ExactDirectory));
        }

        if let Some(entry) = self.substring_match(&candidate, &enabled) {
            return Some(outcome(entry, MatchStrategy::CleanedSubstring));
        }

        self.keyword_match(&candidate, &enabled).map(|hit| {
            outcome(
                hit.entry,
                MatchStrategy::KeywordOverlap {
                    overlap: hit.overlap,
                },
            )
        })
    }

    fn substring_match<'a>(
        &self,
        candidate: &MatchCandidate,
        enabled: &[&'a ModDescriptor],
    ) -> Option<&'a ModDescriptor> {
        let needle = candidate.cleaned_name.to_lowercase();
        if needle.chars().count() < self.min_candidate_len {
            return None;
        }

        enabled.iter().copied().find(|entry| {
            [&entry.display_name, &entry.directory_id].iter().any(|name| {
                let cleaned = clean_mod_name(name).to_lowercase();
                cleaned.chars().count() >= self.min_candidate_len
                    && (cleaned.contains(&needle) || needle.contains(&cleaned))
            })
        })
    }

    fn keyword_match<'a>(
        &self,
        candidate: &MatchCandidate,
        enabled: &[&'a ModDescriptor],
    ) -> Option<KeywordHit<'a>> {
        if candidate.keywords.is_empty() {
            return None;
        }
        let required = candidate.keywords.len().min(2);

        let mut best: Option<KeywordHit<'a>> = None;
        for entry in enabled.iter().copied() {
            let mut tokens = self.keywords(&entry.display_name);
            tokens.extend(self.keywords(&entry.directory_id));

            let overlap = candidate.keywords.intersection(&tokens).count();
            if overlap < required {
                continue;
            }

            let hit = KeywordHit {
                entry,
                overlap,
                token_count: tokens.len(),
            };
            if best.as_ref().map_or(true, |current| hit.beats(current)) {
                best = Some(hit);
            }
        }

        if let Some(hit) = &best {
            tracing::debug!(
                "Keyword match '{}' -> '{}' ({} shared tokens)",
                candidate.raw_name,
                hit.entry.directory_id,
                hit.overlap
            );
        }
        best
    }
}

fn outcome(entry: &ModDescriptor, strategy: MatchStrategy) -> MatchOutcome {
    MatchOutcome {
        directory_id: entry.directory_id.clone(),
        strategy,
    }
}
