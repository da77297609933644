use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};

use protocol::KeywordPayload;

pub const DEFAULT_KEYWORDS: [&str; 20] = [
    "turf",
    "shoot",
    "weapon",
    "hit",
    "deal",
    "crew",
    "rival",
    "pack",
    "smash",
    "stash",
    "bullet",
    "knife",
    "trigger",
    "war",
    "retaliate",
    "threat",
    "trap",
    "blood",
    "cartel",
    "recruit",
];

/// Immutable set of lowercase risk terms, tagged with the store version it was
/// published under.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lexicon {
    version: u64,
    terms: BTreeSet<String>,
}

impl Lexicon {
    pub fn from_terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            version: 0,
            terms: terms
                .into_iter()
                .filter_map(|term| normalize_term(term.as_ref()))
                .collect(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::from_terms(DEFAULT_KEYWORDS)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn contains(&self, token: &str) -> bool {
        self.terms.contains(token)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(String::as_str)
    }

    /// Terms from `payload` that are not already present, normalized.
    fn missing_terms(&self, payload: &KeywordPayload) -> BTreeSet<String> {
        payload
            .terms()
            .filter_map(normalize_term)
            .filter(|term| !self.terms.contains(term))
            .collect()
    }
}

/// Lowercases and trims; blank terms are dropped.
pub fn normalize_term(term: &str) -> Option<String> {
    let trimmed = term.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Shared keyword lexicon.
///
/// Merges are union only and publish a new snapshot; callers classify against the
/// snapshot they hold, so a merge never changes a pass that is already running.
#[derive(Debug)]
pub struct LexiconStore {
    current: RwLock<Arc<Lexicon>>,
}

impl LexiconStore {
    pub fn new(seed: Lexicon) -> Self {
        Self {
            current: RwLock::new(Arc::new(seed)),
        }
    }

    pub fn snapshot(&self) -> Arc<Lexicon> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Unions every category of `payload` into the lexicon and returns the
    /// resulting snapshot. The version only moves when a new term was added.
    pub fn merge(&self, payload: &KeywordPayload) -> Arc<Lexicon> {
        if payload.is_empty() {
            return self.snapshot();
        }
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let added = guard.missing_terms(payload);
        if added.is_empty() {
            return Arc::clone(&guard);
        }
        let mut next = Lexicon::clone(&guard);
        next.version += 1;
        let added_count = added.len();
        next.terms.extend(added);
        let next = Arc::new(next);
        *guard = Arc::clone(&next);
        tracing::info!(
            event = "lexicon.merged",
            version = next.version,
            added = added_count,
            total = next.len(),
            "lexicon updated"
        );
        next
    }
}

impl Default for LexiconStore {
    fn default() -> Self {
        Self::new(Lexicon::with_defaults())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(high: &[&str], medium: &[&str], low: &[&str]) -> KeywordPayload {
        let owned = |items: &[&str]| items.iter().map(|item| item.to_string()).collect();
        KeywordPayload {
            high: owned(high),
            medium: owned(medium),
            low: owned(low),
        }
    }

    #[test]
    fn defaults_are_seeded() {
        let lexicon = Lexicon::with_defaults();
        assert_eq!(lexicon.len(), DEFAULT_KEYWORDS.len());
        assert!(lexicon.contains("retaliate"));
        assert_eq!(lexicon.version(), 0);
    }

    #[test]
    fn terms_are_normalized() {
        let lexicon = Lexicon::from_terms(["  Coffee ", "COFFEE", "", "tea"]);
        assert_eq!(lexicon.iter().collect::<Vec<_>>(), vec!["coffee", "tea"]);
    }

    #[test]
    fn merge_flattens_all_categories() {
        let store = LexiconStore::default();
        let merged = store.merge(&payload(&["coffee"], &["Tea"], &["juice"]));
        assert!(merged.contains("coffee"));
        assert!(merged.contains("tea"));
        assert!(merged.contains("juice"));
        assert_eq!(merged.len(), DEFAULT_KEYWORDS.len() + 3);
        assert_eq!(merged.version(), 1);
    }

    #[test]
    fn merge_is_monotone_and_idempotent() {
        let store = LexiconStore::default();
        let before = store.snapshot();
        let request = payload(&["coffee", "shoot"], &[], &[]);
        let first = store.merge(&request);
        assert!(before.iter().all(|term| first.contains(term)));
        let second = store.merge(&request);
        assert_eq!(first, second);
        assert_eq!(second.version(), 1);
    }

    #[test]
    fn held_snapshot_is_not_affected_by_later_merges() {
        let store = LexiconStore::default();
        let held = store.snapshot();
        store.merge(&payload(&[], &["coffee"], &[]));
        assert!(!held.contains("coffee"));
        assert!(store.snapshot().contains("coffee"));
    }

    #[test]
    fn empty_payload_keeps_snapshot() {
        let store = LexiconStore::default();
        let before = store.snapshot();
        let after = store.merge(&KeywordPayload::default());
        assert!(Arc::ptr_eq(&before, &after));
    }
}
