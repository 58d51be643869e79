//! User profile and fact merging.
//!
//! The profile is a single per-user record owned by the store; every entry
//! save funnels newly extracted facts through `merge_facts`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::entry::monotonic_now_ms;

/// Accumulated persistent self-model for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Deduplicated fact strings accumulated across entries
    pub core_memories: Vec<String>,

    /// Epoch ms of the last successful merge
    pub last_updated: i64,
}

impl UserProfile {
    /// Empty default used when no profile exists or a read fails.
    pub fn empty() -> Self {
        Self {
            core_memories: Vec::new(),
            last_updated: monotonic_now_ms(),
        }
    }

    /// Merge new facts into this profile and stamp `last_updated`.
    pub fn apply_facts(&mut self, new_facts: &[String]) {
        self.core_memories = merge_facts(&self.core_memories, new_facts);
        self.last_updated = monotonic_now_ms();
    }
}

/// Set union by exact, case-sensitive string equality.
///
/// No normalization and no semantic similarity check; the result is
/// guaranteed duplicate-free. First occurrence wins, so existing facts keep
/// their position.
pub fn merge_facts(existing: &[String], new_facts: &[String]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut merged = Vec::with_capacity(existing.len() + new_facts.len());

    for fact in existing.iter().chain(new_facts.iter()) {
        if seen.insert(fact.as_str()) {
            merged.push(fact.clone());
        }
    }

    merged
}
