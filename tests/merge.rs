//! Fact Merge Tests
//!
//! Union semantics, idempotence, and the lastUpdated side effect of the
//! profile merge path.

use vocalog::domain::{merge_facts, UserProfile};

fn facts(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_union_semantics() {
    let merged = merge_facts(&facts(&["A", "B"]), &facts(&["B", "C"]));

    assert_eq!(merged.len(), 3);
    assert!(merged.contains(&"A".to_string()));
    assert!(merged.contains(&"B".to_string()));
    assert!(merged.contains(&"C".to_string()));
}

#[test]
fn test_no_duplicates_regardless_of_input_order() {
    let forward = merge_facts(&facts(&["A", "B"]), &facts(&["B", "C"]));
    let reversed = merge_facts(&facts(&["B", "A"]), &facts(&["C", "B"]));

    let mut forward_sorted = forward.clone();
    forward_sorted.sort();
    let mut reversed_sorted = reversed.clone();
    reversed_sorted.sort();

    assert_eq!(forward_sorted, reversed_sorted);
    assert_eq!(forward.len(), 3);
}

#[test]
fn test_idempotence() {
    let base = facts(&["walks the dog every morning", "allergic to peanuts"]);
    let new = facts(&["allergic to peanuts", "plays piano"]);

    let once = merge_facts(&base, &new);
    let twice = merge_facts(&once, &new);

    assert_eq!(once, twice);
}

#[test]
fn test_exact_string_equality_only() {
    // No normalization: case and whitespace differences are distinct facts
    let merged = merge_facts(
        &facts(&["Plays piano"]),
        &facts(&["plays piano", "Plays piano "]),
    );
    assert_eq!(merged.len(), 3);
}

#[test]
fn test_merge_with_empty_inputs() {
    assert!(merge_facts(&[], &[]).is_empty());
    assert_eq!(merge_facts(&facts(&["A"]), &[]), facts(&["A"]));
    assert_eq!(merge_facts(&[], &facts(&["A"])), facts(&["A"]));
}

#[test]
fn test_apply_facts_stamps_last_updated() {
    let mut profile = UserProfile {
        core_memories: facts(&["A"]),
        last_updated: 1,
    };

    profile.apply_facts(&facts(&["B"]));

    assert_eq!(profile.core_memories, facts(&["A", "B"]));
    assert!(profile.last_updated > 1);
}
