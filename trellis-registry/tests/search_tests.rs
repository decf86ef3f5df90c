use pretty_assertions::assert_eq;
use proptest::prelude::*;
use trellis_registry::{
    levenshtein, normalized_levenshtein, ComponentAddress, IndexEntry, SearchIndex,
};

fn entry(id: &str, version: &str, name: &str, tags: &[&str]) -> IndexEntry {
    IndexEntry {
        address: ComponentAddress::new("alice", id, version).unwrap(),
        name: name.to_string(),
        description: String::new(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        author: "alice".to_string(),
    }
}

// ── Distance ─────────────────────────────────────────────────────

#[test]
fn levenshtein_known_values() {
    assert_eq!(levenshtein("", ""), 0);
    assert_eq!(levenshtein("abc", ""), 3);
    assert_eq!(levenshtein("kitten", "sitting"), 3);
    assert_eq!(levenshtein("flaw", "lawn"), 2);
    assert_eq!(levenshtein("héllo", "hello"), 1);
}

#[test]
fn normalized_distance_of_empty_strings_is_zero() {
    assert_eq!(normalized_levenshtein("", ""), 0.0);
    assert_eq!(normalized_levenshtein("abc", ""), 1.0);
}

// ── Index ────────────────────────────────────────────────────────

#[test]
fn upsert_replaces_by_component_id() {
    let mut index = SearchIndex::new();
    index.upsert(entry("widget", "1.0.0", "Widget", &[]));
    index.upsert(entry("widget", "2.0.0", "Widget Two", &[]));
    assert_eq!(index.len(), 1);
    assert_eq!(index.get("widget").unwrap().name, "Widget Two");
}

#[test]
fn remove_requires_matching_address() {
    let mut index = SearchIndex::new();
    index.upsert(entry("widget", "2.0.0", "Widget", &[]));

    let stale = ComponentAddress::new("alice", "widget", "1.0.0").unwrap();
    assert!(!index.remove(&stale));
    assert_eq!(index.len(), 1);

    let current = ComponentAddress::new("alice", "widget", "2.0.0").unwrap();
    assert!(index.remove(&current));
    assert!(index.is_empty());
}

#[test]
fn substring_hits_rank_before_fuzzy_hits() {
    let mut index = SearchIndex::new();
    index.upsert(entry("calendar", "1.0.0", "Calendar", &["dates"]));
    index.upsert(entry("calender", "1.0.0", "Calender Clone", &[]));

    let hits = index.search("calendar", 10, 0.4);
    let names: Vec<&str> = hits.iter().map(|h| h.entry.name.as_str()).collect();
    assert_eq!(names, vec!["Calendar", "Calender Clone"]);
    assert_eq!(hits[0].distance, 0.0);
    assert!(hits[1].distance > 0.0);
}

#[test]
fn tags_are_searched_case_insensitively() {
    let mut index = SearchIndex::new();
    index.upsert(entry("grid", "1.0.0", "Grid", &["Layout"]));
    index.upsert(entry("button", "1.0.0", "Button", &["input"]));

    let hits = index.search("LAYOUT", 10, 0.4);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].entry.name, "Grid");
}

#[test]
fn multi_word_query_averages_token_distances() {
    let mut index = SearchIndex::new();
    index.upsert(entry("picker", "1.0.0", "Color Picker", &[]));

    // Each token is one edit away from a word.
    let hits = index.search("colr pickr", 10, 0.4);
    assert_eq!(hits.len(), 1);
    let expected = (1.0 / 5.0 + 1.0 / 6.0) / 2.0;
    assert!((hits[0].distance - expected).abs() < 1e-9);
}

#[test]
fn ties_break_by_name() {
    let mut index = SearchIndex::new();
    index.upsert(entry("b", "1.0.0", "Beta widget", &[]));
    index.upsert(entry("a", "1.0.0", "Alpha widget", &[]));

    let names: Vec<String> = index
        .search("widget", 10, 0.4)
        .into_iter()
        .map(|h| h.entry.name)
        .collect();
    assert_eq!(names, vec!["Alpha widget", "Beta widget"]);
}

// ── Properties ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn normalized_distance_is_bounded(a in "[a-z]{0,12}", b in "[a-z]{0,12}") {
        let d = normalized_levenshtein(&a, &b);
        prop_assert!((0.0..=1.0).contains(&d));
    }

    #[test]
    fn distance_is_symmetric(a in "[a-z]{0,12}", b in "[a-z]{0,12}") {
        prop_assert_eq!(levenshtein(&a, &b), levenshtein(&b, &a));
    }

    #[test]
    fn distance_to_self_is_zero(a in "\\PC{0,16}") {
        prop_assert_eq!(levenshtein(&a, &a), 0);
    }

    #[test]
    fn results_respect_limit_threshold_and_order(
        names in prop::collection::vec("[a-z]{3,8}", 1..12),
        query in "[a-z]{2,6}",
        limit in 0usize..6,
    ) {
        let mut index = SearchIndex::new();
        for (i, name) in names.iter().enumerate() {
            index.upsert(entry(&format!("c{i}"), "1.0.0", name, &[]));
        }

        let hits = index.search(&query, limit, 0.4);
        prop_assert!(hits.len() <= limit);
        prop_assert!(hits.iter().all(|h| h.distance <= 0.4));
        prop_assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }
}
