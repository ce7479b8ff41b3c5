use std::collections::HashMap;

use tracing::warn;

use crate::models::{EventResult, PlacementField, ResultKind, ResultsDocument, Winner};
use crate::services::config_loader::MergePolicy;

/// One source row, tagged by which array it arrived in and with every
/// placement flattened to a plain winner list.
#[derive(Debug, Clone)]
pub struct NormalizedEntry {
    pub kind: ResultKind,
    pub item: String,
    pub first: Vec<Winner>,
    pub second: Vec<Winner>,
    pub third: Vec<Winner>,
}

/// Flatten the two source arrays into tagged entries, individual rows
/// first. Rows without an item land under the empty-string key, one
/// shared catch-all bucket.
pub fn normalize(document: ResultsDocument) -> Vec<NormalizedEntry> {
    let flatten = |field: Option<PlacementField>| {
        field.map(PlacementField::into_winners).unwrap_or_default()
    };

    document
        .individual
        .into_iter()
        .map(|entry| (ResultKind::Individual, entry))
        .chain(
            document
                .group
                .into_iter()
                .map(|entry| (ResultKind::Group, entry)),
        )
        .map(|(kind, entry)| NormalizedEntry {
            kind,
            item: entry.item.unwrap_or_default(),
            first: flatten(entry.first),
            second: flatten(entry.second),
            third: flatten(entry.third),
        })
        .collect()
}

/// Fold entries by event name in first-insertion order. The sheet emits
/// one row per placement for some events, so placements accumulate in
/// arrival order across rows sharing the item.
pub fn aggregate(
    entries: Vec<NormalizedEntry>,
    policy: MergePolicy,
) -> Result<Vec<EventResult>, String> {
    let mut results: Vec<EventResult> = Vec::new();
    let mut index_by_item: HashMap<String, usize> = HashMap::new();

    for entry in entries {
        match index_by_item.get(&entry.item) {
            Some(&slot) => {
                let result = &mut results[slot];
                if result.kind != entry.kind {
                    match policy {
                        MergePolicy::Reject => {
                            return Err(format!(
                                "Event \"{}\" appears in both individual and group results",
                                entry.item
                            ));
                        }
                        MergePolicy::LastSeen => {
                            warn!(
                                "Event \"{}\" listed under both kinds, keeping {}",
                                entry.item,
                                entry.kind.label()
                            );
                            result.kind = entry.kind;
                        }
                        MergePolicy::FirstSeen => {
                            warn!(
                                "Event \"{}\" listed under both kinds, keeping {}",
                                entry.item,
                                result.kind.label()
                            );
                        }
                    }
                }
                result.first.extend(entry.first);
                result.second.extend(entry.second);
                result.third.extend(entry.third);
            }
            None => {
                index_by_item.insert(entry.item.clone(), results.len());
                results.push(EventResult {
                    kind: entry.kind,
                    item: entry.item,
                    first: entry.first,
                    second: entry.second,
                    third: entry.third,
                });
            }
        }
    }

    Ok(results)
}

pub fn aggregate_document(
    document: ResultsDocument,
    policy: MergePolicy,
) -> Result<Vec<EventResult>, String> {
    aggregate(normalize(document), policy)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Individual,
    Group,
}

impl CategoryFilter {
    pub const ALL: [CategoryFilter; 3] = [
        CategoryFilter::All,
        CategoryFilter::Individual,
        CategoryFilter::Group,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CategoryFilter::All => "All",
            CategoryFilter::Individual => "Individual",
            CategoryFilter::Group => "Group",
        }
    }

    pub fn matches(self, kind: ResultKind) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Individual => kind == ResultKind::Individual,
            CategoryFilter::Group => kind == ResultKind::Group,
        }
    }
}

/// Case-insensitive substring match over the event name or any winner's
/// serialized form. An empty term matches everything.
pub fn matches_search(result: &EventResult, needle_lower: &str) -> bool {
    if needle_lower.is_empty() {
        return true;
    }
    if result.item.to_lowercase().contains(needle_lower) {
        return true;
    }
    result.placements().iter().any(|(_, winners)| {
        winners
            .iter()
            .any(|winner| winner.search_blob().to_lowercase().contains(needle_lower))
    })
}

pub fn filter_results<'a>(
    results: &'a [EventResult],
    search_term: &str,
    category: CategoryFilter,
) -> Vec<&'a EventResult> {
    let needle = search_term.to_lowercase();
    results
        .iter()
        .filter(|result| category.matches(result.kind) && matches_search(result, &needle))
        .collect()
}

/// Presentation-only ordering: shorter cards first so the grid packs
/// evenly. Stable, so the aggregation order breaks ties.
pub fn sort_for_display(filtered: &mut [&EventResult]) {
    filtered.sort_by_key(|result| result.valid_winner_count());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(json: &str) -> ResultsDocument {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn normalizer_always_yields_placement_arrays() {
        let doc = document(
            r#"{"individual":[{"item":"Essay"},{"item":"Quiz","first":{"name":"Alice"}}],"group":[{"item":"Drama","second":["TeamA","TeamB"]}]}"#,
        );
        let entries = normalize(doc);
        assert_eq!(entries.len(), 3);
        assert!(entries[0].first.is_empty());
        assert!(entries[0].second.is_empty());
        assert!(entries[0].third.is_empty());
        assert_eq!(entries[1].first.len(), 1);
        assert_eq!(entries[2].second.len(), 2);
    }

    #[test]
    fn aggregator_merges_rows_sharing_an_item_in_arrival_order() {
        let doc = document(
            r#"{"individual":[
                {"item":"Quiz","first":{"name":"Alice"}},
                {"item":"Essay","first":{"name":"Cara"}},
                {"item":"Quiz","second":{"name":"Bob"},"first":{"name":"Dan"}}
            ],"group":[]}"#,
        );
        let results = aggregate(normalize(doc), MergePolicy::LastSeen).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].item, "Quiz");
        assert_eq!(results[1].item, "Essay");
        let first_names: Vec<String> = results[0]
            .first
            .iter()
            .map(|w| w.search_blob())
            .collect();
        assert!(first_names[0].contains("Alice"));
        assert!(first_names[1].contains("Dan"));
        assert_eq!(results[0].second.len(), 1);
    }

    #[test]
    fn mixed_kind_item_follows_configured_policy() {
        let json = r#"{"individual":[{"item":"Quiz","first":{"name":"Alice","department":"CS","year":"2nd"}}],"group":[{"item":"Quiz","first":"TeamA"}]}"#;

        let merged = aggregate(normalize(document(json)), MergePolicy::LastSeen).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].kind, ResultKind::Group);
        assert_eq!(merged[0].first.len(), 2);

        let first_seen = aggregate(normalize(document(json)), MergePolicy::FirstSeen).unwrap();
        assert_eq!(first_seen[0].kind, ResultKind::Individual);
        assert_eq!(first_seen[0].first.len(), 2);

        let rejected = aggregate(normalize(document(json)), MergePolicy::Reject);
        assert!(rejected.unwrap_err().contains("Quiz"));
    }

    #[test]
    fn itemless_rows_share_one_catch_all_bucket() {
        let doc = document(
            r#"{"individual":[{"first":{"name":"Alice"}},{"second":{"name":"Bob"}}],"group":[]}"#,
        );
        let results = aggregate(normalize(doc), MergePolicy::LastSeen).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].item, "");
        assert_eq!(results[0].first.len(), 1);
        assert_eq!(results[0].second.len(), 1);
    }

    #[test]
    fn empty_search_and_all_category_is_identity() {
        let doc = document(
            r#"{"individual":[{"item":"Quiz","first":{"name":"Alice"}}],"group":[{"item":"Drama","first":"TeamA"}]}"#,
        );
        let results = aggregate(normalize(doc), MergePolicy::LastSeen).unwrap();
        let filtered = filter_results(&results, "", CategoryFilter::All);
        assert_eq!(filtered.len(), results.len());
    }

    #[test]
    fn search_is_case_insensitive_over_names_and_items() {
        let doc = document(
            r#"{"individual":[{"item":"Quiz","first":{"name":"Alice"}}],"group":[{"item":"Drama","first":"TeamA"}]}"#,
        );
        let results = aggregate(normalize(doc), MergePolicy::LastSeen).unwrap();

        let by_winner = filter_results(&results, "alice", CategoryFilter::All);
        assert_eq!(by_winner.len(), 1);
        assert_eq!(by_winner[0].item, "Quiz");

        let by_item = filter_results(&results, "DRAMA", CategoryFilter::All);
        assert_eq!(by_item.len(), 1);

        assert!(filter_results(&results, "nobody", CategoryFilter::All).is_empty());
    }

    #[test]
    fn category_filter_narrows_by_kind() {
        let doc = document(
            r#"{"individual":[{"item":"Quiz","first":{"name":"Alice"}}],"group":[{"item":"Drama","first":"TeamA"}]}"#,
        );
        let results = aggregate(normalize(doc), MergePolicy::LastSeen).unwrap();
        let groups = filter_results(&results, "", CategoryFilter::Group);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].item, "Drama");
    }

    #[test]
    fn display_sort_orders_by_valid_winner_count() {
        let doc = document(
            r#"{"individual":[],"group":[
                {"item":"Drama","first":["TeamA","TeamB"],"second":"TeamC"},
                {"item":"Mime","first":"TeamD"}
            ]}"#,
        );
        let results = aggregate(normalize(doc), MergePolicy::LastSeen).unwrap();
        let mut filtered = filter_results(&results, "", CategoryFilter::All);
        sort_for_display(&mut filtered);
        assert_eq!(filtered[0].item, "Mime");
        assert_eq!(filtered[1].item, "Drama");
    }
}
