//! Typeahead suggestions across stored and live seasons.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::fetch::{ApiEntry, LeaderboardClient};
use crate::models::{normalize_handle, normalize_search_term, Season, Timeframe};
use crate::storage::LeaderboardStore;

/// Rows ranked below this are never suggested.
pub const SUGGESTION_RANK_CEILING: u32 = 1500;

/// Maximum number of suggestions returned.
pub const MAX_SUGGESTIONS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub username: String,
    pub handle: String,
    pub rank: u32,
    pub season: Season,
}

fn live_matches(entry: &ApiEntry, term: &str) -> bool {
    normalize_handle(&entry.username).contains(term)
        || entry.name().to_lowercase().contains(term)
}

/// Collect candidates from the newest stored season down, then the live
/// 30d board, keep the best rank per handle and return the top few.
///
/// Failures on either side only shrink the candidate pool.
pub async fn suggest(
    store: &LeaderboardStore,
    client: &LeaderboardClient,
    query: &str,
) -> Vec<Suggestion> {
    let term = normalize_search_term(query);
    if term.is_empty() {
        return Vec::new();
    }

    let mut candidates = Vec::new();

    for season in Season::HISTORICAL.into_iter().rev() {
        let rows = match store.entries_for_lookup(season) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Skipping {} for suggestions: {}", season, e);
                continue;
            }
        };

        candidates.extend(
            rows.into_iter()
                .filter(|e| e.rank <= SUGGESTION_RANK_CEILING && e.matches_substring(&term))
                .map(|e| Suggestion {
                    handle: e.normalized_handle(),
                    username: e.username,
                    rank: e.rank,
                    season,
                }),
        );
    }

    let live = client
        .fetch_all(Timeframe::Month, client.max_pages())
        .await;
    candidates.extend(
        live.into_iter()
            .filter(|e| e.rank <= SUGGESTION_RANK_CEILING && live_matches(e, &term))
            .map(|e| Suggestion {
                handle: normalize_handle(&e.username),
                username: e.name().to_string(),
                rank: e.rank,
                season: Season::LIVE,
            }),
    );

    let suggestions = best_per_handle(candidates);
    debug!("{} suggestions for {}", suggestions.len(), term);
    suggestions
}

/// Keep the lowest rank per handle, ordered by rank, capped.
fn best_per_handle(candidates: Vec<Suggestion>) -> Vec<Suggestion> {
    let mut best: HashMap<String, Suggestion> = HashMap::new();
    for candidate in candidates {
        if candidate.handle.is_empty() {
            continue;
        }
        match best.get(&candidate.handle) {
            Some(existing) if existing.rank <= candidate.rank => {}
            _ => {
                best.insert(candidate.handle.clone(), candidate);
            }
        }
    }

    let mut out: Vec<Suggestion> = best.into_values().collect();
    out.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.handle.cmp(&b.handle)));
    out.truncate(MAX_SUGGESTIONS);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::{api_entry, PageScript, ScriptedSource};
    use crate::models::{MindshareUnit, NewEntry};
    use crate::storage::StorageConfig;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn new_entry(rank: u32, username: &str, handle: &str) -> NewEntry {
        NewEntry {
            rank,
            username: username.to_string(),
            handle: handle.to_string(),
            mindshare: 50.0,
            mindshare_unit: MindshareUnit::PrizeUsd,
        }
    }

    fn store(temp_dir: &TempDir) -> LeaderboardStore {
        LeaderboardStore::new(StorageConfig::new(temp_dir.path().to_path_buf()))
    }

    #[tokio::test]
    async fn test_same_handle_keeps_best_rank() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        store
            .save_batch(Season::S1, vec![new_entry(40, "Mina", "@mina_eth")])
            .unwrap();
        store
            .save_batch(Season::S3, vec![new_entry(12, "Mina E", "x.com/Mina_Eth")])
            .unwrap();

        let source = ScriptedSource::new();
        source.set_pages(
            Timeframe::Month,
            vec![PageScript::Rows(vec![api_entry(5, "Mina_Eth", "Mina")])],
        );
        let client = LeaderboardClient::new(Arc::new(source));

        let suggestions = suggest(&store, &client, "mina").await;

        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].rank, 5);
        assert_eq!(suggestions[0].handle, "mina_eth");
        assert_eq!(suggestions[0].season, Season::S5);
    }

    #[tokio::test]
    async fn test_capped_and_sorted_by_rank() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        store
            .save_batch(
                Season::S2,
                vec![
                    new_entry(9, "Dev Nine", "@dev9"),
                    new_entry(3, "Dev Three", "@dev3"),
                    new_entry(7, "Dev Seven", "@dev7"),
                    new_entry(1, "Dev One", "@dev1"),
                    new_entry(5, "Dev Five", "@dev5"),
                    new_entry(2, "Someone Else", "@other"),
                ],
            )
            .unwrap();
        let client = LeaderboardClient::new(Arc::new(ScriptedSource::new()));

        let suggestions = suggest(&store, &client, "dev").await;

        let ranks: Vec<u32> = suggestions.iter().map(|s| s.rank).collect();
        assert_eq!(ranks, vec![1, 3, 5, 7]);
    }

    #[tokio::test]
    async fn test_rank_ceiling_excludes_deep_rows() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        store
            .save_batch(Season::S4, vec![new_entry(1501, "Deep", "@deep_user")])
            .unwrap();
        let client = LeaderboardClient::new(Arc::new(ScriptedSource::new()));

        assert!(suggest(&store, &client, "deep").await.is_empty());
    }

    #[tokio::test]
    async fn test_live_failure_still_returns_stored() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        store
            .save_batch(Season::S1, vec![new_entry(20, "Kai", "@kai")])
            .unwrap();
        let client = LeaderboardClient::new(Arc::new(ScriptedSource::with_pages(vec![
            PageScript::Status(503),
        ])));

        let suggestions = suggest(&store, &client, "@kai").await;

        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].season, Season::S1);
    }

    #[tokio::test]
    async fn test_empty_query_returns_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let source = Arc::new(ScriptedSource::new());
        let client = LeaderboardClient::new(source.clone());

        assert!(suggest(&store(&temp_dir), &client, " @ ").await.is_empty());
        assert_eq!(source.requests(), 0);
    }
}
