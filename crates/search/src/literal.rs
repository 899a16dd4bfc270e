use ratebook_protocol::{CatalogConfig, CatalogSource, SearchHit};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Hits from one database.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseHits {
    pub database: String,
    pub name: String,
    pub hits: Vec<SearchHit>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SearchState {
    pub query: String,
    pub loading: bool,
    pub groups: Vec<DatabaseHits>,
    pub error: Option<String>,
}

impl SearchState {
    pub fn total_hits(&self) -> usize {
        self.groups.iter().map(|group| group.hits.len()).sum()
    }
}

/// Literal substring search across every configured database.
pub struct LiteralSearch {
    source: Arc<dyn CatalogSource>,
    config: CatalogConfig,
    request_seq: AtomicU64,
    state_tx: watch::Sender<SearchState>,
}

impl LiteralSearch {
    pub fn new(source: Arc<dyn CatalogSource>, config: CatalogConfig) -> Self {
        let (state_tx, _) = watch::channel(SearchState::default());
        Self {
            source,
            config,
            request_seq: AtomicU64::new(0),
            state_tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> SearchState {
        self.state_tx.borrow().clone()
    }

    /// Returns `None` when a newer search started before this one resolved.
    pub async fn search_all(&self, term: &str) -> Option<SearchState> {
        let request = self.request_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let term = term.trim();
        if term.is_empty() {
            return Some(self.publish(SearchState::default()));
        }

        self.publish(SearchState {
            query: term.to_string(),
            loading: true,
            ..SearchState::default()
        });

        let lookups = self.config.databases.iter().map(|db| async move {
            let result = self.source.search(&db.id, term).await;
            (db, result)
        });
        let results = futures::future::join_all(lookups).await;

        if self.request_seq.load(Ordering::SeqCst) != request {
            log::debug!("Discarding stale search results for `{term}`");
            return None;
        }

        let mut groups = Vec::new();
        let mut first_error = None;
        for (db, result) in results {
            match result {
                Ok(hits) if hits.is_empty() => {}
                Ok(hits) => groups.push(DatabaseHits {
                    database: db.id.clone(),
                    name: db.name.clone(),
                    hits,
                }),
                Err(err) => {
                    log::warn!("Search in {} failed: {err}", db.id);
                    first_error.get_or_insert_with(|| err.to_string());
                }
            }
        }

        let error = if groups.is_empty() { first_error } else { None };
        Some(self.publish(SearchState {
            query: term.to_string(),
            loading: false,
            groups,
            error,
        }))
    }

    fn publish(&self, state: SearchState) -> SearchState {
        self.state_tx.send_replace(state.clone());
        state
    }
}
