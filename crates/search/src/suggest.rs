use crate::error::{Result, SearchError};
use crate::fuzzy::{entry_score, matches_all_tokens, ScoringFields};
use crate::index_cache::SectionIndexCache;
use crate::text::{replace_last_token, QueryTokens};
use lru::LruCache;
use ratebook_protocol::{
    CatalogConfig, CatalogSource, IndexRecord, NavigationTarget, SuggestionBehavior,
    SuggestionCategory,
};
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub category: SuggestionCategory,
    pub database: String,
    pub code: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measure_unit: Option<String>,
    pub path_names: Vec<String>,
    pub path_codes: Vec<String>,
    pub depth: usize,
    pub score: f64,
}

impl Suggestion {
    fn from_record(
        category: SuggestionCategory,
        database: &str,
        record: &IndexRecord,
        score: f64,
    ) -> Self {
        Self {
            category,
            database: database.to_string(),
            code: record.code.clone(),
            name: record.name.clone(),
            measure_unit: record.measure_unit.clone(),
            path_names: record.path_names.clone(),
            path_codes: record.path_codes.clone(),
            depth: record.depth,
            score,
        }
    }

    /// Text written into the input when the suggestion fills the last token.
    pub fn canonical_text(&self) -> &str {
        match self.category {
            SuggestionCategory::Section => &self.name,
            SuggestionCategory::Work | SuggestionCategory::Resource => &self.code,
        }
    }

    pub fn target(&self) -> NavigationTarget {
        match self.category {
            SuggestionCategory::Section => {
                let mut path = self.path_codes.clone();
                path.push(self.code.clone());
                NavigationTarget::Section {
                    database: self.database.clone(),
                    path,
                }
            }
            SuggestionCategory::Work => NavigationTarget::Work {
                database: self.database.clone(),
                code: self.code.clone(),
                section_path: self.path_codes.clone(),
            },
            SuggestionCategory::Resource => NavigationTarget::Resource {
                code: self.code.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestionGroup {
    pub category: SuggestionCategory,
    pub items: Vec<Suggestion>,
}

/// What the suggestion box shows.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SuggestionState {
    pub query: String,
    pub groups: Vec<SuggestionGroup>,
    /// Flattened `groups`, in display order
    pub suggestions: Vec<Suggestion>,
    pub loading: bool,
    pub error: Option<String>,
}

impl SuggestionState {
    fn empty(query: &str) -> Self {
        Self {
            query: query.to_string(),
            ..Self::default()
        }
    }

    pub fn group(&self, category: SuggestionCategory) -> Option<&SuggestionGroup> {
        self.groups.iter().find(|group| group.category == category)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SuggestionOutcome {
    /// The input was rewritten and re-evaluated; `state` is `None` when a
    /// newer input superseded the evaluation.
    Filled {
        input: String,
        state: Option<SuggestionState>,
    },
    Navigate(NavigationTarget),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RemoteLookup {
    Works,
    Resources,
}

impl RemoteLookup {
    fn category(self) -> SuggestionCategory {
        match self {
            Self::Works => SuggestionCategory::Work,
            Self::Resources => SuggestionCategory::Resource,
        }
    }
}

type ResultKey = (String, SuggestionCategory, String);

struct CachedResult {
    stored_at: Instant,
    items: Vec<Suggestion>,
}

/// `Ok(None)`: the category was gated out and never fetched.
type Lookup = Result<Option<Vec<Suggestion>>>;

/// Keystroke-driven suggestion orchestrator.
///
/// Every call to [`SuggestionEngine::update`] takes a fresh request id; results
/// that resolve after a newer request started are dropped instead of
/// published, so the latest input always wins without cancelling in-flight
/// lookups.
pub struct SuggestionEngine {
    source: Arc<dyn CatalogSource>,
    config: CatalogConfig,
    index: SectionIndexCache,
    results: Mutex<LruCache<ResultKey, CachedResult>>,
    request_seq: AtomicU64,
    state_tx: watch::Sender<SuggestionState>,
}

impl SuggestionEngine {
    pub fn new(source: Arc<dyn CatalogSource>, config: CatalogConfig) -> Self {
        let capacity =
            NonZeroUsize::new(config.suggest.result_cache_capacity).unwrap_or(NonZeroUsize::MIN);
        let (state_tx, _) = watch::channel(SuggestionState::default());
        Self {
            index: SectionIndexCache::new(source.clone(), config.suggest.index_ttl()),
            source,
            config,
            results: Mutex::new(LruCache::new(capacity)),
            request_seq: AtomicU64::new(0),
            state_tx,
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn index_cache(&self) -> &SectionIndexCache {
        &self.index
    }

    pub fn subscribe(&self) -> watch::Receiver<SuggestionState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> SuggestionState {
        self.state_tx.borrow().clone()
    }

    /// Evaluate `input` against the default database.
    pub async fn update(&self, input: &str) -> Option<SuggestionState> {
        self.update_with_database(input, None).await
    }

    /// Evaluate `input`, returning the published state or `None` when a newer
    /// input superseded this one.
    pub async fn update_with_database(
        &self,
        input: &str,
        database: Option<&str>,
    ) -> Option<SuggestionState> {
        let request = self.request_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let query = QueryTokens::parse(input);
        if query.is_empty() {
            return Some(self.publish(SuggestionState::empty(input)));
        }

        let Some(database) = self.config.resolve_database(database) else {
            return Some(self.publish(SuggestionState {
                error: Some(SearchError::MissingDatabase.to_string()),
                ..SuggestionState::empty(input)
            }));
        };

        self.publish(SuggestionState {
            loading: true,
            ..SuggestionState::empty(input)
        });

        let debounce = self.config.suggest.debounce();
        if !debounce.is_zero() {
            tokio::time::sleep(debounce).await;
            if self.is_stale(request) {
                log::debug!("Suggestion request {request} superseded before dispatch");
                return None;
            }
        }

        let (sections, works, resources) = tokio::join!(
            self.section_suggestions(&database, &query),
            self.remote_suggestions(&database, &query, RemoteLookup::Works),
            self.remote_suggestions(&database, &query, RemoteLookup::Resources),
        );

        if self.is_stale(request) {
            log::debug!("Discarding stale suggestions for request {request}");
            return None;
        }

        let state = self.assemble(
            input,
            [
                (SuggestionCategory::Section, sections),
                (SuggestionCategory::Work, works),
                (SuggestionCategory::Resource, resources),
            ],
        );
        Some(self.publish(state))
    }

    /// Accept `suggestion` for the current `input`.
    pub async fn apply_suggestion(&self, input: &str, suggestion: &Suggestion) -> SuggestionOutcome {
        match self.config.suggest.category(suggestion.category).behavior {
            SuggestionBehavior::Navigate => SuggestionOutcome::Navigate(suggestion.target()),
            SuggestionBehavior::Fill => {
                let next = replace_last_token(input, suggestion.canonical_text());
                let state = self
                    .update_with_database(&next, Some(&suggestion.database))
                    .await;
                SuggestionOutcome::Filled { input: next, state }
            }
        }
    }

    fn is_stale(&self, request: u64) -> bool {
        self.request_seq.load(Ordering::SeqCst) != request
    }

    fn publish(&self, state: SuggestionState) -> SuggestionState {
        self.state_tx.send_replace(state.clone());
        state
    }

    async fn section_suggestions(&self, database: &str, query: &QueryTokens) -> Lookup {
        let cfg = &self.config.suggest.sections;
        if !query.meets_min_length(cfg.min_query_len) {
            return Ok(None);
        }
        let index = self.index.get(database).await?;
        let items = index
            .entries
            .iter()
            .filter(|entry| matches_all_tokens(&query.tokens, &entry.fields))
            .filter_map(|entry| {
                let score = entry_score(&query.tokens, &entry.fields, self.config.suggest.path_weight);
                (score >= cfg.min_score).then(|| {
                    Suggestion::from_record(SuggestionCategory::Section, database, &entry.record, score)
                })
            })
            .collect();
        Ok(Some(items))
    }

    async fn remote_suggestions(
        &self,
        database: &str,
        query: &QueryTokens,
        lookup: RemoteLookup,
    ) -> Lookup {
        let category = lookup.category();
        let cfg = self.config.suggest.category(category);
        if !query.has_lookup_token() || !query.meets_min_length(cfg.min_query_len) {
            return Ok(None);
        }

        let key = (database.to_string(), category, query.signature());
        if let Some(items) = self.cached(&key) {
            log::debug!("{category} suggestions cache hit for `{}`", key.2);
            return Ok(Some(items));
        }

        let limit = self.config.suggest.fetch_limit;
        let records = match lookup {
            RemoteLookup::Works => {
                self.source
                    .work_suggestions(database, &query.raw_last, limit)
                    .await?
            }
            RemoteLookup::Resources => {
                self.source
                    .resource_suggestions(database, &query.raw_last, limit)
                    .await?
            }
        };

        let items: Vec<Suggestion> = records
            .iter()
            .filter_map(|record| {
                let fields = ScoringFields::from_record(record);
                if !matches_all_tokens(&query.tokens, &fields) {
                    return None;
                }
                let score = entry_score(&query.tokens, &fields, self.config.suggest.path_weight);
                (score >= cfg.min_score)
                    .then(|| Suggestion::from_record(category, database, record, score))
            })
            .collect();

        self.results().put(
            key,
            CachedResult {
                stored_at: Instant::now(),
                items: items.clone(),
            },
        );
        Ok(Some(items))
    }

    fn cached(&self, key: &ResultKey) -> Option<Vec<Suggestion>> {
        let ttl = self.config.suggest.result_ttl();
        let mut results = self.results();
        let fresh = results.get(key)?.stored_at.elapsed() <= ttl;
        if fresh {
            return results.get(key).map(|cached| cached.items.clone());
        }
        results.pop(key);
        None
    }

    fn assemble(&self, input: &str, lookups: [(SuggestionCategory, Lookup); 3]) -> SuggestionState {
        let mut groups = Vec::new();
        let mut first_error = None;
        let mut any_success = false;

        for (category, lookup) in lookups {
            match lookup {
                Ok(Some(mut items)) => {
                    any_success = true;
                    rank(category, &mut items);
                    items.truncate(self.config.suggest.category(category).limit);
                    if !items.is_empty() {
                        groups.push(SuggestionGroup { category, items });
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    log::warn!("{category} suggestions failed: {err}");
                    first_error.get_or_insert_with(|| err.to_string());
                }
            }
        }

        apply_total_limit(&mut groups, self.config.suggest.total_limit);
        let suggestions = groups
            .iter()
            .flat_map(|group| group.items.iter().cloned())
            .collect();

        SuggestionState {
            query: input.to_string(),
            groups,
            suggestions,
            loading: false,
            error: if any_success { None } else { first_error },
        }
    }

    fn results(&self) -> MutexGuard<'_, LruCache<ResultKey, CachedResult>> {
        match self.results.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Score descending; ties go to shallower sections or lower codes.
fn rank(category: SuggestionCategory, items: &mut [Suggestion]) {
    items.sort_by(|a, b| {
        b.score.total_cmp(&a.score).then_with(|| match category {
            SuggestionCategory::Section => a.depth.cmp(&b.depth).then_with(|| a.code.cmp(&b.code)),
            SuggestionCategory::Work | SuggestionCategory::Resource => a.code.cmp(&b.code),
        })
    });
}

/// Spend the combined budget on groups in priority order.
fn apply_total_limit(groups: &mut Vec<SuggestionGroup>, total: usize) {
    groups.sort_by_key(|group| group.category);
    let mut budget = total;
    for group in groups.iter_mut() {
        let take = group.items.len().min(budget);
        group.items.truncate(take);
        budget -= take;
    }
    groups.retain(|group| !group.items.is_empty());
}
