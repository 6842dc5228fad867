//! Debounced search plus facet filtering over a replaceable corpus.
//!
//! Every query change is stamped with a sequence number. Search work runs on the blocking
//! pool and its result only reaches the displayed list if its number is still the latest
//! issued one, so a slow old search can never overwrite a newer one.

use crate::engine::SearchEngine;
use crate::error::{Result, SearchError};
use crate::facet::{FacetRegistry, FacetValue, FacetView};
use crate::scorer::{self, SearchResult};
use parking_lot::Mutex;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchPhase {
    Idle,
    Debouncing,
    Searching,
    Displaying,
}

/// What happened to a corpus handed to [`SearchFilter::reindex`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReindexOutcome {
    Installed { generation: u64, entities: usize },
    /// The build failed; the previously installed index stays in force.
    Retained { error: String },
    /// A newer corpus arrived while this one was being indexed.
    Superseded,
    Closed,
}

pub type SortOrder<E> = fn(&E, &E) -> Ordering;

struct State<E> {
    corpus: Arc<Vec<E>>,
    positions: HashMap<String, usize>,
    corpus_generation: u64,
    query: String,
    phase: SearchPhase,
    issued: u64,
    /// Ids of the latest accepted search, best first. `None` until a search for the
    /// current query text has completed.
    results: Option<Vec<String>>,
    /// The debounce timer or search for the latest sequence number.
    pending: Option<JoinHandle<()>>,
    /// Superseded searches still running on the blocking pool.
    in_flight: Vec<JoinHandle<()>>,
    facets: FacetRegistry<E>,
    sort: Option<SortOrder<E>>,
    dispatched: u64,
    closed: bool,
}

impl<E> State<E> {
    /// Drop the pending task's claim on the display. A debounce timer is cancelled; a search
    /// already on the blocking pool runs to completion and is discarded by sequence number.
    fn supersede_pending(&mut self) {
        self.in_flight.retain(|h| !h.is_finished());
        if let Some(pending) = self.pending.take() {
            if self.phase == SearchPhase::Debouncing {
                pending.abort();
            } else {
                self.in_flight.push(pending);
            }
        }
    }

    /// Entities the facets are applied to: the search hits when a query has results,
    /// otherwise the whole corpus.
    fn search_base(&self) -> Vec<&E> {
        match &self.results {
            Some(ids) if !self.query.is_empty() => ids
                .iter()
                .filter_map(|id| self.positions.get(id).map(|&pos| &self.corpus[pos]))
                .collect(),
            _ => self.corpus.iter().collect(),
        }
    }

    fn displayed(&self) -> Vec<&E> {
        let mut items = self.search_base();
        items.retain(|e| self.facets.matches(e));
        if let Some(cmp) = self.sort {
            items.sort_by(|a, b| cmp(a, b));
        }
        items
    }
}

struct Shared<E> {
    engine: SearchEngine<E>,
    state: Mutex<State<E>>,
    displayed: watch::Sender<Vec<String>>,
    runtime: Handle,
}

impl<E> Shared<E>
where
    E: Clone + Send + Sync + 'static,
{
    fn publish(&self, state: &mut State<E>) {
        let items: Vec<String> = if state.closed {
            Vec::new()
        } else {
            let schema = self.engine.schema();
            state.displayed().into_iter().map(|e| schema.id_of(e).to_string()).collect()
        };
        if state.phase == SearchPhase::Idle && !state.closed {
            state.phase = SearchPhase::Displaying;
        }
        self.displayed.send_if_modified(|current| {
            if *current == items {
                false
            } else {
                *current = items;
                true
            }
        });
    }

    /// Supersede whatever is pending and schedule a search for the current query after `delay`.
    fn schedule(self: &Arc<Self>, state: &mut State<E>, delay: Duration) {
        state.supersede_pending();
        state.issued += 1;
        let seq = state.issued;
        state.phase = if delay.is_zero() { SearchPhase::Searching } else { SearchPhase::Debouncing };
        let shared = Arc::clone(self);
        state.pending = Some(self.runtime.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            shared.dispatch(seq).await;
        }));
    }

    async fn dispatch(self: Arc<Self>, seq: u64) {
        let (query, corpus) = {
            let mut state = self.state.lock();
            if state.closed || state.issued != seq {
                return;
            }
            state.phase = SearchPhase::Searching;
            state.dispatched += 1;
            (state.query.clone(), Arc::clone(&state.corpus))
        };
        debug!(seq, query = %query, "dispatching search");

        let worker = Arc::clone(&self);
        let hits = match tokio::task::spawn_blocking(move || worker.run_search(&query, &corpus)).await {
            Ok(hits) => hits,
            Err(err) => {
                warn!(seq, error = %err, "search task failed, showing no results");
                Vec::new()
            }
        };
        self.complete(seq, hits);
    }

    fn run_search(&self, query: &str, corpus: &[E]) -> Vec<SearchResult> {
        if self.engine.is_indexed() {
            self.engine.search(query)
        } else {
            scorer::fallback_search(self.engine.schema(), corpus, query, self.engine.config().max_results)
        }
    }

    fn complete(&self, seq: u64, hits: Vec<SearchResult>) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        if state.issued != seq {
            debug!(seq, latest = state.issued, "discarding stale search result");
            return;
        }
        debug!(seq, hits = hits.len(), "search complete");
        state.results = Some(hits.into_iter().map(|h| h.id).collect());
        state.phase = SearchPhase::Displaying;
        self.publish(&mut state);
    }
}

/// Search box plus facet panel over one entity type.
///
/// Cloning is cheap and every clone drives the same state.
pub struct SearchFilter<E> {
    shared: Arc<Shared<E>>,
}

impl<E> Clone for SearchFilter<E> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl<E> SearchFilter<E>
where
    E: Clone + Send + Sync + 'static,
{
    /// Debounce window and result cap come from the engine's configuration. Must be called
    /// from within a Tokio runtime, which runs every later search.
    pub fn new(engine: SearchEngine<E>, facets: FacetRegistry<E>) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|err| SearchError::Runtime(err.to_string()))?;
        let (displayed, _) = watch::channel(Vec::new());
        let state = State {
            corpus: Arc::new(Vec::new()),
            positions: HashMap::new(),
            corpus_generation: 0,
            query: String::new(),
            phase: SearchPhase::Idle,
            issued: 0,
            results: None,
            pending: None,
            in_flight: Vec::new(),
            facets,
            sort: None,
            dispatched: 0,
            closed: false,
        };
        Ok(Self {
            shared: Arc::new(Shared {
                engine,
                state: Mutex::new(state),
                displayed,
                runtime,
            }),
        })
    }

    pub fn engine(&self) -> &SearchEngine<E> {
        &self.shared.engine
    }

    /// Replace the corpus and rebuild the index on the blocking pool.
    ///
    /// The displayed list switches to the new corpus right away. While an active query waits
    /// for the new index it is answered by substring matching; once the index is installed
    /// the query is searched again.
    pub async fn reindex(&self, corpus: Vec<E>) -> ReindexOutcome {
        let (corpus, generation) = {
            let mut state = self.shared.state.lock();
            if state.closed {
                return ReindexOutcome::Closed;
            }
            let corpus = Arc::new(corpus);
            let schema = self.shared.engine.schema();
            let mut positions = HashMap::with_capacity(corpus.len());
            for (pos, entity) in corpus.iter().enumerate() {
                positions.entry(schema.id_of(entity).to_string()).or_insert(pos);
            }
            state.positions = positions;
            state.corpus = Arc::clone(&corpus);
            state.corpus_generation += 1;
            state.facets.update_max_bounds(&corpus);
            if !state.query.is_empty() {
                let interim = scorer::fallback_search(
                    schema,
                    &corpus,
                    &state.query,
                    self.shared.engine.config().max_results,
                );
                state.results = Some(interim.into_iter().map(|h| h.id).collect());
            }
            self.shared.publish(&mut state);
            (corpus, state.corpus_generation)
        };

        let shared = Arc::clone(&self.shared);
        let source = Arc::clone(&corpus);
        let built = tokio::task::spawn_blocking(move || shared.engine.build_snapshot(&source))
            .await
            .unwrap_or_else(|err| Err(SearchError::IndexBuild(format!("index build task failed: {err}"))));
        let snapshot = match built {
            Ok(snapshot) => snapshot,
            Err(SearchError::Closed) => return ReindexOutcome::Closed,
            Err(err) => {
                warn!(error = %err, entities = corpus.len(), "index build failed, keeping previous index");
                let mut state = self.shared.state.lock();
                // The interim substring hits must give way to the retained index.
                if !state.closed && state.corpus_generation == generation && !state.query.is_empty() {
                    self.shared.schedule(&mut state, Duration::ZERO);
                }
                return ReindexOutcome::Retained { error: err.to_string() };
            }
        };

        let mut state = self.shared.state.lock();
        if state.closed {
            return ReindexOutcome::Closed;
        }
        if state.corpus_generation != generation {
            debug!(generation, latest = state.corpus_generation, "corpus replaced during build");
            return ReindexOutcome::Superseded;
        }
        let index_generation = snapshot.generation();
        if !self.shared.engine.install(snapshot) {
            return if self.shared.engine.is_closed() {
                ReindexOutcome::Closed
            } else {
                ReindexOutcome::Superseded
            };
        }
        if !state.query.is_empty() {
            self.shared.schedule(&mut state, Duration::ZERO);
        }
        ReindexOutcome::Installed { generation: index_generation, entities: corpus.len() }
    }

    /// Set the query text. Leading and trailing whitespace is ignored; an unchanged query is
    /// a no-op. An empty query shows the filtered corpus at once, anything else is searched
    /// once the debounce window passes without another edit.
    pub fn update_search_query(&self, text: &str) {
        let text = text.trim();
        let mut state = self.shared.state.lock();
        if state.closed || state.query == text {
            return;
        }
        state.query = text.to_string();
        if text.is_empty() {
            state.supersede_pending();
            state.issued += 1;
            state.results = None;
            state.phase = SearchPhase::Displaying;
            self.shared.publish(&mut state);
            return;
        }
        let debounce = self.shared.engine.config().debounce();
        self.shared.schedule(&mut state, debounce);
    }

    pub fn clear_search(&self) {
        self.update_search_query("");
    }

    pub fn query(&self) -> String {
        self.shared.state.lock().query.clone()
    }

    pub fn facets(&self) -> Vec<FacetView> {
        self.shared.state.lock().facets.views()
    }

    /// Flip `value` in categorical facet `id`. Returns whether it is now selected.
    pub fn toggle_facet(&self, id: &str, value: &str) -> Result<bool> {
        let mut state = self.shared.state.lock();
        let selected = state.facets.toggle(id, value)?;
        self.shared.publish(&mut state);
        Ok(selected)
    }

    pub fn set_range(&self, id: &str, lo: i64, hi: i64) -> Result<()> {
        let mut state = self.shared.state.lock();
        state.facets.set_range(id, lo, hi)?;
        self.shared.publish(&mut state);
        Ok(())
    }

    pub fn clear_facet(&self, id: &str) -> Result<()> {
        let mut state = self.shared.state.lock();
        state.facets.clear(id)?;
        self.shared.publish(&mut state);
        Ok(())
    }

    pub fn clear_all_filters(&self) {
        let mut state = self.shared.state.lock();
        state.facets.clear_all();
        self.shared.publish(&mut state);
    }

    /// Value counts for categorical facet `id` over the current search base, narrowed by
    /// every other facet.
    pub fn facet_counts(&self, id: &str) -> Result<Vec<(FacetValue, usize)>> {
        let state = self.shared.state.lock();
        let counts = state.facets.counts(id, state.search_base());
        counts
    }

    /// Order the displayed list with `order`, or keep rank/corpus order with `None`.
    pub fn set_sort_order(&self, order: Option<SortOrder<E>>) {
        let mut state = self.shared.state.lock();
        state.sort = order;
        self.shared.publish(&mut state);
    }

    pub fn displayed_items(&self) -> Vec<String> {
        self.shared.displayed.borrow().clone()
    }

    pub fn displayed_entities(&self) -> Vec<E> {
        let state = self.shared.state.lock();
        if state.closed {
            return Vec::new();
        }
        let items = state.displayed().into_iter().cloned().collect();
        items
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<String>> {
        self.shared.displayed.subscribe()
    }

    pub fn phase(&self) -> SearchPhase {
        self.shared.state.lock().phase
    }

    pub fn is_searching(&self) -> bool {
        matches!(self.phase(), SearchPhase::Debouncing | SearchPhase::Searching)
    }

    /// Number of searches that actually reached the scorer.
    pub fn searches_dispatched(&self) -> u64 {
        self.shared.state.lock().dispatched
    }

    /// Wait until no debounced or in-flight search is left, superseded ones included.
    pub async fn flush(&self) {
        loop {
            let handles: Vec<JoinHandle<()>> = {
                let mut state = self.shared.state.lock();
                let mut handles = std::mem::take(&mut state.in_flight);
                handles.extend(state.pending.take());
                handles
            };
            if handles.is_empty() {
                break;
            }
            for handle in handles {
                if let Err(err) = handle.await {
                    if !err.is_cancelled() {
                        warn!(error = %err, "search task failed");
                    }
                }
            }
        }
    }

    /// Stop searching and drop the index. The displayed list becomes empty and later calls
    /// are ignored.
    pub fn close(&self) {
        let mut state = self.shared.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        if let Some(pending) = state.pending.take() {
            pending.abort();
        }
        for handle in state.in_flight.drain(..) {
            handle.abort();
        }
        state.results = None;
        state.phase = SearchPhase::Idle;
        self.shared.engine.close();
        self.shared.publish(&mut state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::facet::{EnumFacet, Facet, FacetDefinition};
    use crate::schema::Schema;

    #[derive(Debug, Clone)]
    struct Note {
        id: &'static str,
        body: &'static str,
        color: &'static str,
    }

    fn note_id(n: &Note) -> &str {
        n.id
    }

    fn filter() -> SearchFilter<Note> {
        let schema = Schema::new(note_id).field("body", 1.0, |n: &Note| n.body.to_string());
        let facets = FacetRegistry::new(vec![Facet::Categorical(EnumFacet::new(FacetDefinition {
            id: "color",
            title: "Color",
            values: vec![
                FacetValue { key: "red", label: "Red" },
                FacetValue { key: "blue", label: "Blue" },
            ],
            extract: |n: &Note| vec![n.color],
        }))]);
        SearchFilter::new(SearchEngine::new(schema, SearchConfig::default()), facets).unwrap()
    }

    fn notes() -> Vec<Note> {
        vec![
            Note { id: "a", body: "buy milk", color: "red" },
            Note { id: "b", body: "call mom", color: "blue" },
            Note { id: "c", body: "milk the cow", color: "blue" },
        ]
    }

    #[tokio::test(start_paused = true)]
    async fn starts_idle_and_shows_corpus_after_reindex() {
        let f = filter();
        assert_eq!(f.phase(), SearchPhase::Idle);
        let outcome = f.reindex(notes()).await;
        assert_eq!(outcome, ReindexOutcome::Installed { generation: 1, entities: 3 });
        assert_eq!(f.displayed_items(), vec!["a", "b", "c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn query_waits_for_debounce() {
        let f = filter();
        f.reindex(notes()).await;
        f.update_search_query("milk");
        assert_eq!(f.phase(), SearchPhase::Debouncing);
        assert!(f.is_searching());
        assert_eq!(f.displayed_items().len(), 3);

        f.flush().await;
        assert_eq!(f.phase(), SearchPhase::Displaying);
        let mut shown = f.displayed_items();
        shown.sort();
        assert_eq!(shown, vec!["a", "c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn facet_toggle_applies_to_current_hits() {
        let f = filter();
        f.reindex(notes()).await;
        f.update_search_query("milk");
        f.flush().await;
        assert!(f.toggle_facet("color", "blue").unwrap());
        assert_eq!(f.displayed_items(), vec!["c"]);
    }

    #[test]
    fn construction_needs_a_runtime() {
        let schema = Schema::new(note_id).field("body", 1.0, |n: &Note| n.body.to_string());
        let engine = SearchEngine::new(schema, SearchConfig::default());
        let err = SearchFilter::new(engine, FacetRegistry::default()).err().unwrap();
        assert_eq!(err.code(), "NO_RUNTIME");
    }

    #[tokio::test(start_paused = true)]
    async fn closed_filter_shows_nothing() {
        let f = filter();
        f.reindex(notes()).await;
        f.close();
        assert!(f.displayed_items().is_empty());
        f.update_search_query("milk");
        f.flush().await;
        assert!(f.displayed_items().is_empty());
        assert_eq!(f.reindex(notes()).await, ReindexOutcome::Closed);
    }
}
