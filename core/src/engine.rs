use crate::config::SearchConfig;
use crate::error::{Result, SearchError};
use crate::index::IndexSnapshot;
use crate::query::QueryBuilder;
use crate::schema::Schema;
use crate::scorer::{self, SearchResult};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Full-text engine over one entity type.
///
/// The installed snapshot is swapped as a whole; searches clone the `Arc` and score against
/// it without holding the lock, so they see either the old or the new corpus, never a mix.
pub struct SearchEngine<E> {
    schema: Schema<E>,
    config: SearchConfig,
    builder: QueryBuilder,
    current: RwLock<Option<Arc<IndexSnapshot<E>>>>,
    next_generation: AtomicU64,
    closed: AtomicBool,
}

impl<E> SearchEngine<E> {
    pub fn new(schema: Schema<E>, config: SearchConfig) -> Self {
        let builder = QueryBuilder::new(schema.match_mode(), &config);
        Self {
            schema,
            config,
            builder,
            current: RwLock::new(None),
            next_generation: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        }
    }

    pub fn schema(&self) -> &Schema<E> {
        &self.schema
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Build a snapshot off to the side. Nothing is installed.
    pub fn build_snapshot(&self, corpus: &[E]) -> Result<IndexSnapshot<E>> {
        if self.is_closed() {
            return Err(SearchError::Closed);
        }
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        IndexSnapshot::build(&self.schema, corpus, generation)
    }

    /// Swap `snapshot` in. Refused when the engine is closed or a newer generation is
    /// already installed.
    pub fn install(&self, snapshot: IndexSnapshot<E>) -> bool {
        let mut current = self.current.write();
        if self.is_closed() {
            return false;
        }
        if let Some(installed) = current.as_ref() {
            if installed.generation() >= snapshot.generation() {
                debug!(
                    installed = installed.generation(),
                    offered = snapshot.generation(),
                    "ignoring older snapshot"
                );
                return false;
            }
        }
        info!(
            generation = snapshot.generation(),
            num_docs = snapshot.num_docs(),
            num_terms = snapshot.num_terms(),
            "installed index snapshot"
        );
        *current = Some(Arc::new(snapshot));
        true
    }

    /// Rebuild from `corpus` and install. On error the previous snapshot stays in force.
    pub fn reindex(&self, corpus: &[E]) -> Result<u64> {
        let snapshot = self.build_snapshot(corpus)?;
        let generation = snapshot.generation();
        if self.install(snapshot) {
            Ok(generation)
        } else if self.is_closed() {
            Err(SearchError::Closed)
        } else {
            Err(SearchError::IndexBuild(format!("generation {generation} was superseded")))
        }
    }

    pub fn snapshot(&self) -> Option<Arc<IndexSnapshot<E>>> {
        self.current.read().clone()
    }

    pub fn is_indexed(&self) -> bool {
        self.current.read().is_some()
    }

    /// Ranked hits for `raw`. Blank text, a missing index, or a closed engine yield no hits.
    pub fn search(&self, raw: &str) -> Vec<SearchResult> {
        let Some(query) = self.builder.build(raw) else {
            return Vec::new();
        };
        let Some(snapshot) = self.snapshot() else {
            return Vec::new();
        };
        scorer::search(&snapshot, &query, self.config.max_results)
    }

    /// Release the installed snapshot. Later calls return empty results.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.current.write().take();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
