pub mod config;
pub mod engine;
pub mod error;
pub mod facet;
pub mod index;
pub mod orchestrator;
pub mod profile;
pub mod query;
pub mod request;
pub mod schema;
pub mod scorer;
pub mod tokenizer;

pub use config::SearchConfig;
pub use engine::SearchEngine;
pub use error::{Result, SearchError};
pub use facet::{Facet, FacetKey, FacetRegistry, FacetValue, FacetView};
pub use orchestrator::{ReindexOutcome, SearchFilter, SearchPhase, SortOrder};
pub use schema::{MatchMode, Schema};
pub use scorer::SearchResult;
