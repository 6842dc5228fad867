use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Debug, Error)]
pub enum SearchError {
    /// The corpus or schema could not be turned into a snapshot. The previously installed
    /// snapshot stays in force.
    #[error("index build failed: {0}")]
    IndexBuild(String),

    #[error("could not parse query term {term:?}: {reason}")]
    QueryParse { term: String, reason: String },

    #[error("unknown facet: {0}")]
    UnknownFacet(String),

    #[error("facet {facet} has no value {value:?}")]
    UnknownFacetValue { facet: String, value: String },

    #[error("search engine is closed")]
    Closed,

    #[error("no async runtime available: {0}")]
    Runtime(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SearchError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::IndexBuild(_) => "INDEX_BUILD_FAILED",
            Self::QueryParse { .. } => "QUERY_PARSE_FAILED",
            Self::UnknownFacet(_) => "UNKNOWN_FACET",
            Self::UnknownFacetValue { .. } => "UNKNOWN_FACET_VALUE",
            Self::Closed => "CLOSED",
            Self::Runtime(_) => "NO_RUNTIME",
            Self::Config(_) => "INVALID_CONFIG",
            Self::Json(_) => "JSON_ERROR",
        }
    }
}
