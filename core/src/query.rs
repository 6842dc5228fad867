//! Turns raw user text into a weighted multi-field boolean query.
//!
//! User input is escaped before it is split, so characters that carry meaning in the clause
//! grammar (`+ - ! ( ) { } [ ] ^ " ~ * ? : \ / & |`) are always taken literally.

use crate::config::SearchConfig;
use crate::error::{Result, SearchError};
use crate::schema::MatchMode;
use crate::tokenizer::tokenize;
use tracing::debug;

const RESERVED: &[char] = &[
    '+', '-', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':', '\\', '/', '&', '|',
];

/// One OR-able unit of a query: the analyzed tokens of a single user term.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    /// The user term this clause came from, unescaped.
    pub text: String,
    /// Analyzed tokens; a field matches the clause when it contains any of them.
    pub tokens: Vec<String>,
    /// Tokens match any indexed term they prefix instead of only the exact term.
    pub prefix: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Every indexed entity, with a uniform score.
    MatchAll,
    /// Nothing can match.
    MatchNone,
    /// Hits must satisfy at least `minimum_should_match` of `clauses`.
    Terms { clauses: Vec<Clause>, minimum_should_match: usize },
}

impl Query {
    pub fn clause_count(&self) -> usize {
        match self {
            Query::Terms { clauses, .. } => clauses.len(),
            _ => 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueryBuilder {
    mode: MatchMode,
    min_should_match_ratio: f64,
    min_should_match_threshold: usize,
    max_clause_count: usize,
}

impl QueryBuilder {
    pub fn new(mode: MatchMode, config: &SearchConfig) -> Self {
        Self {
            mode,
            min_should_match_ratio: config.min_should_match_ratio,
            min_should_match_threshold: config.min_should_match_threshold,
            max_clause_count: config.max_clause_count,
        }
    }

    /// Build a query from raw text. `None` means the text is blank and no search should run.
    pub fn build(&self, raw: &str) -> Option<Query> {
        let escaped = escape(raw);
        let terms: Vec<&str> = escaped.split_whitespace().collect();
        if terms.is_empty() {
            return None;
        }
        let query = match self.mode {
            MatchMode::MinimumShouldMatch if terms.len() == 1 => self.single_term(&escaped),
            MatchMode::MinimumShouldMatch => self.multi_term(&escaped, &terms),
            MatchMode::AllTermsPrefix => self.all_prefix(&terms),
        };
        Some(query)
    }

    fn single_term(&self, escaped: &str) -> Query {
        match parse_clause(escaped.trim(), false) {
            Ok(clause) => Query::Terms { clauses: vec![clause], minimum_should_match: 1 },
            Err(err) => {
                debug!(%err, "falling back to match-all");
                Query::MatchAll
            }
        }
    }

    fn multi_term(&self, escaped: &str, terms: &[&str]) -> Query {
        let mut clauses = Vec::with_capacity(terms.len().min(self.max_clause_count));
        for term in terms {
            if clauses.len() == self.max_clause_count {
                debug!(max = self.max_clause_count, "clause limit reached, dropping remaining terms");
                break;
            }
            match parse_clause(term, false) {
                Ok(clause) => clauses.push(clause),
                Err(err) => debug!(%err, "dropping term"),
            }
        }
        if clauses.is_empty() {
            return self.single_term(escaped);
        }
        let minimum_should_match = self.minimum_should_match(clauses.len());
        Query::Terms { clauses, minimum_should_match }
    }

    /// Every token of every term becomes its own required prefix clause.
    fn all_prefix(&self, terms: &[&str]) -> Query {
        let mut clauses = Vec::new();
        for term in terms {
            let Ok(parsed) = parse_clause(term, true) else {
                continue;
            };
            for token in parsed.tokens {
                if clauses.len() == self.max_clause_count {
                    break;
                }
                clauses.push(Clause { text: parsed.text.clone(), tokens: vec![token], prefix: true });
            }
        }
        if clauses.is_empty() {
            return Query::MatchNone;
        }
        let minimum_should_match = clauses.len();
        Query::Terms { clauses, minimum_should_match }
    }

    pub fn minimum_should_match(&self, clause_count: usize) -> usize {
        if clause_count > self.min_should_match_threshold {
            let msm = (clause_count as f64 * self.min_should_match_ratio).ceil() as usize;
            msm.clamp(1, clause_count)
        } else {
            1
        }
    }
}

/// Backslash-escape every reserved character so the text is taken literally.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if RESERVED.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Parse one escaped term into a clause.
///
/// An unescaped reserved character is a syntax error, as is a term with no indexable content.
pub fn parse_clause(term: &str, prefix: bool) -> Result<Clause> {
    let mut text = String::with_capacity(term.len());
    let mut chars = term.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) => text.push(next),
                None => return Err(parse_error(term, "dangling escape")),
            }
        } else if RESERVED.contains(&c) {
            return Err(parse_error(term, &format!("unescaped {c:?}")));
        } else {
            text.push(c);
        }
    }
    let tokens = dedup(tokenize(&text));
    if tokens.is_empty() {
        return Err(parse_error(term, "no indexable terms"));
    }
    Ok(Clause { text, tokens, prefix })
}

fn dedup(tokens: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tokens.len());
    for token in tokens {
        if !out.contains(&token) {
            out.push(token);
        }
    }
    out
}

fn parse_error(term: &str, reason: &str) -> SearchError {
    SearchError::QueryParse { term: term.to_string(), reason: reason.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> QueryBuilder {
        QueryBuilder::new(MatchMode::MinimumShouldMatch, &SearchConfig::default())
    }

    #[test]
    fn blank_query_signals_no_search() {
        assert_eq!(builder().build("   \t "), None);
    }

    #[test]
    fn single_term_is_one_clause() {
        let query = builder().build("Pizza").unwrap();
        assert_eq!(
            query,
            Query::Terms {
                clauses: vec![Clause { text: "Pizza".into(), tokens: vec!["pizza".into()], prefix: false }],
                minimum_should_match: 1,
            }
        );
    }

    #[test]
    fn reserved_syntax_is_escaped_not_interpreted() {
        let query = builder().build("study+(pizza) AND status:OPEN").unwrap();
        let Query::Terms { clauses, minimum_should_match } = query else {
            panic!("expected a term query");
        };
        assert_eq!(clauses.len(), 3);
        assert_eq!(clauses[0].tokens, vec!["study", "pizza"]);
        assert_eq!(clauses[2].text, "status:OPEN");
        assert_eq!(minimum_should_match, 2);
    }

    #[test]
    fn unparseable_single_term_matches_everything() {
        assert_eq!(builder().build("!!!"), Some(Query::MatchAll));
    }

    #[test]
    fn unparseable_terms_are_dropped_from_multi_term_queries() {
        let query = builder().build("pizza ??? night").unwrap();
        assert_eq!(query.clause_count(), 2);
    }

    #[test]
    fn minimum_should_match_is_sixty_percent_rounded_up() {
        let b = builder();
        assert_eq!(b.minimum_should_match(1), 1);
        assert_eq!(b.minimum_should_match(2), 2);
        assert_eq!(b.minimum_should_match(3), 2);
        assert_eq!(b.minimum_should_match(5), 3);
        assert_eq!(b.minimum_should_match(10), 6);
    }

    #[test]
    fn clause_limit_drops_excess_terms() {
        let cfg = SearchConfig { max_clause_count: 2, ..SearchConfig::default() };
        let b = QueryBuilder::new(MatchMode::MinimumShouldMatch, &cfg);
        assert_eq!(b.build("a b c d").unwrap().clause_count(), 2);
    }

    #[test]
    fn prefix_mode_requires_every_token() {
        let b = QueryBuilder::new(MatchMode::AllTermsPrefix, &SearchConfig::default());
        let Some(Query::Terms { clauses, minimum_should_match }) = b.build("Jo o'sm") else {
            panic!("expected a term query");
        };
        let tokens: Vec<&str> = clauses.iter().map(|c| c.tokens[0].as_str()).collect();
        assert_eq!(tokens, vec!["jo", "o", "sm"]);
        assert!(clauses.iter().all(|c| c.prefix));
        assert_eq!(minimum_should_match, 3);
    }

    #[test]
    fn prefix_mode_without_tokens_matches_nothing() {
        let b = QueryBuilder::new(MatchMode::AllTermsPrefix, &SearchConfig::default());
        assert_eq!(b.build("?!"), Some(Query::MatchNone));
    }
}
