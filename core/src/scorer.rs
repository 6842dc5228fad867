use crate::index::{DocId, IndexSnapshot};
use crate::query::{Clause, Query};
use crate::schema::{FieldId, Schema};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

const BM25_K1: f32 = 1.2;
const BM25_B: f32 = 0.75;
/// Prefix clauses add an exact-term score only for terms at least this long.
const MIN_EXACT_MATCH_LEN: usize = 3;
const SCORE_SCALE: f32 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub id: String,
    pub raw_score: f32,
    /// `raw_score` relative to the top hit, on a 0..=100 scale.
    pub score: u8,
    pub matched_fields: Vec<&'static str>,
}

#[derive(Default, Clone, Copy)]
struct ClauseHit {
    score: f32,
    fields: u64,
}

#[derive(Default)]
struct Accumulator {
    score: f32,
    clauses: usize,
    fields: u64,
}

/// Run `query` against `snapshot` and return at most `max_results` hits, best first.
pub fn search<E>(snapshot: &IndexSnapshot<E>, query: &Query, max_results: usize) -> Vec<SearchResult> {
    if snapshot.num_docs() == 0 || max_results == 0 {
        return Vec::new();
    }
    let mut hits: Vec<(DocId, f32, u64)> = match query {
        Query::MatchNone => return Vec::new(),
        Query::MatchAll => snapshot.doc_ids().map(|doc| (doc, 1.0, 0)).collect(),
        Query::Terms { clauses, minimum_should_match } => {
            if snapshot.is_empty() {
                return Vec::new();
            }
            let mut acc: HashMap<DocId, Accumulator> = HashMap::new();
            for clause in clauses {
                for (doc, hit) in score_clause(snapshot, clause) {
                    let a = acc.entry(doc).or_default();
                    a.score += hit.score;
                    a.clauses += 1;
                    a.fields |= hit.fields;
                }
            }
            acc.into_iter()
                .filter(|(_, a)| a.clauses >= *minimum_should_match)
                .map(|(doc, a)| (doc, a.score, a.fields))
                .collect()
        }
    };

    hits.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| snapshot.external_id(a.0).cmp(snapshot.external_id(b.0)))
    });
    hits.truncate(max_results);

    let top = hits.iter().map(|h| h.1).fold(f32::NEG_INFINITY, f32::max);
    let denom = if top > 0.0 { top } else { 1.0 };
    hits.into_iter()
        .map(|(doc, raw, fields)| SearchResult {
            id: snapshot.external_id(doc).to_string(),
            raw_score: raw,
            score: normalize(raw, denom),
            matched_fields: field_names(snapshot, fields),
        })
        .collect()
}

fn normalize(raw: f32, denom: f32) -> u8 {
    (raw / denom * SCORE_SCALE).round().clamp(0.0, SCORE_SCALE) as u8
}

fn field_names<E>(snapshot: &IndexSnapshot<E>, mask: u64) -> Vec<&'static str> {
    (0..snapshot.num_fields())
        .filter(|f| mask & (1u64 << f) != 0)
        .map(|f| snapshot.field_name(f as FieldId))
        .collect()
}

/// Per-document score of one clause: the sum over its tokens and the fields they occur in.
fn score_clause<E>(snapshot: &IndexSnapshot<E>, clause: &Clause) -> HashMap<DocId, ClauseHit> {
    let mut hits: HashMap<DocId, ClauseHit> = HashMap::new();
    for token in &clause.tokens {
        if clause.prefix {
            // Prefix matches score a flat boost once per (doc, field), however many terms expand.
            let mut seen: HashSet<(DocId, FieldId)> = HashSet::new();
            for (_, entry) in snapshot.terms_with_prefix(token) {
                for p in &entry.postings {
                    if seen.insert((p.doc_id, p.field)) {
                        let hit = hits.entry(p.doc_id).or_default();
                        hit.score += snapshot.field_boost(p.field);
                        hit.fields |= 1u64 << p.field;
                    }
                }
            }
            if token.chars().count() < MIN_EXACT_MATCH_LEN {
                continue;
            }
        }
        let Some(entry) = snapshot.term(token) else {
            continue;
        };
        for p in &entry.postings {
            let stats = snapshot.field_stats(p.field);
            let score = snapshot.field_boost(p.field)
                * bm25(
                    p.tf,
                    entry.field_df[p.field as usize],
                    stats.docs,
                    snapshot.field_len(p.doc_id, p.field),
                    stats.avg_len(),
                );
            let hit = hits.entry(p.doc_id).or_default();
            hit.score += score;
            hit.fields |= 1u64 << p.field;
        }
    }
    hits
}

fn bm25(tf: u32, df: u32, field_docs: u32, field_len: u32, avg_field_len: f32) -> f32 {
    if tf == 0 || field_docs == 0 {
        return 0.0;
    }
    let n = field_docs as f32;
    let df = df as f32;
    let idf = ((n - df + 0.5) / (df + 0.5)).ln_1p();
    let tf = tf as f32;
    let length_norm = BM25_B.mul_add(field_len as f32 / avg_field_len.max(1.0), 1.0 - BM25_B);
    let denom = BM25_K1.mul_add(length_norm, tf);
    idf * (tf * (BM25_K1 + 1.0) / denom)
}

/// Case-insensitive substring search over every field, for use before any index is installed.
/// Every hit scores 100; order follows the corpus.
pub fn fallback_search<E>(schema: &Schema<E>, corpus: &[E], raw: &str, max_results: usize) -> Vec<SearchResult> {
    let needle = raw.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    corpus
        .iter()
        .filter(|e| schema.searchable_text(e).to_lowercase().contains(&needle))
        .take(max_results)
        .map(|e| SearchResult {
            id: schema.id_of(e).to_string(),
            raw_score: 1.0,
            score: 100,
            matched_fields: Vec::new(),
        })
        .collect()
}
