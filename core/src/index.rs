use crate::error::{Result, SearchError};
use crate::schema::{FieldId, Schema};
use crate::tokenizer::tokenize;
use std::collections::{BTreeMap, HashSet};
use std::marker::PhantomData;
use std::ops::Bound;

pub type DocId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub doc_id: DocId,
    pub field: FieldId,
    pub tf: u32,
}

/// Postings of one term, ordered by (doc_id, field), plus per-field document frequency.
#[derive(Debug, Clone, Default)]
pub struct TermEntry {
    pub postings: Vec<Posting>,
    pub field_df: Vec<u32>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FieldStats {
    /// Documents with non-blank text in this field.
    pub docs: u32,
    /// Sum of term counts across those documents.
    pub total_len: u64,
}

impl FieldStats {
    pub fn avg_len(&self) -> f32 {
        if self.docs == 0 {
            0.0
        } else {
            self.total_len as f32 / self.docs as f32
        }
    }
}

/// Immutable inverted index over one corpus generation.
#[derive(Debug)]
pub struct IndexSnapshot<E> {
    generation: u64,
    dictionary: BTreeMap<String, TermEntry>,
    field_names: Vec<&'static str>,
    field_boosts: Vec<f32>,
    field_stats: Vec<FieldStats>,
    /// Term count per (doc, field), flattened as `doc * fields + field`.
    field_lengths: Vec<u32>,
    external_ids: Vec<String>,
    _entity: PhantomData<fn(&E)>,
}

impl<E> IndexSnapshot<E> {
    /// Build a snapshot from `corpus`. Any malformed entity aborts the whole build.
    pub fn build(schema: &Schema<E>, corpus: &[E], generation: u64) -> Result<Self> {
        schema.validate()?;
        let fields = schema.fields();
        let num_fields = fields.len();

        let mut dictionary: BTreeMap<String, TermEntry> = BTreeMap::new();
        let mut field_stats = vec![FieldStats::default(); num_fields];
        let mut field_lengths: Vec<u32> = Vec::with_capacity(corpus.len() * num_fields);
        let mut external_ids: Vec<String> = Vec::with_capacity(corpus.len());
        let mut seen: HashSet<&str> = HashSet::with_capacity(corpus.len());

        for (position, entity) in corpus.iter().enumerate() {
            let external_id = schema.id_of(entity);
            if external_id.is_empty() {
                return Err(SearchError::IndexBuild(format!(
                    "entity at position {position} has a blank id"
                )));
            }
            if !seen.insert(external_id) {
                return Err(SearchError::IndexBuild(format!("duplicate entity id {external_id:?}")));
            }
            let doc_id = DocId::try_from(external_ids.len())
                .map_err(|_| SearchError::IndexBuild("corpus exceeds the document id space".into()))?;

            for (field_idx, spec) in fields.iter().enumerate() {
                let text = (spec.extract)(entity);
                if text.trim().is_empty() {
                    field_lengths.push(0);
                    continue;
                }
                let terms = tokenize(&text);
                // BTreeMap keeps posting insertion order independent of hashing.
                let mut tf_counts: BTreeMap<String, u32> = BTreeMap::new();
                for term in terms.iter() {
                    *tf_counts.entry(term.clone()).or_insert(0) += 1;
                }
                let len = terms.len() as u32;
                field_lengths.push(len);
                if len == 0 {
                    continue;
                }
                let stats = &mut field_stats[field_idx];
                stats.docs += 1;
                stats.total_len += u64::from(len);

                let field = field_idx as FieldId;
                for (term, tf) in tf_counts {
                    let entry = dictionary.entry(term).or_insert_with(|| TermEntry {
                        postings: Vec::new(),
                        field_df: vec![0; num_fields],
                    });
                    entry.postings.push(Posting { doc_id, field, tf });
                    entry.field_df[field_idx] += 1;
                }
            }

            external_ids.push(external_id.to_string());
        }

        Ok(Self {
            generation,
            dictionary,
            field_names: fields.iter().map(|f| f.name).collect(),
            field_boosts: fields.iter().map(|f| f.boost).collect(),
            field_stats,
            field_lengths,
            external_ids,
            _entity: PhantomData,
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn num_docs(&self) -> usize {
        self.external_ids.len()
    }

    pub fn num_terms(&self) -> usize {
        self.dictionary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.external_ids.is_empty() || self.dictionary.is_empty()
    }

    pub fn term(&self, term: &str) -> Option<&TermEntry> {
        self.dictionary.get(term)
    }

    /// Every indexed term starting with `prefix`, in lexicographic order.
    pub fn terms_with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a TermEntry)> + 'a {
        self.dictionary
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(move |(term, _)| term.starts_with(prefix))
    }

    pub fn num_fields(&self) -> usize {
        self.field_names.len()
    }

    pub fn field_name(&self, field: FieldId) -> &'static str {
        self.field_names[field as usize]
    }

    pub fn field_boost(&self, field: FieldId) -> f32 {
        self.field_boosts[field as usize]
    }

    pub fn field_stats(&self, field: FieldId) -> FieldStats {
        self.field_stats[field as usize]
    }

    pub fn field_len(&self, doc_id: DocId, field: FieldId) -> u32 {
        self.field_lengths[doc_id as usize * self.field_names.len() + field as usize]
    }

    pub fn external_id(&self, doc_id: DocId) -> &str {
        &self.external_ids[doc_id as usize]
    }

    pub fn doc_ids(&self) -> impl Iterator<Item = DocId> {
        0..self.external_ids.len() as DocId
    }
}
