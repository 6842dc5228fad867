use crate::error::{Result, SearchError};
use std::fmt;

pub type FieldId = u16;

/// Fields past this count cannot be tracked in a hit's matched-field mask.
pub const MAX_FIELDS: usize = 64;

/// How whitespace-separated query terms are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Each term is an OR across fields; terms are OR-combined with a minimum-should-match.
    #[default]
    MinimumShouldMatch,
    /// Each term must prefix-match at least one field (name search).
    AllTermsPrefix,
}

/// A named, boosted text field and how to read it off an entity.
pub struct FieldSpec<E> {
    pub name: &'static str,
    pub boost: f32,
    pub extract: fn(&E) -> String,
}

impl<E> Clone for FieldSpec<E> {
    fn clone(&self) -> Self {
        Self { name: self.name, boost: self.boost, extract: self.extract }
    }
}

impl<E> fmt::Debug for FieldSpec<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec").field("name", &self.name).field("boost", &self.boost).finish()
    }
}

/// Static description of an entity type: its id accessor and searchable fields.
pub struct Schema<E> {
    id: fn(&E) -> &str,
    fields: Vec<FieldSpec<E>>,
    match_mode: MatchMode,
}

impl<E> Clone for Schema<E> {
    fn clone(&self) -> Self {
        Self { id: self.id, fields: self.fields.clone(), match_mode: self.match_mode }
    }
}

impl<E> fmt::Debug for Schema<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("fields", &self.fields)
            .field("match_mode", &self.match_mode)
            .finish()
    }
}

impl<E> Schema<E> {
    pub fn new(id: fn(&E) -> &str) -> Self {
        Self { id, fields: Vec::new(), match_mode: MatchMode::default() }
    }

    pub fn field(mut self, name: &'static str, boost: f32, extract: fn(&E) -> String) -> Self {
        self.fields.push(FieldSpec { name, boost, extract });
        self
    }

    pub fn with_match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    /// External id of `entity`, without surrounding whitespace.
    pub fn id_of<'a>(&self, entity: &'a E) -> &'a str {
        (self.id)(entity).trim()
    }

    pub fn fields(&self) -> &[FieldSpec<E>] {
        &self.fields
    }

    pub fn match_mode(&self) -> MatchMode {
        self.match_mode
    }

    /// All field text of `entity` joined by newlines, used by substring fallback search.
    pub fn searchable_text(&self, entity: &E) -> String {
        self.fields
            .iter()
            .map(|f| (f.extract)(entity))
            .filter(|t| !t.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn validate(&self) -> Result<()> {
        if self.fields.is_empty() {
            return Err(SearchError::IndexBuild("schema declares no fields".into()));
        }
        if self.fields.len() > MAX_FIELDS {
            return Err(SearchError::IndexBuild(format!(
                "schema declares {} fields, at most {MAX_FIELDS} are supported",
                self.fields.len()
            )));
        }
        for (i, field) in self.fields.iter().enumerate() {
            if !(field.boost.is_finite() && field.boost > 0.0) {
                return Err(SearchError::IndexBuild(format!(
                    "field {} has invalid boost {}",
                    field.name, field.boost
                )));
            }
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(SearchError::IndexBuild(format!("field {} declared twice", field.name)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Note {
        id: String,
        body: String,
    }

    fn note_id(n: &Note) -> &str {
        &n.id
    }

    #[test]
    fn rejects_non_positive_boost() {
        let schema = Schema::new(note_id).field("body", 0.0, |n: &Note| n.body.clone());
        assert!(schema.validate().is_err());
    }

    #[test]
    fn rejects_duplicate_field_names() {
        let schema = Schema::new(note_id)
            .field("body", 1.0, |n: &Note| n.body.clone())
            .field("body", 2.0, |n: &Note| n.body.clone());
        assert!(schema.validate().is_err());
    }

    #[test]
    fn ids_are_trimmed() {
        let schema = Schema::new(note_id).field("body", 1.0, |n: &Note| n.body.clone());
        let note = Note { id: " n1\t".into(), body: String::new() };
        assert_eq!(schema.id_of(&note), "n1");
    }

    #[test]
    fn searchable_text_skips_blank_fields() {
        let schema = Schema::new(note_id)
            .field("body", 1.0, |n: &Note| n.body.clone())
            .field("id", 1.0, |n: &Note| n.id.clone());
        let note = Note { id: "n1".into(), body: "   ".into() };
        assert_eq!(schema.searchable_text(&note), "n1");
    }
}
