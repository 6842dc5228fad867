//! Independent, named filters over a corpus.
//!
//! Facets combine with AND; values selected within one categorical facet combine with OR.
//! A facet with nothing selected (or a range spanning its full bounds) lets everything through.

use crate::error::{Result, SearchError};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::ops::RangeInclusive;

/// A closed enumeration usable as categorical facet values.
pub trait FacetKey: Copy + 'static {
    const ALL: &'static [Self];

    /// Stable wire name, e.g. `GROUP_WORK`.
    fn key(self) -> &'static str;

    /// Human-readable name, e.g. `Group work`.
    fn label(self) -> &'static str;
}

/// Declares a fieldless enum with serde names and a [`FacetKey`] impl.
#[macro_export]
macro_rules! facet_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => ($key:literal, $label:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            ::serde::Serialize, ::serde::Deserialize,
        )]
        $vis enum $name {
            $($(#[$vmeta])* #[serde(rename = $key)] $variant),+
        }

        impl $crate::facet::FacetKey for $name {
            const ALL: &'static [Self] = &[$(Self::$variant),+];

            fn key(self) -> &'static str {
                match self {
                    $(Self::$variant => $key),+
                }
            }

            fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FacetValue {
    pub key: &'static str,
    pub label: &'static str,
}

impl FacetValue {
    pub fn of<K: FacetKey>(k: K) -> Self {
        Self { key: k.key(), label: k.label() }
    }

    pub fn all<K: FacetKey>() -> Vec<Self> {
        K::ALL.iter().map(|k| Self::of(*k)).collect()
    }
}

pub struct FacetDefinition<E> {
    pub id: &'static str,
    pub title: &'static str,
    pub values: Vec<FacetValue>,
    pub extract: fn(&E) -> Vec<&'static str>,
}

/// Categorical facet: a fixed value domain and the currently selected subset.
pub struct EnumFacet<E> {
    def: FacetDefinition<E>,
    selected: BTreeSet<&'static str>,
}

impl<E> EnumFacet<E> {
    pub fn new(def: FacetDefinition<E>) -> Self {
        Self { def, selected: BTreeSet::new() }
    }

    pub fn id(&self) -> &'static str {
        self.def.id
    }

    pub fn title(&self) -> &'static str {
        self.def.title
    }

    pub fn values(&self) -> &[FacetValue] {
        &self.def.values
    }

    /// Add `value` if absent, remove it if present. Returns whether it is now selected.
    pub fn toggle(&mut self, value: &str) -> Result<bool> {
        let Some(known) = self.def.values.iter().find(|v| v.key == value) else {
            return Err(SearchError::UnknownFacetValue {
                facet: self.def.id.to_string(),
                value: value.to_string(),
            });
        };
        if self.selected.remove(known.key) {
            Ok(false)
        } else {
            self.selected.insert(known.key);
            Ok(true)
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn selected(&self) -> Vec<&'static str> {
        self.selected.iter().copied().collect()
    }

    pub fn is_active(&self) -> bool {
        !self.selected.is_empty()
    }

    pub fn matches(&self, entity: &E) -> bool {
        self.selected.is_empty()
            || (self.def.extract)(entity).iter().any(|v| self.selected.contains(v))
    }

    /// Per-value counts over `items`, zero-filled across the whole domain.
    pub fn counts<'a>(&self, items: impl IntoIterator<Item = &'a E>) -> Vec<(FacetValue, usize)>
    where
        E: 'a,
    {
        let mut counts: Vec<(FacetValue, usize)> = self.def.values.iter().map(|v| (*v, 0)).collect();
        for item in items {
            for key in (self.def.extract)(item) {
                if let Some(slot) = counts.iter_mut().find(|(v, _)| v.key == key) {
                    slot.1 += 1;
                }
            }
        }
        counts
    }
}

pub struct RangeDefinition<E> {
    pub id: &'static str,
    pub title: &'static str,
    pub min_bound: i64,
    pub max_bound: i64,
    pub step: i64,
    pub extract: fn(&E) -> i64,
}

/// Numeric facet. Inactive while the selected range equals the full bounds.
pub struct RangeFacet<E> {
    def: RangeDefinition<E>,
    max_bound: i64,
    current: RangeInclusive<i64>,
}

impl<E> RangeFacet<E> {
    pub fn new(def: RangeDefinition<E>) -> Self {
        let max_bound = def.max_bound.max(def.min_bound);
        let current = def.min_bound..=max_bound;
        Self { def, max_bound, current }
    }

    pub fn id(&self) -> &'static str {
        self.def.id
    }

    pub fn title(&self) -> &'static str {
        self.def.title
    }

    pub fn min_bound(&self) -> i64 {
        self.def.min_bound
    }

    pub fn max_bound(&self) -> i64 {
        self.max_bound
    }

    pub fn step(&self) -> i64 {
        self.def.step
    }

    pub fn full_range(&self) -> RangeInclusive<i64> {
        self.def.min_bound..=self.max_bound
    }

    pub fn current(&self) -> RangeInclusive<i64> {
        self.current.clone()
    }

    pub fn is_active(&self) -> bool {
        self.current != self.full_range()
    }

    /// Move the upper bound to `new_max` (never below the lower bound). An inactive range
    /// stays inactive; an active one is clipped to the new bound.
    pub fn update_max_bound(&mut self, new_max: i64) {
        let was_full = !self.is_active();
        self.max_bound = new_max.max(self.def.min_bound);
        if was_full {
            self.current = self.full_range();
        } else if *self.current.end() > self.max_bound {
            let start = (*self.current.start()).min(self.max_bound);
            self.current = start..=self.max_bound;
        }
    }

    /// Select `lo..=hi`, each end clamped into the bounds.
    pub fn set_range(&mut self, lo: i64, hi: i64) {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        let lo = lo.clamp(self.def.min_bound, self.max_bound);
        let hi = hi.clamp(self.def.min_bound, self.max_bound);
        self.current = lo..=hi;
    }

    pub fn set_min(&mut self, min: i64) {
        let hi = *self.current.end();
        let lo = min.clamp(self.def.min_bound, hi);
        self.current = lo..=hi;
    }

    pub fn set_max(&mut self, max: i64) {
        let lo = *self.current.start();
        let hi = max.clamp(lo, self.max_bound);
        self.current = lo..=hi;
    }

    pub fn reset(&mut self) {
        self.current = self.full_range();
    }

    pub fn matches(&self, entity: &E) -> bool {
        !self.is_active() || self.current.contains(&(self.def.extract)(entity))
    }

    pub fn value_of(&self, entity: &E) -> i64 {
        (self.def.extract)(entity)
    }
}

pub enum Facet<E> {
    Categorical(EnumFacet<E>),
    Range(RangeFacet<E>),
}

impl<E> Facet<E> {
    pub fn id(&self) -> &'static str {
        match self {
            Facet::Categorical(f) => f.id(),
            Facet::Range(f) => f.id(),
        }
    }

    pub fn matches(&self, entity: &E) -> bool {
        match self {
            Facet::Categorical(f) => f.matches(entity),
            Facet::Range(f) => f.matches(entity),
        }
    }

    pub fn clear(&mut self) {
        match self {
            Facet::Categorical(f) => f.clear(),
            Facet::Range(f) => f.reset(),
        }
    }

    pub fn view(&self) -> FacetView {
        match self {
            Facet::Categorical(f) => FacetView::Categorical {
                id: f.id(),
                title: f.title(),
                values: f.values().to_vec(),
                selected: f.selected(),
            },
            Facet::Range(f) => FacetView::Range {
                id: f.id(),
                title: f.title(),
                min_bound: f.min_bound(),
                max_bound: f.max_bound(),
                step: f.step(),
                current: (*f.current.start(), *f.current.end()),
            },
        }
    }
}

impl<E> fmt::Debug for Facet<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.view(), f)
    }
}

/// Read-only picture of one facet's domain and selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FacetView {
    Categorical {
        id: &'static str,
        title: &'static str,
        values: Vec<FacetValue>,
        selected: Vec<&'static str>,
    },
    Range {
        id: &'static str,
        title: &'static str,
        min_bound: i64,
        max_bound: i64,
        step: i64,
        current: (i64, i64),
    },
}

impl FacetView {
    pub fn id(&self) -> &'static str {
        match self {
            FacetView::Categorical { id, .. } | FacetView::Range { id, .. } => id,
        }
    }
}

#[derive(Debug)]
pub struct FacetRegistry<E> {
    facets: Vec<Facet<E>>,
}

impl<E> Default for FacetRegistry<E> {
    fn default() -> Self {
        Self { facets: Vec::new() }
    }
}

impl<E> FacetRegistry<E> {
    pub fn new(facets: Vec<Facet<E>>) -> Self {
        Self { facets }
    }

    pub fn facets(&self) -> &[Facet<E>] {
        &self.facets
    }

    pub fn get(&self, id: &str) -> Option<&Facet<E>> {
        self.facets.iter().find(|f| f.id() == id)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Facet<E>> {
        self.facets
            .iter_mut()
            .find(|f| f.id() == id)
            .ok_or_else(|| SearchError::UnknownFacet(id.to_string()))
    }

    pub fn toggle(&mut self, id: &str, value: &str) -> Result<bool> {
        match self.get_mut(id)? {
            Facet::Categorical(f) => f.toggle(value),
            Facet::Range(_) => Err(SearchError::UnknownFacetValue {
                facet: id.to_string(),
                value: value.to_string(),
            }),
        }
    }

    pub fn set_range(&mut self, id: &str, lo: i64, hi: i64) -> Result<()> {
        match self.get_mut(id)? {
            Facet::Range(f) => {
                f.set_range(lo, hi);
                Ok(())
            }
            Facet::Categorical(_) => Err(SearchError::UnknownFacet(format!("{id} is not a range facet"))),
        }
    }

    pub fn clear(&mut self, id: &str) -> Result<()> {
        self.get_mut(id)?.clear();
        Ok(())
    }

    pub fn clear_all(&mut self) {
        for facet in &mut self.facets {
            facet.clear();
        }
    }

    /// True when every facet accepts `entity`.
    pub fn matches(&self, entity: &E) -> bool {
        self.facets.iter().all(|f| f.matches(entity))
    }

    fn matches_except(&self, skip: &str, entity: &E) -> bool {
        self.facets.iter().filter(|f| f.id() != skip).all(|f| f.matches(entity))
    }

    pub fn filtered<'a>(&self, items: impl IntoIterator<Item = &'a E>) -> Vec<&'a E>
    where
        E: 'a,
    {
        items.into_iter().filter(|e| self.matches(e)).collect()
    }

    /// Counts for categorical facet `id` over `items` that pass every other facet.
    pub fn counts<'a>(&self, id: &str, items: impl IntoIterator<Item = &'a E>) -> Result<Vec<(FacetValue, usize)>>
    where
        E: 'a,
    {
        match self.get(id) {
            Some(Facet::Categorical(f)) => {
                Ok(f.counts(items.into_iter().filter(|e| self.matches_except(id, e))))
            }
            Some(Facet::Range(_)) => Err(SearchError::UnknownFacet(format!("{id} is not a categorical facet"))),
            None => Err(SearchError::UnknownFacet(id.to_string())),
        }
    }

    /// Fit every range facet's upper bound to the largest value in `corpus`.
    pub fn update_max_bounds(&mut self, corpus: &[E]) {
        for facet in &mut self.facets {
            if let Facet::Range(f) = facet {
                if let Some(max) = corpus.iter().map(|e| f.value_of(e)).max() {
                    f.update_max_bound(max);
                }
            }
        }
    }

    pub fn views(&self) -> Vec<FacetView> {
        self.facets.iter().map(Facet::view).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Item {
        kind: &'static str,
        score: i64,
    }

    fn kind_facet() -> EnumFacet<Item> {
        EnumFacet::new(FacetDefinition {
            id: "kind",
            title: "Kind",
            values: vec![
                FacetValue { key: "A", label: "A" },
                FacetValue { key: "B", label: "B" },
            ],
            extract: |i: &Item| vec![i.kind],
        })
    }

    fn score_facet() -> RangeFacet<Item> {
        RangeFacet::new(RangeDefinition {
            id: "score",
            title: "Score",
            min_bound: 0,
            max_bound: 50,
            step: 1,
            extract: |i: &Item| i.score,
        })
    }

    #[test]
    fn toggle_flips_membership() {
        let mut f = kind_facet();
        assert!(f.toggle("A").unwrap());
        assert_eq!(f.selected(), vec!["A"]);
        assert!(!f.toggle("A").unwrap());
        assert!(f.selected().is_empty());
    }

    #[test]
    fn toggle_rejects_values_outside_domain() {
        let mut f = kind_facet();
        assert!(f.toggle("Z").is_err());
    }

    #[test]
    fn empty_selection_matches_everything() {
        let f = kind_facet();
        assert!(f.matches(&Item { kind: "B", score: 0 }));
    }

    #[test]
    fn range_set_clamps_to_bounds() {
        let mut r = score_facet();
        r.set_range(-5, 80);
        assert_eq!(r.current(), 0..=50);
        assert!(!r.is_active());
    }

    #[test]
    fn set_min_and_max_respect_the_other_end() {
        let mut r = score_facet();
        r.set_range(10, 20);
        r.set_min(30);
        assert_eq!(r.current(), 20..=20);
        r.set_max(5);
        assert_eq!(r.current(), 20..=20);
        r.set_max(40);
        assert_eq!(r.current(), 20..=40);
    }

    #[test]
    fn single_value_range_matches_exactly() {
        let mut r = score_facet();
        r.set_range(7, 7);
        assert!(r.matches(&Item { kind: "A", score: 7 }));
        assert!(!r.matches(&Item { kind: "A", score: 8 }));
    }

    #[test]
    fn inactive_range_follows_new_max_bound() {
        let mut r = score_facet();
        r.update_max_bound(120);
        assert_eq!(r.current(), 0..=120);
        assert!(!r.is_active());
    }

    #[test]
    fn active_range_is_clipped_by_lower_max_bound() {
        let mut r = score_facet();
        r.set_range(10, 40);
        r.update_max_bound(30);
        assert_eq!(r.current(), 10..=30);
        assert!(r.is_active());
    }

    #[test]
    fn counts_exclude_own_selection_but_apply_others() {
        let mut registry = FacetRegistry::new(vec![
            Facet::Categorical(kind_facet()),
            Facet::Range(score_facet()),
        ]);
        let items = vec![
            Item { kind: "A", score: 5 },
            Item { kind: "B", score: 5 },
            Item { kind: "B", score: 45 },
        ];
        registry.toggle("kind", "A").unwrap();
        registry.set_range("score", 0, 10).unwrap();

        let counts = registry.counts("kind", &items).unwrap();
        let as_pairs: Vec<(&str, usize)> = counts.iter().map(|(v, n)| (v.key, *n)).collect();
        assert_eq!(as_pairs, vec![("A", 1), ("B", 1)]);
        assert_eq!(registry.filtered(&items).len(), 1);

        registry.clear_all();
        assert_eq!(registry.filtered(&items).len(), 3);
    }
}
