mod common;

use common::{profile, request, three_requests};
use search_core::profile::{profile_facets, UserSection};
use search_core::request::{request_facets, RequestStatus, RequestType, Tags};
use search_core::{FacetView, SearchError};

fn ids<T>(items: &[&T], id: impl Fn(&T) -> &str) -> Vec<String> {
    items.iter().map(|e| id(e).to_string()).collect()
}

#[test]
fn facets_combine_with_and() {
    let corpus = vec![
        request("s", "Study", &[RequestType::StudyGroup], RequestStatus::Open, &[]),
        request("e", "Eat", &[RequestType::Eating], RequestStatus::Open, &[]),
    ];
    let mut facets = request_facets();

    facets.toggle("type", "EATING").unwrap();
    assert_eq!(ids(&facets.filtered(&corpus), |r| r.request_id.as_str()), vec!["e"]);

    facets.toggle("status", "IN_PROGRESS").unwrap();
    assert!(facets.filtered(&corpus).is_empty());
}

#[test]
fn values_within_a_facet_combine_with_or() {
    let corpus = vec![
        request("s", "Study", &[RequestType::StudyGroup], RequestStatus::Open, &[]),
        request("e", "Eat", &[RequestType::Eating], RequestStatus::Open, &[]),
        request("f", "Ball", &[RequestType::Sport], RequestStatus::Open, &[]),
    ];
    let mut facets = request_facets();
    facets.toggle("type", "EATING").unwrap();
    facets.toggle("type", "SPORT").unwrap();
    assert_eq!(ids(&facets.filtered(&corpus), |r| r.request_id.as_str()), vec!["e", "f"]);
}

#[test]
fn multi_valued_fields_match_any_selected_value() {
    let corpus = vec![request(
        "both",
        "Study lunch",
        &[RequestType::Studying, RequestType::Eating],
        RequestStatus::Open,
        &[Tags::Indoor, Tags::Easy],
    )];
    let mut facets = request_facets();
    facets.toggle("tags", "EASY").unwrap();
    facets.toggle("type", "EATING").unwrap();
    assert_eq!(facets.filtered(&corpus).len(), 1);
}

#[test]
fn toggling_twice_restores_the_full_corpus() {
    let corpus = three_requests();
    let mut facets = request_facets();
    assert!(facets.toggle("tags", "INDOOR").unwrap());
    assert_eq!(facets.filtered(&corpus).len(), 1);
    assert!(!facets.toggle("tags", "INDOOR").unwrap());
    assert_eq!(facets.filtered(&corpus).len(), 3);
}

#[test]
fn unknown_facets_and_values_are_rejected() {
    let mut facets = request_facets();
    assert!(matches!(facets.toggle("colour", "RED"), Err(SearchError::UnknownFacet(_))));
    let err = facets.toggle("status", "ARCHIVED").unwrap_err();
    assert_eq!(err.code(), "UNKNOWN_FACET_VALUE");
    assert!(facets.set_range("type", 0, 1).is_err());
}

#[test]
fn clear_all_resets_every_facet() {
    let corpus = three_requests();
    let mut facets = request_facets();
    facets.toggle("tags", "OUTDOOR").unwrap();
    facets.toggle("status", "OPEN").unwrap();
    assert!(facets.filtered(&corpus).is_empty());

    facets.clear_all();
    assert_eq!(facets.filtered(&corpus).len(), 3);
    for view in facets.views() {
        if let FacetView::Categorical { selected, .. } = view {
            assert!(selected.is_empty());
        }
    }
}

#[test]
fn counts_ignore_their_own_selection() {
    let corpus = three_requests();
    let mut facets = request_facets();
    facets.toggle("tags", "INDOOR").unwrap();
    facets.toggle("status", "OPEN").unwrap();

    let tag_counts = facets.counts("tags", &corpus).unwrap();
    let count_of = |key: &str| tag_counts.iter().find(|(v, _)| v.key == key).map(|(_, n)| *n);
    assert_eq!(count_of("INDOOR"), Some(1));
    assert_eq!(count_of("GROUP_WORK"), Some(1));
    // Football is IN_PROGRESS, so the status selection hides it.
    assert_eq!(count_of("OUTDOOR"), Some(0));
    assert_eq!(count_of("URGENT"), Some(0));
}

#[test]
fn profile_ranges_follow_the_corpus_maximum() {
    let corpus = vec![
        profile("1", "Ada", "L", 12, UserSection::Mathematics),
        profile("2", "Alan", "T", 75, UserSection::ComputerScience),
        profile("3", "Grace", "H", 40, UserSection::ComputerScience),
    ];
    let mut facets = profile_facets();
    facets.update_max_bounds(&corpus);

    let kudos = facets.views().into_iter().find(|v| v.id() == "kudos").unwrap();
    let FacetView::Range { max_bound, current, .. } = kudos else {
        panic!("kudos is a range facet");
    };
    assert_eq!(max_bound, 75);
    assert_eq!(current, (0, 75));
    assert_eq!(facets.filtered(&corpus).len(), 3);

    facets.set_range("kudos", 10, 40).unwrap();
    facets.toggle("section", "COMPUTER_SCIENCE").unwrap();
    assert_eq!(ids(&facets.filtered(&corpus), |p| p.id.as_str()), vec!["3"]);

    facets.clear("kudos").unwrap();
    assert_eq!(facets.filtered(&corpus).len(), 2);
}
