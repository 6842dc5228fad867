use crate::facet::{EnumFacet, Facet, FacetDefinition, FacetKey, FacetRegistry, FacetValue};
use crate::schema::Schema;
use serde::{Deserialize, Serialize};

crate::facet_enum! {
    pub enum RequestType {
        Studying => ("STUDYING", "Studying"),
        StudyGroup => ("STUDY_GROUP", "Study group"),
        HangingOut => ("HANGING_OUT", "Hanging out"),
        Eating => ("EATING", "Eating"),
        Sport => ("SPORT", "Sport"),
        Hardware => ("HARDWARE", "Hardware"),
        LostAndFound => ("LOST_AND_FOUND", "Lost and found"),
        Other => ("OTHER", "Other"),
    }
}

crate::facet_enum! {
    pub enum RequestStatus {
        Open => ("OPEN", "Open"),
        InProgress => ("IN_PROGRESS", "In progress"),
        Archived => ("ARCHIVED", "Archived"),
        Completed => ("COMPLETED", "Completed"),
        Cancelled => ("CANCELLED", "Cancelled"),
    }
}

crate::facet_enum! {
    pub enum Tags {
        Urgent => ("URGENT", "Urgent"),
        Easy => ("EASY", "Easy"),
        GroupWork => ("GROUP_WORK", "Group work"),
        SoloWork => ("SOLO_WORK", "Solo work"),
        Outdoor => ("OUTDOOR", "Outdoor"),
        Indoor => ("INDOOR", "Indoor"),
    }
}

/// A help request posted on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub request_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub request_type: Vec<RequestType>,
    #[serde(default)]
    pub location_name: String,
    pub status: RequestStatus,
    #[serde(default)]
    pub tags: Vec<Tags>,
    #[serde(default)]
    pub people: Vec<String>,
    #[serde(default)]
    pub creator_id: String,
}

fn request_id(r: &Request) -> &str {
    &r.request_id
}

fn join_keys<K: FacetKey>(values: &[K]) -> String {
    values.iter().map(|v| v.key()).collect::<Vec<_>>().join(" ")
}

/// Searchable fields of a request. Categorical values are indexed by key, which the
/// tokenizer splits on `_`.
pub fn request_schema() -> Schema<Request> {
    Schema::new(request_id)
        .field("title", 3.0, |r: &Request| r.title.clone())
        .field("description", 1.5, |r: &Request| r.description.clone())
        .field("locationName", 2.0, |r: &Request| r.location_name.clone())
        .field("requestType", 1.2, |r: &Request| join_keys(&r.request_type))
        .field("tags", 1.2, |r: &Request| join_keys(&r.tags))
        .field("status", 1.0, |r: &Request| r.status.key().to_string())
}

pub fn request_facets() -> FacetRegistry<Request> {
    FacetRegistry::new(vec![
        Facet::Categorical(EnumFacet::new(FacetDefinition {
            id: "type",
            title: "Type",
            values: FacetValue::all::<RequestType>(),
            extract: |r: &Request| r.request_type.iter().map(|t| t.key()).collect(),
        })),
        Facet::Categorical(EnumFacet::new(FacetDefinition {
            id: "status",
            title: "Status",
            values: vec![
                FacetValue::of(RequestStatus::Open),
                FacetValue::of(RequestStatus::InProgress),
            ],
            extract: |r: &Request| vec![r.status.key()],
        })),
        Facet::Categorical(EnumFacet::new(FacetDefinition {
            id: "tags",
            title: "Tags",
            values: FacetValue::all::<Tags>(),
            extract: |r: &Request| r.tags.iter().map(|t| t.key()).collect(),
        })),
    ])
}
