#![allow(dead_code)]

use search_core::profile::{UserProfile, UserSection};
use search_core::request::{Request, RequestStatus, RequestType, Tags};

pub fn request(id: &str, title: &str, types: &[RequestType], status: RequestStatus, tags: &[Tags]) -> Request {
    Request {
        request_id: id.to_string(),
        title: title.to_string(),
        description: String::new(),
        request_type: types.to_vec(),
        location_name: String::new(),
        status,
        tags: tags.to_vec(),
        people: Vec::new(),
        creator_id: "creator".to_string(),
    }
}

pub fn profile(id: &str, name: &str, last_name: &str, kudos: i64, section: UserSection) -> UserProfile {
    UserProfile {
        id: id.to_string(),
        name: name.to_string(),
        last_name: last_name.to_string(),
        email: format!("{}@example.org", name.to_lowercase()),
        kudos,
        help_received: 0,
        section,
        arrival_date: 0,
    }
}

/// "Study group" (GROUP_WORK), "Pizza night" (INDOOR), "Football" (OUTDOOR).
pub fn three_requests() -> Vec<Request> {
    vec![
        request("study", "Study group", &[RequestType::StudyGroup], RequestStatus::Open, &[Tags::GroupWork]),
        request("pizza", "Pizza night", &[RequestType::Eating], RequestStatus::Open, &[Tags::Indoor]),
        request("football", "Football", &[RequestType::Sport], RequestStatus::InProgress, &[Tags::Outdoor]),
    ]
}
