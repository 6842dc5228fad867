use crate::facet::{EnumFacet, Facet, FacetDefinition, FacetKey, FacetRegistry, FacetValue, RangeDefinition, RangeFacet};
use crate::schema::{MatchMode, Schema};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

pub const DEFAULT_MAX_KUDOS: i64 = 50;
pub const DEFAULT_MAX_HELP: i64 = 50;

crate::facet_enum! {
    #[derive(Default)]
    pub enum UserSection {
        #[default]
        None => ("NONE", "None"),
        Architecture => ("ARCHITECTURE", "Architecture"),
        ChemistryAndChemicalEngineering => ("CHEMISTRY_AND_CHEMICAL_ENGINEERING", "Chemistry and Chemical Engineering"),
        CivilEngineering => ("CIVIL_ENGINEERING", "Civil Engineering"),
        CommunicationScience => ("COMMUNICATION_SCIENCE", "Communication Science"),
        ComputerScience => ("COMPUTER_SCIENCE", "Computer Science"),
        DigitalHumanities => ("DIGITAL_HUMANITIES", "Digital Humanities"),
        ElectricalEngineering => ("ELECTRICAL_ENGINEERING", "Electrical Engineering"),
        EnvironmentalSciencesAndEngineering => ("ENVIRONMENTAL_SCIENCES_AND_ENGINEERING", "Environmental Sciences and Engineering"),
        FinancialEngineering => ("FINANCIAL_ENGINEERING", "Financial Engineering"),
        LifeSciencesEngineering => ("LIFE_SCIENCES_ENGINEERING", "Life Sciences Engineering"),
        ManagementOfTechnology => ("MANAGEMENT_OF_TECHNOLOGY", "Management of Technology"),
        MaterialsScienceAndEngineering => ("MATERIALS_SCIENCE_AND_ENGINEERING", "Materials Science and Engineering"),
        Mathematics => ("MATHEMATICS", "Mathematics"),
        MechanicalEngineering => ("MECHANICAL_ENGINEERING", "Mechanical Engineering"),
        Microengineering => ("MICROENGINEERING", "Microengineering"),
        NeuroX => ("NEURO_X", "Neuro-X"),
        Physics => ("PHYSICS", "Physics"),
        QuantumScienceAndEngineering => ("QUANTUM_SCIENCE_AND_ENGINEERING", "Quantum Science and Engineering"),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub kudos: i64,
    #[serde(default)]
    pub help_received: i64,
    #[serde(default)]
    pub section: UserSection,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub arrival_date: i64,
}

fn profile_id(p: &UserProfile) -> &str {
    &p.id
}

/// Name search: every typed term must prefix a first or last name.
pub fn profile_schema() -> Schema<UserProfile> {
    Schema::new(profile_id)
        .field("name", 1.0, |p: &UserProfile| p.name.clone())
        .field("lastName", 1.0, |p: &UserProfile| p.last_name.clone())
        .with_match_mode(MatchMode::AllTermsPrefix)
}

pub fn profile_facets() -> FacetRegistry<UserProfile> {
    FacetRegistry::new(vec![
        Facet::Categorical(EnumFacet::new(FacetDefinition {
            id: "section",
            title: "Section",
            values: UserSection::ALL
                .iter()
                .filter(|s| **s != UserSection::None)
                .map(|s| FacetValue::of(*s))
                .collect(),
            extract: |p: &UserProfile| vec![p.section.key()],
        })),
        Facet::Range(RangeFacet::new(RangeDefinition {
            id: "kudos",
            title: "Kudos",
            min_bound: 0,
            max_bound: DEFAULT_MAX_KUDOS,
            step: 1,
            extract: |p: &UserProfile| p.kudos,
        })),
        Facet::Range(RangeFacet::new(RangeDefinition {
            id: "helpReceived",
            title: "Help Received",
            min_bound: 0,
            max_bound: DEFAULT_MAX_HELP,
            step: 1,
            extract: |p: &UserProfile| p.help_received,
        })),
    ])
}

/// Leaderboard orderings. Ties fall back to lowercase name, then id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeaderboardSort {
    #[default]
    KudosDesc,
    KudosAsc,
    HelpDesc,
    HelpAsc,
    NameAsc,
    NameDesc,
    ArrivalDesc,
    ArrivalAsc,
}

impl LeaderboardSort {
    pub const ALL: &'static [LeaderboardSort] = &[
        LeaderboardSort::KudosDesc,
        LeaderboardSort::KudosAsc,
        LeaderboardSort::HelpDesc,
        LeaderboardSort::HelpAsc,
        LeaderboardSort::NameAsc,
        LeaderboardSort::NameDesc,
        LeaderboardSort::ArrivalDesc,
        LeaderboardSort::ArrivalAsc,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LeaderboardSort::KudosDesc => "kudos-desc",
            LeaderboardSort::KudosAsc => "kudos-asc",
            LeaderboardSort::HelpDesc => "help-desc",
            LeaderboardSort::HelpAsc => "help-asc",
            LeaderboardSort::NameAsc => "name-asc",
            LeaderboardSort::NameDesc => "name-desc",
            LeaderboardSort::ArrivalDesc => "arrival-desc",
            LeaderboardSort::ArrivalAsc => "arrival-asc",
        }
    }

    pub fn comparator(self) -> fn(&UserProfile, &UserProfile) -> Ordering {
        match self {
            LeaderboardSort::KudosDesc => |a, b| b.kudos.cmp(&a.kudos).then_with(|| by_name_then_id(a, b)),
            LeaderboardSort::KudosAsc => |a, b| a.kudos.cmp(&b.kudos).then_with(|| by_name_then_id(a, b)),
            LeaderboardSort::HelpDesc => {
                |a, b| b.help_received.cmp(&a.help_received).then_with(|| by_name_then_id(a, b))
            }
            LeaderboardSort::HelpAsc => {
                |a, b| a.help_received.cmp(&b.help_received).then_with(|| by_name_then_id(a, b))
            }
            LeaderboardSort::NameAsc => |a, b| {
                a.name
                    .to_lowercase()
                    .cmp(&b.name.to_lowercase())
                    .then_with(|| a.last_name.to_lowercase().cmp(&b.last_name.to_lowercase()))
                    .then_with(|| a.id.cmp(&b.id))
            },
            LeaderboardSort::NameDesc => |a, b| {
                b.name
                    .to_lowercase()
                    .cmp(&a.name.to_lowercase())
                    .then_with(|| b.last_name.to_lowercase().cmp(&a.last_name.to_lowercase()))
                    .then_with(|| a.id.cmp(&b.id))
            },
            LeaderboardSort::ArrivalDesc => {
                |a, b| b.arrival_date.cmp(&a.arrival_date).then_with(|| by_name_then_id(a, b))
            }
            LeaderboardSort::ArrivalAsc => {
                |a, b| a.arrival_date.cmp(&b.arrival_date).then_with(|| by_name_then_id(a, b))
            }
        }
    }
}

impl FromStr for LeaderboardSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeaderboardSort::ALL
            .iter()
            .copied()
            .find(|o| o.as_str() == s)
            .ok_or_else(|| format!("unknown sort order {s:?}"))
    }
}

fn by_name_then_id(a: &UserProfile, b: &UserProfile) -> Ordering {
    a.name.to_lowercase().cmp(&b.name.to_lowercase()).then_with(|| a.id.cmp(&b.id))
}
