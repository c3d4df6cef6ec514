//! JSON request and response bodies.
//!
//! Field names are camelCase on the wire. Requests are converted into
//! validated domain types before they reach the service.

use chrono::{DateTime, Utc};
use duodraft_domain::{
    AdjacencyMap, NewRound, Pair, Round, StudentId, StudentRef, TeacherId, ValidationError,
};
use duodraft_history::{HistoryView, RebuildReport, RoundListing, RoundSummary, RoundWithHistory};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Student snapshot as sent by the roster UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentDto {
    /// Student object id
    #[serde(rename = "_id", alias = "id")]
    pub id: String,

    /// Display name
    pub name: String,

    /// Profile image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// One pair, `student2` absent for the odd student out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairDto {
    /// First member
    pub student1: StudentDto,

    /// Second member
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student2: Option<StudentDto>,
}

/// POST body for saving a round
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRoundRequest {
    /// Owning teacher
    pub teacher_id: String,

    /// Pairs in display order; absent or `null` reads as empty so validation
    /// reports it
    #[serde(default, deserialize_with = "null_as_empty")]
    pub pairs: Vec<PairDto>,

    /// Tag for the shuffle that produced the pairs
    #[serde(default = "default_shuffle_number")]
    pub shuffle_number: u32,
}

fn default_shuffle_number() -> u32 {
    1
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl StudentDto {
    fn into_domain(self) -> Result<StudentRef, ValidationError> {
        Ok(StudentRef {
            id: StudentId::parse(&self.id)?,
            name: self.name,
            image: self.image,
        })
    }
}

impl From<&StudentRef> for StudentDto {
    fn from(student: &StudentRef) -> Self {
        Self {
            id: student.id.to_string(),
            name: student.name.clone(),
            image: student.image.clone(),
        }
    }
}

impl From<&Pair> for PairDto {
    fn from(pair: &Pair) -> Self {
        Self {
            student1: StudentDto::from(&pair.student1),
            student2: pair.student2.as_ref().map(StudentDto::from),
        }
    }
}

impl TryFrom<SaveRoundRequest> for NewRound {
    type Error = ValidationError;

    fn try_from(request: SaveRoundRequest) -> Result<Self, Self::Error> {
        let teacher_id = TeacherId::parse(&request.teacher_id)?;
        let pairs = request
            .pairs
            .into_iter()
            .map(|pair| -> Result<Pair, ValidationError> {
                Ok(Pair {
                    student1: pair.student1.into_domain()?,
                    student2: pair.student2.map(StudentDto::into_domain).transpose()?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        NewRound::new(teacher_id, pairs, request.shuffle_number)
    }
}

/// Convert stored Unix milliseconds to a UTC timestamp
pub fn millis_to_datetime(millis: u64) -> DateTime<Utc> {
    i64::try_from(millis)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or_default()
}

/// A stored round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResponse {
    /// Round id (UUID)
    pub id: String,
    /// Owning teacher
    pub teacher_id: String,
    /// Save time
    pub created_at: DateTime<Utc>,
    /// Shuffle tag
    pub shuffle_number: u32,
    /// Pairs in display order
    pub pairs: Vec<PairDto>,
}

impl From<&Round> for RoundResponse {
    fn from(round: &Round) -> Self {
        Self {
            id: round.id.to_string(),
            teacher_id: round.teacher_id.to_string(),
            created_at: millis_to_datetime(round.created_at),
            shuffle_number: round.shuffle_number,
            pairs: round.pairs.iter().map(PairDto::from).collect(),
        }
    }
}

/// A round plus everyone its students have been paired with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundWithHistoryResponse {
    /// The round
    #[serde(flatten)]
    pub round: RoundResponse,

    /// Student id to the ids of previous partners
    pub previous_pairs_map: BTreeMap<String, Vec<String>>,
}

fn adjacency_to_json(map: &AdjacencyMap) -> BTreeMap<String, Vec<String>> {
    map.iter()
        .map(|(student, partners)| {
            (
                student.to_string(),
                partners.iter().map(ToString::to_string).collect(),
            )
        })
        .collect()
}

impl From<&RoundWithHistory> for RoundWithHistoryResponse {
    fn from(found: &RoundWithHistory) -> Self {
        Self {
            round: RoundResponse::from(&found.round),
            previous_pairs_map: adjacency_to_json(&found.previous_pairs),
        }
    }
}

/// Listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundSummaryResponse {
    /// Round id
    pub id: String,
    /// Save time
    pub created_at: DateTime<Utc>,
    /// Shuffle tag
    pub shuffle_number: u32,
    /// Number of pairs
    pub pair_count: usize,
    /// Number of students
    pub student_count: usize,
}

impl From<&RoundSummary> for RoundSummaryResponse {
    fn from(summary: &RoundSummary) -> Self {
        Self {
            id: summary.id.to_string(),
            created_at: millis_to_datetime(summary.created_at),
            shuffle_number: summary.shuffle_number,
            pair_count: summary.pair_count,
            student_count: summary.student_count,
        }
    }
}

/// One page of rounds, newest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundListResponse {
    /// Rounds stored for the teacher
    pub total: u64,
    /// Offset of the first entry
    pub offset: usize,
    /// Page entries
    pub rounds: Vec<RoundSummaryResponse>,
}

impl From<&RoundListing> for RoundListResponse {
    fn from(listing: &RoundListing) -> Self {
        Self {
            total: listing.total,
            offset: listing.offset,
            rounds: listing.rounds.iter().map(RoundSummaryResponse::from).collect(),
        }
    }
}

/// Result of an index rebuild
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebuildResponse {
    /// Teacher whose ledger was replayed
    pub teacher_id: String,
    /// Rounds replayed
    pub rounds_replayed: usize,
    /// Students whose records were reset
    pub students_reset: usize,
}

impl From<&RebuildReport> for RebuildResponse {
    fn from(report: &RebuildReport) -> Self {
        Self {
            teacher_id: report.teacher_id.to_string(),
            rounds_replayed: report.rounds_replayed,
            students_reset: report.students_reset,
        }
    }
}

/// Query string for round listings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    /// Rounds to skip
    pub offset: Option<usize>,
    /// Page size, capped by the server
    pub limit: Option<usize>,
}

/// `view` query parameter for a single round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewParam {
    /// Current adjacency state
    #[default]
    Current,
    /// Adjacency as of the requested round
    AsOf,
}

/// Query string for a single round
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewQuery {
    /// Which history to attach
    #[serde(default)]
    pub view: ViewParam,
}

impl From<ViewParam> for HistoryView {
    fn from(view: ViewParam) -> Self {
        match view {
            ViewParam::Current => HistoryView::Current,
            ViewParam::AsOf => HistoryView::AsOfRound,
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// "healthy", "degraded" (rounds waiting for the index) or "unhealthy"
    pub status: String,
    /// Rounds in the ledger not yet merged into the index
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unindexed_rounds: Option<usize>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}
