//! Round module - one saved pairing assignment for a class

use crate::id::{IdError, StudentId, TeacherId};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Unique identifier for a round based on UUIDv7
///
/// UUIDv7 keeps ids roughly chronological, which makes the ledger easy to
/// eyeball, but ordering is always decided by `(created_at, sequence)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoundId(u128);

impl RoundId {
    /// Generate a new UUIDv7-based RoundId
    ///
    /// # Examples
    ///
    /// ```
    /// use duodraft_domain::RoundId;
    ///
    /// let id = RoundId::new();
    /// assert!(id.value() > 0);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create a RoundId from a raw u128 value (storage deserialization)
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse a RoundId from its UUID string form
    ///
    /// # Examples
    ///
    /// ```
    /// use duodraft_domain::RoundId;
    ///
    /// let id = RoundId::new();
    /// let parsed = RoundId::parse(&id.to_string()).unwrap();
    /// assert_eq!(id, parsed);
    /// ```
    pub fn parse(s: &str) -> Result<Self, IdError> {
        uuid::Uuid::parse_str(s.trim())
            .map(|u| Self(u.as_u128()))
            .map_err(|e| IdError::Uuid(e.to_string()))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for RoundId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// Reference to a student plus the display snapshot taken when the round
/// was saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRef {
    /// Roster id
    pub id: StudentId,

    /// Display name at the time of the round
    pub name: String,

    /// Optional profile image location
    pub image: Option<String>,
}

impl StudentRef {
    /// Create a reference with no image
    pub fn new(id: StudentId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            image: None,
        }
    }

    /// Attach an image location
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

/// Two students grouped together, or a single student left over when the
/// class has an odd count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    /// First member
    pub student1: StudentRef,

    /// Second member, absent for the odd student out
    pub student2: Option<StudentRef>,
}

impl Pair {
    /// A pair of two students
    pub fn two(student1: StudentRef, student2: StudentRef) -> Self {
        Self {
            student1,
            student2: Some(student2),
        }
    }

    /// A single unpaired student
    pub fn single(student: StudentRef) -> Self {
        Self {
            student1: student,
            student2: None,
        }
    }

    /// The edge this pair contributes to the adjacency index, if any
    pub fn edge(&self) -> Option<(&StudentId, &StudentId)> {
        self.student2
            .as_ref()
            .map(|other| (&self.student1.id, &other.id))
    }

    fn members(&self) -> impl Iterator<Item = &StudentRef> {
        std::iter::once(&self.student1).chain(self.student2.iter())
    }
}

/// Reasons a round submission is rejected before it reaches the ledger
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Malformed identifier
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    /// The round has no pairs
    #[error("round must contain at least one pair")]
    EmptyPairs,

    /// A pair names the same student twice
    #[error("pair {index} pairs student {student} with itself")]
    SelfPair {
        /// Position of the pair in the round
        index: usize,
        /// Offending student
        student: StudentId,
    },

    /// A student appears in more than one pair
    #[error("student {0} appears more than once in the round")]
    DuplicateStudent(StudentId),
}

/// A validated round submission that has not been stored yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRound {
    teacher_id: TeacherId,
    pairs: Vec<Pair>,
    shuffle_number: u32,
}

impl NewRound {
    /// Validate a submission
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` when `pairs` is empty, a pair pairs a
    /// student with itself, or a student appears in more than one pair.
    pub fn new(
        teacher_id: TeacherId,
        pairs: Vec<Pair>,
        shuffle_number: u32,
    ) -> Result<Self, ValidationError> {
        if pairs.is_empty() {
            return Err(ValidationError::EmptyPairs);
        }

        let mut seen = BTreeSet::new();
        for (index, pair) in pairs.iter().enumerate() {
            if let Some((a, b)) = pair.edge() {
                if a == b {
                    return Err(ValidationError::SelfPair {
                        index,
                        student: a.clone(),
                    });
                }
            }
            for member in pair.members() {
                if !seen.insert(&member.id) {
                    return Err(ValidationError::DuplicateStudent(member.id.clone()));
                }
            }
        }

        Ok(Self {
            teacher_id,
            pairs,
            shuffle_number,
        })
    }

    /// Owning teacher
    pub fn teacher_id(&self) -> &TeacherId {
        &self.teacher_id
    }

    /// Pairs in submission order
    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    /// Shuffle number tag
    pub fn shuffle_number(&self) -> u32 {
        self.shuffle_number
    }

    /// Stamp the submission with the identity the store assigned
    pub fn into_round(self, id: RoundId, created_at: u64, sequence: u64) -> Round {
        Round {
            id,
            teacher_id: self.teacher_id,
            pairs: self.pairs,
            created_at,
            sequence,
            shuffle_number: self.shuffle_number,
        }
    }
}

/// A stored pairing round
///
/// Rounds are immutable once written; a correction is a new round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    /// Unique identifier
    pub id: RoundId,

    /// Owning teacher; partitions every query
    pub teacher_id: TeacherId,

    /// Pairs in submission order
    pub pairs: Vec<Pair>,

    /// Creation time, Unix milliseconds
    pub created_at: u64,

    /// Insertion sequence, breaks ties between equal `created_at`
    pub sequence: u64,

    /// Opaque tag of the pairing run that produced this round
    pub shuffle_number: u32,
}

impl Round {
    /// Every student appearing in this round
    pub fn student_ids(&self) -> BTreeSet<StudentId> {
        self.pairs
            .iter()
            .flat_map(|p| p.members())
            .map(|s| s.id.clone())
            .collect()
    }

    /// Edges this round contributes to the adjacency index
    pub fn edges(&self) -> impl Iterator<Item = (&StudentId, &StudentId)> {
        self.pairs.iter().filter_map(Pair::edge)
    }

    /// Ordering key: newest rounds compare greatest
    pub fn order_key(&self) -> (u64, u64) {
        (self.created_at, self.sequence)
    }
}
