//! Serialized form of a round's pairs
//!
//! Pairs are kept as a JSON document in the `pairs` column so the student
//! snapshots survive exactly as they were when the round was saved.

use crate::StoreError;
use duodraft_domain::{Pair, StudentId, StudentRef};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct StoredStudent {
    id: String,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredPair {
    student1: StoredStudent,
    #[serde(default)]
    student2: Option<StoredStudent>,
}

impl From<&StudentRef> for StoredStudent {
    fn from(s: &StudentRef) -> Self {
        Self {
            id: s.id.to_string(),
            name: s.name.clone(),
            image: s.image.clone(),
        }
    }
}

impl TryFrom<StoredStudent> for StudentRef {
    type Error = StoreError;

    fn try_from(s: StoredStudent) -> Result<Self, Self::Error> {
        let id = StudentId::parse(&s.id)
            .map_err(|e| StoreError::InvalidData(format!("stored student id: {}", e)))?;
        Ok(StudentRef {
            id,
            name: s.name,
            image: s.image,
        })
    }
}

/// Encode pairs for the `pairs` column
pub(crate) fn encode_pairs(pairs: &[Pair]) -> Result<String, StoreError> {
    let stored: Vec<StoredPair> = pairs
        .iter()
        .map(|p| StoredPair {
            student1: (&p.student1).into(),
            student2: p.student2.as_ref().map(Into::into),
        })
        .collect();
    Ok(serde_json::to_string(&stored)?)
}

/// Decode the `pairs` column
pub(crate) fn decode_pairs(json: &str) -> Result<Vec<Pair>, StoreError> {
    let stored: Vec<StoredPair> = serde_json::from_str(json)?;
    stored
        .into_iter()
        .map(|p| -> Result<Pair, StoreError> {
            Ok(Pair {
                student1: p.student1.try_into()?,
                student2: p.student2.map(TryInto::try_into).transpose()?,
            })
        })
        .collect()
}
