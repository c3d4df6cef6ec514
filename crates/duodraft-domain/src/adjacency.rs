//! Adjacency module - who has already been paired with whom
//!
//! The adjacency index is derived data: for every student it holds the union,
//! over all rounds, of the students they shared a pair with. Folding rounds
//! into an [`AdjacencyMap`] is a set union, so it is idempotent and
//! independent of the order rounds are applied in.

use crate::id::StudentId;
use crate::round::Round;
use std::collections::{BTreeMap, BTreeSet};

/// Everyone a single student has ever been paired with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjacencyRecord {
    /// Student this record belongs to
    pub student_id: StudentId,

    /// Students previously paired with `student_id`
    pub paired_with: BTreeSet<StudentId>,
}

impl AdjacencyRecord {
    /// An empty record for a student with no history
    pub fn empty(student_id: StudentId) -> Self {
        Self {
            student_id,
            paired_with: BTreeSet::new(),
        }
    }
}

/// Mapping from student id to the set of previously paired students
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjacencyMap(BTreeMap<StudentId, BTreeSet<StudentId>>);

impl AdjacencyMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a sequence of rounds into a map
    ///
    /// # Examples
    ///
    /// ```
    /// use duodraft_domain::{AdjacencyMap, Round};
    ///
    /// let map = AdjacencyMap::from_rounds(std::iter::empty::<&Round>());
    /// assert!(map.is_empty());
    /// ```
    pub fn from_rounds<'a>(rounds: impl IntoIterator<Item = &'a Round>) -> Self {
        let mut map = Self::new();
        for round in rounds {
            map.merge_round(round);
        }
        map
    }

    /// Add the symmetric edges of every two-member pair in `round`
    pub fn merge_round(&mut self, round: &Round) {
        for (a, b) in round.edges() {
            self.add_edge(a, b);
        }
    }

    /// Record that `a` and `b` were paired
    pub fn add_edge(&mut self, a: &StudentId, b: &StudentId) {
        self.0.entry(a.clone()).or_default().insert(b.clone());
        self.0.entry(b.clone()).or_default().insert(a.clone());
    }

    /// Make sure `student` has an entry, empty if they have no history
    pub fn ensure(&mut self, student: &StudentId) {
        self.0.entry(student.clone()).or_default();
    }

    /// Partners of a single student
    pub fn partners(&self, student: &StudentId) -> Option<&BTreeSet<StudentId>> {
        self.0.get(student)
    }

    /// Whether `a` and `b` have been paired before
    pub fn have_paired(&self, a: &StudentId, b: &StudentId) -> bool {
        self.0.get(a).is_some_and(|set| set.contains(b))
    }

    /// Restrict the map to the given students, keeping an empty entry for any
    /// student without history
    pub fn restrict(&self, students: &BTreeSet<StudentId>) -> Self {
        let inner = students
            .iter()
            .map(|s| (s.clone(), self.0.get(s).cloned().unwrap_or_default()))
            .collect();
        Self(inner)
    }

    /// Number of students in the map
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map has no students
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(student, partners)` entries in id order
    pub fn iter(&self) -> impl Iterator<Item = (&StudentId, &BTreeSet<StudentId>)> {
        self.0.iter()
    }

    /// Convert into per-student records
    pub fn into_records(self) -> Vec<AdjacencyRecord> {
        self.0
            .into_iter()
            .map(|(student_id, paired_with)| AdjacencyRecord {
                student_id,
                paired_with,
            })
            .collect()
    }
}

impl FromIterator<AdjacencyRecord> for AdjacencyMap {
    fn from_iter<I: IntoIterator<Item = AdjacencyRecord>>(iter: I) -> Self {
        let mut map = Self::new();
        for record in iter {
            map.0
                .entry(record.student_id)
                .or_default()
                .extend(record.paired_with);
        }
        map
    }
}

impl IntoIterator for AdjacencyMap {
    type Item = (StudentId, BTreeSet<StudentId>);
    type IntoIter = std::collections::btree_map::IntoIter<StudentId, BTreeSet<StudentId>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
