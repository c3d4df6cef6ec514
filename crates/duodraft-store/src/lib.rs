//! DuoDraft Storage Layer
//!
//! Implements the [`RoundStore`] and [`AdjacencyIndex`] traits on SQLite.
//!
//! # Architecture
//!
//! - `pair_history` holds the append-only ledger of rounds
//! - `student_pairs` holds the adjacency index, one row per directed edge
//! - Every merge and rebuild runs in a single transaction
//!
//! # Examples
//!
//! ```no_run
//! use duodraft_store::SqliteStore;
//!
//! let store = SqliteStore::new(":memory:").unwrap();
//! // Store is now ready for round operations
//! ```

#![warn(missing_docs)]

mod records;

use duodraft_domain::traits::{AdjacencyIndex, RoundPage, RoundStore};
use duodraft_domain::{AdjacencyMap, AdjacencyRecord, NewRound, Round, RoundId, StudentId, TeacherId};
use records::{decode_pairs, encode_pairs};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Pair snapshot (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

const ROUND_COLUMNS: &str = "seq, id, teacher_id, created_at, shuffle_number, pairs";

/// SQLite-based implementation of the round store and adjacency index
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Share a store between tasks
/// behind a mutex, or give each thread its own `SqliteStore`.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let mut store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&mut self) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        self.conn.execute_batch(schema)?;
        Ok(())
    }

    fn now_millis() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    fn round_id_to_bytes(id: RoundId) -> Vec<u8> {
        id.value().to_be_bytes().to_vec()
    }

    fn bytes_to_round_id(bytes: &[u8]) -> Result<RoundId, StoreError> {
        let arr: [u8; 16] = bytes.try_into().map_err(|_| {
            StoreError::InvalidData(format!("Expected 16 bytes for RoundId, got {}", bytes.len()))
        })?;
        Ok(RoundId::from_value(u128::from_be_bytes(arr)))
    }

    fn conversion_error(column: usize, ty: rusqlite::types::Type, e: StoreError) -> rusqlite::Error {
        rusqlite::Error::FromSqlConversionFailure(column, ty, Box::new(e))
    }

    fn row_to_round(row: &rusqlite::Row<'_>) -> rusqlite::Result<Round> {
        use rusqlite::types::Type;

        let id_bytes: Vec<u8> = row.get(1)?;
        let id = Self::bytes_to_round_id(&id_bytes)
            .map_err(|e| Self::conversion_error(1, Type::Blob, e))?;

        let teacher: String = row.get(2)?;
        let teacher_id = TeacherId::parse(&teacher).map_err(|e| {
            Self::conversion_error(2, Type::Text, StoreError::InvalidData(e.to_string()))
        })?;

        let pairs_json: String = row.get(5)?;
        let pairs = decode_pairs(&pairs_json).map_err(|e| Self::conversion_error(5, Type::Text, e))?;

        Ok(Round {
            id,
            teacher_id,
            pairs,
            created_at: row.get::<_, i64>(3)? as u64,
            sequence: row.get::<_, i64>(0)? as u64,
            shuffle_number: row.get(4)?,
        })
    }

    fn merge_edges(conn: &Connection, round: &Round) -> Result<(), StoreError> {
        let mut stmt = conn.prepare_cached(
            "INSERT OR IGNORE INTO student_pairs (student_id, paired_with) VALUES (?1, ?2)",
        )?;
        for (a, b) in round.edges() {
            stmt.execute(params![a.as_str(), b.as_str()])?;
            stmt.execute(params![b.as_str(), a.as_str()])?;
        }
        conn.execute(
            "UPDATE pair_history SET indexed = 1 WHERE id = ?1",
            params![Self::round_id_to_bytes(round.id)],
        )?;
        Ok(())
    }

    // Removes both directions so partners outside the set keep no dangling edge
    fn clear_students(conn: &Connection, students: &BTreeSet<StudentId>) -> Result<(), StoreError> {
        let mut stmt = conn.prepare_cached(
            "DELETE FROM student_pairs WHERE student_id = ?1 OR paired_with = ?1",
        )?;
        for student in students {
            stmt.execute(params![student.as_str()])?;
        }
        Ok(())
    }
}

impl RoundStore for SqliteStore {
    type Error = StoreError;

    fn append_round(&mut self, round: NewRound) -> Result<Round, Self::Error> {
        let id = RoundId::new();
        let created_at = Self::now_millis();
        let pairs_json = encode_pairs(round.pairs())?;

        self.conn.execute(
            "INSERT INTO pair_history (id, teacher_id, created_at, shuffle_number, pairs)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                Self::round_id_to_bytes(id),
                round.teacher_id().as_str(),
                created_at as i64,
                round.shuffle_number(),
                pairs_json,
            ],
        )?;
        let sequence = self.conn.last_insert_rowid() as u64;

        Ok(round.into_round(id, created_at, sequence))
    }

    fn latest_round(&self, teacher: &TeacherId) -> Result<Option<Round>, Self::Error> {
        let sql = format!(
            "SELECT {} FROM pair_history WHERE teacher_id = ?1
             ORDER BY created_at DESC, seq DESC LIMIT 1",
            ROUND_COLUMNS
        );
        let round = self
            .conn
            .query_row(&sql, params![teacher.as_str()], Self::row_to_round)
            .optional()?;
        Ok(round)
    }

    fn get_round(&self, teacher: &TeacherId, id: RoundId) -> Result<Option<Round>, Self::Error> {
        let sql = format!(
            "SELECT {} FROM pair_history WHERE id = ?1 AND teacher_id = ?2",
            ROUND_COLUMNS
        );
        let round = self
            .conn
            .query_row(
                &sql,
                params![Self::round_id_to_bytes(id), teacher.as_str()],
                Self::row_to_round,
            )
            .optional()?;
        Ok(round)
    }

    fn list_rounds(&self, teacher: &TeacherId, page: &RoundPage) -> Result<Vec<Round>, Self::Error> {
        let sql = format!(
            "SELECT {} FROM pair_history WHERE teacher_id = ?1
             ORDER BY created_at DESC, seq DESC LIMIT ?2 OFFSET ?3",
            ROUND_COLUMNS
        );
        // SQLite treats a negative LIMIT as "no limit"; values past i64::MAX
        // clamp rather than wrap negative
        let limit = page
            .limit
            .map(|l| i64::try_from(l).unwrap_or(i64::MAX))
            .unwrap_or(-1);
        let offset = i64::try_from(page.offset).unwrap_or(i64::MAX);

        let mut stmt = self.conn.prepare(&sql)?;
        let rounds = stmt
            .query_map(params![teacher.as_str(), limit, offset], Self::row_to_round)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rounds)
    }

    fn count_rounds(&self, teacher: &TeacherId) -> Result<u64, Self::Error> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pair_history WHERE teacher_id = ?1",
            params![teacher.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn unindexed_rounds(&self) -> Result<Vec<Round>, Self::Error> {
        let sql = format!(
            "SELECT {} FROM pair_history WHERE indexed = 0 ORDER BY seq ASC",
            ROUND_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rounds = stmt
            .query_map([], Self::row_to_round)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rounds)
    }

    fn rounds_with_students(&self, students: &BTreeSet<StudentId>) -> Result<Vec<Round>, Self::Error> {
        if students.is_empty() {
            return Ok(Vec::new());
        }
        let ids = serde_json::to_string(&students.iter().map(StudentId::as_str).collect::<Vec<_>>())?;
        let sql = format!(
            "SELECT {} FROM pair_history
             WHERE EXISTS (
                 SELECT 1 FROM json_each(pair_history.pairs) AS p
                 WHERE json_extract(p.value, '$.student1.id') IN (SELECT value FROM json_each(?1))
                    OR json_extract(p.value, '$.student2.id') IN (SELECT value FROM json_each(?1))
             )
             ORDER BY seq ASC",
            ROUND_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rounds = stmt
            .query_map(params![ids], Self::row_to_round)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rounds)
    }
}

impl AdjacencyIndex for SqliteStore {
    type Error = StoreError;

    fn merge(&mut self, round: &Round) -> Result<(), Self::Error> {
        let tx = self.conn.transaction()?;
        Self::merge_edges(&tx, round)?;
        tx.commit()?;
        Ok(())
    }

    fn resolve(&self, students: &BTreeSet<StudentId>) -> Result<AdjacencyMap, Self::Error> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT paired_with FROM student_pairs WHERE student_id = ?1")?;

        let mut records = Vec::with_capacity(students.len());
        for student in students {
            let paired_with = stmt
                .query_map(params![student.as_str()], |row| row.get::<_, String>(0))?
                .map(|raw| {
                    let raw = raw?;
                    StudentId::parse(&raw)
                        .map_err(|e| StoreError::InvalidData(format!("stored partner id: {}", e)))
                })
                .collect::<Result<BTreeSet<_>, _>>()?;
            records.push(AdjacencyRecord {
                student_id: student.clone(),
                paired_with,
            });
        }

        Ok(records.into_iter().collect())
    }

    fn clear(&mut self, students: &BTreeSet<StudentId>) -> Result<(), Self::Error> {
        let tx = self.conn.transaction()?;
        Self::clear_students(&tx, students)?;
        tx.commit()?;
        Ok(())
    }

    fn rebuild(&mut self, students: &BTreeSet<StudentId>, rounds: &[Round]) -> Result<(), Self::Error> {
        let tx = self.conn.transaction()?;
        Self::clear_students(&tx, students)?;
        for round in rounds {
            Self::merge_edges(&tx, round)?;
        }
        tx.commit()?;
        Ok(())
    }
}
