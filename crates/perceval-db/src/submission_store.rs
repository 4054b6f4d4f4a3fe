//! Durable submission log on the `submissions` table.
//!
//! Every row records the seed of the competition it was made in, for later
//! auditing. Rows are ordered by `(created_at, id)`, which matches the
//! ordering key of [`Submission`].

use perceval_core::submission::{SubmissionError, SubmissionLog};
use perceval_types::{GroupKey, Guess, NewSubmission, Submission};
use sqlx::PgPool;

use crate::error::DbError;

/// A row from the `submissions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SubmissionRow {
    /// Auto-incremented row ID.
    pub id: i64,
    /// Insertion timestamp.
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Seed of the competition the submission was made in.
    pub seed: i64,
    /// Round index.
    pub round: i32,
    /// Lap index.
    pub lap: i32,
    /// Key of the submitting group.
    pub key: String,
    /// Guess wire name.
    pub guess: String,
    /// Disqualification flag.
    pub disqualified: bool,
}

impl TryFrom<SubmissionRow> for Submission {
    type Error = SubmissionError;

    fn try_from(row: SubmissionRow) -> Result<Self, Self::Error> {
        let corrupt = |reason: String| SubmissionError::Corrupt { id: row.id, reason };
        Ok(Self {
            sequence: u64::try_from(row.id).map_err(|e| corrupt(e.to_string()))?,
            timestamp: row.created_at,
            key: GroupKey::new(row.key.clone()),
            round: usize::try_from(row.round).map_err(|e| corrupt(e.to_string()))?,
            lap: usize::try_from(row.lap).map_err(|e| corrupt(e.to_string()))?,
            guess: row
                .guess
                .parse::<Guess>()
                .map_err(|e| corrupt(e.to_string()))?,
            disqualified: row.disqualified,
        })
    }
}

/// [`SubmissionLog`] backed by `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PgSubmissionLog {
    pool: PgPool,
    seed: i64,
}

impl PgSubmissionLog {
    /// Create a log bound to `pool`, tagging rows with `seed`.
    pub fn new(pool: PgPool, seed: u64) -> Self {
        Self {
            pool,
            seed: i64::try_from(seed).unwrap_or(i64::MAX),
        }
    }

    async fn insert(&self, submission: &NewSubmission) -> Result<SubmissionRow, DbError> {
        let row = sqlx::query_as::<_, SubmissionRow>(
            r"INSERT INTO submissions (seed, round, lap, key, guess, disqualified)
              VALUES ($1, $2, $3, $4, $5, $6)
              RETURNING id, created_at, seed, round, lap, key, guess, disqualified",
        )
        .bind(self.seed)
        .bind(to_column("round", submission.round)?)
        .bind(to_column("lap", submission.lap)?)
        .bind(submission.key.as_str())
        .bind(submission.guess.as_str())
        .bind(submission.disqualified)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(id = row.id, round = row.round, lap = row.lap, "Inserted submission");
        Ok(row)
    }

    async fn select(&self, round: Option<usize>) -> Result<Vec<SubmissionRow>, DbError> {
        let rows = match round {
            Some(round) => {
                sqlx::query_as::<_, SubmissionRow>(
                    r"SELECT id, created_at, seed, round, lap, key, guess, disqualified
                      FROM submissions
                      WHERE round = $1
                      ORDER BY created_at, id",
                )
                .bind(to_column("round", round)?)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, SubmissionRow>(
                    r"SELECT id, created_at, seed, round, lap, key, guess, disqualified
                      FROM submissions
                      ORDER BY created_at, id",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows)
    }
}

impl SubmissionLog for PgSubmissionLog {
    async fn append(&self, submission: NewSubmission) -> Result<Submission, SubmissionError> {
        self.insert(&submission).await?.try_into()
    }

    async fn round_submissions(&self, round: usize) -> Result<Vec<Submission>, SubmissionError> {
        self.select(Some(round))
            .await?
            .into_iter()
            .map(Submission::try_from)
            .collect()
    }

    async fn all(&self) -> Result<Vec<Submission>, SubmissionError> {
        self.select(None)
            .await?
            .into_iter()
            .map(Submission::try_from)
            .collect()
    }

    async fn clear(&self) -> Result<(), SubmissionError> {
        let result = sqlx::query("DELETE FROM submissions")
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;
        tracing::info!(rows = result.rows_affected(), "Cleared submissions");
        Ok(())
    }
}

fn to_column(field: &'static str, value: usize) -> Result<i32, DbError> {
    i32::try_from(value).map_err(|err| DbError::OutOfRange {
        field,
        value: format!("{value} ({err})"),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn row(guess: &str, round: i32) -> SubmissionRow {
        SubmissionRow {
            id: 7,
            created_at: Utc::now(),
            seed: 1234,
            round,
            lap: 3,
            key: "k".to_owned(),
            guess: guess.to_owned(),
            disqualified: false,
        }
    }

    #[test]
    fn row_converts_to_submission() {
        let submission = Submission::try_from(row("helicopter", 2)).unwrap();
        assert_eq!(submission.sequence, 7);
        assert_eq!(submission.round, 2);
        assert_eq!(submission.lap, 3);
        assert_eq!(submission.guess, Guess::Helicopter);
    }

    #[test]
    fn corrupt_rows_are_reported() {
        assert!(matches!(
            Submission::try_from(row("kazoo", 0)),
            Err(SubmissionError::Corrupt { id: 7, .. })
        ));
        assert!(matches!(
            Submission::try_from(row("fire", -1)),
            Err(SubmissionError::Corrupt { .. })
        ));
    }

    #[test]
    fn oversized_indices_are_rejected() {
        assert!(to_column("round", usize::MAX).is_err());
        assert_eq!(to_column("lap", 19).unwrap(), 19);
    }
}
