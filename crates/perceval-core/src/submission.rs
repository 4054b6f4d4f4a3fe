//! Append-only submission log.
//!
//! The log is owned outside the round state machine. Requests append to it
//! without touching the competition position, and scoring only ever reads
//! it. [`SubmissionLog`] abstracts the storage; [`MemorySubmissionLog`] is
//! the process-local implementation used when no database is configured
//! and in tests.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use perceval_types::{NewSubmission, Submission};
use tokio::sync::RwLock;

/// Errors from a submission log backend.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    /// The backend failed to store or load submissions.
    #[error("submission backend failure: {message}")]
    Backend {
        /// Description of the backend failure.
        message: String,
    },

    /// A stored row could not be converted back into a submission.
    #[error("corrupt submission row {id}: {reason}")]
    Corrupt {
        /// Row identifier.
        id: i64,
        /// Why the row is unreadable.
        reason: String,
    },
}

/// Storage for submissions.
///
/// Implementations must assign every appended submission a timestamp and a
/// strictly increasing sequence number, so that
/// [`Submission::order_key`] totally orders the log.
pub trait SubmissionLog: Send + Sync + 'static {
    /// Append a submission and return it as stored.
    fn append(
        &self,
        submission: NewSubmission,
    ) -> impl Future<Output = Result<Submission, SubmissionError>> + Send;

    /// All submissions made during `round`, oldest first.
    fn round_submissions(
        &self,
        round: usize,
    ) -> impl Future<Output = Result<Vec<Submission>, SubmissionError>> + Send;

    /// Every submission, oldest first.
    fn all(&self) -> impl Future<Output = Result<Vec<Submission>, SubmissionError>> + Send;

    /// Remove every submission.
    fn clear(&self) -> impl Future<Output = Result<(), SubmissionError>> + Send;
}

/// In-memory [`SubmissionLog`].
#[derive(Debug, Default)]
pub struct MemorySubmissionLog {
    entries: RwLock<Vec<Submission>>,
    sequence: AtomicU64,
}

impl MemorySubmissionLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SubmissionLog for MemorySubmissionLog {
    async fn append(&self, submission: NewSubmission) -> Result<Submission, SubmissionError> {
        let mut entries = self.entries.write().await;
        // Sequence and timestamp are taken under the write lock so that
        // insertion order and timestamp order always agree.
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let stored = Submission {
            sequence,
            timestamp: Utc::now(),
            key: submission.key,
            round: submission.round,
            lap: submission.lap,
            guess: submission.guess,
            disqualified: submission.disqualified,
        };
        entries.push(stored.clone());
        Ok(stored)
    }

    async fn round_submissions(&self, round: usize) -> Result<Vec<Submission>, SubmissionError> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|submission| submission.round == round)
            .cloned()
            .collect())
    }

    async fn all(&self) -> Result<Vec<Submission>, SubmissionError> {
        Ok(self.entries.read().await.clone())
    }

    async fn clear(&self) -> Result<(), SubmissionError> {
        self.entries.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use perceval_types::{GroupKey, Guess};

    use super::*;

    fn new(key: &str, round: usize, lap: usize, guess: Guess) -> NewSubmission {
        NewSubmission {
            key: GroupKey::from(key),
            round,
            lap,
            guess,
            disqualified: false,
        }
    }

    #[tokio::test]
    async fn append_assigns_increasing_order_keys() {
        let log = MemorySubmissionLog::new();
        let a = log.append(new("k", 0, 0, Guess::Fire)).await.unwrap();
        let b = log.append(new("k", 0, 0, Guess::Birds)).await.unwrap();
        assert!(a.order_key() < b.order_key());
        assert_eq!(log.all().await.unwrap(), vec![a, b]);
    }

    #[tokio::test]
    async fn round_filter_and_clear() {
        let log = MemorySubmissionLog::new();
        log.append(new("k", 0, 0, Guess::Fire)).await.unwrap();
        log.append(new("k", 1, 3, Guess::Handsaw)).await.unwrap();
        log.append(new("j", 1, 4, Guess::Chainsaw)).await.unwrap();

        let round_one = log.round_submissions(1).await.unwrap();
        assert_eq!(round_one.len(), 2);
        assert!(round_one.iter().all(|s| s.round == 1));

        log.clear().await.unwrap();
        assert!(log.all().await.unwrap().is_empty());
    }
}
