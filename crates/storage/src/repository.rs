use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{QuestionId, QuizId, RawRecord};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Number of stored records per quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSummary {
    pub quiz_id: QuizId,
    pub question_count: u32,
}

/// Read side of the question document store.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Fetch every stored record for a quiz.
    ///
    /// An unknown quiz yields an empty list, not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be reached or a record cannot be decoded.
    async fn fetch_questions(&self, quiz_id: &QuizId) -> Result<Vec<RawRecord>, StorageError>;

    /// Fetch a single record by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be reached or the record cannot be decoded.
    async fn fetch_question(
        &self,
        quiz_id: &QuizId,
        question_id: &QuestionId,
    ) -> Result<Option<RawRecord>, StorageError>;
}

/// Write side of the question document store.
#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// Insert or replace a record, keyed by its id within the quiz.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn upsert_record(
        &self,
        quiz_id: &QuizId,
        record: &RawRecord,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Remove a record. Returns `false` when nothing was stored under the id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be reached.
    async fn delete_record(
        &self,
        quiz_id: &QuizId,
        question_id: &QuestionId,
    ) -> Result<bool, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be reached.
    async fn list_quizzes(&self) -> Result<Vec<QuizSummary>, StorageError>;
}

/// Callback receiving the full record list of a quiz after every change.
pub type SnapshotListener = Arc<dyn Fn(&[RawRecord]) + Send + Sync>;

/// Live view of a quiz's records.
pub trait SnapshotFeed: Send + Sync {
    /// Register a listener. The current snapshot is delivered immediately.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the feed cannot be reached.
    fn subscribe(
        &self,
        quiz_id: &QuizId,
        listener: SnapshotListener,
    ) -> Result<Subscription, StorageError>;
}

/// Handle for a snapshot listener; delivery stops when it is dropped.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

type ListenerMap = HashMap<u64, (QuizId, SnapshotListener)>;

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    records: Arc<Mutex<HashMap<QuizId, Vec<RawRecord>>>>,
    listeners: Arc<Mutex<ListenerMap>>,
    next_listener: Arc<AtomicU64>,
    offline: Arc<AtomicBool>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every read fail with a connection error until switched back.
    pub fn simulate_outage(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), StorageError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("store is offline".into()));
        }
        Ok(())
    }

    fn snapshot(&self, quiz_id: &QuizId) -> Result<Vec<RawRecord>, StorageError> {
        let guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(quiz_id).cloned().unwrap_or_default())
    }

    fn notify(&self, quiz_id: &QuizId) -> Result<(), StorageError> {
        let snapshot = self.snapshot(quiz_id)?;
        let targets: Vec<SnapshotListener> = {
            let guard = self
                .listeners
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            guard
                .values()
                .filter(|(id, _)| id == quiz_id)
                .map(|(_, listener)| Arc::clone(listener))
                .collect()
        };
        // listeners run without any lock held so they may read the store
        for listener in targets {
            listener(&snapshot);
        }
        Ok(())
    }
}

#[async_trait]
impl QuestionSource for InMemoryRepository {
    async fn fetch_questions(&self, quiz_id: &QuizId) -> Result<Vec<RawRecord>, StorageError> {
        self.ensure_online()?;
        self.snapshot(quiz_id)
    }

    async fn fetch_question(
        &self,
        quiz_id: &QuizId,
        question_id: &QuestionId,
    ) -> Result<Option<RawRecord>, StorageError> {
        self.ensure_online()?;
        let guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .get(quiz_id)
            .and_then(|records| records.iter().find(|r| r.id() == question_id.as_str()))
            .cloned())
    }
}

#[async_trait]
impl QuestionStore for InMemoryRepository {
    async fn upsert_record(
        &self,
        quiz_id: &QuizId,
        record: &RawRecord,
        _updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        {
            let mut guard = self
                .records
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            let records = guard.entry(quiz_id.clone()).or_default();
            match records.iter_mut().find(|r| r.id() == record.id()) {
                Some(existing) => *existing = record.clone(),
                None => records.push(record.clone()),
            }
        }
        self.notify(quiz_id)
    }

    async fn delete_record(
        &self,
        quiz_id: &QuizId,
        question_id: &QuestionId,
    ) -> Result<bool, StorageError> {
        let removed = {
            let mut guard = self
                .records
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            let Some(records) = guard.get_mut(quiz_id) else {
                return Ok(false);
            };
            let before = records.len();
            records.retain(|r| r.id() != question_id.as_str());
            let removed = records.len() != before;
            if records.is_empty() {
                guard.remove(quiz_id);
            }
            removed
        };
        if removed {
            self.notify(quiz_id)?;
        }
        Ok(removed)
    }

    async fn list_quizzes(&self) -> Result<Vec<QuizSummary>, StorageError> {
        let guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut summaries: Vec<QuizSummary> = guard
            .iter()
            .map(|(quiz_id, records)| QuizSummary {
                quiz_id: quiz_id.clone(),
                question_count: u32::try_from(records.len()).unwrap_or(u32::MAX),
            })
            .collect();
        summaries.sort_by(|a, b| a.quiz_id.as_str().cmp(b.quiz_id.as_str()));
        Ok(summaries)
    }
}

impl SnapshotFeed for InMemoryRepository {
    fn subscribe(
        &self,
        quiz_id: &QuizId,
        listener: SnapshotListener,
    ) -> Result<Subscription, StorageError> {
        self.ensure_online()?;
        let id = self.next_listener.fetch_add(1, Ordering::SeqCst);
        {
            let mut guard = self
                .listeners
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            guard.insert(id, (quiz_id.clone(), Arc::clone(&listener)));
        }
        let snapshot = match self.snapshot(quiz_id) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                if let Ok(mut guard) = self.listeners.lock() {
                    guard.remove(&id);
                }
                return Err(err);
            }
        };
        listener(&snapshot);

        let listeners = Arc::downgrade(&self.listeners);
        Ok(Subscription::new(move || {
            let Some(listeners) = listeners.upgrade() else {
                return;
            };
            if let Ok(mut guard) = listeners.lock() {
                guard.remove(&id);
            }
        }))
    }
}

/// Aggregates question repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionSource>,
    pub question_store: Arc<dyn QuestionStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_in_memory(InMemoryRepository::new())
    }

    /// Wrap an existing in-memory repository, keeping a handle for test setup.
    #[must_use]
    pub fn from_in_memory(repo: InMemoryRepository) -> Self {
        let questions: Arc<dyn QuestionSource> = Arc::new(repo.clone());
        let question_store: Arc<dyn QuestionStore> = Arc::new(repo);
        Self {
            questions,
            question_store,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::time::fixed_now;
    use serde_json::json;

    fn quiz() -> QuizId {
        QuizId::new("lesson-1").unwrap()
    }

    fn build_record(id: &str, text: &str) -> RawRecord {
        RawRecord::from_document(json!({
            "id": id,
            "questionText": text,
            "options": ["a", "b"],
            "correctAnswer": "a"
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn upsert_replaces_by_id_and_keeps_order() {
        let repo = InMemoryRepository::new();
        repo.upsert_record(&quiz(), &build_record("q1", "first"), fixed_now())
            .await
            .unwrap();
        repo.upsert_record(&quiz(), &build_record("q2", "second"), fixed_now())
            .await
            .unwrap();
        repo.upsert_record(&quiz(), &build_record("q1", "edited"), fixed_now())
            .await
            .unwrap();

        let records = repo.fetch_questions(&quiz()).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id(), "q1");
        assert_eq!(records[0].get_str("questionText"), Some("edited"));

        let single = repo
            .fetch_question(&quiz(), &QuestionId::new("q2").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(single.get_str("questionText"), Some("second"));
    }

    #[tokio::test]
    async fn unknown_quiz_is_empty_not_error() {
        let repo = InMemoryRepository::new();
        assert!(repo.fetch_questions(&quiz()).await.unwrap().is_empty());
        assert!(repo.list_quizzes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn outage_fails_reads() {
        let repo = InMemoryRepository::new();
        repo.simulate_outage(true);
        assert!(matches!(
            repo.fetch_questions(&quiz()).await,
            Err(StorageError::Connection(_))
        ));
        repo.simulate_outage(false);
        assert!(repo.fetch_questions(&quiz()).await.is_ok());
    }

    #[tokio::test]
    async fn delete_reports_whether_anything_was_removed() {
        let repo = InMemoryRepository::new();
        let q1 = QuestionId::new("q1").unwrap();
        repo.upsert_record(&quiz(), &build_record("q1", "t"), fixed_now())
            .await
            .unwrap();
        assert!(repo.delete_record(&quiz(), &q1).await.unwrap());
        assert!(!repo.delete_record(&quiz(), &q1).await.unwrap());
        assert!(repo.list_quizzes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn subscription_receives_snapshots_until_dropped() {
        let repo = InMemoryRepository::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = repo
            .subscribe(
                &quiz(),
                Arc::new(move |records: &[RawRecord]| {
                    sink.lock().unwrap().push(records.len());
                }),
            )
            .unwrap();

        repo.upsert_record(&quiz(), &build_record("q1", "t"), fixed_now())
            .await
            .unwrap();
        repo.upsert_record(&quiz(), &build_record("q2", "t"), fixed_now())
            .await
            .unwrap();
        drop(sub);
        repo.upsert_record(&quiz(), &build_record("q3", "t"), fixed_now())
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn listeners_only_see_their_quiz() {
        let repo = InMemoryRepository::new();
        let calls = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&calls);
        let sub = repo
            .subscribe(
                &quiz(),
                Arc::new(move |_: &[RawRecord]| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        let other = QuizId::new("lesson-2").unwrap();
        repo.upsert_record(&other, &build_record("q1", "t"), fixed_now())
            .await
            .unwrap();
        sub.unsubscribe();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_subscribe_leaves_no_listener_behind() {
        let repo = InMemoryRepository::new();
        let calls = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&calls);
        repo.simulate_outage(true);
        let err = repo
            .subscribe(
                &quiz(),
                Arc::new(move |_: &[RawRecord]| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap_err();
        assert!(matches!(err, StorageError::Connection(_)));

        repo.simulate_outage(false);
        repo.upsert_record(&quiz(), &build_record("q1", "t"), fixed_now())
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(repo.listeners.lock().unwrap().is_empty());
    }
}
