use super::{MilestoneWatermark, ProgressRecord};
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Persistence collaborator for progress records.
///
/// The capability set is deliberately narrow (`find`, `find_many`, `upsert`
/// plus the milestone watermark) so the tracker depends on an interface, not
/// a concrete backend; an in-memory fake substitutes for tests.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn find(
        &self,
        user_id: &str,
        drama_id: &str,
        keyword_id: &str,
    ) -> Result<Option<ProgressRecord>>;

    async fn find_many(&self, user_id: &str, drama_id: &str) -> Result<Vec<ProgressRecord>>;

    async fn upsert(&self, record: ProgressRecord) -> Result<ProgressRecord>;

    async fn watermark(&self, user_id: &str, drama_id: &str)
        -> Result<Option<MilestoneWatermark>>;

    async fn save_watermark(&self, watermark: MilestoneWatermark) -> Result<()>;
}

type RecordKey = (String, String, String);
type WatermarkKey = (String, String);

/// In-memory progress store, used by tests and offline sessions
#[derive(Default)]
pub struct InMemoryProgressStore {
    records: RwLock<HashMap<RecordKey, ProgressRecord>>,
    watermarks: RwLock<HashMap<WatermarkKey, MilestoneWatermark>>,
}

impl InMemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressStore for InMemoryProgressStore {
    async fn find(
        &self,
        user_id: &str,
        drama_id: &str,
        keyword_id: &str,
    ) -> Result<Option<ProgressRecord>> {
        let key = (
            user_id.to_string(),
            drama_id.to_string(),
            keyword_id.to_string(),
        );
        Ok(self.records.read().await.get(&key).cloned())
    }

    async fn find_many(&self, user_id: &str, drama_id: &str) -> Result<Vec<ProgressRecord>> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.user_id == user_id && r.drama_id == drama_id)
            .cloned()
            .collect())
    }

    async fn upsert(&self, record: ProgressRecord) -> Result<ProgressRecord> {
        let key = (
            record.user_id.clone(),
            record.drama_id.clone(),
            record.keyword_id.clone(),
        );
        self.records.write().await.insert(key, record.clone());
        Ok(record)
    }

    async fn watermark(
        &self,
        user_id: &str,
        drama_id: &str,
    ) -> Result<Option<MilestoneWatermark>> {
        let key = (user_id.to_string(), drama_id.to_string());
        Ok(self.watermarks.read().await.get(&key).cloned())
    }

    async fn save_watermark(&self, watermark: MilestoneWatermark) -> Result<()> {
        let key = (watermark.user_id.clone(), watermark.drama_id.clone());
        self.watermarks.write().await.insert(key, watermark);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::KeywordStatus;
    use super::*;

    fn record(keyword_id: &str) -> ProgressRecord {
        ProgressRecord {
            user_id: "user-1".to_string(),
            drama_id: "drama-1".to_string(),
            keyword_id: keyword_id.to_string(),
            status: KeywordStatus::Unlocked,
            attempts: 1,
            correct_attempts: 0,
            completed_at: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_then_find() {
        let store = InMemoryProgressStore::new();
        store.upsert(record("k1")).await.unwrap();

        let found = store.find("user-1", "drama-1", "k1").await.unwrap();
        assert!(found.is_some());

        let missing = store.find("user-1", "drama-1", "k2").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_find_many_scoped_to_user_and_drama() {
        let store = InMemoryProgressStore::new();
        store.upsert(record("k1")).await.unwrap();
        store.upsert(record("k2")).await.unwrap();

        let mut other = record("k3");
        other.drama_id = "drama-2".to_string();
        store.upsert(other).await.unwrap();

        let records = store.find_many("user-1", "drama-1").await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_upsert_replaces() {
        let store = InMemoryProgressStore::new();
        store.upsert(record("k1")).await.unwrap();

        let mut updated = record("k1");
        updated.attempts = 5;
        updated.status = KeywordStatus::Completed;
        store.upsert(updated).await.unwrap();

        let found = store.find("user-1", "drama-1", "k1").await.unwrap().unwrap();
        assert_eq!(found.attempts, 5);
        assert_eq!(found.status, KeywordStatus::Completed);
    }

    #[tokio::test]
    async fn test_watermark_round_trip() {
        let store = InMemoryProgressStore::new();

        assert!(store.watermark("user-1", "drama-1").await.unwrap().is_none());

        store
            .save_watermark(MilestoneWatermark {
                user_id: "user-1".to_string(),
                drama_id: "drama-1".to_string(),
                highest_threshold_reached: 50,
            })
            .await
            .unwrap();

        let watermark = store.watermark("user-1", "drama-1").await.unwrap().unwrap();
        assert_eq!(watermark.highest_threshold_reached, 50);
    }
}
