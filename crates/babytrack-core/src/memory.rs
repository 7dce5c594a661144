use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::CoreError;
use crate::model::{
    BabyProfile, ChecklistRecord, Id, TrackerEntry, TrackerType, UserRecord, WriteMode,
};
use crate::store::TrackerStore;

/// In-process store with the same key layout and write guards as
/// [`crate::DynamoStore`]. Used by tests and `STORAGE=memory` local runs.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, UserRecord>>,
    /// (userId, babyId) -> profile
    babies: RwLock<BTreeMap<(String, Id), BabyProfile>>,
    /// (babyId, entryId) -> entry
    entries: RwLock<BTreeMap<(Id, Id), TrackerEntry>>,
    /// (userId, itemId) -> record
    checklist: RwLock<BTreeMap<(String, Id), ChecklistRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn guarded_insert<K: Ord, V>(
    map: &mut BTreeMap<K, V>,
    key: K,
    value: V,
    mode: WriteMode,
    what: impl FnOnce() -> String,
) -> Result<(), CoreError> {
    match (mode, map.contains_key(&key)) {
        (WriteMode::Create, true) => Err(CoreError::Conflict(what())),
        (WriteMode::Replace, false) => Err(CoreError::NotFound(what())),
        _ => {
            map.insert(key, value);
            Ok(())
        }
    }
}

#[async_trait]
impl TrackerStore for MemoryStore {
    async fn upsert_user(&self, user: &UserRecord) -> Result<(), CoreError> {
        let mut users = self.users.write().await;
        users
            .entry(user.user_id.clone())
            .and_modify(|existing| {
                existing.last_seen_at = user.last_seen_at;
                if user.email.is_some() {
                    existing.email = user.email.clone();
                }
            })
            .or_insert_with(|| user.clone());
        Ok(())
    }

    async fn list_profiles(&self, user_id: &str) -> Result<Vec<BabyProfile>, CoreError> {
        let babies = self.babies.read().await;
        Ok(babies
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_profile(
        &self,
        user_id: &str,
        baby_id: &Id,
    ) -> Result<Option<BabyProfile>, CoreError> {
        let babies = self.babies.read().await;
        Ok(babies.get(&(user_id.to_string(), baby_id.clone())).cloned())
    }

    async fn put_profile(&self, profile: &BabyProfile, mode: WriteMode) -> Result<(), CoreError> {
        let mut babies = self.babies.write().await;
        guarded_insert(
            &mut babies,
            (profile.user_id.clone(), profile.baby_id.clone()),
            profile.clone(),
            mode,
            || format!("profile {}", profile.baby_id),
        )
    }

    async fn delete_profile(&self, user_id: &str, baby_id: &Id) -> Result<(), CoreError> {
        let mut babies = self.babies.write().await;
        babies
            .remove(&(user_id.to_string(), baby_id.clone()))
            .map(|_| ())
            .ok_or_else(|| CoreError::NotFound(format!("profile {baby_id}")))
    }

    async fn list_entries(
        &self,
        baby_id: &Id,
        tracker: Option<TrackerType>,
    ) -> Result<Vec<TrackerEntry>, CoreError> {
        let entries = self.entries.read().await;
        let prefix = tracker.map(TrackerType::entry_prefix);
        Ok(entries
            .iter()
            .filter(|((b, e), _)| {
                b == baby_id
                    && prefix
                        .as_deref()
                        .is_none_or(|p| e.as_str().starts_with(p))
            })
            .map(|(_, entry)| entry.clone())
            .collect())
    }

    async fn get_entry(
        &self,
        baby_id: &Id,
        entry_id: &Id,
    ) -> Result<Option<TrackerEntry>, CoreError> {
        let entries = self.entries.read().await;
        Ok(entries.get(&(baby_id.clone(), entry_id.clone())).cloned())
    }

    async fn put_entry(&self, entry: &TrackerEntry, mode: WriteMode) -> Result<(), CoreError> {
        let mut entries = self.entries.write().await;
        guarded_insert(
            &mut entries,
            (entry.baby_id.clone(), entry.entry_id.clone()),
            entry.clone(),
            mode,
            || format!("entry {}", entry.entry_id),
        )
    }

    async fn delete_entry(&self, baby_id: &Id, entry_id: &Id) -> Result<(), CoreError> {
        let mut entries = self.entries.write().await;
        entries
            .remove(&(baby_id.clone(), entry_id.clone()))
            .map(|_| ())
            .ok_or_else(|| CoreError::NotFound(format!("entry {entry_id}")))
    }

    async fn list_checklist(&self, user_id: &str) -> Result<Vec<ChecklistRecord>, CoreError> {
        let checklist = self.checklist.read().await;
        Ok(checklist
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_checklist_record(
        &self,
        user_id: &str,
        item_id: &Id,
    ) -> Result<Option<ChecklistRecord>, CoreError> {
        let checklist = self.checklist.read().await;
        Ok(checklist
            .get(&(user_id.to_string(), item_id.clone()))
            .cloned())
    }

    async fn put_checklist_record(&self, record: &ChecklistRecord) -> Result<(), CoreError> {
        let mut checklist = self.checklist.write().await;
        checklist.insert(
            (record.user_id.clone(), record.item_id.clone()),
            record.clone(),
        );
        Ok(())
    }

    async fn delete_checklist_record(
        &self,
        user_id: &str,
        item_id: &Id,
    ) -> Result<(), CoreError> {
        let mut checklist = self.checklist.write().await;
        checklist
            .remove(&(user_id.to_string(), item_id.clone()))
            .map(|_| ())
            .ok_or_else(|| CoreError::NotFound(format!("checklist item {item_id}")))
    }
}
