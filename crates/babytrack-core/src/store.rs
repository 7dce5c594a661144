//! Storage abstraction for the tracker tables.
//!
//! Handlers work against [`TrackerStore`] so the same routes run on
//! DynamoDB in production and on [`crate::MemoryStore`] in tests and local
//! development.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::model::{
    BabyProfile, ChecklistRecord, Id, TrackerEntry, TrackerType, UserRecord, WriteMode,
};

#[async_trait]
pub trait TrackerStore: Send + Sync {
    /// Insert or refresh a user record, keeping the original `createdAt`.
    async fn upsert_user(&self, user: &UserRecord) -> Result<(), CoreError>;

    /// All profiles owned by `user_id`, in storage order.
    async fn list_profiles(&self, user_id: &str) -> Result<Vec<BabyProfile>, CoreError>;

    async fn get_profile(
        &self,
        user_id: &str,
        baby_id: &Id,
    ) -> Result<Option<BabyProfile>, CoreError>;

    async fn put_profile(&self, profile: &BabyProfile, mode: WriteMode) -> Result<(), CoreError>;

    /// Delete a profile record. Returns `NotFound` if it does not exist.
    async fn delete_profile(&self, user_id: &str, baby_id: &Id) -> Result<(), CoreError>;

    /// Entries of a profile ordered by entry id, optionally restricted to one
    /// tracker.
    async fn list_entries(
        &self,
        baby_id: &Id,
        tracker: Option<TrackerType>,
    ) -> Result<Vec<TrackerEntry>, CoreError>;

    async fn get_entry(
        &self,
        baby_id: &Id,
        entry_id: &Id,
    ) -> Result<Option<TrackerEntry>, CoreError>;

    async fn put_entry(&self, entry: &TrackerEntry, mode: WriteMode) -> Result<(), CoreError>;

    /// Delete an entry. Returns `NotFound` if it does not exist.
    async fn delete_entry(&self, baby_id: &Id, entry_id: &Id) -> Result<(), CoreError>;

    /// All checklist records (statuses and custom items) of a user.
    async fn list_checklist(&self, user_id: &str) -> Result<Vec<ChecklistRecord>, CoreError>;

    async fn get_checklist_record(
        &self,
        user_id: &str,
        item_id: &Id,
    ) -> Result<Option<ChecklistRecord>, CoreError>;

    /// Insert or overwrite a checklist record.
    async fn put_checklist_record(&self, record: &ChecklistRecord) -> Result<(), CoreError>;

    /// Delete a checklist record. Returns `NotFound` if it does not exist.
    async fn delete_checklist_record(&self, user_id: &str, item_id: &Id)
    -> Result<(), CoreError>;
}
