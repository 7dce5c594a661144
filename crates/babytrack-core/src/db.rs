use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::operation::delete_item::DeleteItemError;
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::types::AttributeValue;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::CoreError;
use crate::model::{
    BabyProfile, ChecklistRecord, Id, TrackerEntry, TrackerType, UserRecord, WriteMode,
};
use crate::store::TrackerStore;

type Item = HashMap<String, AttributeValue>;

/// Names of the four DynamoDB tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    /// Users(userId)
    pub users: String,
    /// Babies(userId, babyId)
    pub babies: String,
    /// TrackerEntries(babyId, entryId)
    pub entries: String,
    /// ChecklistStatus(userId, itemId)
    pub checklist: String,
}

/// DynamoDB client wrapper for tracker storage.
#[derive(Clone)]
pub struct DynamoStore {
    client: Client,
    tables: TableNames,
}

impl DynamoStore {
    /// Create a new `DynamoStore` by loading AWS configuration from the
    /// environment and constructing a DynamoDB client.
    pub async fn new(tables: TableNames) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self::from_client(Client::new(&config), tables)
    }

    /// Wrap an already configured client, e.g. one pointed at DynamoDB Local.
    pub fn from_client(client: Client, tables: TableNames) -> Self {
        Self { client, tables }
    }

    pub fn tables(&self) -> &TableNames {
        &self.tables
    }

    /// Put `item`, guarded by a condition on the key attribute `key_attr`
    /// according to `mode`.
    async fn put_guarded(
        &self,
        table: &str,
        item: Item,
        key_attr: &str,
        mode: WriteMode,
        what: String,
    ) -> Result<(), CoreError> {
        let condition = match mode {
            WriteMode::Create => format!("attribute_not_exists({key_attr})"),
            WriteMode::Replace => format!("attribute_exists({key_attr})"),
        };

        let result = self
            .client
            .put_item()
            .table_name(table)
            .set_item(Some(item))
            .condition_expression(condition)
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) => match err.into_service_error() {
                PutItemError::ConditionalCheckFailedException(_) => Err(match mode {
                    WriteMode::Create => CoreError::Conflict(what),
                    WriteMode::Replace => CoreError::NotFound(what),
                }),
                other => Err(aws_sdk_dynamodb::Error::from(other).into()),
            },
        }
    }

    /// Delete the item at `key`, failing with `NotFound` if it is absent.
    async fn delete_existing(
        &self,
        table: &str,
        key: Item,
        key_attr: &str,
        what: String,
    ) -> Result<(), CoreError> {
        let result = self
            .client
            .delete_item()
            .table_name(table)
            .set_key(Some(key))
            .condition_expression(format!("attribute_exists({key_attr})"))
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) => match err.into_service_error() {
                DeleteItemError::ConditionalCheckFailedException(_) => {
                    Err(CoreError::NotFound(what))
                }
                other => Err(aws_sdk_dynamodb::Error::from(other).into()),
            },
        }
    }

    async fn get<T: DeserializeOwned>(&self, table: &str, key: Item) -> Result<Option<T>, CoreError> {
        let output = self
            .client
            .get_item()
            .table_name(table)
            .set_key(Some(key))
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;

        match output.item {
            Some(item) => Ok(Some(serde_dynamo::from_item(item)?)),
            None => Ok(None),
        }
    }

    /// Run a key-condition query, following pagination to the end.
    async fn query_all<T: DeserializeOwned>(
        &self,
        table: &str,
        key_condition: &str,
        values: Item,
    ) -> Result<Vec<T>, CoreError> {
        let mut records = Vec::new();
        let mut start_key: Option<Item> = None;
        let mut pages = 0u32;

        loop {
            let output = self
                .client
                .query()
                .table_name(table)
                .key_condition_expression(key_condition)
                .set_expression_attribute_values(Some(values.clone()))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(aws_sdk_dynamodb::Error::from)?;
            pages += 1;

            for item in output.items.unwrap_or_default() {
                records.push(serde_dynamo::from_item(item)?);
            }

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        debug!(table, pages, count = records.len(), "query complete");
        Ok(records)
    }
}

fn s(value: &str) -> AttributeValue {
    AttributeValue::S(value.to_string())
}

fn key(pairs: [(&str, &str); 2]) -> Item {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), s(value)))
        .collect()
}

#[async_trait]
impl TrackerStore for DynamoStore {
    async fn upsert_user(&self, user: &UserRecord) -> Result<(), CoreError> {
        let mut update = "SET lastSeenAt = :seen, createdAt = if_not_exists(createdAt, :created)"
            .to_string();
        let mut request = self
            .client
            .update_item()
            .table_name(&self.tables.users)
            .key("userId", s(&user.user_id))
            .expression_attribute_values(":seen", s(&user.last_seen_at.to_rfc3339()))
            .expression_attribute_values(":created", s(&user.created_at.to_rfc3339()));

        if let Some(email) = &user.email {
            update.push_str(", email = :email");
            request = request.expression_attribute_values(":email", s(email));
        }

        request
            .update_expression(update)
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;
        Ok(())
    }

    async fn list_profiles(&self, user_id: &str) -> Result<Vec<BabyProfile>, CoreError> {
        self.query_all(
            &self.tables.babies,
            "userId = :u",
            HashMap::from([(":u".to_string(), s(user_id))]),
        )
        .await
    }

    async fn get_profile(
        &self,
        user_id: &str,
        baby_id: &Id,
    ) -> Result<Option<BabyProfile>, CoreError> {
        self.get(
            &self.tables.babies,
            key([("userId", user_id), ("babyId", baby_id.as_str())]),
        )
        .await
    }

    async fn put_profile(&self, profile: &BabyProfile, mode: WriteMode) -> Result<(), CoreError> {
        let item: Item = serde_dynamo::to_item(profile)?;
        self.put_guarded(
            &self.tables.babies,
            item,
            "babyId",
            mode,
            format!("profile {}", profile.baby_id),
        )
        .await
    }

    async fn delete_profile(&self, user_id: &str, baby_id: &Id) -> Result<(), CoreError> {
        self.delete_existing(
            &self.tables.babies,
            key([("userId", user_id), ("babyId", baby_id.as_str())]),
            "babyId",
            format!("profile {baby_id}"),
        )
        .await
    }

    async fn list_entries(
        &self,
        baby_id: &Id,
        tracker: Option<TrackerType>,
    ) -> Result<Vec<TrackerEntry>, CoreError> {
        let mut values = HashMap::from([(":b".to_string(), s(baby_id.as_str()))]);
        let condition = match tracker {
            Some(t) => {
                values.insert(":p".to_string(), s(&t.entry_prefix()));
                "babyId = :b AND begins_with(entryId, :p)"
            }
            None => "babyId = :b",
        };
        self.query_all(&self.tables.entries, condition, values).await
    }

    async fn get_entry(
        &self,
        baby_id: &Id,
        entry_id: &Id,
    ) -> Result<Option<TrackerEntry>, CoreError> {
        self.get(
            &self.tables.entries,
            key([("babyId", baby_id.as_str()), ("entryId", entry_id.as_str())]),
        )
        .await
    }

    async fn put_entry(&self, entry: &TrackerEntry, mode: WriteMode) -> Result<(), CoreError> {
        let item: Item = serde_dynamo::to_item(entry)?;
        self.put_guarded(
            &self.tables.entries,
            item,
            "entryId",
            mode,
            format!("entry {}", entry.entry_id),
        )
        .await
    }

    async fn delete_entry(&self, baby_id: &Id, entry_id: &Id) -> Result<(), CoreError> {
        self.delete_existing(
            &self.tables.entries,
            key([("babyId", baby_id.as_str()), ("entryId", entry_id.as_str())]),
            "entryId",
            format!("entry {entry_id}"),
        )
        .await
    }

    async fn list_checklist(&self, user_id: &str) -> Result<Vec<ChecklistRecord>, CoreError> {
        self.query_all(
            &self.tables.checklist,
            "userId = :u",
            HashMap::from([(":u".to_string(), s(user_id))]),
        )
        .await
    }

    async fn get_checklist_record(
        &self,
        user_id: &str,
        item_id: &Id,
    ) -> Result<Option<ChecklistRecord>, CoreError> {
        self.get(
            &self.tables.checklist,
            key([("userId", user_id), ("itemId", item_id.as_str())]),
        )
        .await
    }

    async fn put_checklist_record(&self, record: &ChecklistRecord) -> Result<(), CoreError> {
        let item: Item = serde_dynamo::to_item(record)?;
        self.client
            .put_item()
            .table_name(&self.tables.checklist)
            .set_item(Some(item))
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;
        Ok(())
    }

    async fn delete_checklist_record(
        &self,
        user_id: &str,
        item_id: &Id,
    ) -> Result<(), CoreError> {
        self.delete_existing(
            &self.tables.checklist,
            key([("userId", user_id), ("itemId", item_id.as_str())]),
            "itemId",
            format!("checklist item {item_id}"),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use serde_json::{Value, json};

    #[test]
    fn from_client_keeps_table_names() {
        let config = aws_sdk_dynamodb::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(aws_sdk_dynamodb::config::Region::new("eu-west-1"))
            .build();
        let tables = TableNames {
            users: "u".into(),
            babies: "b".into(),
            entries: "e".into(),
            checklist: "c".into(),
        };
        let store = DynamoStore::from_client(Client::from_conf(config), tables.clone());
        assert_eq!(store.tables(), &tables);
    }

    #[test]
    fn key_builds_string_attributes() {
        let k = key([("babyId", "baby_1"), ("entryId", "sleep_1")]);
        assert_eq!(k.get("babyId"), Some(&AttributeValue::S("baby_1".into())));
        assert_eq!(k.get("entryId"), Some(&AttributeValue::S("sleep_1".into())));
    }

    #[test]
    fn profile_item_uses_table_key_names() {
        let profile = BabyProfile {
            user_id: "user-1".into(),
            baby_id: Id::new("baby_1").unwrap(),
            name: "Ada".into(),
            birthday: NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            updated_at: None,
        };
        let item: Item = serde_dynamo::to_item(&profile).unwrap();
        assert_eq!(item.get("userId"), Some(&AttributeValue::S("user-1".into())));
        assert_eq!(item.get("babyId"), Some(&AttributeValue::S("baby_1".into())));
        assert_eq!(item.get("birthday"), Some(&AttributeValue::S("2024-02-29".into())));
        assert!(!item.contains_key("updatedAt"));

        let back: BabyProfile = serde_dynamo::from_item(item).unwrap();
        assert_eq!(back, profile);
    }

    #[test]
    fn entry_item_flattens_payload() {
        let Value::Object(fields) = json!({"startTime": "2024-05-01T08:00:00Z", "volume": 120, "notes": "ok"}) else {
            unreachable!()
        };
        let entry = TrackerEntry {
            entry_id: Id::new("bottle_1").unwrap(),
            baby_id: Id::new("baby_1").unwrap(),
            tracker_type: TrackerType::Bottle,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
            updated_at: None,
            fields,
        };
        let item: Item = serde_dynamo::to_item(&entry).unwrap();
        assert_eq!(item.get("volume"), Some(&AttributeValue::N("120".into())));
        assert_eq!(item.get("trackerType"), Some(&AttributeValue::S("bottle".into())));

        let back: TrackerEntry = serde_dynamo::from_item(item).unwrap();
        assert_eq!(back.entry_id, entry.entry_id);
        assert_eq!(back.number("volume"), Some(120.0));
        assert_eq!(back.text("notes"), Some("ok"));
    }
}
