// src/db.rs

use async_trait::async_trait;
use chrono::Utc;
use futures_util::TryStreamExt;
use log::{info, warn};
use mongodb::bson::{doc, to_bson, Bson, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};

use crate::models::{new_id, Answer, Day, Task};
use crate::store::{Store, StoreError, TaskFilter, TaskPatch};

const DUPLICATE_KEY: i32 = 11000;

pub struct MongoDB {
    pub db: Database,
}

impl MongoDB {
    pub async fn init(uri: &str, db_name: &str) -> Result<Self, StoreError> {
        let client_options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(client_options)?;
        let db = client.database(db_name);
        Ok(MongoDB { db })
    }

    /// Creates the indexes that back the uniqueness rules. Safe to call on
    /// every start; existing indexes are left alone.
    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let unique = IndexOptions::builder().unique(true).build();

        self.days()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "order": 1 })
                    .options(unique.clone())
                    .build(),
            )
            .await?;
        self.answers()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "task": 1, "userId": 1 })
                    .options(unique)
                    .build(),
            )
            .await?;
        self.tasks()
            .create_index(IndexModel::builder().keys(doc! { "day": 1, "order": 1 }).build())
            .await?;

        info!("MongoDB indexes ensured on {}", self.db.name());
        Ok(())
    }

    fn days(&self) -> Collection<Day> {
        self.db.collection::<Day>("days")
    }

    fn tasks(&self) -> Collection<Task> {
        self.db.collection::<Task>("tasks")
    }

    fn answers(&self) -> Collection<Answer> {
        self.db.collection::<Answer>("answers")
    }

    fn counters(&self) -> Collection<Document> {
        self.db.collection::<Document>("counters")
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}

fn task_filter_doc(filter: &TaskFilter) -> Document {
    let mut f = doc! {};
    if let Some(day) = &filter.day {
        f.insert("day", day);
    }
    if let Some(topic) = &filter.topic {
        // Escaped so the topic is matched literally.
        f.insert("topic", doc! { "$regex": regex::escape(topic), "$options": "i" });
    }
    f
}

fn day_scope(day: Option<&str>) -> Bson {
    match day {
        Some(d) => Bson::String(d.to_string()),
        None => Bson::Null,
    }
}

#[async_trait]
impl Store for MongoDB {
    async fn insert_day(&self, day: &Day) -> Result<(), StoreError> {
        match self.days().insert_one(day).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(StoreError::Duplicate {
                collection: "days",
                key: format!("order {}", day.order),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_day(&self, id: &str) -> Result<Option<Day>, StoreError> {
        Ok(self.days().find_one(doc! { "_id": id }).await?)
    }

    async fn list_days(&self) -> Result<Vec<Day>, StoreError> {
        let cursor = self.days().find(doc! {}).sort(doc! { "order": 1 }).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn count_days(&self) -> Result<u64, StoreError> {
        Ok(self.days().count_documents(doc! {}).await?)
    }

    async fn max_day_order(&self) -> Result<Option<i64>, StoreError> {
        let last = self
            .days()
            .find_one(doc! {})
            .sort(doc! { "order": -1 })
            .await?;
        Ok(last.map(|d| d.order))
    }

    async fn push_day_tasks(&self, day_id: &str, task_ids: &[String]) -> Result<bool, StoreError> {
        let res = self
            .days()
            .update_one(
                doc! { "_id": day_id },
                doc! { "$push": { "tasks": { "$each": task_ids.to_vec() } } },
            )
            .await?;
        Ok(res.matched_count == 1)
    }

    async fn pull_day_task(&self, day_id: &str, task_id: &str) -> Result<bool, StoreError> {
        let res = self
            .days()
            .update_one(doc! { "_id": day_id }, doc! { "$pull": { "tasks": task_id } })
            .await?;
        Ok(res.matched_count == 1)
    }

    async fn next_sequence(&self, scope: &str, floor: i64) -> Result<i64, StoreError> {
        // Single pipeline update: seq = max(seq, floor) + 1, created on first use.
        let update = vec![doc! {
            "$set": {
                "seq": { "$add": [ { "$max": [ { "$ifNull": ["$seq", 0_i64] }, floor ] }, 1_i64 ] }
            }
        }];
        let counter = self
            .counters()
            .find_one_and_update(doc! { "_id": scope }, update)
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| StoreError::Unavailable(format!("counter {scope} not returned")))?;
        match counter.get("seq") {
            Some(Bson::Int64(n)) => Ok(*n),
            Some(Bson::Int32(n)) => Ok(i64::from(*n)),
            other => Err(StoreError::Unavailable(format!(
                "counter {scope} holds unexpected value {other:?}"
            ))),
        }
    }

    async fn release_sequence(&self, scope: &str, value: i64) -> Result<bool, StoreError> {
        let res = self
            .counters()
            .update_one(
                doc! { "_id": scope, "seq": value },
                doc! { "$set": { "seq": value - 1 } },
            )
            .await?;
        Ok(res.modified_count == 1)
    }

    async fn insert_task(&self, task: &Task) -> Result<(), StoreError> {
        self.tasks().insert_one(task).await?;
        Ok(())
    }

    async fn find_task(&self, id: &str) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks().find_one(doc! { "_id": id }).await?)
    }

    async fn find_tasks_by_ids(&self, ids: &[String]) -> Result<Vec<Task>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self
            .tasks()
            .find(doc! { "_id": { "$in": ids.to_vec() } })
            .sort(doc! { "order": 1, "_id": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_tasks(
        &self,
        filter: &TaskFilter,
        skip: u64,
        limit: i64,
    ) -> Result<Vec<Task>, StoreError> {
        let cursor = self
            .tasks()
            .find(task_filter_doc(filter))
            .sort(doc! { "order": 1, "_id": 1 })
            .skip(skip)
            .limit(limit)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn count_tasks(&self, filter: &TaskFilter) -> Result<u64, StoreError> {
        Ok(self.tasks().count_documents(task_filter_doc(filter)).await?)
    }

    async fn max_task_order(&self, day: Option<&str>) -> Result<Option<i64>, StoreError> {
        let last = self
            .tasks()
            .find_one(doc! { "day": day_scope(day) })
            .sort(doc! { "order": -1 })
            .await?;
        Ok(last.map(|t| t.order))
    }

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Option<Task>, StoreError> {
        let mut set_doc = doc! { "updatedAt": to_bson(&Utc::now())? };
        if let Some(title) = &patch.title {
            set_doc.insert("title", title);
        }
        if let Some(description) = &patch.description {
            set_doc.insert("description", description);
        }
        if let Some(topic) = &patch.topic {
            set_doc.insert("topic", topic);
        }
        if let Some(day) = &patch.day {
            set_doc.insert("day", day_scope(day.as_deref()));
        }
        if let Some(order) = patch.order {
            set_doc.insert("order", order);
        }
        if let Some(status) = patch.status {
            set_doc.insert("status", status.as_str());
        }

        Ok(self
            .tasks()
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set_doc })
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn delete_task(&self, id: &str) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks().find_one_and_delete(doc! { "_id": id }).await?)
    }

    async fn upsert_answer(
        &self,
        task: &str,
        user_id: &str,
        content: &str,
    ) -> Result<Answer, StoreError> {
        let now = to_bson(&Utc::now())?;
        let filter = doc! { "task": task, "userId": user_id };
        let update = doc! {
            "$set": { "content": content, "updatedAt": now.clone() },
            "$setOnInsert": { "_id": new_id(), "createdAt": now },
        };

        let mut retried = false;
        loop {
            let res = self
                .answers()
                .find_one_and_update(filter.clone(), update.clone())
                .upsert(true)
                .return_document(ReturnDocument::After)
                .await;
            match res {
                Ok(Some(answer)) => return Ok(answer),
                Ok(None) => {
                    return Err(StoreError::Unavailable(
                        "answer upsert returned no document".to_string(),
                    ))
                }
                // Two concurrent upserts both tried to insert; the unique index
                // let one win, so the retry matches its row.
                Err(e) if !retried && is_duplicate_key(&e) => {
                    warn!("Answer upsert raced for task {} user {}, retrying", task, user_id);
                    retried = true;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn find_answer(&self, task: &str, user_id: &str) -> Result<Option<Answer>, StoreError> {
        Ok(self
            .answers()
            .find_one(doc! { "task": task, "userId": user_id })
            .await?)
    }

    async fn delete_answer(&self, id: &str) -> Result<bool, StoreError> {
        let res = self.answers().delete_one(doc! { "_id": id }).await?;
        Ok(res.deleted_count == 1)
    }

    async fn delete_answers_for_task(&self, task: &str) -> Result<u64, StoreError> {
        let res = self.answers().delete_many(doc! { "task": task }).await?;
        Ok(res.deleted_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_filter_escapes_regex_metacharacters() {
        let filter = TaskFilter { day: Some("d1".into()), topic: Some("c++".into()) };
        let f = task_filter_doc(&filter);
        assert_eq!(f.get_str("day").unwrap(), "d1");
        let topic = f.get_document("topic").unwrap();
        assert_eq!(topic.get_str("$regex").unwrap(), r"c\+\+");
        assert_eq!(topic.get_str("$options").unwrap(), "i");
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(task_filter_doc(&TaskFilter::default()).is_empty());
    }

    #[test]
    fn unassigned_scope_queries_null_day() {
        assert_eq!(day_scope(None), Bson::Null);
        assert_eq!(day_scope(Some("d1")), Bson::String("d1".into()));
    }
}
