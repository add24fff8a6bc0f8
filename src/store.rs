// src/store.rs

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Answer, Day, Task, TaskStatus};

/// Errors raised by a persistence backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] mongodb::bson::ser::Error),

    #[error("Duplicate key in {collection}: {key}")]
    Duplicate { collection: &'static str, key: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Filter used by task listing. `topic` is a case-insensitive literal
/// substring match.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub day: Option<String>,
    pub topic: Option<String>,
}

/// Partial update for a task. `day: Some(None)` clears the assignment.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub topic: Option<String>,
    pub day: Option<Option<String>>,
    pub order: Option<i64>,
    pub status: Option<TaskStatus>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.topic.is_none()
            && self.day.is_none()
            && self.order.is_none()
            && self.status.is_none()
    }
}

/// Counter scope for the day sequence.
pub const DAY_ORDER_SCOPE: &str = "days";

/// Persistence port used by the planner. Every call is a single store
/// round trip; nothing here spans more than one collection.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_day(&self, day: &Day) -> Result<(), StoreError>;
    async fn find_day(&self, id: &str) -> Result<Option<Day>, StoreError>;
    /// All days sorted by ascending order.
    async fn list_days(&self) -> Result<Vec<Day>, StoreError>;
    async fn count_days(&self) -> Result<u64, StoreError>;
    async fn max_day_order(&self) -> Result<Option<i64>, StoreError>;
    /// Appends `task_ids` to the day's back-references in one write.
    /// Returns false when the day does not exist.
    async fn push_day_tasks(&self, day_id: &str, task_ids: &[String]) -> Result<bool, StoreError>;
    async fn pull_day_task(&self, day_id: &str, task_id: &str) -> Result<bool, StoreError>;

    /// Atomically sets the scope's counter to `max(counter, floor) + 1`
    /// and returns the new value.
    async fn next_sequence(&self, scope: &str, floor: i64) -> Result<i64, StoreError>;
    /// Hands `value` back by stepping the counter to `value - 1`, but only
    /// while the counter still equals `value`. Returns whether it stepped.
    async fn release_sequence(&self, scope: &str, value: i64) -> Result<bool, StoreError>;

    async fn insert_task(&self, task: &Task) -> Result<(), StoreError>;
    async fn find_task(&self, id: &str) -> Result<Option<Task>, StoreError>;
    /// Tasks whose id is in `ids`, sorted by ascending order.
    async fn find_tasks_by_ids(&self, ids: &[String]) -> Result<Vec<Task>, StoreError>;
    /// One page of matching tasks sorted by order, then id.
    async fn find_tasks(
        &self,
        filter: &TaskFilter,
        skip: u64,
        limit: i64,
    ) -> Result<Vec<Task>, StoreError>;
    async fn count_tasks(&self, filter: &TaskFilter) -> Result<u64, StoreError>;
    /// Highest order under `day`; `None` scopes to unassigned tasks.
    async fn max_task_order(&self, day: Option<&str>) -> Result<Option<i64>, StoreError>;
    /// Applies the patch and returns the task as it is after the write.
    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Option<Task>, StoreError>;
    /// Removes the task and returns what was deleted.
    async fn delete_task(&self, id: &str) -> Result<Option<Task>, StoreError>;

    /// Find-or-create keyed on `(task, user_id)`, replacing `content`.
    async fn upsert_answer(
        &self,
        task: &str,
        user_id: &str,
        content: &str,
    ) -> Result<Answer, StoreError>;
    async fn find_answer(&self, task: &str, user_id: &str) -> Result<Option<Answer>, StoreError>;
    async fn delete_answer(&self, id: &str) -> Result<bool, StoreError>;
    async fn delete_answers_for_task(&self, task: &str) -> Result<u64, StoreError>;
}
