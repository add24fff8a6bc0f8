// src/memory_store.rs

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use crate::models::{new_id, Answer, Day, Task};
use crate::store::{Store, StoreError, TaskFilter, TaskPatch};

#[derive(Default)]
struct Collections {
    days: Vec<Day>,
    tasks: Vec<Task>,
    answers: Vec<Answer>,
    counters: HashMap<String, i64>,
}

/// In-process store with the same uniqueness rules as the Mongo indexes.
/// Each call holds the lock for its whole body, so every operation is atomic.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collections>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

fn matches(task: &Task, filter: &TaskFilter) -> bool {
    if let Some(day) = &filter.day {
        if task.day.as_deref() != Some(day.as_str()) {
            return false;
        }
    }
    if let Some(topic) = &filter.topic {
        if !task.topic.to_lowercase().contains(&topic.to_lowercase()) {
            return false;
        }
    }
    true
}

fn by_order(a: &Task, b: &Task) -> std::cmp::Ordering {
    a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_day(&self, day: &Day) -> Result<(), StoreError> {
        let mut c = self.lock()?;
        if c.days.iter().any(|d| d.order == day.order) {
            return Err(StoreError::Duplicate {
                collection: "days",
                key: format!("order {}", day.order),
            });
        }
        c.days.push(day.clone());
        Ok(())
    }

    async fn find_day(&self, id: &str) -> Result<Option<Day>, StoreError> {
        Ok(self.lock()?.days.iter().find(|d| d.id == id).cloned())
    }

    async fn list_days(&self) -> Result<Vec<Day>, StoreError> {
        let mut days = self.lock()?.days.clone();
        days.sort_by_key(|d| d.order);
        Ok(days)
    }

    async fn count_days(&self) -> Result<u64, StoreError> {
        Ok(self.lock()?.days.len() as u64)
    }

    async fn max_day_order(&self) -> Result<Option<i64>, StoreError> {
        Ok(self.lock()?.days.iter().map(|d| d.order).max())
    }

    async fn push_day_tasks(&self, day_id: &str, task_ids: &[String]) -> Result<bool, StoreError> {
        let mut c = self.lock()?;
        match c.days.iter_mut().find(|d| d.id == day_id) {
            Some(day) => {
                day.tasks.extend(task_ids.iter().cloned());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn pull_day_task(&self, day_id: &str, task_id: &str) -> Result<bool, StoreError> {
        let mut c = self.lock()?;
        match c.days.iter_mut().find(|d| d.id == day_id) {
            Some(day) => {
                day.tasks.retain(|t| t != task_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn next_sequence(&self, scope: &str, floor: i64) -> Result<i64, StoreError> {
        let mut c = self.lock()?;
        let seq = c.counters.entry(scope.to_string()).or_insert(0);
        *seq = (*seq).max(floor) + 1;
        Ok(*seq)
    }

    async fn release_sequence(&self, scope: &str, value: i64) -> Result<bool, StoreError> {
        let mut c = self.lock()?;
        match c.counters.get_mut(scope) {
            Some(seq) if *seq == value => {
                *seq = value - 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_task(&self, task: &Task) -> Result<(), StoreError> {
        self.lock()?.tasks.push(task.clone());
        Ok(())
    }

    async fn find_task(&self, id: &str) -> Result<Option<Task>, StoreError> {
        Ok(self.lock()?.tasks.iter().find(|t| t.id == id).cloned())
    }

    async fn find_tasks_by_ids(&self, ids: &[String]) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = self
            .lock()?
            .tasks
            .iter()
            .filter(|t| ids.contains(&t.id))
            .cloned()
            .collect();
        tasks.sort_by(by_order);
        Ok(tasks)
    }

    async fn find_tasks(
        &self,
        filter: &TaskFilter,
        skip: u64,
        limit: i64,
    ) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = self
            .lock()?
            .tasks
            .iter()
            .filter(|t| matches(t, filter))
            .cloned()
            .collect();
        tasks.sort_by(by_order);
        Ok(tasks
            .into_iter()
            .skip(skip as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count_tasks(&self, filter: &TaskFilter) -> Result<u64, StoreError> {
        Ok(self.lock()?.tasks.iter().filter(|t| matches(t, filter)).count() as u64)
    }

    async fn max_task_order(&self, day: Option<&str>) -> Result<Option<i64>, StoreError> {
        Ok(self
            .lock()?
            .tasks
            .iter()
            .filter(|t| t.day.as_deref() == day)
            .map(|t| t.order)
            .max())
    }

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<Option<Task>, StoreError> {
        let mut c = self.lock()?;
        let Some(task) = c.tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        if let Some(title) = &patch.title {
            task.title = title.clone();
        }
        if let Some(description) = &patch.description {
            task.description = description.clone();
        }
        if let Some(topic) = &patch.topic {
            task.topic = topic.clone();
        }
        if let Some(day) = &patch.day {
            task.day = day.clone();
        }
        if let Some(order) = patch.order {
            task.order = order;
        }
        if let Some(status) = patch.status {
            task.status = status;
        }
        task.updated_at = Utc::now();
        Ok(Some(task.clone()))
    }

    async fn delete_task(&self, id: &str) -> Result<Option<Task>, StoreError> {
        let mut c = self.lock()?;
        let pos = c.tasks.iter().position(|t| t.id == id);
        Ok(pos.map(|i| c.tasks.remove(i)))
    }

    async fn upsert_answer(
        &self,
        task: &str,
        user_id: &str,
        content: &str,
    ) -> Result<Answer, StoreError> {
        let mut c = self.lock()?;
        let now = Utc::now();
        if let Some(existing) = c
            .answers
            .iter_mut()
            .find(|a| a.task == task && a.user_id == user_id)
        {
            existing.content = content.to_string();
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let answer = Answer {
            id: new_id(),
            task: task.to_string(),
            user_id: user_id.to_string(),
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };
        c.answers.push(answer.clone());
        Ok(answer)
    }

    async fn find_answer(&self, task: &str, user_id: &str) -> Result<Option<Answer>, StoreError> {
        Ok(self
            .lock()?
            .answers
            .iter()
            .find(|a| a.task == task && a.user_id == user_id)
            .cloned())
    }

    async fn delete_answer(&self, id: &str) -> Result<bool, StoreError> {
        let mut c = self.lock()?;
        let before = c.answers.len();
        c.answers.retain(|a| a.id != id);
        Ok(c.answers.len() != before)
    }

    async fn delete_answers_for_task(&self, task: &str) -> Result<u64, StoreError> {
        let mut c = self.lock()?;
        let before = c.answers.len();
        c.answers.retain(|a| a.task != task);
        Ok((before - c.answers.len()) as u64)
    }
}
