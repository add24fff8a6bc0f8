// src/planner.rs

use std::sync::Arc;

use chrono::Utc;
use log::{debug, error, info, warn};
use serde::Serialize;

use crate::error::ApiError;
use crate::models::{
    new_id, Answer, CreateTaskRequest, Day, DayView, Task, TaskStatus, UpdateTaskRequest,
};
use crate::store::{Store, TaskFilter, TaskPatch, DAY_ORDER_SCOPE};

pub const DEFAULT_PAGE_LIMIT: u64 = 20;
pub const MAX_PAGE_LIMIT: u64 = 100;

/// Page request for task listing, already clamped to legal bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination { page: 1, limit: DEFAULT_PAGE_LIMIT }
    }
}

impl Pagination {
    /// Lenient parse: anything non-numeric falls back to the default, then
    /// `page` is clamped to >= 1 and `limit` to 1..=100.
    pub fn from_raw(page: Option<&str>, limit: Option<&str>) -> Self {
        let parse = |raw: Option<&str>, default: u64| {
            raw.and_then(|s| s.trim().parse::<i64>().ok())
                .unwrap_or(default as i64)
        };
        let page = parse(page, 1).max(1) as u64;
        let limit = parse(limit, DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT as i64) as u64;
        Pagination { page, limit }
    }

    /// Saturates at `i64::MAX`, the largest skip the database accepts.
    fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit).min(i64::MAX as u64)
    }
}

#[derive(Debug, Serialize)]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

/// Ordering and referential-integrity rules for days, tasks and answers.
/// Writes that span two collections are sequential and not atomic; the
/// second write is best-effort and only logged when it fails.
#[derive(Clone)]
pub struct Planner {
    store: Arc<dyn Store>,
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

impl Planner {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Planner { store }
    }

    pub async fn create_day(&self, title: Option<&str>) -> Result<Day, ApiError> {
        let title = non_blank(title).ok_or_else(|| ApiError::validation("Title is required"))?;

        let floor = self.store.max_day_order().await?.unwrap_or(0);
        let order = self.store.next_sequence(DAY_ORDER_SCOPE, floor).await?;

        let day = Day { id: new_id(), title, order, tasks: Vec::new() };
        if let Err(e) = self.store.insert_day(&day).await {
            // Give the order back so the next day does not skip it.
            match self.store.release_sequence(DAY_ORDER_SCOPE, order).await {
                Ok(true) => debug!("Day order {} released after failed insert", order),
                Ok(false) => warn!("Day order {} already passed, left as a gap", order),
                Err(re) => error!("Day order {} not released: {}", order, re),
            }
            return Err(e.into());
        }
        info!("Day created {} with order {}", day.id, day.order);
        Ok(day)
    }

    pub async fn list_days(&self) -> Result<Vec<DayView>, ApiError> {
        let days = self.store.list_days().await?;
        let ids: Vec<String> = days.iter().flat_map(|d| d.tasks.iter().cloned()).collect();
        let tasks = self.store.find_tasks_by_ids(&ids).await?;
        Ok(days.into_iter().map(|d| DayView::join(d, &tasks)).collect())
    }

    pub async fn get_day(&self, id: &str) -> Result<DayView, ApiError> {
        let day = self
            .store
            .find_day(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Day not found"))?;
        let tasks = self.store.find_tasks_by_ids(&day.tasks).await?;
        Ok(DayView::join(day, &tasks))
    }

    /// Creates one or more tasks under a single day. The whole batch is
    /// validated before anything is written.
    pub async fn create_tasks(&self, items: Vec<CreateTaskRequest>) -> Result<Vec<Task>, ApiError> {
        if items.is_empty() {
            return Err(ApiError::validation("No tasks provided"));
        }
        if items.iter().any(|item| non_blank(item.title.as_deref()).is_none()) {
            return Err(ApiError::validation("Every task must have a title"));
        }

        let day = non_blank(items[0].day.as_deref());
        let mixed = items
            .iter()
            .filter_map(|item| non_blank(item.day.as_deref()))
            .any(|d| Some(&d) != day.as_ref());
        if mixed {
            return Err(ApiError::validation("All tasks in a batch must belong to the same day"));
        }
        if let Some(day_id) = &day {
            if self.store.find_day(day_id).await?.is_none() {
                return Err(ApiError::not_found("Day not found"));
            }
        }

        let next_order = self.store.max_task_order(day.as_deref()).await?.unwrap_or(0) + 1;
        let now = Utc::now();
        let tasks: Vec<Task> = items
            .into_iter()
            .enumerate()
            .map(|(i, item)| Task {
                id: new_id(),
                title: non_blank(item.title.as_deref()).unwrap_or_default(),
                description: non_blank(item.description.as_deref()).unwrap_or_default(),
                topic: non_blank(item.topic.as_deref()).unwrap_or_default(),
                day: day.clone(),
                order: item.order.unwrap_or(next_order + i as i64),
                status: item.status.unwrap_or_default(),
                created_at: now,
                updated_at: now,
            })
            .collect();

        for task in &tasks {
            self.store.insert_task(task).await?;
            debug!("Task inserted {} with order {}", task.id, task.order);
        }

        if let Some(day_id) = &day {
            let ids: Vec<String> = tasks.iter().map(|t| t.id.clone()).collect();
            if !self.store.push_day_tasks(day_id, &ids).await? {
                warn!("Day {} vanished before {} task(s) could be linked", day_id, ids.len());
            }
        }

        info!("Created {} task(s) for day {:?}", tasks.len(), day);
        Ok(tasks)
    }

    pub async fn list_tasks(
        &self,
        filter: TaskFilter,
        pagination: Pagination,
    ) -> Result<TaskPage, ApiError> {
        let filter = TaskFilter {
            day: non_blank(filter.day.as_deref()),
            topic: non_blank(filter.topic.as_deref()),
        };
        let total = self.store.count_tasks(&filter).await?;
        let tasks = self
            .store
            .find_tasks(&filter, pagination.skip(), pagination.limit as i64)
            .await?;
        Ok(TaskPage { tasks, total, page: pagination.page, limit: pagination.limit })
    }

    pub async fn get_task(&self, id: &str) -> Result<Task, ApiError> {
        self.store
            .find_task(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Task not found"))
    }

    /// Partial update. Moving a task to another day moves its back-reference.
    pub async fn update_task(&self, id: &str, update: UpdateTaskRequest) -> Result<Task, ApiError> {
        let existing = self.get_task(id).await?;

        let title = match update.title.as_deref() {
            Some(raw) => Some(
                non_blank(Some(raw)).ok_or_else(|| ApiError::validation("Title cannot be empty"))?,
            ),
            None => None,
        };
        let day = update.day.map(|d| non_blank(d.as_deref()));
        if let Some(Some(day_id)) = &day {
            if self.store.find_day(day_id).await?.is_none() {
                return Err(ApiError::not_found("Day not found"));
            }
        }

        let patch = TaskPatch {
            title,
            description: update.description.map(|s| s.trim().to_string()),
            topic: update.topic.map(|s| s.trim().to_string()),
            day,
            order: update.order,
            status: update.status,
        };
        if patch.is_empty() {
            return Ok(existing);
        }

        let updated = self
            .store
            .update_task(id, &patch)
            .await?
            .ok_or_else(|| ApiError::not_found("Task not found"))?;

        if existing.day != updated.day {
            self.relink(&updated.id, existing.day.as_deref(), updated.day.as_deref())
                .await;
        }
        Ok(updated)
    }

    /// Moves the task one step along the status cycle.
    pub async fn advance_task_status(&self, id: &str) -> Result<Task, ApiError> {
        let task = self.get_task(id).await?;
        let next: TaskStatus = task.status.next();
        let patch = TaskPatch { status: Some(next), ..TaskPatch::default() };
        let updated = self
            .store
            .update_task(id, &patch)
            .await?
            .ok_or_else(|| ApiError::not_found("Task not found"))?;
        info!("Task {} moved {} -> {}", id, task.status.as_str(), next.as_str());
        Ok(updated)
    }

    /// Deletes the task, then unlinks it from its day and drops its answers.
    /// Only the first write decides the outcome.
    pub async fn delete_task(&self, id: &str) -> Result<(), ApiError> {
        let task = self
            .store
            .delete_task(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Task not found"))?;

        if let Some(day_id) = &task.day {
            match self.store.pull_day_task(day_id, &task.id).await {
                Ok(true) => {}
                Ok(false) => warn!("Day {} of deleted task {} no longer exists", day_id, task.id),
                Err(e) => error!(
                    "Task {} deleted but day {} still references it: {}",
                    task.id, day_id, e
                ),
            }
        }

        match self.store.delete_answers_for_task(&task.id).await {
            Ok(0) => {}
            Ok(n) => debug!("Removed {} answer(s) of task {}", n, task.id),
            Err(e) => error!("Answers of deleted task {} were not removed: {}", task.id, e),
        }

        info!("Task deleted {}", task.id);
        Ok(())
    }

    async fn relink(&self, task_id: &str, from: Option<&str>, to: Option<&str>) {
        if let Some(old) = from {
            if let Err(e) = self.store.pull_day_task(old, task_id).await {
                error!("Task {} left dangling on day {}: {}", task_id, old, e);
            }
        }
        if let Some(new) = to {
            match self.store.push_day_tasks(new, &[task_id.to_string()]).await {
                Ok(true) => {}
                Ok(false) => warn!("Day {} vanished before task {} was linked", new, task_id),
                Err(e) => error!("Task {} not linked to day {}: {}", task_id, new, e),
            }
        }
    }

    pub async fn upsert_answer(
        &self,
        task: Option<&str>,
        user_id: Option<&str>,
        content: Option<&str>,
    ) -> Result<Answer, ApiError> {
        // Content is markdown and stored as written; only ids are trimmed.
        let content = content.filter(|c| !c.trim().is_empty());
        let (Some(task), Some(user_id), Some(content)) = (non_blank(task), non_blank(user_id), content)
        else {
            return Err(ApiError::validation("task, userId, and content are required"));
        };
        if self.store.find_task(&task).await?.is_none() {
            return Err(ApiError::not_found("Task not found"));
        }
        let answer = self.store.upsert_answer(&task, &user_id, content).await?;
        debug!("Answer {} saved for task {} user {}", answer.id, task, user_id);
        Ok(answer)
    }

    /// Absence is a normal state and comes back as `Ok(None)`.
    pub async fn get_answer(
        &self,
        task: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<Option<Answer>, ApiError> {
        let (Some(task), Some(user_id)) = (non_blank(task), non_blank(user_id)) else {
            return Err(ApiError::validation("taskId and userId query params are required"));
        };
        Ok(self.store.find_answer(&task, &user_id).await?)
    }

    pub async fn delete_answer(&self, id: &str) -> Result<(), ApiError> {
        if self.store.delete_answer(id).await? {
            info!("Answer deleted {}", id);
            Ok(())
        } else {
            Err(ApiError::not_found("Answer not found"))
        }
    }

    /// Loads the demo plan when the store has no days. Returns whether
    /// anything was written.
    pub async fn seed(&self) -> Result<bool, ApiError> {
        if self.store.count_days().await? > 0 {
            return Ok(false);
        }

        let day1 = self.create_day(Some("Day 1")).await?;
        let day2 = self.create_day(Some("Day 2")).await?;
        self.create_day(Some("Day 3")).await?;

        let item = |title: &str, description: &str, topic: &str, day: &Day| CreateTaskRequest {
            title: Some(title.to_string()),
            description: Some(description.to_string()),
            topic: Some(topic.to_string()),
            day: Some(day.id.clone()),
            ..CreateTaskRequest::default()
        };
        self.create_tasks(vec![
            item(
                "Learn React Fundamentals",
                "Understand Components, JSX, Props, and State.",
                "React",
                &day1,
            ),
            item(
                "Two Sum",
                "Given an array of integers nums and an integer target, return indices of the two numbers such that they add up to target.",
                "DSA",
                &day1,
            ),
        ])
        .await?;
        self.create_tasks(vec![item(
            "Event Loop",
            "Explain how the Event Loop works in JavaScript.",
            "JavaScript",
            &day2,
        )])
        .await?;

        info!("Seeded demo plan");
        Ok(true)
    }
}
