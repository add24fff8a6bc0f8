use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Lifecycle of a task. The only legal move is one step along
/// not_started -> started -> completed -> not_started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    NotStarted,
    Started,
    Completed,
}

impl TaskStatus {
    pub fn next(self) -> Self {
        match self {
            TaskStatus::NotStarted => TaskStatus::Started,
            TaskStatus::Started => TaskStatus::Completed,
            TaskStatus::Completed => TaskStatus::NotStarted,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not_started",
            TaskStatus::Started => "started",
            TaskStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub topic: String,
    /// Parent day, if the task is assigned to one.
    #[serde(default)]
    pub day: Option<String>,
    /// Unique only within the parent day.
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One item of a create request. Everything is optional at the wire level
/// so a missing title is reported as a validation error, not a parse error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub topic: Option<String>,
    pub day: Option<String>,
    pub order: Option<i64>,
    pub status: Option<TaskStatus>,
}

/// Body of `POST /api/tasks`: a single task or a bulk array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CreateTasksPayload {
    Many(Vec<CreateTaskRequest>),
    One(CreateTaskRequest),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub topic: Option<String>,
    /// Absent leaves the day alone, `null` unassigns the task.
    #[serde(default, deserialize_with = "nullable")]
    pub day: Option<Option<String>>,
    pub order: Option<i64>,
    pub status: Option<TaskStatus>,
}

fn nullable<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}
