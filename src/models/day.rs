use serde::{Deserialize, Serialize};

use super::Task;

/// A study day as stored in the `days` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Day {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    /// Globally unique; defines the sidebar sequence.
    pub order: i64,
    /// Back-references to the tasks of this day, in insertion order.
    #[serde(default)]
    pub tasks: Vec<String>,
}

/// A day with its tasks expanded, as returned by the read endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct DayView {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub order: i64,
    pub tasks: Vec<Task>,
}

impl DayView {
    /// Joins the stored back-references against live tasks. Ids that no
    /// longer resolve are dropped; the result is sorted by task order.
    pub fn join(day: Day, candidates: &[Task]) -> Self {
        let mut tasks: Vec<Task> = candidates
            .iter()
            .filter(|t| day.tasks.contains(&t.id))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        DayView {
            id: day.id,
            title: day.title,
            order: day.order,
            tasks,
        }
    }
}
