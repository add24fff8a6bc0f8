mod answer;
mod day;
mod task;

pub use answer::Answer;
pub use day::{Day, DayView};
pub use task::{CreateTaskRequest, CreateTasksPayload, Task, TaskStatus, UpdateTaskRequest};

use mongodb::bson::oid::ObjectId;

/// Generates a fresh document id as a 24-character hex string.
pub fn new_id() -> String {
    ObjectId::new().to_hex()
}
