// src/task.rs

use actix_web::{web, HttpResponse};
use log::debug;
use serde::Deserialize;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::{CreateTasksPayload, UpdateTaskRequest};
use crate::planner::Pagination;
use crate::response::{created, ok, ok_empty};
use crate::store::TaskFilter;

/// Query string of `GET /api/tasks`. Paging values stay raw strings so a
/// bad number falls back to the default instead of failing the request.
#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    #[serde(alias = "dayId")]
    pub day: Option<String>,
    pub topic: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// GET /api/tasks?day=&topic=&page=&limit=
pub async fn list_tasks(
    data: web::Data<AppState>,
    query: web::Query<TaskQuery>,
) -> Result<HttpResponse, ApiError> {
    let query = query.into_inner();
    let pagination = Pagination::from_raw(query.page.as_deref(), query.limit.as_deref());
    let filter = TaskFilter { day: query.day, topic: query.topic };
    let page = data.planner.list_tasks(filter, pagination).await?;
    Ok(ok(page, "Tasks fetched successfully"))
}

/// POST /api/tasks
/// Accepts a single task object or an array for bulk import. The response
/// mirrors the shape of the request.
pub async fn create_tasks(
    data: web::Data<AppState>,
    payload: web::Json<CreateTasksPayload>,
) -> Result<HttpResponse, ApiError> {
    debug!("Received create_tasks request: {:?}", payload);
    match payload.into_inner() {
        CreateTasksPayload::Many(items) => {
            let tasks = data.planner.create_tasks(items).await?;
            Ok(created(tasks, "Task(s) created successfully"))
        }
        CreateTasksPayload::One(item) => {
            let mut tasks = data.planner.create_tasks(vec![item]).await?;
            Ok(created(tasks.remove(0), "Task(s) created successfully"))
        }
    }
}

/// GET /api/tasks/{task_id}
pub async fn get_task(
    data: web::Data<AppState>,
    task_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let task = data.planner.get_task(&task_id).await?;
    Ok(ok(task, "Task fetched successfully"))
}

/// PUT /api/tasks/{task_id}
pub async fn update_task(
    data: web::Data<AppState>,
    task_id: web::Path<String>,
    payload: web::Json<UpdateTaskRequest>,
) -> Result<HttpResponse, ApiError> {
    debug!("Received update_task request for {}: {:?}", task_id, payload);
    let task = data.planner.update_task(&task_id, payload.into_inner()).await?;
    Ok(ok(task, "Task updated successfully"))
}

/// POST /api/tasks/{task_id}/advance
pub async fn advance_task(
    data: web::Data<AppState>,
    task_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let task = data.planner.advance_task_status(&task_id).await?;
    Ok(ok(task, "Task status advanced"))
}

/// DELETE /api/tasks/{task_id}
pub async fn delete_task(
    data: web::Data<AppState>,
    task_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    data.planner.delete_task(&task_id).await?;
    Ok(ok_empty("Task deleted successfully"))
}
