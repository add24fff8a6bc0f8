// src/answer.rs

use actix_web::{web, HttpResponse};
use log::debug;
use serde::Deserialize;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::response::{ok, ok_empty};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertAnswerRequest {
    pub task: Option<String>,
    pub user_id: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerQuery {
    pub task_id: Option<String>,
    pub user_id: Option<String>,
}

/// POST /api/answers
/// One answer per user per task: saves over an existing one.
pub async fn upsert_answer(
    data: web::Data<AppState>,
    payload: web::Json<UpsertAnswerRequest>,
) -> Result<HttpResponse, ApiError> {
    debug!(
        "Received upsert_answer request for task {:?} user {:?}",
        payload.task, payload.user_id
    );
    let answer = data
        .planner
        .upsert_answer(
            payload.task.as_deref(),
            payload.user_id.as_deref(),
            payload.content.as_deref(),
        )
        .await?;
    Ok(ok(answer, "Answer saved successfully"))
}

/// GET /api/answers?taskId=&userId=
pub async fn get_answer(
    data: web::Data<AppState>,
    query: web::Query<AnswerQuery>,
) -> Result<HttpResponse, ApiError> {
    match data
        .planner
        .get_answer(query.task_id.as_deref(), query.user_id.as_deref())
        .await?
    {
        Some(answer) => Ok(ok(answer, "Answer fetched successfully")),
        None => Ok(ok_empty("No answer found for this task and user")),
    }
}

/// DELETE /api/answers/{answer_id}
pub async fn delete_answer(
    data: web::Data<AppState>,
    answer_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    data.planner.delete_answer(&answer_id).await?;
    Ok(ok_empty("Answer deleted successfully"))
}
