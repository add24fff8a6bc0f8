// src/day.rs

use actix_web::{web, HttpResponse};
use log::debug;
use serde::Deserialize;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::response::{created, ok};

#[derive(Debug, Deserialize)]
pub struct CreateDayRequest {
    pub title: Option<String>,
}

/// GET /api/days
/// All days in sidebar order, each with its tasks expanded.
pub async fn list_days(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let days = data.planner.list_days().await?;
    Ok(ok(days, "Days fetched successfully"))
}

/// POST /api/days
pub async fn create_day(
    data: web::Data<AppState>,
    payload: web::Json<CreateDayRequest>,
) -> Result<HttpResponse, ApiError> {
    debug!("Received create_day request: {:?}", payload);
    let day = data.planner.create_day(payload.title.as_deref()).await?;
    Ok(created(day, "Day created successfully"))
}

/// GET /api/days/{day_id}
pub async fn get_day(
    data: web::Data<AppState>,
    day_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let day = data.planner.get_day(&day_id).await?;
    Ok(ok(day, "Day fetched successfully"))
}
