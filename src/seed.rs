// src/seed.rs

use actix_web::{web, HttpResponse};

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::response::ok_empty;

/// GET /api/seed
/// Loads the demo plan into an empty store; a no-op otherwise.
pub async fn seed(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    if data.planner.seed().await? {
        Ok(ok_empty("Seeded successfully"))
    } else {
        Ok(ok_empty("Data already exists"))
    }
}
