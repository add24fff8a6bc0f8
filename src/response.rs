// src/response.rs

use actix_web::HttpResponse;
use serde::Serialize;

/// Envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub message: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: Option<T>, message: impl Into<String>) -> Self {
        ApiResponse { success: true, data, message: message.into() }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        ApiResponse { success: false, data: None, message: message.into() }
    }
}

pub fn ok<T: Serialize>(data: T, message: &str) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::success(Some(data), message))
}

pub fn created<T: Serialize>(data: T, message: &str) -> HttpResponse {
    HttpResponse::Created().json(ApiResponse::success(Some(data), message))
}

/// Success with `data: null`, used for deletions and absent answers.
pub fn ok_empty(message: &str) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::<()>::success(None, message))
}
