// src/main.rs

mod answer;
mod app_state;
mod config;
mod day;
mod db;
mod error;
mod memory_store;
mod models;
mod planner;
mod response;
mod seed;
mod store;
mod task;

use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{error::InternalError, http, middleware::Logger, web, App, HttpResponse, HttpServer};
use env_logger::Env;
use log::{info, warn};

use crate::answer::{delete_answer, get_answer, upsert_answer};
use crate::app_state::AppState;
use crate::config::{Config, StoreBackend};
use crate::day::{create_day, get_day, list_days};
use crate::db::MongoDB;
use crate::memory_store::MemoryStore;
use crate::planner::Planner;
use crate::response::ApiResponse;
use crate::seed::seed;
use crate::store::{Store, StoreError};
use crate::task::{advance_task, create_tasks, delete_task, get_task, list_tasks, update_task};

/// Permissive by default; restricted to one origin when configured.
fn cors(frontend_origin: Option<&str>) -> Cors {
    let cors = match frontend_origin {
        Some(origin) => Cors::default().allowed_origin(origin).supports_credentials(),
        None => Cors::default().allow_any_origin().send_wildcard(),
    };
    cors.allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
        .max_age(3600)
}

fn bad_request(message: String) -> HttpResponse {
    HttpResponse::BadRequest().json(ApiResponse::<()>::failure(message))
}

/// Registers every API route plus the body/query error handlers, so
/// malformed input is answered with the standard envelope.
pub fn routes(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default().error_handler(|err, _req| {
        let response = bad_request(format!("Invalid request body: {}", err));
        InternalError::from_response(err, response).into()
    });
    let query_config = web::QueryConfig::default().error_handler(|err, _req| {
        let response = bad_request(format!("Invalid query string: {}", err));
        InternalError::from_response(err, response).into()
    });

    cfg.app_data(json_config).app_data(query_config).service(
        web::scope("/api")
            .service(
                web::scope("/days")
                    .route("", web::get().to(list_days))
                    .route("", web::post().to(create_day))
                    .route("/{day_id}", web::get().to(get_day)),
            )
            .service(
                web::scope("/tasks")
                    .route("", web::get().to(list_tasks))
                    .route("", web::post().to(create_tasks))
                    .route("/{task_id}", web::get().to(get_task))
                    .route("/{task_id}", web::put().to(update_task))
                    .route("/{task_id}", web::delete().to(delete_task))
                    .route("/{task_id}/advance", web::post().to(advance_task)),
            )
            .service(
                web::scope("/answers")
                    .route("", web::get().to(get_answer))
                    .route("", web::post().to(upsert_answer))
                    .route("/{answer_id}", web::delete().to(delete_answer)),
            )
            .route("/seed", web::get().to(seed)),
    );
}

async fn open_store(config: &Config) -> Result<Arc<dyn Store>, StoreError> {
    match config.store_backend {
        StoreBackend::Memory => {
            warn!("Using the in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Mongo => {
            let mongodb = MongoDB::init(&config.mongo_uri, &config.database_name).await?;
            mongodb.ensure_indexes().await?;
            info!("Connected to MongoDB database {}", config.database_name);
            Ok(Arc::new(mongodb))
        }
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let store = open_store(&config).await.map_err(io::Error::other)?;
    let state = web::Data::new(AppState { planner: Planner::new(store) });

    info!("Server running at http://{}", config.bind_addr);
    info!(
        "Allowed CORS Origin: {}",
        config.frontend_origin.as_deref().unwrap_or("*")
    );

    let bind_addr = config.bind_addr.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(cors(config.frontend_origin.as_deref()))
            .app_data(state.clone())
            .configure(routes)
    })
    .bind(bind_addr)?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test::{call_service, init_service, read_body_json, TestRequest};
    use serde_json::{json, Value};

    fn state() -> web::Data<AppState> {
        web::Data::new(AppState { planner: Planner::new(Arc::new(MemoryStore::new())) })
    }

    macro_rules! app {
        () => {
            init_service(App::new().app_data(state()).configure(routes)).await
        };
    }

    macro_rules! send {
        ($app:expr, $req:expr) => {{
            let resp = call_service(&$app, $req.to_request()).await;
            let status = resp.status();
            let body: Value = read_body_json(resp).await;
            (status, body)
        }};
    }

    #[actix_web::test]
    async fn day_task_lifecycle() {
        let app = app!();

        let (status, day1) = send!(app, TestRequest::post().uri("/api/days").set_json(json!({ "title": "Day 1" })));
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(day1["success"], true);
        assert_eq!(day1["data"]["order"], 1);
        let (_, day2) = send!(app, TestRequest::post().uri("/api/days").set_json(json!({ "title": "Day 2" })));
        assert_eq!(day2["data"]["order"], 2);

        let day_id = day1["data"]["_id"].as_str().unwrap().to_string();
        let (status, created) = send!(
            app,
            TestRequest::post().uri("/api/tasks").set_json(json!([
                { "title": "Learn React", "day": day_id },
                { "title": "Two Sum", "day": day_id }
            ]))
        );
        assert_eq!(status, StatusCode::CREATED);
        let tasks = created["data"].as_array().unwrap();
        assert_eq!(tasks[0]["order"], 1);
        assert_eq!(tasks[1]["order"], 2);
        assert_eq!(tasks[0]["status"], "not_started");
        let first = tasks[0]["_id"].as_str().unwrap().to_string();

        let (status, _) = send!(
            app,
            TestRequest::put()
                .uri(&format!("/api/tasks/{first}"))
                .set_json(json!({ "status": "completed" }))
        );
        assert_eq!(status, StatusCode::OK);
        let (_, fetched) = send!(app, TestRequest::get().uri(&format!("/api/tasks/{first}")));
        assert_eq!(fetched["data"]["status"], "completed");

        let (status, deleted) = send!(app, TestRequest::delete().uri(&format!("/api/tasks/{first}")));
        assert_eq!(status, StatusCode::OK);
        assert!(deleted["data"].is_null());

        let (_, day) = send!(app, TestRequest::get().uri(&format!("/api/days/{day_id}")));
        assert_eq!(day["data"]["tasks"].as_array().unwrap().len(), 1);
        assert_eq!(day["data"]["tasks"][0]["title"], "Two Sum");

        let (status, gone) = send!(app, TestRequest::get().uri(&format!("/api/tasks/{first}")));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(gone["success"], false);
        assert_eq!(gone["message"], "Task not found");

        let (_, days) = send!(app, TestRequest::get().uri("/api/days"));
        let titles: Vec<&str> = days["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["Day 1", "Day 2"]);
    }

    #[actix_web::test]
    async fn blank_day_title_is_bad_request() {
        let app = app!();
        let (status, body) = send!(app, TestRequest::post().uri("/api/days").set_json(json!({ "title": "  " })));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["data"].is_null());
        assert_eq!(body["message"], "Title is required");

        let (_, days) = send!(app, TestRequest::get().uri("/api/days"));
        assert!(days["data"].as_array().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn single_task_body_returns_single_task() {
        let app = app!();
        let (status, body) = send!(
            app,
            TestRequest::post()
                .uri("/api/tasks")
                .set_json(json!({ "title": "  Event Loop ", "topic": "JavaScript" }))
        );
        assert_eq!(status, StatusCode::CREATED);
        assert!(body["data"].is_object());
        assert_eq!(body["data"]["title"], "Event Loop");
        assert_eq!(body["data"]["description"], "");
    }

    #[actix_web::test]
    async fn task_creation_rejects_bad_batches() {
        let app = app!();
        let (status, body) = send!(app, TestRequest::post().uri("/api/tasks").set_json(json!([])));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "No tasks provided");

        let (status, body) = send!(
            app,
            TestRequest::post()
                .uri("/api/tasks")
                .set_json(json!([{ "title": "ok" }, { "description": "no title" }]))
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Every task must have a title");

        let (status, _) = send!(
            app,
            TestRequest::post()
                .uri("/api/tasks")
                .set_json(json!({ "title": "x", "day": "000000000000000000000000" }))
        );
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, list) = send!(app, TestRequest::get().uri("/api/tasks"));
        assert_eq!(list["data"]["total"], 0);
    }

    #[actix_web::test]
    async fn list_tasks_filters_and_pages() {
        let app = app!();
        let (_, day) = send!(app, TestRequest::post().uri("/api/days").set_json(json!({ "title": "Day 1" })));
        let day_id = day["data"]["_id"].as_str().unwrap().to_string();
        send!(
            app,
            TestRequest::post().uri("/api/tasks").set_json(json!([
                { "title": "Learn React", "topic": "React", "day": day_id },
                { "title": "Event Loop", "topic": "JavaScript", "day": day_id },
                { "title": "Closures", "topic": "javascript", "day": day_id }
            ]))
        );
        send!(
            app,
            TestRequest::post()
                .uri("/api/tasks")
                .set_json(json!({ "title": "Loose", "topic": "TypeScript" }))
        );

        let (status, body) = send!(app, TestRequest::get().uri("/api/tasks?topic=script"));
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total"], 3);
        assert_eq!(body["data"]["page"], 1);
        assert_eq!(body["data"]["limit"], 20);

        let uri = format!("/api/tasks?dayId={day_id}&topic=SCRIPT&page=2&limit=1");
        let (_, body) = send!(app, TestRequest::get().uri(&uri));
        assert_eq!(body["data"]["total"], 2);
        let tasks = body["data"]["tasks"].as_array().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0]["title"], "Closures");

        let (_, body) = send!(app, TestRequest::get().uri("/api/tasks?page=abc&limit=1000"));
        assert_eq!(body["data"]["page"], 1);
        assert_eq!(body["data"]["limit"], 100);

        let (status, body) =
            send!(app, TestRequest::get().uri("/api/tasks?page=9223372036854775807&limit=100"));
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total"], 4);
        assert!(body["data"]["tasks"].as_array().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn update_rejects_unknown_status_and_missing_task() {
        let app = app!();
        let (_, created) = send!(app, TestRequest::post().uri("/api/tasks").set_json(json!({ "title": "a" })));
        let id = created["data"]["_id"].as_str().unwrap().to_string();

        let (status, body) = send!(
            app,
            TestRequest::put()
                .uri(&format!("/api/tasks/{id}"))
                .set_json(json!({ "status": "done" }))
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, _) = send!(
            app,
            TestRequest::put()
                .uri("/api/tasks/missing")
                .set_json(json!({ "status": "started" }))
        );
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send!(app, TestRequest::delete().uri("/api/tasks/missing"));
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send!(app, TestRequest::post().uri(&format!("/api/tasks/{id}/advance")));
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "started");
    }

    #[actix_web::test]
    async fn malformed_json_gets_envelope() {
        let app = app!();
        let req = TestRequest::post()
            .uri("/api/days")
            .insert_header((http::header::CONTENT_TYPE, "application/json"))
            .set_payload("{ not json");
        let (status, body) = send!(app, req);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().starts_with("Invalid request body"));
    }

    #[actix_web::test]
    async fn answers_upsert_fetch_and_delete() {
        let app = app!();
        let (_, created) = send!(app, TestRequest::post().uri("/api/tasks").set_json(json!({ "title": "a" })));
        let task_id = created["data"]["_id"].as_str().unwrap().to_string();

        let (status, body) = send!(
            app,
            TestRequest::post()
                .uri("/api/answers")
                .set_json(json!({ "task": task_id, "userId": "u1" }))
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "task, userId, and content are required");

        let (_, first) = send!(
            app,
            TestRequest::post()
                .uri("/api/answers")
                .set_json(json!({ "task": task_id, "userId": "u1", "content": "# draft" }))
        );
        let (status, second) = send!(
            app,
            TestRequest::post()
                .uri("/api/answers")
                .set_json(json!({ "task": task_id, "userId": "u1", "content": "# final" }))
        );
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["data"]["_id"], second["data"]["_id"]);
        assert_eq!(second["data"]["userId"], "u1");

        let uri = format!("/api/answers?taskId={task_id}&userId=u1");
        let (_, fetched) = send!(app, TestRequest::get().uri(&uri));
        assert_eq!(fetched["data"]["content"], "# final");

        let uri = format!("/api/answers?taskId={task_id}&userId=u2");
        let (status, absent) = send!(app, TestRequest::get().uri(&uri));
        assert_eq!(status, StatusCode::OK);
        assert_eq!(absent["success"], true);
        assert!(absent["data"].is_null());

        let (status, _) = send!(app, TestRequest::get().uri("/api/answers?userId=u1"));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let answer_id = second["data"]["_id"].as_str().unwrap().to_string();
        let (status, _) = send!(app, TestRequest::delete().uri(&format!("/api/answers/{answer_id}")));
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send!(app, TestRequest::delete().uri(&format!("/api/answers/{answer_id}")));
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn seed_is_idempotent() {
        let app = app!();
        let (_, body) = send!(app, TestRequest::get().uri("/api/seed"));
        assert_eq!(body["message"], "Seeded successfully");
        let (_, body) = send!(app, TestRequest::get().uri("/api/seed"));
        assert_eq!(body["message"], "Data already exists");

        let (_, days) = send!(app, TestRequest::get().uri("/api/days"));
        assert_eq!(days["data"].as_array().unwrap().len(), 3);
    }

    #[actix_web::test]
    async fn preflight_is_permissive() {
        let app = init_service(
            App::new()
                .wrap(cors(None))
                .app_data(state())
                .configure(routes),
        )
        .await;
        let req = TestRequest::default()
            .method(http::Method::OPTIONS)
            .uri("/api/tasks/abc")
            .insert_header((http::header::ORIGIN, "http://localhost:3000"))
            .insert_header((http::header::ACCESS_CONTROL_REQUEST_METHOD, "DELETE"))
            .to_request();
        let resp = call_service(&app, req).await;
        assert!(resp.status().is_success());
        let headers = resp.headers();
        assert_eq!(
            headers.get(http::header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
        let methods = headers
            .get(http::header::ACCESS_CONTROL_ALLOW_METHODS)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(methods.contains("DELETE"));
    }
}
