//! Shared fixtures: every test gets its own in-memory SQLite database.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{body::Body, http::Request, response::Response, Router};
use db::{ConnectOpts, DbHandle};
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tower::ServiceExt;

use user_management::domain::activity::ActivityLogService;
use user_management::domain::service::{ServiceConfig, UserService};
use user_management::infra::activity::InMemoryLogSink;
use user_management::infra::storage::migrations::Migrator;
use user_management::infra::storage::seed::seed_sample_users;
use user_management::infra::storage::SeaOrmUsersRepository;
use user_management::{UserManagement, UserManagementConfig};

/// Fresh in-memory database with migrations applied.
pub async fn create_test_db() -> DatabaseConnection {
    let db = DbHandle::connect("sqlite::memory:", ConnectOpts::default())
        .await
        .expect("Failed to connect to test database");
    let conn = db.sea();
    Migrator::up(&conn, None)
        .await
        .expect("Failed to run migrations");
    conn
}

pub async fn seeded_db() -> DatabaseConnection {
    let conn = create_test_db().await;
    seed_sample_users(&conn).await.expect("seed failed");
    conn
}

pub fn user_service(conn: DatabaseConnection) -> Arc<UserService> {
    Arc::new(UserService::new(
        Arc::new(SeaOrmUsersRepository::new(conn)),
        ServiceConfig::default(),
    ))
}

pub fn activity_service() -> Arc<ActivityLogService> {
    Arc::new(ActivityLogService::new(Arc::new(
        InMemoryLogSink::unbounded(),
    )))
}

/// Module initialized the same way the server does it (sample roster included).
pub async fn seeded_module() -> UserManagement {
    let conn = create_test_db().await;
    let module = UserManagement::new();
    module.migrate(&conn).await.expect("migrate");
    module
        .init(conn, UserManagementConfig::default())
        .await
        .expect("init");
    module
}

/// Router plus direct handles to the services behind it.
pub struct TestApp {
    pub router: Router,
    pub users: Arc<UserService>,
    pub activity: Arc<ActivityLogService>,
}

pub async fn test_app() -> TestApp {
    let users = user_service(seeded_db().await);
    let activity = activity_service();
    let router = user_management::api::rest::routes::register_routes(
        Router::new(),
        users.clone(),
        activity.clone(),
    );
    TestApp {
        router,
        users,
        activity,
    }
}

impl TestApp {
    pub async fn send(&self, req: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(req)
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn send_json(&self, method: &str, uri: &str, body: serde_json::Value) -> Response {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(req).await
    }

    pub fn messages(&self) -> Vec<String> {
        self.activity
            .get_full_log()
            .into_iter()
            .map(|e| e.message)
            .collect()
    }
}

pub async fn body_json<T: serde::de::DeserializeOwned>(resp: Response) -> T {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}
