use std::sync::Arc;

use axum::routing::{delete, get, put};
use axum::{Extension, Router};

use crate::api::rest::handlers;
use crate::domain::activity::ActivityLogService;
use crate::domain::service::UserService;

/// Mount the user and activity-log endpoints onto `router`.
pub fn register_routes(
    router: Router,
    users: Arc<UserService>,
    activity: Arc<ActivityLogService>,
) -> Router {
    let module = Router::new()
        .route(
            "/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route("/users/CreateUser", get(handlers::create_form))
        .route("/users/EditUser", get(handlers::edit_form))
        .route("/users/DeleteUser", get(handlers::delete_form))
        .route("/users/Edit/{id}", put(handlers::edit_user))
        .route("/users/Delete/{id}", delete(handlers::delete_user))
        .route("/users/{id}", get(handlers::view_user))
        .route("/logs", get(handlers::list_logs))
        .route("/logs/{id}", get(handlers::view_log))
        .layer(Extension(users))
        .layer(Extension(activity));

    tracing::debug!("Registered user_management routes");
    router.merge(module)
}
