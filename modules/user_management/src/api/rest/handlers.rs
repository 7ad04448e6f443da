use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query},
    http::Uri,
    response::{Json, Redirect},
    Extension,
};
use modkit::{see_other, Problem, ProblemResponse};
use tracing::{error, info, warn};

use crate::api::rest::dto::{
    ListUsersQuery, LogEntryDto, LogListViewModel, LogQuery, UserDto, UserForm,
    UserFormViewModel, UserIdQuery, UserListViewModel, UserLogViewModel,
};
use crate::api::rest::error::{map_domain_error, map_json_rejection};
use crate::contract::model::{LogEntry, LogFilter, Severity, User, UserId};
use crate::domain::activity::ActivityLogService;
use crate::domain::error::{DomainError, FieldViolation};
use crate::domain::service::UserService;
use crate::errors::LOGS_NOT_FOUND;

/// Where successful form submissions redirect to.
pub const USERS_PATH: &str = "/users";

fn record_missing(activity: &ActivityLogService, action: &str, id: UserId) {
    activity.record(
        Severity::Info,
        format!("Attempted to {action} User with id = {id}, which could not be found"),
        None,
    );
}

/// A form whose date could not be read is reported together with any other
/// broken field, the same as a form the service rejected.
fn reject_form(
    users: &UserService,
    form: &UserForm,
    date: FieldViolation,
    instance: &str,
) -> ProblemResponse {
    let mut violations = users.field_violations(&form.forename, &form.surname, &form.email);
    violations.push(date);
    let err = DomainError::validation(violations);
    warn!("Rejected user form: {}", err);
    map_domain_error(&err, instance)
}

/// Load a user or produce the 404 problem, recording the failed attempt.
async fn find_user(
    users: &UserService,
    activity: &ActivityLogService,
    id: UserId,
    action: &str,
    instance: &str,
) -> Result<User, ProblemResponse> {
    match users.get_by_id(id).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => {
            record_missing(activity, action, id);
            Err(map_domain_error(&DomainError::user_not_found(id), instance))
        }
        Err(e) => {
            error!("Failed to load user {}: {}", id, e);
            Err(map_domain_error(&e, instance))
        }
    }
}

/// List users, optionally filtered by active state
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "User list", body = UserListViewModel),
        (status = 500, description = "Internal Server Error", body = Problem, content_type = "application/problem+json")
    )
)]
pub async fn list_users(
    Extension(users): Extension<Arc<UserService>>,
    Query(query): Query<ListUsersQuery>,
    uri: Uri,
) -> Result<Json<UserListViewModel>, ProblemResponse> {
    let result = match query.is_active {
        Some(is_active) => users.filter_by_active(is_active).await,
        None => users.get_all().await,
    };

    match result {
        Ok(list) => Ok(Json(UserListViewModel {
            items: list.into_iter().map(UserDto::from).collect(),
        })),
        Err(e) => {
            error!("Failed to list users: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Show a user together with the events recorded for them
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User with activity", body = UserLogViewModel),
        (status = 404, description = "Not Found", body = Problem, content_type = "application/problem+json")
    )
)]
pub async fn view_user(
    Extension(users): Extension<Arc<UserService>>,
    Extension(activity): Extension<Arc<ActivityLogService>>,
    Path(id): Path<UserId>,
    uri: Uri,
) -> Result<Json<UserLogViewModel>, ProblemResponse> {
    let user = find_user(&users, &activity, id, "view", uri.path()).await?;
    activity.record(
        Severity::Info,
        format!("User {} was viewed", user.full_name()),
        Some(&user),
    );

    let user_events = activity
        .filter(&LogFilter {
            user_id: Some(id),
            ..Default::default()
        })
        .into_iter()
        .map(LogEntryDto::from)
        .collect();

    Ok(Json(UserLogViewModel {
        user: user.into(),
        user_events,
    }))
}

/// Empty form for a new user
#[utoipa::path(
    get,
    path = "/users/CreateUser",
    tag = "users",
    responses((status = 200, description = "Empty user form", body = UserFormViewModel))
)]
pub async fn create_form() -> Json<UserFormViewModel> {
    Json(UserFormViewModel::default())
}

/// Create a user; new users are always active
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = UserForm,
    responses(
        (status = 303, description = "Created; redirect to the user list"),
        (status = 400, description = "Validation failed", body = Problem, content_type = "application/problem+json"),
        (status = 500, description = "Internal Server Error", body = Problem, content_type = "application/problem+json")
    )
)]
pub async fn create_user(
    uri: Uri,
    Extension(users): Extension<Arc<UserService>>,
    Extension(activity): Extension<Arc<ActivityLogService>>,
    form: Result<Json<UserForm>, JsonRejection>,
) -> Result<Redirect, ProblemResponse> {
    let Json(form) = form.map_err(|rejection| map_json_rejection(&rejection, uri.path()))?;
    let new_user = form
        .to_new_user()
        .map_err(|date| reject_form(&users, &form, date, uri.path()))?;

    match users.create(new_user).await {
        Ok(user) => {
            activity.record(
                Severity::Info,
                format!("User {} was created", user.full_name()),
                Some(&user),
            );
            Ok(see_other(USERS_PATH))
        }
        Err(e) => {
            warn!("Failed to create user: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Pre-filled form for editing a user
#[utoipa::path(
    get,
    path = "/users/EditUser",
    tag = "users",
    params(UserIdQuery),
    responses(
        (status = 200, description = "User form", body = UserFormViewModel),
        (status = 404, description = "Not Found", body = Problem, content_type = "application/problem+json")
    )
)]
pub async fn edit_form(
    Extension(users): Extension<Arc<UserService>>,
    Extension(activity): Extension<Arc<ActivityLogService>>,
    Query(query): Query<UserIdQuery>,
    uri: Uri,
) -> Result<Json<UserFormViewModel>, ProblemResponse> {
    let user = find_user(&users, &activity, query.id, "update", uri.path()).await?;
    Ok(Json(user.into()))
}

/// Replace every field of an existing user
#[utoipa::path(
    put,
    path = "/users/Edit/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    request_body = UserForm,
    responses(
        (status = 303, description = "Updated; redirect to the user list"),
        (status = 400, description = "Validation failed", body = Problem, content_type = "application/problem+json"),
        (status = 404, description = "Not Found", body = Problem, content_type = "application/problem+json")
    )
)]
pub async fn edit_user(
    uri: Uri,
    Extension(users): Extension<Arc<UserService>>,
    Extension(activity): Extension<Arc<ActivityLogService>>,
    Path(id): Path<UserId>,
    form: Result<Json<UserForm>, JsonRejection>,
) -> Result<Redirect, ProblemResponse> {
    let Json(form) = form.map_err(|rejection| map_json_rejection(&rejection, uri.path()))?;
    let user = form
        .to_user(id)
        .map_err(|date| reject_form(&users, &form, date, uri.path()))?;

    match users.update(user).await {
        Ok(user) => {
            activity.record(
                Severity::Debug,
                format!("User {} was updated", user.full_name()),
                Some(&user),
            );
            Ok(see_other(USERS_PATH))
        }
        Err(e) => {
            if matches!(e, DomainError::UserNotFound { .. }) {
                record_missing(&activity, "update", id);
            }
            warn!("Failed to update user {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Delete confirmation view
#[utoipa::path(
    get,
    path = "/users/DeleteUser",
    tag = "users",
    params(UserIdQuery),
    responses(
        (status = 200, description = "User to delete", body = UserDto),
        (status = 404, description = "Not Found", body = Problem, content_type = "application/problem+json")
    )
)]
pub async fn delete_form(
    Extension(users): Extension<Arc<UserService>>,
    Extension(activity): Extension<Arc<ActivityLogService>>,
    Query(query): Query<UserIdQuery>,
    uri: Uri,
) -> Result<Json<UserDto>, ProblemResponse> {
    let user = find_user(&users, &activity, query.id, "delete", uri.path()).await?;
    Ok(Json(user.into()))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/users/Delete/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 303, description = "Deleted; redirect to the user list"),
        (status = 404, description = "Not Found", body = Problem, content_type = "application/problem+json")
    )
)]
pub async fn delete_user(
    Extension(users): Extension<Arc<UserService>>,
    Extension(activity): Extension<Arc<ActivityLogService>>,
    Path(id): Path<UserId>,
    uri: Uri,
) -> Result<Redirect, ProblemResponse> {
    let user = find_user(&users, &activity, id, "delete", uri.path()).await?;

    match users.delete(id).await {
        Ok(true) => {
            activity.record(
                Severity::Info,
                format!("User {} was deleted", user.full_name()),
                Some(&user),
            );
            Ok(see_other(USERS_PATH))
        }
        Ok(false) => {
            record_missing(&activity, "delete", id);
            Err(map_domain_error(&DomainError::user_not_found(id), uri.path()))
        }
        Err(e) => {
            error!("Failed to delete user {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Browse the activity log
#[utoipa::path(
    get,
    path = "/logs",
    tag = "logs",
    params(LogQuery),
    responses((status = 200, description = "Filtered activity log", body = LogListViewModel))
)]
pub async fn list_logs(
    Extension(activity): Extension<Arc<ActivityLogService>>,
    Query(query): Query<LogQuery>,
) -> Json<LogListViewModel> {
    let filter = query.into_filter();
    info!(?filter, "Browsing activity log");
    Json(activity.browse(&filter).into())
}

/// One activity log entry by its position
#[utoipa::path(
    get,
    path = "/logs/{id}",
    tag = "logs",
    params(("id" = usize, Path, description = "Position in the full log")),
    responses(
        (status = 200, description = "Log entry", body = LogEntryDto),
        (status = 404, description = "Not Found", body = Problem, content_type = "application/problem+json")
    )
)]
pub async fn view_log(
    Extension(activity): Extension<Arc<ActivityLogService>>,
    Path(index): Path<usize>,
    uri: Uri,
) -> Result<Json<LogEntryDto>, ProblemResponse> {
    match activity.get_entry(index) {
        Some(event) => Ok(Json(LogEntry { index, event }.into())),
        None => Err(LOGS_NOT_FOUND.to_response(
            format!("Log entry {index} was not found"),
            uri.path(),
        )),
    }
}
