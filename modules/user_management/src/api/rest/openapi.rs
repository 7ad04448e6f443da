use utoipa::OpenApi;

use crate::api::rest::{dto, handlers};

#[derive(OpenApi)]
#[openapi(
    info(title = "User management", description = "User directory and activity log"),
    paths(
        handlers::list_users,
        handlers::view_user,
        handlers::create_form,
        handlers::create_user,
        handlers::edit_form,
        handlers::edit_user,
        handlers::delete_form,
        handlers::delete_user,
        handlers::list_logs,
        handlers::view_log,
    ),
    components(schemas(
        dto::UserDto,
        dto::UserForm,
        dto::UserFormViewModel,
        dto::UserListViewModel,
        dto::UserLogViewModel,
        dto::LogEntryDto,
        dto::LogListViewModel,
        dto::SelectOption,
        modkit::Problem,
        modkit::FieldError,
    )),
    tags(
        (name = "users", description = "User directory"),
        (name = "logs", description = "Activity log")
    )
)]
pub struct UserManagementApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = UserManagementApiDoc::openapi();
        for path in [
            "/users",
            "/users/{id}",
            "/users/CreateUser",
            "/users/EditUser",
            "/users/Edit/{id}",
            "/users/DeleteUser",
            "/users/Delete/{id}",
            "/logs",
            "/logs/{id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        let schemas = doc.components.expect("components").schemas;
        assert!(schemas.contains_key("UserDto"));
        assert!(schemas.contains_key("Problem"));
    }
}
