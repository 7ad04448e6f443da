use axum::extract::rejection::JsonRejection;
use modkit::{FieldError, Problem, ProblemResponse};

use crate::domain::error::DomainError;
use crate::errors::{INTERNAL_DB, USERS_NOT_FOUND, USERS_VALIDATION};

/// Map domain error to RFC9457 ProblemResponse
pub fn map_domain_error(e: &DomainError, instance: &str) -> ProblemResponse {
    match e {
        DomainError::UserNotFound { id } => {
            USERS_NOT_FOUND.to_response(format!("User with id {id} was not found"), instance)
        }
        DomainError::Validation { violations } => {
            let errors = violations
                .iter()
                .map(|v| FieldError::new(format!("/{}", v.field), v.message.clone()))
                .collect();
            let mut resp = USERS_VALIDATION.to_response(e.to_string(), instance);
            resp.0 = resp.0.with_errors(errors);
            resp
        }
        DomainError::Database { .. } => {
            // Log the internal error details but don't expose them to the client
            tracing::error!(error = ?e, "Database error occurred");
            INTERNAL_DB.to_response("An internal database error occurred", instance)
        }
    }
}

/// `"<prefix> target type: <path>: <message>"` → (`/<path>`, message).
fn rejected_field(detail: &str) -> Option<(String, String)> {
    let (_, rest) = detail.split_once("target type: ")?;
    let (path, message) = rest.split_once(": ")?;
    if path.is_empty() || path.contains(char::is_whitespace) {
        return None;
    }
    Some((format!("/{}", path.replace('.', "/")), message.to_string()))
}

/// Map an unreadable JSON body. Malformed or mistyped content is a 400
/// validation problem; other rejections keep their own status.
pub fn map_json_rejection(rejection: &JsonRejection, instance: &str) -> ProblemResponse {
    let detail = rejection.body_text();
    match rejection {
        JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_) => {
            let mut resp = USERS_VALIDATION.to_response(detail.clone(), instance);
            if let Some((pointer, message)) = rejected_field(&detail) {
                resp.0 = resp.0.with_errors(vec![FieldError::new(pointer, message)]);
            }
            resp
        }
        other => ProblemResponse(
            Problem::new(other.status(), "Unsupported request body", detail)
                .with_instance(instance),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::FieldViolation;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[test]
    fn not_found_maps_to_404() {
        let resp = map_domain_error(&DomainError::user_not_found(42), "/users/42");
        assert_eq!(resp.0.code, "USERS_NOT_FOUND");
        assert_eq!(resp.0.instance, "/users/42");
        assert_eq!(resp.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_lists_field_pointers() {
        let err = DomainError::validation(vec![
            FieldViolation::new("forename", "is required"),
            FieldViolation::new("dateOfBirth", "is invalid"),
        ]);
        let resp = map_domain_error(&err, "/users");
        let errors = resp.0.errors.clone().unwrap_or_default();
        let pointers: Vec<_> = errors.iter().map(|e| e.pointer.as_str()).collect();
        assert_eq!(pointers, vec!["/forename", "/dateOfBirth"]);
        assert_eq!(resp.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn database_details_are_hidden() {
        let resp = map_domain_error(&DomainError::database("disk I/O error"), "/users");
        assert_eq!(resp.0.code, "INTERNAL_DB");
        assert!(!resp.0.detail.contains("disk"));
    }

    #[test]
    fn rejected_field_reads_the_serde_path() {
        let detail = "Failed to deserialize the JSON body into the target type: \
                      isActive: invalid type: string \"yes\", expected a boolean at line 1 column 20";
        let (pointer, message) = rejected_field(detail).unwrap();
        assert_eq!(pointer, "/isActive");
        assert!(message.starts_with("invalid type"));

        let root = "Failed to deserialize the JSON body into the target type: \
                    invalid type: integer `5`, expected struct UserForm";
        assert_eq!(rejected_field(root), None);
        assert_eq!(rejected_field("Expected request with `Content-Type: application/json`"), None);
    }
}
