use std::sync::Arc;

use tracing::{debug, info, instrument};
use validator::ValidateEmail;

use crate::contract::model::{NewUser, User, UserId};
use crate::domain::error::{DomainError, FieldViolation};
use crate::domain::repo::UsersRepository;

/// Domain service with business rules for the user directory.
/// Depends only on the repository port, not on infra types.
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UsersRepository>,
    config: ServiceConfig,
}

/// Configuration for the domain service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub min_name_length: usize,
    pub max_name_length: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            min_name_length: 3,
            max_name_length: 100,
        }
    }
}

fn store_err(e: anyhow::Error) -> DomainError {
    DomainError::database(format!("{e:#}"))
}

/// Stored text fields never carry surrounding whitespace.
fn tidy(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_owned();
    }
}

impl UserService {
    pub fn new(repo: Arc<dyn UsersRepository>, config: ServiceConfig) -> Self {
        Self { repo, config }
    }

    #[instrument(name = "user_management.service.get_all", skip(self))]
    pub async fn get_all(&self) -> Result<Vec<User>, DomainError> {
        let users = self.repo.find_all().await.map_err(store_err)?;
        debug!("Loaded {} users", users.len());
        Ok(users)
    }

    #[instrument(name = "user_management.service.filter_by_active", skip(self))]
    pub async fn filter_by_active(&self, is_active: bool) -> Result<Vec<User>, DomainError> {
        let users = self
            .repo
            .find_by_active(is_active)
            .await
            .map_err(store_err)?;
        debug!("Loaded {} users", users.len());
        Ok(users)
    }

    #[instrument(name = "user_management.service.get_by_id", skip(self), fields(user_id = id))]
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, DomainError> {
        debug!("Getting user by id");
        let user = self.repo.find_by_id(id).await.map_err(store_err)?;
        if user.is_none() {
            debug!("User not found");
        }
        Ok(user)
    }

    #[instrument(
        name = "user_management.service.create",
        skip(self, new_user),
        fields(email = %new_user.email)
    )]
    pub async fn create(&self, mut new_user: NewUser) -> Result<User, DomainError> {
        info!("Creating new user");

        tidy(&mut new_user.forename);
        tidy(&mut new_user.surname);
        tidy(&mut new_user.email);

        self.validate_fields(
            &new_user.forename,
            &new_user.surname,
            &new_user.email,
        )?;

        let user = self.repo.insert(new_user).await.map_err(store_err)?;

        info!("Successfully created user with id={}", user.id);
        Ok(user)
    }

    #[instrument(name = "user_management.service.update", skip(self, user), fields(user_id = user.id))]
    pub async fn update(&self, mut user: User) -> Result<User, DomainError> {
        info!("Updating user");

        tidy(&mut user.forename);
        tidy(&mut user.surname);
        tidy(&mut user.email);

        self.validate_fields(&user.forename, &user.surname, &user.email)?;

        let updated = self.repo.update(&user).await.map_err(store_err)?;
        if !updated {
            return Err(DomainError::user_not_found(user.id));
        }

        info!("Successfully updated user");
        Ok(user)
    }

    /// Remove the user if present. Deleting an absent id is a no-op.
    #[instrument(name = "user_management.service.delete", skip(self), fields(user_id = id))]
    pub async fn delete(&self, id: UserId) -> Result<bool, DomainError> {
        if self.get_by_id(id).await?.is_none() {
            debug!("Nothing to delete");
            return Ok(false);
        }

        let deleted = self.repo.delete(id).await.map_err(store_err)?;
        if deleted {
            info!("Successfully deleted user");
        }
        Ok(deleted)
    }

    // --- validation helpers ---

    /// Every rule broken by these field values, in form order. Values are
    /// judged as they would be stored, i.e. trimmed.
    pub fn field_violations(&self, forename: &str, surname: &str, email: &str) -> Vec<FieldViolation> {
        let mut violations = Vec::new();
        self.check_name("forename", forename, &mut violations);
        self.check_name("surname", surname, &mut violations);
        check_email(email, &mut violations);
        violations
    }

    fn validate_fields(&self, forename: &str, surname: &str, email: &str) -> Result<(), DomainError> {
        let violations = self.field_violations(forename, surname, email);
        if violations.is_empty() {
            Ok(())
        } else {
            debug!("Rejected {} field(s)", violations.len());
            Err(DomainError::validation(violations))
        }
    }

    fn check_name(&self, field: &'static str, value: &str, out: &mut Vec<FieldViolation>) {
        let len = value.trim().chars().count();
        if len == 0 {
            out.push(FieldViolation::new(field, "is required"));
        } else if len < self.config.min_name_length || len > self.config.max_name_length {
            out.push(FieldViolation::new(
                field,
                format!(
                    "must be between {} and {} characters (got {len})",
                    self.config.min_name_length, self.config.max_name_length
                ),
            ));
        }
    }
}

fn check_email(email: &str, out: &mut Vec<FieldViolation>) {
    let email = email.trim();
    if email.is_empty() {
        out.push(FieldViolation::new("email", "is required"));
    } else if !email.validate_email() {
        out.push(FieldViolation::new("email", "is not a valid email address"));
    }
}
