use std::sync::Arc;

use async_trait::async_trait;

use crate::contract::{
    client::UserManagementApi,
    error::UserManagementError,
    model::{LogEntry, LogEvent, LogFilter, NewUser, User, UserId},
};
use crate::domain::{activity::ActivityLogService, error::DomainError, service::UserService};

/// Local implementation of the UserManagementApi trait that delegates to the domain services
pub struct UserManagementLocalClient {
    users: Arc<UserService>,
    activity: Arc<ActivityLogService>,
}

impl UserManagementLocalClient {
    pub fn new(users: Arc<UserService>, activity: Arc<ActivityLogService>) -> Self {
        Self { users, activity }
    }
}

#[async_trait]
impl UserManagementApi for UserManagementLocalClient {
    async fn list_users(&self, is_active: Option<bool>) -> Result<Vec<User>, UserManagementError> {
        let res = match is_active {
            Some(flag) => self.users.filter_by_active(flag).await,
            None => self.users.get_all().await,
        };
        res.map_err(UserManagementError::from)
    }

    async fn get_user(&self, id: UserId) -> Result<User, UserManagementError> {
        self.users
            .get_by_id(id)
            .await?
            .ok_or_else(|| UserManagementError::not_found(id))
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, UserManagementError> {
        Ok(self.users.create(new_user).await?)
    }

    async fn update_user(&self, user: User) -> Result<User, UserManagementError> {
        Ok(self.users.update(user).await?)
    }

    async fn delete_user(&self, id: UserId) -> Result<(), UserManagementError> {
        if self.users.delete(id).await? {
            Ok(())
        } else {
            Err(UserManagementError::not_found(id))
        }
    }

    fn user_log(&self, id: UserId) -> Vec<LogEvent> {
        self.activity.get_user_log(id)
    }

    fn filter_log(&self, filter: &LogFilter) -> Vec<LogEntry> {
        self.activity.filter(filter)
    }
}

impl From<DomainError> for UserManagementError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::UserNotFound { id } => Self::not_found(id),
            DomainError::Validation { .. } => Self::validation(e.to_string()),
            DomainError::Database { .. } => {
                tracing::error!(error = %e, "Database error in local client");
                Self::internal()
            }
        }
    }
}
