use async_trait::async_trait;

use crate::contract::error::UserManagementError;
use crate::contract::model::{LogEntry, LogEvent, LogFilter, NewUser, User, UserId};

/// Public API of the user_management module for in-process consumers
#[async_trait]
pub trait UserManagementApi: Send + Sync {
    /// List users, optionally keeping only those with the given active flag
    async fn list_users(&self, is_active: Option<bool>) -> Result<Vec<User>, UserManagementError>;

    /// Get a user by id
    async fn get_user(&self, id: UserId) -> Result<User, UserManagementError>;

    /// Create a new user; the store assigns the id
    async fn create_user(&self, new_user: NewUser) -> Result<User, UserManagementError>;

    /// Replace every field of an existing user
    async fn update_user(&self, user: User) -> Result<User, UserManagementError>;

    /// Delete a user by id
    async fn delete_user(&self, id: UserId) -> Result<(), UserManagementError>;

    /// Events associated with a user, in recording order
    fn user_log(&self, id: UserId) -> Vec<LogEvent>;

    /// Filtered view of the activity log
    fn filter_log(&self, filter: &LogFilter) -> Vec<LogEntry>;
}
