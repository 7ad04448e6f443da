use async_trait::async_trait;

use crate::contract::model::{NewUser, User, UserId};

/// Port for the domain layer: persistence operations the domain needs.
#[async_trait]
pub trait UsersRepository: Send + Sync {
    /// All users in ascending id order.
    async fn find_all(&self) -> anyhow::Result<Vec<User>>;
    /// Users whose active flag equals `is_active`, in ascending id order.
    async fn find_by_active(&self, is_active: bool) -> anyhow::Result<Vec<User>>;
    async fn find_by_id(&self, id: UserId) -> anyhow::Result<Option<User>>;
    /// Persist a new record; the store assigns the id.
    async fn insert(&self, new_user: NewUser) -> anyhow::Result<User>;
    /// Full replacement of the record with `user.id`. Returns false if no such record.
    async fn update(&self, user: &User) -> anyhow::Result<bool>;
    /// Delete by id. Returns true if a row was deleted.
    async fn delete(&self, id: UserId) -> anyhow::Result<bool>;
}
