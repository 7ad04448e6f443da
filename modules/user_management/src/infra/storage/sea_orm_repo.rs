//! SeaORM-backed repository implementation for the domain port.
//!
//! Generic over `C: ConnectionTrait`, so it can be built with a
//! `DatabaseConnection` or a transaction.

use anyhow::Context;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::contract::model::{NewUser, User, UserId};
use crate::domain::repo::UsersRepository;
use crate::infra::storage::entity::{ActiveModel as UserAM, Column, Entity as UserEntity};

pub struct SeaOrmUsersRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    conn: C,
}

impl<C> SeaOrmUsersRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

#[async_trait::async_trait]
impl<C> UsersRepository for SeaOrmUsersRepository<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn find_all(&self) -> anyhow::Result<Vec<User>> {
        let rows = UserEntity::find()
            .order_by_asc(Column::Id)
            .all(&self.conn)
            .await
            .context("find_all failed")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_by_active(&self, is_active: bool) -> anyhow::Result<Vec<User>> {
        let rows = UserEntity::find()
            .filter(Column::IsActive.eq(is_active))
            .order_by_asc(Column::Id)
            .all(&self.conn)
            .await
            .context("find_by_active failed")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_by_id(&self, id: UserId) -> anyhow::Result<Option<User>> {
        let found = UserEntity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("find_by_id failed")?;
        Ok(found.map(Into::into))
    }

    async fn insert(&self, u: NewUser) -> anyhow::Result<User> {
        let m = UserAM {
            id: NotSet,
            forename: Set(u.forename),
            surname: Set(u.surname),
            email: Set(u.email),
            date_of_birth: Set(u.date_of_birth),
            is_active: Set(u.is_active),
        };
        let saved = m.insert(&self.conn).await.context("insert failed")?;
        Ok(saved.into())
    }

    async fn update(&self, u: &User) -> anyhow::Result<bool> {
        let m = UserAM {
            id: NotSet,
            forename: Set(u.forename.clone()),
            surname: Set(u.surname.clone()),
            email: Set(u.email.clone()),
            date_of_birth: Set(u.date_of_birth),
            is_active: Set(u.is_active),
        };
        let res = UserEntity::update_many()
            .set(m)
            .filter(Column::Id.eq(u.id))
            .exec(&self.conn)
            .await
            .context("update failed")?;
        Ok(res.rows_affected > 0)
    }

    async fn delete(&self, id: UserId) -> anyhow::Result<bool> {
        let res = UserEntity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("delete failed")?;
        Ok(res.rows_affected > 0)
    }
}
