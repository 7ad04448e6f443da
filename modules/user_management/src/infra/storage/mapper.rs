use crate::contract::model::User;
use crate::infra::storage::entity::Model as UserEntity;

impl From<UserEntity> for User {
    fn from(e: UserEntity) -> Self {
        Self {
            id: e.id,
            forename: e.forename,
            surname: e.surname,
            email: e.email,
            date_of_birth: e.date_of_birth,
            is_active: e.is_active,
        }
    }
}
