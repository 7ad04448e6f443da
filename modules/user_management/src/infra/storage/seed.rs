//! Sample roster written into an empty `users` table at start-up.

use anyhow::Context;
use chrono::NaiveDate;
use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait, Set};

use crate::infra::storage::entity::{ActiveModel as UserAM, Entity as UserEntity};

const SAMPLE_USERS: [(i64, &str, &str, &str, (i32, u32, u32), bool); 11] = [
    (1, "Peter", "Loew", "ploew@example.com", (1991, 3, 14), true),
    (2, "Benjamin Franklin", "Gates", "bfgates@example.com", (1971, 7, 24), true),
    (3, "Castor", "Troy", "ctroy@example.com", (1956, 11, 11), false),
    (4, "Memphis", "Raines", "mraines@example.com", (1975, 10, 25), true),
    (5, "Stanley", "Goodspeed", "sgodspeed@example.com", (1999, 1, 5), true),
    (6, "H.I.", "McDunnough", "himcdunnough@example.com", (1983, 7, 22), true),
    (7, "Cameron", "Poe", "cpoe@example.com", (2008, 12, 19), false),
    (8, "Edward", "Malus", "emalus@example.com", (2010, 4, 8), false),
    (9, "Damon", "Macready", "dmacready@example.com", (1998, 6, 24), false),
    (10, "Johnny", "Blaze", "jblaze@example.com", (2000, 10, 3), true),
    (11, "Robin", "Feld", "rfeld@example.com", (1966, 9, 30), true),
];

/// Insert the sample roster if the table is empty. Returns the number of rows written.
pub async fn seed_sample_users<C: ConnectionTrait>(conn: &C) -> anyhow::Result<u64> {
    let existing = UserEntity::find()
        .count(conn)
        .await
        .context("count users failed")?;
    if existing > 0 {
        tracing::debug!(existing, "users table not empty, skipping seed");
        return Ok(0);
    }

    let rows = SAMPLE_USERS
        .iter()
        .map(|(id, forename, surname, email, (y, m, d), active)| UserAM {
            id: Set(*id),
            forename: Set((*forename).to_string()),
            surname: Set((*surname).to_string()),
            email: Set((*email).to_string()),
            date_of_birth: Set(NaiveDate::from_ymd_opt(*y, *m, *d)),
            is_active: Set(*active),
        });

    UserEntity::insert_many(rows)
        .exec(conn)
        .await
        .context("seed insert failed")?;

    let count = SAMPLE_USERS.len() as u64;
    tracing::info!(count, "seeded sample users");
    Ok(count)
}
