use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i32,                      // generated by the store
    pub email: String,                // unique across users
    #[serde(skip_serializing)]
    pub password: String,             // stored as given, not exposed in JSON
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,   // set on insert
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,   // bumped on every update
}
