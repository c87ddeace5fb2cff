use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Identity {
    pub id: Uuid,                   // unique user ID
    pub username: String,           // unique, never changes
    #[serde(skip_serializing)]
    pub password_hash: String,      // Argon2 hash, not exposed in JSON
    pub dob: Date,                  // date of birth
    pub disabled: bool,             // deactivated accounts cannot authenticate
    pub created_at: OffsetDateTime, // creation timestamp
}

impl Identity {
    pub fn is_enabled(&self) -> bool {
        !self.disabled
    }
}

/// Outcome of removing an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Deleted,
    /// The user still owns posts or comments, so the row was kept and disabled.
    Deactivated,
}
