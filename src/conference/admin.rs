use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::time};

use crate::{error::ApiError, util::serialize_datetime};

/// An organiser account allowed to manage the site
#[derive(PartialEq, Debug, FromRow, Serialize, Clone)]
pub struct Admin {
    pub id: i64,
    pub name: String,

    /// Unique, compared case-insensitively
    pub email: String,

    #[serde(serialize_with = "serialize_datetime")]
    pub created_at: time::OffsetDateTime,
}

#[derive(PartialEq, Debug, Default, Clone, Deserialize)]
pub struct AdminInput {
    pub name: String,
    pub email: String,
}

impl AdminInput {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::invalid("name", "name is required"));
        }
        if !self.email.contains('@') {
            return Err(ApiError::invalid("email", "not a valid email address"));
        }
        Ok(())
    }
}
