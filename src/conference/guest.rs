use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::time};

use crate::{error::ApiError, util::serialize_datetime};

/// A guest speaker or chief guest shown on the site
#[derive(PartialEq, Debug, FromRow, Serialize, Clone)]
pub struct Guest {
    pub id: i64,
    pub name: String,
    pub designation: Option<String>,
    pub description: Option<String>,
    pub contact: Option<String>,
    pub image: Option<String>,

    #[serde(serialize_with = "serialize_datetime")]
    pub created_at: time::OffsetDateTime,
}

#[derive(PartialEq, Debug, Default, Clone, Deserialize)]
pub struct GuestInput {
    pub name: String,
    pub designation: Option<String>,
    pub description: Option<String>,
    pub contact: Option<String>,
}

impl GuestInput {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::invalid("name", "name is required"));
        }
        Ok(())
    }
}
