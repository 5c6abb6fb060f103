use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::time};

use crate::{error::ApiError, util::serialize_datetime};

/// Single conference event (workshop/competition/talk)
#[derive(PartialEq, Debug, FromRow, Serialize, Clone)]
pub struct Event {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,

    /// Public path of the event banner
    pub image: Option<String>,

    /// Free-form date as entered by the organisers
    pub date: Option<String>,
    pub venue: Option<String>,

    #[serde(serialize_with = "serialize_datetime")]
    pub created_at: time::OffsetDateTime,
}

/// Fields accepted when creating or replacing an event
#[derive(PartialEq, Debug, Default, Clone, Deserialize)]
pub struct EventInput {
    pub name: String,
    pub description: Option<String>,
    pub date: Option<String>,
    pub venue: Option<String>,
}

impl EventInput {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::invalid("name", "name is required"));
        }
        Ok(())
    }
}

/// The part of an event embedded in participant listings
#[derive(PartialEq, Eq, Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct EventSummary {
    pub id: i64,
    pub name: String,
}
