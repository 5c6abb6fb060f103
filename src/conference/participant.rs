use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::time};

use crate::{conference::event::EventSummary, error::ApiError, util::serialize_datetime};

/// Logistics approval state for accommodation and travel.
///
/// No transitions are enforced; any value can be set from any other.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Confirmed,
    Rejected,
}

/// A registered conference participant
#[derive(PartialEq, Debug, FromRow, Clone, Serialize)]
pub struct Participant {
    pub id: i64,
    pub name: String,

    /// Unique, compared case-insensitively
    pub email: String,
    pub phone: Option<String>,
    pub college: Option<String>,
    pub department: Option<String>,
    pub year: Option<String>,
    pub social_link: Option<String>,
    pub accommodation_status: ApprovalStatus,
    pub travel_status: ApprovalStatus,

    /// Unique identifier handed out to the participant
    pub registration_id: String,

    #[sqlx(skip)]
    pub events: Vec<EventSummary>,

    #[serde(serialize_with = "serialize_datetime")]
    pub created_at: time::OffsetDateTime,
}

/// Json body for creating or fully replacing a participant
#[derive(PartialEq, Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ParticipantInput {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub college: Option<String>,
    pub department: Option<String>,
    pub year: Option<String>,
    pub social_link: Option<String>,
    pub accommodation_status: ApprovalStatus,
    pub travel_status: ApprovalStatus,
    pub registration_id: Option<String>,

    /// Ids of the events this participant is registered for
    pub events: Vec<i64>,
}

impl ParticipantInput {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::invalid("name", "name is required"));
        }
        if self.email.trim().is_empty() {
            return Err(ApiError::invalid("email", "email is required"));
        }
        if !self.email.contains('@') {
            return Err(ApiError::invalid("email", "not a valid email address"));
        }
        if let Some(reg) = &self.registration_id {
            if reg.trim().is_empty() {
                return Err(ApiError::invalid(
                    "registration_id",
                    "registration id cannot be blank",
                ));
            }
        }
        Ok(())
    }

    /// Event ids with duplicates removed, keeping first occurrence order
    pub fn event_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = Vec::with_capacity(self.events.len());
        for id in &self.events {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }
        ids
    }
}

/// Creates a new registration id of the form `GV-XXXXXXXX`.
pub fn generate_registration_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(|c| (c as char).to_ascii_uppercase())
        .collect();
    format!("GV-{}", suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_json() {
        assert_eq!(
            serde_json::to_string(&ApprovalStatus::Confirmed).unwrap(),
            r#""confirmed""#
        );
        assert!(serde_json::from_str::<ApprovalStatus>(r#""approved""#).is_err());
    }

    #[test]
    fn test_input_defaults() {
        let input: ParticipantInput =
            serde_json::from_str(r#"{"name": "Asha", "email": "asha@example.com"}"#).unwrap();
        assert_eq!(input.accommodation_status, ApprovalStatus::Pending);
        assert_eq!(input.travel_status, ApprovalStatus::Pending);
        assert!(input.events.is_empty());
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let mut input = ParticipantInput {
            name: "Asha".to_owned(),
            email: "asha".to_owned(),
            ..Default::default()
        };
        assert!(input.validate().is_err());

        input.email = "asha@example.com".to_owned();
        input.registration_id = Some(" ".to_owned());
        assert!(input.validate().is_err());

        input.registration_id = None;
        input.name = String::new();
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_event_ids_dedup() {
        let input = ParticipantInput {
            events: vec![3, 1, 3, 2, 1],
            ..Default::default()
        };
        assert_eq!(input.event_ids(), vec![3, 1, 2]);
    }

    #[test]
    fn test_registration_id_format() {
        let id = generate_registration_id();
        assert_eq!(id.len(), 11);
        assert!(id.starts_with("GV-"));
        assert!(id[3..].chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }
}
