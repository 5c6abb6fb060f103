use serde::Serialize;
use thiserror::Error;
use warp::http::StatusCode;

/// Errors surfaced to API clients.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("Duplicate value: {0}")]
    Duplicate(String),

    #[error("Unknown reference: {0}")]
    UnknownReference(String),

    #[error("Malformed upload: {0}")]
    Upload(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Internal(anyhow::Error),
}

/// Json body of every failed request
#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub message: String,
    pub error: String,
}

impl ApiError {
    pub fn invalid(field: &str, reason: impl ToString) -> Self {
        ApiError::InvalidField {
            field: field.to_owned(),
            reason: reason.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidField { .. }
            | ApiError::UnknownReference(_)
            | ApiError::Upload(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Duplicate(_) => StatusCode::CONFLICT,
            ApiError::Database(_) | ApiError::Io(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn body(&self, message: &str) -> ErrorBody {
        ErrorBody {
            message: message.to_owned(),
            error: self.to_string(),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Record".to_owned()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                ApiError::Duplicate(db_err.message().to_owned())
            }
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                ApiError::UnknownReference(db_err.message().to_owned())
            }
            _ => ApiError::Database(err),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<ApiError>() {
            Ok(api) => return api,
            Err(err) => err,
        };
        let err = match err.downcast::<sqlx::Error>() {
            Ok(sql) => return sql.into(),
            Err(err) => err,
        };
        match err.downcast::<std::io::Error>() {
            Ok(io) => ApiError::Io(io),
            Err(err) => ApiError::Internal(err),
        }
    }
}

impl From<warp::Error> for ApiError {
    fn from(err: warp::Error) -> Self {
        ApiError::Upload(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::invalid("schedule", "expected array").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NotFound("Event".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Duplicate("email".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::Internal(anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_anyhow_downcast() {
        let wrapped: anyhow::Error = ApiError::NotFound("Guest".into()).into();
        assert!(matches!(ApiError::from(wrapped), ApiError::NotFound(_)));

        let wrapped: anyhow::Error = sqlx::Error::RowNotFound.into();
        assert!(matches!(ApiError::from(wrapped), ApiError::NotFound(_)));

        let wrapped = anyhow!("something else");
        assert!(matches!(ApiError::from(wrapped), ApiError::Internal(_)));
    }

    #[test]
    fn test_body_shape() {
        let body = ApiError::invalid("sponsors", "expected array").body("Error updating about");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["message"], "Error updating about");
        assert_eq!(json["error"], "Invalid field 'sponsors': expected array");
    }
}
