use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::dto::ErrorResponse;
use crate::error::SyncError;

#[derive(Debug)]
pub struct AppError(pub SyncError);

impl AppError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            SyncError::DeviceNotFound(_) | SyncError::MissingSettings { .. } => StatusCode::NOT_FOUND,
            SyncError::Validation(_) | SyncError::Malformed(_) | SyncError::NothingStored { .. } => {
                StatusCode::BAD_REQUEST
            }
            SyncError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.0.to_string();
        let errors = match self.0 {
            SyncError::NothingStored { errors } => Some(errors),
            _ => None,
        };
        (status, Json(ErrorResponse { error, errors })).into_response()
    }
}

impl From<SyncError> for AppError {
    fn from(e: SyncError) -> Self {
        Self(e)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        Self(SyncError::Storage(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_error_taxonomy() {
        assert_eq!(AppError(SyncError::DeviceNotFound("x".into())).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError(SyncError::MissingSettings { serial_number: "s".into() }).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(AppError(SyncError::Malformed("m".into())).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError(SyncError::NothingStored { errors: vec![] }).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError(SyncError::Storage(sqlx::Error::PoolTimedOut)).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
