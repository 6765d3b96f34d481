use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::{
    application::{countdowns::CountdownError, task_service::TaskServiceError},
    domain::{error::StoreError, task::TaskError},
};

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(skip, default = "internal")]
    pub status: StatusCode,
    pub message: String,
}

fn internal() -> StatusCode { StatusCode::INTERNAL_SERVER_ERROR }

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self { Self::new(StatusCode::BAD_REQUEST, message) }

    pub fn not_found() -> Self { Self::new(StatusCode::NOT_FOUND, "Not found") }

    pub fn conflict(message: impl Into<String>) -> Self { Self::new(StatusCode::CONFLICT, message) }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response { (self.status, axum::Json(self)).into_response() }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let status = match err {
            StoreError::Unconfigured => StatusCode::SERVICE_UNAVAILABLE,
            StoreError::NotFound => StatusCode::NOT_FOUND,
            StoreError::Failed(_) => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, err.to_string())
    }
}

impl From<TaskError> for ApiError {
    fn from(err: TaskError) -> Self {
        let status = match err {
            TaskError::NoNextStatus => StatusCode::CONFLICT,
            _ => StatusCode::BAD_REQUEST,
        };
        Self::new(status, err.to_string())
    }
}

impl From<TaskServiceError> for ApiError {
    fn from(err: TaskServiceError) -> Self {
        match err {
            TaskServiceError::Invalid(err) => err.into(),
            TaskServiceError::Store(err) => err.into(),
        }
    }
}

impl From<CountdownError> for ApiError {
    fn from(err: CountdownError) -> Self {
        match err {
            CountdownError::Storage(io) => {
                tracing::warn!(error = %io, "countdown storage write failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, format!("could not save countdowns: {io}"))
            }
            other => Self::bad_request(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_gateway_statuses() {
        assert_eq!(ApiError::from(StoreError::Unconfigured).status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(ApiError::from(StoreError::failed("disk full")).status, StatusCode::BAD_GATEWAY);
        assert_eq!(ApiError::from(TaskServiceError::Store(StoreError::NotFound)).status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_errors_are_client_errors() {
        assert_eq!(ApiError::from(TaskError::EmptyTitle).status, StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::from(TaskServiceError::Invalid(TaskError::NoNextStatus)).status, StatusCode::CONFLICT);
        assert_eq!(ApiError::from(CountdownError::MissingDate).status, StatusCode::BAD_REQUEST);
    }
}
