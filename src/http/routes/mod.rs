pub mod buildings;
pub mod countdowns;
pub mod dashboard;
pub mod sky;
pub mod tasks;
pub mod timer;

use crate::{domain::task::TaskId, http::types::ApiError};

pub(crate) fn parse_task_id(raw: &str) -> Result<TaskId, ApiError> {
    raw.parse().map_err(|_| ApiError::bad_request("invalid id"))
}
