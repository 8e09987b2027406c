use crate::store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

pub type AppResult<T> = Result<T, AppError>;

/// Error returned by handlers. The whole cause chain goes to the log and to
/// the plain text body.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    /// Wraps a store error under `context`, keeping the status its kind maps to.
    pub fn store(error: StoreError, context: &'static str) -> Self {
        let status = match &error {
            StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            StoreError::WriteFailed(_) | StoreError::ReadFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            StoreError::NoData => StatusCode::NOT_FOUND,
        };
        Self {
            status,
            error: anyhow::Error::new(error).context(context),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("Error: {:#}", self.error);
        (self.status, format!("{:#}\n", self.error)).into_response()
    }
}
