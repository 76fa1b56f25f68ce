// HTTP response utilities for JSON bodies and error mapping
use crate::domain::errors::SensorError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

/// Handler error: request-level failures map to 400 with the error kind,
/// everything else to 500
#[derive(Debug)]
pub struct ApiError(anyhow::Error);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        if self.0.downcast_ref::<SensorError>().is_some() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self.0.downcast_ref::<SensorError>() {
            Some(err) => ErrorBody {
                error: err.kind(),
                message: err.to_string(),
            },
            None => {
                tracing::error!("Request failed: {:#}", self.0);
                ErrorBody {
                    error: "InternalError",
                    message: "failed to load sensor data".to_string(),
                }
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Serialize `data` as a JSON response
pub fn json_response<T: Serialize>(data: T) -> Response {
    Json(data).into_response()
}
