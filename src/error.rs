use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mongodb::bson::oid::ObjectId;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{field} {reason}")]
    Validation { field: &'static str, reason: String },
    #[error("event with id {0} does not exist")]
    EventMissing(ObjectId),
    #[error("error validating event reference: {0}")]
    ReferenceCheck(#[source] mongodb::error::Error),
    #[error("database configuration error: {0}")]
    Config(String),
    #[error("failed to connect to MongoDB: {0}")]
    Connection(#[source] mongodb::error::Error),
    #[error("MongoDB connection established but not in a connected state")]
    ConnectionNotReady,
    #[error(transparent)]
    Db(#[from] mongodb::error::Error),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, json!({ "message": message }))
            }
            AppError::Validation { field, reason } => (
                StatusCode::BAD_REQUEST,
                json!({ "message": format!("{field} {reason}") }),
            ),
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, json!({ "message": message })),
            AppError::Config(reason) => {
                tracing::error!(error = %reason, "database configuration error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "Database configuration error" }),
                )
            }
            err => {
                tracing::error!(error = ?err, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "Failed to fetch events", "error": err.to_string() }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
