//! Error types and HTTP response handling.
//!
//! This module provides the application's error hierarchy and conversion logic for
//! transforming errors into appropriate HTTP responses. The `AppError` enum serves
//! as the top-level error type that wraps domain-specific errors and implements
//! `IntoResponse` for automatic error handling in the callback endpoint.

pub mod config;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::{
    discord::api_client::ApiError, error::config::ConfigError, model::ErrorDto, store::StoreError,
};

/// Top-level application error type.
///
/// Aggregates all possible error types that can occur in the application and
/// provides automatic conversion to HTTP responses. Most variants use `#[from]`
/// for automatic error conversion. `MalformedCallback` is the only error a
/// remote caller can legitimately provoke; everything else maps to a generic
/// 500 with details logged server-side.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error during startup or environment variable loading.
    #[error(transparent)]
    ConfigErr(#[from] ConfigError),

    /// Durable store read/write error.
    #[error(transparent)]
    StoreErr(#[from] StoreError),

    /// Provider API call failed with an unexpected response.
    #[error(transparent)]
    ApiErr(#[from] ApiError),

    /// HTTP client request error from reqwest.
    #[error(transparent)]
    ReqwestErr(#[from] reqwest::Error),

    /// Discord API error from Serenity.
    ///
    /// Boxed due to large size.
    #[error(transparent)]
    DiscordErr(#[from] Box<serenity::Error>),

    /// Endpoint URL failed to parse while building the OAuth client.
    #[error(transparent)]
    UrlErr(#[from] url::ParseError),

    /// I/O error during startup (e.g. binding the listener).
    #[error(transparent)]
    IoErr(#[from] std::io::Error),

    /// Callback request missing or carrying unparseable correlation data.
    ///
    /// Rejected at the boundary before anything enters the pipeline.
    /// Results in 400 Bad Request with the provided message.
    #[error("{0}")]
    MalformedCallback(String),
}

/// Manual conversion from serenity::Error to AppError.
///
/// Boxes the error to reduce the size of the AppError enum, as serenity::Error
/// is very large and would make all AppError variants larger if not boxed.
impl From<serenity::Error> for AppError {
    fn from(err: serenity::Error) -> Self {
        AppError::DiscordErr(Box::new(err))
    }
}

/// Converts application errors into HTTP responses.
///
/// # Returns
/// - 400 Bad Request - For `MalformedCallback`
/// - 500 Internal Server Error - For all other error types, with details
///   logged server-side and a generic message returned to the client
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::MalformedCallback(msg) => {
                (StatusCode::BAD_REQUEST, Json(ErrorDto { error: msg })).into_response()
            }
            err => {
                tracing::error!("{}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorDto {
                        error: "Internal server error".to_string(),
                    }),
                )
                    .into_response()
            }
        }
    }
}
