//! Rate-limited HTTP dispatch for provider calls.
//!
//! This is the single choke point all Discord API traffic passes through.
//! Rate-limit responses are retried transparently after the provider-supplied
//! `Retry-After` delay, "not found" becomes a non-error empty outcome, and
//! any other non-success response is a typed fatal error for the caller to
//! absorb or propagate.

use std::time::Duration;

use reqwest::{header, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Applied when a rate-limit response carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

#[derive(Error, Debug)]
pub enum ApiError {
    /// Connection-level failure from reqwest (DNS, TLS, decode).
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// The provider answered with a status the pipeline does not handle.
    ///
    /// Not retried; the body is kept for logging context.
    #[error("unexpected status {status} from provider: {body}")]
    UnexpectedStatus { status: StatusCode, body: String },

    /// Rate limited on a request whose body cannot be cloned for re-issue.
    #[error("rate limited on a request that cannot be replayed")]
    Unreplayable,
}

/// Non-error outcomes of a provider call.
#[derive(Debug, PartialEq, Eq)]
pub enum ApiOutcome<T> {
    Success(T),
    /// The resource does not exist. Recovered as an empty result, never an
    /// error: a member who already left is not a failure.
    NotFound,
}

/// HTTP client wrapper applying the provider's rate-limit protocol.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Builder access for composing requests that will be dispatched through
    /// this client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Sends a request and deserializes the JSON body on success.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<ApiOutcome<T>, ApiError> {
        match self.dispatch(request).await? {
            Some(response) => Ok(ApiOutcome::Success(response.json().await?)),
            None => Ok(ApiOutcome::NotFound),
        }
    }

    /// Sends a request whose response body is irrelevant (role mutations,
    /// kicks and the like answer 204).
    pub async fn request_unit(&self, request: RequestBuilder) -> Result<ApiOutcome<()>, ApiError> {
        match self.dispatch(request).await? {
            Some(_) => Ok(ApiOutcome::Success(())),
            None => Ok(ApiOutcome::NotFound),
        }
    }

    /// Dispatches a request, sleeping and re-issuing on rate limits.
    ///
    /// The calling task suspends for the full retry-after duration; there is
    /// no ceiling, so callers must tolerate the delay.
    async fn dispatch(&self, request: RequestBuilder) -> Result<Option<Response>, ApiError> {
        let mut request = request;

        loop {
            let replay = request.try_clone();
            let response = request.send().await?;
            let status = response.status();

            if status.is_success() {
                return Ok(Some(response));
            }

            if status == StatusCode::NOT_FOUND {
                return Ok(None);
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                let delay = retry_after(&response);
                let Some(next) = replay else {
                    return Err(ApiError::Unreplayable);
                };
                tracing::warn!("Rate limited by provider, retrying in {:?}", delay);
                tokio::time::sleep(delay).await;
                request = next;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::UnexpectedStatus { status, body });
        }
    }
}

/// Reads the provider-supplied retry delay, defaulting to one second.
///
/// Discord sends fractional seconds in the `Retry-After` header.
fn retry_after(response: &Response) -> Duration {
    response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|secs| *secs >= 0.0)
        .map(Duration::from_secs_f64)
        .unwrap_or(DEFAULT_RETRY_AFTER)
}
