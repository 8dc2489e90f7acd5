use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;

use crate::{error::Error, warning};

/// Maps core errors onto HTTP answers.
///
/// Anything that needs a new consent redirects to `/login`. Other Spotify
/// failures answer with a JSON body: transient ones as `503` with
/// `Retry-After` when Spotify sent one, the rest as `502`.
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        if err.requires_authorization() {
            return Redirect::to("/login").into_response();
        }

        let status = match &err {
            Error::DataApi { .. } | Error::AuthExchange { .. } if err.is_transient() => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Error::DataApi { .. } | Error::AuthExchange { .. } => StatusCode::BAD_GATEWAY,
            _ => {
                warning!("Request failed: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let retry_after = match &err {
            Error::DataApi {
                retry_after: Some(secs),
                ..
            } => HeaderValue::from_str(&secs.to_string()).ok(),
            _ => None,
        };

        let mut response = (status, Json(json!({ "error": err.to_string() }))).into_response();
        if let Some(value) = retry_after {
            response.headers_mut().insert(RETRY_AFTER, value);
        }
        response
    }
}
