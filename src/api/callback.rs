use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::{
    api::{ApiError, session},
    server::AppState,
    success, warning,
};

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Completes the authorization started by `/login`.
pub async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    let Some(session_id) = session::current_session(&jar) else {
        warning!("Callback without session cookie");
        return Redirect::to("/login").into_response();
    };

    if let Some(error) = params.error {
        // the user declined the consent screen
        warning!("Authorization denied: {}", error);
        state.auth.sign_out(&session_id).await;
        return Redirect::to("/").into_response();
    }

    let state_matches = params
        .state
        .as_deref()
        .is_some_and(|s| state.auth.verify_state(&session_id, s));
    if !state_matches {
        warning!("Callback state does not match the session");
        return Redirect::to("/login").into_response();
    }

    let Some(code) = params.code else {
        return Redirect::to("/login").into_response();
    };

    match state.auth.complete_authorization(&session_id, &code).await {
        Ok(_) => {
            success!("Authentication successful!");
            Redirect::to("/profile").into_response()
        }
        Err(e) => ApiError(e).into_response(),
    }
}
