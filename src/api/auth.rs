use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Redirect},
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;

use crate::{
    api::{ApiError, session},
    server::AppState,
};

/// Sends the browser to Spotify's consent page.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), ApiError> {
    let (jar, session_id) =
        session::ensure_session(jar, state.session_ttl_secs, state.secure_cookies);

    let scopes = state.auth.credentials().scopes.clone();
    let url = state.auth.begin_authorization(&session_id, &scopes).await?;

    Ok((jar, Redirect::to(&url)))
}

/// Cheap "signed in" check for the pages; never refreshes the token.
pub async fn status(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let Some(session_id) = session::current_session(&jar) else {
        return Json(json!({ "signed_in": false, "state": "unauthenticated" }));
    };

    Json(json!({
        "signed_in": state.auth.is_authenticated(&session_id).await,
        "state": state.auth.state(&session_id).await,
    }))
}

pub async fn sign_out(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(session_id) = session::current_session(&jar) {
        state.auth.sign_out(&session_id).await;
    }

    (session::clear_session(jar), Redirect::to("/"))
}
