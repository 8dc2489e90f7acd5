use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use crate::utils;

pub const SESSION_COOKIE: &str = "myspoti_session";

/// Returns the session id carried by the request, if any. Values that were
/// not issued by [`ensure_session`] are ignored.
pub fn current_session(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|c| c.value())
        .filter(|id| utils::is_session_id(id))
        .map(str::to_string)
}

/// Returns the request's session id, issuing a new session cookie when the
/// browser has none yet.
pub fn ensure_session(jar: CookieJar, ttl_secs: i64, secure: bool) -> (CookieJar, String) {
    if let Some(session_id) = current_session(&jar) {
        return (jar, session_id);
    }

    let session_id = utils::generate_session_id();
    let cookie = Cookie::build((SESSION_COOKIE, session_id.clone()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::seconds(ttl_secs))
        .build();

    (jar.add(cookie), session_id)
}

pub fn clear_session(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/"))
}
