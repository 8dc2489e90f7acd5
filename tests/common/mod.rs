#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{
    Form, Json, Router,
    extract::Query,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use serde_json::{Value, json};

use myspoti::{
    error::{Error, Result},
    management::{AuthorizationCoordinator, Clock, SessionTokenCache},
    spotify::{AuthorizationServer, DataApi},
    types::{Credentials, RawItem, TimeRange, TokenGrant, TokenRecord, parse_scopes},
};

pub const SCOPES: &str = "user-read-currently-playing user-top-read user-read-recently-played";
pub const REDIRECT_URI: &str = "http://127.0.0.1:5000/callback";

/// Clock that only moves when told to.
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new() -> Self {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: TimeDelta) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub fn credentials() -> Credentials {
    Credentials {
        client_id: "client-id".into(),
        client_secret: "client-secret".into(),
        redirect_uri: REDIRECT_URI.into(),
        scopes: SCOPES.into(),
    }
}

pub fn record(access: &str, refresh: &str, expires_at: DateTime<Utc>) -> TokenRecord {
    TokenRecord {
        access_token: access.into(),
        refresh_token: refresh.into(),
        expires_at,
        scopes: parse_scopes(SCOPES),
    }
}

/// Authorization server that answers from memory.
///
/// Accepts the code `"good-code"`, rejects every other code like Spotify
/// rejects a consumed one, and refreshes into `"z"` unless told to reject.
#[derive(Clone, Default)]
pub struct FakeAuthServer {
    pub exchanges: Arc<AtomicUsize>,
    pub refreshes: Arc<AtomicUsize>,
    pub reject_refresh: bool,
    pub unreachable: bool,
    pub rotated_refresh_token: Option<String>,
    pub refresh_error: Option<Error>,
    pub expires_in: Option<i64>,
}

impl FakeAuthServer {
    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn exchange_count(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }
}

impl AuthorizationServer for FakeAuthServer {
    fn build_authorize_url(
        &self,
        client_id: &str,
        redirect_uri: &str,
        scopes: &str,
        state: &str,
    ) -> Result<String> {
        Ok(format!(
            "https://accounts.example/authorize?client_id={client_id}&redirect_uri={redirect_uri}&scope={}&state={state}",
            scopes.replace(' ', "+")
        ))
    }

    async fn exchange_code(
        &self,
        code: &str,
        _client_id: &str,
        _client_secret: &str,
        _redirect_uri: &str,
    ) -> Result<TokenGrant> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        if code != "good-code" {
            return Err(Error::AuthExchange {
                status: Some(400),
                message: "invalid_grant: Invalid authorization code".into(),
            });
        }
        Ok(TokenGrant {
            access_token: "x".into(),
            token_type: Some("Bearer".into()),
            scope: Some(SCOPES.into()),
            expires_in: self.expires_in.unwrap_or(3600),
            refresh_token: Some("y".into()),
        })
    }

    async fn refresh(
        &self,
        refresh_token: &str,
        _client_id: &str,
        _client_secret: &str,
    ) -> Result<TokenGrant> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        // keep the refresh in flight long enough for concurrent callers to pile up
        tokio::time::sleep(Duration::from_millis(20)).await;

        if let Some(err) = &self.refresh_error {
            return Err(err.clone());
        }
        if self.unreachable {
            return Err(Error::AuthExchange {
                status: None,
                message: "connection failed: refused".into(),
            });
        }
        if self.reject_refresh || refresh_token.is_empty() {
            return Err(Error::AuthExchange {
                status: Some(400),
                message: "invalid_grant: Refresh token revoked".into(),
            });
        }
        Ok(TokenGrant {
            access_token: "z".into(),
            token_type: Some("Bearer".into()),
            scope: None,
            expires_in: self.expires_in.unwrap_or(3600),
            refresh_token: self.rotated_refresh_token.clone(),
        })
    }
}

pub struct Harness {
    pub clock: ManualClock,
    pub cache: Arc<SessionTokenCache>,
    pub server: FakeAuthServer,
    pub auth: Arc<AuthorizationCoordinator<FakeAuthServer>>,
}

pub fn harness(server: FakeAuthServer) -> Harness {
    let clock = ManualClock::new();
    let cache = Arc::new(SessionTokenCache::new(
        Arc::new(clock.clone()),
        Duration::from_secs(86_400),
    ));
    let auth = Arc::new(AuthorizationCoordinator::new(
        server.clone(),
        credentials(),
        Arc::clone(&cache),
        Arc::new(clock.clone()),
        Duration::from_secs(60),
    ));

    Harness {
        clock,
        cache,
        server,
        auth,
    }
}

/// Data API that records the last call and replays canned answers.
#[derive(Clone, Default)]
pub struct FakeDataApi {
    pub calls: Arc<Mutex<Vec<String>>>,
    pub failures: Arc<Mutex<VecDeque<Error>>>,
    pub items: Vec<RawItem>,
    pub playing: Option<RawItem>,
}

impl FakeDataApi {
    pub fn with_items(items: Vec<RawItem>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn fail_next(&self, err: Error) {
        self.failures.lock().unwrap().push_back(err);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn answer<T>(&self, call: String, value: T) -> Result<T> {
        self.calls.lock().unwrap().push(call);
        match self.failures.lock().unwrap().pop_front() {
            Some(err) => Err(err),
            None => Ok(value),
        }
    }
}

impl DataApi for FakeDataApi {
    async fn fetch_profile(&self, access_token: &str) -> Result<RawItem> {
        self.answer(
            format!("profile token={access_token}"),
            profile_json(),
        )
    }

    async fn fetch_currently_playing(&self, access_token: &str) -> Result<Option<RawItem>> {
        self.answer(
            format!("currently_playing token={access_token}"),
            self.playing.clone(),
        )
    }

    async fn fetch_top_tracks(
        &self,
        access_token: &str,
        limit: u32,
        time_range: TimeRange,
    ) -> Result<Vec<RawItem>> {
        self.answer(
            format!("top_tracks token={access_token} limit={limit} time_range={time_range}"),
            self.items.clone(),
        )
    }

    async fn fetch_top_artists(
        &self,
        access_token: &str,
        limit: u32,
        time_range: TimeRange,
    ) -> Result<Vec<RawItem>> {
        self.answer(
            format!("top_artists token={access_token} limit={limit} time_range={time_range}"),
            self.items.clone(),
        )
    }

    async fn fetch_recently_played(&self, access_token: &str, limit: u32) -> Result<Vec<RawItem>> {
        self.answer(
            format!("recently_played token={access_token} limit={limit}"),
            self.items.clone(),
        )
    }
}

pub fn track(name: &str, artists: &[&str], images: Value) -> Value {
    json!({
        "name": name,
        "artists": artists.iter().map(|a| json!({"name": a})).collect::<Vec<_>>(),
        "album": {
            "name": format!("{name} (album)"),
            "images": images,
            "external_urls": {"spotify": format!("https://open.spotify.com/album/{name}")}
        },
        "external_urls": {"spotify": format!("https://open.spotify.com/track/{name}")}
    })
}

pub fn images(urls: &[&str]) -> Value {
    Value::Array(urls.iter().map(|u| json!({"url": u})).collect())
}

fn profile_json() -> Value {
    json!({
        "id": "listener",
        "display_name": "Listener",
        "country": "SE",
        "product": "premium",
        "followers": {"total": 7},
        "images": [{"url": "https://i.scdn.co/image/avatar"}],
        "external_urls": {"spotify": "https://open.spotify.com/user/listener"}
    })
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{addr}")
}

/// Accounts service token endpoint at `/api/token`.
///
/// Accepts the credentials from [`credentials`]. The code `"good-code"` and
/// the refresh token `"y"` succeed, `"broken"` and `"down"` fail on the
/// server side, anything else is rejected with `invalid_grant`.
pub fn token_routes() -> Router {
    Router::new().route("/api/token", post(token_endpoint))
}

/// Web API endpoints under `/v1`. The bearer token picks the answer:
/// `"x"` and `"z"` are valid, `"limited"` is rate limited, `"broken"` fails
/// with a plain-text 500, `"idle"` and `"ad"` have nothing playing, `"odd"`
/// gets bodies that are not paging objects. Any other token is refused.
pub fn data_routes() -> Router {
    Router::new()
        .route("/v1/me", get(me_endpoint))
        .route("/v1/me/player/currently-playing", get(currently_playing_endpoint))
        .route("/v1/me/top/tracks", get(top_tracks_endpoint))
        .route("/v1/me/top/artists", get(top_artists_endpoint))
        .route("/v1/me/player/recently-played", get(recently_played_endpoint))
}

pub fn spotify_routes() -> Router {
    token_routes().merge(data_routes())
}

fn form_field<'a>(form: &'a HashMap<String, String>, name: &str) -> &'a str {
    form.get(name).map(String::as_str).unwrap_or_default()
}

fn token_error(status: StatusCode, error: &str, description: Option<&str>) -> Response {
    let body = match description {
        Some(description) => json!({"error": error, "error_description": description}),
        None => json!({"error": error}),
    };
    (status, Json(body)).into_response()
}

async fn token_endpoint(headers: HeaderMap, Form(form): Form<HashMap<String, String>>) -> Response {
    let expected = format!("Basic {}", STANDARD.encode("client-id:client-secret"));
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if authorization != Some(expected.as_str()) {
        return token_error(StatusCode::UNAUTHORIZED, "invalid_client", Some("Invalid client"));
    }

    match form_field(&form, "grant_type") {
        "authorization_code" => match form_field(&form, "code") {
            "good-code" if form_field(&form, "redirect_uri") == REDIRECT_URI => Json(json!({
                "access_token": "x",
                "token_type": "Bearer",
                "scope": SCOPES,
                "expires_in": 3600,
                "refresh_token": "y"
            }))
            .into_response(),
            "broken" => (StatusCode::INTERNAL_SERVER_ERROR, "oops").into_response(),
            _ => token_error(
                StatusCode::BAD_REQUEST,
                "invalid_grant",
                Some("Invalid authorization code"),
            ),
        },
        "refresh_token" => match form_field(&form, "refresh_token") {
            "y" => Json(json!({
                "access_token": "z",
                "token_type": "Bearer",
                "expires_in": 3600
            }))
            .into_response(),
            "down" => (StatusCode::SERVICE_UNAVAILABLE, "upstream down").into_response(),
            _ => token_error(StatusCode::BAD_REQUEST, "invalid_grant", None),
        },
        _ => token_error(StatusCode::BAD_REQUEST, "unsupported_grant_type", None),
    }
}

fn bearer(headers: &HeaderMap) -> &str {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default()
}

pub fn api_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({"error": {"status": status.as_u16(), "message": message}})),
    )
        .into_response()
}

fn refused(headers: &HeaderMap) -> Option<Response> {
    match bearer(headers) {
        "x" | "z" | "idle" | "ad" | "odd" => None,
        "limited" => Some(
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, "7")],
                Json(json!({"error": {"status": 429, "message": "API rate limit exceeded"}})),
            )
                .into_response(),
        ),
        "broken" => Some((StatusCode::INTERNAL_SERVER_ERROR, "oops").into_response()),
        _ => Some(api_error(StatusCode::UNAUTHORIZED, "Invalid access token")),
    }
}

fn page(
    headers: &HeaderMap,
    query: &HashMap<String, String>,
    item: impl Fn(&str, usize) -> Value,
) -> Response {
    if let Some(refusal) = refused(headers) {
        return refusal;
    }
    if bearer(headers) == "odd" {
        return Json(json!({"unexpected": true})).into_response();
    }

    let limit = query
        .get("limit")
        .and_then(|l| l.parse::<usize>().ok())
        .unwrap_or(20);
    let range = query
        .get("time_range")
        .map(String::as_str)
        .unwrap_or("medium_term");
    let items: Vec<Value> = (0..limit).map(|i| item(range, i)).collect();

    Json(json!({"items": items, "limit": limit, "total": 50})).into_response()
}

async fn me_endpoint(headers: HeaderMap) -> Response {
    match refused(&headers) {
        Some(refusal) => refusal,
        None => Json(profile_json()).into_response(),
    }
}

async fn currently_playing_endpoint(headers: HeaderMap) -> Response {
    if let Some(refusal) = refused(&headers) {
        return refusal;
    }
    match bearer(&headers) {
        "idle" => StatusCode::NO_CONTENT.into_response(),
        "ad" => Json(json!({
            "is_playing": true,
            "currently_playing_type": "ad",
            "item": null
        }))
        .into_response(),
        _ => Json(json!({
            "is_playing": true,
            "currently_playing_type": "track",
            "item": track("now", &["A"], images(&["l", "m", "s"]))
        }))
        .into_response(),
    }
}

async fn top_tracks_endpoint(
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    page(&headers, &query, |range, i| {
        track(&format!("{range} #{i}"), &["Artist"], images(&["l", "m", "s"]))
    })
}

async fn top_artists_endpoint(
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    page(&headers, &query, |range, i| {
        json!({
            "name": format!("{range} #{i}"),
            "genres": ["indie", "dream pop"],
            "images": images(&["l", "m", "s"]),
            "external_urls": {"spotify": format!("https://open.spotify.com/artist/{i}")}
        })
    })
}

async fn recently_played_endpoint(
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    page(&headers, &query, |_, i| {
        json!({
            "track": track(&format!("played #{i}"), &["Artist"], images(&["l", "m"])),
            "played_at": "2024-05-01T10:00:00.000Z"
        })
    })
}
