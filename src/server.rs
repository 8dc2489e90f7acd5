use std::{net::SocketAddr, str::FromStr, sync::Arc};

use axum::{Router, routing::get};

use crate::{
    api,
    config::Settings,
    error::{Error, Result},
    info,
    management::{
        AuthorizationCoordinator, Clock, ListeningService, SessionTokenCache, SystemClock,
    },
    spotify::{auth::SpotifyAuthServer, me::SpotifyDataApi},
};

pub type Coordinator = AuthorizationCoordinator<SpotifyAuthServer>;
pub type Listening = ListeningService<SpotifyAuthServer, SpotifyDataApi>;

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<Coordinator>,
    pub listening: Arc<Listening>,
    pub session_ttl_secs: i64,
    pub secure_cookies: bool,
}

impl AppState {
    /// Wires the Spotify clients, the session cache and the coordinator.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let cache = Arc::new(SessionTokenCache::new(
            Arc::clone(&clock),
            settings.session_ttl,
        ));

        let server = SpotifyAuthServer::new(
            settings.auth_url.clone(),
            settings.token_url.clone(),
            settings.http_timeout,
        )?;
        let auth = Arc::new(AuthorizationCoordinator::new(
            server,
            settings.credentials.clone(),
            cache,
            clock,
            settings.expiry_margin,
        ));

        let api = SpotifyDataApi::new(settings.api_url.clone(), settings.http_timeout)?;
        let listening = Arc::new(ListeningService::new(Arc::clone(&auth), api));

        Ok(Self {
            auth,
            listening,
            session_ttl_secs: i64::try_from(settings.session_ttl.as_secs()).unwrap_or(i64::MAX),
            secure_cookies: settings.secure_cookies,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(api::status))
        .route("/health", get(api::health))
        .route("/login", get(api::login))
        .route("/callback", get(api::callback))
        .route("/status", get(api::status))
        .route("/sign-out", get(api::sign_out).post(api::sign_out))
        .route("/profile", get(api::profile))
        .route("/currently-playing", get(api::currently_playing))
        .route("/top-tracks", get(api::top_tracks))
        .route("/top-artists", get(api::top_artists))
        .route("/recently-played", get(api::recently_played))
        .with_state(state)
}

pub async fn start_api_server(settings: Settings) -> Result<()> {
    let addr = SocketAddr::from_str(&settings.server_addr)
        .map_err(|e| Error::Config(format!("invalid server address: {}", e)))?;

    let app = build_router(AppState::from_settings(&settings)?);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Server(format!("cannot bind {}: {}", addr, e)))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::Server(e.to_string()))
}
