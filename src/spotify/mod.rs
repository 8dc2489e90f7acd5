//! # Spotify Integration Module
//!
//! This module is the boundary between MySpoti and Spotify's two HTTP services:
//! the accounts service, which issues and refreshes OAuth 2.0 tokens, and the
//! Web API, which serves the listening data behind every read view.
//!
//! ## Architecture
//!
//! ```text
//! Web Layer (axum handlers)
//!          ↓
//! Management Layer (sessions, token lifecycle, listening views)
//!          ↓
//! Spotify Integration Layer
//!     ├── AuthorizationServer (authorize URL, code exchange, refresh)
//!     └── DataApi (profile, currently playing, top items, history)
//!          ↓
//! HTTP Layer (reqwest, JSON)
//! ```
//!
//! Both services sit behind a trait so the management layer can be driven by
//! in-memory fakes in tests. The production implementations are
//! [`auth::SpotifyAuthServer`] and [`me::SpotifyDataApi`].
//!
//! ## Authorization Code Flow
//!
//! MySpoti runs on a server and can keep a client secret, so it uses the plain
//! authorization-code grant:
//! 1. **Consent**: the browser is sent to the authorize URL with the client id,
//!    redirect URI, requested scopes and a per-session `state` value
//! 2. **Callback**: Spotify redirects back with a one-time `code`
//! 3. **Exchange**: the code is traded for an access and refresh token, using
//!    HTTP Basic authentication with the client credentials
//! 4. **Refresh**: once the access token expires, the refresh token mints a new
//!    one without user interaction
//!
//! ## Error Handling
//!
//! Responses are never unwrapped. Every non-success status becomes a typed
//! [`Error`](crate::error::Error):
//! - token endpoint failures map to `Error::AuthExchange`
//! - Web API failures map to `Error::DataApi`, keeping the `Retry-After`
//!   seconds of `429 Too Many Requests` answers
//! - timeouts and connection failures map to the same variants with no status
//!
//! Retrying is left to the caller: each request performs at most one round trip
//! to each service.
//!
//! ## Payload Shapes
//!
//! Web API payloads are deep and vary between endpoints. They are passed up as
//! untyped [`serde_json::Value`] trees and flattened exactly once, by
//! [`crate::views`].

use crate::{
    error::Result,
    types::{RawItem, TimeRange, TokenGrant},
};

pub mod auth;
pub mod me;

/// The OAuth 2.0 authorization server.
pub trait AuthorizationServer: Send + Sync + 'static {
    /// Builds the consent URL the browser is redirected to.
    fn build_authorize_url(
        &self,
        client_id: &str,
        redirect_uri: &str,
        scopes: &str,
        state: &str,
    ) -> Result<String>;

    /// Exchanges a one-time authorization code for a token grant.
    fn exchange_code(
        &self,
        code: &str,
        client_id: &str,
        client_secret: &str,
        redirect_uri: &str,
    ) -> impl Future<Output = Result<TokenGrant>> + Send;

    /// Mints a new access token from a refresh token.
    fn refresh(
        &self,
        refresh_token: &str,
        client_id: &str,
        client_secret: &str,
    ) -> impl Future<Output = Result<TokenGrant>> + Send;
}

/// The read endpoints of the Web API used by the listening views.
pub trait DataApi: Send + Sync + 'static {
    fn fetch_profile(&self, access_token: &str) -> impl Future<Output = Result<RawItem>> + Send;

    /// Returns the track currently playing, or `None` when nothing is.
    fn fetch_currently_playing(
        &self,
        access_token: &str,
    ) -> impl Future<Output = Result<Option<RawItem>>> + Send;

    fn fetch_top_tracks(
        &self,
        access_token: &str,
        limit: u32,
        time_range: TimeRange,
    ) -> impl Future<Output = Result<Vec<RawItem>>> + Send;

    fn fetch_top_artists(
        &self,
        access_token: &str,
        limit: u32,
        time_range: TimeRange,
    ) -> impl Future<Output = Result<Vec<RawItem>>> + Send;

    fn fetch_recently_played(
        &self,
        access_token: &str,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<RawItem>>> + Send;
}
