//! Configuration management for MySpoti.
//!
//! This module handles loading and accessing configuration values from environment
//! variables and `.env` files. It provides a centralized way to manage application
//! configuration including Spotify API credentials, server settings, and the token
//! and session lifetimes used by the authorization layer.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults (where applicable)

use std::{env, path::PathBuf, time::Duration};

use crate::{
    error::{Error, Result},
    types::Credentials,
};

const DEFAULT_SCOPE: &str = "user-read-currently-playing user-top-read user-read-recently-played";
const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:5000";
const DEFAULT_EXPIRY_MARGIN_SECS: u64 = 60;
const MAX_EXPIRY_MARGIN_SECS: u64 = 3600;
const DEFAULT_SESSION_TTL_SECS: u64 = 86_400;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Loads environment variables from a `.env` file in the local data directory.
///
/// Creates the necessary directory structure if it doesn't exist and loads
/// environment variables from a `.env` file located in the platform-specific
/// local data directory under `myspoti/.env`. When that file does not exist a
/// `.env` in the working directory is tried, and finally the plain process
/// environment is used.
///
/// # Directory Structure
///
/// The function looks for the `.env` file in:
/// - Linux: `~/.local/share/myspoti/.env`
/// - macOS: `~/Library/Application Support/myspoti/.env`
/// - Windows: `%LOCALAPPDATA%/myspoti/.env`
///
/// # Errors
///
/// Returns `Error::Config` if the parent directory cannot be created or an
/// existing `.env` file cannot be parsed.
///
/// # Example
///
/// ```
/// use myspoti::config;
///
/// #[tokio::main]
/// async fn main() {
///     if let Err(e) = config::load_env().await {
///         eprintln!("Configuration error: {}", e);
///     }
/// }
/// ```
pub async fn load_env() -> Result<()> {
    let path = env_path();
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::Config(e.to_string()))?;
    }

    if path.is_file() {
        dotenv::from_path(&path).map_err(|e| Error::Config(e.to_string()))?;
    } else {
        // no file in the data directory, a local one is optional
        let _ = dotenv::dotenv();
    }
    Ok(())
}

fn env_path() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("myspoti/.env");
    path
}

/// Returns the address the web server binds to.
///
/// Reads `SERVER_ADDRESS`, defaulting to `127.0.0.1:5000`.
pub fn server_addr() -> String {
    optional("SERVER_ADDRESS").unwrap_or_else(|| DEFAULT_SERVER_ADDRESS.to_string())
}

/// Returns the Spotify API client ID for authentication.
///
/// Retrieves the `SPOTIFY_API_AUTH_CLIENT_ID` environment variable which
/// contains the client ID obtained when registering the application with
/// Spotify's developer platform.
///
/// # Errors
///
/// Returns `Error::Config` if the variable is not set.
pub fn spotify_client_id() -> Result<String> {
    required("SPOTIFY_API_AUTH_CLIENT_ID")
}

/// Returns the Spotify API client secret for authentication.
///
/// Retrieves the `SPOTIFY_API_AUTH_CLIENT_SECRET` environment variable. The
/// secret authenticates the server side of the authorization-code exchange.
///
/// # Security Note
///
/// The client secret should be kept confidential and never exposed in logs
/// or version control.
///
/// # Errors
///
/// Returns `Error::Config` if the variable is not set.
pub fn spotify_client_secret() -> Result<String> {
    required("SPOTIFY_API_AUTH_CLIENT_SECRET")
}

/// Returns the Spotify OAuth redirect URI.
///
/// Retrieves the `SPOTIFY_API_REDIRECT_URI` environment variable which specifies
/// the callback URL that Spotify should redirect to after user authorization.
/// This must match the redirect URI registered in the Spotify application settings.
///
/// # Errors
///
/// Returns `Error::Config` if the variable is not set.
///
/// # Example
///
/// ```
/// let redirect_uri = spotify_redirect_uri()?; // e.g., "http://127.0.0.1:5000/callback"
/// ```
pub fn spotify_redirect_uri() -> Result<String> {
    required("SPOTIFY_API_REDIRECT_URI")
}

/// Returns the space-delimited scopes requested during authorization.
pub fn spotify_scope() -> String {
    optional("SPOTIFY_API_AUTH_SCOPE").unwrap_or_else(|| DEFAULT_SCOPE.to_string())
}

pub fn spotify_apiauth_url() -> String {
    optional("SPOTIFY_API_AUTH_URL").unwrap_or_else(|| DEFAULT_AUTH_URL.to_string())
}

pub fn spotify_apitoken_url() -> String {
    optional("SPOTIFY_API_TOKEN_URL").unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string())
}

pub fn spotify_apiurl() -> String {
    optional("SPOTIFY_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string())
}

/// Safety margin subtracted from a token's lifetime before it counts as expired.
///
/// # Errors
///
/// Returns `Error::Config` for values above one hour, the lifetime Spotify
/// grants access tokens.
pub fn token_expiry_margin() -> Result<Duration> {
    let margin = seconds("TOKEN_EXPIRY_MARGIN_SECS", DEFAULT_EXPIRY_MARGIN_SECS)?;
    if margin.as_secs() > MAX_EXPIRY_MARGIN_SECS {
        return Err(Error::Config(format!(
            "TOKEN_EXPIRY_MARGIN_SECS must be at most {}",
            MAX_EXPIRY_MARGIN_SECS
        )));
    }
    Ok(margin)
}

/// How long an idle browser session keeps its token.
pub fn session_ttl() -> Result<Duration> {
    seconds("SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)
}

pub fn http_timeout() -> Result<Duration> {
    seconds("HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)
}

pub fn secure_cookies() -> bool {
    optional("SECURE_COOKIES")
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Every setting the server needs, resolved once at start-up.
#[derive(Debug, Clone)]
pub struct Settings {
    pub credentials: Credentials,
    pub auth_url: String,
    pub token_url: String,
    pub api_url: String,
    pub server_addr: String,
    pub expiry_margin: Duration,
    pub session_ttl: Duration,
    pub http_timeout: Duration,
    pub secure_cookies: bool,
}

impl Settings {
    /// Resolves all settings from the environment.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the first missing required variable or
    /// the first numeric variable that does not parse.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            credentials: Credentials {
                client_id: spotify_client_id()?,
                client_secret: spotify_client_secret()?,
                redirect_uri: spotify_redirect_uri()?,
                scopes: spotify_scope(),
            },
            auth_url: spotify_apiauth_url(),
            token_url: spotify_apitoken_url(),
            api_url: spotify_apiurl(),
            server_addr: server_addr(),
            expiry_margin: token_expiry_margin()?,
            session_ttl: session_ttl()?,
            http_timeout: http_timeout()?,
            secure_cookies: secure_cookies(),
        })
    }
}

fn required(name: &str) -> Result<String> {
    optional(name).ok_or_else(|| Error::Config(format!("{} must be set", name)))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn seconds(name: &str, default: u64) -> Result<Duration> {
    match optional(name) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| Error::Config(format!("{} must be a number of seconds: {}", name, e))),
        None => Ok(Duration::from_secs(default)),
    }
}
