//! # API Module
//!
//! HTTP endpoints that connect a browser to the authorization and listening
//! layers. The handlers are thin: they pick the session id out of the cookie
//! jar, call into [`crate::management`] and turn the result into JSON or a
//! redirect.
//!
//! ## Endpoints
//!
//! ### Authentication
//!
//! - [`login`] - Starts the authorization-code flow and redirects to Spotify's
//!   consent page. Issues the session cookie when the browser has none.
//! - [`callback`] - Receives the one-time code, checks the `state` value and
//!   stores the session's token.
//! - [`status`] - Reports whether the session is signed in without refreshing
//!   anything.
//! - [`sign_out`] - Drops the session's token and cookie.
//!
//! ### Listening Views
//!
//! - [`profile`], [`currently_playing`], [`top_tracks`], [`top_artists`] and
//!   [`recently_played`] answer JSON built from [`crate::types::ViewItem`]s.
//!   `time_range` and `limit` query parameters are coerced, never rejected.
//!
//! ### Monitoring
//!
//! - [`health`] - Returns application status and version information.
//!
//! ## Errors
//!
//! [`ApiError`] maps core errors to answers: anything that needs a new
//! authorization redirects to `/login`, transient Spotify failures answer
//! `503`, other Spotify failures `502`.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use myspoti::server::{AppState, build_router};
//!
//! let app = build_router(AppState::from_settings(&settings)?);
//! ```

mod auth;
mod callback;
mod error;
mod health;
mod listening;
pub mod session;

pub use auth::{login, sign_out, status};
pub use callback::callback;
pub use error::ApiError;
pub use health::health;
pub use listening::{currently_playing, profile, recently_played, top_artists, top_tracks};
