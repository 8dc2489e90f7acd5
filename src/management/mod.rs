mod auth;
mod clock;
mod listening;
mod session;

pub use auth::AuthorizationCoordinator;
pub use clock::Clock;
pub use clock::SystemClock;
pub use listening::ListeningService;
pub use session::SessionTokenCache;
