use std::{
    collections::HashMap,
    sync::Arc,
    time::Duration,
};

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;

use crate::{
    error::{Error, Result},
    info,
    management::{Clock, SessionTokenCache},
    spotify::AuthorizationServer,
    types::{AuthState, Credentials, TokenRecord},
    utils, warning,
};

/// Drives the authorization-code flow and the token lifecycle of every
/// browser session.
///
/// `is_authenticated` and `state` only look at the cache. `ensure_fresh_token`
/// is the one read path that may call the authorization server and write the
/// cache; concurrent calls for the same session share a single refresh.
pub struct AuthorizationCoordinator<A> {
    server: A,
    credentials: Credentials,
    cache: Arc<SessionTokenCache>,
    clock: Arc<dyn Clock>,
    expiry_margin: TimeDelta,
    pending: Mutex<HashMap<String, DateTime<Utc>>>,
    refresh_guards: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<A: AuthorizationServer> AuthorizationCoordinator<A> {
    pub fn new(
        server: A,
        credentials: Credentials,
        cache: Arc<SessionTokenCache>,
        clock: Arc<dyn Clock>,
        expiry_margin: Duration,
    ) -> Self {
        Self {
            server,
            credentials,
            cache,
            clock,
            expiry_margin: TimeDelta::from_std(expiry_margin).unwrap_or(TimeDelta::zero()),
            pending: Mutex::new(HashMap::new()),
            refresh_guards: Mutex::new(HashMap::new()),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Whether the session can serve data views without a new consent.
    ///
    /// Never performs network I/O. An expired record still counts while it
    /// carries a refresh token; `ensure_fresh_token` settles whether the
    /// refresh actually works.
    pub async fn is_authenticated(&self, session_id: &str) -> bool {
        match self.cache.get(session_id).await {
            Some(record) => self.is_valid(&record) || record.has_refresh_token(),
            None => false,
        }
    }

    pub async fn state(&self, session_id: &str) -> AuthState {
        let refreshing = self
            .refresh_guards
            .lock()
            .await
            .get(session_id)
            .is_some_and(|guard| guard.try_lock().is_err());
        if refreshing {
            return AuthState::Refreshing;
        }

        match self.cache.get(session_id).await {
            Some(record) if self.is_valid(&record) => AuthState::Authenticated,
            Some(_) => AuthState::Expired,
            None if self.is_pending(session_id).await => AuthState::PendingCallback,
            None => AuthState::Unauthenticated,
        }
    }

    /// Returns the consent URL for the session and marks it as waiting for
    /// the callback. Calling it again before the callback yields the same URL.
    ///
    /// Sessions that never called back are forgotten after the session
    /// lifetime.
    pub async fn begin_authorization(
        &self,
        session_id: &str,
        requested_scopes: &str,
    ) -> Result<String> {
        let url = self.server.build_authorize_url(
            &self.credentials.client_id,
            &self.credentials.redirect_uri,
            requested_scopes,
            &utils::authorization_state(session_id),
        )?;

        let now = self.clock.now();
        let ttl = self.cache.session_ttl();
        let mut pending = self.pending.lock().await;
        pending.retain(|_, started_at| now - *started_at <= ttl);
        pending.insert(session_id.to_string(), now);
        Ok(url)
    }

    /// Checks that a callback's `state` belongs to this session.
    pub fn verify_state(&self, session_id: &str, state: &str) -> bool {
        utils::authorization_state(session_id) == state
    }

    /// Trades the callback's one-time code for a token and stores it.
    ///
    /// A rejected code leaves the session without a token; the caller sends
    /// the user through `begin_authorization` again. The same code is never
    /// retried.
    pub async fn complete_authorization(
        &self,
        session_id: &str,
        authorization_code: &str,
    ) -> Result<TokenRecord> {
        let result = self
            .server
            .exchange_code(
                authorization_code,
                &self.credentials.client_id,
                &self.credentials.client_secret,
                &self.credentials.redirect_uri,
            )
            .await;
        self.pending.lock().await.remove(session_id);

        let grant = result.inspect_err(|e| warning!("Authorization code exchange failed: {}", e))?;
        let record = TokenRecord::from_grant(grant, self.clock.now())
            .inspect_err(|e| warning!("Authorization code exchange failed: {}", e))?;
        self.cache.put(session_id, record.clone()).await;

        info!("Session authorized with scopes: {}", record.scope_string());
        Ok(record)
    }

    /// Returns a token that is valid right now, refreshing it if needed.
    ///
    /// # Returns
    ///
    /// - The cached record unchanged when it is still valid (no network call)
    /// - A refreshed record, already stored, when the cached one expired
    ///
    /// # Errors
    ///
    /// - `Error::NotAuthenticated` when the session has no record, or an
    ///   expired one without refresh token
    /// - `Error::AuthExchange` when the refresh fails. If the server rejected
    ///   the refresh token the record is dropped and the session needs a new
    ///   authorization.
    ///
    /// # Concurrency
    ///
    /// Refreshes are single-flight per session: concurrent callers wait for
    /// the first refresh and reuse its result, so a rotating refresh token is
    /// never spent twice.
    pub async fn ensure_fresh_token(&self, session_id: &str) -> Result<TokenRecord> {
        let record = self
            .cache
            .get(session_id)
            .await
            .ok_or(Error::NotAuthenticated)?;
        if self.is_valid(&record) {
            return Ok(record);
        }

        let guard = self.refresh_guard(session_id).await;
        let result = {
            let _refreshing = guard.lock().await;
            self.refresh_locked(session_id).await
        };
        self.release_guard(session_id, guard).await;
        result
    }

    /// Refreshes the session's token. Runs with the session's refresh guard
    /// held.
    async fn refresh_locked(&self, session_id: &str) -> Result<TokenRecord> {
        // another request may have refreshed while this one waited
        let record = self
            .cache
            .get(session_id)
            .await
            .ok_or(Error::NotAuthenticated)?;
        if self.is_valid(&record) {
            return Ok(record);
        }
        if !record.has_refresh_token() {
            return Err(Error::NotAuthenticated);
        }

        let grant = match self
            .server
            .refresh(
                &record.refresh_token,
                &self.credentials.client_id,
                &self.credentials.client_secret,
            )
            .await
        {
            Ok(grant) => grant,
            Err(e) => {
                if e.requires_authorization() {
                    warning!("Refresh token rejected, session signed out: {}", e);
                    self.cache.clear(session_id).await;
                } else {
                    warning!("Token refresh failed: {}", e);
                }
                return Err(e);
            }
        };

        let fresh = TokenRecord::from_grant(grant, self.clock.now())
            .inspect_err(|e| warning!("Token refresh failed: {}", e))?;
        let refreshed = record.refreshed_with(fresh);
        if !self.is_valid(&refreshed) {
            return Err(Error::auth_exchange(
                None,
                "authorization server returned an expired token",
            ));
        }

        self.cache.put(session_id, refreshed.clone()).await;
        info!("Access token refreshed");
        Ok(refreshed)
    }

    /// Forgets everything held for the session.
    pub async fn sign_out(&self, session_id: &str) {
        self.cache.clear(session_id).await;
        self.pending.lock().await.remove(session_id);
        self.refresh_guards.lock().await.remove(session_id);
    }

    /// Drops the session's token after the Data API refused it.
    pub async fn invalidate(&self, session_id: &str) {
        if self.cache.clear(session_id).await {
            warning!("Access token refused by Spotify, session signed out");
        }
    }

    fn is_valid(&self, record: &TokenRecord) -> bool {
        record.is_valid_at(self.clock.now(), self.expiry_margin)
    }

    async fn is_pending(&self, session_id: &str) -> bool {
        let now = self.clock.now();
        let ttl = self.cache.session_ttl();
        self.pending
            .lock()
            .await
            .get(session_id)
            .is_some_and(|started_at| now - *started_at <= ttl)
    }

    /// Number of sessions waiting for their callback, abandoned ones included
    /// until the next `begin_authorization` evicts them.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Number of sessions with a refresh guard allocated.
    pub async fn refresh_guard_count(&self) -> usize {
        self.refresh_guards.lock().await.len()
    }

    async fn refresh_guard(&self, session_id: &str) -> Arc<Mutex<()>> {
        let mut guards = self.refresh_guards.lock().await;
        guards
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drops the session's guard once no other request holds a handle to it.
    async fn release_guard(&self, session_id: &str, guard: Arc<Mutex<()>>) {
        let mut guards = self.refresh_guards.lock().await;
        drop(guard);
        if guards
            .get(session_id)
            .is_some_and(|shared| Arc::strong_count(shared) == 1)
        {
            guards.remove(session_id);
        }
    }
}
