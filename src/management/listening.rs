use std::sync::Arc;

use crate::{
    error::{Error, Result},
    management::AuthorizationCoordinator,
    spotify::{AuthorizationServer, DataApi},
    types::{ListeningPage, UserProfile, ViewItem, ViewKind},
    utils, views,
};

/// Serves the read views for a session: fresh token, validated parameters,
/// one Data API call, flattened items.
pub struct ListeningService<A, D> {
    auth: Arc<AuthorizationCoordinator<A>>,
    api: D,
}

impl<A: AuthorizationServer, D: DataApi> ListeningService<A, D> {
    pub fn new(auth: Arc<AuthorizationCoordinator<A>>, api: D) -> Self {
        Self { auth, api }
    }

    pub fn auth(&self) -> &AuthorizationCoordinator<A> {
        &self.auth
    }

    pub async fn profile(&self, session_id: &str) -> Result<UserProfile> {
        let token = self.auth.ensure_fresh_token(session_id).await?;
        let raw = self
            .settle(session_id, self.api.fetch_profile(&token.access_token).await)
            .await?;
        Ok(views::build_profile(&raw))
    }

    pub async fn currently_playing(&self, session_id: &str) -> Result<Option<ViewItem>> {
        let token = self.auth.ensure_fresh_token(session_id).await?;
        let raw = self
            .settle(
                session_id,
                self.api.fetch_currently_playing(&token.access_token).await,
            )
            .await?;
        Ok(raw.as_ref().map(views::build_track_view))
    }

    pub async fn top_tracks(
        &self,
        session_id: &str,
        raw_time_range: Option<&str>,
        raw_limit: Option<i64>,
    ) -> Result<ListeningPage> {
        let token = self.auth.ensure_fresh_token(session_id).await?;
        let query = utils::validate_query(raw_time_range, raw_limit);
        let items = self
            .settle(
                session_id,
                self.api
                    .fetch_top_tracks(&token.access_token, query.limit, query.time_range)
                    .await,
            )
            .await?;

        Ok(ListeningPage {
            time_range: Some(query.time_range),
            time_label: Some(query.label),
            limit: query.limit,
            items: views::build_page(ViewKind::Track, &items, query.limit).to_vec(),
        })
    }

    pub async fn top_artists(
        &self,
        session_id: &str,
        raw_time_range: Option<&str>,
        raw_limit: Option<i64>,
    ) -> Result<ListeningPage> {
        let token = self.auth.ensure_fresh_token(session_id).await?;
        let query = utils::validate_query(raw_time_range, raw_limit);
        let items = self
            .settle(
                session_id,
                self.api
                    .fetch_top_artists(&token.access_token, query.limit, query.time_range)
                    .await,
            )
            .await?;

        Ok(ListeningPage {
            time_range: Some(query.time_range),
            time_label: Some(query.label),
            limit: query.limit,
            items: views::build_page(ViewKind::Artist, &items, query.limit).to_vec(),
        })
    }

    pub async fn recently_played(
        &self,
        session_id: &str,
        raw_limit: Option<i64>,
    ) -> Result<ListeningPage> {
        let token = self.auth.ensure_fresh_token(session_id).await?;
        let limit = utils::validate_limit(raw_limit);
        let items = self
            .settle(
                session_id,
                self.api
                    .fetch_recently_played(&token.access_token, limit)
                    .await,
            )
            .await?;

        Ok(ListeningPage {
            time_range: None,
            time_label: None,
            limit,
            items: views::build_page(ViewKind::History, &items, limit).to_vec(),
        })
    }

    /// A 401 right after `ensure_fresh_token` means the grant was revoked:
    /// drop the token and report the session as unauthenticated.
    async fn settle<T>(&self, session_id: &str, result: Result<T>) -> Result<T> {
        match result {
            Err(Error::DataApi {
                status: Some(401), ..
            }) => {
                self.auth.invalidate(session_id).await;
                Err(Error::NotAuthenticated)
            }
            other => other,
        }
    }
}
