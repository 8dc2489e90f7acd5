use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde_json::Value;

use crate::{
    error::{Error, Result},
    spotify::DataApi,
    types::{ApiErrorResponse, RawItem, TimeRange},
    warning,
};

/// The `/me` endpoints of the Spotify Web API.
pub struct SpotifyDataApi {
    client: Client,
    api_url: String,
}

impl SpotifyDataApi {
    /// Creates a Web API client.
    ///
    /// # Arguments
    ///
    /// * `api_url` - Base URL without trailing slash, e.g. `https://api.spotify.com/v1`
    /// * `timeout` - Upper bound for each request
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the HTTP client cannot be built.
    pub fn new(api_url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Performs one authenticated GET request.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(body))` - Parsed JSON body of a successful response
    /// - `Ok(None)` - `204 No Content`, used by the player endpoints when
    ///   nothing is playing
    /// - `Err(Error::DataApi)` - Non-success status, transport failure or a
    ///   body that is not JSON
    ///
    /// # Rate Limiting
    ///
    /// A `429 Too Many Requests` answer keeps the `Retry-After` header on the
    /// returned error. The request is not retried here: backing off is up to
    /// the caller.
    async fn get(
        &self,
        access_token: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<Value>> {
        let api_url = format!("{uri}{path}", uri = self.api_url, path = path);

        let response = self
            .client
            .get(&api_url)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await
            .map_err(Error::from_data_transport)?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !status.is_success() {
            let err = api_error(response).await;
            warning!("Request to {} failed: {}", path, err);
            return Err(err);
        }

        let body = response.json::<Value>().await.map_err(|e| {
            Error::data_api(Some(status), format!("malformed response body: {}", e))
        })?;
        Ok(Some(body))
    }

    async fn get_items(
        &self,
        access_token: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<RawItem>> {
        let body = self.get(access_token, path, query).await?;
        Ok(take_items(body))
    }
}

impl DataApi for SpotifyDataApi {
    async fn fetch_profile(&self, access_token: &str) -> Result<RawItem> {
        let body = self.get(access_token, "/me", &[]).await?;
        Ok(body.unwrap_or(Value::Null))
    }

    async fn fetch_currently_playing(&self, access_token: &str) -> Result<Option<RawItem>> {
        let body = self
            .get(access_token, "/me/player/currently-playing", &[])
            .await?;

        // ads and some podcast episodes come back with a null item
        Ok(body
            .and_then(|mut playing| playing.get_mut("item").map(Value::take))
            .filter(|item| !item.is_null()))
    }

    async fn fetch_top_tracks(
        &self,
        access_token: &str,
        limit: u32,
        time_range: TimeRange,
    ) -> Result<Vec<RawItem>> {
        self.get_items(
            access_token,
            "/me/top/tracks",
            &[
                ("limit", limit.to_string()),
                ("time_range", time_range.to_string()),
            ],
        )
        .await
    }

    async fn fetch_top_artists(
        &self,
        access_token: &str,
        limit: u32,
        time_range: TimeRange,
    ) -> Result<Vec<RawItem>> {
        self.get_items(
            access_token,
            "/me/top/artists",
            &[
                ("limit", limit.to_string()),
                ("time_range", time_range.to_string()),
            ],
        )
        .await
    }

    async fn fetch_recently_played(&self, access_token: &str, limit: u32) -> Result<Vec<RawItem>> {
        self.get_items(
            access_token,
            "/me/player/recently-played",
            &[("limit", limit.to_string())],
        )
        .await
    }
}

/// Pulls the `items` array out of a paging object. Anything else yields an
/// empty page.
fn take_items(body: Option<Value>) -> Vec<RawItem> {
    match body.and_then(|mut page| page.get_mut("items").map(Value::take)) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    }
}

async fn api_error(response: Response) -> Error {
    let status = response.status();

    // check for retry-after header
    let retry_after = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    let message = match response.json::<ApiErrorResponse>().await {
        Ok(body) => body.error.message,
        Err(_) => None,
    }
    .unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });

    Error::DataApi {
        status: Some(status.as_u16()),
        message,
        retry_after,
    }
}
