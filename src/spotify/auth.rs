use std::time::Duration;

use reqwest::{Client, Url};

use crate::{
    error::{Error, Result},
    spotify::AuthorizationServer,
    types::{TokenErrorResponse, TokenGrant},
};

/// Spotify's accounts service.
pub struct SpotifyAuthServer {
    client: Client,
    auth_url: String,
    token_url: String,
}

impl SpotifyAuthServer {
    /// Creates a client for the given authorize and token endpoints.
    ///
    /// # Arguments
    ///
    /// * `auth_url` - Consent page, e.g. `https://accounts.spotify.com/authorize`
    /// * `token_url` - Token endpoint, e.g. `https://accounts.spotify.com/api/token`
    /// * `timeout` - Upper bound for each token request
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the HTTP client cannot be built.
    pub fn new(auth_url: String, token_url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        Ok(Self {
            client,
            auth_url,
            token_url,
        })
    }

    /// Posts a grant request to the token endpoint.
    ///
    /// The client authenticates with HTTP Basic credentials. Error bodies of
    /// the form `{"error": "...", "error_description": "..."}` become the error
    /// message, so an already consumed code reads as
    /// `invalid_grant: Invalid authorization code`.
    async fn request_token(
        &self,
        form: &[(&str, &str)],
        client_id: &str,
        client_secret: &str,
    ) -> Result<TokenGrant> {
        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(client_id, Some(client_secret))
            .form(form)
            .send()
            .await
            .map_err(Error::from_auth_transport)?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<TokenErrorResponse>().await {
                Ok(body) => match body.error_description {
                    Some(description) => format!("{}: {}", body.error, description),
                    None => body.error,
                },
                Err(_) => status
                    .canonical_reason()
                    .unwrap_or("token request failed")
                    .to_string(),
            };
            return Err(Error::auth_exchange(Some(status), message));
        }

        response.json::<TokenGrant>().await.map_err(|e| {
            Error::auth_exchange(Some(status), format!("malformed token response: {}", e))
        })
    }
}

impl AuthorizationServer for SpotifyAuthServer {
    /// Builds the consent URL.
    ///
    /// `show_dialog=true` makes Spotify ask again even if the user approved
    /// the app before, so switching accounts after signing out works.
    fn build_authorize_url(
        &self,
        client_id: &str,
        redirect_uri: &str,
        scopes: &str,
        state: &str,
    ) -> Result<String> {
        let url = Url::parse_with_params(
            &self.auth_url,
            &[
                ("client_id", client_id),
                ("response_type", "code"),
                ("redirect_uri", redirect_uri),
                ("scope", scopes),
                ("state", state),
                ("show_dialog", "true"),
            ],
        )
        .map_err(|e| Error::Config(format!("invalid authorize URL {}: {}", self.auth_url, e)))?;

        Ok(url.to_string())
    }

    async fn exchange_code(
        &self,
        code: &str,
        client_id: &str,
        client_secret: &str,
        redirect_uri: &str,
    ) -> Result<TokenGrant> {
        self.request_token(
            &[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
            ],
            client_id,
            client_secret,
        )
        .await
    }

    async fn refresh(
        &self,
        refresh_token: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<TokenGrant> {
        self.request_token(
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ],
            client_id,
            client_secret,
        )
        .await
    }
}
