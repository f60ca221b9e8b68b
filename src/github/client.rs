//! GitHub REST client.

use super::auth::Credentials;
use super::models::{AuthenticatedUser, Commit, Release, RepositoryInfo};
use super::{SourceError, SourceProvider, zipball_url};
use crate::constants::{
    DOWNLOAD_TIMEOUT, GITHUB_ACCEPT, GITHUB_API_BASE, GITHUB_MAX_PER_PAGE, METADATA_TIMEOUT,
    user_agent,
};
use crate::core::RepoCoords;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

/// Client for `api.github.com` (or a compatible base URL).
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    api_base: String,
    credentials: Option<Credentials>,
}

impl GitHubClient {
    /// Build a client. Empty tokens are ignored.
    pub fn new(token: Option<String>) -> Result<Self, SourceError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
        let agent = HeaderValue::from_str(&user_agent())
            .map_err(|e| SourceError::Transport(format!("invalid user agent: {e}")))?;
        headers.insert(USER_AGENT, agent);

        let http = Client::builder()
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| SourceError::Transport(format!("failed to build HTTP client: {e}")))?;

        let credentials = token.filter(|t| !t.trim().is_empty()).map(Credentials::new);
        if let Some(creds) = &credentials {
            info!(token_type = %creds.kind(), token_prefix = %creds.masked(), "Using GitHub token");
        }

        Ok(Self {
            http,
            api_base: GITHUB_API_BASE.to_string(),
            credentials,
        })
    }

    /// Point the client at another API root (GitHub Enterprise, local test servers).
    #[must_use]
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn has_token(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(creds) => request.header(AUTHORIZATION, creds.authorization_header()),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, SourceError> {
        let url = format!("{}{}", self.api_base, endpoint);
        debug!(url = %url, has_token = self.has_token(), "GitHub API request");

        let request = self.authorized(self.http.get(&url).query(query).timeout(METADATA_TIMEOUT));
        let response = request.send().await.map_err(|e| {
            warn!(url = %url, error = %e, "GitHub API request failed");
            SourceError::Transport(e.to_string())
        })?;

        let status = response.status();
        log_rate_limit(endpoint, &response);

        if status.is_client_error() || status.is_server_error() {
            return Err(error_from_response(endpoint, status, response).await);
        }

        let body = response.text().await.map_err(|e| SourceError::Transport(e.to_string()))?;
        debug!(endpoint, status = status.as_u16(), body_length = body.len(), "GitHub API response");
        serde_json::from_str(&body).map_err(|e| SourceError::Decode(format!("{endpoint}: {e}")))
    }

    pub async fn repository_info(&self, repo: &RepoCoords) -> Result<RepositoryInfo, SourceError> {
        self.get_json(&format!("/repos/{}/{}", repo.owner, repo.name), &[]).await
    }

    /// The user owning the configured token.
    pub async fn authenticated_user(&self) -> Result<AuthenticatedUser, SourceError> {
        if !self.has_token() {
            return Err(SourceError::NoToken);
        }
        let user: AuthenticatedUser = self.get_json("/user", &[]).await?;
        info!(username = %user.login, account_type = ?user.account_type, "Authenticated user info retrieved");
        Ok(user)
    }

    /// Check the token by fetching the authenticated user; returns the login.
    pub async fn test_connection(&self) -> Result<String, SourceError> {
        self.authenticated_user().await.map(|user| user.login)
    }
}

fn log_rate_limit(endpoint: &str, response: &Response) {
    let header = |name: &str| {
        response.headers().get(name).and_then(|v| v.to_str().ok()).map(ToString::to_string)
    };
    let remaining = header("x-ratelimit-remaining");
    let limit = header("x-ratelimit-limit");

    match remaining.as_deref() {
        Some("0") => warn!(endpoint, limit = ?limit, "GitHub API rate limit reached"),
        Some(remaining) => debug!(endpoint, remaining, limit = ?limit, "GitHub API rate limit status"),
        None => {}
    }
}

async fn error_from_response(endpoint: &str, status: StatusCode, response: Response) -> SourceError {
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(ToString::to_string))
        .unwrap_or_else(|| "GitHub API request failed.".to_string());

    let excerpt: String = body.chars().take(500).collect();
    warn!(endpoint, status = status.as_u16(), message = %message, response_body = %excerpt, "GitHub API error");

    if status == StatusCode::NOT_FOUND {
        SourceError::not_found(endpoint.to_string())
    } else {
        SourceError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl SourceProvider for GitHubClient {
    async fn verify_repository(&self, repo: &RepoCoords) -> Result<bool, SourceError> {
        match self.repository_info(repo).await {
            Ok(_) => Ok(true),
            Err(SourceError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn latest_release(&self, repo: &RepoCoords) -> Result<Release, SourceError> {
        self.get_json(&format!("/repos/{}/{}/releases/latest", repo.owner, repo.name), &[]).await
    }

    async fn releases(&self, repo: &RepoCoords, limit: usize) -> Result<Vec<Release>, SourceError> {
        let per_page = limit.clamp(1, GITHUB_MAX_PER_PAGE);
        self.get_json(
            &format!("/repos/{}/{}/releases", repo.owner, repo.name),
            &[("per_page", per_page.to_string())],
        )
        .await
    }

    async fn latest_commit(&self, repo: &RepoCoords, branch: &str) -> Result<Commit, SourceError> {
        self.get_json(&format!("/repos/{}/{}/commits/{}", repo.owner, repo.name, branch), &[])
            .await
    }

    async fn recent_commits(
        &self,
        repo: &RepoCoords,
        branch: &str,
        limit: usize,
    ) -> Result<Vec<Commit>, SourceError> {
        let per_page = limit.clamp(1, GITHUB_MAX_PER_PAGE);
        self.get_json(
            &format!("/repos/{}/{}/commits", repo.owner, repo.name),
            &[("sha", branch.to_string()), ("per_page", per_page.to_string())],
        )
        .await
    }

    async fn download_archive(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        debug!(url, has_token = self.has_token(), "Downloading archive");
        let request = self.authorized(self.http.get(url).timeout(DOWNLOAD_TIMEOUT));
        let response = request.send().await.map_err(|e| SourceError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            warn!(url, status = status.as_u16(), "Archive download failed");
            return Err(SourceError::Api {
                status: status.as_u16(),
                message: "Failed to download archive.".to_string(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| SourceError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    fn archive_url(&self, repo: &RepoCoords, reference: &str) -> String {
        zipball_url(&self.api_base, repo, reference)
    }
}
