//! GitHub REST client for pull requests and releases.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::http::{build_client, check_status, decode, trim_base_url};
use crate::{
    Backend, ChangeRequest, MergeStatus, NewChangeRequest, ProviderClient, ReleaseArtifact,
    ScmError,
};

/// Public GitHub API.
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// GitHub client scoped to one repository.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    api_url: String,
    owner: String,
    repo: String,
}

#[derive(Debug, Serialize)]
struct CreatePullRequest<'a> {
    title: &'a str,
    body: &'a str,
    head: &'a str,
    base: &'a str,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    number: u64,
    #[serde(default)]
    mergeable: Option<bool>,
    #[serde(default)]
    merged: bool,
    #[serde(default)]
    html_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct MergePullRequest {
    commit_title: String,
}

#[derive(Debug, Deserialize)]
struct MergeResult {
    #[serde(default)]
    merged: bool,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateRelease<'a> {
    tag_name: &'a str,
    name: &'a str,
    body: &'a str,
    target_commitish: &'a str,
    prerelease: bool,
}

impl GitHubClient {
    /// Create a client for `owner/repo`.
    ///
    /// # Errors
    ///
    /// Returns [`ScmError::Configuration`] if the token cannot be used as a
    /// header value or the HTTP client cannot be created.
    pub fn new(
        api_url: &str,
        token: &str,
        owner: &str,
        repo: &str,
        timeout: Duration,
    ) -> Result<Self, ScmError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ScmError::Configuration("GitHub token is not a valid header".into()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("release-dashboard/0.2"));
        headers.insert(AUTHORIZATION, auth);

        Ok(Self {
            client: build_client(Backend::GitHub, headers, timeout)?,
            api_url: trim_base_url(api_url),
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    fn repo_url(&self, path: &str) -> String {
        format!("{}/repos/{}/{}{path}", self.api_url, self.owner, self.repo)
    }
}

#[async_trait]
impl ProviderClient for GitHubClient {
    fn backend(&self) -> Backend {
        Backend::GitHub
    }

    fn requires_mergeability_poll(&self) -> bool {
        false
    }

    async fn create_change_request(
        &self,
        request: &NewChangeRequest,
    ) -> Result<ChangeRequest, ScmError> {
        info!(repo = %self.repo, head = %request.head, base = %request.base, "Creating pull request");

        let body = CreatePullRequest {
            title: &request.title,
            body: &request.body,
            head: &request.head,
            base: &request.base,
        };
        let response = self
            .client
            .post(self.repo_url("/pulls"))
            .json(&body)
            .send()
            .await?;
        let response = check_status(Backend::GitHub, response).await?;
        let pull: PullRequest = decode(Backend::GitHub, response).await?;

        debug!(repo = %self.repo, number = pull.number, "Pull request created");
        Ok(ChangeRequest {
            id: pull.number,
            status: MergeStatus::from_github(pull.mergeable, pull.merged),
            web_url: pull.html_url,
        })
    }

    async fn query_mergeability(&self, id: u64) -> Result<MergeStatus, ScmError> {
        let response = self
            .client
            .get(self.repo_url(&format!("/pulls/{id}")))
            .send()
            .await?;
        let response = check_status(Backend::GitHub, response).await?;
        let pull: PullRequest = decode(Backend::GitHub, response).await?;

        let status = MergeStatus::from_github(pull.mergeable, pull.merged);
        debug!(repo = %self.repo, number = id, ?status, "Pull request mergeability");
        Ok(status)
    }

    async fn merge_change_request(&self, id: u64) -> Result<bool, ScmError> {
        info!(repo = %self.repo, number = id, "Merging pull request");

        let body = MergePullRequest {
            commit_title: format!("Merging pull request number {id}"),
        };
        let response = self
            .client
            .put(self.repo_url(&format!("/pulls/{id}/merge")))
            .json(&body)
            .send()
            .await?;

        // 405: not mergeable, 409: head moved. GitHub answered, it just declined.
        let status = response.status();
        if status == StatusCode::METHOD_NOT_ALLOWED || status == StatusCode::CONFLICT {
            let text = response.text().await.unwrap_or_default();
            warn!(repo = %self.repo, number = id, status = %status, body = %text, "Pull request not merged");
            return Ok(false);
        }

        let response = check_status(Backend::GitHub, response).await?;
        let result: MergeResult = decode(Backend::GitHub, response).await?;
        if !result.merged {
            warn!(
                repo = %self.repo,
                number = id,
                reason = result.message.as_deref().unwrap_or_default(),
                "Pull request not merged"
            );
        }
        Ok(result.merged)
    }

    async fn create_release(&self, release: &ReleaseArtifact) -> Result<(), ScmError> {
        info!(repo = %self.repo, tag = %release.tag_name, "Creating release");

        let body = CreateRelease {
            tag_name: &release.tag_name,
            name: &release.name,
            body: &release.body,
            target_commitish: &release.target,
            prerelease: false,
        };
        let response = self
            .client
            .post(self.repo_url("/releases"))
            .json(&body)
            .send()
            .await?;
        check_status(Backend::GitHub, response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_url_trims_trailing_slash() {
        let client = GitHubClient::new(
            "https://github.example.com/api/v3/",
            "token",
            "acme",
            "svc",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            client.repo_url("/pulls"),
            "https://github.example.com/api/v3/repos/acme/svc/pulls"
        );
    }

    #[test]
    fn test_rejects_token_with_newline() {
        let result = GitHubClient::new(GITHUB_API_URL, "bad\ntoken", "acme", "svc", Duration::from_secs(5));
        assert!(matches!(result, Err(ScmError::Configuration(_))));
    }
}
