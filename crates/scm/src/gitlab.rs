//! GitLab REST client for merge requests and releases.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::http::{build_client, check_status, decode, trim_base_url};
use crate::{
    Backend, ChangeRequest, MergeStatus, NewChangeRequest, ProviderClient, ReleaseArtifact,
    ScmError,
};

/// Public GitLab API.
pub const GITLAB_API_URL: &str = "https://gitlab.com/api/v4";

/// GitLab client scoped to one project.
#[derive(Debug, Clone)]
pub struct GitLabClient {
    client: reqwest::Client,
    api_url: String,
    project_id: String,
}

#[derive(Debug, Serialize)]
struct CreateMergeRequest<'a> {
    title: &'a str,
    description: &'a str,
    source_branch: &'a str,
    target_branch: &'a str,
    remove_source_branch: bool,
    squash: bool,
}

#[derive(Debug, Deserialize)]
struct MergeRequest {
    iid: u64,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    merge_status: Option<String>,
    #[serde(default)]
    web_url: Option<String>,
}

impl MergeRequest {
    fn status(&self) -> MergeStatus {
        MergeStatus::from_gitlab(self.state.as_deref(), self.merge_status.as_deref())
    }
}

#[derive(Debug, Serialize)]
struct AcceptMergeRequest {
    merge_commit_message: String,
    squash: bool,
    should_remove_source_branch: bool,
}

#[derive(Debug, Serialize)]
struct CreateRelease<'a> {
    name: &'a str,
    tag_name: &'a str,
    description: &'a str,
    #[serde(rename = "ref")]
    git_ref: &'a str,
}

impl GitLabClient {
    /// Create a client for the project with the given ID or `namespace/path`.
    ///
    /// # Errors
    ///
    /// Returns [`ScmError::Configuration`] if the project ID is empty, the token
    /// cannot be used as a header value, or the HTTP client cannot be created.
    pub fn new(
        api_url: &str,
        token: &str,
        project_id: &str,
        timeout: Duration,
    ) -> Result<Self, ScmError> {
        if project_id.trim().is_empty() {
            return Err(ScmError::Configuration(
                "GitLab project id is required".into(),
            ));
        }

        let mut private_token = HeaderValue::from_str(token)
            .map_err(|_| ScmError::Configuration("GitLab token is not a valid header".into()))?;
        private_token.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("release-dashboard/0.2"));
        headers.insert("PRIVATE-TOKEN", private_token);

        Ok(Self {
            client: build_client(Backend::GitLab, headers, timeout)?,
            api_url: trim_base_url(api_url),
            project_id: project_id.trim().to_string(),
        })
    }

    fn project_url(&self, path: &str) -> String {
        format!(
            "{}/projects/{}{path}",
            self.api_url,
            urlencoding::encode(&self.project_id)
        )
    }
}

#[async_trait]
impl ProviderClient for GitLabClient {
    fn backend(&self) -> Backend {
        Backend::GitLab
    }

    fn requires_mergeability_poll(&self) -> bool {
        true
    }

    async fn create_change_request(
        &self,
        request: &NewChangeRequest,
    ) -> Result<ChangeRequest, ScmError> {
        info!(
            project = %self.project_id,
            source = %request.head,
            target = %request.base,
            "Creating merge request"
        );

        let body = CreateMergeRequest {
            title: &request.title,
            description: &request.body,
            source_branch: &request.head,
            target_branch: &request.base,
            remove_source_branch: true,
            squash: false,
        };
        let response = self
            .client
            .post(self.project_url("/merge_requests"))
            .json(&body)
            .send()
            .await?;
        let response = check_status(Backend::GitLab, response).await?;
        let merge_request: MergeRequest = decode(Backend::GitLab, response).await?;

        debug!(project = %self.project_id, iid = merge_request.iid, "Merge request created");
        Ok(ChangeRequest {
            id: merge_request.iid,
            status: merge_request.status(),
            web_url: merge_request.web_url,
        })
    }

    async fn query_mergeability(&self, id: u64) -> Result<MergeStatus, ScmError> {
        let response = self
            .client
            .get(self.project_url(&format!("/merge_requests/{id}")))
            .query(&[
                ("render_html", "false"),
                ("include_diverged_commits_count", "false"),
                ("include_rebase_in_progress", "false"),
            ])
            .send()
            .await?;
        let response = check_status(Backend::GitLab, response).await?;
        let merge_request: MergeRequest = decode(Backend::GitLab, response).await?;

        let status = merge_request.status();
        debug!(project = %self.project_id, iid = id, ?status, "Merge request mergeability");
        Ok(status)
    }

    async fn merge_change_request(&self, id: u64) -> Result<bool, ScmError> {
        info!(project = %self.project_id, iid = id, "Accepting merge request");

        let body = AcceptMergeRequest {
            merge_commit_message: format!("Merging merge request number {id}"),
            squash: false,
            should_remove_source_branch: true,
        };
        let response = self
            .client
            .put(self.project_url(&format!("/merge_requests/{id}/merge")))
            .json(&body)
            .send()
            .await?;

        // GitLab answers 405/406/409/422 when it declines to merge.
        let status = response.status();
        if matches!(
            status,
            StatusCode::METHOD_NOT_ALLOWED
                | StatusCode::NOT_ACCEPTABLE
                | StatusCode::CONFLICT
                | StatusCode::UNPROCESSABLE_ENTITY
        ) {
            let text = response.text().await.unwrap_or_default();
            warn!(project = %self.project_id, iid = id, status = %status, body = %text, "Merge request not merged");
            return Ok(false);
        }

        let response = check_status(Backend::GitLab, response).await?;
        let merge_request: MergeRequest = decode(Backend::GitLab, response).await?;
        let merged = merge_request.status() == MergeStatus::Merged;
        if !merged {
            warn!(
                project = %self.project_id,
                iid = id,
                state = merge_request.state.as_deref().unwrap_or_default(),
                "Merge request accepted but not merged"
            );
        }
        Ok(merged)
    }

    async fn create_release(&self, release: &ReleaseArtifact) -> Result<(), ScmError> {
        info!(project = %self.project_id, tag = %release.tag_name, "Creating release");

        let body = CreateRelease {
            name: &release.name,
            tag_name: &release.tag_name,
            description: &release.body,
            git_ref: &release.target,
        };
        let response = self
            .client
            .post(self.project_url("/releases"))
            .json(&body)
            .send()
            .await?;
        check_status(Backend::GitLab, response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_path_is_encoded() {
        let client =
            GitLabClient::new(GITLAB_API_URL, "token", "group/svc", Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.project_url("/releases"),
            "https://gitlab.com/api/v4/projects/group%2Fsvc/releases"
        );
    }

    #[test]
    fn test_requires_project_id() {
        let result = GitLabClient::new(GITLAB_API_URL, "token", "  ", Duration::from_secs(5));
        assert!(matches!(result, Err(ScmError::Configuration(_))));
    }
}
