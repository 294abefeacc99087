//! GitHub REST endpoints used by the publisher.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

use crate::contract::{NewPullRequest, PullRequestApi, PullRequestHandle};
use crate::error::PublishError;

const USER_AGENT: &str = concat!("emoji-map-sync/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";

#[derive(Deserialize)]
struct RepositoryBody {
    default_branch: String,
}

#[derive(Deserialize)]
struct PullRequestBody {
    number: u64,
    html_url: String,
    head: HeadBody,
}

#[derive(Deserialize)]
struct HeadBody {
    #[serde(rename = "ref")]
    branch: String,
    #[serde(default)]
    sha: String,
}

#[derive(Serialize)]
struct BodyUpdate<'a> {
    body: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl From<PullRequestBody> for PullRequestHandle {
    fn from(body: PullRequestBody) -> Self {
        PullRequestHandle {
            branch: body.head.branch,
            number: body.number,
            url: body.html_url,
            created: false,
            commit: body.head.sha,
        }
    }
}

/// Pull request API of one GitHub repository.
pub struct GitHubClient {
    client: reqwest::Client,
    api_base: String,
    owner: String,
    repo: String,
    token: String,
}

impl GitHubClient {
    pub fn new(
        api_base: &str,
        owner: impl Into<String>,
        repo: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, PublishError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .map_err(PublishError::Request)?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            owner: owner.into(),
            repo: repo.into(),
            token: token.into(),
        })
    }

    fn repo_url(&self, suffix: &str) -> String {
        format!("{}/repos/{}/{}{}", self.api_base, self.owner, self.repo, suffix)
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    /// Turn a non-success answer into [`PublishError::Api`], keeping
    /// GitHub's `message` when there is one.
    async fn check(endpoint: &str, response: Response) -> Result<Response, PublishError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.message)
            .unwrap_or(text);
        error!(endpoint, status = status.as_u16(), %message, "GitHub API request failed");
        Err(PublishError::Api {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl PullRequestApi for GitHubClient {
    async fn default_branch(&self) -> Result<String, PublishError> {
        let url = self.repo_url("");
        let response = self
            .request(reqwest::Method::GET, &url)
            .send()
            .await
            .map_err(PublishError::Request)?;
        let body: RepositoryBody = Self::check(&url, response)
            .await?
            .json()
            .await
            .map_err(PublishError::Request)?;
        debug!(default_branch = %body.default_branch, "Resolved default branch");
        Ok(body.default_branch)
    }

    async fn find_open(&self, branch: &str) -> Result<Option<PullRequestHandle>, PublishError> {
        let url = self.repo_url("/pulls");
        let head = format!("{}:{}", self.owner, branch);
        let response = self
            .request(reqwest::Method::GET, &url)
            .query(&[("state", "open"), ("head", head.as_str())])
            .send()
            .await
            .map_err(PublishError::Request)?;
        let pulls: Vec<PullRequestBody> = Self::check(&url, response)
            .await?
            .json()
            .await
            .map_err(PublishError::Request)?;

        let found = pulls
            .into_iter()
            .find(|pr| pr.head.branch == branch)
            .map(PullRequestHandle::from);
        match &found {
            Some(pr) => info!(number = pr.number, url = %pr.url, "Found open pull request"),
            None => debug!(branch, "No open pull request for branch"),
        }
        Ok(found)
    }

    async fn open(&self, request: &NewPullRequest) -> Result<PullRequestHandle, PublishError> {
        let url = self.repo_url("/pulls");
        let response = self
            .request(reqwest::Method::POST, &url)
            .json(request)
            .send()
            .await
            .map_err(PublishError::Request)?;
        let response = Self::check(&url, response).await?;
        if response.status() != StatusCode::CREATED {
            debug!(status = response.status().as_u16(), "Unexpected success status creating pull request");
        }
        let body: PullRequestBody = response.json().await.map_err(PublishError::Request)?;
        let mut handle = PullRequestHandle::from(body);
        handle.created = true;
        info!(number = handle.number, url = %handle.url, "Opened pull request");
        Ok(handle)
    }

    async fn update_body(&self, number: u64, body: &str) -> Result<(), PublishError> {
        let url = self.repo_url(&format!("/pulls/{number}"));
        let response = self
            .request(reqwest::Method::PATCH, &url)
            .json(&BodyUpdate { body })
            .send()
            .await
            .map_err(PublishError::Request)?;
        Self::check(&url, response).await?;
        debug!(number, "Updated pull request description");
        Ok(())
    }
}
