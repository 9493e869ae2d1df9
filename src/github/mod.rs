pub mod api;

use crate::error::{PipupError, Result};
use crate::repository::{RemoteRepository, WorkflowRun};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Method;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::LINK;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const PAGE_SIZE: &str = "100";
const MERGE_METHOD: &str = "rebase";

/// Thin blocking client for the GitHub REST API.
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    api_base: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(api_base: impl Into<String>, token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("pipup/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PipupError::request("github client", e))?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    /// Reads `GITHUB_API_URL` and `GITHUB_TOKEN` from the environment.
    pub fn from_env() -> Result<Self> {
        let api_base =
            std::env::var("GITHUB_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Self::new(api_base, std::env::var("GITHUB_TOKEN").ok())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header("Accept", "application/vnd.github+json");
        match &self.token {
            Some(token) => builder.header("Authorization", format!("token {token}")),
            None => builder,
        }
    }

    fn send(&self, builder: RequestBuilder, url: &str) -> Result<Response> {
        tracing::debug!("GitHub request: {url}");
        builder.send().map_err(|e| PipupError::request(url, e))
    }

    fn ensure_success(response: Response, url: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(PipupError::Transport {
                url: url.to_string(),
                status: status.as_u16(),
            })
        }
    }

    fn decode<T: DeserializeOwned>(response: Response, url: &str) -> Result<T> {
        response
            .json::<T>()
            .map_err(|e| PipupError::invalid_response(url, e))
    }

    pub fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = self.url(path);
        let response = self.send(self.request(Method::GET, &url).query(query), &url)?;
        Self::decode(Self::ensure_success(response, &url)?, &url)
    }

    /// Like [`get_json`](Self::get_json) but maps 404 to `None`.
    pub fn get_optional_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<T>> {
        let url = self.url(path);
        let response = self.send(self.request(Method::GET, &url).query(query), &url)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::decode(Self::ensure_success(response, &url)?, &url).map(Some)
    }

    /// Collects every page of a list endpoint by following `Link: rel="next"`.
    pub fn get_all_pages<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let mut url = self.url(path);
        let mut builder = self.request(Method::GET, &url).query(query);
        let mut items = Vec::new();

        loop {
            let response = Self::ensure_success(self.send(builder, &url)?, &url)?;
            let next = response
                .headers()
                .get(LINK)
                .and_then(|value| value.to_str().ok())
                .and_then(next_page_url);
            let page: Vec<T> = Self::decode(response, &url)?;
            items.extend(page);

            match next {
                Some(next) => {
                    url = next;
                    builder = self.request(Method::GET, &url);
                }
                None => return Ok(items),
            }
        }
    }

    pub fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.url(path);
        let response = self.send(self.request(method, &url).json(body), &url)?;
        Self::decode(Self::ensure_success(response, &url)?, &url)
    }

    pub fn send_without_response<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<()> {
        let url = self.url(path);
        let mut builder = self.request(method, &url);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        Self::ensure_success(self.send(builder, &url)?, &url)?;
        Ok(())
    }

    /// Every tag of `org/repo`, as returned by the API (newest first).
    pub fn repository_tags(&self, org: &str, repo: &str) -> Result<Vec<api::Tag>> {
        self.get_all_pages(&format!("repos/{org}/{repo}/tags"), &[("per_page", PAGE_SIZE)])
    }

    pub fn repository_releases(&self, org: &str, repo: &str) -> Result<Vec<api::Release>> {
        self.get_all_pages(
            &format!("repos/{org}/{repo}/releases"),
            &[("per_page", PAGE_SIZE)],
        )
    }
}

/// Target of the `rel="next"` entry of a `Link` header, if any.
pub fn next_page_url(link: &str) -> Option<String> {
    link.split(',').find_map(|entry| {
        let (target, params) = entry.split_once(';')?;
        let is_next = params
            .split(';')
            .any(|param| param.trim().eq_ignore_ascii_case(r#"rel="next""#));
        let target = target.trim().strip_prefix('<')?.strip_suffix('>')?;
        is_next.then(|| target.to_string())
    })
}

/// [`RemoteRepository`] backed by one `owner/name` GitHub repository.
pub struct GitHubRepository {
    client: GitHubClient,
    repository: String,
}

impl GitHubRepository {
    pub fn new(client: GitHubClient, repository: impl Into<String>) -> Result<Self> {
        let repository = repository.into();
        let valid = repository
            .split_once('/')
            .is_some_and(|(owner, name)| {
                !owner.is_empty() && !name.is_empty() && !name.contains('/')
            });
        if !valid {
            return Err(PipupError::ProjectValidation(format!(
                "Repository must be in owner/name form, got '{repository}'"
            )));
        }
        Ok(Self { client, repository })
    }

    pub fn name(&self) -> &str {
        &self.repository
    }

    fn path(&self, suffix: &str) -> String {
        format!("repos/{}/{}", self.repository, suffix)
    }
}

impl RemoteRepository for GitHubRepository {
    fn default_branch(&self) -> Result<String> {
        let info: api::RepositoryInfo = self
            .client
            .get_json(&format!("repos/{}", self.repository), &[])?;
        Ok(info.default_branch)
    }

    fn branch_sha(&self, branch: &str) -> Result<Option<String>> {
        let head: Option<api::Ref> = self
            .client
            .get_optional_json(&self.path(&format!("git/ref/heads/{branch}")), &[])?;
        Ok(head.map(|r| r.object.sha))
    }

    fn create_ref(&self, name: &str, sha: &str) -> Result<()> {
        let _: serde_json::Value = self.client.send_json(
            Method::POST,
            &self.path("git/refs"),
            &api::CreateRef { name, sha },
        )?;
        Ok(())
    }

    fn delete_ref(&self, name: &str) -> Result<()> {
        let short = name.strip_prefix("refs/").unwrap_or(name);
        self.client.send_without_response::<()>(
            Method::DELETE,
            &self.path(&format!("git/refs/{short}")),
            None,
        )
    }

    fn file_sha(&self, path: &str, branch: &str) -> Result<Option<String>> {
        let info: Option<api::ContentInfo> = self
            .client
            .get_optional_json(&self.path(&format!("contents/{path}")), &[("ref", branch)])?;
        Ok(info.map(|i| i.sha))
    }

    fn put_file(
        &self,
        path: &str,
        branch: &str,
        contents: &str,
        message: &str,
        previous_sha: Option<&str>,
    ) -> Result<String> {
        let response: api::PutContentResponse = self.client.send_json(
            Method::PUT,
            &self.path(&format!("contents/{path}")),
            &api::PutContent {
                message,
                branch,
                content: BASE64.encode(contents.as_bytes()),
                sha: previous_sha,
            },
        )?;
        Ok(response.commit.sha)
    }

    fn create_pull_request(
        &self,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> Result<u64> {
        let pull: api::PullRequest = self.client.send_json(
            Method::POST,
            &self.path("pulls"),
            &api::CreatePullRequest {
                title,
                body,
                head,
                base,
            },
        )?;
        Ok(pull.number)
    }

    fn workflow_runs(&self, branch: &str) -> Result<Vec<WorkflowRun>> {
        let runs: api::RunList = self.client.get_json(
            &self.path("actions/runs"),
            &[("branch", branch), ("per_page", PAGE_SIZE)],
        )?;
        Ok(runs
            .workflow_runs
            .into_iter()
            .map(|run| WorkflowRun {
                name: run.name,
                event: run.event,
                conclusion: run.conclusion,
                pull_requests: run.pull_requests.into_iter().map(|p| p.number).collect(),
            })
            .collect())
    }

    fn merge_pull_request(&self, number: u64) -> Result<String> {
        let merged: api::MergeResponse = self.client.send_json(
            Method::PUT,
            &self.path(&format!("pulls/{number}/merge")),
            &api::MergeRequest {
                merge_method: MERGE_METHOD,
            },
        )?;
        Ok(merged.sha)
    }

    fn create_commit_comment(&self, sha: &str, body: &str) -> Result<()> {
        self.client.send_without_response(
            Method::POST,
            &self.path(&format!("commits/{sha}/comments")),
            Some(&api::CommentRequest { body }),
        )
    }

    fn tags(&self) -> Result<Vec<String>> {
        let (org, repo) = self
            .repository
            .split_once('/')
            .unwrap_or((self.repository.as_str(), ""));
        Ok(self
            .client
            .repository_tags(org, repo)?
            .into_iter()
            .map(|t| t.name)
            .collect())
    }
}
