//! Wire types for the subset of the GitHub REST API in use.

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct RepositoryInfo {
    pub default_branch: String,
}

#[derive(Debug, Deserialize)]
pub struct RefObject {
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub struct Ref {
    pub object: RefObject,
}

#[derive(Debug, Serialize)]
pub struct CreateRef<'a> {
    #[serde(rename = "ref")]
    pub name: &'a str,
    pub sha: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ContentInfo {
    pub sha: String,
}

#[derive(Debug, Serialize)]
pub struct PutContent<'a> {
    pub message: &'a str,
    pub branch: &'a str,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub struct CommitInfo {
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub struct PutContentResponse {
    pub commit: CommitInfo,
}

#[derive(Debug, Serialize)]
pub struct CreatePullRequest<'a> {
    pub title: &'a str,
    pub body: &'a str,
    pub head: &'a str,
    pub base: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct PullRequest {
    pub number: u64,
}

#[derive(Debug, Deserialize)]
pub struct PullRequestRef {
    pub number: u64,
}

#[derive(Debug, Deserialize)]
pub struct Run {
    pub name: String,
    pub event: String,
    pub conclusion: Option<String>,
    #[serde(default)]
    pub pull_requests: Vec<PullRequestRef>,
}

#[derive(Debug, Deserialize)]
pub struct RunList {
    #[serde(default)]
    pub workflow_runs: Vec<Run>,
}

#[derive(Debug, Serialize)]
pub struct MergeRequest<'a> {
    pub merge_method: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct MergeResponse {
    pub sha: String,
}

#[derive(Debug, Serialize)]
pub struct CommentRequest<'a> {
    pub body: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct Tag {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub prerelease: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_workflow_runs() {
        let json = r#"{
            "total_count": 2,
            "workflow_runs": [
                {"name": "CI", "event": "pull_request", "conclusion": null,
                 "status": "in_progress", "pull_requests": [{"number": 7, "url": "x"}]},
                {"name": "Lint", "event": "push", "conclusion": "success"}
            ]
        }"#;
        let runs: RunList = serde_json::from_str(json).unwrap();
        assert_eq!(runs.workflow_runs.len(), 2);
        assert_eq!(runs.workflow_runs[0].conclusion, None);
        assert_eq!(runs.workflow_runs[0].pull_requests[0].number, 7);
        assert!(runs.workflow_runs[1].pull_requests.is_empty());
    }

    #[test]
    fn put_content_omits_missing_sha() {
        let body = PutContent {
            message: "m",
            branch: "b",
            content: "YQ==".into(),
            sha: None,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("sha").is_none());
    }
}
