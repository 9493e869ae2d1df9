use crate::agents::check_waiter::{CheckVerdict, CheckWaiter, Clock, WaitPolicy};
use crate::changes::ChangedFile;
use crate::error::{PipupError, Result};
use crate::repository::RemoteRepository;
use jiff::Timestamp;
use std::fmt;

/// Where a delivery run currently is. Runs move strictly forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStage {
    Idle,
    BranchCreated,
    Committing,
    PullRequestOpen,
    AwaitingChecks,
    Merged,
    Rejected,
    Done,
}

impl fmt::Display for DeliveryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeliveryStage::Idle => "idle",
            DeliveryStage::BranchCreated => "branch created",
            DeliveryStage::Committing => "committing",
            DeliveryStage::PullRequestOpen => "pull request open",
            DeliveryStage::AwaitingChecks => "awaiting checks",
            DeliveryStage::Merged => "merged",
            DeliveryStage::Rejected => "rejected",
            DeliveryStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Working memory of one delivery run.
#[derive(Debug, Clone)]
pub struct DeliveryState {
    pub stage: DeliveryStage,
    pub branch: String,
    pub base_branch: String,
    pub base_sha: String,
    pub last_commit: Option<String>,
}

impl DeliveryState {
    fn advance(&mut self, stage: DeliveryStage) {
        tracing::debug!("[{}] {} -> {}", self.branch, self.stage, stage);
        self.stage = stage;
    }

    fn branch_ref(&self) -> String {
        format!("refs/heads/{}", self.branch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// No file carried a real change; the branch was removed again.
    NothingToDeliver,
    Merged {
        pull_request: u64,
        sha: String,
        tag: Option<String>,
    },
    /// Required checks failed; the branch was deleted and nothing merged.
    Rejected {
        pull_request: u64,
        failed_checks: Vec<String>,
    },
}

/// DeliveryAgent turns changed files into a CI-gated pull request:
/// branch, one commit per file, pull request, check wait, then merge or
/// reject.
pub struct DeliveryAgent<'a> {
    remote: &'a dyn RemoteRepository,
    clock: &'a dyn Clock,
    required_checks: Vec<String>,
    policy: WaitPolicy,
    auto_tag: bool,
}

impl<'a> DeliveryAgent<'a> {
    pub fn new(
        remote: &'a dyn RemoteRepository,
        clock: &'a dyn Clock,
        required_checks: Vec<String>,
    ) -> Self {
        Self {
            remote,
            clock,
            required_checks,
            policy: WaitPolicy::default(),
            auto_tag: false,
        }
    }

    pub fn with_policy(mut self, policy: WaitPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_auto_tag(mut self, auto_tag: bool) -> Self {
        self.auto_tag = auto_tag;
        self
    }

    pub fn deliver(&self, files: &[ChangedFile]) -> Result<DeliveryOutcome> {
        let mut state = self.create_branch()?;

        state.advance(DeliveryStage::Committing);
        let mut total_changes = 0;
        let mut body = String::new();
        for file in files.iter().filter(|f| f.has_changes()) {
            let path = remote_path(file);
            let summary = file.summary();
            let detail = file.detail();
            tracing::info!(" - {path}");
            tracing::debug!("  Using commit summary: {summary}");
            tracing::debug!("  Using commit description: {detail}");

            let previous_sha = self.remote.file_sha(&path, &state.branch)?;
            let message = if detail.is_empty() {
                summary
            } else {
                format!("{summary}\n{detail}")
            };
            let commit = self.remote.put_file(
                &path,
                &state.branch,
                &file.contents(),
                &message,
                previous_sha.as_deref(),
            )?;

            state.last_commit = Some(commit);
            total_changes += file.change_count();
            body.push_str(&format!("{path}:\n{detail}\n"));
        }

        let Some(last_commit) = state.last_commit.clone() else {
            tracing::info!("No changed files to deliver, removing {}", state.branch);
            self.remote.delete_ref(&state.branch_ref())?;
            state.advance(DeliveryStage::Done);
            return Ok(DeliveryOutcome::NothingToDeliver);
        };

        let title = pull_request_title(total_changes);
        tracing::info!("Creating pull request for {}", state.branch);
        let number = self.remote.create_pull_request(
            &title,
            body.trim(),
            &state.branch,
            &state.base_branch,
        )?;
        state.advance(DeliveryStage::PullRequestOpen);

        state.advance(DeliveryStage::AwaitingChecks);
        tracing::info!("Waiting for workflows to complete on {}", state.branch);
        let waiter = CheckWaiter::new(self.remote, self.clock, self.policy);
        let verdict = match waiter.wait(&state.branch, number, &self.required_checks) {
            Ok(verdict) => verdict,
            Err(err @ PipupError::ChecksTimedOut(_)) => {
                self.discard_branch(&state);
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        let outcome = match verdict {
            CheckVerdict::Passed => {
                tracing::info!("Merging pull request {number}");
                let sha = self.remote.merge_pull_request(number)?;
                state.advance(DeliveryStage::Merged);
                let tag = if self.auto_tag {
                    self.tag_release(&sha)?
                } else {
                    None
                };
                DeliveryOutcome::Merged {
                    pull_request: number,
                    sha,
                    tag,
                }
            }
            CheckVerdict::Failed(failed_checks) => {
                tracing::error!("Workflow(s) failed: {}", failed_checks.join(", "));
                tracing::info!("Closing failed pull request {number}");
                let comment = format!("Expected workflow ({}) failed", failed_checks.join(", "));
                if let Err(err) = self.remote.create_commit_comment(&last_commit, &comment) {
                    tracing::warn!("Failed to create commit comment: {err}");
                }
                self.remote.delete_ref(&state.branch_ref())?;
                state.advance(DeliveryStage::Rejected);
                DeliveryOutcome::Rejected {
                    pull_request: number,
                    failed_checks,
                }
            }
        };

        state.advance(DeliveryStage::Done);
        Ok(outcome)
    }

    fn create_branch(&self) -> Result<DeliveryState> {
        let base_branch = self.remote.default_branch()?;
        let base_sha = self.remote.branch_sha(&base_branch)?.ok_or_else(|| {
            tracing::error!("Failed to get head ref");
            PipupError::DeliveryPrecondition(format!("head ref refs/heads/{base_branch} not found"))
        })?;

        let mut state = DeliveryState {
            stage: DeliveryStage::Idle,
            branch: generate_branch_name(),
            base_branch,
            base_sha,
            last_commit: None,
        };

        tracing::info!("Delivering updates using {}", state.branch);
        self.remote.create_ref(&state.branch_ref(), &state.base_sha)?;
        state.advance(DeliveryStage::BranchCreated);
        Ok(state)
    }

    fn discard_branch(&self, state: &DeliveryState) {
        if let Err(err) = self.remote.delete_ref(&state.branch_ref()) {
            tracing::warn!("Failed to delete branch {}: {err}", state.branch);
        }
    }

    /// Tags `sha` with the next patch version above the highest semver tag.
    fn tag_release(&self, sha: &str) -> Result<Option<String>> {
        let Some(next) = next_patch_tag(&self.remote.tags()?) else {
            tracing::info!("No semver tags found, skipping auto-tag");
            return Ok(None);
        };

        tracing::info!("Tagging {sha} as {next}");
        self.remote.create_ref(&format!("refs/tags/{next}"), sha)?;
        Ok(Some(next))
    }
}

pub fn pull_request_title(changes: usize) -> String {
    let noun = if changes == 1 { "change" } else { "changes" };
    format!("pipup: {changes} {noun}")
}

/// `v<major>.<minor>.<patch+1>` for the highest tag that parses as semver
/// once a leading `v` is removed.
pub fn next_patch_tag(tags: &[String]) -> Option<String> {
    let highest = tags
        .iter()
        .filter_map(|tag| semver::Version::parse(tag.trim_start_matches('v')).ok())
        .max()?;
    Some(format!(
        "v{}.{}.{}",
        highest.major,
        highest.minor,
        highest.patch + 1
    ))
}

fn generate_branch_name() -> String {
    let now = Timestamp::now();
    format!(
        "pipup-{}-{:09}-{}",
        now.as_second(),
        now.subsec_nanosecond(),
        std::process::id()
    )
}

/// Repository paths always use forward slashes.
fn remote_path(file: &ChangedFile) -> String {
    file.path().to_string_lossy().replace('\\', "/")
}
