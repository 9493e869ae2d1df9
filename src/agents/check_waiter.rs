use crate::error::{PipupError, Result};
use crate::repository::{RemoteRepository, WorkflowRun};
use crate::settings::Settings;
use std::collections::HashMap;
use std::time::Duration;

const SUCCESS: &str = "success";
const PULL_REQUEST_EVENT: &str = "pull_request";

/// Source of waiting between polls.
pub trait Clock {
    fn sleep(&self, duration: Duration);
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// How long and how often to poll. `timeout: None` waits indefinitely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub interval: Duration,
    pub timeout: Option<Duration>,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: None,
        }
    }
}

impl WaitPolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            interval: settings.check_interval(),
            timeout: settings.check_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckVerdict {
    Passed,
    /// Names of the required checks that concluded with anything but success.
    Failed(Vec<String>),
}

/// Polls workflow runs until every required check attached to a pull
/// request has concluded.
pub struct CheckWaiter<'a> {
    remote: &'a dyn RemoteRepository,
    clock: &'a dyn Clock,
    policy: WaitPolicy,
}

impl<'a> CheckWaiter<'a> {
    pub fn new(remote: &'a dyn RemoteRepository, clock: &'a dyn Clock, policy: WaitPolicy) -> Self {
        Self {
            remote,
            clock,
            policy,
        }
    }

    pub fn wait(&self, branch: &str, pull_request: u64, required: &[String]) -> Result<CheckVerdict> {
        if required.is_empty() {
            tracing::info!("No required checks configured");
            return Ok(CheckVerdict::Passed);
        }

        let mut waited = Duration::ZERO;
        loop {
            let runs = self.remote.workflow_runs(branch)?;
            let conclusions = latest_conclusions(&runs, pull_request);

            let pending: Vec<&String> = required
                .iter()
                .filter(|name| {
                    !matches!(conclusions.get(&name.to_lowercase()), Some(Some(_)))
                })
                .collect();

            if pending.is_empty() {
                let failed: Vec<String> = required
                    .iter()
                    .filter(|name| {
                        !matches!(
                            conclusions.get(&name.to_lowercase()),
                            Some(Some(conclusion)) if *conclusion == SUCCESS
                        )
                    })
                    .cloned()
                    .collect();

                return Ok(if failed.is_empty() {
                    CheckVerdict::Passed
                } else {
                    CheckVerdict::Failed(failed)
                });
            }

            if let Some(timeout) = self.policy.timeout.filter(|timeout| waited >= *timeout) {
                return Err(PipupError::ChecksTimedOut(timeout));
            }

            tracing::debug!(
                "Waiting {:?} for {} check(s): {}",
                self.policy.interval,
                pending.len(),
                pending
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            self.clock.sleep(self.policy.interval);
            waited += self.policy.interval;
        }
    }
}

/// Lower-cased run name to conclusion for runs triggered by the given pull
/// request. The API lists newest runs first, so the first run seen per name
/// wins; `None` means it is still in progress.
fn latest_conclusions(runs: &[WorkflowRun], pull_request: u64) -> HashMap<String, Option<&str>> {
    let mut conclusions = HashMap::new();
    for run in runs {
        if run.event != PULL_REQUEST_EVENT || !run.pull_requests.contains(&pull_request) {
            continue;
        }
        conclusions
            .entry(run.name.to_lowercase())
            .or_insert(run.conclusion.as_deref());
    }
    conclusions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{FakeRemote, run};
    use std::cell::RefCell;

    #[derive(Default)]
    struct FakeClock {
        sleeps: RefCell<Vec<Duration>>,
    }

    impl Clock for FakeClock {
        fn sleep(&self, duration: Duration) {
            self.sleeps.borrow_mut().push(duration);
        }
    }

    fn required(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn wait(remote: &FakeRemote, clock: &FakeClock, policy: WaitPolicy) -> Result<CheckVerdict> {
        CheckWaiter::new(remote, clock, policy).wait(
            "pipup-branch",
            42,
            &required(&["CI", "Lint"]),
        )
    }

    #[test]
    fn polls_until_every_required_check_concludes() {
        let remote = FakeRemote::new().with_runs(vec![
            vec![],
            vec![run("ci", None, 42), run("lint", Some("success"), 42)],
            vec![run("CI", Some("success"), 42), run("Lint", Some("success"), 42)],
        ]);
        let clock = FakeClock::default();

        let verdict = wait(&remote, &clock, WaitPolicy::default()).unwrap();

        assert_eq!(verdict, CheckVerdict::Passed);
        assert_eq!(remote.run_polls.get(), 3);
        assert_eq!(*clock.sleeps.borrow(), vec![Duration::from_secs(5); 2]);
    }

    #[test]
    fn reports_failed_checks() {
        let remote = FakeRemote::new().with_runs(vec![vec![
            run("CI", Some("failure"), 42),
            run("Lint", Some("success"), 42),
        ]]);
        let verdict = wait(&remote, &FakeClock::default(), WaitPolicy::default()).unwrap();
        assert_eq!(verdict, CheckVerdict::Failed(vec!["CI".to_string()]));
    }

    #[test]
    fn ignores_runs_of_other_pull_requests_and_events() {
        let mut push_run = run("Lint", Some("success"), 42);
        push_run.event = "push".to_string();
        let remote = FakeRemote::new().with_runs(vec![
            vec![run("CI", Some("success"), 7), push_run],
            vec![run("CI", Some("success"), 42), run("Lint", Some("success"), 42)],
        ]);
        let clock = FakeClock::default();

        assert_eq!(
            wait(&remote, &clock, WaitPolicy::default()).unwrap(),
            CheckVerdict::Passed
        );
        assert_eq!(clock.sleeps.borrow().len(), 1);
    }

    #[test]
    fn newest_run_wins() {
        let remote = FakeRemote::new().with_runs(vec![vec![
            run("CI", Some("success"), 42),
            run("CI", Some("failure"), 42),
            run("Lint", Some("success"), 42),
        ]]);
        assert_eq!(
            wait(&remote, &FakeClock::default(), WaitPolicy::default()).unwrap(),
            CheckVerdict::Passed
        );
    }

    #[test]
    fn times_out_against_policy() {
        let remote = FakeRemote::new().with_runs(vec![vec![run("CI", None, 42)]]);
        let clock = FakeClock::default();
        let policy = WaitPolicy {
            interval: Duration::from_secs(5),
            timeout: Some(Duration::from_secs(12)),
        };

        let err = wait(&remote, &clock, policy).unwrap_err();

        assert!(matches!(err, PipupError::ChecksTimedOut(t) if t == Duration::from_secs(12)));
        assert_eq!(clock.sleeps.borrow().len(), 3);
    }

    #[test]
    fn no_required_checks_pass_immediately() {
        let remote = FakeRemote::new();
        let verdict = CheckWaiter::new(&remote, &FakeClock::default(), WaitPolicy::default())
            .wait("pipup-branch", 42, &[])
            .unwrap();
        assert_eq!(verdict, CheckVerdict::Passed);
        assert_eq!(remote.run_polls.get(), 0);
    }
}
