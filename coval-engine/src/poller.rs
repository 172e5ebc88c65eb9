use crate::traits::RunStatusSource;
use coval_core::{CovalConfig, RunId, RunStatus};
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Terminal(RunStatus),
    /// A status query failed; polling stopped with whatever was last seen.
    QueryFailed {
        last_status: Option<RunStatus>,
        error: String,
    },
    /// The attempt cap was reached before a terminal status.
    Exhausted { last_status: Option<RunStatus> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollReport {
    pub outcome: PollOutcome,
    pub queries: u32,
}

impl PollReport {
    pub fn last_status(&self) -> Option<&RunStatus> {
        match &self.outcome {
            PollOutcome::Terminal(s) => Some(s),
            PollOutcome::QueryFailed { last_status, .. } => last_status.as_ref(),
            PollOutcome::Exhausted { last_status } => last_status.as_ref(),
        }
    }
}

/// Queries a run on a fixed interval until it reaches a terminal status.
#[derive(Debug, Clone)]
pub struct StatusPoller {
    interval: Duration,
    max_attempts: Option<u32>,
}

impl StatusPoller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
        }
    }

    pub fn from_config(cfg: &CovalConfig) -> Self {
        Self::new(Duration::from_secs(cfg.poll_interval_secs)).with_max_attempts(cfg.max_poll_attempts)
    }

    /// `None` polls until terminal or until a query fails.
    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub async fn poll(&self, source: &dyn RunStatusSource, run_id: &RunId) -> PollReport {
        self.poll_with_hook(source, run_id, None, |_status| async {})
            .await
    }

    /// Same as `poll`, seeded with the status returned at submission and
    /// calling `on_status` for every status observed.
    pub async fn poll_with_hook<F, Fut>(
        &self,
        source: &dyn RunStatusSource,
        run_id: &RunId,
        initial: Option<RunStatus>,
        on_status: F,
    ) -> PollReport
    where
        F: Fn(RunStatus) -> Fut,
        Fut: Future<Output = ()>,
    {
        if let Some(status) = initial.as_ref().filter(|s| s.is_terminal()) {
            return PollReport {
                outcome: PollOutcome::Terminal(status.clone()),
                queries: 0,
            };
        }

        let mut last_status = initial;
        let mut queries = 0u32;

        loop {
            queries += 1;
            match source.run_status(run_id).await {
                Ok(status) => {
                    log::info!("run {run_id} status: {status}");
                    on_status(status.clone()).await;
                    if status.is_terminal() {
                        return PollReport {
                            outcome: PollOutcome::Terminal(status),
                            queries,
                        };
                    }
                    last_status = Some(status);
                }
                Err(e) => {
                    log::warn!("status query for run {run_id} failed: {e}");
                    return PollReport {
                        outcome: PollOutcome::QueryFailed {
                            last_status,
                            error: e.to_string(),
                        },
                        queries,
                    };
                }
            }

            if self.max_attempts.is_some_and(|max| queries >= max) {
                return PollReport {
                    outcome: PollOutcome::Exhausted { last_status },
                    queries,
                };
            }

            tokio::time::sleep(self.interval).await;
        }
    }
}
