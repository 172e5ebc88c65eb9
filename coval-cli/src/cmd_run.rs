use anyhow::bail;
use clap::Args;
use coval_core::{CovalConfig, LaunchRunRequest, RunOptions, RunStatus, run_dashboard_url};
use coval_engine::client::CovalClient;
use coval_engine::poller::{PollOutcome, StatusPoller};

#[derive(Args, Debug)]
pub struct LaunchRunArgs {
    /// Agent to test
    #[arg(long, env = "COVAL_AGENT_ID")]
    pub agent_id: String,
    /// Simulated persona
    #[arg(long, env = "COVAL_PERSONA_ID")]
    pub persona_id: String,
    /// Test set to run
    #[arg(long, env = "COVAL_TEST_SET_ID")]
    pub test_set_id: String,
    /// Iterations per test case (1-10)
    #[arg(long, default_value_t = 1)]
    pub iterations: u32,
    /// Concurrent simulations (1-5)
    #[arg(long, default_value_t = 1)]
    pub concurrency: u32,
    /// Metric to evaluate (repeatable)
    #[arg(long = "metric")]
    pub metrics: Vec<String>,
    /// Print the run and exit without polling
    #[arg(long)]
    pub no_wait: bool,
    /// Stop polling after this many status queries
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_polls: Option<u32>,
}

impl LaunchRunArgs {
    fn request(&self) -> LaunchRunRequest {
        LaunchRunRequest {
            agent_id: self.agent_id.clone(),
            persona_id: self.persona_id.clone(),
            test_set_id: self.test_set_id.clone(),
            options: RunOptions {
                iteration_count: self.iterations,
                concurrency: self.concurrency,
            },
            metric_ids: self.metrics.clone(),
        }
    }
}

pub async fn execute(cfg: &CovalConfig, args: LaunchRunArgs) -> anyhow::Result<()> {
    let run = args.request();
    run.validate()?;

    let client = CovalClient::new(cfg)?;

    println!("Launching simulation run...");
    println!("Agent ID: {}", run.agent_id);
    println!("Persona ID: {}", run.persona_id);
    println!("Test Set ID: {}", run.test_set_id);

    let record = client.launch_run(&run).await?;

    println!();
    println!("Run launched successfully");
    println!("Run ID: {}", record.run_id);
    println!(
        "Status: {}",
        record.status.as_ref().map_or("unknown", RunStatus::as_str)
    );
    println!("Created: {}", record.create_time.as_deref().unwrap_or("unknown"));
    println!("View at: {}", run_dashboard_url(record.run_id.as_str()));

    if args.no_wait {
        return Ok(());
    }

    println!();
    println!("Monitoring run status...");

    let poller = StatusPoller::from_config(cfg)
        .with_max_attempts(args.max_polls.or(cfg.max_poll_attempts));
    let report = poller
        .poll_with_hook(&client, &record.run_id, record.status, |status| async move {
            println!("Current status: {status}");
        })
        .await;

    match report.outcome {
        PollOutcome::Terminal(status) => {
            println!();
            println!("Run finished with status: {status}");
            Ok(())
        }
        PollOutcome::QueryFailed { last_status, error } => bail!(
            "stopped monitoring run {} after {} queries (last status: {}): {error}",
            record.run_id,
            report.queries,
            last_status.as_ref().map_or("unknown", RunStatus::as_str)
        ),
        PollOutcome::Exhausted { last_status } => bail!(
            "run {} still {} after {} status queries",
            record.run_id,
            last_status.as_ref().map_or("unknown", RunStatus::as_str),
            report.queries
        ),
    }
}
