use anyhow::{Context, bail};
use clap::Args;
use coval_core::{CovalConfig, TestSetSpec, require_non_empty};
use coval_engine::client::CovalClient;
use coval_engine::testgen::{
    DEFAULT_GENERATION_PROMPT, GENERATION_TIMEOUT, OpenAiTestCaseGenerator, upload_test_set,
};
use coval_engine::traits::TestCaseGenerator;
use coval_providers::openai_compatible::{self, OpenAiCompatibleChatConfig};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct GenerateTestSetArgs {
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,
    #[arg(long, env = "OPENAI_BASE_URL", default_value = openai_compatible::DEFAULT_BASE_URL)]
    pub openai_base_url: String,
    #[arg(long, default_value = openai_compatible::DEFAULT_MODEL)]
    pub model: String,
    /// File holding the generation prompt (default: customer support scenarios)
    #[arg(long)]
    pub prompt_file: Option<PathBuf>,
    /// Test set display name
    #[arg(long)]
    pub name: Option<String>,
    /// Test set description
    #[arg(long)]
    pub description: Option<String>,
    /// Seconds to wait for the model to answer
    #[arg(long, default_value_t = GENERATION_TIMEOUT.as_secs())]
    pub timeout_secs: u64,
    /// Print the generated cases without uploading them
    #[arg(long)]
    pub dry_run: bool,
}

impl GenerateTestSetArgs {
    fn test_set_spec(&self) -> TestSetSpec {
        let mut spec = TestSetSpec::default();
        if let Some(name) = &self.name {
            spec.display_name = name.clone();
        }
        if let Some(description) = &self.description {
            spec.description = description.clone();
        }
        spec
    }

    fn generation_timeout(&self) -> anyhow::Result<Duration> {
        if self.timeout_secs == 0 {
            bail!("--timeout-secs must be greater than zero");
        }
        Ok(Duration::from_secs(self.timeout_secs))
    }

    fn prompt(&self) -> anyhow::Result<String> {
        match &self.prompt_file {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("read prompt: {}", path.display())),
            None => Ok(DEFAULT_GENERATION_PROMPT.to_string()),
        }
    }
}

pub async fn execute(cfg: &CovalConfig, args: GenerateTestSetArgs) -> anyhow::Result<()> {
    let api_key = args.openai_api_key.clone().unwrap_or_default();
    require_non_empty("openai_api_key", &api_key)?;
    let client = CovalClient::new(cfg)?;
    let prompt = args.prompt()?;
    let timeout = args.generation_timeout()?;

    let generator = OpenAiTestCaseGenerator::new(OpenAiCompatibleChatConfig {
        base_url: args.openai_base_url.trim_end_matches('/').to_string(),
        api_key,
        model: args.model.clone(),
    })
    .with_timeout(timeout);

    println!("Generating test cases with {}...", args.model);
    let cases = generator.generate(&prompt).await?;
    println!("Generated {} test cases", cases.len());
    if cases.is_empty() {
        bail!("the model returned no test cases");
    }

    if args.dry_run {
        for (i, case) in cases.iter().enumerate() {
            println!("  [{}] {}", i + 1, case.label());
        }
        return Ok(());
    }

    println!("Creating test set...");
    let upload = upload_test_set(&client, &args.test_set_spec(), cases, |i, record, case| {
        println!("  [{i}] {}: {}", record.id, case.label());
    })
    .await?;

    println!();
    println!(
        "Done! Test set ID: {} ({} test cases)",
        upload.test_set.id,
        upload.cases.len()
    );
    Ok(())
}
