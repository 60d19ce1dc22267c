//! Single-stage commands
//!
//! Each command invokes exactly one pipeline stage and speaks JSON
//! envelopes: `extract` writes one to stdout, `transform` and `load` read
//! their input envelope from stdin. An external orchestrator threads the
//! envelopes (and the checkpoint inside them) between invocations and
//! re-invokes `extract` while `has_more` is true.

use crate::cli::commands::{build_extractor, build_loader, secret_cache};
use crate::config::load_config;
use crate::core::transform::transform;
use crate::domain::checkpoint::Checkpoint;
use crate::domain::envelope::{ExtractOutput, ExtractRequest, TransformOutput};
use clap::Args;
use std::io::Read;

/// Arguments for the extract command
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Checkpoint from the previous batch; omit to start from the beginning
    #[arg(long)]
    pub checkpoint: Option<String>,

    /// Override the configured batch size
    #[arg(long)]
    pub batch_size: Option<usize>,
}

impl ExtractArgs {
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = load_config(config_path)?;

        let checkpoint = self
            .checkpoint
            .as_deref()
            .map(Checkpoint::new)
            .transpose()
            .map_err(|e| anyhow::anyhow!("invalid --checkpoint value: {e}"))?;

        let extractor = build_extractor(&config, secret_cache());
        let output = extractor
            .extract(ExtractRequest {
                checkpoint,
                batch_size: self.batch_size.unwrap_or(config.pipeline.batch_size),
            })
            .await?;

        print_envelope(&output)?;
        Ok(0)
    }
}

/// Arguments for the transform command
#[derive(Args, Debug)]
pub struct TransformArgs {}

impl TransformArgs {
    pub async fn execute(&self) -> anyhow::Result<i32> {
        let input: ExtractOutput = read_envelope()?;
        let output = transform(input);
        print_envelope(&output)?;
        Ok(0)
    }
}

/// Arguments for the load command
#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Apply the bundled schema migration before loading
    #[arg(long)]
    pub init_schema: bool,

    /// Validate and report without writing to PostgreSQL
    #[arg(long)]
    pub dry_run: bool,
}

impl LoadArgs {
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let mut config = load_config(config_path)?;
        if self.dry_run {
            config.application.dry_run = true;
        }

        let input: TransformOutput = read_envelope()?;

        let (loader, pg_client) = build_loader(&config, secret_cache());
        if self.init_schema {
            pg_client.ensure_schema().await?;
        }

        let output = loader.load(input).await?;
        print_envelope(&output)?;
        Ok(0)
    }
}

fn read_envelope<T: serde::de::DeserializeOwned>() -> anyhow::Result<T> {
    let mut buffer = String::new();
    std::io::stdin().read_to_string(&mut buffer)?;
    serde_json::from_str(&buffer)
        .map_err(|e| anyhow::anyhow!("failed to parse input envelope: {e}"))
}

fn print_envelope<T: serde::Serialize>(envelope: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(envelope)?);
    Ok(())
}
