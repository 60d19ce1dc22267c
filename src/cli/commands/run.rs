//! Run command: full in-process sweep

use crate::cli::commands::{build_extractor, build_loader, secret_cache};
use crate::config::load_config;
use crate::core::pipeline::Pipeline;
use crate::domain::checkpoint::Checkpoint;
use clap::Args;
use tokio::sync::watch;

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Resume from a checkpoint returned by an earlier sweep
    #[arg(long)]
    pub resume_from: Option<String>,

    /// Override the configured extract batch size
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Apply the bundled schema migration before loading
    #[arg(long)]
    pub init_schema: bool,

    /// Validate and report without writing to PostgreSQL
    #[arg(long)]
    pub dry_run: bool,
}

impl RunArgs {
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        let mut config = load_config(config_path)?;
        if self.dry_run {
            config.application.dry_run = true;
        }
        if let Some(batch_size) = self.batch_size {
            config.pipeline.batch_size = batch_size;
        }

        let resume_from = self
            .resume_from
            .as_deref()
            .map(Checkpoint::new)
            .transpose()
            .map_err(|e| anyhow::anyhow!("invalid --resume-from value: {e}"))?;

        let secrets = secret_cache();
        let extractor = build_extractor(&config, secrets.clone());
        let (loader, pg_client) = build_loader(&config, secrets);

        if self.init_schema {
            pg_client.ensure_schema().await?;
        }

        tracing::info!(
            batch_size = config.pipeline.batch_size,
            dry_run = config.application.dry_run,
            resume_from = ?resume_from,
            "Starting sweep"
        );

        let pipeline = Pipeline::new(extractor, loader, config.pipeline.batch_size);
        let summary = pipeline.run_sweep(resume_from, shutdown).await?;

        println!("{summary}");

        // Nonzero exit when records were rejected, so schedulers notice
        Ok(if summary.is_clean() { 0 } else { 2 })
    }
}
