//! Validate-config command

use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        match load_config(config_path) {
            Ok(config) => {
                println!("Configuration valid: {config_path}");
                println!("  source:     {}.{}", config.source.database, config.source.collection);
                println!("  batch size: {}", config.pipeline.batch_size);
                println!("  dry run:    {}", config.application.dry_run);
                Ok(0)
            }
            Err(e) => {
                eprintln!("Configuration invalid: {e}");
                Ok(3)
            }
        }
    }
}
