use anyhow::Result;
use clap::Parser;

use honeyaws_core::config::HoneyawsConfig;
use honeyaws_core::types::LogFormat;
use honeyaws_daemon::cli::DaemonCli;
use honeyaws_daemon::{logging, metrics_server, runner};

/// Load the config file, then apply env and CLI overrides in that order.
async fn load_config(cli: &DaemonCli) -> Result<HoneyawsConfig> {
    let mut config = HoneyawsConfig::from_file(&cli.config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load {}: {}", cli.config.display(), e))?;
    config.apply_env_overrides();

    if let Some(level) = &cli.log_level {
        config.general.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.general.log_format = format.clone();
    }
    if let Some(format) = &cli.format {
        config.publisher.format = format
            .parse::<LogFormat>()
            .map_err(|e| anyhow::anyhow!("invalid --format: {}", e))?;
    }

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();
    let config = load_config(&cli).await?;

    if cli.validate {
        println!("configuration is valid: {}", cli.config.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!(
        format = %config.publisher.format,
        dataset = %config.resolved_dataset(),
        objects = cli.files.len(),
        "honeyaws-daemon starting"
    );

    if config.metrics.enabled {
        metrics_server::install_metrics_recorder(&config.metrics)?;
    }

    let report = runner::run(&config, &cli.files).await?;
    if report.failed > 0 {
        return Err(anyhow::anyhow!(
            "{} of {} objects failed to publish",
            report.failed,
            cli.files.len()
        ));
    }

    tracing::info!("honeyaws-daemon finished");
    Ok(())
}
