//! Publish run -- sink assembly, state tracking, and per-object dispatch.
//!
//! A run builds the enabled sinks and one [`Publisher`], then walks the
//! input files in order:
//!
//! 1. skip objects already recorded by the state store
//! 2. stage a copy of the file into `{state_dir}/spool` (the publisher
//!    removes what it publishes, the caller's file is left alone)
//! 3. publish the staged copy and record it as processed on success
//!
//! Per-object failures are logged and counted; they never abort the run.

use std::path::{Path, PathBuf};

use anyhow::Result;
use honeyaws_core::config::HoneyawsConfig;
use honeyaws_core::metrics as m;
use honeyaws_core::pipeline::{DynEventSink, Stater};
use honeyaws_core::types::DownloadedObject;
use honeyaws_publisher::{
    HoneycombSink, LokiSink, Publisher, PublisherBuilder, PublisherConfig, PublisherError,
};

use crate::state::FileStater;

/// Spool directory name inside the state directory.
pub const SPOOL_DIR: &str = "spool";

/// Outcome counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub published: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunReport {
    fn record_published(&mut self) {
        self.published += 1;
    }

    fn record_skipped(&mut self) {
        self.skipped += 1;
        metrics::counter!(m::DAEMON_OBJECTS_SKIPPED_TOTAL).increment(1);
    }

    fn record_failed(&mut self) {
        self.failed += 1;
        metrics::counter!(m::DAEMON_OBJECTS_FAILED_TOTAL).increment(1);
    }
}

/// Build every sink enabled in the configuration.
///
/// Fails when no sink is enabled, since the events would go nowhere.
pub fn build_sinks(config: &HoneyawsConfig) -> Result<Vec<Box<dyn DynEventSink>>> {
    let mut sinks: Vec<Box<dyn DynEventSink>> = Vec::new();

    if config.honeycomb.enabled {
        let sink = HoneycombSink::from_config(&config.honeycomb, &config.resolved_dataset())
            .map_err(|e| anyhow::anyhow!("failed to build honeycomb sink: {}", e))?;
        tracing::info!(url = sink.url(), "honeycomb sink enabled");
        sinks.push(Box::new(sink));
    }

    if config.loki.enabled {
        let sink = LokiSink::from_config(&config.loki, &config.publisher.environment)
            .map_err(|e| anyhow::anyhow!("failed to build loki sink: {}", e))?;
        tracing::info!(endpoint = %config.loki.endpoint, "loki sink enabled");
        sinks.push(Box::new(sink));
    }

    if sinks.is_empty() {
        return Err(anyhow::anyhow!(
            "no sink enabled: set honeycomb.enabled or loki.enabled"
        ));
    }
    Ok(sinks)
}

/// Copy `source` into the spool directory and describe it as a downloaded object.
pub async fn stage_object(
    source: &Path,
    spool_dir: &Path,
    seq: usize,
    config: &PublisherConfig,
) -> Result<DownloadedObject> {
    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "object".to_owned());
    let staged = spool_dir.join(format!("{seq:06}-{file_name}"));

    tokio::fs::copy(source, &staged).await.map_err(|e| {
        anyhow::anyhow!(
            "failed to stage {} into {}: {}",
            source.display(),
            spool_dir.display(),
            e
        )
    })?;

    Ok(DownloadedObject::new(
        source.display().to_string(),
        staged,
        config.format,
    ))
}

/// Publish every file and close the publisher.
pub async fn run(config: &HoneyawsConfig, files: &[PathBuf]) -> Result<RunReport> {
    let publisher_config = PublisherConfig::from_core(config);
    let sinks = build_sinks(config)?;
    let publisher = PublisherBuilder::new()
        .config(publisher_config.clone())
        .sinks(sinks)
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build publisher: {}", e))?;

    let state_dir = PathBuf::from(&config.general.state_dir);
    let stater = FileStater::open(&state_dir)
        .await
        .map_err(|e| anyhow::anyhow!("failed to open state store: {}", e))?;
    let spool_dir = state_dir.join(SPOOL_DIR);
    tokio::fs::create_dir_all(&spool_dir)
        .await
        .map_err(|e| anyhow::anyhow!("failed to create {}: {}", spool_dir.display(), e))?;

    let mut report = RunReport::default();
    for (seq, file) in files.iter().enumerate() {
        let object_name = file.display().to_string();

        match stater.is_processed(&object_name).await {
            Ok(true) => {
                tracing::info!(object = %object_name, "already processed, skipping");
                report.record_skipped();
                continue;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::error!(object = %object_name, error = %e, "state lookup failed");
                report.record_failed();
                continue;
            }
        }

        match publish_one(&publisher, &stater, file, &spool_dir, seq, &publisher_config).await {
            Ok(()) => report.record_published(),
            Err(e) => {
                tracing::error!(object = %object_name, error = %e, "failed to publish object");
                report.record_failed();
            }
        }
    }

    publisher
        .close()
        .await
        .map_err(|e| anyhow::anyhow!("failed to close publisher: {}", e))?;

    tracing::info!(
        published = report.published,
        skipped = report.skipped,
        failed = report.failed,
        "run complete"
    );
    Ok(report)
}

async fn publish_one(
    publisher: &Publisher,
    stater: &FileStater,
    file: &Path,
    spool_dir: &Path,
    seq: usize,
    config: &PublisherConfig,
) -> Result<()> {
    let object = stage_object(file, spool_dir, seq, config).await?;

    match publisher.publish(&object).await {
        Ok(_) => {}
        Err(e @ PublisherError::ParseFailure { .. }) => {
            // parse failures leave the staged copy behind
            if let Err(rm) = tokio::fs::remove_file(&object.filename).await {
                tracing::warn!(path = %object.filename.display(), error = %rm, "failed to remove staged copy");
            }
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    }

    stater.mark_processed(&object.object).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_sinks_requires_one_enabled() {
        let config = HoneyawsConfig::default();
        assert!(build_sinks(&config).is_err());
    }

    #[test]
    fn build_sinks_in_config_order() {
        let mut config = HoneyawsConfig::default();
        config.honeycomb.enabled = true;
        config.honeycomb.write_key = "key".to_owned();
        config.loki.enabled = true;
        config.loki.endpoint = "http://localhost:3100/loki/api/v1/push".to_owned();

        let sinks = build_sinks(&config).unwrap();
        let names: Vec<&str> = sinks.iter().map(|s| s.name()).collect();
        assert_eq!(names, ["honeycomb", "loki"]);
    }

    #[test]
    fn run_report_emits_daemon_counters() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        let mut report = RunReport::default();
        metrics::with_local_recorder(&recorder, || {
            report.record_published();
            report.record_skipped();
            report.record_skipped();
            report.record_failed();
        });

        assert_eq!(
            report,
            RunReport {
                published: 1,
                skipped: 2,
                failed: 1
            }
        );
        let rendered = handle.render();
        assert!(rendered.contains(&format!("{} 2", m::DAEMON_OBJECTS_SKIPPED_TOTAL)));
        assert!(rendered.contains(&format!("{} 1", m::DAEMON_OBJECTS_FAILED_TOTAL)));
    }

    #[tokio::test]
    async fn stage_object_copies_into_spool() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("elb.log");
        std::fs::write(&source, "line\n").unwrap();
        let spool = dir.path().join("spool");
        std::fs::create_dir(&spool).unwrap();

        let object = stage_object(&source, &spool, 7, &PublisherConfig::default())
            .await
            .unwrap();
        assert_eq!(object.filename, spool.join("000007-elb.log"));
        assert_eq!(object.object, source.display().to_string());
        assert!(source.exists());
        assert_eq!(std::fs::read_to_string(&object.filename).unwrap(), "line\n");
    }
}
