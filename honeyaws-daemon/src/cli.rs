//! CLI argument definitions for honeyaws-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Publish AWS ELB, ALB and CloudFront access logs to Honeycomb or Loki.
///
/// Each FILE is treated as one downloaded log object. Objects already
/// recorded in the state directory are skipped.
#[derive(Parser, Debug)]
#[command(name = "honeyaws-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to honeyaws.toml configuration file.
    #[arg(short, long, default_value = "honeyaws.toml")]
    pub config: PathBuf,

    /// Override the log format of the input objects (aws_elb, aws_alb, aws_cf_web).
    #[arg(short, long)]
    pub format: Option<String>,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without publishing.
    #[arg(long)]
    pub validate: bool,

    /// Access log objects to publish.
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,
}
