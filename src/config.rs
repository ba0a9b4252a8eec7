// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(
    name = "myapp-controller",
    version,
    about = "Converges MyApp resources into their children"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the MyApp custom resource definition as YAML.
    Export,
    /// Run the controller against the current kube context.
    Run(RunArgs),
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Only watch MyApps in this namespace; all namespaces when unset.
    #[arg(long, env = "MYAPP_NAMESPACE")]
    pub namespace: Option<String>,

    /// Delay before re-checking a MyApp after a child was created.
    #[arg(long, env = "MYAPP_REQUEUE_AFTER_SECS", default_value_t = 1)]
    pub requeue_after_secs: u64,

    /// Delay before retrying a MyApp whose reconcile failed.
    #[arg(long, env = "MYAPP_ERROR_BACKOFF_SECS", default_value_t = 10)]
    pub error_backoff_secs: u64,

    #[arg(long, env = "MYAPP_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Settings the controller runtime works with, resolved from `RunArgs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    pub namespace: Option<String>,
    pub requeue_after: Duration,
    pub error_backoff: Duration,
}

impl Default for ControllerConfig {
    fn default() -> ControllerConfig {
        ControllerConfig {
            namespace: None,
            requeue_after: Duration::from_secs(1),
            error_backoff: Duration::from_secs(10),
        }
    }
}

impl From<&RunArgs> for ControllerConfig {
    fn from(args: &RunArgs) -> ControllerConfig {
        ControllerConfig {
            namespace: args.namespace.clone(),
            requeue_after: Duration::from_secs(args.requeue_after_secs),
            error_backoff: Duration::from_secs(args.error_backoff_secs),
        }
    }
}
