// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use clap::Parser;
use std::time::Duration;

use crate::config::*;

#[test]
pub fn test_parse_export() {
    let cli = Cli::try_parse_from(["myapp-controller", "export"]).unwrap();
    assert!(matches!(cli.command, Command::Export));
}

#[test]
pub fn test_parse_run_flags() {
    let cli = Cli::try_parse_from([
        "myapp-controller",
        "run",
        "--namespace",
        "prod",
        "--requeue-after-secs",
        "3",
        "--error-backoff-secs",
        "30",
        "--log-format",
        "json",
    ])
    .unwrap();
    let args = match cli.command {
        Command::Run(args) => args,
        other => panic!("unexpected command: {:?}", other),
    };
    assert_eq!(args.log_format, LogFormat::Json);

    let config = ControllerConfig::from(&args);
    assert_eq!(config.namespace.as_deref(), Some("prod"));
    assert_eq!(config.requeue_after, Duration::from_secs(3));
    assert_eq!(config.error_backoff, Duration::from_secs(30));
}

#[test]
pub fn test_unknown_subcommand_is_rejected() {
    assert!(Cli::try_parse_from(["myapp-controller", "serve"]).is_err());
}

#[test]
pub fn test_default_config() {
    let config = ControllerConfig::default();
    assert_eq!(config.namespace, None);
    assert_eq!(config.requeue_after, Duration::from_secs(1));
    assert_eq!(config.error_backoff, Duration::from_secs(10));
}
