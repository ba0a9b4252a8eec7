// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use anyhow::Result;
use clap::Parser;
use kube::CustomResourceExt;
use tracing::*;

use myapp_controller::config::{Cli, Command, ControllerConfig};
use myapp_controller::myapp_types::MyApp;
use myapp_controller::shim_layer::controller_runtime::run_controller;
use myapp_controller::telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Export => {
            println!("{}", serde_yaml::to_string(&MyApp::crd())?);
        }
        Command::Run(args) => {
            init_tracing(args.log_format);
            info!("running myapp-controller");
            run_controller(ControllerConfig::from(&args)).await?;
        }
    }
    Ok(())
}
