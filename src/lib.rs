// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
pub mod cluster_client;
pub mod common;
pub mod config;
pub mod error;
pub mod executable_model;
pub mod metrics;
pub mod myapp_types;
pub mod reconciler;
pub mod resources;
pub mod shim_layer;
pub mod telemetry;


pub use error::Error;
