// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT

// An executable, in-memory model of the parts of the API server the
// controller talks to. It implements ClusterClient, so the reconciler can be
// driven end to end without a cluster.
pub mod api_server;
pub mod api_server_state;

pub use api_server::{ExecutableApiServer, Fault, RequestRecord, Verb};
