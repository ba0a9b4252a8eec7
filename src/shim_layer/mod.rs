// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT

// The shim layer connects the reconciler to the kube-rs controller runtime:
// reconcile turns one trigger into a requeue decision, controller_runtime
// wires that into a kube-rs Controller.
pub mod controller_runtime;
pub mod reconcile;
