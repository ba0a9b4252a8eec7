// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::cluster_client::ClientError;
use crate::common::{ChildKind, ObjectKey};
use thiserror::Error;

/// Failures a reconcile pass can end with. Everything here is handed back to
/// the trigger queue unchanged; the queue owns backoff.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to get {kind} {key}: {source}")]
    ClientReadFailure {
        kind: &'static str,
        key: ObjectKey,
        #[source]
        source: ClientError,
    },
    #[error("Failed to create {kind} {key}: {source}")]
    ClientCreateFailure {
        kind: ChildKind,
        key: ObjectKey,
        #[source]
        source: ClientError,
    },
    #[error("Failed to set owner reference on {kind} {key}: {source}")]
    OwnershipAttachFailure {
        kind: ChildKind,
        key: ObjectKey,
        #[source]
        source: OwnershipError,
    },
    #[error("Reconcile of {0} was cancelled")]
    Cancelled(ObjectKey),
    #[error("MissingObjectKey: {0}")]
    MissingObjectKey(&'static str),
}

impl Error {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled(_))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OwnershipError {
    #[error("owner misses \"{0}\"")]
    MissingOwnerField(&'static str),
    #[error("object is already controlled by {kind} {name}")]
    AlreadyOwned { kind: String, name: String },
}
