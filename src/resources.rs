// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use k8s_openapi::api::apps::v1 as appsv1;
use k8s_openapi::api::core::v1 as corev1;
use k8s_openapi::api::policy::v1 as policyv1;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::{ObjectMeta, Resource};
use std::collections::BTreeMap;

use crate::common::*;
use crate::error::OwnershipError;
use crate::myapp_types::*;

// Static resource policy for the app container.
pub const CPU_REQUEST: &str = "100m";
pub const MEMORY_REQUEST: &str = "128Mi";
pub const CPU_LIMIT: &str = "200m";
pub const MEMORY_LIMIT: &str = "256Mi";

pub const MAX_UNAVAILABLE: i32 = 1;

pub fn make_deployment(key: &ObjectKey, spec: &MyAppSpec) -> appsv1::Deployment {
    appsv1::Deployment {
        metadata: ObjectMeta {
            name: Some(deployment_name(key)),
            namespace: Some(key.namespace.clone()),
            labels: Some(app_labels(key)),
            ..ObjectMeta::default()
        },
        spec: Some(appsv1::DeploymentSpec {
            replicas: spec.replicas,
            selector: make_selector(key),
            template: corev1::PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(app_labels(key)),
                    ..ObjectMeta::default()
                }),
                spec: Some(make_pod_spec(key, spec)),
            },
            ..appsv1::DeploymentSpec::default()
        }),
        ..appsv1::Deployment::default()
    }
}

fn make_pod_spec(key: &ObjectKey, spec: &MyAppSpec) -> corev1::PodSpec {
    corev1::PodSpec {
        containers: vec![corev1::Container {
            name: container_name(key),
            image: Some(spec.image.clone()),
            args: if spec.args.is_empty() {
                None
            } else {
                Some(spec.args.clone())
            },
            resources: Some(make_resource_requirements()),
            ..corev1::Container::default()
        }],
        ..corev1::PodSpec::default()
    }
}

fn make_resource_requirements() -> corev1::ResourceRequirements {
    corev1::ResourceRequirements {
        requests: Some(BTreeMap::from([
            ("cpu".to_string(), Quantity(CPU_REQUEST.to_string())),
            ("memory".to_string(), Quantity(MEMORY_REQUEST.to_string())),
        ])),
        limits: Some(BTreeMap::from([
            ("cpu".to_string(), Quantity(CPU_LIMIT.to_string())),
            ("memory".to_string(), Quantity(MEMORY_LIMIT.to_string())),
        ])),
        ..corev1::ResourceRequirements::default()
    }
}

pub fn make_pod_disruption_budget(
    key: &ObjectKey,
    _spec: &MyAppSpec,
) -> policyv1::PodDisruptionBudget {
    policyv1::PodDisruptionBudget {
        metadata: ObjectMeta {
            name: Some(pod_disruption_budget_name(key)),
            namespace: Some(key.namespace.clone()),
            labels: Some(app_labels(key)),
            ..ObjectMeta::default()
        },
        spec: Some(policyv1::PodDisruptionBudgetSpec {
            max_unavailable: Some(IntOrString::Int(MAX_UNAVAILABLE)),
            selector: Some(make_selector(key)),
            ..policyv1::PodDisruptionBudgetSpec::default()
        }),
        ..policyv1::PodDisruptionBudget::default()
    }
}

fn make_selector(key: &ObjectKey) -> metav1::LabelSelector {
    metav1::LabelSelector {
        match_labels: Some(app_labels(key)),
        ..metav1::LabelSelector::default()
    }
}

/// Points `child` back at `owner` as its controller, so that deleting the
/// owner cascades to the child and child events re-trigger the owner.
///
/// Re-attaching the same owner replaces its entry; a child controlled by a
/// different object is rejected.
pub fn set_controller_reference(
    owner: &MyApp,
    child: &mut ObjectMeta,
) -> Result<(), OwnershipError> {
    if owner.meta().name.is_none() {
        return Err(OwnershipError::MissingOwnerField(".metadata.name"));
    }
    let owner_ref = owner
        .controller_owner_ref(&())
        .ok_or(OwnershipError::MissingOwnerField(".metadata.uid"))?;

    let refs = child.owner_references.get_or_insert_with(Vec::new);
    if let Some(existing) = refs
        .iter()
        .find(|r| r.controller == Some(true) && r.uid != owner_ref.uid)
    {
        return Err(OwnershipError::AlreadyOwned {
            kind: existing.kind.clone(),
            name: existing.name.clone(),
        });
    }
    refs.retain(|r| r.uid != owner_ref.uid);
    refs.push(owner_ref);
    Ok(())
}
