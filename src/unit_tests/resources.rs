// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;

use super::{demo_key, make_app};
use crate::error::OwnershipError;
use crate::myapp_types::MyAppSpec;
use crate::resources::*;

fn demo_spec() -> MyAppSpec {
    MyAppSpec {
        replicas: Some(3),
        image: "nginx:1.25".to_string(),
        args: vec!["--port".to_string(), "8080".to_string()],
    }
}

fn app_selector() -> BTreeMap<String, String> {
    BTreeMap::from([("app".to_string(), "demo".to_string())])
}

#[test]
pub fn test_make_deployment_is_idempotent() {
    let key = demo_key();
    let spec = demo_spec();
    let first = serde_json::to_vec(&make_deployment(&key, &spec)).unwrap();
    let second = serde_json::to_vec(&make_deployment(&key, &spec)).unwrap();
    assert_eq!(first, second);
}

#[test]
pub fn test_make_pod_disruption_budget_is_idempotent() {
    let key = demo_key();
    let spec = demo_spec();
    let first = serde_json::to_vec(&make_pod_disruption_budget(&key, &spec)).unwrap();
    let second = serde_json::to_vec(&make_pod_disruption_budget(&key, &spec)).unwrap();
    assert_eq!(first, second);
}

#[test]
pub fn test_make_deployment() {
    let deployment = make_deployment(&demo_key(), &demo_spec());
    assert_eq!(deployment.metadata.name.as_deref(), Some("demo"));
    assert_eq!(deployment.metadata.namespace.as_deref(), Some("default"));

    let spec = deployment.spec.unwrap();
    assert_eq!(spec.replicas, Some(3));
    assert_eq!(spec.selector.match_labels, Some(app_selector()));

    let template_meta = spec.template.metadata.unwrap();
    assert_eq!(template_meta.labels, Some(app_selector()));

    let containers = spec.template.spec.unwrap().containers;
    assert_eq!(containers.len(), 1);
    let container = &containers[0];
    assert_eq!(container.name, "demo");
    assert_eq!(container.image.as_deref(), Some("nginx:1.25"));
    assert_eq!(
        container.args,
        Some(vec!["--port".to_string(), "8080".to_string()])
    );
}

#[test]
pub fn test_container_resources_are_static() {
    let mut big = demo_spec();
    big.replicas = Some(50);
    big.image = "busybox:latest".to_string();
    for spec in [demo_spec(), big] {
        let deployment = make_deployment(&demo_key(), &spec);
        let pod_spec = deployment.spec.unwrap().template.spec.unwrap();
        let resources = pod_spec.containers[0].resources.clone().unwrap();
        assert_eq!(
            resources.requests,
            Some(BTreeMap::from([
                ("cpu".to_string(), Quantity("100m".to_string())),
                ("memory".to_string(), Quantity("128Mi".to_string())),
            ]))
        );
        assert_eq!(
            resources.limits,
            Some(BTreeMap::from([
                ("cpu".to_string(), Quantity("200m".to_string())),
                ("memory".to_string(), Quantity("256Mi".to_string())),
            ]))
        );
    }
}

#[test]
pub fn test_unset_replicas_pass_through() {
    let mut spec = demo_spec();
    spec.replicas = None;
    let deployment = make_deployment(&demo_key(), &spec);
    assert_eq!(deployment.spec.unwrap().replicas, None);
}

#[test]
pub fn test_empty_args_are_omitted() {
    let mut spec = demo_spec();
    spec.args = vec![];
    let deployment = make_deployment(&demo_key(), &spec);
    let pod_spec = deployment.spec.unwrap().template.spec.unwrap();
    assert_eq!(pod_spec.containers[0].args, None);
}

#[test]
pub fn test_make_pod_disruption_budget() {
    let pdb = make_pod_disruption_budget(&demo_key(), &demo_spec());
    assert_eq!(pdb.metadata.name.as_deref(), Some("demo"));
    assert_eq!(pdb.metadata.namespace.as_deref(), Some("default"));
    let spec = pdb.spec.unwrap();
    assert_eq!(spec.max_unavailable, Some(IntOrString::Int(1)));
    assert_eq!(spec.min_available, None);
    assert_eq!(spec.selector.unwrap().match_labels, Some(app_selector()));
}

#[test]
pub fn test_selector_is_shared_between_children() {
    let key = demo_key();
    let spec = demo_spec();
    let deployment = make_deployment(&key, &spec);
    let pdb = make_pod_disruption_budget(&key, &spec);
    assert_eq!(
        Some(deployment.spec.unwrap().selector),
        pdb.spec.unwrap().selector
    );
}

#[test]
pub fn test_set_controller_reference() {
    let mut app = make_app("default", "demo", "nginx:1.25", Some(3));
    app.metadata.uid = Some("uid-7".to_string());
    let mut meta = ObjectMeta::default();

    set_controller_reference(&app, &mut meta).unwrap();

    let refs = meta.owner_references.unwrap();
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].api_version, "apps.example.com/v1");
    assert_eq!(refs[0].kind, "MyApp");
    assert_eq!(refs[0].name, "demo");
    assert_eq!(refs[0].uid, "uid-7");
    assert_eq!(refs[0].controller, Some(true));
}

#[test]
pub fn test_set_controller_reference_twice_keeps_one_entry() {
    let mut app = make_app("default", "demo", "nginx:1.25", Some(3));
    app.metadata.uid = Some("uid-7".to_string());
    let mut meta = ObjectMeta::default();

    set_controller_reference(&app, &mut meta).unwrap();
    set_controller_reference(&app, &mut meta).unwrap();

    assert_eq!(meta.owner_references.unwrap().len(), 1);
}

#[test]
pub fn test_set_controller_reference_requires_uid() {
    let app = make_app("default", "demo", "nginx:1.25", Some(3));
    let mut meta = ObjectMeta::default();

    let err = set_controller_reference(&app, &mut meta).unwrap_err();
    assert_eq!(err, OwnershipError::MissingOwnerField(".metadata.uid"));
}

#[test]
pub fn test_set_controller_reference_rejects_other_controller() {
    let mut app = make_app("default", "demo", "nginx:1.25", Some(3));
    app.metadata.uid = Some("uid-7".to_string());
    let mut meta = ObjectMeta {
        owner_references: Some(vec![OwnerReference {
            api_version: "apps/v1".to_string(),
            kind: "ReplicaSet".to_string(),
            name: "someone-else".to_string(),
            uid: "uid-1".to_string(),
            controller: Some(true),
            ..OwnerReference::default()
        }]),
        ..ObjectMeta::default()
    };

    let err = set_controller_reference(&app, &mut meta).unwrap_err();
    assert_eq!(
        err,
        OwnershipError::AlreadyOwned {
            kind: "ReplicaSet".to_string(),
            name: "someone-else".to_string(),
        }
    );
}
