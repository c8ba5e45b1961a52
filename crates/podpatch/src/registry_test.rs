// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;

use super::*;

fn yaml(text: &str) -> Value {
    serde_yaml::from_str(text).expect("test yaml should parse")
}

#[rstest]
fn test_tagged_mapping_becomes_object() {
    let registry = TypeRegistry::kubernetes();
    let value = registry
        .materialize(yaml(
            r#"
name: shared-data
nfs:
  server: nfs.example.com
  path: /data
  _: V1NFSVolumeSource
_: V1Volume
"#,
        ))
        .unwrap();

    let volume = value.as_object().expect("should be a typed object");
    assert_eq!(volume.kind(), "V1Volume");
    assert_eq!(volume.get("name"), Some(&Value::from("shared-data")));

    let nfs = volume.get("nfs").and_then(Value::as_object).unwrap();
    assert_eq!(nfs.kind(), "V1NFSVolumeSource");
    assert_eq!(nfs.get("server"), Some(&Value::from("nfs.example.com")));
    assert_eq!(nfs.get("path"), Some(&Value::from("/data")));
    assert_eq!(nfs.get("read_only"), Some(&Value::Null));

    // attributes that were not given are present but unset
    assert!(volume.get("secret").is_some_and(Value::is_null));
}

#[rstest]
fn test_untagged_mapping_is_kept_intact() {
    let registry = TypeRegistry::kubernetes();
    let source = yaml(
        r#"
name: shared-data
nfs:
  server: nfs.example.com
  path: /data
"#,
    );
    let value = registry.materialize(source.clone()).unwrap();
    assert_eq!(value, source);
}

#[rstest]
fn test_tagged_values_inside_untagged_mapping_are_converted() {
    let registry = TypeRegistry::kubernetes();
    let value = registry
        .materialize(yaml(
            r#"
extra:
  ctx:
    run_as_user: 1000
    _: V1SecurityContext
"#,
        ))
        .unwrap();

    let ctx = value.pointer(["extra", "ctx"]).unwrap();
    assert_eq!(ctx.as_object().map(Object::kind), Some("V1SecurityContext"));
    assert!(value.as_map().is_some());
}

#[rstest]
fn test_lists_are_materialized_elementwise() {
    let registry = TypeRegistry::kubernetes();
    let value = registry
        .materialize(yaml(
            r#"
- {name: A, value: "1", _: V1EnvVar}
- {name: B, value: "2"}
- plain
"#,
        ))
        .unwrap();

    let items = value.as_list().unwrap();
    assert!(items[0].as_object().is_some());
    assert!(items[1].as_map().is_some());
    assert_eq!(items[2], Value::from("plain"));
}

#[rstest]
fn test_unknown_tag_is_rejected() {
    let registry = TypeRegistry::kubernetes();
    let err = registry
        .materialize(yaml("{name: x, _: V1Nonsense}"))
        .unwrap_err();
    assert!(matches!(err, Error::UnknownTypeTag(ref t) if t == "V1Nonsense"));
}

#[rstest]
fn test_non_string_tag_is_rejected() {
    let registry = TypeRegistry::kubernetes();
    let err = registry.materialize(yaml("{_: 12}")).unwrap_err();
    assert!(matches!(err, Error::UnknownTypeTag(_)));
}

#[rstest]
fn test_undeclared_field_is_rejected() {
    let registry = TypeRegistry::kubernetes();
    let err = registry
        .materialize(yaml("{name: x, colour: red, _: V1EnvVar}"))
        .unwrap_err();
    match err {
        Error::UnknownField { kind, field } => {
            assert_eq!(kind, "V1EnvVar");
            assert_eq!(field, "colour");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[rstest]
fn test_wire_names_are_accepted() {
    let registry = TypeRegistry::kubernetes();
    let value = registry
        .materialize(yaml("{runAsUser: 1000, _: V1SecurityContext}"))
        .unwrap();
    assert_eq!(
        value.as_object().and_then(|o| o.get("run_as_user")),
        Some(&Value::Int(1000))
    );
}

#[rstest]
fn test_materialize_as_follows_field_types() {
    let registry = TypeRegistry::kubernetes();
    let pod = registry
        .materialize_as(
            "V1Pod",
            yaml(
                r#"
apiVersion: v1
kind: Pod
metadata:
  name: jupyter-alice
  labels: {app: jupyterhub}
spec:
  containers:
    - name: notebook
      image: sample/notebook:latest
      env:
        - {name: JUPYTERHUB_USER, value: alice}
  volumes: []
"#,
            ),
        )
        .unwrap();

    let spec = pod.child("spec").and_then(Value::as_object).unwrap();
    assert_eq!(spec.kind(), "V1PodSpec");

    let container = &spec.get("containers").and_then(Value::as_list).unwrap()[0];
    assert_eq!(container.as_object().map(Object::kind), Some("V1Container"));

    let env = &container.child("env").and_then(Value::as_list).unwrap()[0];
    assert_eq!(env.as_object().map(Object::kind), Some("V1EnvVar"));

    // free-form attributes keep their mappings
    let labels = pod.pointer(["metadata", "labels"]).unwrap();
    assert!(labels.as_map().is_some());
}

#[rstest]
fn test_materialize_as_unknown_kind() {
    let registry = TypeRegistry::kubernetes();
    assert!(registry.materialize_as("V1Nothing", Value::Null).is_err());
}

#[rstest]
fn test_custom_registry_is_closed() {
    let registry = TypeRegistry::new([
        TypeDescriptor::new("Point", [any("x"), any("y")]),
        TypeDescriptor::new("Line", [object("start", "Point"), object("end", "Circle")]),
    ]);

    assert_eq!(registry.len(), 2);
    assert!(registry.materialize(yaml("{x: 1, y: 2, _: Point}")).is_ok());
    assert!(registry.materialize(yaml("{_: V1Volume}")).is_err());

    // nested kinds must name a registered type to be followed
    let line = registry.get("Line").unwrap();
    assert_eq!(line.field("start").map(|f| f.kind), Some(FieldKind::Object("Point")));
    assert_eq!(line.field("end").map(|f| f.kind), Some(FieldKind::Any));
}

#[rstest]
fn test_kubernetes_registry_hints_name_registered_types() {
    let registry = TypeRegistry::kubernetes();
    for name in registry.names() {
        let descriptor = registry.get(name).unwrap();
        for field in &descriptor.fields {
            if let FieldKind::Object(kind) | FieldKind::ListOf(kind) = field.kind {
                assert!(
                    registry.get(kind).is_some(),
                    "{name}.{} refers to unregistered {kind}",
                    field.name
                );
            }
        }
    }
}

#[rstest]
fn test_kubernetes_registry_covers_the_full_pod_schema() {
    let registry = TypeRegistry::kubernetes();
    let pod = registry
        .materialize_as(
            "V1Pod",
            yaml(
                r#"
apiVersion: v1
kind: Pod
metadata:
  name: jupyter-alice
  resourceVersion: "4711"
  ownerReferences:
    - {apiVersion: v1, kind: Node, name: n1, uid: abc}
spec:
  nodeName: worker-3
  dnsPolicy: ClusterFirst
  hostIPC: false
  containers:
    - name: notebook
      image: sample/notebook:latest
      readinessProbe:
        httpGet: {path: /api, port: 8888}
      livenessProbe:
        exec: {command: [true]}
"#,
            ),
        )
        .unwrap();

    assert_eq!(
        pod.pointer(["metadata", "resource_version"]),
        Some(&Value::from("4711"))
    );
    let owner = &pod
        .pointer(["metadata", "owner_references"])
        .and_then(Value::as_list)
        .unwrap()[0];
    assert_eq!(owner.as_object().map(Object::kind), Some("V1OwnerReference"));
    assert_eq!(pod.pointer(["spec", "node_name"]), Some(&Value::from("worker-3")));
    assert_eq!(pod.pointer(["spec", "dnsPolicy"]), Some(&Value::from("ClusterFirst")));
    assert_eq!(pod.pointer(["spec", "host_ipc"]), Some(&Value::Bool(false)));

    let container = &pod
        .pointer(["spec", "containers"])
        .and_then(Value::as_list)
        .unwrap()[0];
    let probe = container.child("readiness_probe").unwrap();
    assert_eq!(probe.as_object().map(Object::kind), Some("V1Probe"));
    let http = probe.child("http_get").and_then(Value::as_object).unwrap();
    assert_eq!(http.kind(), "V1HTTPGetAction");
    assert!(container.child("liveness_probe").is_some_and(|p| p.as_object().is_some()));
}

#[rstest]
#[case("{name: tok, projected: {sources: []}, _: V1Volume}", "projected")]
#[case("{name: cache, csi: {driver: cvmfs.csi.cern.ch}, _: V1Volume}", "csi")]
#[case("{name: info, downwardAPI: {items: []}, _: V1Volume}", "downward_api")]
fn test_tagged_volume_sources(#[case] source: &str, #[case] attribute: &str) {
    let registry = TypeRegistry::kubernetes();
    let value = registry.materialize(yaml(source)).unwrap();
    let volume = value.as_object().unwrap();
    assert!(volume.get(attribute).is_some_and(|v| !v.is_null()));
}

#[rstest]
fn test_projected_sources_are_typed_in_documents() {
    let registry = TypeRegistry::kubernetes();
    let volume = registry
        .materialize_as(
            "V1Volume",
            yaml(
                r#"
name: tok
projected:
  sources:
    - serviceAccountToken: {path: token, expirationSeconds: 600}
"#,
            ),
        )
        .unwrap();

    let projected = volume.child("projected").and_then(Value::as_object).unwrap();
    assert_eq!(projected.kind(), "V1ProjectedVolumeSource");
    let source = &projected.get("sources").and_then(Value::as_list).unwrap()[0];
    assert_eq!(source.as_object().map(Object::kind), Some("V1VolumeProjection"));
    let token = source.child("service_account_token").and_then(Value::as_object);
    assert_eq!(token.map(Object::kind), Some("V1ServiceAccountTokenProjection"));
}

#[rstest]
fn test_objects_serialize_under_kubernetes_wire_names() {
    let registry = TypeRegistry::kubernetes();
    let value = registry
        .materialize(yaml("{run_as_user: 1000, _: V1SecurityContext}"))
        .unwrap();
    let yaml = serde_yaml::to_string(&value).unwrap();
    assert_eq!(yaml.trim(), "runAsUser: 1000");
}
