// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use rstest::rstest;
use serde::Deserialize;

use super::*;

#[allow(dead_code)]
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Mount {
    mount_path: String,
}

#[allow(dead_code)]
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Shelf {
    name: String,
    size: Option<i64>,
    tags: Vec<String>,
    labels: Option<BTreeMap<String, String>>,
    main_mount: Mount,
    extra_mount: Option<Mount>,
    mounts: Option<Vec<Mount>>,
}

#[rstest]
fn test_reflect_lists_wire_names_and_shapes() {
    let reflected = reflect::<Shelf>().expect("a struct should reflect");
    assert_eq!(reflected.name, "Shelf");
    assert_eq!(
        reflected.fields,
        vec![
            ("name", Shape::Scalar),
            ("size", Shape::Scalar),
            ("tags", Shape::Scalar),
            ("labels", Shape::Scalar),
            ("mainMount", Shape::Struct("Mount")),
            ("extraMount", Shape::Struct("Mount")),
            ("mounts", Shape::ListOf("Mount")),
        ]
    );
}

#[rstest]
fn test_reflect_ignores_non_structs() {
    assert!(reflect::<String>().is_none());
    assert!(reflect::<Vec<Mount>>().is_none());
}

#[rstest]
fn test_reflect_generated_kubernetes_types() {
    use k8s_openapi::api::core::v1::{Pod, Volume};

    let pod = reflect::<Pod>().unwrap();
    assert_eq!(pod.name, "Pod");
    assert!(pod.fields.contains(&("metadata", Shape::Struct("ObjectMeta"))));
    assert!(pod.fields.contains(&("spec", Shape::Struct("PodSpec"))));

    let volume = reflect::<Volume>().unwrap();
    assert!(volume.fields.contains(&("projected", Shape::Struct("ProjectedVolumeSource"))));
    assert!(volume.fields.contains(&("downwardAPI", Shape::Struct("DownwardAPIVolumeSource"))));
}
