// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::{fixture, rstest};

use super::*;
use crate::context::UserInfo;

#[fixture]
fn context() -> Context {
    Context::new(
        "sample/notebook",
        UserInfo {
            name: "alice".into(),
            uid: Some(1234),
            gid: Some(5678),
            sub: Some("http://cilogon.org/serverA/users/42".into()),
        },
    )
    .with_groups(["ospool", "staff"])
    .with_extra("site", "chtc")
}

fn yaml(text: &str) -> Value {
    serde_yaml::from_str(text).expect("test yaml should parse")
}

#[rstest]
fn test_whole_placeholder_renders_as_text(context: Context) {
    let rendered = render(&Value::from("{user.uid}"), &context).unwrap();
    assert_eq!(rendered, Value::from("1234"));
}

#[rstest]
fn test_typed_attribute_keeps_referenced_type(context: Context) {
    let tagged = render(&yaml(r#"{run_as_user: "{user.uid}", _: V1SecurityContext}"#), &context);
    assert_eq!(tagged.unwrap().child("run_as_user"), Some(&Value::Int(1234)));

    let plain = render(&yaml(r#"{run_as_user: "{user.uid}"}"#), &context);
    assert_eq!(plain.unwrap().child("run_as_user"), Some(&Value::from("1234")));

    // only direct attributes, not list items below them
    let listed = render(&yaml(r#"{args: ["{user.uid}"], _: V1Container}"#), &context).unwrap();
    assert_eq!(
        listed.child("args").and_then(Value::as_list).unwrap()[0],
        Value::from("1234")
    );
}

#[rstest]
#[case("/home/{user.name}", "/home/alice")]
#[case("uid={user.uid} gid={user.gid}", "uid=1234 gid=5678")]
#[case("{user.username}@{site}", "alice@chtc")]
#[case("{groups.1}", "staff")]
#[case("no placeholders here", "no placeholders here")]
#[case("{ not a placeholder }", "{ not a placeholder }")]
#[case("json: {\"a\": 1}", "json: {\"a\": 1}")]
fn test_embedded_placeholders(context: Context, #[case] input: &str, #[case] expected: &str) {
    let rendered = render(&Value::from(input), &context).unwrap();
    assert_eq!(rendered, Value::from(expected));
}

#[rstest]
fn test_structures_are_walked(context: Context) {
    let value = yaml(
        r#"
run_as_user: "{user.uid}"
run_as_group: "{user.gid}"
env:
  - {name: OWNER, value: "{user.name}"}
port: 8888
_: V1SecurityContext
"#,
    );
    let rendered = render(&value, &context).unwrap();
    assert_eq!(rendered.child("run_as_user"), Some(&Value::Int(1234)));
    assert_eq!(rendered.child("run_as_group"), Some(&Value::Int(5678)));
    assert_eq!(
        rendered.pointer(["env"]).and_then(Value::as_list).unwrap()[0].child("value"),
        Some(&Value::from("alice"))
    );
    assert_eq!(rendered.child("port"), Some(&Value::Int(8888)));
    assert_eq!(rendered.child(TAG_KEY), Some(&Value::from("V1SecurityContext")));
}

#[rstest]
fn test_tag_key_is_not_rendered(context: Context) {
    let value = yaml(r#"{_: "{user.name}"}"#);
    let rendered = render(&value, &context).unwrap();
    assert_eq!(rendered.child(TAG_KEY), Some(&Value::from("{user.name}")));
}

#[rstest]
#[case("{user.shoe_size}")]
#[case("home is /home/{user.shoe_size}")]
#[case("{nothing}")]
fn test_missing_reference_fails(context: Context, #[case] input: &str) {
    let err = render(&Value::from(input), &context).unwrap_err();
    assert!(matches!(err, Error::TemplateResolution { .. }), "{err}");
}

#[rstest]
fn test_unset_uid_fails_rather_than_rendering_empty() {
    let context = Context::new("img", UserInfo::default());
    let err = render(&Value::from("{user.uid}"), &context).unwrap_err();
    match err {
        Error::TemplateResolution { placeholder, .. } => assert_eq!(placeholder, "user.uid"),
        other => panic!("unexpected error: {other}"),
    }
}

#[rstest]
fn test_non_scalar_cannot_be_embedded(context: Context) {
    let err = render(&Value::from("groups: {groups}"), &context).unwrap_err();
    assert!(matches!(err, Error::TemplateResolution { .. }));
    assert!(render(&Value::from("{groups}"), &context).is_err());

    // as a typed attribute the list is substituted as-is
    let rendered = render(&yaml(r#"{groups: "{groups}", _: Team}"#), &context).unwrap();
    assert_eq!(rendered.child("groups").and_then(Value::as_list).map(|l| l.len()), Some(2));
}

#[rstest]
fn test_non_strings_pass_through(context: Context) {
    for value in [Value::Null, Value::Bool(true), Value::Int(3), Value::Float(1.5)] {
        assert_eq!(render(&value, &context).unwrap(), value);
    }
}
