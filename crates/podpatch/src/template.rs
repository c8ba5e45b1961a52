// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Substitution of `{dotted.reference}` placeholders in patch values.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::context::Context;
use crate::registry::TAG_KEY;
use crate::value::{Mapping, Value};
use crate::{Error, Result};

#[cfg(test)]
#[path = "./template_test.rs"]
mod template_test;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{[A-Za-z_][A-Za-z0-9_-]*(?:\.[A-Za-z0-9_-]+)*\}")
        .expect("placeholder pattern is valid")
});

/// Render every string in `value` against the session context.
pub fn render(value: &Value, context: &Context) -> Result<Value> {
    render_with(value, &context.to_value())
}

/// Render every string in `value` against a prepared scope.
///
/// Placeholders are replaced by the referenced scalar's text, so
/// `"{user.uid}"` in a plain mapping yields the string `"1234"`. The one
/// exception is an attribute of a typed value (a mapping carrying the tag
/// key, or an object): there a string that is exactly one placeholder is
/// replaced by the referenced value itself, so `run_as_user: "{user.uid}"`
/// in a `V1SecurityContext` yields an integer. Values under the tag key are
/// never rendered.
pub fn render_with(value: &Value, scope: &Value) -> Result<Value> {
    render_node(value, scope, false)
}

fn render_node(value: &Value, scope: &Value, typed_attribute: bool) -> Result<Value> {
    match value {
        Value::String(text) => render_str(text, scope, typed_attribute),
        Value::List(items) => items
            .iter()
            .map(|item| render_node(item, scope, false))
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
        Value::Map(map) => {
            let typed = map.contains_key(TAG_KEY);
            let mut out = Mapping::with_capacity(map.len());
            for (key, item) in map {
                let item = if key == TAG_KEY {
                    item.clone()
                } else {
                    render_node(item, scope, typed)?
                };
                out.insert(key.clone(), item);
            }
            Ok(Value::Map(out))
        }
        Value::Object(object) => {
            let mut object = object.clone();
            for (_, item) in object.attributes_mut() {
                *item = render_node(item, scope, true)?;
            }
            Ok(Value::Object(object))
        }
        other => Ok(other.clone()),
    }
}

fn render_str(text: &str, scope: &Value, native: bool) -> Result<Value> {
    if native {
        if let Some(found) = PLACEHOLDER.find(text) {
            if found.start() == 0 && found.end() == text.len() {
                return lookup(scope, reference(found.as_str())).cloned();
            }
        }
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for found in PLACEHOLDER.find_iter(text) {
        let name = reference(found.as_str());
        let resolved = lookup(scope, name)?;
        let rendered = resolved
            .to_template_string()
            .ok_or_else(|| Error::TemplateResolution {
                placeholder: name.to_string(),
                reason: format!("a {} cannot be embedded in text", resolved.describe()),
            })?;
        out.push_str(&text[last..found.start()]);
        out.push_str(&rendered);
        last = found.end();
    }
    out.push_str(&text[last..]);
    Ok(Value::String(out))
}

/// Strip the surrounding braces from a placeholder match.
fn reference(placeholder: &str) -> &str {
    &placeholder[1..placeholder.len() - 1]
}

fn lookup<'a>(scope: &'a Value, name: &str) -> Result<&'a Value> {
    let mut node = scope;
    for segment in name.split('.') {
        let next = match node {
            Value::List(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            other => other.child(segment),
        };
        node = next.ok_or_else(|| Error::TemplateResolution {
            placeholder: name.to_string(),
            reason: format!("the session context has no value for {segment:?}"),
        })?;
    }
    if node.is_null() {
        return Err(Error::TemplateResolution {
            placeholder: name.to_string(),
            reason: "the value is not set".to_string(),
        });
    }
    Ok(node)
}
