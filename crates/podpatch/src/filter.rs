// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Rule selection: image exceptions and group membership gates.

use crate::config::ExceptionRule;
use crate::context::Context;

#[cfg(test)]
#[path = "./filter_test.rs"]
mod filter_test;

/// Answers whether a session's user belongs to a named group.
pub trait MembershipSource: Send + Sync {
    /// `None` when the source holds no record for this user.
    fn is_member(&self, context: &Context, group: &str) -> Option<bool>;
}

impl<F> MembershipSource for F
where
    F: Fn(&Context, &str) -> Option<bool> + Send + Sync,
{
    fn is_member(&self, context: &Context, group: &str) -> Option<bool> {
        self(context, group)
    }
}

/// Membership taken from the groups listed in the session context.
///
/// A context without any groups is treated as having no record.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextGroups;

impl MembershipSource for ContextGroups {
    fn is_member(&self, context: &Context, group: &str) -> Option<bool> {
        if context.groups.is_empty() {
            return None;
        }
        Some(context.groups.iter().any(|g| g == group))
    }
}

/// True if any exception rule matches the session's whole image name.
pub fn should_except(exceptions: &[ExceptionRule], context: &Context) -> bool {
    match exceptions.iter().find(|rule| rule.matches(&context.image)) {
        Some(rule) => {
            tracing::debug!(
                image = %context.image,
                pattern = rule.image(),
                "image matches exception"
            );
            true
        }
        None => false,
    }
}

/// True if the membership source says the user is in `group`.
pub fn is_eligible(membership: &dyn MembershipSource, context: &Context, group: &str) -> bool {
    let answer = membership.is_member(context, group);
    tracing::debug!(user = %context.user.name, group, ?answer, "checked membership");
    answer.unwrap_or(false)
}
