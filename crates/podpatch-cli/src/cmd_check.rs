// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Validate a patch configuration without a session.

use clap::Args;
use colored::Colorize;
use miette::Result;
use podpatch::{Configuration, PatchOp, TypeRegistry};

#[cfg(test)]
#[path = "./cmd_check_test.rs"]
mod cmd_check_test;

const ROOTS: &[&str] = &["pod", "notebook"];

/// Validate a patch configuration
#[derive(Debug, Args)]
pub struct CmdCheck {
    #[clap(flatten)]
    config: crate::ConfigFlags,
}

impl CmdCheck {
    pub fn run(&mut self) -> Result<i32> {
        // Patterns and patch-list references are checked while loading
        let config = self.config.load()?;
        let problems = find_problems(&config, &TypeRegistry::kubernetes());

        if problems.is_empty() {
            println!(
                "{} {} ({} exception(s), {} patch(es))",
                "✓".green(),
                self.config.config.display(),
                config.exceptions.len(),
                config.patch_ops().count()
            );
            return Ok(0);
        }

        eprintln!("{} {}", "Error:".red(), self.config.config.display());
        for (patch, problem) in &problems {
            eprintln!("  - {} ({}): {}", patch.path.cyan(), patch.op, problem);
        }
        Ok(1)
    }
}

/// Problems that only show up when a patch is applied: unknown roots, and
/// type tags or fields the registry does not know.
fn find_problems<'a>(
    config: &'a Configuration,
    registry: &TypeRegistry,
) -> Vec<(&'a PatchOp, String)> {
    let mut problems = Vec::new();
    for patch in config.patch_ops() {
        let root = patch.path.split('/').next().unwrap_or_default();
        if !ROOTS.contains(&root) {
            problems.push((patch, format!("unknown root {root:?}")));
        }
        if let Err(err) = registry.materialize(patch.value.clone()) {
            problems.push((patch, err.to_string()));
        }
    }
    problems
}
