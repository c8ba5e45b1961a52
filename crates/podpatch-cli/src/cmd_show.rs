// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `podpatch show` command.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, ValueEnum};
use colored::Colorize;
use miette::{IntoDiagnostic, Result};
use podpatch::{Context, PatchEngine, PatchOp};

#[cfg(test)]
#[path = "./cmd_show_test.rs"]
mod cmd_show_test;

/// How active patches are listed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ShowFormat {
    #[default]
    Table,
    Yaml,
}

/// List the patches a session would receive
#[derive(Debug, Args)]
pub struct CmdShow {
    #[clap(flatten)]
    config: crate::ConfigFlags,

    /// Session context file (image, user, groups)
    #[clap(short = 'x', long)]
    context: PathBuf,

    /// Output format
    #[clap(long, value_enum, default_value_t = ShowFormat::Table)]
    format: ShowFormat,
}

impl CmdShow {
    pub fn run(&mut self) -> Result<i32> {
        let config = self.config.load()?;
        let context = Context::load(&self.context)?;
        let engine = PatchEngine::new(Arc::new(config));
        let active = engine.active_patches(&context);

        if self.format == ShowFormat::Yaml {
            print!("{}", serde_yaml::to_string(&active).into_diagnostic()?);
            return Ok(0);
        }

        println!(
            "{} {} ({})",
            "Session:".bold(),
            context.user.name.cyan(),
            context.image
        );
        println!();

        if podpatch::should_except(&engine.config().exceptions, &context) {
            println!("  {}", "(image is excepted, no patches apply)".yellow());
            return Ok(0);
        }

        self.show_table(&active);
        Ok(0)
    }

    fn show_table(&self, active: &[&PatchOp]) {
        println!("{}", "Active Patches:".bold());
        println!();

        if active.is_empty() {
            println!("  {}", "(no patches)".dimmed());
        } else {
            for (i, patch) in active.iter().enumerate() {
                println!(
                    "  {}. {} {}",
                    i + 1,
                    patch.op.to_string().yellow(),
                    patch.path.green()
                );
            }
        }

        println!();
        println!("Total: {} patch(es)", active.len());
    }
}
