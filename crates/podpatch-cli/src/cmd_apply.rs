// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `podpatch apply` command.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, ValueEnum};
use miette::{IntoDiagnostic, Result};
use podpatch::{Context, PatchEngine, PodDocument, Value};

#[cfg(test)]
#[path = "./cmd_apply_test.rs"]
mod cmd_apply_test;

/// Output format for the patched pod
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl OutputFormat {
    pub fn render(&self, pod: &Value) -> Result<String> {
        match self {
            OutputFormat::Yaml => serde_yaml::to_string(pod).into_diagnostic(),
            OutputFormat::Json => serde_json::to_string_pretty(pod).into_diagnostic(),
        }
    }
}

/// Patch a pod manifest for one session
#[derive(Debug, Args)]
pub struct CmdApply {
    #[clap(flatten)]
    config: crate::ConfigFlags,

    /// Session context file (image, user, groups)
    #[clap(short = 'x', long)]
    context: PathBuf,

    /// Pod manifest to patch
    pod: PathBuf,

    /// Name of the notebook container in the pod
    #[clap(long, default_value = podpatch::NOTEBOOK_CONTAINER_NAME)]
    notebook: String,

    /// Output format
    #[clap(long, value_enum, default_value_t = OutputFormat::Yaml)]
    format: OutputFormat,
}

impl CmdApply {
    pub fn run(&mut self) -> Result<i32> {
        print!("{}", self.patched()?);
        Ok(0)
    }

    /// Load the inputs, patch the pod and render it in the chosen format.
    fn patched(&self) -> Result<String> {
        let config = self.config.load()?;
        let context = Context::load(&self.context)?;
        let engine = PatchEngine::new(Arc::new(config));

        let mut document =
            PodDocument::load(&self.pod, engine.registry())?.with_notebook_container(&self.notebook);
        let applied = engine.apply(&mut document, &context)?;
        tracing::info!(applied, pod = %self.pod.display(), "patched pod");

        self.format.render(&document.pod)
    }
}
