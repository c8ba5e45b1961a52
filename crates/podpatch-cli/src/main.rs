// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! podpatch - Notebook pod patching CLI

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::Result;

mod cmd_apply;
mod cmd_check;
mod cmd_show;

use cmd_apply::CmdApply;
use cmd_check::CmdCheck;
use cmd_show::CmdShow;

#[derive(Parser)]
#[clap(
    name = "podpatch",
    about = "Notebook pod patching",
    version,
    long_about = "Apply a declarative patch configuration to notebook pod specifications"
)]
struct Opt {
    #[clap(flatten)]
    logging: Logging,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Parser)]
struct Logging {
    /// Increase verbosity (-v, -vv, -vvv)
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[clap(short, long)]
    quiet: bool,
}

#[derive(Parser, Clone, Debug)]
pub struct ConfigFlags {
    /// Patch configuration file
    #[clap(
        short,
        long,
        env = podpatch::CONFIG_ENV_VAR,
        default_value = podpatch::DEFAULT_CONFIG_PATH
    )]
    pub config: PathBuf,
}

impl ConfigFlags {
    pub fn load(&self) -> Result<podpatch::Configuration> {
        Ok(podpatch::Configuration::load(&self.config)?)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Patch a pod manifest for one session
    Apply(CmdApply),

    /// Validate a patch configuration
    Check(CmdCheck),

    /// List the patches a session would receive
    Show(CmdShow),
}

impl Opt {
    fn run(self) -> Result<i32> {
        // Setup logging
        let log_level = match (self.logging.quiet, self.logging.verbose) {
            (true, _) => tracing::Level::ERROR,
            (false, 0) => tracing::Level::WARN,
            (false, 1) => tracing::Level::INFO,
            (false, 2) => tracing::Level::DEBUG,
            (false, _) => tracing::Level::TRACE,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .init();

        match self.cmd {
            Command::Apply(mut cmd) => cmd.run(),
            Command::Check(mut cmd) => cmd.run(),
            Command::Show(mut cmd) => cmd.run(),
        }
    }
}

fn main() -> Result<()> {
    let opt = Opt::parse();
    let code = opt.run()?;
    std::process::exit(code);
}
