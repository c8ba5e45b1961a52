// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;
use rstest::rstest;

use super::*;

#[derive(Parser)]
struct Cli {
    #[clap(flatten)]
    show: CmdShow,
}

#[rstest]
#[case(&[], ShowFormat::Table)]
#[case(&["--format", "table"], ShowFormat::Table)]
#[case(&["--format", "yaml"], ShowFormat::Yaml)]
fn test_format_is_parsed(#[case] args: &[&str], #[case] expected: ShowFormat) {
    let argv = ["show", "-x", "context.yaml"].into_iter().chain(args.iter().copied());
    let cli = Cli::try_parse_from(argv).unwrap();
    assert_eq!(cli.show.format, expected);
}

#[rstest]
fn test_unknown_format_is_rejected() {
    let err = Cli::try_parse_from(["show", "-x", "context.yaml", "--format", "xml"]);
    assert!(err.is_err());
}
