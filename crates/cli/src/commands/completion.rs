/*!
 * Copyright 2025 imgproxy stack contributors
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 *
 * Shell completion command implementation
 */

use crate::error::{CliError, CliResult};
use crate::get_cli_command;
use clap_complete::{generate, Shell};
use std::io::{self, Write};

/// Binary name the completion script registers for.
const BIN_NAME: &str = "imgproxy-stack";

pub struct Options {
    pub shell: String,
}

/// Print a shell completion script to standard output
pub fn run(options: &Options) -> i32 {
    match write_script(options, &mut io::stdout()) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("✗ Completion generation failed");
            eprintln!("  Error: {e}");
            1
        }
    }
}

fn parse_shell(name: &str) -> CliResult<Shell> {
    if name.is_empty() {
        return Err(CliError::Message(
            "Shell name is required. Supported shells: bash, zsh, fish".to_string(),
        ));
    }

    match name.to_lowercase().as_str() {
        "bash" => Ok(Shell::Bash),
        "zsh" => Ok(Shell::Zsh),
        "fish" => Ok(Shell::Fish),
        _ => Err(CliError::Message(format!(
            "Unsupported shell: {name}. Supported shells: bash, zsh, fish"
        ))),
    }
}

fn write_script(options: &Options, out: &mut dyn Write) -> CliResult<()> {
    let shell = parse_shell(&options.shell)?;
    let mut cmd = get_cli_command();
    generate(shell, &mut cmd, BIN_NAME, out);
    Ok(())
}
