//! imgproxy Stack CLI
//!
//! Copyright 2025 imgproxy stack contributors
//! Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
//! See the LICENSE file in the project root for details.

mod commands;
mod error;

use clap::{CommandFactory, Parser};
use commands::{completion, generate};
use tracing_subscriber::EnvFilter;

/// imgproxy Stack CLI - Generate the CloudFormation template that runs imgproxy on ECS
#[derive(Parser, Debug)]
#[command(name = "imgproxy-stack")]
#[command(
    about = "imgproxy Stack CLI - Generate the CloudFormation template that runs imgproxy on ECS",
    long_about = None
)]
#[command(version = env!("IMGPROXY_STACK_VERSION"))]
struct Cli {
    /// Output format (yaml or json)
    #[arg(short, long, default_value = "yaml")]
    format: String,

    /// Output file (standard output when omitted)
    #[arg(short, long)]
    output: Option<String>,

    /// ECS launch type (FARGATE or EC2)
    #[arg(short = 't', long, default_value = "FARGATE")]
    launch_type: String,

    /// Number of subnets to create
    #[arg(short, long, default_value_t = imgproxy_stack_compiler::config::DEFAULT_SUBNETS)]
    subnets_number: u32,

    /// Don't create a network; deploy into an existing VPC and listener
    #[arg(short = 'N', long)]
    no_network: bool,

    /// Don't create an ECS cluster; deploy into an existing one (requires --no-network)
    #[arg(short = 'C', long)]
    no_cluster: bool,

    /// Instance catalog to use instead of the embedded one
    #[arg(long)]
    instance_catalog: Option<String>,

    /// Express membership rules with Fn::Or/Fn::Equals instead of Fn::Contains
    #[arg(long)]
    lower_membership: bool,

    /// Print a completion script for the given shell (bash, zsh, fish) and exit
    #[arg(long, value_name = "SHELL")]
    completions: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,
}

/// The clap command structure, for completion generation.
pub fn get_cli_command() -> clap::Command {
    Cli::command()
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let exit_code = if let Some(shell) = cli.completions {
        completion::run(&completion::Options { shell })
    } else {
        let opts = generate::Options {
            format: cli.format,
            output: cli.output,
            launch_type: cli.launch_type,
            subnets_number: cli.subnets_number,
            no_network: cli.no_network,
            no_cluster: cli.no_cluster,
            instance_catalog: cli.instance_catalog,
            lower_membership: cli.lower_membership,
        };
        generate::run(&opts)
    };

    std::process::exit(exit_code);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_short_flags() {
        let cli = Cli::try_parse_from(["imgproxy-stack", "-f", "json", "-t", "EC2", "-s", "5", "-N", "-C", "-o", "out.json"])
            .unwrap();
        assert_eq!(cli.format, "json");
        assert_eq!(cli.launch_type, "EC2");
        assert_eq!(cli.subnets_number, 5);
        assert!(cli.no_network);
        assert!(cli.no_cluster);
        assert_eq!(cli.output.as_deref(), Some("out.json"));
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["imgproxy-stack"]).unwrap();
        assert_eq!(cli.format, "yaml");
        assert_eq!(cli.launch_type, "FARGATE");
        assert_eq!(cli.subnets_number, 3);
        assert!(!cli.no_network);
        assert!(!cli.lower_membership);
        assert!(cli.completions.is_none());
    }

    #[test]
    fn test_subnets_number_must_be_numeric() {
        assert!(Cli::try_parse_from(["imgproxy-stack", "-s", "three"]).is_err());
    }
}
