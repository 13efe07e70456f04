//! Command line interface of the `kkp-api` binary.
//!
//! ```
//! use clap::Parser;
//! use kkp_api::cli::{Cli, Command};
//!
//! let cli = Cli::parse_from(["kkp-api", "run", "--bind-address", "127.0.0.1:9000"]);
//! let Command::Run(run) = cli.command else {
//!     unreachable!()
//! };
//! assert_eq!(run.bind_address.port(), 9000);
//! ```
use std::net::SocketAddr;

use clap::{Args, Parser, Subcommand};
use http::HeaderName;
use kkp_telemetry::TelemetryOptions;

#[derive(Debug, Eq, Parser, PartialEq)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Eq, PartialEq, Subcommand)]
pub enum Command {
    /// Print CRD objects.
    Crd,

    /// Run the API server.
    Run(RunArguments),
}

#[derive(Args, Debug, Eq, PartialEq)]
pub struct RunArguments {
    /// The socket address the API listens on.
    #[arg(long, env, default_value = "0.0.0.0:8080")]
    pub bind_address: SocketAddr,

    /// The namespace holding the seeds and the KubermaticConfiguration.
    #[arg(long, env, default_value = "kubermatic")]
    pub kubermatic_namespace: String,

    /// The request header carrying the email of the authenticated caller.
    #[arg(long, env, default_value = "x-forwarded-email")]
    pub identity_header: HeaderName,

    // Flattened structs should stay at the end to keep the help headings right.
    #[command(flatten)]
    pub telemetry: TelemetryOptions,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use rstest::rstest;

    use super::*;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_defaults() {
        let cli = Cli::try_parse_from(["kkp-api", "run"]).expect("defaults parse");
        assert_eq!(
            cli.command,
            Command::Run(RunArguments {
                bind_address: "0.0.0.0:8080".parse().expect("valid socket address"),
                kubermatic_namespace: "kubermatic".to_owned(),
                identity_header: HeaderName::from_static("x-forwarded-email"),
                telemetry: TelemetryOptions::default(),
            })
        );
    }

    #[rstest]
    #[case(&["kkp-api", "crd"], true)]
    #[case(&["kkp-api", "run", "--identity-header", "X-Auth-Email"], true)]
    #[case(&["kkp-api", "run", "--bind-address", "localhost"], false)]
    #[case(&["kkp-api", "run", "--identity-header", "not a header"], false)]
    #[case(&["kkp-api"], false)]
    fn parse(#[case] args: &[&str], #[case] valid: bool) {
        assert_eq!(Cli::try_parse_from(args).is_ok(), valid);
    }
}
