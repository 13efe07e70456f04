use std::sync::Arc;

use clap::Parser;
use kkp_api::{
    AppState, Collaborators,
    cli::{Cli, Command, RunArguments},
    server::{self, ApiServer},
};
use kkp_dashboard::{crd, defaulting::KubermaticDefaulter, kube};
use kkp_telemetry::Tracing;
use snafu::{ResultExt, Snafu};

const SERVICE_NAME: &str = "kkp-api";

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to print CRDs"))]
    PrintCrds { source: crd::Error },

    #[snafu(display("failed to initialize tracing"))]
    InitTracing { source: kkp_telemetry::tracing::Error },

    #[snafu(display("failed to create Kubernetes client"))]
    CreateClient { source: kube::Error },

    #[snafu(display("failed to start API server"))]
    StartServer { source: server::Error },

    #[snafu(display("failed to run API server"))]
    RunServer { source: server::Error },
}

#[snafu::report]
#[tokio::main]
async fn main() -> Result<(), Error> {
    match Cli::parse().command {
        Command::Crd => crd::write_yaml_schemas(std::io::stdout().lock()).context(PrintCrdsSnafu),
        Command::Run(run) => run_api(run).await,
    }
}

async fn run_api(run: RunArguments) -> Result<(), Error> {
    let RunArguments {
        bind_address,
        kubermatic_namespace,
        identity_header,
        telemetry,
    } = run;

    let _tracing = Tracing::from_options(SERVICE_NAME, &telemetry)
        .init()
        .context(InitTracingSnafu)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        namespace = %kubermatic_namespace,
        %identity_header,
        "starting {SERVICE_NAME}"
    );

    let client = kube::Client::try_default()
        .await
        .context(CreateClientSnafu)?;
    let collaborators = Collaborators::kubernetes(
        &client,
        &kubermatic_namespace,
        Arc::new(KubermaticDefaulter),
    );
    let router = kkp_api::router(AppState::new(collaborators, identity_header));

    ApiServer::bind(router, bind_address)
        .await
        .context(StartServerSnafu)?
        .run()
        .await
        .context(RunServerSnafu)
}
