use std::net::SocketAddr;

use axum::Router;
use futures_util::{FutureExt as _, select};
use snafu::{ResultExt, Snafu};
use tokio::{
    net::TcpListener,
    signal::unix::{SignalKind, signal},
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to create TCP listener by binding to socket address {socket_addr:?}"))]
    BindTcpListener {
        source: std::io::Error,
        socket_addr: SocketAddr,
    },

    #[snafu(display("failed to determine the local address of the TCP listener"))]
    LocalAddress { source: std::io::Error },

    #[snafu(display("failed to create {signal} listener"))]
    CreateSignalListener {
        source: std::io::Error,
        signal: &'static str,
    },

    #[snafu(display("failed to run HTTP server"))]
    RunServer { source: std::io::Error },
}

/// The HTTP server of the API.
pub struct ApiServer {
    listener: TcpListener,
    router: Router,
}

impl ApiServer {
    /// Binds the listener to `socket_addr`. The server doesn't accept connections before
    /// [`ApiServer::run`] is called.
    pub async fn bind(router: Router, socket_addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(socket_addr)
            .await
            .context(BindTcpListenerSnafu { socket_addr })?;
        Ok(Self { listener, router })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().context(LocalAddressSnafu)
    }

    /// Serves requests until SIGINT or SIGTERM is received. In-flight requests are completed
    /// before this returns.
    pub async fn run(self) -> Result<()> {
        let mut sigint = signal(SignalKind::interrupt())
            .context(CreateSignalListenerSnafu { signal: "SIGINT" })?;
        let mut sigterm = signal(SignalKind::terminate())
            .context(CreateSignalListenerSnafu { signal: "SIGTERM" })?;
        tracing::debug!("created unix signal handlers");

        let shutdown = async move {
            select! {
                signal = sigint.recv().fuse() => {
                    if signal.is_some() {
                        tracing::debug!("received SIGINT");
                    }
                },
                signal = sigterm.recv().fuse() => {
                    if signal.is_some() {
                        tracing::debug!("received SIGTERM");
                    }
                },
            };
            tracing::info!("shutting down");
        };

        tracing::info!(socket_addr = ?self.local_addr()?, "serving API");
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
            .context(RunServerSnafu)
    }
}
