//! The HTTP surface of the Kubermatic dashboard preset and defaulting API.
//!
//! [`router::router`] wires the engines of [`kkp_dashboard`] to the `/api/v2` routes,
//! [`server::ApiServer`] serves them until the process is asked to terminate.
pub mod cli;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod router;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use router::router;
pub use state::{AppState, Collaborators};
