//! Credential preset resolution and cluster defaulting for the Kubermatic dashboard API.
//!
//! The crate is organised bottom up: the [`provider`] registry and the custom resources in
//! [`crd`] form the data model, [`store`] defines the collaborators the engines read from and
//! write to, and [`preset`] and [`defaulting`] hold the engines themselves.

pub mod config;
pub mod crd;
pub mod defaulting;
pub mod error;
pub mod identity;
pub mod kvp;
pub mod preset;
pub mod provider;
pub mod store;

// External re-exports
pub use k8s_openapi;
pub use kube;
pub use schemars;
