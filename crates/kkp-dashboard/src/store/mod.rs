//! Narrow collaborator interfaces the engines depend on.
//!
//! Every engine receives only the traits it needs. [`kubernetes`] backs them with the
//! Kubernetes API, [`memory`] with plain in-process maps.
use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use snafu::Snafu;

use crate::{
    crd::{Cluster, ClusterSpec, ClusterTemplate, KubermaticConfiguration, Preset, Project, Seed},
    error::{Classify, ErrorClass},
    identity::UserInfo,
};

pub mod kubernetes;
pub mod memory;

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Classified failure of a collaborator.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StoreError {
    #[snafu(display("{kind} {name:?} not found"))]
    NotFound { kind: &'static str, name: String },

    #[snafu(display("conflicting update of {kind} {name:?}: {message}"))]
    Conflict {
        kind: &'static str,
        name: String,
        message: String,
    },

    #[snafu(display("{message}"))]
    Internal {
        message: String,
        source: BoxedError,
    },
}

impl StoreError {
    pub fn internal(message: impl Into<String>, source: impl Into<BoxedError>) -> Self {
        Self::Internal {
            message: message.into(),
            source: source.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Store level visibility of a preset.
///
/// Admins see every preset. Other callers must pass the preset's email restriction. With a
/// `project_id`, presets restricted to other projects are hidden for everyone.
pub fn is_preset_visible(preset: &Preset, user: &UserInfo, project_id: Option<&str>) -> bool {
    let email_visible =
        user.is_admin || user.matches_email_restrictions(&preset.spec.required_emails);
    let project_visible =
        project_id.is_none_or(|project_id| preset.spec.is_available_in_project(project_id));
    email_visible && project_visible
}

impl Classify for StoreError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::NotFound { .. } => ErrorClass::NotFound,
            Self::Conflict { .. } => ErrorClass::Conflict,
            Self::Internal { .. } => ErrorClass::Internal,
        }
    }
}

/// Persistence of presets, with caller and project scoped visibility.
#[async_trait]
pub trait PresetStore: Send + Sync {
    /// All presets visible to `user`. With a `project_id`, presets restricted to other
    /// projects are excluded.
    async fn get_presets(&self, user: &UserInfo, project_id: Option<&str>) -> Result<Vec<Preset>>;

    /// A single visible preset, [`StoreError::NotFound`] if it does not exist or is hidden.
    async fn get_preset(
        &self,
        user: &UserInfo,
        project_id: Option<&str>,
        name: &str,
    ) -> Result<Preset>;

    async fn create_preset(&self, preset: Preset) -> Result<Preset>;

    /// Replaces a preset. A stale resource version fails with [`StoreError::Conflict`].
    async fn update_preset(&self, preset: Preset) -> Result<Preset>;

    async fn delete_preset(&self, name: &str) -> Result<()>;
}

/// Returns all seeds keyed by name.
#[async_trait]
pub trait SeedsGetter: Send + Sync {
    async fn seeds(&self) -> Result<BTreeMap<String, Seed>>;
}

/// Access to the clusters hosted on one seed.
#[async_trait]
pub trait ClusterProvider: Send + Sync {
    async fn list_all(&self, selector: &LabelSelector) -> Result<Vec<Cluster>>;
}

/// Constructs the [`ClusterProvider`] of a seed.
#[async_trait]
pub trait ClusterProviderGetter: Send + Sync {
    async fn cluster_provider(&self, seed: &Seed) -> Result<Arc<dyn ClusterProvider>>;
}

#[async_trait]
pub trait ClusterTemplateProvider: Send + Sync {
    async fn list_all(&self, selector: &LabelSelector) -> Result<Vec<ClusterTemplate>>;

    async fn get(&self, name: &str) -> Result<ClusterTemplate>;
}

#[async_trait]
pub trait ProjectProvider: Send + Sync {
    /// Looks up a project without checking the caller's membership.
    async fn get_unsecured(&self, project_id: &str) -> Result<Project>;
}

#[async_trait]
pub trait KubermaticConfigurationGetter: Send + Sync {
    async fn configuration(&self) -> Result<KubermaticConfiguration>;
}

/// Resolves the identity of a caller from the email asserted by the authenticating proxy.
#[async_trait]
pub trait UserInfoGetter: Send + Sync {
    async fn user_info(&self, email: &str) -> Result<UserInfo>;

    /// Resolves the caller as a member of `project_id`, carrying the group of its binding.
    ///
    /// Admins resolve without a binding. Other callers without a binding to the project fail
    /// with [`StoreError::NotFound`].
    async fn user_info_for_project(&self, email: &str, project_id: &str) -> Result<UserInfo>;
}

/// Provider agnostic defaulting of a cluster spec, applied after network defaulting.
pub trait ClusterSpecDefaulter: Send + Sync {
    fn default_cluster_spec(
        &self,
        spec: &mut ClusterSpec,
        template: Option<&ClusterTemplate>,
        seed: &Seed,
        config: &KubermaticConfiguration,
    ) -> Result<()>;
}
