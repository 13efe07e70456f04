//! The built-in provider agnostic cluster spec defaulting.
use snafu::{ResultExt, Snafu};
use tracing::debug;

use super::network::NetworkDefaults;
use crate::{
    config::merge::Merge,
    crd::{
        ClusterSpec, ClusterTemplate, KubermaticConfiguration, Seed,
        cluster::{CniPluginSettings, CniPluginType, ExposeStrategy},
    },
    store::{ClusterSpecDefaulter, StoreError},
};

/// The Cilium version installed into new clusters.
pub const DEFAULT_CILIUM_VERSION: &str = "1.15.3";

#[derive(Debug, Snafu)]
#[snafu(display(
    "default version {version:?} of the kubermatic configuration is not a valid version"
))]
pub struct InvalidVersionError {
    source: semver::Error,
    version: String,
}

/// The default Kubernetes version of the global configuration.
///
/// A leading `v` is accepted. The configured string is returned unchanged.
pub fn default_version(
    config: &KubermaticConfiguration,
) -> Result<Option<String>, InvalidVersionError> {
    let Some(version) = config
        .spec
        .versions
        .default
        .as_deref()
        .filter(|version| !version.is_empty())
    else {
        return Ok(None);
    };

    semver::Version::parse(version.trim_start_matches('v'))
        .context(InvalidVersionSnafu { version })?;
    Ok(Some(version.to_owned()))
}

/// Defaults a cluster spec from the default cluster template, the seed and the global
/// configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct KubermaticDefaulter;

impl ClusterSpecDefaulter for KubermaticDefaulter {
    fn default_cluster_spec(
        &self,
        spec: &mut ClusterSpec,
        template: Option<&ClusterTemplate>,
        seed: &Seed,
        config: &KubermaticConfiguration,
    ) -> Result<(), StoreError> {
        if let Some(template) = template {
            spec.merge(&template.spec.cluster);
        }

        spec.expose_strategy = spec
            .expose_strategy
            .or(seed.spec.expose_strategy)
            .or(config.spec.expose_strategy)
            .or(Some(ExposeStrategy::default()));

        spec.cni_plugin.merge(&Some(CniPluginSettings {
            plugin_type: CniPluginType::Cilium,
            version: DEFAULT_CILIUM_VERSION.to_owned(),
        }));

        if let Some(provider) = spec.cloud.provider() {
            let builtin = NetworkDefaults::builtin(provider);
            spec.cluster_network.merge(&builtin.cluster_network());
            spec.node_ports_allowed_ip_ranges
                .merge(&Some(builtin.node_ports_allowed_ip_ranges()));
        }

        if spec.version.is_none() {
            spec.version = default_version(config)
                .map_err(|err| StoreError::internal("failed to default the cluster version", err))?;
        }

        debug!(
            version = ?spec.version,
            expose_strategy = ?spec.expose_strategy,
            "defaulted cluster spec"
        );
        Ok(())
    }
}
