use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::cluster::ExposeStrategy;

/// The global platform configuration. Exactly one is expected in the platform namespace.
#[derive(Clone, CustomResource, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[kube(
    group = "kubermatic.k8c.io",
    version = "v1",
    kind = "KubermaticConfiguration",
    plural = "kubermaticconfigurations",
    derive = "Default",
    crates(
        kube_core = "kube::core",
        k8s_openapi = "k8s_openapi",
        schemars = "schemars"
    ),
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct KubermaticConfigurationSpec {
    /// The default expose strategy for user clusters. Seeds may override it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expose_strategy: Option<ExposeStrategy>,

    #[serde(default)]
    pub versions: KubermaticVersioningConfiguration,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KubermaticVersioningConfiguration {
    /// The version new clusters are created with if none is requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    /// All versions offered to users.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub versions: Vec<String>,
}
