use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A project groups clusters and their members. The object name is the project ID.
#[derive(Clone, CustomResource, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[kube(
    group = "kubermatic.k8c.io",
    version = "v1",
    kind = "Project",
    plural = "projects",
    crates(
        kube_core = "kube::core",
        k8s_openapi = "k8s_openapi",
        schemars = "schemars"
    )
)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSpec {
    /// The human readable project name.
    pub name: String,
}
