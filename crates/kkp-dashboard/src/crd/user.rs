use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::identity::UserInfo;

#[derive(Clone, CustomResource, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[kube(
    group = "kubermatic.k8c.io",
    version = "v1",
    kind = "User",
    plural = "users",
    crates(
        kube_core = "kube::core",
        k8s_openapi = "k8s_openapi",
        schemars = "schemars"
    )
)]
#[serde(rename_all = "camelCase")]
pub struct UserSpec {
    pub email: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Admins bypass all visibility restrictions and may mutate presets.
    #[serde(default)]
    pub is_admin: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
}

impl From<&UserSpec> for UserInfo {
    fn from(spec: &UserSpec) -> Self {
        Self {
            email: spec.email.clone(),
            is_admin: spec.is_admin,
            groups: spec.groups.clone(),
            projects: Vec::new(),
        }
    }
}
