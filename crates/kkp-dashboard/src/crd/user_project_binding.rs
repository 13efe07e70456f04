use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Grants a user access to a project within one group, for example `editors-<project ID>`.
#[derive(Clone, CustomResource, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[kube(
    group = "kubermatic.k8c.io",
    version = "v1",
    kind = "UserProjectBinding",
    plural = "userprojectbindings",
    crates(
        kube_core = "kube::core",
        k8s_openapi = "k8s_openapi",
        schemars = "schemars"
    )
)]
#[serde(rename_all = "camelCase")]
pub struct UserProjectBindingSpec {
    pub user_email: String,

    #[serde(rename = "projectID")]
    pub project_id: String,

    pub group: String,
}

impl UserProjectBindingSpec {
    pub fn binds(&self, email: &str, project_id: &str) -> bool {
        self.project_id == project_id && self.user_email.eq_ignore_ascii_case(email)
    }
}
