use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::cluster::ClusterSpec;
use crate::kvp::{self, CLUSTER_TEMPLATE_NAME_LABEL, CLUSTER_TEMPLATE_SCOPE_LABEL, PROJECT_ID_LABEL};

/// A reusable cluster specification.
///
/// Templates carry their scope (`global`, `user`, `project` or `seed`) in the `scope` label.
/// Seed-scoped templates are referenced by [`SeedSpec::default_cluster_template`] and act as
/// the last defaulting layer for new clusters.
///
/// [`SeedSpec::default_cluster_template`]: super::seed::SeedSpec::default_cluster_template
#[derive(Clone, CustomResource, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[kube(
    group = "kubermatic.k8c.io",
    version = "v1",
    kind = "ClusterTemplate",
    plural = "clustertemplates",
    crates(
        kube_core = "kube::core",
        k8s_openapi = "k8s_openapi",
        schemars = "schemars"
    )
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterTemplateSpec {
    /// Labels applied to clusters created from this template.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cluster_labels: BTreeMap<String, String>,

    /// Name of the credential preset used by clusters created from this template.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub credential: String,

    #[serde(flatten)]
    pub cluster: ClusterSpec,
}

impl ClusterTemplate {
    pub fn scope(&self) -> Option<&str> {
        kvp::label(&self.metadata, CLUSTER_TEMPLATE_SCOPE_LABEL)
    }

    pub fn project_id(&self) -> Option<&str> {
        kvp::label(&self.metadata, PROJECT_ID_LABEL)
    }

    /// The human readable name: the `name` label, then the cluster name of the spec, then
    /// the object name.
    pub fn display_name(&self) -> &str {
        kvp::label(&self.metadata, CLUSTER_TEMPLATE_NAME_LABEL)
            .or_else(|| {
                Some(self.spec.cluster.human_readable_name.as_str()).filter(|name| !name.is_empty())
            })
            .or(self.metadata.name.as_deref())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;
    use crate::crd::cluster::ExposeStrategy;

    #[test]
    fn deserialize_template() {
        let template: ClusterTemplate = serde_yaml::from_str(indoc! {"
            apiVersion: kubermatic.k8c.io/v1
            kind: ClusterTemplate
            metadata:
              name: ct-4x7b
              labels:
                scope: seed
                name: default-template
            spec:
              credential: my-preset
              humanReadableName: from-template
              exposeStrategy: LoadBalancer
              clusterNetwork:
                nodeCidrMaskSizeIPv4: 28
        "})
        .expect("template must deserialize");

        assert_eq!(template.scope(), Some("seed"));
        assert_eq!(template.project_id(), None);
        assert_eq!(template.display_name(), "default-template");
        assert_eq!(template.spec.credential, "my-preset");
        assert_eq!(
            template.spec.cluster.expose_strategy,
            Some(ExposeStrategy::LoadBalancer)
        );
        assert_eq!(
            template.spec.cluster.cluster_network.node_cidr_mask_size_ipv4,
            Some(28)
        );
    }

    #[test]
    fn display_name_fallbacks() {
        let mut template = ClusterTemplate::new("ct-1", ClusterTemplateSpec::default());
        assert_eq!(template.display_name(), "ct-1");

        template.spec.cluster.human_readable_name = "readable".to_owned();
        assert_eq!(template.display_name(), "readable");
    }
}
