//! Custom resources of the `kubermatic.k8c.io/v1` API group.
use std::io::Write;

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::CustomResourceExt;
use snafu::{ResultExt, Snafu};

pub mod cluster;
pub mod cluster_template;
pub mod kubermatic_configuration;
pub mod preset;
pub mod project;
pub mod seed;
pub mod user;
pub mod user_project_binding;

pub use cluster::{Cluster, ClusterSpec};
pub use cluster_template::{ClusterTemplate, ClusterTemplateSpec};
pub use kubermatic_configuration::{KubermaticConfiguration, KubermaticConfigurationSpec};
pub use preset::{Preset, PresetSpec};
pub use project::{Project, ProjectSpec};
pub use seed::{Seed, SeedSpec};
pub use user::{User, UserSpec};
pub use user_project_binding::{UserProjectBinding, UserProjectBindingSpec};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to serialize CRD {name:?} to YAML"))]
    SerializeCrd {
        source: serde_yaml::Error,
        name: String,
    },

    #[snafu(display("failed to write CRD YAML"))]
    WriteYaml { source: std::io::Error },
}

/// Returns the definitions of all custom resources in this crate.
pub fn custom_resource_definitions() -> Vec<CustomResourceDefinition> {
    vec![
        Cluster::crd(),
        ClusterTemplate::crd(),
        KubermaticConfiguration::crd(),
        Preset::crd(),
        Project::crd(),
        Seed::crd(),
        User::crd(),
        UserProjectBinding::crd(),
    ]
}

/// Writes all custom resource definitions as a multi-document YAML stream.
pub fn write_yaml_schemas(mut writer: impl Write) -> Result<()> {
    for crd in custom_resource_definitions() {
        let name = crd.metadata.name.clone().unwrap_or_default();
        let yaml = serde_yaml::to_string(&crd).context(SerializeCrdSnafu { name })?;
        write!(writer, "---\n{yaml}").context(WriteYamlSnafu)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crd_names_and_scopes() {
        let crds: Vec<_> = custom_resource_definitions()
            .into_iter()
            .map(|crd| (crd.metadata.name.unwrap_or_default(), crd.spec.scope))
            .collect();

        assert_eq!(crds, vec![
            ("clusters.kubermatic.k8c.io".to_owned(), "Cluster".to_owned()),
            ("clustertemplates.kubermatic.k8c.io".to_owned(), "Cluster".to_owned()),
            (
                "kubermaticconfigurations.kubermatic.k8c.io".to_owned(),
                "Namespaced".to_owned()
            ),
            ("presets.kubermatic.k8c.io".to_owned(), "Cluster".to_owned()),
            ("projects.kubermatic.k8c.io".to_owned(), "Cluster".to_owned()),
            ("seeds.kubermatic.k8c.io".to_owned(), "Namespaced".to_owned()),
            ("users.kubermatic.k8c.io".to_owned(), "Cluster".to_owned()),
            (
                "userprojectbindings.kubermatic.k8c.io".to_owned(),
                "Cluster".to_owned()
            ),
        ]);
    }

    #[test]
    fn yaml_stream() {
        let mut buffer = Vec::new();
        write_yaml_schemas(&mut buffer).expect("CRDs serialize to YAML");

        let yaml = String::from_utf8(buffer).expect("YAML is valid UTF-8");
        assert_eq!(yaml.matches("---\n").count(), 8);
        assert!(yaml.contains("kind: CustomResourceDefinition"));
    }
}
