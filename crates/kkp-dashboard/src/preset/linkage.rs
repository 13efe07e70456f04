//! Finds the clusters and cluster templates created from a preset.
//!
//! Objects created from a preset carry the credential preset label and name the preset in an
//! annotation. There is no index, so every seed's clusters and all templates are scanned.
use std::sync::Arc;

use kube::ResourceExt;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu, ensure};
use tracing::{debug, instrument, warn};

use crate::{
    crd::{Cluster, ClusterTemplate, Seed},
    error::{Classify, ErrorClass},
    identity::UserInfo,
    kvp,
    store::{
        ClusterProviderGetter, ClusterTemplateProvider, PresetStore, ProjectProvider, SeedsGetter,
        StoreError,
    },
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("only administrators may inspect preset linkages"))]
    NotAdmin,

    #[snafu(display("failed to get preset {name:?}"))]
    GetPreset { source: StoreError, name: String },

    #[snafu(display("failed to list seeds"))]
    ListSeeds { source: StoreError },

    #[snafu(display("failed to list cluster templates"))]
    ListClusterTemplates { source: StoreError },
}

impl Classify for Error {
    fn class(&self) -> ErrorClass {
        match self {
            Self::NotAdmin => ErrorClass::Forbidden,
            // Kept as a bad request rather than not found for existing API consumers.
            Self::GetPreset { source, .. } if source.is_not_found() => ErrorClass::BadRequest,
            Self::GetPreset { source, .. } => source.class(),
            Self::ListSeeds { .. } | Self::ListClusterTemplates { .. } => ErrorClass::Internal,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetStats {
    pub associated_clusters: usize,
    pub associated_cluster_templates: usize,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetLinkages {
    pub preset_name: String,
    pub clusters: Vec<ClusterAssociation>,
    pub cluster_templates: Vec<ClusterTemplateAssociation>,
}

impl PresetLinkages {
    pub fn stats(&self) -> PresetStats {
        PresetStats {
            associated_clusters: self.clusters.len(),
            associated_cluster_templates: self.cluster_templates.len(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterAssociation {
    pub cluster_id: String,
    pub cluster_name: String,
    pub project_id: String,
    pub project_name: String,
    pub provider: String,
    pub datacenter: String,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterTemplateAssociation {
    pub template_id: String,
    pub template_name: String,
    pub project_id: String,
    pub project_name: String,
    pub provider: String,
    pub datacenter: String,
}

pub struct PresetLinkageScanner {
    presets: Arc<dyn PresetStore>,
    seeds: Arc<dyn SeedsGetter>,
    cluster_providers: Arc<dyn ClusterProviderGetter>,
    templates: Arc<dyn ClusterTemplateProvider>,
    projects: Arc<dyn ProjectProvider>,
}

impl PresetLinkageScanner {
    pub fn new(
        presets: Arc<dyn PresetStore>,
        seeds: Arc<dyn SeedsGetter>,
        cluster_providers: Arc<dyn ClusterProviderGetter>,
        templates: Arc<dyn ClusterTemplateProvider>,
        projects: Arc<dyn ProjectProvider>,
    ) -> Self {
        Self {
            presets,
            seeds,
            cluster_providers,
            templates,
            projects,
        }
    }

    pub async fn stats(&self, user: &UserInfo, preset_name: &str) -> Result<PresetStats> {
        Ok(self.linkages(user, preset_name).await?.stats())
    }

    /// Collects all clusters (across seeds) and cluster templates referencing the preset.
    ///
    /// Seeds in the `Invalid` phase are skipped. A seed that cannot be reached is logged and
    /// skipped, so the result may be partial.
    #[instrument(skip(self, user), fields(user = %user.email))]
    pub async fn linkages(&self, user: &UserInfo, preset_name: &str) -> Result<PresetLinkages> {
        ensure!(user.is_admin, NotAdminSnafu);

        let preset = self
            .presets
            .get_preset(user, None, preset_name)
            .await
            .context(GetPresetSnafu { name: preset_name })?;
        let preset_name = preset.name_any();

        let seeds = self.seeds.seeds().await.context(ListSeedsSnafu)?;
        let mut clusters = Vec::new();
        for (seed_name, seed) in &seeds {
            if seed.is_invalid() {
                debug!(seed = seed_name, "skipping invalid seed");
                continue;
            }

            for cluster in self.seed_clusters(seed_name, seed).await {
                if kvp::references_preset(&cluster.metadata, &preset_name) {
                    clusters.push(self.cluster_association(&cluster).await);
                }
            }
        }

        let selector = kvp::credential_preset_selector();
        let templates = self
            .templates
            .list_all(&selector)
            .await
            .context(ListClusterTemplatesSnafu)?;
        let mut cluster_templates = Vec::new();
        for template in templates
            .iter()
            .filter(|template| kvp::references_preset(&template.metadata, &preset_name))
        {
            cluster_templates.push(self.template_association(template).await);
        }

        Ok(PresetLinkages {
            preset_name,
            clusters,
            cluster_templates,
        })
    }

    /// Lists the preset labelled clusters of one seed. Failures are logged and yield no
    /// clusters.
    async fn seed_clusters(&self, seed_name: &str, seed: &Seed) -> Vec<Cluster> {
        let provider = match self.cluster_providers.cluster_provider(seed).await {
            Ok(provider) => provider,
            Err(error) => {
                warn!(
                    seed = seed_name,
                    error = &error as &dyn std::error::Error,
                    "failed to create cluster provider, skipping seed"
                );
                return Vec::new();
            }
        };

        match provider.list_all(&kvp::credential_preset_selector()).await {
            Ok(clusters) => clusters,
            Err(error) => {
                warn!(
                    seed = seed_name,
                    error = &error as &dyn std::error::Error,
                    "failed to list clusters, skipping seed"
                );
                Vec::new()
            }
        }
    }

    /// Resolves the project name, falling back to the project ID.
    async fn project_name(&self, project_id: &str) -> String {
        if project_id.is_empty() {
            return String::new();
        }

        match self.projects.get_unsecured(project_id).await {
            Ok(project) => project.spec.name,
            Err(error) => {
                debug!(
                    project_id,
                    error = &error as &dyn std::error::Error,
                    "failed to resolve project name"
                );
                project_id.to_owned()
            }
        }
    }

    async fn cluster_association(&self, cluster: &Cluster) -> ClusterAssociation {
        let project_id = cluster.project_id().unwrap_or_default().to_owned();
        ClusterAssociation {
            cluster_id: cluster.name_any(),
            cluster_name: cluster.spec.human_readable_name.clone(),
            project_name: self.project_name(&project_id).await,
            project_id,
            provider: provider_name(&cluster.spec.cloud),
            datacenter: cluster.spec.cloud.datacenter_name.clone(),
        }
    }

    async fn template_association(&self, template: &ClusterTemplate) -> ClusterTemplateAssociation {
        let project_id = template.project_id().unwrap_or_default().to_owned();
        ClusterTemplateAssociation {
            template_id: template.name_any(),
            template_name: template.display_name().to_owned(),
            project_name: self.project_name(&project_id).await,
            project_id,
            provider: provider_name(&template.spec.cluster.cloud),
            datacenter: template.spec.cluster.cloud.datacenter_name.clone(),
        }
    }
}

fn provider_name(cloud: &crate::crd::cluster::CloudSpec) -> String {
    cloud
        .provider()
        .map(|provider| provider.name().to_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    use super::*;
    use crate::{
        crd::{
            ClusterSpec, ClusterTemplateSpec, Preset, PresetSpec, Project, ProjectSpec, SeedSpec,
            cluster::CloudSpec,
            seed::{SeedPhase, SeedStatus},
        },
        provider::ProviderType,
        store::memory::{
            MemoryClusterProviders, MemoryClusterTemplates, MemoryPresetStore, MemoryProjects,
            MemorySeeds,
        },
    };

    fn metadata(name: &str, preset: Option<&str>, project_id: &str) -> ObjectMeta {
        ObjectMeta {
            name: Some(name.to_owned()),
            labels: Some(BTreeMap::from([
                (kvp::IS_CREDENTIAL_PRESET_LABEL.to_owned(), "true".to_owned()),
                (kvp::PROJECT_ID_LABEL.to_owned(), project_id.to_owned()),
            ])),
            annotations: preset.map(|preset| {
                BTreeMap::from([(kvp::PRESET_NAME_ANNOTATION.to_owned(), preset.to_owned())])
            }),
            ..ObjectMeta::default()
        }
    }

    fn cluster(name: &str, preset: Option<&str>) -> Cluster {
        Cluster {
            metadata: metadata(name, preset, "p1"),
            spec: ClusterSpec {
                human_readable_name: format!("{name}-readable"),
                cloud: CloudSpec::skeleton(ProviderType::Aws, "aws-eu-central-1a"),
                ..ClusterSpec::default()
            },
        }
    }

    fn seed(name: &str, phase: SeedPhase) -> Seed {
        let mut seed = Seed::new(name, SeedSpec::default());
        seed.status = Some(SeedStatus { phase: Some(phase) });
        seed
    }

    fn scanner(presets: Vec<Preset>) -> PresetLinkageScanner {
        let clusters = MemoryClusterProviders::new()
            .with_clusters("healthy", [
                cluster("c1", Some("my-preset")),
                cluster("c2", Some("other-preset")),
                cluster("c3", None),
            ])
            .with_clusters("invalid", [cluster("c4", Some("my-preset"))])
            .with_unreachable_seed("broken");

        let template = ClusterTemplate {
            metadata: metadata("ct1", Some("my-preset"), "unknown-project"),
            spec: ClusterTemplateSpec {
                cluster: ClusterSpec {
                    cloud: CloudSpec::skeleton(ProviderType::Hetzner, "hetzner-fsn1"),
                    ..ClusterSpec::default()
                },
                ..ClusterTemplateSpec::default()
            },
        };

        PresetLinkageScanner::new(
            Arc::new(MemoryPresetStore::new(presets)),
            Arc::new(MemorySeeds::new([
                seed("healthy", SeedPhase::Healthy),
                seed("invalid", SeedPhase::Invalid),
                seed("broken", SeedPhase::Healthy),
            ])),
            Arc::new(clusters),
            Arc::new(MemoryClusterTemplates::new([template])),
            Arc::new(MemoryProjects::new([Project::new("p1", ProjectSpec {
                name: "My Project".to_owned(),
            })])),
        )
    }

    fn admin() -> UserInfo {
        UserInfo::new("admin@kubermatic.com", true)
    }

    #[tokio::test]
    async fn linkages_skip_invalid_and_broken_seeds() {
        let scanner = scanner(vec![Preset::new("my-preset", PresetSpec::default())]);

        let linkages = scanner
            .linkages(&admin(), "my-preset")
            .await
            .expect("scan succeeds");

        assert_eq!(linkages.clusters, vec![ClusterAssociation {
            cluster_id: "c1".to_owned(),
            cluster_name: "c1-readable".to_owned(),
            project_id: "p1".to_owned(),
            project_name: "My Project".to_owned(),
            provider: "aws".to_owned(),
            datacenter: "aws-eu-central-1a".to_owned(),
        }]);
        assert_eq!(linkages.cluster_templates, vec![ClusterTemplateAssociation {
            template_id: "ct1".to_owned(),
            template_name: "ct1".to_owned(),
            project_id: "unknown-project".to_owned(),
            project_name: "unknown-project".to_owned(),
            provider: "hetzner".to_owned(),
            datacenter: "hetzner-fsn1".to_owned(),
        }]);

        let stats = scanner
            .stats(&admin(), "my-preset")
            .await
            .expect("scan succeeds");
        assert_eq!(stats, PresetStats {
            associated_clusters: 1,
            associated_cluster_templates: 1,
        });
    }

    #[tokio::test]
    async fn missing_preset_is_a_bad_request() {
        let err = scanner(Vec::new())
            .stats(&admin(), "my-preset")
            .await
            .expect_err("preset is missing");
        assert_eq!(err.class(), ErrorClass::BadRequest);
    }

    #[tokio::test]
    async fn non_admins_are_forbidden() {
        let err = scanner(vec![Preset::new("my-preset", PresetSpec::default())])
            .linkages(&UserInfo::new("bob@example.com", false), "my-preset")
            .await
            .expect_err("non-admin is rejected");
        assert_eq!(err.class(), ErrorClass::Forbidden);
    }
}
