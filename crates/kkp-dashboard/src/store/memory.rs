//! In-process collaborator implementations.
//!
//! They keep their objects in plain maps and honour the same contracts as the Kubernetes
//! backed ones, including resource version checks on preset updates. Used by tests and for
//! running the API without a cluster.
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::ResourceExt;
use snafu::OptionExt as _;
use tokio::sync::RwLock;

use super::{
    ClusterProvider, ClusterProviderGetter, ClusterTemplateProvider, ConflictSnafu,
    KubermaticConfigurationGetter, NotFoundSnafu, PresetStore, ProjectProvider, Result,
    SeedsGetter, StoreError, UserInfoGetter, is_preset_visible,
};
use crate::{
    crd::{
        Cluster, ClusterTemplate, KubermaticConfiguration, Preset, Project, Seed,
        UserProjectBindingSpec,
    },
    identity::UserInfo,
    kvp::LabelSelectorExt,
};

fn select<K>(objects: &[K], selector: &LabelSelector) -> Result<Vec<K>>
where
    K: kube::Resource + Clone,
{
    let mut selected = Vec::new();
    for object in objects {
        let matches = selector
            .matches(object.labels())
            .map_err(|err| StoreError::internal("invalid label selector", err))?;
        if matches {
            selected.push(object.clone());
        }
    }
    Ok(selected)
}

#[derive(Debug, Default)]
pub struct MemoryPresetStore {
    presets: RwLock<BTreeMap<String, Preset>>,
}

impl MemoryPresetStore {
    /// Creates a store holding `presets`. Each preset starts at resource version `1`.
    pub fn new(presets: impl IntoIterator<Item = Preset>) -> Self {
        let presets = presets
            .into_iter()
            .map(|mut preset| {
                preset.metadata.resource_version = Some("1".to_owned());
                (preset.name_any(), preset)
            })
            .collect();

        Self {
            presets: RwLock::new(presets),
        }
    }

    /// Returns a preset regardless of visibility.
    pub async fn get_raw(&self, name: &str) -> Option<Preset> {
        self.presets.read().await.get(name).cloned()
    }
}

fn next_resource_version(preset: &Preset) -> String {
    let current: u64 = preset
        .metadata
        .resource_version
        .as_deref()
        .and_then(|version| version.parse().ok())
        .unwrap_or_default();
    (current + 1).to_string()
}

#[async_trait]
impl PresetStore for MemoryPresetStore {
    async fn get_presets(&self, user: &UserInfo, project_id: Option<&str>) -> Result<Vec<Preset>> {
        Ok(self
            .presets
            .read()
            .await
            .values()
            .filter(|preset| is_preset_visible(preset, user, project_id))
            .cloned()
            .collect())
    }

    async fn get_preset(
        &self,
        user: &UserInfo,
        project_id: Option<&str>,
        name: &str,
    ) -> Result<Preset> {
        self.presets
            .read()
            .await
            .get(name)
            .filter(|preset| is_preset_visible(preset, user, project_id))
            .cloned()
            .ok_or_else(|| {
                NotFoundSnafu {
                    kind: "preset",
                    name,
                }
                .build()
            })
    }

    async fn create_preset(&self, mut preset: Preset) -> Result<Preset> {
        let name = preset.name_any();
        if preset.metadata.resource_version.is_some() {
            return Err(StoreError::internal(
                format!("failed to create preset {name:?}"),
                "resourceVersion should not be set on objects to be created",
            ));
        }

        let mut presets = self.presets.write().await;
        if presets.contains_key(&name) {
            return ConflictSnafu {
                kind: "preset",
                name,
                message: "already exists",
            }
            .fail();
        }

        preset.metadata.resource_version = Some("1".to_owned());
        presets.insert(name, preset.clone());
        Ok(preset)
    }

    async fn update_preset(&self, mut preset: Preset) -> Result<Preset> {
        let name = preset.name_any();
        let mut presets = self.presets.write().await;
        let Some(current) = presets.get_mut(&name) else {
            return NotFoundSnafu {
                kind: "preset",
                name,
            }
            .fail();
        };

        if let Some(version) = preset.metadata.resource_version.as_deref()
            && current.metadata.resource_version.as_deref() != Some(version)
        {
            return ConflictSnafu {
                kind: "preset",
                name,
                message: "the object has been modified, please apply your changes to the latest \
                          version and try again",
            }
            .fail();
        }

        preset.metadata.resource_version = Some(next_resource_version(current));
        *current = preset.clone();
        Ok(preset)
    }

    async fn delete_preset(&self, name: &str) -> Result<()> {
        match self.presets.write().await.remove(name) {
            Some(_) => Ok(()),
            None => NotFoundSnafu {
                kind: "preset",
                name,
            }
            .fail(),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemorySeeds {
    seeds: BTreeMap<String, Seed>,
}

impl MemorySeeds {
    pub fn new(seeds: impl IntoIterator<Item = Seed>) -> Self {
        Self {
            seeds: seeds
                .into_iter()
                .map(|seed| (seed.name_any(), seed))
                .collect(),
        }
    }
}

#[async_trait]
impl SeedsGetter for MemorySeeds {
    async fn seeds(&self) -> Result<BTreeMap<String, Seed>> {
        Ok(self.seeds.clone())
    }
}

#[derive(Debug)]
struct MemoryClusterProvider {
    clusters: Vec<Cluster>,
}

#[async_trait]
impl ClusterProvider for MemoryClusterProvider {
    async fn list_all(&self, selector: &LabelSelector) -> Result<Vec<Cluster>> {
        select(&self.clusters, selector)
    }
}

/// Hands out per-seed cluster providers over fixed cluster lists.
#[derive(Debug, Default)]
pub struct MemoryClusterProviders {
    clusters: BTreeMap<String, Vec<Cluster>>,
    unreachable: BTreeSet<String>,
}

impl MemoryClusterProviders {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_clusters(
        mut self,
        seed: &str,
        clusters: impl IntoIterator<Item = Cluster>,
    ) -> Self {
        self.clusters
            .entry(seed.to_owned())
            .or_default()
            .extend(clusters);
        self
    }

    /// Makes constructing the provider of `seed` fail.
    #[must_use]
    pub fn with_unreachable_seed(mut self, seed: &str) -> Self {
        self.unreachable.insert(seed.to_owned());
        self
    }
}

#[async_trait]
impl ClusterProviderGetter for MemoryClusterProviders {
    async fn cluster_provider(&self, seed: &Seed) -> Result<Arc<dyn ClusterProvider>> {
        let name = seed.name_any();
        if self.unreachable.contains(&name) {
            return Err(StoreError::internal(
                format!("failed to connect to seed {name:?}"),
                std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
            ));
        }

        Ok(Arc::new(MemoryClusterProvider {
            clusters: self.clusters.get(&name).cloned().unwrap_or_default(),
        }))
    }
}

#[derive(Debug, Default)]
pub struct MemoryClusterTemplates {
    templates: Vec<ClusterTemplate>,
}

impl MemoryClusterTemplates {
    pub fn new(templates: impl IntoIterator<Item = ClusterTemplate>) -> Self {
        Self {
            templates: templates.into_iter().collect(),
        }
    }
}

#[async_trait]
impl ClusterTemplateProvider for MemoryClusterTemplates {
    async fn list_all(&self, selector: &LabelSelector) -> Result<Vec<ClusterTemplate>> {
        select(&self.templates, selector)
    }

    async fn get(&self, name: &str) -> Result<ClusterTemplate> {
        self.templates
            .iter()
            .find(|template| template.name_any() == name)
            .cloned()
            .ok_or_else(|| {
                NotFoundSnafu {
                    kind: "cluster template",
                    name,
                }
                .build()
            })
    }
}

#[derive(Debug, Default)]
pub struct MemoryProjects {
    projects: BTreeMap<String, Project>,
}

impl MemoryProjects {
    pub fn new(projects: impl IntoIterator<Item = Project>) -> Self {
        Self {
            projects: projects
                .into_iter()
                .map(|project| (project.name_any(), project))
                .collect(),
        }
    }
}

#[async_trait]
impl ProjectProvider for MemoryProjects {
    async fn get_unsecured(&self, project_id: &str) -> Result<Project> {
        self.projects.get(project_id).cloned().ok_or_else(|| {
            NotFoundSnafu {
                kind: "project",
                name: project_id,
            }
            .build()
        })
    }
}

/// A fixed global configuration.
#[derive(Debug, Default)]
pub struct StaticConfiguration {
    configuration: KubermaticConfiguration,
}

impl StaticConfiguration {
    pub fn new(configuration: KubermaticConfiguration) -> Self {
        Self { configuration }
    }
}

#[async_trait]
impl KubermaticConfigurationGetter for StaticConfiguration {
    async fn configuration(&self) -> Result<KubermaticConfiguration> {
        Ok(self.configuration.clone())
    }
}

#[derive(Debug, Default)]
pub struct MemoryUsers {
    users: BTreeMap<String, UserInfo>,
    bindings: Vec<UserProjectBindingSpec>,
}

impl MemoryUsers {
    pub fn new(users: impl IntoIterator<Item = UserInfo>) -> Self {
        Self {
            users: users
                .into_iter()
                .map(|user| (user.email.to_ascii_lowercase(), user))
                .collect(),
            bindings: Vec::new(),
        }
    }

    /// Binds `email` to `project_id` within `group`.
    pub fn with_binding(mut self, email: &str, project_id: &str, group: &str) -> Self {
        self.bindings.push(UserProjectBindingSpec {
            user_email: email.to_owned(),
            project_id: project_id.to_owned(),
            group: group.to_owned(),
        });
        self
    }
}

#[async_trait]
impl UserInfoGetter for MemoryUsers {
    async fn user_info(&self, email: &str) -> Result<UserInfo> {
        self.users
            .get(&email.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| {
                NotFoundSnafu {
                    kind: "user",
                    name: email,
                }
                .build()
            })
    }

    async fn user_info_for_project(&self, email: &str, project_id: &str) -> Result<UserInfo> {
        let user = self.user_info(email).await?;
        if user.is_admin {
            return Ok(user);
        }

        let binding = self
            .bindings
            .iter()
            .find(|binding| binding.binds(email, project_id))
            .context(NotFoundSnafu {
                kind: "project member",
                name: format!("{email}/{project_id}"),
            })?;
        Ok(user.in_project(project_id, &binding.group))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        crd::PresetSpec,
        error::{Classify, ErrorClass},
    };

    fn preset(name: &str, spec: PresetSpec) -> Preset {
        Preset::new(name, spec)
    }

    #[tokio::test]
    async fn optimistic_concurrency() {
        let store = MemoryPresetStore::new([preset("first", PresetSpec::default())]);
        let admin = UserInfo::new("admin@kubermatic.com", true);

        let stale = store
            .get_preset(&admin, None, "first")
            .await
            .expect("preset exists");

        let updated = store
            .update_preset(stale.clone())
            .await
            .expect("first update succeeds");
        assert_eq!(updated.metadata.resource_version.as_deref(), Some("2"));

        let err = store
            .update_preset(stale)
            .await
            .expect_err("stale update must conflict");
        assert_eq!(err.class(), ErrorClass::Conflict);
    }

    #[tokio::test]
    async fn create_existing_conflicts() {
        let store = MemoryPresetStore::new([preset("first", PresetSpec::default())]);

        let err = store
            .create_preset(preset("first", PresetSpec::default()))
            .await
            .expect_err("duplicate create must conflict");
        assert_eq!(err.class(), ErrorClass::Conflict);

        let err = store
            .delete_preset("missing")
            .await
            .expect_err("missing preset cannot be deleted");
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn visibility() {
        let store = MemoryPresetStore::new([
            preset("public", PresetSpec::default()),
            preset("restricted", PresetSpec {
                required_emails: vec!["kubermatic.com".to_owned()],
                ..PresetSpec::default()
            }),
            preset("project", PresetSpec {
                projects: vec!["p1".to_owned()],
                ..PresetSpec::default()
            }),
        ]);

        let names = |presets: Vec<Preset>| -> Vec<String> {
            presets.iter().map(ResourceExt::name_any).collect()
        };

        let outsider = UserInfo::new("bob@example.com", false);
        assert_eq!(
            names(store.get_presets(&outsider, None).await.expect("list")),
            vec!["project", "public"]
        );
        assert_eq!(
            names(store.get_presets(&outsider, Some("p2")).await.expect("list")),
            vec!["public"]
        );

        let member = UserInfo::new("alice@kubermatic.com", false);
        assert_eq!(
            names(store.get_presets(&member, Some("p1")).await.expect("list")),
            vec!["project", "public", "restricted"]
        );

        let err = store
            .get_preset(&outsider, None, "restricted")
            .await
            .expect_err("restricted preset is hidden");
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn project_members() {
        let users = MemoryUsers::new([
            UserInfo::new("admin@kubermatic.com", true),
            UserInfo::new("bob@example.com", false),
            UserInfo::new("mallory@example.com", false),
        ])
        .with_binding("Bob@example.com", "p1", "editors-p1");

        let bob = users
            .user_info_for_project("bob@example.com", "p1")
            .await
            .expect("bob is bound to p1");
        assert!(bob.is_member_of("p1"));
        assert_eq!(bob.groups, vec!["editors-p1"]);

        let err = users
            .user_info_for_project("bob@example.com", "p2")
            .await
            .expect_err("bob is not bound to p2");
        assert!(err.is_not_found());

        let err = users
            .user_info_for_project("mallory@example.com", "p1")
            .await
            .expect_err("mallory has no binding");
        assert!(err.is_not_found());

        let admin = users
            .user_info_for_project("admin@kubermatic.com", "p2")
            .await
            .expect("admins need no binding");
        assert!(admin.is_admin);
    }

    #[tokio::test]
    async fn unreachable_seed() {
        let providers = MemoryClusterProviders::new().with_unreachable_seed("broken");

        let err = providers
            .cluster_provider(&Seed::new("broken", Default::default()))
            .await
            .err()
            .expect("unreachable seed fails");
        assert_eq!(err.class(), ErrorClass::Internal);
    }
}
