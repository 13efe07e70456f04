//! Collaborators backed by the Kubernetes API of the master cluster, and of the seed clusters
//! for cluster listings.
use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use k8s_openapi::{
    api::core::v1::Secret, apimachinery::pkg::apis::meta::v1::LabelSelector,
};
use kube::{
    Api, Client, Config, ResourceExt,
    api::{DeleteParams, ListParams, PostParams},
    config::{KubeConfigOptions, Kubeconfig},
};
use tracing::{debug, instrument};

use super::{
    ClusterProvider, ClusterProviderGetter, ClusterTemplateProvider,
    KubermaticConfigurationGetter, NotFoundSnafu, PresetStore, ProjectProvider, Result,
    SeedsGetter, StoreError, UserInfoGetter, is_preset_visible,
};
use crate::{
    crd::{
        Cluster, ClusterTemplate, KubermaticConfiguration, Preset, Project, Seed, User,
        UserProjectBinding,
    },
    identity::UserInfo,
    kvp::LabelSelectorExt,
};

/// The key holding the kubeconfig in a seed's kubeconfig Secret.
const SEED_KUBECONFIG_KEY: &str = "kubeconfig";

/// Classifies a [`kube::Error`] by the status code of the API response.
fn classify(kind: &'static str, name: &str) -> impl FnOnce(kube::Error) -> StoreError {
    move |error| {
        if let kube::Error::Api(response) = &error {
            match response.code {
                404 => {
                    return StoreError::NotFound {
                        kind,
                        name: name.to_owned(),
                    };
                }
                409 => {
                    return StoreError::Conflict {
                        kind,
                        name: name.to_owned(),
                        message: response.message.clone(),
                    };
                }
                _ => {}
            }
        }
        StoreError::internal(format!("failed to access {kind} {name:?}"), error)
    }
}

fn list_params(selector: &LabelSelector) -> Result<ListParams> {
    let query = selector
        .to_query_string()
        .map_err(|err| StoreError::internal("invalid label selector", err))?;
    Ok(ListParams::default().labels(&query))
}

pub struct KubePresetStore {
    api: Api<Preset>,
}

impl KubePresetStore {
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }
}

#[async_trait]
impl PresetStore for KubePresetStore {
    async fn get_presets(&self, user: &UserInfo, project_id: Option<&str>) -> Result<Vec<Preset>> {
        let presets = self
            .api
            .list(&ListParams::default())
            .await
            .map_err(classify("preset", ""))?;

        Ok(presets
            .items
            .into_iter()
            .filter(|preset| is_preset_visible(preset, user, project_id))
            .collect())
    }

    async fn get_preset(
        &self,
        user: &UserInfo,
        project_id: Option<&str>,
        name: &str,
    ) -> Result<Preset> {
        let preset = self.api.get(name).await.map_err(classify("preset", name))?;
        if !is_preset_visible(&preset, user, project_id) {
            return NotFoundSnafu {
                kind: "preset",
                name,
            }
            .fail();
        }
        Ok(preset)
    }

    async fn create_preset(&self, preset: Preset) -> Result<Preset> {
        let name = preset.name_any();
        self.api
            .create(&PostParams::default(), &preset)
            .await
            .map_err(classify("preset", &name))
    }

    async fn update_preset(&self, preset: Preset) -> Result<Preset> {
        let name = preset.name_any();
        self.api
            .replace(&name, &PostParams::default(), &preset)
            .await
            .map_err(classify("preset", &name))
    }

    async fn delete_preset(&self, name: &str) -> Result<()> {
        self.api
            .delete(name, &DeleteParams::default())
            .await
            .map_err(classify("preset", name))?;
        Ok(())
    }
}

/// Seeds living in the platform namespace of the master cluster.
pub struct KubeSeeds {
    api: Api<Seed>,
}

impl KubeSeeds {
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
        }
    }
}

#[async_trait]
impl SeedsGetter for KubeSeeds {
    async fn seeds(&self) -> Result<BTreeMap<String, Seed>> {
        let seeds = self
            .api
            .list(&ListParams::default())
            .await
            .map_err(classify("seed", ""))?;

        Ok(seeds
            .items
            .into_iter()
            .map(|seed| (seed.name_any(), seed))
            .collect())
    }
}

struct KubeClusterProvider {
    api: Api<Cluster>,
}

#[async_trait]
impl ClusterProvider for KubeClusterProvider {
    async fn list_all(&self, selector: &LabelSelector) -> Result<Vec<Cluster>> {
        let clusters = self
            .api
            .list(&list_params(selector)?)
            .await
            .map_err(classify("cluster", ""))?;
        Ok(clusters.items)
    }
}

/// Connects to seed clusters using the kubeconfig Secret referenced by each Seed.
pub struct KubeClusterProviders {
    client: Client,
}

impl KubeClusterProviders {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn seed_kubeconfig(&self, seed: &Seed) -> Result<Kubeconfig> {
        let seed_name = seed.name_any();
        let reference = seed.spec.kubeconfig.as_ref().ok_or_else(|| {
            StoreError::internal(
                format!("seed {seed_name:?} does not reference a kubeconfig"),
                "missing spec.kubeconfig",
            )
        })?;

        let secret_name = reference.name.clone().unwrap_or_default();
        let namespace = reference
            .namespace
            .clone()
            .or_else(|| seed.namespace())
            .unwrap_or_default();

        let secret = Api::<Secret>::namespaced(self.client.clone(), &namespace)
            .get(&secret_name)
            .await
            .map_err(classify("secret", &secret_name))?;

        let kubeconfig = secret
            .data
            .as_ref()
            .and_then(|data| data.get(SEED_KUBECONFIG_KEY))
            .ok_or_else(|| {
                StoreError::internal(
                    format!("secret {namespace}/{secret_name} has no {SEED_KUBECONFIG_KEY:?} key"),
                    "missing kubeconfig key",
                )
            })?;

        let kubeconfig = std::str::from_utf8(&kubeconfig.0).map_err(|err| {
            StoreError::internal(format!("kubeconfig of seed {seed_name:?} is not UTF-8"), err)
        })?;

        Kubeconfig::from_yaml(kubeconfig).map_err(|err| {
            StoreError::internal(format!("failed to parse kubeconfig of seed {seed_name:?}"), err)
        })
    }
}

#[async_trait]
impl ClusterProviderGetter for KubeClusterProviders {
    #[instrument(skip_all, fields(seed = %seed.name_any()))]
    async fn cluster_provider(&self, seed: &Seed) -> Result<Arc<dyn ClusterProvider>> {
        let seed_name = seed.name_any();
        let kubeconfig = self.seed_kubeconfig(seed).await?;

        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|err| {
                let message = format!("failed to load kubeconfig of seed {seed_name:?}");
                StoreError::internal(message, err)
            })?;
        let client = Client::try_from(config).map_err(|err| {
            StoreError::internal(format!("failed to create client for seed {seed_name:?}"), err)
        })?;

        debug!("connected to seed cluster");
        Ok(Arc::new(KubeClusterProvider {
            api: Api::all(client),
        }))
    }
}

pub struct KubeClusterTemplates {
    api: Api<ClusterTemplate>,
}

impl KubeClusterTemplates {
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }
}

#[async_trait]
impl ClusterTemplateProvider for KubeClusterTemplates {
    async fn list_all(&self, selector: &LabelSelector) -> Result<Vec<ClusterTemplate>> {
        let templates = self
            .api
            .list(&list_params(selector)?)
            .await
            .map_err(classify("cluster template", ""))?;
        Ok(templates.items)
    }

    async fn get(&self, name: &str) -> Result<ClusterTemplate> {
        self.api
            .get(name)
            .await
            .map_err(classify("cluster template", name))
    }
}

pub struct KubeProjects {
    api: Api<Project>,
}

impl KubeProjects {
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }
}

#[async_trait]
impl ProjectProvider for KubeProjects {
    async fn get_unsecured(&self, project_id: &str) -> Result<Project> {
        self.api
            .get(project_id)
            .await
            .map_err(classify("project", project_id))
    }
}

/// Reads the single KubermaticConfiguration of the platform namespace.
pub struct KubeConfigurationGetter {
    api: Api<KubermaticConfiguration>,
    namespace: String,
}

impl KubeConfigurationGetter {
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
            namespace: namespace.to_owned(),
        }
    }
}

#[async_trait]
impl KubermaticConfigurationGetter for KubeConfigurationGetter {
    async fn configuration(&self) -> Result<KubermaticConfiguration> {
        let mut configurations = self
            .api
            .list(&ListParams::default())
            .await
            .map_err(classify("kubermatic configuration", &self.namespace))?
            .items;

        match configurations.len() {
            0 => NotFoundSnafu {
                kind: "kubermatic configuration",
                name: &self.namespace,
            }
            .fail(),
            1 => Ok(configurations.remove(0)),
            count => Err(StoreError::internal(
                format!(
                    "expected exactly one kubermatic configuration in namespace {:?}",
                    self.namespace
                ),
                format!("found {count}"),
            )),
        }
    }
}

pub struct KubeUsers {
    api: Api<User>,
    bindings: Api<UserProjectBinding>,
}

impl KubeUsers {
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client.clone()),
            bindings: Api::all(client),
        }
    }
}

#[async_trait]
impl UserInfoGetter for KubeUsers {
    async fn user_info(&self, email: &str) -> Result<UserInfo> {
        let users = self
            .api
            .list(&ListParams::default())
            .await
            .map_err(classify("user", email))?;

        users
            .items
            .iter()
            .find(|user| user.spec.email.eq_ignore_ascii_case(email))
            .map(|user| UserInfo::from(&user.spec))
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

        let member = format!("{email}/{project_id}");
        let bindings = self
            .bindings
            .list(&ListParams::default())
            .await
            .map_err(classify("project member", &member))?;

        let binding = bindings
            .items
            .iter()
            .find(|binding| binding.spec.binds(email, project_id))
            .ok_or_else(|| {
                NotFoundSnafu {
                    kind: "project member",
                    name: &member,
                }
                .build()
            })?;
        debug!(%member, group = %binding.spec.group, "resolved project member");
        Ok(user.in_project(project_id, &binding.spec.group))
    }
}
