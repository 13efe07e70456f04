use std::sync::Arc;

use http::HeaderName;
use kkp_dashboard::{
    defaulting::ClusterDefaulting,
    kube::Client,
    preset::{PresetLinkageScanner, PresetMutator, PresetResolver},
    store::{
        ClusterProviderGetter, ClusterSpecDefaulter, ClusterTemplateProvider,
        KubermaticConfigurationGetter, PresetStore, ProjectProvider, SeedsGetter, UserInfoGetter,
        kubernetes::{
            KubeClusterProviders, KubeClusterTemplates, KubeConfigurationGetter, KubePresetStore,
            KubeProjects, KubeSeeds, KubeUsers,
        },
    },
};

/// The collaborators the engines of the API are built from.
pub struct Collaborators {
    pub presets: Arc<dyn PresetStore>,
    pub seeds: Arc<dyn SeedsGetter>,
    pub cluster_providers: Arc<dyn ClusterProviderGetter>,
    pub templates: Arc<dyn ClusterTemplateProvider>,
    pub projects: Arc<dyn ProjectProvider>,
    pub configuration: Arc<dyn KubermaticConfigurationGetter>,
    pub users: Arc<dyn UserInfoGetter>,
    pub defaulter: Arc<dyn ClusterSpecDefaulter>,
}

impl Collaborators {
    /// Backs every collaborator with the Kubernetes API. Seeds and the configuration are read
    /// from `namespace`.
    pub fn kubernetes(
        client: &Client,
        namespace: &str,
        defaulter: Arc<dyn ClusterSpecDefaulter>,
    ) -> Self {
        Self {
            presets: Arc::new(KubePresetStore::new(client.clone())),
            seeds: Arc::new(KubeSeeds::new(client.clone(), namespace)),
            cluster_providers: Arc::new(KubeClusterProviders::new(client.clone())),
            templates: Arc::new(KubeClusterTemplates::new(client.clone())),
            projects: Arc::new(KubeProjects::new(client.clone())),
            configuration: Arc::new(KubeConfigurationGetter::new(client.clone(), namespace)),
            users: Arc::new(KubeUsers::new(client.clone())),
            defaulter,
        }
    }
}

/// Shared state of all handlers.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<PresetResolver>,
    pub mutator: Arc<PresetMutator>,
    pub linkages: Arc<PresetLinkageScanner>,
    pub defaulting: Arc<ClusterDefaulting>,
    pub users: Arc<dyn UserInfoGetter>,

    /// The request header the authenticating proxy puts the caller's email into.
    pub identity_header: HeaderName,
}

impl AppState {
    pub fn new(collaborators: Collaborators, identity_header: HeaderName) -> Self {
        let Collaborators {
            presets,
            seeds,
            cluster_providers,
            templates,
            projects,
            configuration,
            users,
            defaulter,
        } = collaborators;

        Self {
            resolver: Arc::new(PresetResolver::new(presets.clone())),
            mutator: Arc::new(PresetMutator::new(presets.clone())),
            linkages: Arc::new(PresetLinkageScanner::new(
                presets,
                seeds.clone(),
                cluster_providers,
                templates.clone(),
                projects,
            )),
            defaulting: Arc::new(ClusterDefaulting::new(
                configuration,
                seeds,
                templates,
                defaulter,
            )),
            users,
            identity_header,
        }
    }
}
