//! Defaults presented for a new cluster: the network defaults and a complete default
//! cluster spec for a provider and datacenter.
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use snafu::{OptionExt, ResultExt, Snafu, ensure};
use tracing::{debug, instrument};

use crate::{
    crd::{
        ClusterSpec, ClusterTemplate, KubermaticConfiguration, Seed,
        cluster::CloudSpec,
        seed::find_datacenter,
    },
    error::{Classify, ErrorClass},
    identity::UserInfo,
    kvp::CLUSTER_TEMPLATE_SEED_SCOPE,
    provider::{self, ProviderNameError, ProviderType},
    store::{
        ClusterSpecDefaulter, ClusterTemplateProvider, KubermaticConfigurationGetter, SeedsGetter,
        StoreError,
    },
};

pub mod network;
pub mod spec;

pub use network::{NetworkDefaults, NetworkDefaultsIpFamily, generate_network_defaults};
pub use spec::KubermaticDefaulter;

/// The container runtime of new clusters.
pub const DEFAULT_CONTAINER_RUNTIME: &str = "containerd";

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(transparent)]
    ProviderName { source: ProviderNameError },

    #[snafu(display("failed to get the kubermatic configuration"))]
    GetConfiguration { source: StoreError },

    #[snafu(display("failed to list seeds"))]
    ListSeeds { source: StoreError },

    #[snafu(display("datacenter {datacenter:?} not found"))]
    DatacenterNotFound { datacenter: String },

    #[snafu(display("datacenter {datacenter:?} is restricted"))]
    DatacenterRestricted { datacenter: String },

    #[snafu(display("failed to get default cluster template {name:?}"))]
    GetDefaultTemplate { source: StoreError, name: String },

    #[snafu(display("default cluster template {name:?} is not seed scoped"))]
    InvalidDefaultTemplate { name: String },

    #[snafu(display("failed to default the cluster spec"))]
    DefaultClusterSpec { source: StoreError },
}

impl Classify for Error {
    fn class(&self) -> ErrorClass {
        match self {
            Self::ProviderName { source } => source.class(),
            Self::DatacenterNotFound { .. } => ErrorClass::NotFound,
            Self::DatacenterRestricted { .. } => ErrorClass::Forbidden,
            Self::GetConfiguration { .. }
            | Self::ListSeeds { .. }
            | Self::GetDefaultTemplate { .. }
            | Self::InvalidDefaultTemplate { .. }
            | Self::DefaultClusterSpec { .. } => ErrorClass::Internal,
        }
    }
}

/// A cluster as returned to API callers. Default clusters are never persisted.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCluster {
    #[serde(default)]
    pub name: String,
    pub spec: ClusterSpec,
}

/// Everything the defaults of one request are computed from.
struct DefaultingContext {
    provider: ProviderType,
    config: KubermaticConfiguration,
    seed: Seed,
    template: Option<ClusterTemplate>,
}

pub struct ClusterDefaulting {
    configuration: Arc<dyn KubermaticConfigurationGetter>,
    seeds: Arc<dyn SeedsGetter>,
    templates: Arc<dyn ClusterTemplateProvider>,
    defaulter: Arc<dyn ClusterSpecDefaulter>,
}

impl ClusterDefaulting {
    pub fn new(
        configuration: Arc<dyn KubermaticConfigurationGetter>,
        seeds: Arc<dyn SeedsGetter>,
        templates: Arc<dyn ClusterTemplateProvider>,
        defaulter: Arc<dyn ClusterSpecDefaulter>,
    ) -> Self {
        Self {
            configuration,
            seeds,
            templates,
            defaulter,
        }
    }

    /// Finds the seed serving `datacenter`.
    ///
    /// Invalid seeds are ignored. Callers other than admins must pass the datacenter's email
    /// restriction.
    async fn resolve_seed(&self, user: &UserInfo, datacenter: &str) -> Result<Seed> {
        let seeds = self.seeds.seeds().await.context(ListSeedsSnafu)?;
        let valid_seeds = seeds.values().filter(|seed| !seed.is_invalid());
        let (seed, dc) = find_datacenter(valid_seeds, datacenter)
            .context(DatacenterNotFoundSnafu { datacenter })?;

        ensure!(
            user.is_admin || user.matches_email_restrictions(&dc.spec.required_emails),
            DatacenterRestrictedSnafu { datacenter }
        );
        Ok(seed.clone())
    }

    async fn default_template(&self, seed: &Seed) -> Result<Option<ClusterTemplate>> {
        let name = seed.spec.default_cluster_template.as_str();
        if name.is_empty() {
            return Ok(None);
        }

        let template = self
            .templates
            .get(name)
            .await
            .context(GetDefaultTemplateSnafu { name })?;
        ensure!(
            template.scope() == Some(CLUSTER_TEMPLATE_SEED_SCOPE),
            InvalidDefaultTemplateSnafu { name }
        );
        Ok(Some(template))
    }

    async fn load(
        &self,
        user: &UserInfo,
        provider: &str,
        datacenter: &str,
    ) -> Result<DefaultingContext> {
        let provider = provider::parse_provider_name(provider)?;
        let config = self
            .configuration
            .configuration()
            .await
            .context(GetConfigurationSnafu)?;
        let seed = self.resolve_seed(user, datacenter).await?;
        let template = self.default_template(&seed).await?;

        Ok(DefaultingContext {
            provider,
            config,
            seed,
            template,
        })
    }

    #[instrument(skip(self, user), fields(user = %user.email))]
    pub async fn network_defaults(
        &self,
        user: &UserInfo,
        provider: &str,
        datacenter: &str,
    ) -> Result<NetworkDefaults> {
        let ctx = self.load(user, provider, datacenter).await?;
        Ok(generate_network_defaults(
            ctx.provider,
            &ctx.seed,
            &ctx.config,
            ctx.template.as_ref(),
        ))
    }

    /// Builds the default cluster for `provider` in `datacenter`.
    ///
    /// The network defaults are mapped onto a fresh spec with an empty cloud block for the
    /// provider, then the spec defaulter fills in everything else, including the version.
    #[instrument(skip(self, user), fields(user = %user.email))]
    pub async fn default_cluster(
        &self,
        user: &UserInfo,
        provider: &str,
        datacenter: &str,
    ) -> Result<ApiCluster> {
        let ctx = self.load(user, provider, datacenter).await?;
        let network = generate_network_defaults(
            ctx.provider,
            &ctx.seed,
            &ctx.config,
            ctx.template.as_ref(),
        );

        let mut spec = ClusterSpec {
            cloud: CloudSpec::skeleton(ctx.provider, datacenter),
            cluster_network: network.cluster_network(),
            expose_strategy: network.cluster_expose_strategy,
            container_runtime: DEFAULT_CONTAINER_RUNTIME.to_owned(),
            enable_user_ssh_key_agent: Some(true),
            node_ports_allowed_ip_ranges: Some(network.node_ports_allowed_ip_ranges()),
            ..ClusterSpec::default()
        };

        self.defaulter
            .default_cluster_spec(&mut spec, ctx.template.as_ref(), &ctx.seed, &ctx.config)
            .context(DefaultClusterSpecSnafu)?;

        debug!(provider = %ctx.provider, "computed default cluster");
        Ok(ApiCluster {
            name: String::new(),
            spec,
        })
    }
}
