//! The user cluster resource and the networking types shared with seeds, templates and the
//! global configuration.
use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::SecretReference;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{
    config::merge::{Atomic, Merge},
    kvp::{self, PROJECT_ID_LABEL},
    provider::ProviderType,
};

/// How the control plane of a user cluster is exposed.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    EnumString,
    Eq,
    JsonSchema,
    PartialEq,
    Serialize,
)]
pub enum ExposeStrategy {
    #[default]
    NodePort,
    LoadBalancer,
    Tunneling,
}

impl Atomic for ExposeStrategy {}

#[derive(
    Clone, Copy, Debug, Deserialize, Display, EnumString, Eq, JsonSchema, PartialEq, Serialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProxyMode {
    Ipvs,
    Iptables,
    Ebpf,
}

impl Atomic for ProxyMode {}

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    EnumString,
    Eq,
    JsonSchema,
    PartialEq,
    Serialize,
)]
pub enum IpFamily {
    #[default]
    #[serde(rename = "IPv4")]
    #[strum(serialize = "IPv4")]
    Ipv4,

    #[serde(rename = "IPv4+IPv6")]
    #[strum(serialize = "IPv4+IPv6")]
    DualStack,
}

impl Atomic for IpFamily {}

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    EnumString,
    Eq,
    JsonSchema,
    PartialEq,
    Serialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CniPluginType {
    #[default]
    Cilium,
    Canal,
    None,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CniPluginSettings {
    #[serde(rename = "type")]
    pub plugin_type: CniPluginType,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
}

impl Atomic for CniPluginSettings {}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRanges {
    #[serde(default)]
    pub cidr_blocks: Vec<String>,
}

impl NetworkRanges {
    pub fn new<I, S>(cidr_blocks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cidr_blocks: cidr_blocks.into_iter().map(Into::into).collect(),
        }
    }
}

impl Atomic for NetworkRanges {}

impl Merge for NetworkRanges {
    fn merge(&mut self, defaults: &Self) {
        if self.cidr_blocks.is_empty() {
            self.cidr_blocks.clone_from(&defaults.cidr_blocks);
        }
    }
}

/// The networking configuration of a user cluster.
#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNetworkingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_family: Option<IpFamily>,

    #[serde(default)]
    pub pods: NetworkRanges,

    #[serde(default)]
    pub services: NetworkRanges,

    #[serde(
        rename = "nodeCidrMaskSizeIPv4",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub node_cidr_mask_size_ipv4: Option<i32>,

    #[serde(
        rename = "nodeCidrMaskSizeIPv6",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub node_cidr_mask_size_ipv6: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_mode: Option<ProxyMode>,

    #[serde(
        rename = "nodeLocalDNSCacheEnabled",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub node_local_dns_cache_enabled: Option<bool>,

    #[serde(rename = "tunnelingAgentIP", default, skip_serializing_if = "Option::is_none")]
    pub tunneling_agent_ip: Option<String>,
}

impl Merge for ClusterNetworkingConfig {
    fn merge(&mut self, defaults: &Self) {
        self.ip_family.merge(&defaults.ip_family);
        self.pods.merge(&defaults.pods);
        self.services.merge(&defaults.services);
        self.node_cidr_mask_size_ipv4
            .merge(&defaults.node_cidr_mask_size_ipv4);
        self.node_cidr_mask_size_ipv6
            .merge(&defaults.node_cidr_mask_size_ipv6);
        self.proxy_mode.merge(&defaults.proxy_mode);
        self.node_local_dns_cache_enabled
            .merge(&defaults.node_local_dns_cache_enabled);
        self.tunneling_agent_ip.merge(&defaults.tunneling_agent_ip);
    }
}

/// Provider specific cloud settings of a cluster.
///
/// Only the credential reference is interpreted here, the remaining settings are carried
/// through as-is.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCloudSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_reference: Option<SecretReference>,

    #[serde(flatten)]
    pub settings: BTreeMap<String, serde_json::Value>,
}

impl Merge for ProviderCloudSpec {
    fn merge(&mut self, defaults: &Self) {
        if self.credentials_reference.is_none() {
            self.credentials_reference
                .clone_from(&defaults.credentials_reference);
        }
        for (key, value) in &defaults.settings {
            self.settings
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CloudSpec {
    #[serde(default)]
    pub datacenter_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<ProviderType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws: Option<ProviderCloudSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alibaba: Option<ProviderCloudSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anexia: Option<ProviderCloudSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure: Option<ProviderCloudSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baremetal: Option<ProviderCloudSpec>,
    #[serde(rename = "bringyourown", default, skip_serializing_if = "Option::is_none")]
    pub bring_your_own: Option<ProviderCloudSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digitalocean: Option<ProviderCloudSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge: Option<ProviderCloudSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcp: Option<ProviderCloudSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hetzner: Option<ProviderCloudSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubevirt: Option<ProviderCloudSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutanix: Option<ProviderCloudSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openstack: Option<ProviderCloudSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packet: Option<ProviderCloudSpec>,
    #[serde(rename = "vmwareclouddirector", default, skip_serializing_if = "Option::is_none")]
    pub vmware_cloud_director: Option<ProviderCloudSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vsphere: Option<ProviderCloudSpec>,
}

impl CloudSpec {
    fn block(&self, provider: ProviderType) -> Option<&ProviderCloudSpec> {
        let block = match provider {
            ProviderType::Aws => &self.aws,
            ProviderType::Alibaba => &self.alibaba,
            ProviderType::Anexia => &self.anexia,
            ProviderType::Azure => &self.azure,
            ProviderType::Baremetal => &self.baremetal,
            ProviderType::BringYourOwn => &self.bring_your_own,
            ProviderType::Digitalocean => &self.digitalocean,
            ProviderType::Edge => &self.edge,
            ProviderType::Gcp => &self.gcp,
            ProviderType::Hetzner => &self.hetzner,
            ProviderType::Kubevirt => &self.kubevirt,
            ProviderType::Nutanix => &self.nutanix,
            ProviderType::Openstack => &self.openstack,
            ProviderType::Packet => &self.packet,
            ProviderType::VMwareCloudDirector => &self.vmware_cloud_director,
            ProviderType::VSphere => &self.vsphere,
        };
        block.as_ref()
    }

    fn block_mut(&mut self, provider: ProviderType) -> &mut Option<ProviderCloudSpec> {
        match provider {
            ProviderType::Aws => &mut self.aws,
            ProviderType::Alibaba => &mut self.alibaba,
            ProviderType::Anexia => &mut self.anexia,
            ProviderType::Azure => &mut self.azure,
            ProviderType::Baremetal => &mut self.baremetal,
            ProviderType::BringYourOwn => &mut self.bring_your_own,
            ProviderType::Digitalocean => &mut self.digitalocean,
            ProviderType::Edge => &mut self.edge,
            ProviderType::Gcp => &mut self.gcp,
            ProviderType::Hetzner => &mut self.hetzner,
            ProviderType::Kubevirt => &mut self.kubevirt,
            ProviderType::Nutanix => &mut self.nutanix,
            ProviderType::Openstack => &mut self.openstack,
            ProviderType::Packet => &mut self.packet,
            ProviderType::VMwareCloudDirector => &mut self.vmware_cloud_director,
            ProviderType::VSphere => &mut self.vsphere,
        }
    }

    /// An empty cloud spec for `provider` in `datacenter_name`.
    pub fn skeleton(provider: ProviderType, datacenter_name: impl Into<String>) -> Self {
        let mut cloud = Self {
            datacenter_name: datacenter_name.into(),
            provider_name: Some(provider),
            ..Self::default()
        };
        *cloud.block_mut(provider) = Some(ProviderCloudSpec::default());
        cloud
    }

    pub fn provider_spec(&self, provider: ProviderType) -> Option<&ProviderCloudSpec> {
        self.block(provider)
    }

    /// The provider of the cluster. The explicit provider name wins, otherwise the first
    /// configured provider block is used.
    pub fn provider(&self) -> Option<ProviderType> {
        self.provider_name.or_else(|| {
            ProviderType::supported().find(|provider| self.block(*provider).is_some())
        })
    }
}

impl Merge for CloudSpec {
    /// Only blocks configured on `self` receive defaults, so a template for a different
    /// provider never adds foreign blocks.
    fn merge(&mut self, defaults: &Self) {
        if self.datacenter_name.is_empty() {
            self.datacenter_name.clone_from(&defaults.datacenter_name);
        }
        if self.provider_name.is_none() {
            self.provider_name = defaults.provider_name;
        }
        for provider in ProviderType::supported() {
            if let (Some(block), Some(default_block)) =
                (self.block_mut(provider).as_mut(), defaults.block(provider))
            {
                block.merge(default_block);
            }
        }
    }
}

/// A user cluster.
#[derive(Clone, CustomResource, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[kube(
    group = "kubermatic.k8c.io",
    version = "v1",
    kind = "Cluster",
    plural = "clusters",
    crates(
        kube_core = "kube::core",
        k8s_openapi = "k8s_openapi",
        schemars = "schemars"
    )
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub human_readable_name: String,

    #[serde(default)]
    pub cloud: CloudSpec,

    #[serde(default)]
    pub cluster_network: ClusterNetworkingConfig,

    /// The Kubernetes version of the control plane.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expose_strategy: Option<ExposeStrategy>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub container_runtime: String,

    #[serde(
        rename = "enableUserSSHKeyAgent",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub enable_user_ssh_key_agent: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cni_plugin: Option<CniPluginSettings>,

    #[serde(
        rename = "nodePortsAllowedIPRanges",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub node_ports_allowed_ip_ranges: Option<NetworkRanges>,
}

impl Merge for ClusterSpec {
    fn merge(&mut self, defaults: &Self) {
        if self.human_readable_name.is_empty() {
            self.human_readable_name
                .clone_from(&defaults.human_readable_name);
        }
        self.cloud.merge(&defaults.cloud);
        self.cluster_network.merge(&defaults.cluster_network);
        self.version.merge(&defaults.version);
        self.expose_strategy.merge(&defaults.expose_strategy);
        if self.container_runtime.is_empty() {
            self.container_runtime.clone_from(&defaults.container_runtime);
        }
        self.enable_user_ssh_key_agent
            .merge(&defaults.enable_user_ssh_key_agent);
        self.cni_plugin.merge(&defaults.cni_plugin);
        self.node_ports_allowed_ip_ranges
            .merge(&defaults.node_ports_allowed_ip_ranges);
    }
}

impl Cluster {
    /// The ID of the project owning this cluster.
    pub fn project_id(&self) -> Option<&str> {
        kvp::label(&self.metadata, PROJECT_ID_LABEL)
    }
}
