//! Credential preset engines: resolution (listing), mutation and linkage scanning.
//!
//! The engines operate on fresh snapshots read from a [`PresetStore`] for every call and
//! never cache across calls.
//!
//! [`PresetStore`]: crate::store::PresetStore
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};

use crate::{
    crd::{
        PresetSpec,
        preset::{
            ProviderBlock,
            providers::{Openstack, VMwareCloudDirector},
        },
    },
    provider::ProviderType,
};

pub mod linkage;
pub mod mutation;
pub mod resolution;

pub use linkage::{
    ClusterAssociation, ClusterTemplateAssociation, PresetLinkageScanner, PresetLinkages,
    PresetStats,
};
pub use mutation::PresetMutator;
pub use resolution::{PresetResolver, PresetsQuery};

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct PresetList {
    pub items: Vec<PresetView>,
}

/// A preset as presented to API callers. Credentials are never included.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetView {
    pub name: String,
    pub enabled: bool,
    pub providers: Vec<PresetProviderView>,
}

impl PresetView {
    /// Builds the view of `spec` listing all configured providers in registry order.
    pub fn new(name: impl Into<String>, enabled: bool, spec: &PresetSpec) -> Self {
        Self {
            name: name.into(),
            enabled,
            providers: spec
                .configured_providers()
                .map(|block| PresetProviderView::new(block, spec))
                .collect(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetProviderView {
    pub name: ProviderType,
    pub enabled: bool,
    pub is_customizable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openstack: Option<OpenstackApiPreset>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vmware_cloud_director: Option<VMwareCloudDirectorApiPreset>,
}

impl PresetProviderView {
    fn new(block: &dyn ProviderBlock, spec: &PresetSpec) -> Self {
        let provider = block.provider_type();
        let openstack = spec.openstack.as_ref().filter(|_| provider == ProviderType::Openstack);
        let vmware_cloud_director = spec
            .vmware_cloud_director
            .as_ref()
            .filter(|_| provider == ProviderType::VMwareCloudDirector);

        Self {
            name: provider,
            enabled: block.is_enabled(),
            is_customizable: openstack.is_some_and(|openstack| openstack.is_customizable),
            openstack: openstack
                .filter(|openstack| openstack.is_customizable)
                .map(OpenstackApiPreset::from),
            vmware_cloud_director: vmware_cloud_director.map(VMwareCloudDirectorApiPreset::from),
        }
    }
}

/// The OpenStack network settings a customizable preset exposes.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenstackApiPreset {
    pub network: String,
    pub security_groups: String,
    #[serde(rename = "floatingIPPool")]
    pub floating_ip_pool: String,
    #[serde(rename = "routerID")]
    pub router_id: String,
    #[serde(rename = "subnetID")]
    pub subnet_id: String,
}

impl From<&Openstack> for OpenstackApiPreset {
    fn from(openstack: &Openstack) -> Self {
        Self {
            network: openstack.network.clone(),
            security_groups: openstack.security_groups.clone(),
            floating_ip_pool: openstack.floating_ip_pool.clone(),
            router_id: openstack.router_id.clone(),
            subnet_id: openstack.subnet_id.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VMwareCloudDirectorApiPreset {
    pub ovdc_network: String,
    pub ovdc_networks: Vec<String>,
}

impl From<&VMwareCloudDirector> for VMwareCloudDirectorApiPreset {
    fn from(vcd: &VMwareCloudDirector) -> Self {
        Self {
            ovdc_network: vcd.ovdc_network.clone(),
            ovdc_networks: vcd.ovdc_networks.clone(),
        }
    }
}

/// The request body of preset create and update calls.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetBody {
    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: PresetSpec,
}

impl PresetBody {
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }
}
