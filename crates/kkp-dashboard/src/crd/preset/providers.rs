//! Per-provider credential blocks of a [`Preset`](super::Preset).
//!
//! Every block flattens a [`ProviderPreset`] (enablement and datacenter
//! restriction) next to its provider specific credential fields, and knows
//! which of those fields are required.
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use snafu::{Snafu, ensure};

use super::EnabledState;
use crate::provider::ProviderType;

#[derive(Debug, Eq, PartialEq, Snafu)]
pub enum ValidationError {
    #[snafu(display(
        "invalid {provider} preset configuration, missing required fields: {}",
        fields.join(", ")
    ))]
    MissingFields {
        provider: ProviderType,
        fields: Vec<&'static str>,
    },

    #[snafu(display(
        "invalid {provider} preset configuration, {alternatives} must be set"
    ))]
    MissingCredentials {
        provider: ProviderType,
        alternatives: &'static str,
    },
}

/// Enablement and datacenter scoping shared by all provider blocks.
#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderPreset {
    /// Only enabled provider configurations are offered to users. Defaults to enabled.
    #[serde(default, skip_serializing_if = "EnabledState::is_unset")]
    pub enabled: EnabledState,

    /// Restricts the configuration to a single datacenter. Empty means any datacenter.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub datacenter: String,
}

impl ProviderPreset {
    /// Returns whether this block may be used in `datacenter`. An empty filter or an empty
    /// restriction matches everything, otherwise names are compared ignoring ASCII case.
    pub fn matches_datacenter(&self, datacenter: &str) -> bool {
        datacenter.is_empty()
            || self.datacenter.is_empty()
            || self.datacenter.eq_ignore_ascii_case(datacenter)
    }
}

/// Common behaviour of all provider blocks.
pub trait ProviderBlock {
    fn provider_type(&self) -> ProviderType;

    fn provider_preset(&self) -> &ProviderPreset;

    fn provider_preset_mut(&mut self) -> &mut ProviderPreset;

    /// Structural validation of the credential fields.
    fn validate(&self) -> Result<(), ValidationError>;

    fn is_enabled(&self) -> bool {
        self.provider_preset().enabled.is_enabled()
    }
}

fn missing_fields<'a>(
    fields: impl IntoIterator<Item = (&'static str, &'a str)>,
) -> Vec<&'static str> {
    fields
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect()
}

fn ensure_fields<'a>(
    provider: ProviderType,
    fields: impl IntoIterator<Item = (&'static str, &'a str)>,
) -> Result<(), ValidationError> {
    let fields = missing_fields(fields);
    ensure!(fields.is_empty(), MissingFieldsSnafu { provider, fields });
    Ok(())
}

/// Implements [`ProviderBlock`] for blocks whose validation is a plain list of required
/// string fields.
macro_rules! provider_block {
    ($block:ty, $provider:expr, [$($field:ident => $wire:literal),* $(,)?]) => {
        impl ProviderBlock for $block {
            fn provider_type(&self) -> ProviderType {
                $provider
            }

            fn provider_preset(&self) -> &ProviderPreset {
                &self.provider_preset
            }

            fn provider_preset_mut(&mut self) -> &mut ProviderPreset {
                &mut self.provider_preset
            }

            fn validate(&self) -> Result<(), ValidationError> {
                ensure_fields($provider, [$(($wire, self.$field.as_str())),*])
            }
        }
    };
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Aws {
    #[serde(flatten)]
    pub provider_preset: ProviderPreset,

    #[serde(rename = "accessKeyID", default)]
    pub access_key_id: String,
    #[serde(default)]
    pub secret_access_key: String,
    #[serde(rename = "assumeRoleARN", default, skip_serializing_if = "String::is_empty")]
    pub assume_role_arn: String,
    #[serde(rename = "assumeRoleExternalID", default, skip_serializing_if = "String::is_empty")]
    pub assume_role_external_id: String,
    #[serde(rename = "vpcID", default, skip_serializing_if = "String::is_empty")]
    pub vpc_id: String,
    #[serde(rename = "routeTableID", default, skip_serializing_if = "String::is_empty")]
    pub route_table_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub instance_profile_name: String,
    #[serde(rename = "securityGroupID", default, skip_serializing_if = "String::is_empty")]
    pub security_group_id: String,
    #[serde(rename = "controlPlaneIAMRoleARN", default, skip_serializing_if = "String::is_empty")]
    pub control_plane_iam_role_arn: String,
}

provider_block!(Aws, ProviderType::Aws, [
    access_key_id => "accessKeyID",
    secret_access_key => "secretAccessKey",
]);

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alibaba {
    #[serde(flatten)]
    pub provider_preset: ProviderPreset,

    #[serde(rename = "accessKeyID", default)]
    pub access_key_id: String,
    #[serde(default)]
    pub access_key_secret: String,
}

provider_block!(Alibaba, ProviderType::Alibaba, [
    access_key_id => "accessKeyID",
    access_key_secret => "accessKeySecret",
]);

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Anexia {
    #[serde(flatten)]
    pub provider_preset: ProviderPreset,

    #[serde(default)]
    pub token: String,
}

provider_block!(Anexia, ProviderType::Anexia, [token => "token"]);

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Azure {
    #[serde(flatten)]
    pub provider_preset: ProviderPreset,

    #[serde(rename = "tenantID", default)]
    pub tenant_id: String,
    #[serde(rename = "subscriptionID", default)]
    pub subscription_id: String,
    #[serde(rename = "clientID", default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource_group: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub vnet_resource_group: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub vnet: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subnet: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub route_table: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub security_group: String,
    #[serde(rename = "loadBalancerSKU", default, skip_serializing_if = "String::is_empty")]
    pub load_balancer_sku: String,
}

provider_block!(Azure, ProviderType::Azure, [
    tenant_id => "tenantID",
    subscription_id => "subscriptionID",
    client_id => "clientID",
    client_secret => "clientSecret",
]);

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Baremetal {
    #[serde(flatten)]
    pub provider_preset: ProviderPreset,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tinkerbell: Option<Tinkerbell>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tinkerbell {
    /// Kubeconfig of the cluster running the Tinkerbell stack.
    #[serde(default)]
    pub kubeconfig: String,
}

impl ProviderBlock for Baremetal {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Baremetal
    }

    fn provider_preset(&self) -> &ProviderPreset {
        &self.provider_preset
    }

    fn provider_preset_mut(&mut self) -> &mut ProviderPreset {
        &mut self.provider_preset
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let kubeconfig = self
            .tinkerbell
            .as_ref()
            .map_or("", |tinkerbell| tinkerbell.kubeconfig.as_str());
        ensure_fields(ProviderType::Baremetal, [("tinkerbell.kubeconfig", kubeconfig)])
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Digitalocean {
    #[serde(flatten)]
    pub provider_preset: ProviderPreset,

    #[serde(default)]
    pub token: String,
}

provider_block!(Digitalocean, ProviderType::Digitalocean, [token => "token"]);

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Gcp {
    #[serde(flatten)]
    pub provider_preset: ProviderPreset,

    #[serde(default)]
    pub service_account: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub network: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subnetwork: String,
}

provider_block!(Gcp, ProviderType::Gcp, [service_account => "serviceAccount"]);

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hetzner {
    #[serde(flatten)]
    pub provider_preset: ProviderPreset,

    #[serde(default)]
    pub token: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub network: String,
}

provider_block!(Hetzner, ProviderType::Hetzner, [token => "token"]);

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Kubevirt {
    #[serde(flatten)]
    pub provider_preset: ProviderPreset,

    #[serde(default)]
    pub kubeconfig: String,
}

provider_block!(Kubevirt, ProviderType::Kubevirt, [kubeconfig => "kubeconfig"]);

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Nutanix {
    #[serde(flatten)]
    pub provider_preset: ProviderPreset,

    #[serde(rename = "proxyURL", default, skip_serializing_if = "String::is_empty")]
    pub proxy_url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub csi_username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub csi_password: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub csi_endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csi_port: Option<i32>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cluster_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub project_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subnet_name: String,
}

provider_block!(Nutanix, ProviderType::Nutanix, [
    username => "username",
    password => "password",
]);

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Openstack {
    #[serde(flatten)]
    pub provider_preset: ProviderPreset,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub use_token: bool,

    #[serde(rename = "applicationCredentialID", default, skip_serializing_if = "String::is_empty")]
    pub application_credential_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub application_credential_secret: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub project: String,
    #[serde(rename = "projectID", default, skip_serializing_if = "String::is_empty")]
    pub project_id: String,
    #[serde(default)]
    pub domain: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub network: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub security_groups: String,
    #[serde(rename = "floatingIPPool", default, skip_serializing_if = "String::is_empty")]
    pub floating_ip_pool: String,
    #[serde(rename = "routerID", default, skip_serializing_if = "String::is_empty")]
    pub router_id: String,
    #[serde(rename = "subnetID", default, skip_serializing_if = "String::is_empty")]
    pub subnet_id: String,

    /// Allows users to override the network settings above when creating a cluster.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_customizable: bool,
}

impl ProviderBlock for Openstack {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Openstack
    }

    fn provider_preset(&self) -> &ProviderPreset {
        &self.provider_preset
    }

    fn provider_preset_mut(&mut self) -> &mut ProviderPreset {
        &mut self.provider_preset
    }

    fn validate(&self) -> Result<(), ValidationError> {
        ensure_fields(ProviderType::Openstack, [("domain", self.domain.as_str())])?;

        if !self.application_credential_id.is_empty() {
            return ensure_fields(
                ProviderType::Openstack,
                [(
                    "applicationCredentialSecret",
                    self.application_credential_secret.as_str(),
                )],
            );
        }

        ensure!(
            !self.username.is_empty()
                && !self.password.is_empty()
                && (!self.project.is_empty() || !self.project_id.is_empty()),
            MissingCredentialsSnafu {
                provider: ProviderType::Openstack,
                alternatives: "either applicationCredentialID and applicationCredentialSecret, \
                               or username, password and project/projectID",
            }
        );
        Ok(())
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Packet {
    #[serde(flatten)]
    pub provider_preset: ProviderPreset,

    #[serde(default)]
    pub api_key: String,
    #[serde(rename = "projectID", default)]
    pub project_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub billing_cycle: String,
}

provider_block!(Packet, ProviderType::Packet, [
    api_key => "apiKey",
    project_id => "projectID",
]);

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VMwareCloudDirector {
    #[serde(flatten)]
    pub provider_preset: ProviderPreset,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_token: String,
    #[serde(default)]
    pub organization: String,
    #[serde(rename = "vdc", default)]
    pub vdc: String,
    /// Deprecated in favour of `ovdcNetworks`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ovdc_network: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ovdc_networks: Vec<String>,
}

impl ProviderBlock for VMwareCloudDirector {
    fn provider_type(&self) -> ProviderType {
        ProviderType::VMwareCloudDirector
    }

    fn provider_preset(&self) -> &ProviderPreset {
        &self.provider_preset
    }

    fn provider_preset_mut(&mut self) -> &mut ProviderPreset {
        &mut self.provider_preset
    }

    fn validate(&self) -> Result<(), ValidationError> {
        ensure_fields(
            ProviderType::VMwareCloudDirector,
            [
                ("organization", self.organization.as_str()),
                ("vdc", self.vdc.as_str()),
            ],
        )?;

        ensure!(
            !self.api_token.is_empty() || (!self.username.is_empty() && !self.password.is_empty()),
            MissingCredentialsSnafu {
                provider: ProviderType::VMwareCloudDirector,
                alternatives: "either apiToken, or username and password",
            }
        );
        Ok(())
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VSphere {
    #[serde(flatten)]
    pub provider_preset: ProviderPreset,

    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub vm_net_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub datastore: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub datastore_cluster: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource_pool: String,
}

provider_block!(VSphere, ProviderType::VSphere, [
    username => "username",
    password => "password",
]);
