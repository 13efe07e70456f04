use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::provider::ProviderType;

mod enabled;
pub mod providers;

pub use enabled::EnabledState;
pub use providers::{ProviderBlock, ProviderPreset, ValidationError};

use providers::{
    Alibaba, Anexia, Aws, Azure, Baremetal, Digitalocean, Gcp, Hetzner, Kubevirt, Nutanix,
    Openstack, Packet, VMwareCloudDirector, VSphere,
};

/// A named bundle of cloud provider credentials.
///
/// A preset can hold credentials for any number of providers, each in its own block. Visibility
/// can be restricted to callers with matching emails ([`PresetSpec::required_emails`]) and to
/// a set of projects ([`PresetSpec::projects`]).
#[derive(Clone, CustomResource, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[kube(
    group = "kubermatic.k8c.io",
    version = "v1",
    kind = "Preset",
    plural = "presets",
    crates(
        kube_core = "kube::core",
        k8s_openapi = "k8s_openapi",
        schemars = "schemars"
    )
)]
#[serde(rename_all = "camelCase")]
pub struct PresetSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws: Option<Aws>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alibaba: Option<Alibaba>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anexia: Option<Anexia>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure: Option<Azure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baremetal: Option<Baremetal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digitalocean: Option<Digitalocean>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcp: Option<Gcp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hetzner: Option<Hetzner>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubevirt: Option<Kubevirt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutanix: Option<Nutanix>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openstack: Option<Openstack>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packet: Option<Packet>,
    #[serde(
        rename = "vmwareclouddirector",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub vmware_cloud_director: Option<VMwareCloudDirector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vsphere: Option<VSphere>,

    /// Restricts visibility to callers whose email equals an entry, or whose email domain
    /// equals an entry. Empty means visible to everyone.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_emails: Vec<String>,

    /// Restricts the preset to the listed project IDs. Empty means available in all projects.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub projects: Vec<String>,

    /// Only enabled presets are offered to users. Defaults to enabled.
    #[serde(default, skip_serializing_if = "EnabledState::is_unset")]
    pub enabled: EnabledState,
}

/// Generates the provider keyed accessors of [`PresetSpec`] from a variant to field table.
/// Providers without a preset block (such as `edge`) fall through to "not configured".
macro_rules! preset_provider_accessors {
    ($($variant:ident => $field:ident),* $(,)?) => {
        impl PresetSpec {
            /// Returns the block configured for `provider`, if any.
            pub fn provider(&self, provider: ProviderType) -> Option<&dyn ProviderBlock> {
                match provider {
                    $(ProviderType::$variant => {
                        self.$field.as_ref().map(|block| block as &dyn ProviderBlock)
                    })*
                    _ => None,
                }
            }

            pub fn provider_mut(
                &mut self,
                provider: ProviderType,
            ) -> Option<&mut dyn ProviderBlock> {
                match provider {
                    $(ProviderType::$variant => {
                        self.$field.as_mut().map(|block| block as &mut dyn ProviderBlock)
                    })*
                    _ => None,
                }
            }

            /// Removes the block of `provider`. Returns whether a block was present.
            pub fn remove_provider(&mut self, provider: ProviderType) -> bool {
                match provider {
                    $(ProviderType::$variant => self.$field.take().is_some(),)*
                    _ => false,
                }
            }

            /// Replaces the block of `provider` with the one found in `source`, which may be none.
            pub fn override_provider(&mut self, provider: ProviderType, source: &Self) {
                match provider {
                    $(ProviderType::$variant => self.$field.clone_from(&source.$field),)*
                    _ => {}
                }
            }
        }
    };
}

preset_provider_accessors! {
    Aws => aws,
    Alibaba => alibaba,
    Anexia => anexia,
    Azure => azure,
    Baremetal => baremetal,
    Digitalocean => digitalocean,
    Gcp => gcp,
    Hetzner => hetzner,
    Kubevirt => kubevirt,
    Nutanix => nutanix,
    Openstack => openstack,
    Packet => packet,
    VMwareCloudDirector => vmware_cloud_director,
    VSphere => vsphere,
}

impl PresetSpec {
    pub fn has_provider(&self, provider: ProviderType) -> bool {
        self.provider(provider).is_some()
    }

    /// All configured blocks, in registry order.
    pub fn configured_providers(&self) -> impl Iterator<Item = &dyn ProviderBlock> + '_ {
        ProviderType::supported().filter_map(|provider| self.provider(provider))
    }

    pub fn has_any_provider(&self) -> bool {
        self.configured_providers().next().is_some()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.is_enabled()
    }

    /// Effective enablement of `provider`: both the preset and the block must be enabled.
    /// Returns `false` if the block is not configured.
    pub fn is_provider_enabled(&self, provider: ProviderType) -> bool {
        self.provider(provider)
            .is_some_and(|block| self.enabled.and(block.provider_preset().enabled))
    }

    /// Sets the enabled flag of a single block. Returns `false` if the block is not
    /// configured.
    pub fn set_provider_enabled(&mut self, provider: ProviderType, enabled: bool) -> bool {
        match self.provider_mut(provider) {
            Some(block) => {
                block.provider_preset_mut().enabled = enabled.into();
                true
            }
            None => false,
        }
    }

    /// Returns whether the preset may be used within `project_id`. Presets without
    /// project restriction are available everywhere.
    pub fn is_available_in_project(&self, project_id: &str) -> bool {
        self.projects.is_empty() || self.projects.iter().any(|project| project == project_id)
    }
}
