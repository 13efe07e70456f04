//! The fixed registry of cloud providers known to the platform.
//!
//! Every other part of the crate iterates providers through
//! [`ProviderType::supported`], which keeps responses (for example the list
//! of provider blocks on a preset) in a deterministic order.
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use snafu::{Snafu, ensure};
use strum::IntoEnumIterator;

use crate::error::{Classify, ErrorClass};

#[derive(Debug, Eq, PartialEq, Snafu)]
pub enum ProviderNameError {
    #[snafu(display("the provider name cannot be empty"))]
    EmptyProviderName,

    #[snafu(display("invalid provider name {name:?}"))]
    UnsupportedProvider { name: String },
}

impl Classify for ProviderNameError {
    fn class(&self) -> ErrorClass {
        ErrorClass::BadRequest
    }
}

/// A cloud provider identifier, serialized in its lowercase wire form
/// (`aws`, `vmwareclouddirector`, ...).
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    JsonSchema,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
    strum::AsRefStr,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProviderType {
    Aws,
    Alibaba,
    Anexia,
    Azure,
    Baremetal,
    BringYourOwn,
    Digitalocean,
    Edge,
    Gcp,
    Hetzner,
    Kubevirt,
    Nutanix,
    Openstack,
    Packet,
    VMwareCloudDirector,
    VSphere,
}

impl ProviderType {
    /// Returns all supported providers in registry order.
    pub fn supported() -> impl Iterator<Item = Self> {
        Self::iter()
    }

    /// Returns the wire names of all supported providers in registry order.
    pub fn supported_names() -> Vec<&'static str> {
        Self::iter().map(Self::name).collect()
    }

    /// The lowercase wire name of this provider.
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Membership test against the registry. Matching is exact, provider names
/// are always lowercase on the wire.
pub fn is_provider_supported(name: &str) -> bool {
    ProviderType::from_str(name).is_ok()
}

/// Parses a provider name taken from a request path.
pub fn parse_provider_name(name: &str) -> Result<ProviderType, ProviderNameError> {
    ensure!(!name.is_empty(), EmptyProviderNameSnafu);
    ensure!(is_provider_supported(name), UnsupportedProviderSnafu { name });
    ProviderType::from_str(name).map_err(|_| UnsupportedProviderSnafu { name }.build())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("aws", true)]
    #[case("vsphere", true)]
    #[case("vmwareclouddirector", true)]
    #[case("bringyourown", true)]
    #[case("AWS", false)]
    #[case("", false)]
    #[case("fake", false)]
    fn provider_support(#[case] name: &str, #[case] supported: bool) {
        assert_eq!(is_provider_supported(name), supported);
    }

    #[test]
    fn provider_name_parsing() {
        assert_eq!(parse_provider_name("hetzner"), Ok(ProviderType::Hetzner));
        assert_eq!(
            parse_provider_name(""),
            Err(ProviderNameError::EmptyProviderName)
        );
        assert_eq!(
            parse_provider_name("fake"),
            Err(ProviderNameError::UnsupportedProvider {
                name: "fake".to_owned()
            })
        );
    }

    #[test]
    fn names_match_display_and_serde() {
        for provider in ProviderType::supported() {
            assert_eq!(provider.name(), provider.to_string());
            assert_eq!(provider.name(), provider.as_ref());

            let json = serde_json::to_string(&provider).expect("provider must serialize");
            assert_eq!(json, format!("\"{}\"", provider.name()));
            assert_eq!(
                provider.name().parse::<ProviderType>().expect("name must parse"),
                provider
            );
        }
    }

    #[test]
    fn registry_order_is_stable() {
        let names = ProviderType::supported_names();
        assert_eq!(names.first(), Some(&"aws"));
        assert_eq!(names.last(), Some(&"vsphere"));
        assert_eq!(names.len(), 16);
    }
}
