use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ObjectReference;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::Display;

use super::cluster::ExposeStrategy;
use crate::provider::ProviderType;

/// A management cluster hosting the control planes of user clusters for one or more
/// datacenters.
#[derive(Clone, CustomResource, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[kube(
    group = "kubermatic.k8c.io",
    version = "v1",
    kind = "Seed",
    plural = "seeds",
    status = "SeedStatus",
    crates(
        kube_core = "kube::core",
        k8s_openapi = "k8s_openapi",
        schemars = "schemars"
    ),
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct SeedSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub country: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,

    /// Reference to a Secret holding the kubeconfig of the seed cluster in its
    /// `kubeconfig` key. Without a namespace the Seed's own namespace is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<ObjectReference>,

    /// The datacenters served by this seed, keyed by datacenter name.
    #[serde(default)]
    pub datacenters: BTreeMap<String, Datacenter>,

    /// Overrides the expose strategy of the global configuration for clusters on this seed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expose_strategy: Option<ExposeStrategy>,

    /// Name of a seed-scoped ClusterTemplate used to default new clusters.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_cluster_template: String,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Datacenter {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub country: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,

    #[serde(default)]
    pub spec: DatacenterSpec,
}

/// The provider settings of a datacenter. Exactly one provider block is expected, its
/// content is not interpreted.
#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatacenterSpec {
    /// Restricts the datacenter to callers whose email or email domain is listed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_emails: Vec<String>,

    #[serde(flatten)]
    pub providers: BTreeMap<String, serde_json::Value>,
}

impl DatacenterSpec {
    /// The provider of this datacenter, taken from the first key naming a known provider.
    pub fn provider(&self) -> Option<ProviderType> {
        self.providers.keys().find_map(|key| key.parse().ok())
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, JsonSchema, PartialEq, Serialize)]
pub enum SeedPhase {
    Healthy,
    Unhealthy,
    Invalid,
    Terminating,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<SeedPhase>,
}

impl Seed {
    pub fn phase(&self) -> Option<SeedPhase> {
        self.status.as_ref().and_then(|status| status.phase)
    }

    /// Invalid seeds are skipped by every operation iterating seeds.
    pub fn is_invalid(&self) -> bool {
        self.phase() == Some(SeedPhase::Invalid)
    }

    pub fn datacenter(&self, name: &str) -> Option<&Datacenter> {
        self.spec.datacenters.get(name)
    }
}

/// Finds the seed serving `datacenter` and returns it together with the datacenter.
pub fn find_datacenter<'a>(
    seeds: impl IntoIterator<Item = &'a Seed>,
    datacenter: &str,
) -> Option<(&'a Seed, &'a Datacenter)> {
    seeds
        .into_iter()
        .find_map(|seed| seed.datacenter(datacenter).map(|dc| (seed, dc)))
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    fn seed() -> Seed {
        serde_yaml::from_str(indoc! {"
            apiVersion: kubermatic.k8c.io/v1
            kind: Seed
            metadata:
              name: europe-west3-c
              namespace: kubermatic
            spec:
              country: DE
              location: Hamburg
              kubeconfig:
                name: kubeconfig-europe-west3-c
              exposeStrategy: LoadBalancer
              defaultClusterTemplate: seed-default
              datacenters:
                hetzner-fsn1:
                  country: DE
                  location: Falkenstein
                  spec:
                    hetzner:
                      datacenter: fsn1-dc14
                    requiredEmails:
                      - kubermatic.com
            status:
              phase: Healthy
        "})
        .expect("seed must deserialize")
    }

    #[test]
    fn deserialize_seed() {
        let seed = seed();

        assert_eq!(seed.spec.expose_strategy, Some(ExposeStrategy::LoadBalancer));
        assert_eq!(seed.phase(), Some(SeedPhase::Healthy));
        assert!(!seed.is_invalid());

        let dc = seed.datacenter("hetzner-fsn1").expect("datacenter exists");
        assert_eq!(dc.spec.provider(), Some(ProviderType::Hetzner));
        assert_eq!(dc.spec.required_emails, vec!["kubermatic.com".to_owned()]);
    }

    #[test]
    fn datacenter_lookup() {
        let seeds = [seed()];

        let (seed, dc) =
            find_datacenter(&seeds, "hetzner-fsn1").expect("datacenter is served by the seed");
        assert_eq!(seed.metadata.name.as_deref(), Some("europe-west3-c"));
        assert_eq!(dc.location, "Falkenstein");

        assert!(find_datacenter(&seeds, "aws-eu-central-1a").is_none());
    }
}
