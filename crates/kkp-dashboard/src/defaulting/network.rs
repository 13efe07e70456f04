//! Network defaults of new clusters.
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::{
    config::merge::{Merge, merge_layers},
    crd::{
        ClusterTemplate, KubermaticConfiguration, Seed,
        cluster::{ClusterNetworkingConfig, ExposeStrategy, IpFamily, NetworkRanges, ProxyMode},
    },
    provider::ProviderType,
};

pub const DEFAULT_PODS_CIDR_IPV4: &str = "172.25.0.0/16";
pub const DEFAULT_PODS_CIDR_IPV4_KUBEVIRT: &str = "172.26.0.0/16";
pub const DEFAULT_SERVICES_CIDR_IPV4: &str = "10.240.16.0/20";
pub const DEFAULT_SERVICES_CIDR_IPV4_KUBEVIRT: &str = "10.241.0.0/20";
pub const DEFAULT_NODE_CIDR_MASK_SIZE_IPV4: i32 = 24;
pub const DEFAULT_NODE_PORTS_ALLOWED_IP_RANGE_IPV4: &str = "0.0.0.0/0";

pub const DEFAULT_PODS_CIDR_IPV6: &str = "fd01::/48";
pub const DEFAULT_SERVICES_CIDR_IPV6: &str = "fd02::/120";
pub const DEFAULT_NODE_CIDR_MASK_SIZE_IPV6: i32 = 64;
pub const DEFAULT_NODE_PORTS_ALLOWED_IP_RANGE_IPV6: &str = "::/0";

pub const DEFAULT_TUNNELING_AGENT_IP: &str = "100.64.30.10";

/// Network settings presented for a new cluster before the user customizes them.
///
/// Every field is optional so the value can be used as a [`Merge`] layer. The fully merged
/// result produced by [`generate_network_defaults`] has all fields set, except the expose
/// strategy when a default cluster template leaves it unset.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDefaults {
    pub ipv4: NetworkDefaultsIpFamily,
    pub ipv6: NetworkDefaultsIpFamily,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_mode: Option<ProxyMode>,

    #[serde(
        rename = "nodeLocalDNSCacheEnabled",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub node_local_dns_cache_enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_expose_strategy: Option<ExposeStrategy>,

    #[serde(rename = "tunnelingAgentIP", default, skip_serializing_if = "Option::is_none")]
    pub tunneling_agent_ip: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDefaultsIpFamily {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pods_cidr: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services_cidr: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_cidr_mask_size: Option<i32>,

    #[serde(
        rename = "nodePortsAllowedIPRange",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub node_ports_allowed_ip_range: Option<String>,
}

impl Merge for NetworkDefaultsIpFamily {
    fn merge(&mut self, defaults: &Self) {
        self.pods_cidr.merge(&defaults.pods_cidr);
        self.services_cidr.merge(&defaults.services_cidr);
        self.node_cidr_mask_size.merge(&defaults.node_cidr_mask_size);
        self.node_ports_allowed_ip_range
            .merge(&defaults.node_ports_allowed_ip_range);
    }
}

impl Merge for NetworkDefaults {
    fn merge(&mut self, defaults: &Self) {
        self.ipv4.merge(&defaults.ipv4);
        self.ipv6.merge(&defaults.ipv6);
        self.proxy_mode.merge(&defaults.proxy_mode);
        self.node_local_dns_cache_enabled
            .merge(&defaults.node_local_dns_cache_enabled);
        self.cluster_expose_strategy
            .merge(&defaults.cluster_expose_strategy);
        self.tunneling_agent_ip.merge(&defaults.tunneling_agent_ip);
    }
}

impl NetworkDefaults {
    /// The built-in defaults of `provider`.
    pub fn builtin(provider: ProviderType) -> Self {
        let (pods_cidr, services_cidr) = match provider {
            ProviderType::Kubevirt => (
                DEFAULT_PODS_CIDR_IPV4_KUBEVIRT,
                DEFAULT_SERVICES_CIDR_IPV4_KUBEVIRT,
            ),
            _ => (DEFAULT_PODS_CIDR_IPV4, DEFAULT_SERVICES_CIDR_IPV4),
        };
        let proxy_mode = match provider {
            ProviderType::Hetzner => ProxyMode::Iptables,
            _ => ProxyMode::Ipvs,
        };

        Self {
            ipv4: NetworkDefaultsIpFamily {
                pods_cidr: Some(pods_cidr.to_owned()),
                services_cidr: Some(services_cidr.to_owned()),
                node_cidr_mask_size: Some(DEFAULT_NODE_CIDR_MASK_SIZE_IPV4),
                node_ports_allowed_ip_range: Some(
                    DEFAULT_NODE_PORTS_ALLOWED_IP_RANGE_IPV4.to_owned(),
                ),
            },
            ipv6: NetworkDefaultsIpFamily {
                pods_cidr: Some(DEFAULT_PODS_CIDR_IPV6.to_owned()),
                services_cidr: Some(DEFAULT_SERVICES_CIDR_IPV6.to_owned()),
                node_cidr_mask_size: Some(DEFAULT_NODE_CIDR_MASK_SIZE_IPV6),
                node_ports_allowed_ip_range: Some(
                    DEFAULT_NODE_PORTS_ALLOWED_IP_RANGE_IPV6.to_owned(),
                ),
            },
            proxy_mode: Some(proxy_mode),
            node_local_dns_cache_enabled: Some(true),
            cluster_expose_strategy: Some(ExposeStrategy::default()),
            tunneling_agent_ip: Some(DEFAULT_TUNNELING_AGENT_IP.to_owned()),
        }
    }

    /// The layer contributed by the network settings of a cluster template. Empty fields do
    /// not contribute.
    fn from_template(network: &ClusterNetworkingConfig) -> Self {
        let (pods_ipv4, pods_ipv6) = split_families(&network.pods);
        let (services_ipv4, services_ipv6) = split_families(&network.services);

        Self {
            ipv4: NetworkDefaultsIpFamily {
                pods_cidr: pods_ipv4,
                services_cidr: services_ipv4,
                node_cidr_mask_size: network.node_cidr_mask_size_ipv4,
                node_ports_allowed_ip_range: None,
            },
            ipv6: NetworkDefaultsIpFamily {
                pods_cidr: pods_ipv6,
                services_cidr: services_ipv6,
                node_cidr_mask_size: network.node_cidr_mask_size_ipv6,
                node_ports_allowed_ip_range: None,
            },
            proxy_mode: network.proxy_mode,
            node_local_dns_cache_enabled: network.node_local_dns_cache_enabled,
            cluster_expose_strategy: None,
            tunneling_agent_ip: None,
        }
    }

    /// Maps the defaults onto the network configuration of a cluster spec.
    ///
    /// The IP family is always IPv4, the IPv6 values only contribute the node CIDR mask size
    /// and the allowed node port range.
    pub fn cluster_network(&self) -> ClusterNetworkingConfig {
        let tunneling = self.cluster_expose_strategy == Some(ExposeStrategy::Tunneling);

        ClusterNetworkingConfig {
            ip_family: Some(IpFamily::Ipv4),
            pods: NetworkRanges::new(self.ipv4.pods_cidr.clone()),
            services: NetworkRanges::new(self.ipv4.services_cidr.clone()),
            node_cidr_mask_size_ipv4: self.ipv4.node_cidr_mask_size,
            node_cidr_mask_size_ipv6: self.ipv6.node_cidr_mask_size,
            proxy_mode: self.proxy_mode,
            node_local_dns_cache_enabled: self.node_local_dns_cache_enabled,
            tunneling_agent_ip: self.tunneling_agent_ip.clone().filter(|_| tunneling),
        }
    }

    /// The node port ranges of both IP families.
    pub fn node_ports_allowed_ip_ranges(&self) -> NetworkRanges {
        NetworkRanges::new(
            self.ipv4
                .node_ports_allowed_ip_range
                .iter()
                .chain(&self.ipv6.node_ports_allowed_ip_range)
                .cloned(),
        )
    }
}

/// Returns the first IPv4 and the first IPv6 CIDR of `ranges`. Malformed entries are ignored.
fn split_families(ranges: &NetworkRanges) -> (Option<String>, Option<String>) {
    let family = |cidr: &String| {
        let address = cidr.split_once('/').map_or(cidr.as_str(), |(address, _)| address);
        address.parse::<IpAddr>().ok().map(|address| address.is_ipv4())
    };

    let ipv4 = ranges
        .cidr_blocks
        .iter()
        .find(|cidr| family(cidr) == Some(true))
        .cloned();
    let ipv6 = ranges
        .cidr_blocks
        .iter()
        .find(|cidr| family(cidr) == Some(false))
        .cloned();
    (ipv4, ipv6)
}

/// Computes the network defaults of a new `provider` cluster on `seed`.
///
/// Layers from weakest to strongest: the built-in provider defaults, the expose strategy of
/// the global configuration, the expose strategy of the seed and the network settings of the
/// default cluster template. The template's expose strategy replaces the result even when it
/// is unset.
pub fn generate_network_defaults(
    provider: ProviderType,
    seed: &Seed,
    config: &KubermaticConfiguration,
    template: Option<&ClusterTemplate>,
) -> NetworkDefaults {
    let config_layer = NetworkDefaults {
        cluster_expose_strategy: config.spec.expose_strategy,
        ..NetworkDefaults::default()
    };
    let seed_layer = NetworkDefaults {
        cluster_expose_strategy: seed.spec.expose_strategy,
        ..NetworkDefaults::default()
    };
    let template_layer = template
        .map(|template| NetworkDefaults::from_template(&template.spec.cluster.cluster_network))
        .unwrap_or_default();

    let mut defaults = merge_layers([
        NetworkDefaults::builtin(provider),
        config_layer,
        seed_layer,
        template_layer,
    ])
    .unwrap_or_default();

    if let Some(template) = template {
        defaults.cluster_expose_strategy = template.spec.cluster.expose_strategy;
    }
    defaults
}
