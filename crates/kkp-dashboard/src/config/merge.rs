/// A value assembled from several layers, where the tighter layer wins field by field.
///
/// Implementations merge every field of `self` with the same field of `defaults`. Fields that
/// are replaced as a whole are [`Option`]s of an [`Atomic`] type, nested settings implement
/// [`Merge`] themselves.
///
/// # Example
///
/// ```
/// # use kkp_dashboard::config::merge::{Merge, merge};
/// #[derive(Debug, PartialEq, Eq)]
/// struct Proxy {
///     mode: Option<String>,
///     node_local_dns_cache: Option<bool>,
/// }
///
/// impl Merge for Proxy {
///     fn merge(&mut self, defaults: &Self) {
///         self.mode.merge(&defaults.mode);
///         self.node_local_dns_cache.merge(&defaults.node_local_dns_cache);
///     }
/// }
///
/// let seed = Proxy { mode: Some("iptables".to_owned()), node_local_dns_cache: None };
/// let builtin = Proxy { mode: Some("ipvs".to_owned()), node_local_dns_cache: Some(true) };
/// assert_eq!(merge(seed, &builtin), Proxy {
///     mode: Some("iptables".to_owned()),
///     node_local_dns_cache: Some(true),
/// });
/// ```
pub trait Merge {
    /// Fills everything unset in `self` from `defaults`.
    fn merge(&mut self, defaults: &Self);
}

/// Moving version of [`Merge::merge`].
pub fn merge<T: Merge>(mut overrides: T, defaults: &T) -> T {
    overrides.merge(defaults);
    overrides
}

/// Merges a sequence of layers, ordered from the weakest (first) to the strongest (last).
///
/// Returns [`None`] when no layer is given.
pub fn merge_layers<T: Merge>(layers: impl IntoIterator<Item = T>) -> Option<T> {
    layers
        .into_iter()
        .reduce(|defaults, overrides| merge(overrides, &defaults))
}

/// Marks types that are replaced as one value instead of being merged field by field.
pub trait Atomic: Clone {}
impl Atomic for i32 {}
impl Atomic for bool {}
impl Atomic for String {}
impl<T: Clone> Atomic for Vec<T> {}

impl<T: Atomic> Merge for Option<T> {
    fn merge(&mut self, defaults: &Self) {
        if self.is_none() {
            self.clone_from(defaults);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, Default, PartialEq, Eq)]
    struct IpFamilyLayer {
        pods_cidr: Option<String>,
        node_cidr_mask_size: Option<i32>,
    }

    impl Merge for IpFamilyLayer {
        fn merge(&mut self, defaults: &Self) {
            self.pods_cidr.merge(&defaults.pods_cidr);
            self.node_cidr_mask_size.merge(&defaults.node_cidr_mask_size);
        }
    }

    fn layer(pods_cidr: Option<&str>, node_cidr_mask_size: Option<i32>) -> IpFamilyLayer {
        IpFamilyLayer {
            pods_cidr: pods_cidr.map(ToOwned::to_owned),
            node_cidr_mask_size,
        }
    }

    #[test]
    fn unset_fields_fall_back() {
        assert_eq!(
            merge(layer(None, Some(26)), &layer(Some("172.25.0.0/16"), Some(24))),
            layer(Some("172.25.0.0/16"), Some(26))
        );
        assert_eq!(
            merge(layer(None, None), &layer(None, None)),
            IpFamilyLayer::default()
        );
    }

    #[test]
    fn strongest_layer_wins() {
        let builtin = layer(Some("172.25.0.0/16"), Some(24));
        let seed = layer(Some("10.0.0.0/16"), None);
        let template = layer(None, Some(28));

        assert_eq!(
            merge_layers([builtin, seed, template]),
            Some(layer(Some("10.0.0.0/16"), Some(28)))
        );
        assert_eq!(merge_layers(Vec::<IpFamilyLayer>::new()), None);
    }

    #[test]
    fn vectors_are_replaced_whole() {
        let mut ranges = Some(vec!["10.0.0.0/8".to_owned()]);
        ranges.merge(&Some(vec!["0.0.0.0/0".to_owned(), "::/0".to_owned()]));
        assert_eq!(ranges, Some(vec!["10.0.0.0/8".to_owned()]));
    }
}
