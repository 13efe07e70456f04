//! Layered configuration.
//!
//! Defaults for a user cluster come from several places: built-in per-provider values, the
//! KubermaticConfiguration, the Seed and finally a seed-scoped default cluster template. Each of
//! these layers is expressed as a partial value where unset fields are [`None`], and layers are
//! combined with [`merge::Merge`], where the tighter layer wins field by field.

pub mod merge;
