//! Well-known label and annotation keys, and helpers to query objects by them.
//!
//! Clusters and cluster templates created from a credential preset carry the
//! [`IS_CREDENTIAL_PRESET_LABEL`] label and name the preset in the
//! [`PRESET_NAME_ANNOTATION`] annotation. The linkage engine relies on this
//! convention to find the objects referencing a preset.
use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};

mod selector;

pub use selector::{LabelSelectorExt, SelectorError};

/// Marks an object as created from a credential preset.
pub const IS_CREDENTIAL_PRESET_LABEL: &str = "is-credential-preset";

/// Names the preset an object was created from.
pub const PRESET_NAME_ANNOTATION: &str = "presetName";

/// The project an object belongs to.
pub const PROJECT_ID_LABEL: &str = "project-id";

/// The scope of a cluster template (`global`, `user`, `project` or `seed`).
pub const CLUSTER_TEMPLATE_SCOPE_LABEL: &str = "scope";

/// The human readable name of a cluster template.
pub const CLUSTER_TEMPLATE_NAME_LABEL: &str = "name";

/// Scope value of seed-scoped (defaulting) cluster templates.
pub const CLUSTER_TEMPLATE_SEED_SCOPE: &str = "seed";

/// Returns a selector matching every object created from a credential preset.
pub fn credential_preset_selector() -> LabelSelector {
    LabelSelector {
        match_labels: Some(BTreeMap::from([(
            IS_CREDENTIAL_PRESET_LABEL.to_owned(),
            "true".to_owned(),
        )])),
        match_expressions: None,
    }
}

/// Returns the value of the label `key`, if present.
pub fn label<'a>(metadata: &'a ObjectMeta, key: &str) -> Option<&'a str> {
    metadata.labels.as_ref()?.get(key).map(String::as_str)
}

/// Returns the value of the annotation `key`, if present.
pub fn annotation<'a>(metadata: &'a ObjectMeta, key: &str) -> Option<&'a str> {
    metadata.annotations.as_ref()?.get(key).map(String::as_str)
}

/// Returns whether the object references the preset `preset_name`.
pub fn references_preset(metadata: &ObjectMeta, preset_name: &str) -> bool {
    annotation(metadata, PRESET_NAME_ANNOTATION) == Some(preset_name)
}
