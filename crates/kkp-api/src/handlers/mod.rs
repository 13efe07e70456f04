//! Request handlers, grouped by the resource their routes are rooted at.
use kkp_dashboard::{error::ErrorClass, preset::PresetsQuery};
use serde::Deserialize;

use crate::error::ApiError;

pub mod defaults;
pub mod presets;
pub mod providers;

/// Query parameters of the preset listings.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct ListParams {
    pub datacenter: String,
    pub disabled: bool,
    pub name: Option<String>,
}

impl ListParams {
    fn into_query(self, project_id: Option<String>) -> PresetsQuery {
        PresetsQuery {
            project_id,
            datacenter: self.datacenter,
            disabled: self.disabled,
            name: self.name,
        }
    }
}

/// Malformed query strings and bodies answer with the JSON envelope instead of axum's plain
/// text rejection.
fn bad_request(message: String) -> ApiError {
    ApiError::new(ErrorClass::BadRequest, message)
}
