use std::borrow::Cow;

use schemars::{JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Serialize};

/// An enablement flag that distinguishes "never set" from an explicit value.
///
/// On the wire this is an optional boolean. [`EnabledState::Unset`] counts as
/// enabled. Flags on two levels compose with a logical AND, see
/// [`EnabledState::and`].
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum EnabledState {
    #[default]
    Unset,
    Enabled,
    Disabled,
}

impl EnabledState {
    pub fn is_enabled(self) -> bool {
        !matches!(self, Self::Disabled)
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// Effective enablement of a child flag nested below `self`.
    pub fn and(self, child: Self) -> bool {
        self.is_enabled() && child.is_enabled()
    }
}

impl From<bool> for EnabledState {
    fn from(enabled: bool) -> Self {
        if enabled { Self::Enabled } else { Self::Disabled }
    }
}

impl From<Option<bool>> for EnabledState {
    fn from(value: Option<bool>) -> Self {
        value.map_or(Self::Unset, Self::from)
    }
}

impl From<EnabledState> for Option<bool> {
    fn from(value: EnabledState) -> Self {
        match value {
            EnabledState::Unset => None,
            EnabledState::Enabled => Some(true),
            EnabledState::Disabled => Some(false),
        }
    }
}

impl JsonSchema for EnabledState {
    fn schema_name() -> Cow<'static, str> {
        "EnabledState".into()
    }

    fn json_schema(generator: &mut SchemaGenerator) -> Schema {
        <Option<bool>>::json_schema(generator)
    }

    fn inline_schema() -> bool {
        true
    }
}
