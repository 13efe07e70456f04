use std::sync::Arc;

use kube::ResourceExt;
use snafu::{ResultExt, Snafu, ensure};
use tracing::{debug, instrument};

use super::{PresetList, PresetView};
use crate::{
    crd::Preset,
    error::{Classify, ErrorClass},
    identity::UserInfo,
    provider::{self, ProviderNameError, ProviderType},
    store::{PresetStore, StoreError},
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(transparent)]
    ProviderName { source: ProviderNameError },

    #[snafu(display("{email} is not a member of project {project_id:?}"))]
    NotProjectMember { email: String, project_id: String },

    #[snafu(display("failed to list presets"))]
    ListPresets { source: StoreError },

    #[snafu(display("failed to get preset {name:?}"))]
    GetPreset { source: StoreError, name: String },
}

impl Classify for Error {
    fn class(&self) -> ErrorClass {
        match self {
            Self::ProviderName { source } => source.class(),
            Self::NotProjectMember { .. } => ErrorClass::Forbidden,
            Self::ListPresets { source } | Self::GetPreset { source, .. } => source.class(),
        }
    }
}

/// Filters applied when listing presets.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PresetsQuery {
    /// Restricts the listing to presets usable within this project.
    pub project_id: Option<String>,

    /// Restricts provider listings to presets usable in this datacenter. Empty matches all.
    pub datacenter: String,

    /// Includes disabled presets.
    pub disabled: bool,

    /// Looks up a single preset by name instead of listing.
    pub name: Option<String>,
}

impl PresetsQuery {
    fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }

    /// Project restricted presets are only visible to admins, or when listing within one of
    /// the caller's projects. Membership is checked before any preset is read.
    fn can_see(&self, user: &UserInfo, preset: &Preset) -> bool {
        preset.spec.projects.is_empty()
            || user.is_admin
            || self
                .project_id
                .as_deref()
                .is_some_and(|project_id| preset.spec.projects.iter().any(|p| p == project_id))
    }
}

/// Lists presets visible to a caller.
pub struct PresetResolver {
    presets: Arc<dyn PresetStore>,
}

impl PresetResolver {
    pub fn new(presets: Arc<dyn PresetStore>) -> Self {
        Self { presets }
    }

    async fn candidates(&self, user: &UserInfo, query: &PresetsQuery) -> Result<Vec<Preset>> {
        let project_id = query.project_id.as_deref();
        if let Some(project_id) = project_id {
            ensure!(
                user.is_admin || user.is_member_of(project_id),
                NotProjectMemberSnafu {
                    email: &user.email,
                    project_id
                }
            );
        }

        match query.name() {
            Some(name) => {
                let preset = self
                    .presets
                    .get_preset(user, project_id, name)
                    .await
                    .context(GetPresetSnafu { name })?;
                Ok(vec![preset])
            }
            None => self
                .presets
                .get_presets(user, project_id)
                .await
                .context(ListPresetsSnafu),
        }
    }

    /// Lists presets offering credentials for `provider`.
    ///
    /// A preset is returned when it is visible to the caller, has a block for the provider,
    /// that block matches the requested datacenter and both the preset and the block are
    /// enabled (unless disabled presets are requested). A single preset requested by name
    /// goes through the same filters and yields an empty list when filtered out.
    #[instrument(skip(self, user), fields(user = %user.email))]
    pub async fn list_provider_presets(
        &self,
        user: &UserInfo,
        provider: &str,
        query: &PresetsQuery,
    ) -> Result<PresetList> {
        let provider = provider::parse_provider_name(provider)?;
        let items = self
            .candidates(user, query)
            .await?
            .iter()
            .filter_map(|preset| resolve_provider_preset(preset, provider, user, query))
            .collect();

        Ok(PresetList { items })
    }

    /// Lists presets regardless of provider. Only the preset level enabled flag is considered.
    #[instrument(skip(self, user), fields(user = %user.email))]
    pub async fn list_presets(&self, user: &UserInfo, query: &PresetsQuery) -> Result<PresetList> {
        let items = self
            .candidates(user, query)
            .await?
            .iter()
            .filter(|preset| query.can_see(user, preset))
            .filter(|preset| query.disabled || preset.spec.is_enabled())
            .map(|preset| {
                PresetView::new(preset.name_any(), preset.spec.is_enabled(), &preset.spec)
            })
            .collect();

        Ok(PresetList { items })
    }
}

fn resolve_provider_preset(
    preset: &Preset,
    provider: ProviderType,
    user: &UserInfo,
    query: &PresetsQuery,
) -> Option<PresetView> {
    let name = preset.name_any();
    if !query.can_see(user, preset) {
        debug!(preset = %name, "skipping project restricted preset");
        return None;
    }

    let block = preset.spec.provider(provider)?;
    let block_preset = block.provider_preset();
    if !block_preset.matches_datacenter(&query.datacenter) {
        return None;
    }

    let enabled = preset.spec.is_provider_enabled(provider);
    if !enabled && !query.disabled {
        return None;
    }

    Some(PresetView::new(name, enabled, &preset.spec))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::{
        crd::{
            PresetSpec,
            preset::{
                EnabledState, ProviderPreset,
                providers::{Aws, Gcp},
            },
        },
        store::memory::MemoryPresetStore,
    };

    fn aws(datacenter: &str, enabled: EnabledState) -> Option<Aws> {
        Some(Aws {
            provider_preset: ProviderPreset {
                enabled,
                datacenter: datacenter.to_owned(),
            },
            access_key_id: "key".to_owned(),
            secret_access_key: "secret".to_owned(),
            ..Aws::default()
        })
    }

    fn resolver(presets: impl IntoIterator<Item = Preset>) -> PresetResolver {
        PresetResolver::new(Arc::new(MemoryPresetStore::new(presets)))
    }

    fn names(list: &PresetList) -> Vec<&str> {
        list.items.iter().map(|view| view.name.as_str()).collect()
    }

    fn user() -> UserInfo {
        UserInfo::new("bob@example.com", false)
    }

    #[tokio::test]
    async fn only_enabled_provider_presets() {
        let resolver = resolver([
            Preset::new("enabled", PresetSpec {
                aws: aws("", EnabledState::Unset),
                ..PresetSpec::default()
            }),
            Preset::new("disabled", PresetSpec {
                aws: aws("", EnabledState::Disabled),
                ..PresetSpec::default()
            }),
            Preset::new("gcp-only", PresetSpec {
                gcp: Some(Gcp::default()),
                ..PresetSpec::default()
            }),
        ]);

        let list = resolver
            .list_provider_presets(&user(), "aws", &PresetsQuery::default())
            .await
            .expect("listing succeeds");
        assert_eq!(names(&list), vec!["enabled"]);

        let list = resolver
            .list_provider_presets(&user(), "aws", &PresetsQuery {
                disabled: true,
                ..PresetsQuery::default()
            })
            .await
            .expect("listing succeeds");
        assert_eq!(names(&list), vec!["disabled", "enabled"]);
        assert!(!list.items[0].enabled);
    }

    #[tokio::test]
    async fn datacenter_filter() {
        let resolver = resolver([
            Preset::new("first", PresetSpec {
                aws: aws("b", EnabledState::Unset),
                ..PresetSpec::default()
            }),
            Preset::new("second", PresetSpec {
                aws: aws("a", EnabledState::Unset),
                ..PresetSpec::default()
            }),
        ]);

        let list = resolver
            .list_provider_presets(&user(), "aws", &PresetsQuery {
                datacenter: "a".to_owned(),
                ..PresetsQuery::default()
            })
            .await
            .expect("listing succeeds");
        assert_eq!(names(&list), vec!["second"]);

        let list = resolver
            .list_provider_presets(&user(), "aws", &PresetsQuery {
                datacenter: "A".to_owned(),
                ..PresetsQuery::default()
            })
            .await
            .expect("listing succeeds");
        assert_eq!(names(&list), vec!["second"]);
    }

    #[rstest]
    #[case(None, None, false, vec![])]
    #[case(Some("p1"), Some("p1"), false, vec!["scoped"])]
    #[case(Some("p3"), Some("p3"), false, vec![])]
    #[case(None, None, true, vec!["scoped"])]
    #[case(Some("p2"), None, true, vec!["scoped"])]
    #[tokio::test]
    async fn project_scoped_visibility(
        #[case] project_id: Option<&str>,
        #[case] member_of: Option<&str>,
        #[case] is_admin: bool,
        #[case] expected: Vec<&str>,
    ) {
        let resolver = resolver([Preset::new("scoped", PresetSpec {
            aws: aws("", EnabledState::Unset),
            projects: vec!["p1".to_owned(), "p2".to_owned()],
            ..PresetSpec::default()
        })]);
        let mut user = UserInfo::new("bob@example.com", is_admin);
        if let Some(project) = member_of {
            user = user.in_project(project, format!("editors-{project}"));
        }
        let query = PresetsQuery {
            project_id: project_id.map(ToOwned::to_owned),
            ..PresetsQuery::default()
        };

        let list = resolver
            .list_provider_presets(&user, "aws", &query)
            .await
            .expect("listing succeeds");
        assert_eq!(names(&list), expected);

        let list = resolver
            .list_presets(&user, &query)
            .await
            .expect("listing succeeds");
        assert_eq!(names(&list), expected);
    }

    #[rstest]
    #[case(None)]
    #[case(Some("p2"))]
    #[tokio::test]
    async fn non_members_cannot_list_project_presets(#[case] member_of: Option<&str>) {
        let resolver = resolver([Preset::new("scoped", PresetSpec {
            aws: aws("", EnabledState::Unset),
            projects: vec!["p1".to_owned(), "p2".to_owned()],
            ..PresetSpec::default()
        })]);
        let mut mallory = UserInfo::new("mallory@example.com", false);
        if let Some(project) = member_of {
            mallory = mallory.in_project(project, format!("viewers-{project}"));
        }
        let query = PresetsQuery {
            project_id: Some("p1".to_owned()),
            ..PresetsQuery::default()
        };

        let err = resolver
            .list_provider_presets(&mallory, "aws", &query)
            .await
            .expect_err("non members are rejected");
        assert_eq!(err.class(), ErrorClass::Forbidden);

        let err = resolver
            .list_presets(&mallory, &query)
            .await
            .expect_err("non members are rejected");
        assert_eq!(err.class(), ErrorClass::Forbidden);
    }

    #[tokio::test]
    async fn named_lookup_hides_disabled() {
        let resolver = resolver([Preset::new("off", PresetSpec {
            enabled: EnabledState::Disabled,
            aws: aws("", EnabledState::Unset),
            ..PresetSpec::default()
        })]);
        let query = PresetsQuery {
            name: Some("off".to_owned()),
            ..PresetsQuery::default()
        };

        let list = resolver
            .list_provider_presets(&user(), "aws", &query)
            .await
            .expect("hidden preset is not an error");
        assert!(list.items.is_empty());

        let list = resolver
            .list_presets(&user(), &query)
            .await
            .expect("hidden preset is not an error");
        assert!(list.items.is_empty());

        let list = resolver
            .list_provider_presets(&user(), "aws", &PresetsQuery {
                disabled: true,
                ..query
            })
            .await
            .expect("listing succeeds");
        assert_eq!(names(&list), vec!["off"]);

        let err = resolver
            .list_provider_presets(&user(), "aws", &PresetsQuery {
                name: Some("missing".to_owned()),
                ..PresetsQuery::default()
            })
            .await
            .expect_err("unknown preset fails");
        assert_eq!(err.class(), ErrorClass::NotFound);
    }

    #[rstest]
    #[case("")]
    #[case("fake")]
    #[tokio::test]
    async fn invalid_provider(#[case] provider: &str) {
        let err = resolver(Vec::<Preset>::new())
            .list_provider_presets(&user(), provider, &PresetsQuery::default())
            .await
            .expect_err("invalid provider fails");
        assert_eq!(err.class(), ErrorClass::BadRequest);
    }
}
