use std::sync::Arc;

use kube::ResourceExt;
use snafu::{ResultExt, Snafu, ensure};
use tracing::{info, instrument};

use super::PresetBody;
use crate::{
    crd::{Preset, preset::ValidationError},
    error::{Classify, ErrorClass},
    identity::UserInfo,
    provider::{self, ProviderNameError, ProviderType},
    store::{PresetStore, StoreError},
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("only administrators may modify presets"))]
    NotAdmin,

    #[snafu(transparent)]
    ProviderName { source: ProviderNameError },

    #[snafu(display("the preset name cannot be empty"))]
    EmptyPresetName,

    #[snafu(display("missing provider configuration for: {provider}"))]
    MissingProviderConfiguration { provider: ProviderType },

    #[snafu(display("found unexpected provider configuration for: {provider}"))]
    UnexpectedProviderConfiguration { provider: ProviderType },

    #[snafu(display("invalid preset {name:?}"))]
    InvalidPreset {
        source: ValidationError,
        name: String,
    },

    #[snafu(display("{provider} provider configuration already exists for preset {name:?}"))]
    ProviderAlreadyConfigured { provider: ProviderType, name: String },

    #[snafu(display("preset {name:?} has no {provider} provider configuration to update"))]
    ProviderNotConfigured { provider: ProviderType, name: String },

    #[snafu(display("preset {name:?} has no {provider} provider configuration"))]
    ProviderNotFound { provider: ProviderType, name: String },

    #[snafu(display("failed to get preset {name:?}"))]
    GetPreset { source: StoreError, name: String },

    #[snafu(display("failed to create preset {name:?}"))]
    CreatePreset { source: StoreError, name: String },

    #[snafu(display("failed to update preset {name:?}"))]
    UpdatePreset { source: StoreError, name: String },

    #[snafu(display("failed to delete preset {name:?}"))]
    DeletePreset { source: StoreError, name: String },
}

impl Classify for Error {
    fn class(&self) -> ErrorClass {
        match self {
            Self::NotAdmin => ErrorClass::Forbidden,
            Self::ProviderName { source } => source.class(),
            Self::EmptyPresetName
            | Self::MissingProviderConfiguration { .. }
            | Self::UnexpectedProviderConfiguration { .. }
            | Self::InvalidPreset { .. } => ErrorClass::BadRequest,
            Self::ProviderAlreadyConfigured { .. } | Self::ProviderNotConfigured { .. } => {
                ErrorClass::Conflict
            }
            Self::ProviderNotFound { .. } => ErrorClass::NotFound,
            Self::GetPreset { source, .. }
            | Self::CreatePreset { source, .. }
            | Self::UpdatePreset { source, .. }
            | Self::DeletePreset { source, .. } => source.class(),
        }
    }
}

/// Admin-only preset lifecycle operations.
///
/// Every operation checks the caller first, then validates its input, and only then touches
/// the store. Concurrent writers are detected by the store's resource version check and
/// surface as [`ErrorClass::Conflict`].
pub struct PresetMutator {
    presets: Arc<dyn PresetStore>,
}

impl PresetMutator {
    pub fn new(presets: Arc<dyn PresetStore>) -> Self {
        Self { presets }
    }

    async fn get(&self, user: &UserInfo, name: &str) -> Result<Preset> {
        self.presets
            .get_preset(user, None, name)
            .await
            .context(GetPresetSnafu { name })
    }

    async fn update(&self, preset: Preset) -> Result<Preset> {
        let name = preset.name_any();
        self.presets
            .update_preset(preset)
            .await
            .context(UpdatePresetSnafu { name })
    }

    /// Creates a preset holding credentials for `provider`, or adds the provider to an
    /// existing preset of the same name.
    #[instrument(skip(self, user, body), fields(user = %user.email, preset = body.name()))]
    pub async fn create_preset(
        &self,
        user: &UserInfo,
        provider: &str,
        body: PresetBody,
    ) -> Result<Preset> {
        ensure_admin(user)?;
        let provider = validate_body(provider, &body)?;
        let name = body.name().to_owned();

        let mut existing = match self.presets.get_preset(user, None, &name).await {
            Ok(existing) => existing,
            Err(err) if err.is_not_found() => {
                // Only the name and labels of the body's metadata are kept.
                let mut preset = Preset::new(&name, body.spec);
                preset.metadata.labels = body.metadata.labels;
                let created = self
                    .presets
                    .create_preset(preset)
                    .await
                    .context(CreatePresetSnafu { name: &name })?;
                info!(%provider, "created preset");
                return Ok(created);
            }
            Err(source) => return Err(source).context(GetPresetSnafu { name }),
        };

        ensure!(
            !existing.spec.has_provider(provider),
            ProviderAlreadyConfiguredSnafu { provider, name }
        );

        existing.spec.override_provider(provider, &body.spec);
        existing.spec.required_emails = body.spec.required_emails;
        let updated = self.update(existing).await?;
        info!(%provider, "added provider to existing preset");
        Ok(updated)
    }

    /// Replaces the `provider` block of an existing preset.
    #[instrument(skip(self, user, body), fields(user = %user.email, preset = body.name()))]
    pub async fn update_preset(
        &self,
        user: &UserInfo,
        provider: &str,
        body: PresetBody,
    ) -> Result<Preset> {
        ensure_admin(user)?;
        let provider = validate_body(provider, &body)?;

        let mut existing = self.get(user, body.name()).await?;
        existing.spec.override_provider(provider, &body.spec);
        let updated = self.update(existing).await?;
        info!(%provider, "updated preset");
        Ok(updated)
    }

    /// Enables or disables a whole preset, or only one of its provider blocks.
    #[instrument(skip(self, user), fields(user = %user.email))]
    pub async fn update_preset_status(
        &self,
        user: &UserInfo,
        name: &str,
        provider: Option<&str>,
        enabled: bool,
    ) -> Result<()> {
        ensure_admin(user)?;
        let provider = provider.map(provider::parse_provider_name).transpose()?;

        let mut preset = self.get(user, name).await?;
        match provider {
            Some(provider) => {
                ensure!(
                    preset.spec.set_provider_enabled(provider, enabled),
                    ProviderNotConfiguredSnafu { provider, name }
                );
            }
            None => preset.spec.enabled = enabled.into(),
        }

        self.update(preset).await?;
        info!("updated preset status");
        Ok(())
    }

    #[instrument(skip(self, user), fields(user = %user.email))]
    pub async fn delete_preset(&self, user: &UserInfo, name: &str) -> Result<()> {
        ensure_admin(user)?;

        let preset = self.get(user, name).await?;
        self.presets
            .delete_preset(&preset.name_any())
            .await
            .context(DeletePresetSnafu { name })?;
        info!("deleted preset");
        Ok(())
    }

    /// Removes a single provider block. The preset is kept even when no block remains.
    #[instrument(skip(self, user), fields(user = %user.email))]
    pub async fn delete_preset_provider(
        &self,
        user: &UserInfo,
        name: &str,
        provider: &str,
    ) -> Result<Preset> {
        ensure_admin(user)?;
        let provider = provider::parse_provider_name(provider)?;

        let mut preset = self.get(user, name).await?;
        ensure!(
            preset.spec.remove_provider(provider),
            ProviderNotFoundSnafu { provider, name }
        );

        let updated = self.update(preset).await?;
        info!(%provider, "removed provider from preset");
        Ok(updated)
    }

    /// Removes a single provider block and deletes the preset once no block remains.
    #[deprecated(note = "use delete_preset_provider, which keeps empty presets")]
    #[instrument(skip(self, user), fields(user = %user.email))]
    pub async fn delete_provider_preset(
        &self,
        user: &UserInfo,
        provider: &str,
        name: &str,
    ) -> Result<()> {
        ensure_admin(user)?;
        let provider = provider::parse_provider_name(provider)?;

        let mut preset = self.get(user, name).await?;
        ensure!(
            preset.spec.remove_provider(provider),
            ProviderNotFoundSnafu { provider, name }
        );

        if preset.spec.has_any_provider() {
            self.update(preset).await?;
            info!(%provider, "removed provider from preset");
        } else {
            self.presets
                .delete_preset(name)
                .await
                .context(DeletePresetSnafu { name })?;
            info!(%provider, "deleted preset without remaining providers");
        }
        Ok(())
    }
}

fn ensure_admin(user: &UserInfo) -> Result<()> {
    ensure!(user.is_admin, NotAdminSnafu);
    Ok(())
}

/// Validates a create or update body: it must be named and carry a valid block for exactly
/// the requested provider.
fn validate_body(provider: &str, body: &PresetBody) -> Result<ProviderType> {
    let provider = provider::parse_provider_name(provider)?;
    ensure!(!body.name().is_empty(), EmptyPresetNameSnafu);

    let block = body
        .spec
        .provider(provider)
        .ok_or_else(|| MissingProviderConfigurationSnafu { provider }.build())?;
    block.validate().context(InvalidPresetSnafu { name: body.name() })?;

    if let Some(unexpected) = body
        .spec
        .configured_providers()
        .map(|block| block.provider_type())
        .find(|configured| *configured != provider)
    {
        return UnexpectedProviderConfigurationSnafu {
            provider: unexpected,
        }
        .fail();
    }

    Ok(provider)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use async_trait::async_trait;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use rstest::rstest;

    use super::*;
    use crate::{
        crd::{
            PresetSpec,
            preset::{
                EnabledState,
                providers::{Aws, Gcp},
            },
        },
        store::{self, memory::MemoryPresetStore},
    };

    /// Lets a second writer update every preset right after it was read.
    struct ConcurrentWriter {
        inner: MemoryPresetStore,
    }

    #[async_trait]
    impl PresetStore for ConcurrentWriter {
        async fn get_presets(
            &self,
            user: &UserInfo,
            project_id: Option<&str>,
        ) -> store::Result<Vec<Preset>> {
            self.inner.get_presets(user, project_id).await
        }

        async fn get_preset(
            &self,
            user: &UserInfo,
            project_id: Option<&str>,
            name: &str,
        ) -> store::Result<Preset> {
            let preset = self.inner.get_preset(user, project_id, name).await?;

            let mut concurrent = preset.clone();
            concurrent.spec.required_emails = vec!["concurrent.com".to_owned()];
            self.inner.update_preset(concurrent).await?;

            Ok(preset)
        }

        async fn create_preset(&self, preset: Preset) -> store::Result<Preset> {
            self.inner.create_preset(preset).await
        }

        async fn update_preset(&self, preset: Preset) -> store::Result<Preset> {
            self.inner.update_preset(preset).await
        }

        async fn delete_preset(&self, name: &str) -> store::Result<()> {
            self.inner.delete_preset(name).await
        }
    }

    fn admin() -> UserInfo {
        UserInfo::new("admin@kubermatic.com", true)
    }

    fn aws() -> Aws {
        Aws {
            access_key_id: "key".to_owned(),
            secret_access_key: "secret".to_owned(),
            ..Aws::default()
        }
    }

    fn gcp() -> Gcp {
        Gcp {
            service_account: "sa".to_owned(),
            ..Gcp::default()
        }
    }

    fn body(name: &str, spec: PresetSpec) -> PresetBody {
        PresetBody {
            metadata: ObjectMeta {
                name: Some(name.to_owned()),
                ..ObjectMeta::default()
            },
            spec,
        }
    }

    fn setup(presets: Vec<Preset>) -> (Arc<MemoryPresetStore>, PresetMutator) {
        let store = Arc::new(MemoryPresetStore::new(presets));
        (store.clone(), PresetMutator::new(store))
    }

    #[tokio::test]
    async fn create_then_get() {
        let (store, mutator) = setup(vec![]);

        mutator
            .create_preset(&admin(), "aws", body("fresh", PresetSpec {
                aws: Some(aws()),
                ..PresetSpec::default()
            }))
            .await
            .expect("create succeeds");

        let preset = store.get_raw("fresh").await.expect("preset was stored");
        assert_eq!(preset.spec.aws, Some(aws()));
        let configured: Vec<_> = preset
            .spec
            .configured_providers()
            .map(|block| block.provider_type())
            .collect();
        assert_eq!(configured, vec![ProviderType::Aws]);
    }

    #[tokio::test]
    async fn create_merges_into_existing_preset() {
        let (store, mutator) = setup(vec![Preset::new("shared", PresetSpec {
            gcp: Some(gcp()),
            required_emails: vec!["old.com".to_owned()],
            ..PresetSpec::default()
        })]);

        mutator
            .create_preset(&admin(), "aws", body("shared", PresetSpec {
                aws: Some(aws()),
                required_emails: vec!["new.com".to_owned()],
                ..PresetSpec::default()
            }))
            .await
            .expect("merge succeeds");

        let preset = store.get_raw("shared").await.expect("preset exists");
        assert!(preset.spec.has_provider(ProviderType::Aws));
        assert!(preset.spec.has_provider(ProviderType::Gcp));
        assert_eq!(preset.spec.required_emails, vec!["new.com".to_owned()]);
    }

    #[tokio::test]
    async fn create_existing_provider_conflicts_without_mutation() {
        let original = PresetSpec {
            aws: Some(aws()),
            ..PresetSpec::default()
        };
        let (store, mutator) = setup(vec![Preset::new("taken", original.clone())]);

        let err = mutator
            .create_preset(&admin(), "aws", body("taken", PresetSpec {
                aws: Some(Aws {
                    access_key_id: "other".to_owned(),
                    ..aws()
                }),
                ..PresetSpec::default()
            }))
            .await
            .expect_err("existing provider conflicts");
        assert_eq!(err.class(), ErrorClass::Conflict);

        let preset = store.get_raw("taken").await.expect("preset exists");
        assert_eq!(preset.spec, original);
        assert_eq!(preset.metadata.resource_version.as_deref(), Some("1"));
    }

    #[rstest]
    #[case(
        "",
        PresetSpec { aws: Some(aws()), ..PresetSpec::default() },
        "the provider name cannot be empty"
    )]
    #[case(
        "fake",
        PresetSpec { aws: Some(aws()), ..PresetSpec::default() },
        "invalid provider name \"fake\""
    )]
    #[case("aws", PresetSpec::default(), "missing provider configuration for: aws")]
    #[case(
        "aws",
        PresetSpec { aws: Some(Aws::default()), ..PresetSpec::default() },
        "invalid preset \"p\""
    )]
    #[case(
        "aws",
        PresetSpec { aws: Some(aws()), gcp: Some(gcp()), ..PresetSpec::default() },
        "found unexpected provider configuration for: gcp"
    )]
    #[tokio::test]
    async fn invalid_bodies(
        #[case] provider: &str,
        #[case] spec: PresetSpec,
        #[case] message: &str,
    ) {
        let (store, mutator) = setup(vec![]);

        let err = mutator
            .create_preset(&admin(), provider, body("p", spec))
            .await
            .expect_err("body is invalid");
        assert_eq!(err.class(), ErrorClass::BadRequest);
        assert_eq!(err.to_string(), message);
        assert!(store.get_raw("p").await.is_none());
    }

    #[tokio::test]
    async fn create_drops_server_managed_metadata() {
        let (store, mutator) = setup(vec![]);
        let labels = BTreeMap::from([("team".to_owned(), "platform".to_owned())]);

        let created = mutator
            .create_preset(&admin(), "aws", PresetBody {
                metadata: ObjectMeta {
                    name: Some("copied".to_owned()),
                    namespace: Some("kubermatic".to_owned()),
                    resource_version: Some("42".to_owned()),
                    uid: Some("0b8a3e2c".to_owned()),
                    labels: Some(labels.clone()),
                    ..ObjectMeta::default()
                },
                spec: PresetSpec {
                    aws: Some(aws()),
                    ..PresetSpec::default()
                },
            })
            .await
            .expect("create succeeds despite stale metadata");
        assert_eq!(created.metadata.resource_version.as_deref(), Some("1"));

        let preset = store.get_raw("copied").await.expect("preset was stored");
        assert_eq!(preset.metadata.labels, Some(labels));
        assert_eq!(preset.metadata.namespace, None);
        assert_eq!(preset.metadata.uid, None);
    }

    #[rstest]
    #[case(
        "fake",
        PresetSpec { aws: Some(aws()), ..PresetSpec::default() },
        "invalid provider name \"fake\""
    )]
    #[case("aws", PresetSpec::default(), "missing provider configuration for: aws")]
    #[case(
        "aws",
        PresetSpec { gcp: Some(gcp()), ..PresetSpec::default() },
        "missing provider configuration for: aws"
    )]
    #[case(
        "aws",
        PresetSpec { aws: Some(Aws::default()), ..PresetSpec::default() },
        "invalid preset \"p\""
    )]
    #[case(
        "aws",
        PresetSpec { aws: Some(aws()), gcp: Some(gcp()), ..PresetSpec::default() },
        "found unexpected provider configuration for: gcp"
    )]
    #[tokio::test]
    async fn invalid_update_bodies(
        #[case] provider: &str,
        #[case] spec: PresetSpec,
        #[case] message: &str,
    ) {
        let original = PresetSpec {
            aws: Some(aws()),
            ..PresetSpec::default()
        };
        let (store, mutator) = setup(vec![Preset::new("p", original.clone())]);

        let err = mutator
            .update_preset(&admin(), provider, body("p", spec))
            .await
            .expect_err("body is invalid");
        assert_eq!(err.class(), ErrorClass::BadRequest);
        assert_eq!(err.to_string(), message);

        let preset = store.get_raw("p").await.expect("preset exists");
        assert_eq!(preset.spec, original);
        assert_eq!(preset.metadata.resource_version.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn concurrent_writes_conflict() {
        let store = Arc::new(ConcurrentWriter {
            inner: MemoryPresetStore::new([Preset::new("p", PresetSpec {
                gcp: Some(gcp()),
                ..PresetSpec::default()
            })]),
        });
        let mutator = PresetMutator::new(store.clone());

        let err = mutator
            .update_preset_status(&admin(), "p", None, false)
            .await
            .expect_err("the status update lost the race");
        assert_eq!(err.class(), ErrorClass::Conflict);

        let err = mutator
            .update_preset(&admin(), "gcp", body("p", PresetSpec {
                gcp: Some(gcp()),
                ..PresetSpec::default()
            }))
            .await
            .expect_err("the update lost the race");
        assert_eq!(err.class(), ErrorClass::Conflict);

        let err = mutator
            .create_preset(&admin(), "aws", body("p", PresetSpec {
                aws: Some(aws()),
                ..PresetSpec::default()
            }))
            .await
            .expect_err("adding a provider lost the race");
        assert_eq!(err.class(), ErrorClass::Conflict);

        let preset = store.inner.get_raw("p").await.expect("preset exists");
        assert_eq!(preset.spec.enabled, EnabledState::Unset);
        assert!(!preset.spec.has_provider(ProviderType::Aws));
        assert_eq!(preset.spec.required_emails, vec!["concurrent.com".to_owned()]);
    }

    #[tokio::test]
    async fn empty_name_is_rejected() {
        let (_, mutator) = setup(vec![]);

        let err = mutator
            .create_preset(&admin(), "aws", body("", PresetSpec {
                aws: Some(aws()),
                ..PresetSpec::default()
            }))
            .await
            .expect_err("name is required");
        assert_eq!(err.to_string(), "the preset name cannot be empty");
    }

    #[tokio::test]
    async fn non_admins_are_forbidden_before_validation() {
        let (_, mutator) = setup(vec![]);
        let user = UserInfo::new("bob@example.com", false);

        let err = mutator
            .create_preset(&user, "", PresetBody::default())
            .await
            .expect_err("non-admin is rejected");
        assert_eq!(err.class(), ErrorClass::Forbidden);

        let err = mutator
            .delete_preset(&user, "missing")
            .await
            .expect_err("non-admin is rejected");
        assert_eq!(err.class(), ErrorClass::Forbidden);
    }

    #[tokio::test]
    async fn update_requires_existing_preset() {
        let (store, mutator) = setup(vec![Preset::new("existing", PresetSpec {
            aws: Some(aws()),
            gcp: Some(gcp()),
            ..PresetSpec::default()
        })]);

        let err = mutator
            .update_preset(&admin(), "aws", body("missing", PresetSpec {
                aws: Some(aws()),
                ..PresetSpec::default()
            }))
            .await
            .expect_err("missing preset");
        assert_eq!(err.class(), ErrorClass::NotFound);

        let replacement = Aws {
            access_key_id: "rotated".to_owned(),
            ..aws()
        };
        mutator
            .update_preset(&admin(), "aws", body("existing", PresetSpec {
                aws: Some(replacement.clone()),
                ..PresetSpec::default()
            }))
            .await
            .expect("update succeeds");

        let preset = store.get_raw("existing").await.expect("preset exists");
        assert_eq!(preset.spec.aws, Some(replacement));
        assert_eq!(preset.spec.gcp, Some(gcp()));
    }

    #[tokio::test]
    async fn status_updates() {
        let (store, mutator) = setup(vec![Preset::new("p", PresetSpec {
            aws: Some(aws()),
            ..PresetSpec::default()
        })]);

        for _ in 0..2 {
            mutator
                .update_preset_status(&admin(), "p", None, false)
                .await
                .expect("status update succeeds");
            let preset = store.get_raw("p").await.expect("preset exists");
            assert_eq!(preset.spec.enabled, EnabledState::Disabled);
        }

        mutator
            .update_preset_status(&admin(), "p", Some("aws"), false)
            .await
            .expect("provider status update succeeds");
        let preset = store.get_raw("p").await.expect("preset exists");
        assert!(!preset.spec.aws.expect("aws block").provider_preset.enabled.is_enabled());

        let err = mutator
            .update_preset_status(&admin(), "p", Some("gcp"), true)
            .await
            .expect_err("unconfigured provider conflicts");
        assert_eq!(err.class(), ErrorClass::Conflict);
    }

    #[tokio::test]
    async fn delete_preset_provider_keeps_empty_preset() {
        let (store, mutator) = setup(vec![Preset::new("p", PresetSpec {
            aws: Some(aws()),
            ..PresetSpec::default()
        })]);

        mutator
            .delete_preset_provider(&admin(), "p", "aws")
            .await
            .expect("provider removal succeeds");
        let preset = store.get_raw("p").await.expect("preset survives");
        assert!(!preset.spec.has_any_provider());

        let err = mutator
            .delete_preset_provider(&admin(), "p", "aws")
            .await
            .expect_err("provider is gone");
        assert_eq!(err.class(), ErrorClass::NotFound);
    }

    #[tokio::test]
    #[allow(deprecated)]
    async fn delete_provider_preset_removes_empty_preset() {
        let (store, mutator) = setup(vec![Preset::new("p", PresetSpec {
            aws: Some(aws()),
            gcp: Some(gcp()),
            ..PresetSpec::default()
        })]);

        mutator
            .delete_provider_preset(&admin(), "aws", "p")
            .await
            .expect("provider removal succeeds");
        assert!(store.get_raw("p").await.is_some());

        mutator
            .delete_provider_preset(&admin(), "gcp", "p")
            .await
            .expect("last provider removal succeeds");
        assert!(store.get_raw("p").await.is_none());
    }

    #[tokio::test]
    async fn delete_missing_preset() {
        let (_, mutator) = setup(vec![]);

        let err = mutator
            .delete_preset(&admin(), "missing")
            .await
            .expect_err("missing preset");
        assert_eq!(err.class(), ErrorClass::NotFound);
    }
}
