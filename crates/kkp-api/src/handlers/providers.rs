use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use kkp_dashboard::{
    crd::Preset,
    preset::{PresetBody, PresetList},
    provider::ProviderType,
};
use serde::{Deserialize, Serialize};

use super::{ListParams, bad_request};
use crate::{error::ApiError, identity::Caller, state::AppState};

type Result<T, E = ApiError> = std::result::Result<T, E>;

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ProviderList {
    pub names: Vec<String>,
}

pub async fn list_providers() -> Json<ProviderList> {
    Json(ProviderList {
        names: ProviderType::supported_names()
            .into_iter()
            .map(ToOwned::to_owned)
            .collect(),
    })
}

pub async fn list_provider_presets(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(provider_name): Path<String>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<PresetList>> {
    let Query(params) = params.map_err(|rejection| bad_request(rejection.body_text()))?;
    let presets = state
        .resolver
        .list_provider_presets(&user, &provider_name, &params.into_query(None))
        .await?;
    Ok(Json(presets))
}

pub async fn list_project_provider_presets(
    State(state): State<AppState>,
    caller: Caller,
    Path((project_id, provider_name)): Path<(String, String)>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<PresetList>> {
    let Query(params) = params.map_err(|rejection| bad_request(rejection.body_text()))?;
    let user = caller.in_project(&state, &project_id).await?;
    let presets = state
        .resolver
        .list_provider_presets(&user, &provider_name, &params.into_query(Some(project_id)))
        .await?;
    Ok(Json(presets))
}

pub async fn create_preset(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(provider_name): Path<String>,
    body: Result<Json<PresetBody>, JsonRejection>,
) -> Result<Json<Preset>> {
    let Json(body) = body.map_err(|rejection| bad_request(rejection.body_text()))?;
    let preset = state
        .mutator
        .create_preset(&user, &provider_name, body)
        .await?;
    Ok(Json(preset))
}

pub async fn update_preset(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(provider_name): Path<String>,
    body: Result<Json<PresetBody>, JsonRejection>,
) -> Result<Json<Preset>> {
    let Json(body) = body.map_err(|rejection| bad_request(rejection.body_text()))?;
    let preset = state
        .mutator
        .update_preset(&user, &provider_name, body)
        .await?;
    Ok(Json(preset))
}

/// Removes a provider from a preset and deletes the preset once it has no provider left.
pub async fn delete_provider_preset(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path((provider_name, preset_name)): Path<(String, String)>,
) -> Result<()> {
    #[allow(deprecated)]
    state
        .mutator
        .delete_provider_preset(&user, &provider_name, &preset_name)
        .await?;
    Ok(())
}
