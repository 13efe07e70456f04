use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use kkp_dashboard::{
    crd::Preset,
    preset::{PresetLinkages, PresetList, PresetStats},
};
use serde::{Deserialize, Serialize};

use super::{ListParams, bad_request};
use crate::{error::ApiError, identity::Caller, state::AppState};

type Result<T, E = ApiError> = std::result::Result<T, E>;

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct StatusParams {
    pub provider: Option<String>,
}

/// The body of a preset status update.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PresetStatus {
    pub enabled: bool,
}

pub async fn list_presets(
    State(state): State<AppState>,
    Caller(user): Caller,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<PresetList>> {
    let Query(params) = params.map_err(|rejection| bad_request(rejection.body_text()))?;
    let presets = state
        .resolver
        .list_presets(&user, &params.into_query(None))
        .await?;
    Ok(Json(presets))
}

pub async fn list_project_presets(
    State(state): State<AppState>,
    caller: Caller,
    Path(project_id): Path<String>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<PresetList>> {
    let Query(params) = params.map_err(|rejection| bad_request(rejection.body_text()))?;
    let user = caller.in_project(&state, &project_id).await?;
    let presets = state
        .resolver
        .list_presets(&user, &params.into_query(Some(project_id)))
        .await?;
    Ok(Json(presets))
}

pub async fn update_preset_status(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(preset_name): Path<String>,
    params: Result<Query<StatusParams>, QueryRejection>,
    body: Result<Json<PresetStatus>, JsonRejection>,
) -> Result<()> {
    let Query(params) = params.map_err(|rejection| bad_request(rejection.body_text()))?;
    let Json(status) = body.map_err(|rejection| bad_request(rejection.body_text()))?;
    let provider = params.provider.as_deref().filter(|provider| !provider.is_empty());
    state
        .mutator
        .update_preset_status(&user, &preset_name, provider, status.enabled)
        .await?;
    Ok(())
}

pub async fn delete_preset(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(preset_name): Path<String>,
) -> Result<()> {
    state.mutator.delete_preset(&user, &preset_name).await?;
    Ok(())
}

pub async fn delete_preset_provider(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path((preset_name, provider_name)): Path<(String, String)>,
) -> Result<Json<Preset>> {
    let preset = state
        .mutator
        .delete_preset_provider(&user, &preset_name, &provider_name)
        .await?;
    Ok(Json(preset))
}

pub async fn preset_stats(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(preset_name): Path<String>,
) -> Result<Json<PresetStats>> {
    Ok(Json(state.linkages.stats(&user, &preset_name).await?))
}

pub async fn preset_linkages(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(preset_name): Path<String>,
) -> Result<Json<PresetLinkages>> {
    Ok(Json(state.linkages.linkages(&user, &preset_name).await?))
}
