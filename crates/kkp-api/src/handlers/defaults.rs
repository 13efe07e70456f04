use axum::{
    Json,
    extract::{Path, State},
};
use kkp_dashboard::defaulting::{ApiCluster, NetworkDefaults};

use crate::{error::ApiError, identity::Caller, state::AppState};

pub async fn network_defaults(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path((provider_name, datacenter)): Path<(String, String)>,
) -> Result<Json<NetworkDefaults>, ApiError> {
    let defaults = state
        .defaulting
        .network_defaults(&user, &provider_name, &datacenter)
        .await?;
    Ok(Json(defaults))
}

pub async fn default_cluster(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path((provider_name, datacenter)): Path<(String, String)>,
) -> Result<Json<ApiCluster>, ApiError> {
    let cluster = state
        .defaulting
        .default_cluster(&user, &provider_name, &datacenter)
        .await?;
    Ok(Json(cluster))
}
