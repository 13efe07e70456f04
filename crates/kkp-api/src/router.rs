use axum::{
    Router,
    routing::{delete, get, put},
};
use tower_http::trace::TraceLayer;

use crate::{
    handlers::{defaults, presets, providers},
    state::AppState,
};

/// The prefix all API routes are nested under.
pub const API_PREFIX: &str = "/api/v2";

/// Builds the complete application router.
///
/// All API routes are traced. The `/healthz` route sits below the trace layer so that health
/// checks don't end up in the request logs.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/providers", get(providers::list_providers))
        .route(
            "/providers/{provider_name}/presets",
            get(providers::list_provider_presets)
                .post(providers::create_preset)
                .put(providers::update_preset),
        )
        .route(
            "/providers/{provider_name}/presets/{preset_name}",
            delete(providers::delete_provider_preset),
        )
        .route(
            "/providers/{provider_name}/dc/{dc}/networkdefaults",
            get(defaults::network_defaults),
        )
        .route(
            "/providers/{provider_name}/dc/{dc}/defaultcluster",
            get(defaults::default_cluster),
        )
        .route("/presets", get(presets::list_presets))
        .route("/presets/{preset_name}", delete(presets::delete_preset))
        .route(
            "/presets/{preset_name}/status",
            put(presets::update_preset_status),
        )
        .route(
            "/presets/{preset_name}/provider/{provider_name}",
            delete(presets::delete_preset_provider),
        )
        .route("/presets/{preset_name}/stats", get(presets::preset_stats))
        .route(
            "/presets/{preset_name}/linkages",
            get(presets::preset_linkages),
        )
        .route(
            "/projects/{project_id}/presets",
            get(presets::list_project_presets),
        )
        .route(
            "/projects/{project_id}/providers/{provider_name}/presets",
            get(providers::list_project_provider_presets),
        );

    Router::new()
        .nest(API_PREFIX, api)
        .layer(TraceLayer::new_for_http())
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
}
