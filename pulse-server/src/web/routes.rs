//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use futures::future::join_all;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::domain::{StopId, arrival_text};
use crate::favorites::{FavoriteRoute, FavoritesError};
use crate::history::HistoryError;
use crate::planner::{LiveArrivalSource, RouteDataSource, RoutePlanner};

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/stops/:name", get(lookup_stop))
        .route("/api/arrivals/:name", get(live_arrivals))
        .route("/api/plan", get(plan_routes))
        .route("/api/pulse", get(pulse))
        .route("/api/watch", post(start_watch).delete(stop_watch))
        .route(
            "/api/favorites",
            get(list_favorites)
                .post(add_favorite)
                .delete(remove_favorite),
        )
        .route("/api/favorites/use", post(use_favorite))
        .route("/api/favorites/pin", post(pin_favorite))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Resolve a stop name to its posts.
async fn lookup_stop(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Json<StopLookupResponse> {
    let to_strings =
        |sids: Vec<StopId>| -> Vec<String> { sids.into_iter().map(String::from).collect() };

    Json(StopLookupResponse {
        stop_ids: to_strings(state.stops.sids_for_name(&name)),
        representative_stop_ids: to_strings(state.stops.representative_sids(&name)),
        coordinates: state.stops.coordinates_for_name(&name),
        name,
    })
}

/// Live arrivals at every location of a stop name, with direction.
async fn live_arrivals(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<LiveArrivalsResponse>, AppError> {
    let sids = state.stops.representative_sids(&name);
    if sids.is_empty() {
        return Err(AppError::NotFound {
            message: format!("Unknown stop: {name}"),
        });
    }

    let fetched = join_all(
        sids.iter()
            .map(|sid| state.arrivals.fetch_arrivals_at_stop(sid)),
    )
    .await;

    let mut predictions = Vec::new();
    let mut stops_failed = 0;
    let mut last_error = None;
    for (sid, result) in sids.iter().zip(fetched) {
        match result {
            Ok(p) => predictions.extend(p),
            Err(e) => {
                warn!(stop = %sid, error = %e, "Failed to fetch arrivals");
                stops_failed += 1;
                last_error = Some(e);
            }
        }
    }
    if stops_failed == sids.len()
        && let Some(e) = last_error
    {
        return Err(AppError::Upstream {
            message: e.to_string(),
        });
    }

    let planner = RoutePlanner::new(
        &state.stops,
        state.routes.as_ref(),
        state.arrivals.as_ref(),
        &state.planner_config,
    );
    let details = join_all(
        predictions
            .iter()
            .map(|p| state.routes.get_route_detail(&p.route_id)),
    )
    .await;

    let arrivals = predictions
        .into_iter()
        .zip(details)
        .map(|(prediction, detail)| {
            let detail = detail.ok();
            let direction = detail
                .as_ref()
                .and_then(|d| planner.infer_direction(d, &prediction.stop_id));
            LiveArrival {
                route_name: detail.as_ref().map(|d| d.route_name.clone()),
                direction_label: detail
                    .as_ref()
                    .zip(direction)
                    .map(|(d, dir)| d.direction_label_for(dir)),
                direction,
                arrival_time_text: arrival_text(prediction.soonest()),
                route_id: prediction.route_id.into(),
                stop_id: prediction.stop_id.into(),
                eta_minutes: prediction.eta_minutes,
            }
        })
        .collect();

    Ok(Json(LiveArrivalsResponse {
        name,
        arrivals,
        stops_failed,
    }))
}

/// Plan bus routes between two stop names.
///
/// A newer plan for the same pair makes this one answer 409.
async fn plan_routes(
    State(state): State<AppState>,
    Query(req): Query<PlanRequest>,
) -> Result<Json<PlanResponse>, AppError> {
    let from = req.from.trim();
    let to = req.to.trim();
    if from.is_empty() || to.is_empty() {
        return Err(AppError::BadRequest {
            message: "Both from and to are required".to_string(),
        });
    }

    let (generation, ticket) = state.plan_requests.begin(from, to);

    let planner = RoutePlanner::new(
        &state.stops,
        state.routes.as_ref(),
        state.arrivals.as_ref(),
        &state.planner_config,
    );
    let result = planner.plan(from, to).await;

    if !generation.is_current(ticket) {
        return Err(AppError::Superseded);
    }

    Ok(Json(PlanResponse {
        from: from.to_string(),
        to: to.to_string(),
        routes: result.routes,
        candidates_checked: result.candidates_checked,
        lookups_failed: result.lookups_failed,
    }))
}

/// Pulse timeline for a set of (route, stop) pairs.
async fn pulse(
    State(state): State<AppState>,
    Query(req): Query<PulseRequest>,
) -> Result<Json<PulseResponse>, AppError> {
    let keys = parse_pulse_keys(&req.keys).map_err(|message| AppError::BadRequest { message })?;
    let timeline = state.history.timeline(&keys)?;
    Ok(Json(PulseResponse::new(timeline)))
}

/// Start polling a stop name, replacing any previous watch.
async fn start_watch(
    State(state): State<AppState>,
    Json(req): Json<WatchRequest>,
) -> Result<Json<WatchResponse>, AppError> {
    let name = req.name.trim();
    if !state.stops.contains_name(name) {
        return Err(AppError::NotFound {
            message: format!("Unknown stop: {name}"),
        });
    }

    let generation = state.poller.watch(name);
    Ok(Json(WatchResponse {
        watching: Some(name.to_string()),
        generation,
    }))
}

/// Stop polling.
async fn stop_watch(State(state): State<AppState>) -> Json<WatchResponse> {
    state.poller.stop();
    Json(WatchResponse {
        watching: None,
        generation: state.poller.generation(),
    })
}

async fn list_favorites(
    State(state): State<AppState>,
) -> Result<Json<Vec<FavoriteRoute>>, AppError> {
    Ok(Json(state.favorites.list()?))
}

async fn add_favorite(
    State(state): State<AppState>,
    Json(req): Json<FavoritePairRequest>,
) -> Result<(StatusCode, Json<FavoriteRoute>), AppError> {
    let favorite = state
        .favorites
        .add(&req.origin, &req.destination, Utc::now())?;
    Ok((StatusCode::CREATED, Json(favorite)))
}

async fn remove_favorite(
    State(state): State<AppState>,
    Json(req): Json<FavoritePairRequest>,
) -> Result<Json<RemovedResponse>, AppError> {
    let removed = state.favorites.remove(&req.origin, &req.destination)?;
    Ok(Json(RemovedResponse { removed }))
}

async fn use_favorite(
    State(state): State<AppState>,
    Json(req): Json<FavoritePairRequest>,
) -> Result<Json<FavoriteRoute>, AppError> {
    let favorite = state
        .favorites
        .record_use(&req.origin, &req.destination, Utc::now())?;
    Ok(Json(favorite))
}

async fn pin_favorite(
    State(state): State<AppState>,
    Json(req): Json<PinRequest>,
) -> Result<Json<FavoriteRoute>, AppError> {
    let favorite = state
        .favorites
        .set_pinned(&req.origin, &req.destination, req.pinned)?;
    Ok(Json(favorite))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    /// A newer request for the same work replaced this one
    Superseded,
    Upstream { message: String },
    Internal { message: String },
}

impl From<HistoryError> for AppError {
    fn from(e: HistoryError) -> Self {
        AppError::Internal {
            message: e.to_string(),
        }
    }
}

impl From<FavoritesError> for AppError {
    fn from(e: FavoritesError) -> Self {
        match e {
            FavoritesError::NotFound { .. } => AppError::NotFound {
                message: e.to_string(),
            },
            FavoritesError::Invalid(_) => AppError::BadRequest {
                message: e.to_string(),
            },
            _ => AppError::Internal {
                message: e.to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            AppError::Superseded => (
                StatusCode::CONFLICT,
                "Superseded by a newer request".to_string(),
            ),
            AppError::Upstream { message } => (StatusCode::BAD_GATEWAY, message),
            AppError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        if status.is_server_error() {
            error!(status = %status, message = %message, "Request failed");
        }

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
