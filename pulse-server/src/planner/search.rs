//! Point-to-point route search.
//!
//! Finds bus routes that pass the origin stop name and then the destination
//! stop name, in either direction, and cuts out the path between them.

use std::collections::HashSet;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::domain::{
    Direction, PathStop, PlannedRoute, RouteDetail, RouteId, RouteStop, StopId, arrival_text,
};
use crate::stops::StopIndex;

use super::config::PlannerConfig;
use super::source::{LiveArrivalSource, RouteDataSource};

/// A route seen at the origin, with its soonest countdown there.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub route_id: RouteId,
    pub soonest_eta: Option<u32>,
}

impl Candidate {
    /// A candidate with no live estimate.
    pub fn without_eta(route_id: RouteId) -> Self {
        Self {
            route_id,
            soonest_eta: None,
        }
    }
}

/// Result of route planning.
#[derive(Debug, Clone, Default)]
pub struct PlanResult {
    /// Matching routes, in discovery order.
    pub routes: Vec<PlannedRoute>,

    /// Number of candidate routes examined.
    pub candidates_checked: usize,

    /// Number of upstream lookups that failed and were skipped.
    pub lookups_failed: usize,
}

impl PlanResult {
    /// Create an empty result.
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when no route connects the two stops.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Route planner.
pub struct RoutePlanner<'a, R: RouteDataSource, L: LiveArrivalSource> {
    stops: &'a StopIndex,
    routes: &'a R,
    arrivals: &'a L,
    config: &'a PlannerConfig,
}

impl<'a, R: RouteDataSource, L: LiveArrivalSource> RoutePlanner<'a, R, L> {
    /// Create a new planner.
    pub fn new(
        stops: &'a StopIndex,
        routes: &'a R,
        arrivals: &'a L,
        config: &'a PlannerConfig,
    ) -> Self {
        Self {
            stops,
            routes,
            arrivals,
            config,
        }
    }

    /// Plan routes from one stop name to another.
    ///
    /// Candidate routes are the ones currently reported at the origin.
    /// Unknown stop names give an empty result, as does a pair no
    /// candidate connects.
    pub async fn plan(&self, from: &str, to: &str) -> PlanResult {
        if !self.names_known(from, to) {
            return PlanResult::empty();
        }

        let (candidates, failed) = self.discover_candidates(from).await;
        let mut result = self.plan_with_candidates(from, to, &candidates).await;
        result.lookups_failed += failed;
        result
    }

    /// Plan routes using an explicit candidate list, in the given order.
    pub async fn plan_with_candidates(
        &self,
        from: &str,
        to: &str,
        candidates: &[Candidate],
    ) -> PlanResult {
        if !self.names_known(from, to) {
            return PlanResult::empty();
        }

        let mut result = PlanResult::empty();

        for batch in candidates.chunks(self.config.batch_size) {
            let futures: Vec<_> = batch
                .iter()
                .map(|c| async move { (c, self.routes.get_route_detail(&c.route_id).await) })
                .collect();

            for (candidate, fetched) in join_all(futures).await {
                result.candidates_checked += 1;
                match fetched {
                    Ok(detail) => {
                        result.routes.extend(self.match_route(
                            &detail,
                            from,
                            to,
                            candidate.soonest_eta,
                        ));
                    }
                    Err(e) => {
                        warn!(
                            route = %candidate.route_id,
                            error = %e,
                            "Failed to fetch route detail, skipping"
                        );
                        result.lookups_failed += 1;
                    }
                }
            }
        }

        debug!(
            from,
            to,
            routes = result.routes.len(),
            candidates = result.candidates_checked,
            "Route planning complete"
        );

        result
    }

    fn names_known(&self, from: &str, to: &str) -> bool {
        !self.stops.sids_for_name(from).is_empty() && !self.stops.sids_for_name(to).is_empty()
    }

    /// Routes reported at the origin, in stop then feed order.
    ///
    /// Returns the candidates and the number of stops whose feed failed.
    pub async fn discover_candidates(&self, from: &str) -> (Vec<Candidate>, usize) {
        let sids = self.stops.representative_sids(from);
        let mut candidates: Vec<Candidate> = Vec::new();
        let mut seen: HashSet<RouteId> = HashSet::new();
        let mut failed = 0;

        for batch in sids.chunks(self.config.batch_size) {
            let futures: Vec<_> = batch
                .iter()
                .map(|sid| async move { (sid, self.arrivals.fetch_arrivals_at_stop(sid).await) })
                .collect();

            for (sid, fetched) in join_all(futures).await {
                let predictions = match fetched {
                    Ok(p) => p,
                    Err(e) => {
                        warn!(
                            stop = %sid,
                            error = %e,
                            "Failed to fetch arrivals, skipping"
                        );
                        failed += 1;
                        continue;
                    }
                };

                for prediction in predictions {
                    let soonest = prediction.soonest();
                    if seen.insert(prediction.route_id.clone()) {
                        candidates.push(Candidate {
                            route_id: prediction.route_id,
                            soonest_eta: soonest,
                        });
                    } else if let Some(existing) =
                        candidates.iter_mut().find(|c| c.route_id == prediction.route_id)
                    {
                        existing.soonest_eta = match (existing.soonest_eta, soonest) {
                            (Some(a), Some(b)) => Some(a.min(b)),
                            (a, b) => a.or(b),
                        };
                    }
                }
            }
        }

        (candidates, failed)
    }

    /// Match one route against the trip, producing up to one result per
    /// direction. Both directions may qualify.
    pub fn match_route(
        &self,
        detail: &RouteDetail,
        from: &str,
        to: &str,
        soonest_eta: Option<u32>,
    ) -> Vec<PlannedRoute> {
        Direction::ALL
            .iter()
            .filter_map(|&direction| {
                let (i, j) = detail.find_segment(direction, from, to)?;
                let path_stops: Vec<PathStop> = detail.stops(direction)[i..=j]
                    .iter()
                    .map(|stop| self.path_stop(stop))
                    .collect();
                let stop_count = path_stops.len() - 1;

                Some(PlannedRoute {
                    route_id: detail.route_id.clone(),
                    route_name: detail.route_name.clone(),
                    direction,
                    direction_label: detail.direction_label_for(direction),
                    path_stops,
                    stop_count,
                    estimated_duration_minutes: self.config.estimate_minutes(stop_count),
                    arrival_time_text: arrival_text(soonest_eta),
                })
            })
            .collect()
    }

    /// Coordinates of the post the route uses, else of the name.
    fn path_stop(&self, stop: &RouteStop) -> PathStop {
        let coordinates = stop
            .stop_id
            .as_ref()
            .and_then(|sid| self.stops.coordinates_for_sid(sid))
            .or_else(|| self.stops.coordinates_for_name(&stop.name));

        PathStop {
            name: stop.name.clone(),
            coordinates,
        }
    }

    /// Which direction of a route serves a live arrival tagged `stop`.
    ///
    /// A direction whose sequence pins the exact post wins; otherwise the
    /// first direction (outbound first) containing any name at the post's
    /// location.
    pub fn infer_direction(&self, detail: &RouteDetail, stop: &StopId) -> Option<Direction> {
        let pinned = Direction::ALL.into_iter().find(|&d| {
            detail
                .stops(d)
                .iter()
                .any(|s| s.stop_id.as_ref() == Some(stop))
        });
        if pinned.is_some() {
            return pinned;
        }

        let names = self.stops.names_matching_sids([stop]);
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        Direction::ALL
            .into_iter()
            .find(|&d| detail.serves_any(d, &names))
    }
}
