//! Wire types for the transit provider's JSON API.
//!
//! These mirror the provider's camelCase payloads and are converted to
//! domain types at the boundary. Blank identifiers are rejected there.

use serde::Deserialize;

use crate::domain::{ArrivalPrediction, RouteDetail, RouteId, RouteStop, StopId};
use crate::planner::SourceError;

/// Response from `GET /routes/{routeId}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResponse {
    pub route_id: String,
    #[serde(default)]
    pub route_name: Option<String>,
    #[serde(default)]
    pub direction_label: Option<String>,
    #[serde(default)]
    pub outbound_stops: Vec<RouteStopItem>,
    #[serde(default)]
    pub inbound_stops: Vec<RouteStopItem>,
}

/// One stop in a route sequence.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStopItem {
    pub name: String,
    #[serde(default)]
    pub stop_id: Option<String>,
}

/// Response from `GET /stops/{stopId}/arrivals`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArrivalsResponse {
    #[serde(default)]
    pub arrivals: Vec<ArrivalItem>,
}

/// Predictions for one route at the queried stop.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrivalItem {
    pub route_id: String,
    /// Absent when the provider echoes only the queried stop.
    #[serde(default)]
    pub stop_id: Option<String>,
    #[serde(default)]
    pub eta_minutes: Vec<u32>,
}

fn invalid(what: &str, value: &str) -> SourceError {
    SourceError::Json {
        message: format!("invalid {what}: {value:?}"),
    }
}

impl RouteResponse {
    /// Convert to a domain route.
    pub fn into_domain(self) -> Result<RouteDetail, SourceError> {
        let route_id =
            RouteId::parse(&self.route_id).map_err(|_| invalid("route id", &self.route_id))?;
        let route_name = self
            .route_name
            .unwrap_or_else(|| route_id.as_str().to_string());

        Ok(RouteDetail {
            route_id,
            route_name,
            direction_label: self.direction_label.unwrap_or_default(),
            outbound_stops: convert_stops(self.outbound_stops),
            inbound_stops: convert_stops(self.inbound_stops),
        })
    }
}

/// Stop ids that fail to parse are dropped; the name still places the stop.
fn convert_stops(items: Vec<RouteStopItem>) -> Vec<RouteStop> {
    items
        .into_iter()
        .map(|item| RouteStop {
            stop_id: item.stop_id.and_then(|s| StopId::parse(&s).ok()),
            name: item.name,
        })
        .collect()
}

impl ArrivalsResponse {
    /// Convert to domain predictions, tagging untagged items with the
    /// queried stop. Feed order is kept.
    pub fn into_domain(self, queried: &StopId) -> Result<Vec<ArrivalPrediction>, SourceError> {
        self.arrivals
            .into_iter()
            .map(|item| {
                let route_id = RouteId::parse(&item.route_id)
                    .map_err(|_| invalid("route id", &item.route_id))?;
                let stop_id = match item.stop_id {
                    Some(s) => StopId::parse(&s).map_err(|_| invalid("stop id", &s))?,
                    None => queried.clone(),
                };
                Ok(ArrivalPrediction {
                    route_id,
                    stop_id,
                    eta_minutes: item.eta_minutes,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_route_response() {
        let json = r#"{
            "routeId": "307",
            "routeName": "307 Banqiao",
            "outboundStops": [
                {"name": "Main St", "stopId": "1001"},
                {"name": "High St"}
            ],
            "inboundStops": [{"name": "High St", "stopId": " "}]
        }"#;
        let route: RouteResponse = serde_json::from_str(json).unwrap();
        let detail = route.into_domain().unwrap();

        assert_eq!(detail.route_id.as_str(), "307");
        assert_eq!(detail.route_name, "307 Banqiao");
        assert_eq!(detail.direction_label, "");
        assert_eq!(
            detail.outbound_stops[0].stop_id,
            Some(StopId::parse("1001").unwrap())
        );
        assert!(detail.outbound_stops[1].stop_id.is_none());
        assert!(detail.inbound_stops[0].stop_id.is_none());
    }

    #[test]
    fn route_name_defaults_to_id() {
        let route: RouteResponse = serde_json::from_str(r#"{"routeId": "12"}"#).unwrap();
        assert_eq!(route.into_domain().unwrap().route_name, "12");
    }

    #[test]
    fn blank_route_id_rejected() {
        let route: RouteResponse = serde_json::from_str(r#"{"routeId": "  "}"#).unwrap();
        assert!(matches!(route.into_domain(), Err(SourceError::Json { .. })));
    }

    #[test]
    fn arrivals_tagged_with_queried_stop() {
        let json = r#"{"arrivals": [
            {"routeId": "307", "etaMinutes": [3, 15]},
            {"routeId": "12", "stopId": "1002", "etaMinutes": []}
        ]}"#;
        let response: ArrivalsResponse = serde_json::from_str(json).unwrap();
        let queried = StopId::parse("1001").unwrap();
        let predictions = response.into_domain(&queried).unwrap();

        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[0].stop_id, queried);
        assert_eq!(predictions[0].eta_minutes, vec![3, 15]);
        assert_eq!(predictions[1].stop_id.as_str(), "1002");
        assert_eq!(predictions[1].soonest(), None);
    }

    #[test]
    fn empty_arrivals_body() {
        let response: ArrivalsResponse = serde_json::from_str("{}").unwrap();
        let queried = StopId::parse("1001").unwrap();
        assert!(response.into_domain(&queried).unwrap().is_empty());
    }
}
