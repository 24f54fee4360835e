//! Live arrival predictions.

use serde::{Deserialize, Serialize};

use super::{RouteId, StopId};

/// Countdown estimates for one route at one stop, as reported right now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrivalPrediction {
    pub route_id: RouteId,
    pub stop_id: StopId,
    /// Relative minutes, ascending as reported by the feed.
    #[serde(default)]
    pub eta_minutes: Vec<u32>,
}

impl ArrivalPrediction {
    /// The soonest countdown, if any bus is predicted.
    pub fn soonest(&self) -> Option<u32> {
        self.eta_minutes.iter().copied().min()
    }
}

/// Display text for a countdown.
pub fn arrival_text(eta: Option<u32>) -> String {
    match eta {
        Some(0) => "Arriving".to_string(),
        Some(mins) => format!("{mins} min"),
        None => "No estimate".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soonest_ignores_feed_order() {
        let p = ArrivalPrediction {
            route_id: RouteId::parse("1").unwrap(),
            stop_id: StopId::parse("S").unwrap(),
            eta_minutes: vec![7, 3, 12],
        };
        assert_eq!(p.soonest(), Some(3));
    }

    #[test]
    fn text_forms() {
        assert_eq!(arrival_text(Some(0)), "Arriving");
        assert_eq!(arrival_text(Some(4)), "4 min");
        assert_eq!(arrival_text(None), "No estimate");
    }
}
