//! Domain types for bus planning and arrival history.
//!
//! Identifiers are validated at construction time, so code that receives
//! these types can trust them to be non-empty.

mod arrival;
mod clock;
mod ids;
mod route;
mod stop;

pub use arrival::{ArrivalPrediction, arrival_text};
pub use clock::{
    LOGICAL_DAY_OFFSET_HOURS, MINUTES_PER_DAY, logical_date, logical_date_key,
    logical_date_with_offset, minute_of_day,
};
pub use ids::{InvalidId, LocationId, RouteId, StopId};
pub use route::{Direction, PathStop, PlannedRoute, RouteDetail, RouteStop};
pub use stop::{Coordinates, StopIdentity};
