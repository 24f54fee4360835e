//! Stop identity index.
//!
//! Loads the static stop reference table once at startup and answers
//! name ↔ stop id ↔ location id resolution queries.

mod error;
mod index;
mod table;

pub use error::StopIndexError;
pub use index::StopIndex;
pub use table::{ParsedTable, RawCoordinates, ReferenceTable};
