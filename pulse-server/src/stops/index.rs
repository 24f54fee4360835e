//! Stop identity lookup.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use crate::domain::{Coordinates, LocationId, StopId, StopIdentity};

use super::error::StopIndexError;
use super::table::{ParsedTable, ReferenceTable};

/// Resolves between stop names, stop ids (SID) and location ids (SLID).
///
/// Built once from the reference table and immutable afterwards; share it
/// behind an `Arc`. Unknown names and ids resolve to empty results rather
/// than errors.
#[derive(Debug, Clone, Default)]
pub struct StopIndex {
    identities: Vec<StopIdentity>,
    sids_by_name: HashMap<String, Vec<StopId>>,
    location_by_sid: HashMap<StopId, LocationId>,
    coordinates_by_sid: HashMap<StopId, Coordinates>,
    name_by_sid: HashMap<StopId, String>,
    sids_by_location: HashMap<LocationId, Vec<StopId>>,
}

impl StopIndex {
    /// Load and index the reference table at `path`.
    ///
    /// Fails on any structural problem with the data.
    pub fn load_all(path: impl AsRef<Path>) -> Result<Self, StopIndexError> {
        let table = ReferenceTable::from_path(path)?;
        Self::from_table(table)
    }

    /// Index an already-read reference table.
    pub fn from_table(table: ReferenceTable) -> Result<Self, StopIndexError> {
        Ok(Self::from_parsed(table.parse()?))
    }

    fn from_parsed(parsed: ParsedTable) -> Self {
        let mut index = StopIndex::default();

        for (sid, slid) in parsed.locations {
            index.location_by_sid.insert(sid, slid);
        }

        for identity in &parsed.identities {
            index
                .sids_by_name
                .entry(identity.name.clone())
                .or_default()
                .push(identity.stop_id.clone());
            index
                .location_by_sid
                .insert(identity.stop_id.clone(), identity.location_id.clone());
            index
                .name_by_sid
                .insert(identity.stop_id.clone(), identity.name.clone());
            if let Some(coords) = identity.coordinates {
                index
                    .coordinates_by_sid
                    .insert(identity.stop_id.clone(), coords);
            }
        }

        for (sid, slid) in &index.location_by_sid {
            index
                .sids_by_location
                .entry(slid.clone())
                .or_default()
                .push(sid.clone());
        }
        for sids in index.sids_by_location.values_mut() {
            sids.sort();
        }

        index.identities = parsed.identities;
        index
    }

    /// All indexed stop posts.
    pub fn identities(&self) -> &[StopIdentity] {
        &self.identities
    }

    /// Number of indexed stop posts.
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// Check if a stop name is known (exact, case-sensitive).
    pub fn contains_name(&self, name: &str) -> bool {
        self.sids_by_name.contains_key(name)
    }

    /// All stop ids registered under `name`. Exact, case-sensitive match.
    pub fn sids_for_name(&self, name: &str) -> Vec<StopId> {
        self.sids_by_name.get(name).cloned().unwrap_or_default()
    }

    /// One stop id per distinct location sharing `name`.
    ///
    /// Posts at the same location are the same place for live-arrival
    /// purposes, so callers query the feed once per location instead of
    /// once per sign.
    pub fn representative_sids(&self, name: &str) -> Vec<StopId> {
        let Some(sids) = self.sids_by_name.get(name) else {
            return Vec::new();
        };

        let mut seen: HashSet<&LocationId> = HashSet::new();
        sids.iter()
            .filter(|sid| match self.location_by_sid.get(*sid) {
                Some(slid) => seen.insert(slid),
                None => true,
            })
            .cloned()
            .collect()
    }

    /// The location a stop post stands at.
    pub fn location_id_for_sid(&self, sid: &StopId) -> Option<&LocationId> {
        self.location_by_sid.get(sid)
    }

    /// Names of every post sharing a location with any of `sids`.
    ///
    /// Live arrivals are tagged by stop id while route sequences are given
    /// by name; this bridges the two through the location id.
    pub fn names_matching_sids<'a>(
        &self,
        sids: impl IntoIterator<Item = &'a StopId>,
    ) -> BTreeSet<String> {
        let mut names = BTreeSet::new();

        for sid in sids {
            if let Some(name) = self.name_by_sid.get(sid) {
                names.insert(name.clone());
            }

            let Some(slid) = self.location_by_sid.get(sid) else {
                continue;
            };
            for sibling in self.sids_by_location.get(slid).into_iter().flatten() {
                if let Some(name) = self.name_by_sid.get(sibling) {
                    names.insert(name.clone());
                }
            }
        }

        names
    }

    /// Coordinates of a single stop post.
    pub fn coordinates_for_sid(&self, sid: &StopId) -> Option<Coordinates> {
        self.coordinates_by_sid.get(sid).copied()
    }

    /// Coordinates of the first post under `name` that has any.
    pub fn coordinates_for_name(&self, name: &str) -> Option<Coordinates> {
        self.sids_by_name
            .get(name)?
            .iter()
            .find_map(|sid| self.coordinates_for_sid(sid))
    }

    /// The display name of a stop post.
    pub fn name_for_sid(&self, sid: &StopId) -> Option<&str> {
        self.name_by_sid.get(sid).map(String::as_str)
    }
}
