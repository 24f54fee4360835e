//! Saved origin/destination pairs.
//!
//! The whole list lives under one store key. Mutations are serialized by
//! the store instance, so concurrent requests can't drop each other's
//! changes.

use std::cmp::Reverse;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::store::{KeyValueStore, StoreError};

const FAVORITES_KEY: &str = "favorites:routes";

/// Errors from the favorites store.
#[derive(Debug, thiserror::Error)]
pub enum FavoritesError {
    #[error("favorites store error: {0}")]
    Store(#[from] StoreError),

    #[error("stored favorites are corrupt: {message}")]
    Json { message: String },

    #[error("no favorite from {origin:?} to {destination:?}")]
    NotFound { origin: String, destination: String },

    #[error("invalid favorite: {0}")]
    Invalid(&'static str),
}

/// A saved trip between two stop names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteRoute {
    pub origin: String,
    pub destination: String,
    #[serde(default)]
    pub use_count: u32,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub last_used: Option<DateTime<Utc>>,
    pub added_at: DateTime<Utc>,
}

impl FavoriteRoute {
    /// Names are compared trimmed, the way `add` stores them.
    fn is(&self, origin: &str, destination: &str) -> bool {
        self.origin == origin.trim() && self.destination == destination.trim()
    }
}

/// Sort favorites for display.
///
/// Pinned first, then most used, then most recently used, then most
/// recently added.
pub fn rank(favorites: &mut [FavoriteRoute]) {
    favorites.sort_by_key(|f| {
        (
            Reverse(f.pinned),
            Reverse(f.use_count),
            Reverse(f.last_used),
            Reverse(f.added_at),
        )
    });
}

/// Saved routes backed by a key-value store.
pub struct FavoriteRoutesStore {
    store: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl FavoriteRoutesStore {
    /// Create a favorites store over the given backend.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<Vec<FavoriteRoute>, FavoritesError> {
        match self.store.get(FAVORITES_KEY)? {
            Some(json) => serde_json::from_str(&json).map_err(|e| FavoritesError::Json {
                message: e.to_string(),
            }),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, favorites: &[FavoriteRoute]) -> Result<(), FavoritesError> {
        let json = serde_json::to_string(favorites).map_err(|e| FavoritesError::Json {
            message: e.to_string(),
        })?;
        self.store.set(FAVORITES_KEY, json)?;
        Ok(())
    }

    /// Run a read-modify-write cycle under the store's lock.
    fn update<T>(
        &self,
        f: impl FnOnce(&mut Vec<FavoriteRoute>) -> Result<(T, bool), FavoritesError>,
    ) -> Result<T, FavoritesError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut favorites = self.load()?;
        let (out, changed) = f(&mut favorites)?;
        if changed {
            self.save(&favorites)?;
        }
        Ok(out)
    }

    /// All favorites, ranked.
    pub fn list(&self) -> Result<Vec<FavoriteRoute>, FavoritesError> {
        let mut favorites = self.load()?;
        rank(&mut favorites);
        Ok(favorites)
    }

    /// Check whether a pair is saved.
    pub fn contains(&self, origin: &str, destination: &str) -> Result<bool, FavoritesError> {
        Ok(self.load()?.iter().any(|f| f.is(origin, destination)))
    }

    /// Save a pair. Adding a pair that is already saved returns the
    /// existing entry unchanged.
    pub fn add(
        &self,
        origin: &str,
        destination: &str,
        now: DateTime<Utc>,
    ) -> Result<FavoriteRoute, FavoritesError> {
        let origin = origin.trim();
        let destination = destination.trim();
        if origin.is_empty() || destination.is_empty() {
            return Err(FavoritesError::Invalid("stop names cannot be empty"));
        }
        if origin == destination {
            return Err(FavoritesError::Invalid("origin and destination are the same"));
        }

        self.update(|favorites| {
            if let Some(existing) = favorites.iter().find(|f| f.is(origin, destination)) {
                return Ok((existing.clone(), false));
            }

            let favorite = FavoriteRoute {
                origin: origin.to_string(),
                destination: destination.to_string(),
                use_count: 0,
                pinned: false,
                last_used: None,
                added_at: now,
            };
            debug!(origin, destination, "Adding favorite");
            favorites.push(favorite.clone());
            Ok((favorite, true))
        })
    }

    /// Remove a pair. Returns whether it was saved.
    pub fn remove(&self, origin: &str, destination: &str) -> Result<bool, FavoritesError> {
        self.update(|favorites| {
            let before = favorites.len();
            favorites.retain(|f| !f.is(origin, destination));
            let removed = favorites.len() != before;
            Ok((removed, removed))
        })
    }

    /// Count a use of a saved pair.
    pub fn record_use(
        &self,
        origin: &str,
        destination: &str,
        now: DateTime<Utc>,
    ) -> Result<FavoriteRoute, FavoritesError> {
        self.modify(origin, destination, |f| {
            f.use_count = f.use_count.saturating_add(1);
            f.last_used = Some(now);
        })
    }

    /// Pin or unpin a saved pair.
    pub fn set_pinned(
        &self,
        origin: &str,
        destination: &str,
        pinned: bool,
    ) -> Result<FavoriteRoute, FavoritesError> {
        self.modify(origin, destination, |f| f.pinned = pinned)
    }

    fn modify(
        &self,
        origin: &str,
        destination: &str,
        change: impl FnOnce(&mut FavoriteRoute),
    ) -> Result<FavoriteRoute, FavoritesError> {
        self.update(|favorites| {
            let favorite = favorites
                .iter_mut()
                .find(|f| f.is(origin, destination))
                .ok_or_else(|| FavoritesError::NotFound {
                    origin: origin.trim().to_string(),
                    destination: destination.trim().to_string(),
                })?;
            change(favorite);
            Ok((favorite.clone(), true))
        })
    }
}
