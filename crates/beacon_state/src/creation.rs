use std::collections::HashSet;

use beacon_link::Marker;
use tracing::{debug, warn};

use crate::StableKey;

#[derive(Debug, Clone, PartialEq)]
pub enum CreationStatus {
    /// not in the list yet. poll again after [CreationWatch::RETRY_INTERVAL]
    Pending,
    /// the marker we asked for showed up
    Found { key: StableKey, marker: Marker },
    /// ran out of attempts. the beacon choice is dropped
    GaveUp,
}

/// Waits for a marker we asked the host to create.
///
/// The host gives no completion signal, so we remember the keys that existed before the request,
/// and look for a key that wasn't there. Polling stops after [CreationWatch::MAX_ATTEMPTS].
#[derive(Debug)]
pub struct CreationWatch {
    before: HashSet<StableKey>,
    beacon_on: bool,
    attempts: u32,
    next_poll_at: f64,
}

impl CreationWatch {
    pub const MAX_ATTEMPTS: u32 = 30;
    pub const RETRY_INTERVAL: f64 = 0.01;

    pub fn new(existing: &[Marker], beacon_on: bool, timestamp: f64) -> Self {
        Self {
            before: existing.iter().filter_map(StableKey::of_marker).collect(),
            beacon_on,
            attempts: 0,
            next_poll_at: timestamp,
        }
    }
    pub fn beacon_on(&self) -> bool {
        self.beacon_on
    }
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
    pub fn is_due(&self, timestamp: f64) -> bool {
        timestamp >= self.next_poll_at
    }

    pub fn poll(&mut self, markers: &[Marker], timestamp: f64) -> CreationStatus {
        self.attempts += 1;
        // newest markers are at the end of the host list
        let found = markers.iter().rev().find_map(|marker| {
            StableKey::of_marker(marker)
                .filter(|key| !self.before.contains(key))
                .map(|key| (key, marker))
        });
        if let Some((key, marker)) = found {
            debug!(%key, attempts = self.attempts, "created marker appeared");
            return CreationStatus::Found {
                key,
                marker: marker.clone(),
            };
        }
        if self.attempts >= Self::MAX_ATTEMPTS {
            warn!(attempts = self.attempts, "created marker never appeared in the marker list");
            return CreationStatus::GaveUp;
        }
        self.next_poll_at = timestamp + Self::RETRY_INTERVAL;
        CreationStatus::Pending
    }
}
