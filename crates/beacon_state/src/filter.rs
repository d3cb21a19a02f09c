use std::collections::HashSet;

use beacon_link::{CameraLink, Marker};
use glam::{DVec3, Vec4};
use tracing::debug;

use crate::{protocol::SetOverride, resolve_numeric_id, ClientConfig, OverrideStore, StableKey};

/// white, fully opaque. used when the marker has no color
pub const DEFAULT_MARKER_COLOR: i32 = -1;
/// dark colors vanish against the night sky, so they are drawn in this instead
pub const NEAR_BLACK_SUBSTITUTE: Vec4 = Vec4::new(0.25, 1.0, 1.0, 1.0);

/// `0xAARRGGBB` -> rgba in `0.0..=1.0`
pub fn decode_color(argb: i32) -> Vec4 {
    let [a, r, g, b] = argb.to_be_bytes();
    Vec4::new(r as f32, g as f32, b as f32, a as f32) / 255.0
}

pub fn is_near_black(rgba: Vec4) -> bool {
    rgba.x < 0.05 && rgba.y < 0.05 && rgba.z < 0.05
}

/// A marker that should get a beacon this frame
#[derive(Debug, Clone, PartialEq)]
pub struct BeaconInfo {
    pub id: i32,
    pub key: StableKey,
    pub position: DVec3,
    /// may be empty. renderers pick a placeholder
    pub name: String,
    pub icon: String,
    /// raw `0xAARRGGBB` from the host
    pub color: i32,
    /// decoded color, with near black replaced
    pub rgba: Vec4,
}

impl BeaconInfo {
    pub fn from_marker(marker: &Marker, key: StableKey, position: DVec3) -> Self {
        let color = marker.color.unwrap_or(DEFAULT_MARKER_COLOR);
        let mut rgba = decode_color(color);
        if is_near_black(rgba) {
            rgba = NEAR_BLACK_SUBSTITUTE;
        }
        Self {
            id: resolve_numeric_id(marker),
            key,
            position,
            name: marker.title_or_empty().to_owned(),
            icon: marker.icon.clone().unwrap_or_default(),
            color,
            rgba,
        }
    }
}

/// One line of the marker manager list
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerRow {
    pub id: i32,
    pub key: StableKey,
    pub name: String,
    /// the host's own pinned flag. has nothing to do with the beacon
    pub pinned: bool,
    pub beacon_on: bool,
}

/// Output of one [VisibilityFilter::refresh]
#[derive(Debug, Default)]
pub struct FilterPass {
    /// the new snapshot. the owner swaps it in whole
    pub beacons: Vec<BeaconInfo>,
    /// overrides that were turned on because the marker is new. must be sent to the server
    pub seeded: Vec<SetOverride>,
}

/// Turns the host marker list into the beacon snapshot.
///
/// Also remembers which markers were already there when the session started,
/// so that only markers created later get the "default on" treatment.
#[derive(Debug)]
pub struct VisibilityFilter {
    seen: HashSet<StableKey>,
    initialized: bool,
    last_refresh: Option<f64>,
    /// seconds between refreshes
    pub interval: f64,
}

impl Default for VisibilityFilter {
    fn default() -> Self {
        Self {
            seen: Default::default(),
            initialized: false,
            last_refresh: None,
            interval: Self::REFRESH_INTERVAL,
        }
    }
}

impl VisibilityFilter {
    pub const REFRESH_INTERVAL: f64 = 0.25;

    pub fn is_due(&self, timestamp: f64) -> bool {
        self.last_refresh
            .map(|last| timestamp - last >= self.interval)
            .unwrap_or(true)
    }
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
    pub fn has_seen(&self, key: &StableKey) -> bool {
        self.seen.contains(key)
    }
    /// For markers whose override was set explicitly (eg: created by us). they must not count as new later.
    pub fn mark_seen(&mut self, key: StableKey) {
        self.seen.insert(key);
    }

    /// Records the marker as seen and makes sure it has an override.
    /// Returns true if the override was seeded to `true` because the marker is new this session.
    pub fn observe(&mut self, key: &StableKey, store: &mut OverrideStore, default_new_on: bool) -> bool {
        let is_new = self.seen.insert(key.clone());
        if self.initialized && is_new && default_new_on && !store.contains(key) {
            store.set(key.clone(), true);
            debug!(%key, "new marker. beacon seeded on");
            return true;
        }
        if !store.contains(key) {
            store.set(key.clone(), false);
        }
        false
    }

    /// Rebuilds the snapshot from `markers`.
    ///
    /// Markers without a position are skipped. Every usable marker is observed even if it is out of range,
    /// so that walking towards an old marker never makes it look new.
    pub fn refresh(
        &mut self,
        timestamp: f64,
        markers: &[Marker],
        link: &CameraLink,
        config: &ClientConfig,
        store: &mut OverrideStore,
    ) -> FilterPass {
        self.last_refresh = Some(timestamp);
        let mut pass = FilterPass::default();
        if !config.global_beacons_enabled {
            return pass;
        }
        let max_distance = config.effective_max_render_distance() as f64;
        for marker in markers {
            let (Some(position), Some(key)) = (marker.position, StableKey::of_marker(marker)) else {
                continue;
            };
            if self.observe(&key, store, config.default_new_marker_beacon_on) {
                if let Some(message) = SetOverride::for_marker(marker, true) {
                    pass.seeded.push(message);
                }
            }
            if link.planar_distance_to(position) > max_distance {
                continue;
            }
            if !store.get(&key) {
                continue;
            }
            pass.beacons.push(BeaconInfo::from_marker(marker, key, position));
        }
        if !self.initialized {
            self.initialized = true;
            debug!(seen = self.seen.len(), "first marker scan done");
        }
        pass
    }

    /// Rows for the marker manager. `search` is a case insensitive title filter.
    /// Observes markers the same way [Self::refresh] does.
    pub fn rows(
        &mut self,
        markers: &[Marker],
        search: &str,
        config: &ClientConfig,
        store: &mut OverrideStore,
    ) -> (Vec<MarkerRow>, Vec<SetOverride>) {
        let search = search.trim().to_lowercase();
        let mut rows = vec![];
        let mut seeded = vec![];
        for marker in markers {
            let Some(key) = StableKey::of_marker(marker) else {
                continue;
            };
            if self.observe(&key, store, config.default_new_marker_beacon_on) {
                if let Some(message) = SetOverride::for_marker(marker, true) {
                    seeded.push(message);
                }
            }
            let name = marker.title_or_empty();
            if !search.is_empty() && !name.to_lowercase().contains(&search) {
                continue;
            }
            rows.push(MarkerRow {
                id: resolve_numeric_id(marker),
                beacon_on: store.get(&key),
                key,
                name: if name.is_empty() {
                    "(unnamed)".to_owned()
                } else {
                    name.to_owned()
                },
                pinned: marker.pinned.unwrap_or_default(),
            });
        }
        (rows, seeded)
    }
}
