use std::fmt;

use beacon_link::Marker;
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Identity of a marker that doesn't depend on engine ids.
///
/// Built from the position rounded to whole blocks and the title, formatted as `x,y,z|title`.
/// Two markers at the same block with the same title share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StableKey(String);

impl StableKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
    /// Wraps a key that was already formatted, e.g. one read back from persistence or the wire.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }
    /// `None` if the marker has no position
    pub fn of_marker(marker: &Marker) -> Option<Self> {
        marker
            .position
            .map(|pos| stable_key(pos.x, pos.y, pos.z, marker.title_or_empty()))
    }
}

impl fmt::Display for StableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<StableKey> for String {
    fn from(key: StableKey) -> Self {
        key.0
    }
}

fn block(v: f64) -> i32 {
    v.round() as i32
}

pub fn stable_key(x: f64, y: f64, z: f64, title: &str) -> StableKey {
    StableKey(format!("{},{},{}|{title}", block(x), block(y), block(z)))
}

/// 31 multiplier rolling hash over utf-16 units. Same on every process and platform.
fn title_hash(title: &str) -> i32 {
    title
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as i32))
}

/// Id derived from rounded position and title, used when the host has no usable native id.
pub fn fallback_id(pos: DVec3, title: &str) -> i32 {
    let mut h: i32 = 17;
    h = h.wrapping_mul(31).wrapping_add(block(pos.x));
    h = h.wrapping_mul(31).wrapping_add(block(pos.y));
    h = h.wrapping_mul(31).wrapping_add(block(pos.z));
    h.wrapping_mul(31).wrapping_add(title_hash(title))
}

/// The marker's native id if it has a non zero one, otherwise [fallback_id].
pub fn resolve_numeric_id(marker: &Marker) -> i32 {
    match marker.native_id {
        Some(id) if id != 0 => id,
        _ => fallback_id(
            marker.position.unwrap_or_default(),
            marker.title_or_empty(),
        ),
    }
}
