//! Server side persistence of a player's overrides.
//!
//! The whole map is stored as one string attribute on the player record,
//! one `key<TAB>0|1` record per line. The attribute name includes the world seed,
//! so overrides from one world never show up in another.

use indexmap::IndexMap;
use tracing::debug;

use crate::StableKey;

pub const OVERRIDES_ATTRIBUTE_PREFIX: &str = "waypointbeacon:pins:";

pub fn overrides_attribute_key(world_seed: i64) -> String {
    format!("{OVERRIDES_ATTRIBUTE_PREFIX}{world_seed}")
}

/// Parses the stored override map. Malformed lines are skipped.
/// Values are `1`/`0`, `true` in any case is accepted too.
pub fn parse_override_map(raw: &str) -> IndexMap<StableKey, bool> {
    let mut map = IndexMap::new();
    for (line_number, line) in raw.split('\n').enumerate() {
        if line.is_empty() {
            continue;
        }
        // titles may contain tabs, the value is always after the last one
        let Some((key, value)) = line.rsplit_once('\t') else {
            debug!(line_number, "skipping override line without a tab");
            continue;
        };
        if key.is_empty() {
            debug!(line_number, "skipping override line with empty key");
            continue;
        }
        let value = value.trim();
        let enabled = value == "1" || value.eq_ignore_ascii_case("true");
        map.insert(StableKey::from_raw(key), enabled);
    }
    map
}

pub fn serialize_override_map<'a>(entries: impl IntoIterator<Item = (&'a StableKey, bool)>) -> String {
    let mut out = String::new();
    for (key, enabled) in entries {
        if key.as_str().is_empty() {
            continue;
        }
        out.push_str(key.as_str());
        out.push('\t');
        out.push(if enabled { '1' } else { '0' });
        out.push('\n');
    }
    out
}
