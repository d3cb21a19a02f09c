use beacon_link::WorldInfo;
use beacon_state::{BeaconInfo, LabelStyle};
use glam::DVec3;

/// shown when the marker has no title
pub const PLACEHOLDER_NAME: &str = "Waypoint";

/// Rounds to whole blocks, then to steps of 1, 5 or 10 depending on how far it is.
pub fn quantize_distance(distance: f64) -> i64 {
    let blocks = distance.round() as i64;
    let step = match blocks {
        ..=99 => 1,
        100..=499 => 5,
        _ => 10,
    };
    ((blocks as f64 / step as f64).round() as i64) * step
}

/// `"40 m"` or `"1.2 km"`
pub fn format_distance(distance: f64) -> String {
    let q = quantize_distance(distance);
    if q >= 1000 {
        // tenths of a km, rounded half up
        let tenths = (q + 50) / 100;
        format!("{}.{} km", tenths / 10, tenths % 10)
    } else {
        format!("{q} m")
    }
}

/// Label text of a beacon. Name on the first line, and depending on the style a second line
/// with the live distance to the player or the map coordinates.
pub fn build_label(
    beacon: &BeaconInfo,
    style: LabelStyle,
    player_pos: DVec3,
    world: &WorldInfo,
) -> String {
    let mut name = beacon.name.replace(['\r', '\n'], " ");
    if name.is_empty() {
        name = PLACEHOLDER_NAME.to_owned();
    }
    match style {
        LabelStyle::NameOnly => name,
        LabelStyle::NameDistance => {
            format!("{name}\n{}", format_distance(beacon.position.distance(player_pos)))
        }
        LabelStyle::NameCoordinates => {
            let c = world.display_coordinates(beacon.position);
            format!("{name}\n[{}, {}, {}]", c.x, c.y, c.z)
        }
    }
}
