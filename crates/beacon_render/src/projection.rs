//! World to screen math for labels, and the auto-hide gaze test.

use beacon_link::{CameraLink, WorldInfo};
use glam::{DVec2, DVec3};

/// A projected point in screen pixels, origin top-left
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub pos: DVec2,
    /// false if the point is behind the camera. `pos` is meaningless then
    pub in_front: bool,
}

pub fn project(link: &CameraLink, world: DVec3) -> ScreenPoint {
    let clip = link.projection * link.view * world.extend(1.0);
    let in_front = clip.w > 0.0;
    let ndc = if clip.w.abs() > f64::EPSILON {
        clip.truncate() / clip.w
    } else {
        DVec3::ZERO
    };
    let size = link.viewport.as_dvec2();
    ScreenPoint {
        pos: DVec2::new((ndc.x * 0.5 + 0.5) * size.x, (0.5 - ndc.y * 0.5) * size.y),
        in_front,
    }
}

/// Closest point to `p` on the segment `a..b`. A degenerate segment collapses to `a`.
pub fn closest_point_on_segment(p: DVec2, a: DVec2, b: DVec2) -> DVec2 {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 <= 1e-6 {
        return a;
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    a + ab * t
}

pub fn dist2_point_to_segment(p: DVec2, a: DVec2, b: DVec2) -> f64 {
    p.distance_squared(closest_point_on_segment(p, a, b))
}

/// Label anchor height above the marker's block
pub const LABEL_WORLD_Y_OFFSET: f64 = 2.0;

/// Screen anchor for labels that are always shown.
/// `None` when the anchor is behind the camera or outside the viewport.
pub fn always_anchor(link: &CameraLink, beacon_pos: DVec3) -> Option<DVec2> {
    let anchor = DVec3::new(
        beacon_pos.x.floor() + 0.5,
        beacon_pos.y.floor() + LABEL_WORLD_Y_OFFSET,
        beacon_pos.z.floor() + 0.5,
    );
    let screen = project(link, anchor);
    if !screen.in_front {
        return None;
    }
    let size = link.viewport.as_dvec2();
    let DVec2 { x, y } = screen.pos;
    if x < 0.0 || x > size.x || y < 0.0 || y > size.y {
        return None;
    }
    Some(screen.pos)
}

/// Decides whether the camera is aiming at a beacon's beam.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoHideGate {
    /// screen distance from the crosshair to the beam, before gui scaling
    pub radius_px: f64,
    /// the tested beam spans this many blocks above and below the camera
    pub beam_window: f64,
    pub aim_margin_deg: f64,
    pub pitch_gain: f64,
}

impl Default for AutoHideGate {
    fn default() -> Self {
        Self {
            radius_px: 30.0,
            beam_window: 64.0,
            aim_margin_deg: 0.5,
            pitch_gain: 2.0,
        }
    }
}

impl AutoHideGate {
    pub fn with_pitch_gain(pitch_gain: f64) -> Self {
        Self {
            pitch_gain,
            ..Default::default()
        }
    }

    /// The camera must look at least as high as the beacon's base.
    /// Upward pitch is amplified by `pitch_gain` so that bases somewhat below eye level still pass.
    pub fn pitch_passes(&self, link: &CameraLink, beacon_pos: DVec3) -> bool {
        let beam = DVec2::new(beacon_pos.x.floor() + 0.5, beacon_pos.z.floor() + 0.5);
        let planar = beam.distance(DVec2::new(link.cam_pos.x, link.cam_pos.z));
        let base_dy = beacon_pos.y.floor() - link.cam_pos.y;
        let pitch_to_base = base_dy.atan2(planar);
        link.pitch_up() * self.pitch_gain + self.aim_margin_deg.to_radians() >= pitch_to_base
    }

    /// Where the label should attach, if the crosshair is close enough to the beam.
    ///
    /// The beam is cut to a window around the camera height, so beacons far above or below still work.
    /// If only one end of that window is in front of the camera, the test falls back to that end alone.
    pub fn anchor(&self, link: &CameraLink, world: &WorldInfo, beacon_pos: DVec3) -> Option<DVec2> {
        if !self.pitch_passes(link, beacon_pos) {
            return None;
        }
        let x = beacon_pos.x.floor() + 0.5;
        let z = beacon_pos.z.floor() + 0.5;
        let top = (world.height_blocks() - 1) as f64;
        let y_min = (link.cam_pos.y - self.beam_window).max(0.0);
        let y_max = (link.cam_pos.y + self.beam_window).min(top);

        let a = project(link, DVec3::new(x, y_min, z));
        let b = project(link, DVec3::new(x, y_max, z));
        let center = link.viewport_center();
        let anchor = match (a.in_front, b.in_front) {
            (true, true) => closest_point_on_segment(center, a.pos, b.pos),
            (true, false) => a.pos,
            (false, true) => b.pos,
            (false, false) => return None,
        };
        let radius = self.radius_px * link.gui_scale;
        if center.distance_squared(anchor) > radius * radius {
            return None;
        }
        Some(anchor)
    }
}
