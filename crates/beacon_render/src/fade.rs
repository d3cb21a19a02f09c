use beacon_state::ClientConfig;
use glam::DVec3;

/// Fades beacons out when the camera gets close, so they don't block the view at point blank range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearFade {
    pub enabled: bool,
    /// fully opaque at or beyond this distance
    pub start: f64,
    /// fully transparent at or within this distance
    pub end: f64,
}

impl Default for NearFade {
    fn default() -> Self {
        Self {
            enabled: true,
            start: Self::DEFAULT_START,
            end: Self::DEFAULT_END,
        }
    }
}

impl NearFade {
    pub const DEFAULT_START: f64 = 25.0;
    pub const DEFAULT_END: f64 = 10.0;

    /// Sanitizes the configured distances. `end` is always strictly below `start`.
    pub fn new(enabled: bool, start: f64, end: f64) -> Self {
        let start = if start.is_finite() && start >= 1.0 {
            start
        } else {
            Self::DEFAULT_START
        };
        let mut end = if end.is_finite() && end >= 0.0 {
            end
        } else {
            Self::DEFAULT_END
        };
        if end >= start {
            end = start * 0.4;
        }
        Self {
            enabled,
            start,
            end,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            config.near_fade_enabled,
            config.near_fade_start as f64,
            config.near_fade_end as f64,
        )
    }

    /// fade factor in `0.0..=1.0` for a beacon whose anchor is `distance` away
    pub fn at_distance(&self, distance: f64) -> f32 {
        if !self.enabled || distance >= self.start {
            return 1.0;
        }
        if distance <= self.end {
            return 0.0;
        }
        ((distance - self.end) / (self.start - self.end)).clamp(0.0, 1.0) as f32
    }

    /// Fade between the camera and the center of the block the beacon stands on.
    pub fn alpha(&self, cam_pos: DVec3, beacon_pos: DVec3) -> f32 {
        self.at_distance(cam_pos.distance(fade_anchor(beacon_pos)))
    }
}

/// center of the marker's block
pub fn fade_anchor(pos: DVec3) -> DVec3 {
    pos.floor() + DVec3::splat(0.5)
}
