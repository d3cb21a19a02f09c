use beacon_link::{BeaconPainter, CameraLink, WorldInfo};
use beacon_state::{BeaconInfo, ClientConfig};
use glam::{DVec3, Vec3};
use tracing::trace;

use crate::NearFade;

/// `0xAARRGGBB` marker color -> `0xAABBGGRR` line color. Pure black becomes white.
pub fn line_color(argb: i32) -> u32 {
    let [a, r, g, b] = argb.to_be_bytes();
    let color = u32::from_be_bytes([a, b, g, r]);
    if color == 0xFF00_0000 {
        0xFFFF_FFFF
    } else {
        color
    }
}

/// Scales every channel of a packed line color. Some hosts ignore line alpha, so rgb is darkened too.
pub fn apply_fade(color: u32, fade: f32) -> u32 {
    if fade >= 0.999 {
        return color;
    }
    let fade = fade.clamp(0.0, 1.0);
    u32::from_be_bytes(color.to_be_bytes().map(|c| (c as f32 * fade) as u8))
}

/// Draws a vertical light column for every visible beacon.
#[derive(Debug, Clone)]
pub struct BeamRenderer {
    /// lines around the center line that give the beam its thickness
    pub ring_lines: u32,
    pub ring_radius: f32,
}

impl Default for BeamRenderer {
    fn default() -> Self {
        Self {
            ring_lines: 10,
            ring_radius: 0.10,
        }
    }
}

impl BeamRenderer {
    /// extra planar range so beams don't pop in right at the render distance
    pub const RANGE_MARGIN: i32 = 64;
    /// below this the beam is not drawn at all
    pub const MIN_VISIBLE_FADE: f32 = 0.01;

    pub fn render_range(config: &ClientConfig) -> i32 {
        config.effective_max_render_distance() + Self::RANGE_MARGIN
    }

    pub fn render(
        &self,
        beacons: &[BeaconInfo],
        link: &CameraLink,
        world: &WorldInfo,
        config: &ClientConfig,
        painter: &mut dyn BeaconPainter,
    ) {
        if !config.beams_enabled || beacons.is_empty() {
            return;
        }
        let world_top = (world.height_blocks() - 1) as f64;
        let origin = link.cam_pos.as_ivec3();
        let origin_f = origin.as_dvec3();
        let fade = NearFade::from_config(config);
        let range = Self::render_range(config) as f64;

        for beacon in beacons {
            let x = beacon.position.x.floor() + 0.5;
            let z = beacon.position.z.floor() + 0.5;
            let floor_y = beacon.position.y.floor();
            if link.planar_distance_to(beacon.position) > range {
                continue;
            }
            let fade_alpha = fade.alpha(link.cam_pos, beacon.position);
            if fade_alpha <= Self::MIN_VISIBLE_FADE {
                trace!(id = beacon.id, "beam faded out");
                continue;
            }
            let y0 = floor_y.min(world_top - 2.0).max(1.0);
            let start = (DVec3::new(x, y0, z) - origin_f).as_vec3();
            let end = (DVec3::new(x, world_top, z) - origin_f).as_vec3();
            let color = apply_fade(line_color(beacon.color), fade_alpha);

            painter.draw_line(origin, start, end, color);
            for i in 0..self.ring_lines {
                let angle = std::f32::consts::TAU * i as f32 / self.ring_lines as f32;
                let offset = Vec3::new(angle.cos(), 0.0, angle.sin()) * self.ring_radius;
                painter.draw_line(origin, start + offset, end + offset, color);
            }
        }
    }
}
