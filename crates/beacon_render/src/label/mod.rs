//! Overlay labels for beacons.
//!
//! Label text comes from [text::build_label], gets rasterized by the host once per distinct text
//! and kept in the [cache::LabelCache]. Each frame the renderer decides where (and whether) to put the label
//! for every beacon, then draws icon and text with a black outline under the fill.

pub mod cache;
pub mod text;

use beacon_link::{BeaconPainter, CameraLink, HostTexture, IconAtlas, TextRasterizer, TextStyle, WorldInfo};
use beacon_state::{BeaconInfo, ClientConfig, LabelStyle, LabelVisibility};
use glam::{DVec3, Vec2, Vec4};
use tracing::warn;

use crate::{
    beam::BeamRenderer,
    projection::{always_anchor, AutoHideGate},
    NearFade,
};
use cache::{LabelCache, LabelPass};

/// icon drawn when the marker's own icon isn't in the atlas
pub const FALLBACK_ICON: &str = "circle";

/// Offsets of the outline pass. A diamond of radius `r + 1`, clipped to the `r` square, without the center.
pub fn outline_offsets(radius: i32) -> impl Iterator<Item = (i32, i32)> {
    (-radius..=radius)
        .flat_map(move |ox| (-radius..=radius).map(move |oy| (ox, oy)))
        .filter(move |&(ox, oy)| (ox, oy) != (0, 0) && ox.abs() + oy.abs() <= radius + 1)
}

/// Host callbacks the label pass needs
pub struct LabelHost<'a> {
    pub rasterizer: &'a mut dyn TextRasterizer,
    pub icons: &'a dyn IconAtlas,
    pub painter: &'a mut dyn BeaconPainter,
}

#[derive(Debug)]
pub struct LabelRenderer {
    cache: LabelCache,
    /// player position when distance labels were last rebuilt
    last_distance_pos: Option<DVec3>,
    pub outline_px: i32,
}

impl Default for LabelRenderer {
    fn default() -> Self {
        Self {
            cache: Default::default(),
            last_distance_pos: None,
            outline_px: 2,
        }
    }
}

impl LabelRenderer {
    /// Always-mode labels sit this far above their anchor
    pub const SCREEN_Y_OFFSET_PX: f32 = 10.0;
    /// auto-hide labels sit this far below the crosshair, before gui scaling
    pub const AUTO_HIDE_BELOW_PX: f64 = 28.0;
    /// how much an auto-hide label follows the beam anchor vertically
    pub const AUTO_HIDE_FOLLOW: f64 = 0.35;
    pub const EDGE_MARGIN_PX: f32 = 2.0;
    pub const MAX_WIDTH_PX: u32 = 4096;

    /// Drops every cached texture. Call when font size or label style changed, and at shutdown.
    pub fn invalidate(&mut self, rasterizer: &mut dyn TextRasterizer) {
        self.cache.clear_all(rasterizer);
    }

    pub fn cached_textures(&self) -> usize {
        self.cache.len()
    }

    /// Distance labels go stale as the player moves. rebuild them after about a block of movement.
    fn expire_distance_labels(&mut self, config: &ClientConfig, player_pos: DVec3, rasterizer: &mut dyn TextRasterizer) {
        if config.label_style != LabelStyle::NameDistance {
            self.last_distance_pos = None;
            return;
        }
        match self.last_distance_pos {
            None => self.last_distance_pos = Some(player_pos),
            Some(last) if last.distance_squared(player_pos) > 1.0 => {
                self.cache.clear_all(rasterizer);
                self.last_distance_pos = Some(player_pos);
            }
            Some(_) => {}
        }
    }

    pub fn render(
        &mut self,
        beacons: &[BeaconInfo],
        link: &CameraLink,
        world: &WorldInfo,
        config: &ClientConfig,
        host: LabelHost<'_>,
    ) {
        let LabelHost {
            rasterizer,
            icons,
            painter,
        } = host;
        self.expire_distance_labels(config, link.player_pos, rasterizer);
        if beacons.is_empty() || config.label_visibility == LabelVisibility::Never {
            return;
        }
        let fade = NearFade::from_config(config);
        let gate = AutoHideGate::with_pitch_gain(config.auto_hide_pitch_gain);
        let font_px = config.label_font_px(rasterizer.base_font_px());
        let frame_h = link.viewport.y as f32;
        let center = link.viewport_center();

        for beacon in beacons {
            let auto_hide = config.label_visibility == LabelVisibility::AutoHide;
            let anchor = if auto_hide {
                gate.anchor(link, world, beacon.position)
            } else {
                always_anchor(link, beacon.position)
            };
            let Some(anchor) = anchor else {
                continue;
            };
            let fade_alpha = fade.alpha(link.cam_pos, beacon.position);
            if fade_alpha <= BeamRenderer::MIN_VISIBLE_FADE {
                continue;
            }

            let label = text::build_label(beacon, config.label_style, link.player_pos, world);
            let style = |color: [f32; 4]| TextStyle {
                font_px,
                color,
                centered: label.contains('\n'),
                max_width_px: Self::MAX_WIDTH_PX,
            };
            let outline = match self.cache.get_or_create(
                beacon.id,
                LabelPass::Outline,
                &label,
                &style([0.0, 0.0, 0.0, 1.0]),
                rasterizer,
            ) {
                Ok(texture) => Some(texture),
                Err(e) => {
                    warn!(?e, id = beacon.id, "failed to rasterize label outline");
                    None
                }
            };
            let fill = match self.cache.get_or_create(
                beacon.id,
                LabelPass::Fill,
                &label,
                &style([1.0; 4]),
                rasterizer,
            ) {
                Ok(texture) => texture,
                Err(e) => {
                    warn!(?e, id = beacon.id, "failed to rasterize label");
                    continue;
                }
            };

            let icon = (config.show_icons_in_labels && !beacon.icon.is_empty())
                .then(|| icons.icon(&beacon.icon).or_else(|| icons.icon(FALLBACK_ICON)))
                .flatten();
            // single line height, even for two line labels
            let icon_size = icon.map(|_| fill.height.min(font_px * 1.3)).unwrap_or_default();
            let icon_gap = icon.map(|_| (icon_size * 0.25).max(4.0)).unwrap_or_default();

            let content = Vec2::new(fill.width + icon_size + icon_gap, fill.height.max(icon_size));
            let base_x = anchor.x as f32 - content.x / 2.0;
            let base_y = if auto_hide {
                let below = Self::AUTO_HIDE_BELOW_PX * link.gui_scale;
                (center.y + below + (anchor.y - center.y) * Self::AUTO_HIDE_FOLLOW) as f32
            } else {
                anchor.y as f32 - content.y - Self::SCREEN_Y_OFFSET_PX
            };
            let base_y = clamp_on_screen(base_y, content.y, frame_h);

            let black = Vec4::new(0.0, 0.0, 0.0, fade_alpha);
            if let Some(icon) = icon {
                let pos = Vec2::new(base_x, base_y + (content.y - icon_size) / 2.0);
                let size = Vec2::splat(icon_size);
                for (ox, oy) in outline_offsets(self.outline_px) {
                    painter.draw_texture(icon.id, pos + Vec2::new(ox as f32, oy as f32), size, black);
                }
                let tint = beacon.rgba * Vec4::new(1.0, 1.0, 1.0, fade_alpha);
                painter.draw_texture(icon.id, pos, size, tint);
            }

            let text_pos = Vec2::new(base_x + icon_size + icon_gap, base_y + (content.y - fill.height) / 2.0);
            if let Some(outline) = outline {
                let size = texture_size(outline);
                for (ox, oy) in outline_offsets(self.outline_px) {
                    painter.draw_texture(outline.id, text_pos + Vec2::new(ox as f32, oy as f32), size, black);
                }
            }
            painter.draw_texture(fill.id, text_pos, texture_size(fill), Vec4::new(1.0, 1.0, 1.0, fade_alpha));
        }
    }
}

fn texture_size(texture: HostTexture) -> Vec2 {
    Vec2::new(texture.width, texture.height)
}

/// keeps a block of `height` pixels inside the frame
fn clamp_on_screen(y: f32, height: f32, frame_h: f32) -> f32 {
    let max = frame_h - height - LabelRenderer::EDGE_MARGIN_PX;
    y.min(max).max(LabelRenderer::EDGE_MARGIN_PX)
}
