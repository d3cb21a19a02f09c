use glam::{IVec3, Vec2, Vec3, Vec4};

use crate::HostError;

/// A texture owned by the host
pub type TextureId = u64;

/// A host texture together with its pixel size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostTexture {
    pub id: TextureId,
    pub width: f32,
    pub height: f32,
}

/// How a label text texture should be rasterized
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_px: f32,
    /// rgba in `0..=1`
    pub color: [f32; 4],
    /// center every line. used for two line labels
    pub centered: bool,
    pub max_width_px: u32,
}

/// Host text rasterization. Textures returned from here must be handed back to [TextRasterizer::release].
pub trait TextRasterizer {
    /// pixel size of the host's medium ui font, if known
    fn base_font_px(&self) -> Option<f32>;
    fn rasterize(&mut self, text: &str, style: &TextStyle) -> Result<HostTexture, HostError>;
    fn release(&mut self, texture: HostTexture);
}

/// The host's marker icon textures, looked up by icon code
pub trait IconAtlas {
    fn icon(&self, code: &str) -> Option<HostTexture>;
}

/// Draw calls the host exposes to us
pub trait BeaconPainter {
    /// 3d line between `start` and `end`, both relative to `origin`. color is packed `0xAABBGGRR`
    fn draw_line(&mut self, origin: IVec3, start: Vec3, end: Vec3, color: u32);
    /// 2d textured quad in screen pixels with a tint
    fn draw_texture(&mut self, texture: TextureId, pos: Vec2, size: Vec2, tint: Vec4);
}
