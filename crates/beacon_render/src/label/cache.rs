use std::collections::HashMap;

use beacon_link::{HostError, HostTexture, TextRasterizer, TextStyle};
use tracing::debug;

/// Labels are drawn twice: the outline pass in black around the fill pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelPass {
    Outline,
    Fill,
}

/// Rasterized label textures per beacon and pass.
///
/// Each slot remembers the text it was made from. A different text replaces the slot and releases the old
/// texture after the new one exists. Textures are only released back to the rasterizer that made them.
#[derive(Debug, Default)]
pub struct LabelCache {
    slots: HashMap<(i32, LabelPass), (String, HostTexture)>,
}

impl LabelCache {
    pub fn get_or_create(
        &mut self,
        id: i32,
        pass: LabelPass,
        text: &str,
        style: &TextStyle,
        rasterizer: &mut dyn TextRasterizer,
    ) -> Result<HostTexture, HostError> {
        if let Some((cached_text, texture)) = self.slots.get(&(id, pass)) {
            if cached_text == text {
                return Ok(*texture);
            }
        }
        let texture = rasterizer.rasterize(text, style)?;
        if let Some((_, old)) = self.slots.insert((id, pass), (text.to_owned(), texture)) {
            rasterizer.release(old);
        }
        Ok(texture)
    }

    /// releases every texture
    pub fn clear_all(&mut self, rasterizer: &mut dyn TextRasterizer) {
        if self.slots.is_empty() {
            return;
        }
        debug!(count = self.slots.len(), "releasing label textures");
        for (_, (_, texture)) in self.slots.drain() {
            rasterizer.release(texture);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
