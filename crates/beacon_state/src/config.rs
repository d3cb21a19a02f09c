use std::sync::Arc;

use cap_std::fs_utf8::Dir;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::ConfigError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelVisibility {
    Always,
    Never,
    /// only while the camera aims near the beam
    #[default]
    AutoHide,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelStyle {
    NameOnly,
    #[default]
    NameDistance,
    NameCoordinates,
}

/// All user tunable settings of the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub global_beacons_enabled: bool,
    pub beams_enabled: bool,
    pub near_fade_enabled: bool,
    pub show_icons_in_labels: bool,
    pub label_visibility: LabelVisibility,
    pub label_style: LabelStyle,
    /// slider value in `0..=100`
    pub label_font_size: u8,
    pub min_render_distance: i32,
    pub max_render_distance: i32,
    /// distance (in blocks) at which fading starts. fully opaque beyond it
    pub near_fade_start: f32,
    /// distance (in blocks) at which the beacon is fully transparent
    pub near_fade_end: f32,
    pub default_new_marker_beacon_on: bool,
    /// what the user picked the last time they added a marker through us
    pub last_add_beacon_choice: Option<bool>,
    pub max_render_distance_xz: i32,
    /// Upward pitch is multiplied by this before the auto-hide pitch gate compares it.
    /// Larger values let labels show up for bases further below eye level.
    pub auto_hide_pitch_gain: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            global_beacons_enabled: true,
            beams_enabled: true,
            near_fade_enabled: true,
            show_icons_in_labels: true,
            label_visibility: LabelVisibility::AutoHide,
            label_style: LabelStyle::NameDistance,
            label_font_size: 80,
            min_render_distance: 250,
            max_render_distance: 1000,
            near_fade_start: 25.0,
            near_fade_end: 10.0,
            default_new_marker_beacon_on: true,
            last_add_beacon_choice: None,
            max_render_distance_xz: 1000,
            auto_hide_pitch_gain: 2.0,
        }
    }
}

impl ClientConfig {
    pub const RENDER_DISTANCE_CAP: i32 = 1000;
    pub const FALLBACK_BASE_FONT_PX: f32 = 24.0;
    pub const MAX_FONT_SLIDER: u8 = 100;

    /// `(min, max)` both within `1..=RENDER_DISTANCE_CAP` and `min <= max`
    pub fn render_distance_bounds(&self) -> (i32, i32) {
        let max = self.max_render_distance.clamp(1, Self::RENDER_DISTANCE_CAP);
        let min = self.min_render_distance.clamp(1, max);
        (min, max)
    }
    pub fn effective_max_render_distance(&self) -> i32 {
        let (min, max) = self.render_distance_bounds();
        self.max_render_distance_xz.clamp(min, max)
    }
    /// Font size for labels. `base_px` is the host default font size if it has one.
    pub fn label_font_px(&self, base_px: Option<f32>) -> f32 {
        let base = base_px
            .filter(|px| px.is_finite() && *px > 0.0)
            .unwrap_or(Self::FALLBACK_BASE_FONT_PX);
        let t = self.label_font_size.min(Self::MAX_FONT_SLIDER) as f32 / Self::MAX_FONT_SLIDER as f32;
        base * (0.35 + 0.65 * t)
    }
    /// initial state of the "beacon" toggle in the add marker dialog
    pub fn add_dialog_beacon_choice(&self) -> bool {
        self.last_add_beacon_choice
            .unwrap_or(self.default_new_marker_beacon_on)
    }
}

/// What a setter did, so that the owner can invalidate the right things.
#[must_use]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SettingEffect {
    pub changed: bool,
    /// visibility filter must run again
    pub refilter: bool,
    /// cached label textures are stale
    pub invalidate_labels: bool,
}

impl SettingEffect {
    fn changed(changed: bool) -> Self {
        Self {
            changed,
            ..Default::default()
        }
    }
    fn refilter(self) -> Self {
        Self {
            refilter: self.changed,
            ..self
        }
    }
    fn invalidate_labels(self) -> Self {
        Self {
            invalidate_labels: self.changed,
            ..self
        }
    }
}

fn update<T: PartialEq>(field: &mut T, value: T, dirty: &mut bool) -> SettingEffect {
    if *field == value {
        return SettingEffect::default();
    }
    *field = value;
    *dirty = true;
    SettingEffect::changed(true)
}

/// Owns the [ClientConfig] and writes it to disk when it changed.
///
/// Every setter marks the store dirty. The owner calls [ConfigStore::save_if_dirty] once per tick,
/// so a burst of slider changes is written once.
#[derive(Debug)]
pub struct ConfigStore {
    dir: Option<Arc<Dir>>,
    config: ClientConfig,
    dirty: bool,
}

impl ConfigStore {
    pub const CONFIG_FILE_NAME: &'static str = "waypointbeacon-client.json";

    /// Never fails. missing or broken config files are logged and replaced by defaults
    pub fn load(dir: Arc<Dir>) -> Self {
        let config = match Self::read(&dir) {
            Ok(Some(config)) => config,
            Ok(None) => {
                info!("no client config found. using defaults");
                ClientConfig::default()
            }
            Err(e) => {
                error!(?e, "failed to load client config. using defaults");
                ClientConfig::default()
            }
        };
        Self {
            dir: Some(dir),
            config,
            dirty: false,
        }
    }
    /// `Ok(None)` when there is no config file yet
    fn read(dir: &Dir) -> Result<Option<ClientConfig>, ConfigError> {
        if !dir.exists(Self::CONFIG_FILE_NAME) {
            return Ok(None);
        }
        let contents = dir
            .read_to_string(Self::CONFIG_FILE_NAME)
            .map_err(ConfigError::Read)?;
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(ConfigError::Parse)
    }
    /// A store that never touches the disk
    pub fn in_memory(config: ClientConfig) -> Self {
        Self {
            dir: None,
            config,
            dirty: false,
        }
    }
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[tracing::instrument(skip(self))]
    pub fn save(&mut self) -> Result<(), ConfigError> {
        let Some(dir) = self.dir.as_ref() else {
            self.dirty = false;
            return Ok(());
        };
        let json = serde_json::to_string_pretty(&self.config).map_err(ConfigError::Serialize)?;
        dir.write(Self::CONFIG_FILE_NAME, json)
            .map_err(ConfigError::Write)?;
        // stays dirty on failure so the next tick retries
        self.dirty = false;
        debug!("saved client config");
        Ok(())
    }
    pub fn save_if_dirty(&mut self) -> Result<(), ConfigError> {
        if self.dirty {
            self.save()?;
        }
        Ok(())
    }

    pub fn set_global_beacons_enabled(&mut self, enabled: bool) -> SettingEffect {
        update(&mut self.config.global_beacons_enabled, enabled, &mut self.dirty).refilter()
    }
    pub fn toggle_global_beacons(&mut self) -> SettingEffect {
        let enabled = !self.config.global_beacons_enabled;
        self.set_global_beacons_enabled(enabled)
    }
    pub fn set_beams_enabled(&mut self, enabled: bool) -> SettingEffect {
        update(&mut self.config.beams_enabled, enabled, &mut self.dirty)
    }
    pub fn set_near_fade_enabled(&mut self, enabled: bool) -> SettingEffect {
        update(&mut self.config.near_fade_enabled, enabled, &mut self.dirty)
    }
    pub fn set_show_icons_in_labels(&mut self, show: bool) -> SettingEffect {
        update(&mut self.config.show_icons_in_labels, show, &mut self.dirty)
    }
    pub fn set_label_visibility(&mut self, visibility: LabelVisibility) -> SettingEffect {
        update(&mut self.config.label_visibility, visibility, &mut self.dirty)
    }
    pub fn set_label_style(&mut self, style: LabelStyle) -> SettingEffect {
        update(&mut self.config.label_style, style, &mut self.dirty).invalidate_labels()
    }
    pub fn set_label_font_size(&mut self, slider: u8) -> SettingEffect {
        let slider = slider.min(ClientConfig::MAX_FONT_SLIDER);
        update(&mut self.config.label_font_size, slider, &mut self.dirty).invalidate_labels()
    }
    /// upper bound of the render distance slider
    pub fn set_max_render_distance(&mut self, blocks: i32) -> SettingEffect {
        let (min, _) = self.config.render_distance_bounds();
        let blocks = blocks.clamp(min, ClientConfig::RENDER_DISTANCE_CAP);
        update(&mut self.config.max_render_distance, blocks, &mut self.dirty).refilter()
    }
    /// the render distance itself, clamped into [ClientConfig::render_distance_bounds]
    pub fn set_max_render_distance_xz(&mut self, blocks: i32) -> SettingEffect {
        let (min, max) = self.config.render_distance_bounds();
        update(&mut self.config.max_render_distance_xz, blocks.clamp(min, max), &mut self.dirty).refilter()
    }
    pub fn set_near_fade_distances(&mut self, start: f32, end: f32) -> SettingEffect {
        let start = if start.is_finite() { start.max(0.0) } else { 0.0 };
        let end = if end.is_finite() { end.max(0.0) } else { 0.0 };
        let a = update(&mut self.config.near_fade_start, start, &mut self.dirty);
        let b = update(&mut self.config.near_fade_end, end, &mut self.dirty);
        SettingEffect::changed(a.changed || b.changed)
    }
    pub fn set_default_new_marker_beacon_on(&mut self, on: bool) -> SettingEffect {
        update(&mut self.config.default_new_marker_beacon_on, on, &mut self.dirty)
    }
    pub fn set_last_add_beacon_choice(&mut self, on: bool) -> SettingEffect {
        update(&mut self.config.last_add_beacon_choice, Some(on), &mut self.dirty)
    }
    pub fn set_auto_hide_pitch_gain(&mut self, gain: f64) -> SettingEffect {
        let gain = if gain.is_finite() { gain.clamp(0.1, 10.0) } else { 2.0 };
        update(&mut self.config.auto_hide_pitch_gain, gain, &mut self.dirty)
    }
}
