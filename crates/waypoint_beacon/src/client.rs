use beacon_link::{
    BeaconPainter, CameraLink, HostError, MapLayerAccessor, Marker, NewMarker, TextRasterizer, WorldInfo,
};
use beacon_render::{label::LabelHost, BeamRenderer, LabelRenderer};
use beacon_state::{
    protocol::decode, resolve_numeric_id, BeaconInfo, ClientChannel, ClientConfig, ClientSync, ConfigStore,
    CreationStatus, CreationWatch, LabelStyle, LabelVisibility, MarkerRow, OverrideStore, ServerMessage,
    SetOverride, SettingEffect, StableKey, VisibilityFilter,
};
use tracing::{debug, error, info, warn};

/// What the client needs from the host during a tick or a user action
pub struct ClientHost<'a> {
    pub layer: &'a mut dyn MapLayerAccessor,
    pub channel: &'a mut dyn ClientChannel,
    pub link: &'a CameraLink,
}

/// Client side of waypoint beacons. Owns all client state and runs on the host's main thread.
pub struct BeaconClient {
    config: ConfigStore,
    world: WorldInfo,
    overrides: OverrideStore,
    filter: VisibilityFilter,
    sync: ClientSync,
    beacons: Vec<BeaconInfo>,
    creations: Vec<CreationWatch>,
    beam_renderer: BeamRenderer,
    label_renderer: LabelRenderer,
    /// filter must run on the next tick regardless of the interval
    refilter_requested: bool,
    /// label textures must be dropped before the next label pass
    labels_stale: bool,
    now: f64,
}

impl BeaconClient {
    pub fn new(config: ConfigStore, world: WorldInfo) -> Self {
        info!(seed = world.seed, height = world.height_blocks(), "starting waypoint beacon client");
        Self {
            config,
            world,
            overrides: Default::default(),
            filter: Default::default(),
            sync: Default::default(),
            beacons: vec![],
            creations: vec![],
            beam_renderer: Default::default(),
            label_renderer: Default::default(),
            refilter_requested: false,
            labels_stale: false,
            now: 0.0,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        self.config.config()
    }
    pub fn overrides(&self) -> &OverrideStore {
        &self.overrides
    }
    /// the current snapshot of beacons to draw
    pub fn beacons(&self) -> &[BeaconInfo] {
        &self.beacons
    }
    /// overrides waiting for the channel to connect
    pub fn deferred_overrides(&self) -> impl Iterator<Item = &SetOverride> {
        self.sync.deferred()
    }
    pub fn pending_creations(&self) -> usize {
        self.creations.len()
    }

    /// Called from the host's periodic game tick.
    pub fn tick(&mut self, timestamp: f64, host: &mut ClientHost<'_>) {
        self.now = timestamp;
        self.sync.tick(timestamp, host.channel);
        self.poll_creations(host);
        if self.refilter_requested || self.filter.is_due(timestamp) {
            self.refilter(host);
        }
        if let Err(e) = self.config.save_if_dirty() {
            error!(?e, "failed to save client config");
        }
    }

    /// Rebuilds the beacon snapshot right away.
    /// A failed marker scan keeps the previous snapshot.
    pub fn refilter(&mut self, host: &mut ClientHost<'_>) {
        self.refilter_requested = false;
        let markers = match host.layer.markers() {
            Ok(markers) => markers,
            Err(e) => {
                warn!(?e, accessor = host.layer.name(), "failed to list markers");
                return;
            }
        };
        let pass = self.filter.refresh(
            self.now,
            &markers,
            host.link,
            self.config.config(),
            &mut self.overrides,
        );
        // swap in whole so renderers never see a half built list
        self.beacons = pass.beacons;
        for message in pass.seeded {
            self.sync.send_override(message, host.channel);
        }
    }

    pub fn render_beams(&self, link: &CameraLink, painter: &mut dyn BeaconPainter) {
        self.beam_renderer
            .render(&self.beacons, link, &self.world, self.config.config(), painter);
    }

    pub fn render_labels(&mut self, link: &CameraLink, host: LabelHost<'_>) {
        if std::mem::take(&mut self.labels_stale) {
            self.label_renderer.invalidate(host.rasterizer);
        }
        self.label_renderer
            .render(&self.beacons, link, &self.world, self.config.config(), host);
    }

    pub fn on_server_message(&mut self, message: ServerMessage, host: &mut ClientHost<'_>) {
        match message {
            ServerMessage::OverridesSync(sync) => {
                ClientSync::apply_sync(&sync, &mut self.overrides);
                self.refilter(host);
            }
        }
    }

    /// For hosts whose channel carries bytes. Bad payloads are logged and dropped.
    pub fn on_server_payload(&mut self, payload: &[u8], host: &mut ClientHost<'_>) {
        match decode::<ServerMessage>(payload) {
            Ok(message) => self.on_server_message(message, host),
            Err(e) => {
                warn!(?e, len = payload.len(), "dropping malformed server message");
            }
        }
    }

    /// Turns the beacon of `marker` on or off. Returns false if the marker has no position.
    pub fn set_beacon(&mut self, marker: &Marker, on: bool, host: &mut ClientHost<'_>) -> bool {
        if !self.apply_override(marker, on, host.channel) {
            return false;
        }
        self.refilter(host);
        true
    }

    /// Like [Self::set_beacon], with a marker id as shown in the marker manager
    pub fn set_beacon_by_id(&mut self, id: i32, on: bool, host: &mut ClientHost<'_>) -> bool {
        let markers = match host.layer.markers() {
            Ok(markers) => markers,
            Err(e) => {
                warn!(?e, id, "failed to list markers");
                return false;
            }
        };
        match markers.iter().find(|m| resolve_numeric_id(m) == id) {
            Some(marker) => self.set_beacon(marker, on, host),
            None => {
                warn!(id, "no marker with this id");
                false
            }
        }
    }

    /// Returns how many markers were changed
    pub fn set_all_beacons(&mut self, on: bool, host: &mut ClientHost<'_>) -> usize {
        let markers = match host.layer.markers() {
            Ok(markers) => markers,
            Err(e) => {
                warn!(?e, "failed to list markers");
                return 0;
            }
        };
        let changed = markers
            .iter()
            .filter(|marker| self.apply_override(marker, on, host.channel))
            .count();
        info!(changed, on, "set all beacons");
        self.refilter(host);
        changed
    }

    fn apply_override(&mut self, marker: &Marker, on: bool, channel: &mut dyn ClientChannel) -> bool {
        let (Some(key), Some(message)) = (StableKey::of_marker(marker), SetOverride::for_marker(marker, on))
        else {
            debug!(?marker, "marker has no position. can't set its beacon");
            return false;
        };
        self.overrides.set(key.clone(), on);
        self.filter.mark_seen(key);
        self.sync.send_override(message, channel);
        true
    }

    /// Rows for a marker manager ui, filtered by a case insensitive title search.
    pub fn marker_rows(&mut self, search: &str, host: &mut ClientHost<'_>) -> Vec<MarkerRow> {
        let markers = match host.layer.markers() {
            Ok(markers) => markers,
            Err(e) => {
                warn!(?e, "failed to list markers");
                return vec![];
            }
        };
        let (rows, seeded) = self
            .filter
            .rows(&markers, search, self.config.config(), &mut self.overrides);
        for message in seeded {
            self.sync.send_override(message, host.channel);
        }
        rows
    }

    /// Asks the host to create a marker, then applies `beacon_on` to it once it shows up in the marker list.
    pub fn create_marker(
        &mut self,
        marker: &NewMarker,
        beacon_on: bool,
        host: &mut ClientHost<'_>,
    ) -> Result<(), HostError> {
        let _ = self.config.set_last_add_beacon_choice(beacon_on);
        let before = host.layer.markers().unwrap_or_else(|e| {
            warn!(?e, "failed to list markers before creating one");
            vec![]
        });
        host.layer.create_marker(marker)?;
        self.creations
            .push(CreationWatch::new(&before, beacon_on, self.now));
        Ok(())
    }

    fn poll_creations(&mut self, host: &mut ClientHost<'_>) {
        let now = self.now;
        if !self.creations.iter().any(|watch| watch.is_due(now)) {
            return;
        }
        let markers = match host.layer.markers() {
            Ok(markers) => markers,
            Err(e) => {
                warn!(?e, "failed to list markers while waiting for a created marker");
                return;
            }
        };
        let mut found = vec![];
        self.creations.retain_mut(|watch| {
            if !watch.is_due(now) {
                return true;
            }
            match watch.poll(&markers, now) {
                CreationStatus::Pending => true,
                CreationStatus::Found { marker, .. } => {
                    found.push((marker, watch.beacon_on()));
                    false
                }
                CreationStatus::GaveUp => false,
            }
        });
        for (marker, on) in found {
            self.apply_override(&marker, on, host.channel);
            self.refilter_requested = true;
        }
    }

    /// initial state of the beacon toggle in the add marker dialog
    pub fn add_dialog_beacon_choice(&self) -> bool {
        self.config.config().add_dialog_beacon_choice()
    }

    fn apply_effect(&mut self, effect: SettingEffect) {
        if effect.refilter {
            self.refilter_requested = true;
        }
        if effect.invalidate_labels {
            self.labels_stale = true;
        }
    }

    pub fn toggle_global_beacons(&mut self) {
        let effect = self.config.toggle_global_beacons();
        info!(enabled = self.config.config().global_beacons_enabled, "toggled beacons");
        self.apply_effect(effect);
    }
    pub fn set_global_beacons_enabled(&mut self, enabled: bool) {
        let effect = self.config.set_global_beacons_enabled(enabled);
        self.apply_effect(effect);
    }
    pub fn set_beams_enabled(&mut self, enabled: bool) {
        let effect = self.config.set_beams_enabled(enabled);
        self.apply_effect(effect);
    }
    pub fn set_near_fade_enabled(&mut self, enabled: bool) {
        let effect = self.config.set_near_fade_enabled(enabled);
        self.apply_effect(effect);
    }
    pub fn set_near_fade_distances(&mut self, start: f32, end: f32) {
        let effect = self.config.set_near_fade_distances(start, end);
        self.apply_effect(effect);
    }
    pub fn set_show_icons_in_labels(&mut self, show: bool) {
        let effect = self.config.set_show_icons_in_labels(show);
        self.apply_effect(effect);
    }
    pub fn set_label_visibility(&mut self, visibility: LabelVisibility) {
        let effect = self.config.set_label_visibility(visibility);
        self.apply_effect(effect);
    }
    pub fn set_label_style(&mut self, style: LabelStyle) {
        let effect = self.config.set_label_style(style);
        self.apply_effect(effect);
    }
    pub fn set_label_font_size(&mut self, slider: u8) {
        let effect = self.config.set_label_font_size(slider);
        self.apply_effect(effect);
    }
    pub fn set_max_render_distance(&mut self, blocks: i32) {
        let effect = self.config.set_max_render_distance(blocks);
        self.apply_effect(effect);
    }
    pub fn set_max_render_distance_xz(&mut self, blocks: i32) {
        let effect = self.config.set_max_render_distance_xz(blocks);
        self.apply_effect(effect);
    }
    pub fn set_default_new_marker_beacon_on(&mut self, on: bool) {
        let effect = self.config.set_default_new_marker_beacon_on(on);
        self.apply_effect(effect);
    }
    pub fn set_auto_hide_pitch_gain(&mut self, gain: f64) {
        let effect = self.config.set_auto_hide_pitch_gain(gain);
        self.apply_effect(effect);
    }

    /// Releases label textures and writes the config one last time.
    pub fn shutdown(&mut self, rasterizer: &mut dyn TextRasterizer) {
        self.label_renderer.invalidate(rasterizer);
        if let Err(e) = self.config.save() {
            error!(?e, "failed to save client config on shutdown");
        }
        info!("waypoint beacon client stopped");
    }
}
