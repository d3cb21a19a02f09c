use std::{collections::HashMap, sync::Arc};

use beacon_core::prelude::Dir;
use beacon_link::{
    BeaconPainter, BitFlags, CameraLink, HostCapability, HostError, HostTexture, IconAtlas, MapLayerAccessor,
    Marker, NewMarker, PlayerAttributes, PlayerId, TextRasterizer, TextStyle, TextureId, WorldInfo,
};
use beacon_render::label::LabelHost;
use beacon_state::{
    protocol::encode, stable_key, ClientChannel, ClientConfig, ClientMessage, ConfigStore, LabelStyle,
    LabelVisibility, OverridesSync, ServerChannel, ServerMessage, SetOverride, SyncError,
};
use glam::{DMat4, DVec3, IVec3, UVec2, Vec2, Vec3, Vec4};
use rstest::*;
use similar_asserts::assert_eq;

use crate::{BeaconClient, BeaconServer, ClientHost};

/// marker layer whose created markers only show up after [FakeLayer::land_created]
#[derive(Default)]
struct FakeLayer {
    markers: Vec<Marker>,
    created: Vec<Marker>,
}
impl FakeLayer {
    fn with(markers: Vec<Marker>) -> Self {
        Self {
            markers,
            created: vec![],
        }
    }
    fn land_created(&mut self) {
        self.markers.append(&mut self.created);
    }
}
impl MapLayerAccessor for FakeLayer {
    fn name(&self) -> &str {
        "fake"
    }
    fn capabilities(&self) -> BitFlags<HostCapability> {
        HostCapability::ListMarkers | HostCapability::CreateMarker
    }
    fn markers(&self) -> Result<Vec<Marker>, HostError> {
        Ok(self.markers.clone())
    }
    fn create_marker(&mut self, marker: &NewMarker) -> Result<(), HostError> {
        self.created.push(Marker {
            position: Some(marker.position),
            title: Some(marker.title.clone()),
            icon: Some(marker.icon.clone()),
            color: Some(marker.color),
            native_id: None,
            pinned: Some(marker.pinned),
        });
        Ok(())
    }
}

#[derive(Default)]
struct ClientWire {
    connected: bool,
    sent: Vec<ClientMessage>,
}
impl ClientChannel for ClientWire {
    fn is_connected(&self) -> bool {
        self.connected
    }
    fn send(&mut self, message: ClientMessage) -> Result<(), SyncError> {
        if !self.connected {
            return Err(SyncError::NotConnected);
        }
        self.sent.push(message);
        Ok(())
    }
}

#[derive(Default)]
struct ServerWire {
    sent: Vec<(PlayerId, ServerMessage)>,
}
impl ServerChannel for ServerWire {
    fn send_to(&mut self, player: &PlayerId, message: ServerMessage) -> Result<(), SyncError> {
        self.sent.push((player.clone(), message));
        Ok(())
    }
}

#[derive(Default)]
struct MemoryAttributes {
    values: HashMap<(PlayerId, String), String>,
    fail_writes: bool,
}
impl PlayerAttributes for MemoryAttributes {
    fn get_string(&self, player: &PlayerId, key: &str) -> Option<String> {
        self.values.get(&(player.clone(), key.to_owned())).cloned()
    }
    fn set_string(&mut self, player: &PlayerId, key: &str, value: String) -> Result<(), HostError> {
        if self.fail_writes {
            return Err(HostError::AttributeWrite { key: key.to_owned() });
        }
        self.values.insert((player.clone(), key.to_owned()), value);
        Ok(())
    }
}

#[derive(Default)]
struct Raster {
    next_id: u64,
    released: Vec<u64>,
}
impl Raster {
    fn live(&self) -> usize {
        self.next_id as usize - self.released.len()
    }
}
impl TextRasterizer for Raster {
    fn base_font_px(&self) -> Option<f32> {
        Some(20.0)
    }
    fn rasterize(&mut self, text: &str, style: &TextStyle) -> Result<HostTexture, HostError> {
        self.next_id += 1;
        Ok(HostTexture {
            id: self.next_id,
            width: text.len() as f32 * style.font_px * 0.5,
            height: style.font_px,
        })
    }
    fn release(&mut self, texture: HostTexture) {
        self.released.push(texture.id);
    }
}

struct NoIcons;
impl IconAtlas for NoIcons {
    fn icon(&self, _: &str) -> Option<HostTexture> {
        None
    }
}

#[derive(Default)]
struct Painter {
    lines: usize,
    quads: usize,
}
impl BeaconPainter for Painter {
    fn draw_line(&mut self, _: IVec3, _: Vec3, _: Vec3, _: u32) {
        self.lines += 1;
    }
    fn draw_texture(&mut self, _: TextureId, _: Vec2, _: Vec2, _: Vec4) {
        self.quads += 1;
    }
}

fn marker(x: f64, z: f64, title: &str) -> Marker {
    Marker {
        position: Some(DVec3::new(x, 64.0, z)),
        title: Some(title.into()),
        ..Default::default()
    }
}

/// player at `pos`, looking along +Z
fn camera(pos: DVec3) -> CameraLink {
    let eye = pos + DVec3::Y * 1.6;
    CameraLink {
        cam_pos: eye,
        player_pos: pos,
        pitch: 0.0,
        view: DMat4::look_at_rh(eye, eye + DVec3::Z, DVec3::Y),
        projection: DMat4::perspective_rh_gl(70f64.to_radians(), 16.0 / 9.0, 0.1, 2000.0),
        viewport: UVec2::new(1600, 900),
        gui_scale: 1.0,
    }
}

fn client() -> BeaconClient {
    BeaconClient::new(ConfigStore::in_memory(ClientConfig::default()), WorldInfo::default())
}

fn host<'a>(layer: &'a mut FakeLayer, wire: &'a mut ClientWire, link: &'a CameraLink) -> ClientHost<'a> {
    ClientHost {
        layer,
        channel: wire,
        link,
    }
}

const PLAYER: &str = "player-1";

/// delivers everything the client sent to the server, and the replies back
fn relay(
    client: &mut BeaconClient,
    server: &mut BeaconServer,
    attributes: &mut MemoryAttributes,
    layer: &mut FakeLayer,
    wire: &mut ClientWire,
    link: &CameraLink,
) {
    let player = PLAYER.to_owned();
    let mut server_wire = ServerWire::default();
    for message in std::mem::take(&mut wire.sent) {
        server.handle_client_message(&player, message, attributes, &mut server_wire);
    }
    for (to, message) in server_wire.sent {
        assert_eq!(to, player);
        client.on_server_message(message, &mut host(layer, wire, link));
    }
}

#[rstest]
fn seeded_override_waits_for_connection() {
    let mut client = client();
    let mut layer = FakeLayer::with(vec![marker(10.0, 30.0, "A")]);
    let mut wire = ClientWire::default();
    let link = camera(DVec3::new(0.0, 64.0, 0.0));

    client.tick(0.0, &mut host(&mut layer, &mut wire, &link));
    assert!(client.beacons().is_empty());

    layer.markers.push(marker(20.0, 40.0, "B"));
    client.tick(0.25, &mut host(&mut layer, &mut wire, &link));
    assert_eq!(client.beacons().len(), 1);
    assert_eq!(client.beacons()[0].name, "B");
    let b = SetOverride::for_marker(&marker(20.0, 40.0, "B"), true).unwrap();
    assert_eq!(client.deferred_overrides().cloned().collect::<Vec<_>>(), vec![b.clone()]);
    assert!(wire.sent.is_empty());

    wire.connected = true;
    client.tick(0.3, &mut host(&mut layer, &mut wire, &link));
    assert_eq!(wire.sent, vec![ClientMessage::SetOverride(b.clone())]);
    client.tick(0.8, &mut host(&mut layer, &mut wire, &link));
    assert_eq!(
        wire.sent,
        vec![ClientMessage::SetOverride(b), ClientMessage::RequestOverrides]
    );
}

#[rstest]
fn sync_replaces_store_and_refilters() {
    let mut client = client();
    let mut layer = FakeLayer::with(vec![marker(10.0, 30.0, "A"), marker(5.0, 5.0, "B")]);
    let mut wire = ClientWire::default();
    let link = camera(DVec3::new(0.0, 64.0, 0.0));
    client.tick(0.0, &mut host(&mut layer, &mut wire, &link));
    client.set_beacon(&marker(5.0, 5.0, "B"), true, &mut host(&mut layer, &mut wire, &link));
    assert_eq!(client.beacons().len(), 1);

    let sync = OverridesSync {
        keys: vec!["10,64,30|A".into()],
        enabled: vec![true],
    };
    client.on_server_message(
        ServerMessage::OverridesSync(sync),
        &mut host(&mut layer, &mut wire, &link),
    );
    assert_eq!(client.beacons().len(), 1);
    assert_eq!(client.beacons()[0].name, "A");
    assert!(!client.overrides().get(&stable_key(5.0, 64.0, 5.0, "B")));
}

#[rstest]
fn overrides_survive_a_new_session() {
    let mut server = BeaconServer::new(42);
    let mut attributes = MemoryAttributes::default();
    let mut layer = FakeLayer::with(vec![marker(10.0, 30.0, "A")]);
    let link = camera(DVec3::new(0.0, 64.0, 0.0));

    let mut first = client();
    let mut wire = ClientWire {
        connected: true,
        ..Default::default()
    };
    first.tick(0.0, &mut host(&mut layer, &mut wire, &link));
    assert!(first.set_beacon(&marker(10.0, 30.0, "A"), true, &mut host(&mut layer, &mut wire, &link)));
    relay(&mut first, &mut server, &mut attributes, &mut layer, &mut wire, &link);
    assert_eq!(
        attributes.get_string(&PLAYER.to_owned(), &server.attribute_key()),
        Some("10,64,30|A\t1\n".to_owned())
    );
    assert!(first.overrides().get(&stable_key(10.0, 64.0, 30.0, "A")));

    let mut second = client();
    let mut wire = ClientWire {
        connected: true,
        ..Default::default()
    };
    second.tick(0.0, &mut host(&mut layer, &mut wire, &link));
    assert!(second.beacons().is_empty());
    second.tick(0.5, &mut host(&mut layer, &mut wire, &link));
    assert_eq!(wire.sent, vec![ClientMessage::RequestOverrides]);
    relay(&mut second, &mut server, &mut attributes, &mut layer, &mut wire, &link);
    assert_eq!(second.beacons().len(), 1);
}

#[rstest]
fn join_push_waits_for_delay() {
    let mut server = BeaconServer::new(1);
    let mut attributes = MemoryAttributes::default();
    let mut out = ServerWire::default();
    let player = PLAYER.to_owned();
    server.on_player_join(&player, 1.0);
    server.tick(1.01, &mut attributes, &mut out);
    assert!(out.sent.is_empty());
    server.tick(1.1, &mut attributes, &mut out);
    assert_eq!(
        out.sent,
        vec![(player.clone(), ServerMessage::OverridesSync(OverridesSync::default()))]
    );
    server.tick(2.0, &mut attributes, &mut out);
    assert_eq!(out.sent.len(), 1);

    server.on_player_join(&player, 3.0);
    server.on_player_leave(&player);
    server.tick(4.0, &mut attributes, &mut out);
    assert_eq!(out.sent.len(), 1);
}

#[rstest]
fn server_drops_bad_payloads() {
    let mut server = BeaconServer::new(1);
    let mut attributes = MemoryAttributes::default();
    let mut out = ServerWire::default();
    let player = PLAYER.to_owned();
    server.handle_client_payload(&player, b"\xffnot json", &mut attributes, &mut out);
    assert!(out.sent.is_empty());

    let request = serde_json::to_vec(&serde_json::json!({ "type": "RequestOverrides" })).unwrap();
    server.handle_client_payload(&player, &request, &mut attributes, &mut out);
    assert_eq!(out.sent.len(), 1);

    let set = encode(&ClientMessage::SetOverride(
        SetOverride::for_marker(&marker(1.0, 2.0, "X"), true).unwrap(),
    ))
    .unwrap();
    server.handle_client_payload(&player, &set, &mut attributes, &mut out);
    assert_eq!(
        out.sent.last().map(|(_, m)| m.clone()),
        Some(ServerMessage::OverridesSync(OverridesSync {
            keys: vec!["1,64,2|X".into()],
            enabled: vec![true],
        }))
    );
}

#[rstest]
fn overrides_are_per_world() {
    let mut attributes = MemoryAttributes::default();
    let mut out = ServerWire::default();
    let player = PLAYER.to_owned();
    let set = SetOverride::for_marker(&marker(1.0, 2.0, "X"), true).unwrap();
    BeaconServer::new(42).handle_client_message(
        &player,
        ClientMessage::SetOverride(set),
        &mut attributes,
        &mut out,
    );
    assert_eq!(BeaconServer::new(42).load_overrides(&player, &attributes).len(), 1);
    assert!(BeaconServer::new(7).load_overrides(&player, &attributes).is_empty());
}

#[rstest]
fn failed_write_still_replies() {
    let mut attributes = MemoryAttributes {
        fail_writes: true,
        ..Default::default()
    };
    let mut out = ServerWire::default();
    let set = SetOverride::for_marker(&marker(1.0, 2.0, "X"), true).unwrap();
    BeaconServer::new(1).handle_client_message(
        &PLAYER.to_owned(),
        ClientMessage::SetOverride(set),
        &mut attributes,
        &mut out,
    );
    assert_eq!(out.sent.len(), 1);
    assert!(attributes.values.is_empty());
}

#[rstest]
fn created_marker_gets_chosen_beacon() {
    let mut client = client();
    let mut layer = FakeLayer::with(vec![marker(10.0, 30.0, "A")]);
    let mut wire = ClientWire::default();
    let link = camera(DVec3::new(0.0, 64.0, 0.0));
    client.tick(0.0, &mut host(&mut layer, &mut wire, &link));

    let new = NewMarker {
        position: DVec3::new(50.0, 64.0, 50.0),
        title: "Fresh".into(),
        icon: "circle".into(),
        color: -1,
        pinned: false,
    };
    client
        .create_marker(&new, false, &mut host(&mut layer, &mut wire, &link))
        .unwrap();
    assert!(!client.add_dialog_beacon_choice());
    client.tick(0.01, &mut host(&mut layer, &mut wire, &link));
    assert_eq!(client.pending_creations(), 1);

    layer.land_created();
    client.tick(0.05, &mut host(&mut layer, &mut wire, &link));
    assert_eq!(client.pending_creations(), 0);
    let key = stable_key(50.0, 64.0, 50.0, "Fresh");
    // explicit choice wins over the default for new markers
    assert!(client.overrides().contains(&key));
    assert!(!client.overrides().get(&key));
    assert!(client.beacons().is_empty());
    assert_eq!(
        client.deferred_overrides().map(|s| s.enabled).collect::<Vec<_>>(),
        vec![false]
    );
}

#[rstest]
fn creation_watch_gives_up() {
    let mut client = client();
    let mut layer = FakeLayer::default();
    let mut wire = ClientWire::default();
    let link = camera(DVec3::ZERO);
    let new = NewMarker {
        position: DVec3::new(1.0, 64.0, 1.0),
        title: "Lost".into(),
        icon: String::new(),
        color: -1,
        pinned: false,
    };
    client
        .create_marker(&new, true, &mut host(&mut layer, &mut wire, &link))
        .unwrap();
    // the host never adds it
    layer.created.clear();
    for i in 0..100 {
        client.tick(i as f64 * 0.02, &mut host(&mut layer, &mut wire, &link));
    }
    assert_eq!(client.pending_creations(), 0);
    assert!(client.overrides().is_empty());
}

#[rstest]
fn bulk_and_id_toggles() {
    let mut client = client();
    let mut layer = FakeLayer::with(vec![
        Marker {
            native_id: Some(5),
            ..marker(10.0, 30.0, "A")
        },
        marker(20.0, 40.0, "B"),
        Marker {
            title: Some("nowhere".into()),
            ..Default::default()
        },
    ]);
    let mut wire = ClientWire::default();
    let link = camera(DVec3::new(0.0, 64.0, 0.0));
    client.tick(0.0, &mut host(&mut layer, &mut wire, &link));

    assert!(client.set_beacon_by_id(5, true, &mut host(&mut layer, &mut wire, &link)));
    assert!(!client.set_beacon_by_id(999, true, &mut host(&mut layer, &mut wire, &link)));
    assert_eq!(client.beacons().len(), 1);

    assert_eq!(client.set_all_beacons(true, &mut host(&mut layer, &mut wire, &link)), 2);
    assert_eq!(client.beacons().len(), 2);

    let rows = client.marker_rows("", &mut host(&mut layer, &mut wire, &link));
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row.beacon_on));
    assert_eq!(rows[0].id, 5);
    let rows = client.marker_rows("b", &mut host(&mut layer, &mut wire, &link));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "B");
}

#[rstest]
fn global_toggle_clears_snapshot_on_next_tick() {
    let mut client = client();
    let mut layer = FakeLayer::with(vec![marker(10.0, 30.0, "A")]);
    let mut wire = ClientWire::default();
    let link = camera(DVec3::new(0.0, 64.0, 0.0));
    client.tick(0.0, &mut host(&mut layer, &mut wire, &link));
    client.set_beacon(&marker(10.0, 30.0, "A"), true, &mut host(&mut layer, &mut wire, &link));
    assert_eq!(client.beacons().len(), 1);

    client.toggle_global_beacons();
    client.tick(0.05, &mut host(&mut layer, &mut wire, &link));
    assert!(client.beacons().is_empty());
    client.toggle_global_beacons();
    client.tick(0.1, &mut host(&mut layer, &mut wire, &link));
    assert_eq!(client.beacons().len(), 1);
}

#[rstest]
fn font_change_drops_label_textures() {
    let mut client = BeaconClient::new(
        ConfigStore::in_memory(ClientConfig {
            label_visibility: LabelVisibility::Always,
            label_style: LabelStyle::NameOnly,
            ..Default::default()
        }),
        WorldInfo::default(),
    );
    let mut layer = FakeLayer::with(vec![marker(0.0, 50.0, "A")]);
    let mut wire = ClientWire::default();
    let link = camera(DVec3::new(0.0, 64.0, 0.0));
    client.tick(0.0, &mut host(&mut layer, &mut wire, &link));
    client.set_beacon(&marker(0.0, 50.0, "A"), true, &mut host(&mut layer, &mut wire, &link));

    let mut raster = Raster::default();
    let mut painter = Painter::default();
    let draw = |client: &mut BeaconClient, raster: &mut Raster, painter: &mut Painter| {
        client.render_labels(
            &link,
            LabelHost {
                rasterizer: raster,
                icons: &NoIcons,
                painter,
            },
        )
    };
    draw(&mut client, &mut raster, &mut painter);
    draw(&mut client, &mut raster, &mut painter);
    assert_eq!(raster.next_id, 2);
    assert!(painter.quads > 0);

    client.set_label_font_size(10);
    draw(&mut client, &mut raster, &mut painter);
    let mut released = raster.released.clone();
    released.sort();
    assert_eq!(released, vec![1, 2]);
    assert_eq!(raster.live(), 2);

    client.shutdown(&mut raster);
    assert_eq!(raster.live(), 0);
}

#[rstest]
fn beams_follow_snapshot() {
    let mut client = client();
    let mut layer = FakeLayer::with(vec![marker(10.0, 30.0, "A"), marker(20.0, 40.0, "B")]);
    let mut wire = ClientWire::default();
    let link = camera(DVec3::new(0.0, 64.0, 0.0));
    client.tick(0.0, &mut host(&mut layer, &mut wire, &link));
    client.set_beacon(&marker(10.0, 30.0, "A"), true, &mut host(&mut layer, &mut wire, &link));

    let mut painter = Painter::default();
    client.render_beams(&link, &mut painter);
    assert_eq!(painter.lines, 11);

    client.set_beams_enabled(false);
    let mut painter = Painter::default();
    client.render_beams(&link, &mut painter);
    assert_eq!(painter.lines, 0);
}

#[rstest]
fn client_drops_bad_payloads() {
    let mut client = client();
    let mut layer = FakeLayer::with(vec![marker(10.0, 30.0, "A")]);
    let mut wire = ClientWire::default();
    let link = camera(DVec3::new(0.0, 64.0, 0.0));
    client.tick(0.0, &mut host(&mut layer, &mut wire, &link));
    client.on_server_payload(b"{}", &mut host(&mut layer, &mut wire, &link));
    assert_eq!(client.overrides().len(), 1);

    let payload = encode(&ServerMessage::OverridesSync(OverridesSync {
        keys: vec!["10,64,30|A".into()],
        enabled: vec![true],
    }))
    .unwrap();
    client.on_server_payload(&payload, &mut host(&mut layer, &mut wire, &link));
    assert_eq!(client.beacons().len(), 1);
}

#[rstest]
fn dirty_config_is_saved_on_tick() {
    let path = std::env::temp_dir().join(format!("waypoint_beacon_client_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&path);
    std::fs::create_dir_all(&path).unwrap();
    let dir = Arc::new(Dir::open_ambient_dir(path.to_str().unwrap(), cap_std::ambient_authority()).unwrap());

    let mut client = BeaconClient::new(ConfigStore::load(dir.clone()), WorldInfo::default());
    let mut layer = FakeLayer::default();
    let mut wire = ClientWire::default();
    let link = camera(DVec3::ZERO);
    client.set_label_style(LabelStyle::NameCoordinates);
    client.set_max_render_distance_xz(300);
    assert!(!dir.exists(ConfigStore::CONFIG_FILE_NAME));
    client.tick(0.0, &mut host(&mut layer, &mut wire, &link));

    let reloaded = ConfigStore::load(dir);
    assert_eq!(reloaded.config().label_style, LabelStyle::NameCoordinates);
    assert_eq!(reloaded.config().max_render_distance_xz, 300);
}
