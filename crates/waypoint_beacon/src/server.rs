use beacon_link::{PlayerAttributes, PlayerId};
use beacon_state::{
    persist::{overrides_attribute_key, parse_override_map, serialize_override_map},
    protocol::decode,
    ClientMessage, OverridesSync, ServerChannel, ServerMessage, SetOverride, StableKey, SyncError,
};
use indexmap::IndexMap;
use tracing::{debug, info, warn};

/// Server side of waypoint beacons.
///
/// Keeps every player's overrides in a player attribute, namespaced by the world seed.
/// Handlers never fail, errors are logged and the message is dropped.
#[derive(Debug)]
pub struct BeaconServer {
    world_seed: i64,
    /// players that joined, and when their overrides should be pushed
    pending_joins: Vec<(PlayerId, f64)>,
}

impl BeaconServer {
    /// seconds after a join before the full override set is pushed
    pub const JOIN_PUSH_DELAY: f64 = 0.05;

    pub fn new(world_seed: i64) -> Self {
        info!(world_seed, "starting waypoint beacon server");
        Self {
            world_seed,
            pending_joins: vec![],
        }
    }

    pub fn attribute_key(&self) -> String {
        overrides_attribute_key(self.world_seed)
    }

    /// The saved overrides of `player`. Missing or garbled attributes give an empty map.
    pub fn load_overrides(&self, player: &PlayerId, attributes: &dyn PlayerAttributes) -> IndexMap<StableKey, bool> {
        attributes
            .get_string(player, &self.attribute_key())
            .map(|raw| parse_override_map(&raw))
            .unwrap_or_default()
    }

    pub fn handle_client_message(
        &mut self,
        player: &PlayerId,
        message: ClientMessage,
        attributes: &mut dyn PlayerAttributes,
        channel: &mut dyn ServerChannel,
    ) {
        let result = match message {
            ClientMessage::RequestOverrides => self.push_overrides(player, attributes, channel),
            ClientMessage::SetOverride(set) => self.merge_override(player, set, attributes, channel),
        };
        if let Err(e) = result {
            warn!(?e, %player, "failed to handle beacon message");
        }
    }

    pub fn handle_client_payload(
        &mut self,
        player: &PlayerId,
        payload: &[u8],
        attributes: &mut dyn PlayerAttributes,
        channel: &mut dyn ServerChannel,
    ) {
        match decode::<ClientMessage>(payload) {
            Ok(message) => self.handle_client_message(player, message, attributes, channel),
            Err(e) => {
                warn!(?e, %player, "dropping malformed beacon message");
            }
        }
    }

    pub fn on_player_join(&mut self, player: &PlayerId, timestamp: f64) {
        self.pending_joins
            .push((player.clone(), timestamp + Self::JOIN_PUSH_DELAY));
    }

    pub fn on_player_leave(&mut self, player: &PlayerId) {
        self.pending_joins.retain(|(p, _)| p != player);
    }

    /// Pushes overrides to players whose join delay ran out
    pub fn tick(&mut self, timestamp: f64, attributes: &mut dyn PlayerAttributes, channel: &mut dyn ServerChannel) {
        let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending_joins)
            .into_iter()
            .partition(|(_, at)| *at <= timestamp);
        self.pending_joins = waiting;
        for (player, _) in due {
            if let Err(e) = self.push_overrides(&player, attributes, channel) {
                warn!(?e, %player, "failed to push beacon overrides after join");
            }
        }
    }

    fn push_overrides(
        &self,
        player: &PlayerId,
        attributes: &dyn PlayerAttributes,
        channel: &mut dyn ServerChannel,
    ) -> Result<(), SyncError> {
        let overrides = self.load_overrides(player, attributes);
        debug!(%player, count = overrides.len(), "sending beacon overrides");
        channel.send_to(
            player,
            ServerMessage::OverridesSync(OverridesSync::from_entries(&overrides)),
        )
    }

    fn merge_override(
        &self,
        player: &PlayerId,
        set: SetOverride,
        attributes: &mut dyn PlayerAttributes,
        channel: &mut dyn ServerChannel,
    ) -> Result<(), SyncError> {
        let mut overrides = self.load_overrides(player, attributes);
        let key = set.key();
        debug!(%player, %key, enabled = set.enabled, marker_id = set.marker_id, "beacon override");
        overrides.insert(key, set.enabled);
        let serialized = serialize_override_map(overrides.iter().map(|(k, v)| (k, *v)));
        if let Err(e) = attributes.set_string(player, &self.attribute_key(), serialized) {
            // the client still gets the merged set, it just won't survive a restart
            warn!(?e, %player, "failed to save beacon overrides");
        }
        channel.send_to(
            player,
            ServerMessage::OverridesSync(OverridesSync::from_entries(&overrides)),
        )
    }
}
