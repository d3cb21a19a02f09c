use crate::HostError;

/// Identifies a connected player on the server side
pub type PlayerId = String;

/// Per player string attributes which the host saves with the player record.
pub trait PlayerAttributes {
    fn get_string(&self, player: &PlayerId, key: &str) -> Option<String>;
    fn set_string(&mut self, player: &PlayerId, key: &str, value: String) -> Result<(), HostError>;
}
