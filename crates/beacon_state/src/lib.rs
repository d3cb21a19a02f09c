//! Beacon state for waypoint markers.
//!
//! Markers are identified by a [StableKey] derived from their rounded position and title,
//! since engine ids are missing or unreliable on some host versions.
//! The [OverrideStore] maps those keys to "beacon enabled", and is the single source of truth for what renders.
//! It is kept in sync with the server through the messages in [protocol], and the server persists it per player
//! with the codec in [persist].
//! Every refresh interval the [VisibilityFilter] turns the host marker list into the list of [BeaconInfo]s
//! that the renderers draw.

pub mod config;
pub mod creation;
mod error;
pub mod filter;
pub mod identity;
pub mod overrides;
pub mod persist;
pub mod protocol;

pub use config::{ClientConfig, ConfigStore, LabelStyle, LabelVisibility, SettingEffect};
pub use error::{ConfigError, SyncError};
pub use creation::{CreationStatus, CreationWatch};
pub use filter::{BeaconInfo, FilterPass, MarkerRow, VisibilityFilter};
pub use identity::{resolve_numeric_id, stable_key, StableKey};
pub use overrides::OverrideStore;
pub use protocol::{ClientChannel, ClientMessage, ClientSync, OverridesSync, ServerChannel, ServerMessage, SetOverride};
