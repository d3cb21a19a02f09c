use enumflags2::{bitflags, BitFlags};
use glam::DVec3;
use tracing::{debug, info};

use crate::HostError;

/// A host owned point of interest.
///
/// Every field is optional because older host versions don't expose all of them.
/// The adapter fills in whatever it could find and leaves the rest as `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Marker {
    pub position: Option<DVec3>,
    pub title: Option<String>,
    /// icon code like `circle` or `home`
    pub icon: Option<String>,
    /// packed ARGB
    pub color: Option<i32>,
    /// engine id. some versions always report 0, which is treated the same as missing.
    pub native_id: Option<i32>,
    /// the host's own "pinned" flag. unrelated to beacon state.
    pub pinned: Option<bool>,
}

impl Marker {
    /// title used for identity. missing titles are the empty string.
    pub fn title_or_empty(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }
}

/// Marker data handed to the host creation api
#[derive(Debug, Clone, PartialEq)]
pub struct NewMarker {
    pub position: DVec3,
    pub title: String,
    pub icon: String,
    pub color: i32,
    pub pinned: bool,
}

/// These flags represent what a [MapLayerAccessor] can do on the running host version
#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCapability {
    /// can list the player's markers
    ListMarkers,
    /// can create new markers
    CreateMarker,
    /// markers carry a native numeric id
    NativeIds,
    /// markers expose the host "pinned" flag
    PinnedFlag,
}

/// Reads the host marker layer.
/// One implementation per supported host version.
pub trait MapLayerAccessor {
    /// used in logs
    fn name(&self) -> &str;
    fn capabilities(&self) -> BitFlags<HostCapability>;
    /// The current marker list of the local player.
    fn markers(&self) -> Result<Vec<Marker>, HostError>;
    /// Best effort. The host may add the marker to its list a few ticks later.
    fn create_marker(&mut self, marker: &NewMarker) -> Result<(), HostError>;
}

/// Picks the first accessor that provides all of the `required` capabilities.
pub fn probe_accessor(
    candidates: Vec<Box<dyn MapLayerAccessor>>,
    required: BitFlags<HostCapability>,
) -> Result<Box<dyn MapLayerAccessor>, HostError> {
    for candidate in candidates {
        let caps = candidate.capabilities();
        if caps.contains(required) {
            info!(accessor = candidate.name(), ?caps, "selected marker layer accessor");
            return Ok(candidate);
        }
        debug!(
            accessor = candidate.name(),
            ?caps,
            missing = ?(required & !caps),
            "skipping marker layer accessor"
        );
    }
    Err(HostError::NoCompatibleAccessor(format!("{required:?}")))
}
