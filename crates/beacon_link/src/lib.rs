//! The narrow boundary between the beacon engine and the host game.
//!
//! Everything the engine needs from the host goes through the types in this crate:
//! the marker layer (read and create markers), the camera snapshot of the current frame,
//! the draw primitives, text rasterization, the icon atlas and the per player attribute store.
//! Host versions differ in which of those they can provide, so each supported version gets its own
//! [MapLayerAccessor] implementation and [probe_accessor] picks one at startup.

mod camera;
mod draw;
mod error;
mod marker;
mod player;

pub use camera::*;
/// accessors report their [HostCapability]s as flags
pub use enumflags2::BitFlags;
pub use draw::*;
pub use error::HostError;
pub use marker::*;
pub use player::*;
