//! Per frame drawing of beacons.
//!
//! [BeamRenderer] draws the light column of every visible beacon in the world pass,
//! and [LabelRenderer] draws the name labels in the overlay pass.
//! Both only read the snapshot that the visibility filter produced, and hand the actual drawing to the host
//! through [beacon_link::BeaconPainter].

pub mod beam;
pub mod fade;
pub mod label;
pub mod projection;

pub use beam::BeamRenderer;
pub use fade::NearFade;
pub use label::LabelRenderer;
