//! Waypoint beacons: light beams and labels for the player's map markers.
//!
//! The host creates one [BeaconClient] per client session and one [BeaconServer] per world,
//! forwards its network messages to them, and calls their tick and render callbacks.

mod client;
mod server;

pub use client::{BeaconClient, ClientHost};
pub use server::BeaconServer;

pub use beacon_link as link;
pub use beacon_render as render;
pub use beacon_state as state;

use std::sync::Arc;

use beacon_core::{
    init::get_beacon_dir,
    prelude::*,
    trace::{install_miette_panic_hooks, install_tracing},
};
use beacon_link::WorldInfo;
use beacon_state::ConfigStore;
use tracing_appender::non_blocking::WorkerGuard;

/// Sets up the data dir, logging and the panic hooks, then creates the client with the saved config.
///
/// The guard flushes the log file when dropped. Keep it until the client is shut down.
pub fn start_client(world: WorldInfo) -> Result<(BeaconClient, WorkerGuard)> {
    let dir = get_beacon_dir().wrap_err("failed to get waypoint beacon dir")?;
    let guard = install_tracing(&dir).wrap_err("failed to install tracing")?;
    if let Err(e) = install_miette_panic_hooks() {
        error!(?e, "failed to install panic hooks");
    }
    let config = ConfigStore::load(Arc::new(dir));
    Ok((BeaconClient::new(config, world), guard))
}

#[cfg(test)]
mod test;
