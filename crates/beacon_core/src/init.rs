use cap_std::{ambient_authority, fs_utf8::camino::Utf8PathBuf, fs_utf8::Dir};
use miette::{Context, IntoDiagnostic, Result};

/// Name of the env variable that overrides the data directory
pub const DATA_DIR_ENV: &str = "WAYPOINT_BEACON_DATA_DIR";

/// Waypoint beacon data directory.
/// We will read a path from env `WAYPOINT_BEACON_DATA_DIR` or create a folder at data_local_dir/waypoint_beacon, where data_local_dir is platform specific.
/// The client config and the log file live inside this directory.
pub fn get_beacon_dir() -> Result<Dir> {
    let authoratah = ambient_authority();
    let dir = if let Ok(env_dir) = std::env::var(DATA_DIR_ENV) {
        let path = Utf8PathBuf::from(env_dir);
        Dir::create_ambient_dir_all(&path, authoratah)
            .into_diagnostic()
            .wrap_err(path.clone())
            .wrap_err("failed to create waypoint beacon directory")?;
        Dir::open_ambient_dir(&path, authoratah)
            .into_diagnostic()
            .wrap_err(path)
            .wrap_err("failed to open waypoint beacon data dir")?
    } else {
        let dir = cap_directories::ProjectDirs::from("com.waypointbeacon", "", "waypoint_beacon", authoratah)
            .ok_or(miette::miette!(
                "getting project dirs failed for some reason"
            ))?
            .data_local_dir()
            .into_diagnostic()
            .wrap_err("failed to get data local dir using capstd")?;
        Dir::from_cap_std(dir)
    };
    Ok(dir)
}
