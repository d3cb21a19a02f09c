use glam::{DMat4, DVec3, IVec3, UVec2};

/// Snapshot of the host camera and player for one frame.
///
/// The host fills this in once per frame (or once per tick for the visibility filter).
/// Positions are world coordinates in blocks.
#[derive(Clone, Debug)]
pub struct CameraLink {
    /// camera position
    pub cam_pos: DVec3,
    /// player entity position. differs from `cam_pos` in third person
    pub player_pos: DVec3,
    /// raw pitch as reported by the host. see [CameraLink::pitch_up]
    pub pitch: f64,
    /// world -> view transform
    pub view: DMat4,
    /// view -> clip transform
    pub projection: DMat4,
    /// framebuffer size in pixels
    pub viewport: UVec2,
    /// gui scale factor of the host ui
    pub gui_scale: f64,
}

impl Default for CameraLink {
    fn default() -> Self {
        Self {
            cam_pos: DVec3::ZERO,
            player_pos: DVec3::ZERO,
            pitch: 0.0,
            view: DMat4::IDENTITY,
            projection: DMat4::IDENTITY,
            viewport: UVec2::new(1920, 1080),
            gui_scale: 1.0,
        }
    }
}

impl CameraLink {
    /// Camera pitch in radians, positive when looking up, within `[-PI/2, PI/2]`.
    ///
    /// Hosts report pitch positive-down, and some versions report degrees instead of radians.
    /// Anything with magnitude above `1.1 * PI` can't be radians, so it is converted.
    pub fn pitch_up(&self) -> f64 {
        use std::f64::consts::PI;
        let mut pitch = self.pitch;
        if pitch.abs() > PI * 1.1 {
            pitch = pitch.to_radians();
        }
        let mut up = -pitch;
        if up > PI {
            up -= PI * 2.0;
        }
        if up < -PI {
            up += PI * 2.0;
        }
        if up > PI / 2.0 {
            up -= PI;
        }
        if up < -PI / 2.0 {
            up += PI;
        }
        up
    }

    pub fn viewport_center(&self) -> glam::DVec2 {
        self.viewport.as_dvec2() / 2.0
    }

    /// planar (XZ) distance from the player. Y is ignored
    pub fn planar_distance_to(&self, pos: DVec3) -> f64 {
        let dx = pos.x - self.player_pos.x;
        let dz = pos.z - self.player_pos.z;
        (dx * dx + dz * dz).sqrt()
    }
}

/// Static data about the loaded world
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorldInfo {
    /// world size in blocks as reported by the host
    pub map_size: IVec3,
    pub seed: i64,
}

impl Default for WorldInfo {
    fn default() -> Self {
        Self {
            map_size: IVec3::new(1_024_000, 256, 1_024_000),
            seed: 0,
        }
    }
}

impl WorldInfo {
    /// World height in blocks.
    /// Some host versions report the height in chunks (32 blocks each). Nonsense values fall back to 256.
    pub fn height_blocks(&self) -> i32 {
        let mut y = self.map_size.y;
        if y > 0 && y <= 64 {
            y *= 32;
        }
        if y < 128 {
            y = 256;
        }
        y
    }

    /// Coordinates as shown to players, relative to the map center on X and Z.
    pub fn display_coordinates(&self, pos: glam::DVec3) -> IVec3 {
        let half_x = self.map_size.x / 2;
        let half_z = self.map_size.z / 2;
        IVec3::new(
            pos.x.floor() as i32 - half_x,
            pos.y.floor() as i32,
            pos.z.floor() as i32 - half_z,
        )
    }
}
