use once_cell::sync::Lazy;

use crate::world::Colormap;

/// Brightest light level; sectors at or above it skip the colormap.
pub const MAX_LIGHT_LEVEL: i32 = 31;

/// Entries in the camera light falloff table.
pub const LIGHT_SOURCE_LEVELS: usize = 128;

/// Darkness added by the camera light at a scaled distance; 0 at the eye,
/// `MAX_LIGHT_LEVEL` from index 62 on.
static LIGHT_SOURCE_RAMP: Lazy<[i32; LIGHT_SOURCE_LEVELS]> = Lazy::new(|| {
    let mut ramp = [0; LIGHT_SOURCE_LEVELS];
    for (i, r) in ramp.iter_mut().enumerate() {
        *r = (i as i32 / 2).min(MAX_LIGHT_LEVEL);
    }
    ramp
});

/// Frame-wide lighting switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LightEnv {
    /// Darkness offset of the camera light; `MAX_LIGHT_LEVEL` = no camera light.
    pub world_ambient: i32,
    /// Headlamp: full-strength camera light whatever the world ambient.
    pub camera_light: bool,
}

impl Default for LightEnv {
    fn default() -> Self {
        Self {
            world_ambient: MAX_LIGHT_LEVEL,
            camera_light: false,
        }
    }
}

/// Light level for a surface at view depth `depth`, or `None` when the
/// sector is fully lit and texels go out unmodified.
pub fn light_level(depth: f32, bias: i32, sector_ambient: i32, env: &LightEnv) -> Option<i32> {
    if sector_ambient >= MAX_LIGHT_LEVEL {
        return None;
    }
    let ambient = sector_ambient.max(0);
    let depth = depth.max(0.0) as i32;

    let mut light = 0;
    if env.world_ambient < MAX_LIGHT_LEVEL || env.camera_light {
        let offset = if env.camera_light { 0 } else { env.world_ambient.max(0) };
        let idx = (depth.saturating_mul(4) as usize).min(LIGHT_SOURCE_LEVELS - 1);
        let source = MAX_LIGHT_LEVEL - (LIGHT_SOURCE_RAMP[idx] + offset);
        if source > 0 {
            light += source;
        }
    }
    light = light.max(ambient);

    let floor = (ambient >> 1) + (ambient >> 2) + (ambient >> 3);
    light -= (depth >> 4) + (depth >> 5);
    light = light.max(floor);

    Some((light + bias).clamp(0, MAX_LIGHT_LEVEL))
}

/// Colormap row to shade a surface with, `None` = draw raw texels.
#[inline]
pub fn compute_lighting<'a>(
    depth: f32,
    bias: i32,
    sector_ambient: i32,
    env: &LightEnv,
    colormap: &'a Colormap,
) -> Option<&'a [u8; 256]> {
    let level = light_level(depth, bias, sector_ambient, env)? as usize;
    colormap.0.get(level.min(colormap.levels().saturating_sub(1)))
}
