//! ---------------------------------------------------------------------------
//! Portal ("adjoin") software renderer
//!
//! * Fills an 8-bit paletted frame-buffer, one screen column at a time.
//! * Visibility is exact without a depth buffer: walls of a sector are
//!   clipped and merged into disjoint column spans, adjoins recurse with a
//!   narrowed per-column window.
//! * A 1-D per-column depth array per recursion depth occludes objects.
//! ---------------------------------------------------------------------------

mod automap;
mod cache;
mod columns;
mod lighting;
mod merge;
mod planes;
mod projection;
mod renderer;
mod sectors;
mod sprites;
mod walls;
mod window;

pub use automap::{ADJOIN_COLOR, CAMERA_COLOR, SOLID_WALL_COLOR};
pub use cache::{LevelCache, SectorCached, WallCached};
pub use columns::{FRAC_BITS, Fixed};
pub use lighting::{LIGHT_SOURCE_LEVELS, LightEnv, MAX_LIGHT_LEVEL, compute_lighting, light_level};
pub use merge::merge_sort;
pub use projection::{NEAR_PLANE, Projection, TEXELS_PER_UNIT};
pub use renderer::Software;
pub use sectors::{DrawnWall, SkyStrips, WallKind};
pub use walls::{EdgePair, Orientation, WallSegment, wall_process};
pub use window::WindowStack;

#[cfg(test)]
pub(crate) mod test_util;
