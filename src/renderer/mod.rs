//! Rendering abstraction layer.
//!
//! *The rest of the engine never touches a pixel buffer directly.*
//! It hands a [`Level`] and a [`Camera`] to a type implementing [`Renderer`]
//! and receives an 8-bit paletted frame back through `end_frame`.
//!
//! * [`RenderConfig`] / [`RenderLimits`] hold resolution, lighting switches
//!   and every fixed pool capacity of the software back-end.
//! * [`FrameStats`] counts what happened during the last frame; resource
//!   exhaustion is logged at most once per frame per category.

use bitflags::bitflags;
use log::{error, warn};
use thiserror::Error;

use crate::world::{Camera, Level, SectorId, TextureBank};

/// One palette index per pixel.
pub type Pixel = u8;

/// Largest supported framebuffer side, in pixels.
pub const MAX_RESOLUTION: usize = 4096;

/// Depth of adjoin recursion before traversal stops following portals.
pub const MAX_ADJOIN_DEPTH: usize = 40;

#[derive(Debug, Error, PartialEq)]
pub enum RenderError {
    #[error("unsupported resolution {width}x{height}")]
    BadResolution { width: usize, height: usize },

    #[error("sector {0} does not exist in this level")]
    MissingSector(SectorId),
}

/// Fixed capacities of the per-frame pools.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderLimits {
    /// Wall segments produced by `wall_process` over the whole frame.
    pub max_wall_segs: usize,
    /// Visible segments kept per sector after merge/sort.
    pub max_sector_segs: usize,
    /// Extra pieces created by splitting during merge/sort (per sector).
    pub max_split_walls: usize,
    /// Adjoin openings recorded per sector visit.
    pub max_adjoin_segs: usize,
    pub max_adjoin_depth: usize,
}

impl Default for RenderLimits {
    fn default() -> Self {
        Self {
            max_wall_segs: 2048,
            max_sector_segs: 384,
            max_split_walls: 256,
            max_adjoin_segs: 64,
            max_adjoin_depth: MAX_ADJOIN_DEPTH,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderConfig {
    pub width: usize,
    pub height: usize,
    /// Stretch vertically so non-square pixel modes (320×200) look 4:3.
    pub aspect_correct: bool,
    /// Darkness offset of the camera light; `MAX_LIGHT_LEVEL` switches it off.
    pub world_ambient: i32,
    /// Camera-attached light source (headlamp).
    pub camera_light: bool,
    pub limits: RenderLimits,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 200,
            aspect_correct: false,
            world_ambient: software::MAX_LIGHT_LEVEL,
            camera_light: false,
            limits: RenderLimits::default(),
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> Result<(), RenderError> {
        check_resolution(self.width, self.height)
    }
}

pub fn check_resolution(width: usize, height: usize) -> Result<(), RenderError> {
    if width == 0 || height == 0 || width > MAX_RESOLUTION || height > MAX_RESOLUTION {
        return Err(RenderError::BadResolution { width, height });
    }
    Ok(())
}

/*──────────────────────────── statistics ─────────────────────────────*/

bitflags! {
    /// Exhaustion categories already reported this frame.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    struct Reported: u8 {
        const SEGMENTS = 0x01;
        const MERGED   = 0x02;
        const SPLITS   = 0x04;
        const ADJOINS  = 0x08;
        const DEPTH    = 0x10;
        const NO_SECTOR = 0x20;
    }
}

/// Counters for one frame; reset by `begin_frame`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameStats {
    pub sectors_drawn: usize,
    pub walls_processed: usize,
    pub walls_culled: usize,
    pub segments_drawn: usize,
    pub adjoins_followed: usize,
    pub max_depth: usize,
    pub dropped_segments: usize,
    pub dropped_splits: usize,
    pub dropped_adjoins: usize,
    pub depth_limit_hits: usize,
    reported: Reported,
}

impl FrameStats {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// First report of `kind` this frame?
    fn latch(&mut self, kind: Reported) -> bool {
        let first = !self.reported.contains(kind);
        self.reported.insert(kind);
        first
    }

    pub(crate) fn segment_pool_exhausted(&mut self, cap: usize) {
        self.dropped_segments += 1;
        if self.latch(Reported::SEGMENTS) {
            error!("wall segment pool exhausted ({cap}); dropping walls this frame");
        }
    }

    pub(crate) fn merged_pool_exhausted(&mut self, cap: usize) {
        self.dropped_segments += 1;
        if self.latch(Reported::MERGED) {
            error!("merged segment list full ({cap}); dropping visible spans");
        }
    }

    pub(crate) fn split_pool_exhausted(&mut self, cap: usize) {
        self.dropped_splits += 1;
        if self.latch(Reported::SPLITS) {
            error!("split wall pool exhausted ({cap}); clipping overlapped walls");
        }
    }

    pub(crate) fn adjoin_pool_exhausted(&mut self, cap: usize) {
        self.dropped_adjoins += 1;
        if self.latch(Reported::ADJOINS) {
            error!("too many adjoin openings in one sector ({cap}); skipping the rest");
        }
    }

    pub(crate) fn depth_limit_reached(&mut self, depth: usize) {
        self.depth_limit_hits += 1;
        if self.latch(Reported::DEPTH) {
            warn!("adjoin depth limit {depth} reached; portal left unfilled");
        }
    }

    pub(crate) fn camera_outside(&mut self) {
        if self.latch(Reported::NO_SECTOR) {
            warn!("camera is not inside any sector; nothing drawn");
        }
    }
}

/*──────────────────────────── trait ──────────────────────────────────*/

/// A renderer that owns an internal scratch buffer for the whole frame.
///
/// `end_frame` hands the finished buffer to a user-supplied closure.
pub trait Renderer {
    /// (Re)allocate internal scratch for the requested resolution and clear it.
    fn begin_frame(&mut self, width: usize, height: usize);

    /// Draw everything visible from `camera`.
    ///
    /// Takes the level mutably only to consume its dirty flags.
    fn draw_level(&mut self, level: &mut Level, camera: &Camera, bank: &TextureBank);

    /// Overlay line in palette colour `color`, clipped to the frame.
    fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Pixel);

    /// Finish the frame and **loan** the finished buffer to `submit`.
    ///
    /// * `submit(&[Pixel], w, h)` is run exactly once per frame.
    fn end_frame<F>(&mut self, submit: F)
    where
        F: FnOnce(&[Pixel], usize, usize);
}

pub mod software;

pub use software::{DrawnWall, EdgePair, Software, WallKind};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_bounds() {
        assert!(check_resolution(320, 200).is_ok());
        assert_eq!(
            check_resolution(0, 200),
            Err(RenderError::BadResolution { width: 0, height: 200 })
        );
        assert!(check_resolution(MAX_RESOLUTION + 1, 10).is_err());
    }

    #[test]
    fn exhaustion_counts_every_drop_but_latches() {
        let mut stats = FrameStats::default();
        stats.segment_pool_exhausted(4);
        stats.segment_pool_exhausted(4);
        assert_eq!(stats.dropped_segments, 2);
        assert!(!stats.latch(Reported::SEGMENTS), "second report must be latched");
        stats.reset();
        assert!(stats.latch(Reported::SEGMENTS), "reset clears the latch");
    }
}
