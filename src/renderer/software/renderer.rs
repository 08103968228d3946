use log::{error, trace};
use smallvec::SmallVec;

use crate::{
    renderer::{
        FrameStats, Pixel, RenderConfig, RenderError, Renderer, check_resolution,
        software::{
            cache::LevelCache,
            lighting::LightEnv,
            planes::FlatRegions,
            projection::Projection,
            sectors::{DrawnWall, RenderContext},
            walls::WallSegment,
            window::WindowStack,
        },
    },
    world::{Camera, Level, SectorId, TextureBank},
};

/// Palette index the frame is cleared to.
const CLEAR_COLOR: Pixel = 0;

/// Portal renderer writing 8-bit palette indices.
pub struct Software {
    pub(super) config: RenderConfig,
    pub(super) light_env: LightEnv,
    pub(super) scratch: Vec<Pixel>,
    pub(super) width: usize,
    pub(super) height: usize,

    pub(super) proj: Projection,
    pub(super) cache: LevelCache,
    pub(super) windows: WindowStack,
    /// Open rows left by the wall drawn in each column of the current sector.
    pub(super) column_top: Vec<i32>,
    pub(super) column_bot: Vec<i32>,
    pub(super) flats: FlatRegions,

    pub(super) seg_input: Vec<WallSegment>,
    pub(super) merged: Vec<WallSegment>,
    /// Merged segments of every sector visited this frame.
    pub(super) seg_arena: Vec<WallSegment>,
    pub(super) segs_used: usize,

    /// State of the sector being drawn, saved/restored around adjoins.
    pub(super) ctx: RenderContext,
    pub(super) saved: SmallVec<[RenderContext; 16]>,

    pub(super) drawn: Vec<DrawnWall>,
    /// Rows already owned by nearer bridges, per column.
    pub(super) bridge_rows: Vec<(i32, i32)>,
    pub(super) stats: FrameStats,
    pub(super) frame: u64,
}

impl Default for Software {
    fn default() -> Self {
        Self::with_config(RenderConfig::default())
    }
}

impl Software {
    pub fn new(config: RenderConfig) -> Result<Self, RenderError> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    fn with_config(config: RenderConfig) -> Self {
        Self {
            light_env: LightEnv {
                world_ambient: config.world_ambient,
                camera_light: config.camera_light,
            },
            config,
            scratch: Vec::new(),
            width: 0,
            height: 0,
            proj: Projection::default(),
            cache: LevelCache::default(),
            windows: WindowStack::default(),
            column_top: Vec::new(),
            column_bot: Vec::new(),
            flats: FlatRegions::default(),
            seg_input: Vec::new(),
            merged: Vec::new(),
            seg_arena: Vec::new(),
            segs_used: 0,
            ctx: RenderContext::default(),
            saved: SmallVec::new(),
            drawn: Vec::new(),
            bridge_rows: Vec::new(),
            stats: FrameStats::default(),
            frame: 0,
        }
    }

    #[inline]
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Toggle the headlamp between frames.
    pub fn set_camera_light(&mut self, on: bool) {
        self.config.camera_light = on;
        self.light_env.camera_light = on;
    }

    pub fn set_world_ambient(&mut self, ambient: i32) {
        self.config.world_ambient = ambient;
        self.light_env.world_ambient = ambient;
    }

    #[inline]
    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Segments drawn this frame, in drawing order.
    #[inline]
    pub fn drawn_walls(&self) -> &[DrawnWall] {
        &self.drawn
    }

    #[inline]
    pub fn framebuffer(&self) -> &[Pixel] {
        &self.scratch
    }

    #[inline]
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Nearest opaque depth per column recorded at recursion depth `depth`.
    pub fn depth1d(&self, depth: usize) -> &[f32] {
        self.windows.depth1d(depth)
    }

    pub fn windows(&self) -> &WindowStack {
        &self.windows
    }

    /// Resize scratch buffers; the frame content is undefined afterwards.
    pub fn resize(&mut self, width: usize, height: usize) -> Result<(), RenderError> {
        check_resolution(width, height)?;
        if width != self.width || height != self.height {
            self.width = width;
            self.height = height;
            self.config.width = width;
            self.config.height = height;
            self.scratch.resize(width * height, CLEAR_COLOR);
            self.column_top.resize(width, 0);
            self.column_bot.resize(width, 0);
            self.bridge_rows.resize(width, (1, 0));
            self.flats.resize(width);
        }
        Ok(())
    }

    /// Draw the view from `camera`, starting the portal walk in `sector`.
    pub fn draw_from(
        &mut self,
        level: &mut Level,
        camera: &Camera,
        sector: SectorId,
        bank: &TextureBank,
    ) -> Result<(), RenderError> {
        if level.sector(sector).is_none() {
            return Err(RenderError::MissingSector(sector));
        }
        if self.width == 0 {
            return Err(RenderError::BadResolution { width: 0, height: 0 });
        }
        self.cache.refresh(level);
        let level: &Level = level;
        self.proj.setup(
            self.width,
            self.height,
            self.config.aspect_correct,
            camera,
            level.sky_parallax,
        );

        self.saved.clear();
        self.draw_sector(level, bank, sector, 0, 0, self.width as i32 - 1);
        trace!("frame {}: {:?}", self.frame, self.stats);
        Ok(())
    }
}

/*──────────────────────── Renderer trait impl ────────────────────────*/
impl Renderer for Software {
    fn begin_frame(&mut self, w: usize, h: usize) {
        if let Err(e) = self.resize(w, h) {
            error!("begin_frame: {e}");
        }
        self.scratch.fill(CLEAR_COLOR);
        self.windows
            .reset(self.width, self.height, self.config.limits.max_adjoin_depth);
        self.stats.reset();
        self.drawn.clear();
        self.seg_arena.clear();
        self.segs_used = 0;
        self.frame += 1;
    }

    fn draw_level(&mut self, level: &mut Level, camera: &Camera, bank: &TextureBank) {
        let Some(start) = level.sector_at(camera.pos.truncate()) else {
            self.stats.camera_outside();
            return;
        };
        if let Err(e) = self.draw_from(level, camera, start, bank) {
            error!("draw_level: {e}");
        }
    }

    fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Pixel) {
        let mut x0 = x0;
        let mut y0 = y0;
        let dx = (x1 - x0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let dy = -(y1 - y0).abs();
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            if (0..self.width as i32).contains(&x0) && (0..self.height as i32).contains(&y0) {
                self.scratch[y0 as usize * self.width + x0 as usize] = color;
            }
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    fn end_frame<F>(&mut self, submit: F)
    where
        F: FnOnce(&[Pixel], usize, usize),
    {
        submit(&self.scratch, self.width, self.height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::{RenderLimits, software::test_util::*};
    use glam::vec3;

    #[test]
    fn bad_resolution_is_rejected() {
        let cfg = RenderConfig {
            width: 0,
            ..RenderConfig::default()
        };
        assert!(matches!(Software::new(cfg), Err(RenderError::BadResolution { .. })));
        let mut sw = Software::default();
        assert!(sw.resize(5000, 10).is_err());
    }

    #[test]
    fn draw_line_clips_to_frame() {
        let mut sw = Software::default();
        sw.begin_frame(8, 8);
        sw.draw_line(-4, -4, 20, 20, 5);
        let fb = sw.framebuffer();
        for i in 0..8 {
            assert_eq!(fb[i * 8 + i], 5, "diagonal pixel {i} missing");
        }
        assert_eq!(fb.iter().filter(|&&p| p == 5).count(), 8);
    }

    #[test]
    fn end_frame_hands_out_the_buffer() {
        let (mut level, bank) = room_level(40.0, 0.0, 10.0, 31);
        let mut sw = Software::default();
        sw.begin_frame(32, 24);
        let cam = camera(vec3(5.0, 5.0, 5.0), 45.0, 120.0);
        sw.draw_level(&mut level, &cam, &bank);
        let mut seen = None;
        sw.end_frame(|fb, w, h| seen = Some((fb.len(), w, h)));
        assert_eq!(seen, Some((32 * 24, 32, 24)));
    }

    #[test]
    fn camera_outside_draws_nothing() {
        let (mut level, bank) = room_level(40.0, 0.0, 10.0, 31);
        let mut sw = Software::default();
        sw.begin_frame(32, 24);
        let cam = camera(vec3(-50.0, 5.0, 5.0), 0.0, 90.0);
        sw.draw_level(&mut level, &cam, &bank);
        assert_eq!(sw.stats().sectors_drawn, 0);
        assert!(sw.framebuffer().iter().all(|&p| p == CLEAR_COLOR));
    }

    #[test]
    fn missing_sector_is_an_error() {
        let (mut level, bank) = room_level(40.0, 0.0, 10.0, 31);
        let mut sw = Software::default();
        sw.begin_frame(32, 24);
        let cam = camera(vec3(5.0, 5.0, 5.0), 0.0, 90.0);
        assert_eq!(
            sw.draw_from(&mut level, &cam, 9, &bank),
            Err(RenderError::MissingSector(9))
        );
    }

    #[test]
    fn segment_pool_exhaustion_degrades() {
        let (mut level, bank) = room_level(40.0, 0.0, 10.0, 31);
        let cfg = RenderConfig {
            limits: RenderLimits {
                max_wall_segs: 1,
                ..RenderLimits::default()
            },
            ..RenderConfig::default()
        };
        let mut sw = Software::new(cfg).unwrap();
        sw.begin_frame(64, 48);
        let cam = camera(vec3(5.0, 5.0, 5.0), 45.0, 120.0);
        sw.draw_level(&mut level, &cam, &bank);
        assert_eq!(sw.drawn_walls().len(), 1);
        assert!(sw.stats().dropped_segments >= 1);
    }
}
