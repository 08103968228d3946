use glam::Vec2;
use log::debug;
use smallvec::SmallVec;

use crate::{
    renderer::software::projection::{Projection, TEXELS_PER_UNIT},
    world::{Level, Sector, SectorDirty, SectorFlags, SectorId, WallFlags},
};

/// Surface layers of a wall, indexing `WallCached::anchors`/`offsets`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layer {
    Top = 0,
    Mid = 1,
    Bot = 2,
    Sign = 3,
}

/// Renderer-side wall data that does not depend on the view.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WallCached {
    pub dir: Vec2,
    pub len: f32,
    pub texel_len: f32,
    /// Neighbour floor/ceiling; equal to our own for solid walls.
    pub next_floor: f32,
    pub next_ceil: f32,
    /// Visible heights in texels of the upper strip, the middle span (whole
    /// wall or opening) and the lower strip.
    pub top_texel_h: f32,
    pub mid_texel_h: f32,
    pub bot_texel_h: f32,
    /// World height where texel row 0 sits, per layer (sign excluded).
    pub anchors: [f32; 3],
    /// Texel offsets per layer, sign included.
    pub offsets: [Vec2; 4],
    /// Result of the last `wall_process`.
    pub visible: bool,
}

impl WallCached {
    #[inline]
    pub fn anchor(&self, layer: Layer) -> f32 {
        self.anchors[(layer as usize).min(2)]
    }

    #[inline]
    pub fn offset(&self, layer: Layer) -> Vec2 {
        self.offsets[layer as usize]
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SectorCached {
    pub floor_height: f32,
    pub ceil_height: f32,
    pub ambient: i32,
    pub flags: SectorFlags,
    pub walls: Vec<WallCached>,
    /// Polygon vertices in view space, valid for `view_frame`.
    pub view_verts: Vec<Vec2>,
    /// Object positions in view space, valid for `view_frame`.
    pub obj_view: Vec<Vec2>,
    pub view_frame: u64,
}

/// One `SectorCached` per level sector, refreshed from the dirty flags.
#[derive(Debug, Default)]
pub struct LevelCache {
    pub sectors: Vec<SectorCached>,
}

impl LevelCache {
    #[inline]
    pub fn sector(&self, id: SectorId) -> Option<&SectorCached> {
        self.sectors.get(id as usize)
    }

    /// Bring the cache in line with `level` and clear its dirty flags.
    pub fn refresh(&mut self, level: &mut Level) {
        if self.sectors.len() != level.sectors.len() {
            debug!(
                "rebuilding sector cache: {} -> {} sectors",
                self.sectors.len(),
                level.sectors.len()
            );
            self.sectors = vec![SectorCached::default(); level.sectors.len()];
            for s in &mut level.sectors {
                s.dirty = SectorDirty::ALL;
            }
        }

        // strip heights depend on both sides of an adjoin
        let moved: SmallVec<[usize; 16]> = level
            .sectors
            .iter()
            .enumerate()
            .filter(|(_, s)| s.dirty.contains(SectorDirty::HEIGHTS))
            .map(|(i, _)| i)
            .collect();
        for i in moved {
            let next: SmallVec<[SectorId; 8]> =
                level.sectors[i].walls.iter().filter_map(|w| w.adjoin).collect();
            for n in next {
                if let Some(s) = level.sectors.get_mut(n as usize) {
                    s.dirty.insert(SectorDirty::HEIGHTS);
                }
            }
        }

        for i in 0..level.sectors.len() {
            let dirty = level.sectors[i].dirty;
            if !dirty.is_empty() {
                refresh_sector(&mut self.sectors[i], &level.sectors[i], level, dirty);
            }
        }
        for s in &mut level.sectors {
            s.dirty = SectorDirty::empty();
        }
    }

    /// Transform a sector's vertices and objects into view space, once per frame.
    pub fn transform(&mut self, id: SectorId, level: &Level, proj: &Projection, frame: u64) {
        let (Some(cached), Some(src)) = (self.sectors.get_mut(id as usize), level.sector(id)) else {
            return;
        };
        if cached.view_frame == frame {
            return;
        }
        cached.view_frame = frame;
        cached.view_verts.clear();
        cached
            .view_verts
            .extend(src.vertices.iter().map(|&v| proj.to_view(v)));
        cached.obj_view.clear();
        cached
            .obj_view
            .extend(src.objects.iter().map(|o| proj.to_view(o.pos.truncate())));
    }
}

fn refresh_sector(cached: &mut SectorCached, src: &Sector, level: &Level, mut dirty: SectorDirty) {
    if cached.walls.len() != src.walls.len() {
        cached.walls = vec![WallCached::default(); src.walls.len()];
        dirty = SectorDirty::ALL;
    }
    if dirty.intersects(SectorDirty::VERTICES | SectorDirty::WALL_SHAPE) {
        cached.view_frame = 0;
        for (c, w) in cached.walls.iter_mut().zip(&src.walls) {
            let (a, b) = src.wall_points(w);
            let d = b - a;
            c.len = d.length();
            c.dir = d.normalize_or_zero();
            c.texel_len = c.len * TEXELS_PER_UNIT;
        }
    }
    if dirty.contains(SectorDirty::HEIGHTS) {
        cached.floor_height = src.floor_height;
        cached.ceil_height = src.ceil_height;
        for (c, w) in cached.walls.iter_mut().zip(&src.walls) {
            refresh_heights(c, src, w.adjoin.and_then(|a| level.sector(a)), w.flags);
        }
    }
    if dirty.contains(SectorDirty::WALL_OFFSETS) {
        for (c, w) in cached.walls.iter_mut().zip(&src.walls) {
            c.offsets = [w.top.offset, w.mid.offset, w.bot.offset, w.sign.offset];
        }
    }
    if dirty.contains(SectorDirty::AMBIENT) {
        cached.ambient = src.ambient;
    }
    if dirty.contains(SectorDirty::FLAGS) {
        cached.flags = src.flags;
    }
}

fn refresh_heights(c: &mut WallCached, own: &Sector, next: Option<&Sector>, flags: WallFlags) {
    let (f, ceil) = (own.floor_height, own.ceil_height);
    let anchored = flags.contains(WallFlags::TEX_ANCHORED);
    match next {
        None => {
            c.next_floor = f;
            c.next_ceil = ceil;
            c.top_texel_h = 0.0;
            c.bot_texel_h = 0.0;
            c.mid_texel_h = (ceil - f) * TEXELS_PER_UNIT;
            c.anchors = [ceil, ceil, f];
        }
        Some(n) => {
            c.next_floor = n.floor_height;
            c.next_ceil = n.ceil_height;
            let top_lo = n.ceil_height.max(f);
            let bot_hi = n.floor_height.min(ceil);
            c.top_texel_h = (ceil - top_lo).max(0.0) * TEXELS_PER_UNIT;
            c.bot_texel_h = (bot_hi - f).max(0.0) * TEXELS_PER_UNIT;
            let gap_top = ceil.min(n.ceil_height);
            let gap_bot = f.max(n.floor_height);
            c.mid_texel_h = (gap_top - gap_bot).max(0.0) * TEXELS_PER_UNIT;
            c.anchors = [
                if anchored { n.ceil_height } else { ceil },
                gap_top,
                if anchored { ceil } else { n.floor_height },
            ];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Camera, LevelBuilder};
    use glam::{vec2, vec3};

    fn two_rooms() -> Level {
        let mut b = LevelBuilder::new("T");
        b.add_sector(
            &[vec2(0.0, 0.0), vec2(10.0, 0.0), vec2(10.0, 10.0), vec2(0.0, 10.0)],
            0.0,
            10.0,
        )
        .unwrap();
        b.add_sector(
            &[vec2(10.0, 0.0), vec2(20.0, 0.0), vec2(20.0, 10.0), vec2(10.0, 10.0)],
            2.0,
            8.0,
        )
        .unwrap();
        b.build().unwrap()
    }

    fn portal_of(level: &Level, s: usize) -> usize {
        level.sectors[s]
            .walls
            .iter()
            .position(|w| w.adjoin.is_some())
            .unwrap()
    }

    #[test]
    fn refresh_builds_everything_and_clears_flags() {
        let mut level = two_rooms();
        let mut cache = LevelCache::default();
        cache.refresh(&mut level);

        assert_eq!(cache.sectors.len(), 2);
        assert!(level.sectors.iter().all(|s| s.dirty.is_empty()));
        let w = &cache.sectors[0].walls[portal_of(&level, 0)];
        assert_eq!(w.len, 10.0);
        assert_eq!(w.texel_len, 80.0);
        assert_eq!(w.top_texel_h, 2.0 * TEXELS_PER_UNIT);
        assert_eq!(w.bot_texel_h, 2.0 * TEXELS_PER_UNIT);
        assert_eq!(w.mid_texel_h, 6.0 * TEXELS_PER_UNIT);
    }

    #[test]
    fn height_change_reaches_the_neighbour() {
        let mut level = two_rooms();
        let mut cache = LevelCache::default();
        cache.refresh(&mut level);

        level.sectors[1].set_heights(4.0, 8.0);
        cache.refresh(&mut level);
        let w = &cache.sectors[0].walls[portal_of(&level, 0)];
        assert_eq!(w.bot_texel_h, 4.0 * TEXELS_PER_UNIT, "neighbour strip not refreshed");
        assert_eq!(w.next_floor, 4.0);
    }

    #[test]
    fn untouched_fields_survive_partial_refresh() {
        let mut level = two_rooms();
        let mut cache = LevelCache::default();
        cache.refresh(&mut level);

        level.sectors[0].set_ambient(7);
        // bypass the setter for heights: no dirty flag, so no refresh
        level.sectors[0].floor_height = -50.0;
        cache.refresh(&mut level);
        assert_eq!(cache.sectors[0].ambient, 7);
        assert_eq!(cache.sectors[0].floor_height, 0.0);
    }

    #[test]
    fn sector_count_change_recreates() {
        let mut level = two_rooms();
        let mut cache = LevelCache::default();
        cache.refresh(&mut level);
        level.sectors.pop();
        level.sectors[0].walls.iter_mut().for_each(|w| {
            w.adjoin = None;
            w.mirror = None;
        });
        cache.refresh(&mut level);
        assert_eq!(cache.sectors.len(), 1);
        assert_eq!(cache.sectors[0].walls[0].top_texel_h, 0.0);
    }

    #[test]
    fn transform_runs_once_per_frame() {
        let mut level = two_rooms();
        let mut cache = LevelCache::default();
        cache.refresh(&mut level);

        let cam = Camera::new(vec3(5.0, 5.0, 5.0), 0.0, 1.5);
        let mut proj = Projection::default();
        proj.setup(64, 48, false, &cam, Vec2::splat(1024.0));
        cache.transform(0, &level, &proj, 1);
        let first = cache.sectors[0].view_verts.clone();

        let moved = Camera::new(vec3(6.0, 5.0, 5.0), 0.0, 1.5);
        proj.setup(64, 48, false, &moved, Vec2::splat(1024.0));
        cache.transform(0, &level, &proj, 1);
        assert_eq!(cache.sectors[0].view_verts, first, "same frame must not retransform");
        cache.transform(0, &level, &proj, 2);
        assert_ne!(cache.sectors[0].view_verts, first);
    }
}
