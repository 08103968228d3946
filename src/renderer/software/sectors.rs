//! Sector traversal.
//!
//! One call per sector visited: transform, clip and merge its walls, draw
//! them column by column while recording the gaps left open by adjoins,
//! fill the flats, then follow every opening one depth deeper.

use bitflags::bitflags;
use glam::Vec2;
use smallvec::SmallVec;

use crate::{
    renderer::software::{
        Software,
        cache::{Layer, WallCached},
        columns::{TexColumn, draw_column, draw_sky_column},
        lighting::compute_lighting,
        merge::merge_sort,
        planes::Plane,
        projection::Projection,
        walls::{EdgePair, WallSegment, wall_process},
    },
    world::{Level, Sector, SectorFlags, SectorId, Texture, TextureBank, WallFlags, WallId},
};

/// Drawer selected for one merged segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WallKind {
    /// No adjoin: one opaque quad from ceiling to floor.
    Solid,
    /// Adjoin whose neighbour ceiling is lower than ours.
    Top,
    /// Adjoin whose neighbour floor is higher than ours.
    Bottom,
    TopAndBottom,
    /// Adjoin without strips; at most a see-through mid texture.
    Mask,
}

bitflags! {
    /// Strips of an adjoin drawn as sky instead of their texture.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct SkyStrips: u8 {
        const TOP    = 0x01;
        const BOTTOM = 0x02;
    }
}

/// One merged segment as it was drawn this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawnWall {
    pub sector: SectorId,
    pub wall: WallId,
    pub depth: usize,
    pub x0: i32,
    pub x1: i32,
    pub kind: WallKind,
    pub sky: SkyStrips,
    /// Gap left open towards the neighbour, if it has any.
    pub opening: Option<EdgePair>,
}

/// Render state of the sector being drawn.
#[derive(Clone, Copy, Debug, Default)]
pub struct RenderContext {
    pub sector: SectorId,
    pub depth: usize,
    /// Inclusive column range inherited from the opening we came through.
    pub x0: i32,
    pub x1: i32,
    pub floor_height: f32,
    pub ceil_height: f32,
    pub ambient: i32,
    pub flags: SectorFlags,
    /// This sector's merged segments in `Software::seg_arena`.
    pub segs: (usize, usize),
}

/// An adjoin gap waiting for recursion.
#[derive(Clone, Copy, Debug)]
struct Opening {
    seg: WallSegment,
    next: SectorId,
    edges: EdgePair,
    mask: bool,
    open: bool,
}

/// Pick the drawer for a wall from its cached strip heights.
fn classify(own: SectorFlags, wc: &WallCached, next: Option<SectorFlags>) -> (WallKind, SkyStrips) {
    let Some(next) = next else {
        return (WallKind::Solid, SkyStrips::empty());
    };
    let top = wc.top_texel_h > 0.0;
    let bot = wc.bot_texel_h > 0.0;
    let kind = match (top, bot) {
        (true, true) => WallKind::TopAndBottom,
        (true, false) => WallKind::Top,
        (false, true) => WallKind::Bottom,
        (false, false) => WallKind::Mask,
    };

    let mut sky = SkyStrips::empty();
    if top
        && own.contains(SectorFlags::EXTERIOR | SectorFlags::EXTERIOR_ADJOIN)
        && next.contains(SectorFlags::EXTERIOR)
    {
        sky |= SkyStrips::TOP;
    }
    if bot
        && own.contains(SectorFlags::PIT | SectorFlags::PIT_ADJOIN)
        && next.contains(SectorFlags::PIT)
    {
        sky |= SkyStrips::BOTTOM;
    }
    (kind, sky)
}

/// Textures one wall may draw with, resolved once per segment.
struct WallTextures<'a> {
    top: Option<&'a Texture>,
    mid: Option<&'a Texture>,
    bot: Option<&'a Texture>,
    sign: Option<&'a Texture>,
    sky: Option<&'a Texture>,
}

impl Software {
    /// Draw `sector` into columns `x0 ..= x1` of recursion depth `depth`.
    pub(super) fn draw_sector(
        &mut self,
        level: &Level,
        bank: &TextureBank,
        sector: SectorId,
        depth: usize,
        x0: i32,
        x1: i32,
    ) {
        let Some(src) = level.sector(sector) else {
            return;
        };
        self.cache.transform(sector, level, &self.proj, self.frame);
        let Some(cached) = self.cache.sector(sector) else {
            return;
        };
        self.ctx = RenderContext {
            sector,
            depth,
            x0,
            x1,
            floor_height: cached.floor_height,
            ceil_height: cached.ceil_height,
            ambient: cached.ambient,
            flags: cached.flags,
            segs: (0, 0),
        };
        self.stats.sectors_drawn += 1;
        self.stats.max_depth = self.stats.max_depth.max(depth);

        /*──────── walls → visible, disjoint segments ────────*/
        self.process_walls(src);
        merge_sort(
            &self.proj,
            &self.seg_input,
            &mut self.merged,
            &self.config.limits,
            &mut self.stats,
        );
        let start = self.seg_arena.len();
        self.seg_arena.extend_from_slice(&self.merged);
        self.ctx.segs = (start, self.seg_arena.len());

        /*──────── walls, flats ────────*/
        self.flats.begin(x0, x1);
        let cap = self.config.limits.max_adjoin_segs;
        let mut openings: SmallVec<[Opening; 8]> = SmallVec::new();
        for i in start..self.ctx.segs.1 {
            let seg = self.seg_arena[i];
            if let Some(op) = self.draw_wall(level, bank, &seg) {
                if openings.len() >= cap {
                    self.stats.adjoin_pool_exhausted(cap);
                } else {
                    openings.push(op);
                }
            }
        }
        self.draw_flats(level, bank);

        /*──────── adjoins ────────*/
        let max_depth = self.config.limits.max_adjoin_depth;
        for op in &mut openings {
            if depth + 1 > max_depth {
                self.stats.depth_limit_reached(max_depth);
                continue;
            }
            op.open = self.windows.open_child(
                depth,
                op.edges.x0,
                op.edges.x1,
                &self.column_top,
                &self.column_bot,
            );
        }
        for op in &openings {
            if !op.open {
                continue;
            }
            self.saved.push(self.ctx);
            self.stats.adjoins_followed += 1;
            self.draw_sector(level, bank, op.next, depth + 1, op.edges.x0, op.edges.x1);
            if let Some(ctx) = self.saved.pop() {
                self.ctx = ctx;
            }
            if op.mask {
                self.draw_mask(level, bank, op);
            }
        }

        self.draw_objects(level, bank);
    }

    /// Run `wall_process` over every wall of the current sector.
    fn process_walls(&mut self, src: &Sector) {
        let ctx = self.ctx;
        let cap = self.config.limits.max_wall_segs;
        self.seg_input.clear();
        let Some(cached) = self.cache.sectors.get_mut(ctx.sector as usize) else {
            return;
        };

        for (i, (wc, wall)) in cached.walls.iter_mut().zip(&src.walls).enumerate() {
            self.stats.walls_processed += 1;
            let v0 = cached.view_verts[wall.v0 as usize];
            let v1 = cached.view_verts[wall.v1 as usize];
            let seg = if wc.len > 0.0 {
                wall_process(&self.proj, ctx.sector, i as WallId, v0, v1, wc.texel_len)
            } else {
                None
            };
            let seg = seg.and_then(|mut s| s.clip_columns(ctx.x0, ctx.x1).then_some(s));
            match seg {
                Some(s) => {
                    wc.visible = true;
                    if self.segs_used >= cap {
                        self.stats.segment_pool_exhausted(cap);
                    } else {
                        self.segs_used += 1;
                        self.seg_input.push(s);
                    }
                }
                _ => {
                    wc.visible = false;
                    self.stats.walls_culled += 1;
                }
            }
        }
    }

    /// Draw one merged segment and return the opening it leaves, if any.
    ///
    /// Occlusion bookkeeping (depth, column gap, flat regions) happens for
    /// every open column even when no texel gets written.
    fn draw_wall(&mut self, level: &Level, bank: &TextureBank, seg: &WallSegment) -> Option<Opening> {
        let ctx = self.ctx;
        let wall = level.sector(ctx.sector)?.walls.get(seg.wall as usize)?;
        let wc = *self.cache.sector(ctx.sector)?.walls.get(seg.wall as usize)?;
        let next = wall
            .adjoin
            .and_then(|n| self.cache.sector(n).map(|c| (n, c.flags)));
        let (kind, sky) = classify(ctx.flags, &wc, next.map(|(_, f)| f));
        self.stats.segments_drawn += 1;

        let (f, c) = (ctx.floor_height, ctx.ceil_height);
        let gap_top = c.min(wc.next_ceil);
        let gap_bot = f.max(wc.next_floor);
        let top_lo = wc.next_ceil.max(f);
        let bot_hi = wc.next_floor.min(c);

        let draw = !ctx.flags.contains(SectorFlags::NO_WALL_DRAW);
        let flip = wall.flags.contains(WallFlags::FLIP_HORIZ);
        let tx = WallTextures {
            top: bank.surface(wall.top.tex),
            mid: bank.surface(wall.mid.tex),
            bot: bank.surface(wall.bot.tex),
            sign: bank.surface(wall.sign.tex),
            sky: bank.surface(level.sky_tex),
        };
        let h = self.height as i32;

        for x in seg.x0..=seg.x1 {
            let xi = x as usize;
            let Some((wt, wb)) = self.windows.column(ctx.depth, x) else {
                self.column_top[xi] = h;
                self.column_bot[xi] = -1;
                continue;
            };
            let (z, u) = seg.column(&self.proj, x);
            let u = if flip { wc.texel_len - u } else { u };
            self.windows.write_depth(ctx.depth, x, z);

            let top_px = Projection::first_pixel(self.proj.screen_y(c, z));
            let bot_px = Projection::last_pixel(self.proj.screen_y(f, z));
            self.flats.mark(Plane::Ceiling, x, wt, (top_px - 1).min(wb));
            self.flats.mark(Plane::Floor, x, (bot_px + 1).max(wt), wb);

            let light = compute_lighting(z, wall.light, ctx.ambient, &self.light_env, bank.colormap());

            // rows of the surface a sign sits on
            let mut primary = None;
            if kind == WallKind::Solid {
                self.column_top[xi] = h;
                self.column_bot[xi] = -1;
                let rows = (top_px.max(wt), bot_px.min(wb));
                if draw {
                    self.wall_strip(x, rows, z, u, tx.mid, &wc, Layer::Mid, light);
                }
                primary = Some((rows, Layer::Mid));
            } else {
                let gap_t = Projection::first_pixel(self.proj.screen_y(gap_top, z)).max(wt);
                let gap_b = Projection::last_pixel(self.proj.screen_y(gap_bot, z)).min(wb);
                self.column_top[xi] = gap_t;
                self.column_bot[xi] = gap_b;

                if matches!(kind, WallKind::Top | WallKind::TopAndBottom) {
                    let end = Projection::last_pixel(self.proj.screen_y(top_lo, z)).min(wb);
                    let rows = (top_px.max(wt), end);
                    if sky.contains(SkyStrips::TOP) {
                        self.sky_strip(x, rows, tx.sky);
                    } else {
                        if draw {
                            self.wall_strip(x, rows, z, u, tx.top, &wc, Layer::Top, light);
                        }
                        primary = Some((rows, Layer::Top));
                    }
                }
                if matches!(kind, WallKind::Bottom | WallKind::TopAndBottom) {
                    let begin = Projection::first_pixel(self.proj.screen_y(bot_hi, z)).max(wt);
                    let rows = (begin, bot_px.min(wb));
                    if sky.contains(SkyStrips::BOTTOM) {
                        self.sky_strip(x, rows, tx.sky);
                    } else {
                        if draw {
                            self.wall_strip(x, rows, z, u, tx.bot, &wc, Layer::Bot, light);
                        }
                        if primary.is_none() {
                            primary = Some((rows, Layer::Bot));
                        }
                    }
                }
            }

            if let (true, Some(sign), Some((rows, layer))) = (draw, tx.sign, primary) {
                let light = if wall.flags.contains(WallFlags::ILLUM_SIGN) {
                    None
                } else {
                    light
                };
                self.sign_strip(x, rows, z, u, sign, wc.anchor(layer), wc.offset(Layer::Sign), light);
            }
        }

        let opening = match next {
            Some(_) if gap_top > gap_bot => Some(EdgePair::new(&self.proj, seg, gap_top, gap_bot)),
            _ => None,
        };
        self.drawn.push(DrawnWall {
            sector: ctx.sector,
            wall: seg.wall,
            depth: ctx.depth,
            x0: seg.x0,
            x1: seg.x1,
            kind,
            sky,
            opening,
        });

        let (next, _) = next?;
        Some(Opening {
            seg: *seg,
            next,
            edges: opening?,
            mask: wall.flags.contains(WallFlags::ADJ_MID_TEX) && wall.mid.tex.is_some(),
            open: false,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn wall_strip(
        &mut self,
        x: i32,
        (y0, y1): (i32, i32),
        z: f32,
        u: f32,
        tex: Option<&Texture>,
        wc: &WallCached,
        layer: Layer,
        light: Option<&[u8; 256]>,
    ) {
        let Some(tex) = tex else {
            return;
        };
        if y0 > y1 {
            return;
        }
        let col = TexColumn::on_wall(&self.proj, tex, z, u, wc.anchor(layer), wc.offset(layer), y0);
        draw_column(&mut self.scratch, self.width, x, y0, y1, col, light, false);
    }

    fn sky_strip(&mut self, x: i32, (y0, y1): (i32, i32), sky: Option<&Texture>) {
        if let Some(sky) = sky {
            let u = self.proj.sky_u[x as usize];
            draw_sky_column(&mut self.scratch, self.width, x, y0, y1, sky, u, self.proj.sky_v_offset);
        }
    }

    /// Sign texel rows are relative to the anchor of the surface under it;
    /// outside `[0, w) × [0, h)` of the sign nothing is drawn.
    #[allow(clippy::too_many_arguments)]
    fn sign_strip(
        &mut self,
        x: i32,
        (y0, y1): (i32, i32),
        z: f32,
        u: f32,
        sign: &Texture,
        anchor: f32,
        offset: Vec2,
        light: Option<&[u8; 256]>,
    ) {
        if y0 > y1 {
            return;
        }
        let su = (u - offset.x).floor();
        if su < 0.0 || su >= sign.w as f32 {
            return;
        }
        let col = TexColumn::on_wall(&self.proj, sign, z, u, anchor, -offset, y0);
        let (v0, dv) = (col.v.to_f32(), col.dv.to_f32());
        if dv <= 0.0 {
            return;
        }
        let first = (y0 as f32 + (-v0 / dv).ceil().max(0.0)).min(y1 as f32 + 1.0) as i32;
        let last = (y0 as f32 + ((sign.h as f32 - v0) / dv).ceil() - 1.0).min(y1 as f32) as i32;
        if first > last {
            return;
        }
        let col = TexColumn::on_wall(&self.proj, sign, z, u, anchor, -offset, first);
        draw_column(&mut self.scratch, self.width, x, first, last, col, light, true);
    }

    /// See-through mid texture over an adjoin, after the far side is drawn.
    fn draw_mask(&mut self, level: &Level, bank: &TextureBank, op: &Opening) {
        let ctx = self.ctx;
        if ctx.flags.contains(SectorFlags::NO_WALL_DRAW) {
            return;
        }
        let Some(wall) = level
            .sector(ctx.sector)
            .and_then(|s| s.walls.get(op.seg.wall as usize))
        else {
            return;
        };
        let Some(wc) = self
            .cache
            .sector(ctx.sector)
            .and_then(|s| s.walls.get(op.seg.wall as usize))
            .copied()
        else {
            return;
        };
        let Some(tex) = bank.surface(wall.mid.tex) else {
            return;
        };
        let flip = wall.flags.contains(WallFlags::FLIP_HORIZ);

        for x in op.seg.x0..=op.seg.x1 {
            let Some((t, b)) = self.windows.column(ctx.depth + 1, x) else {
                continue;
            };
            let (z, u) = op.seg.column(&self.proj, x);
            let u = if flip { wc.texel_len - u } else { u };
            let light = compute_lighting(z, wall.light, ctx.ambient, &self.light_env, bank.colormap());
            let col = TexColumn::on_wall(&self.proj, tex, z, u, wc.anchor(Layer::Mid), wc.offset(Layer::Mid), t);
            draw_column(&mut self.scratch, self.width, x, t, b, col, light, true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::{RenderConfig, RenderLimits, Renderer, software::test_util::*};
    use crate::world::demo_level;
    use glam::{vec2, vec3};

    fn render(level: &mut Level, bank: &TextureBank, cam: crate::world::Camera, w: usize, h: usize) -> Software {
        let mut sw = Software::default();
        sw.begin_frame(w, h);
        sw.draw_level(level, &cam, bank);
        sw
    }

    #[test]
    fn single_room_four_solid_walls() {
        let (mut level, bank) = room_level(40.0, 0.0, 10.0, 31);
        let sw = render(&mut level, &bank, camera(vec3(5.0, 5.0, 5.0), 45.0, 120.0), 64, 48);

        let st = sw.stats();
        assert_eq!(st.walls_processed, 4);
        assert_eq!(st.walls_culled, 0);
        let drawn = sw.drawn_walls();
        assert_eq!(drawn.len(), 4);
        assert!(drawn.iter().all(|d| d.kind == WallKind::Solid && d.opening.is_none()));
        for (i, a) in drawn.iter().enumerate() {
            for b in &drawn[i + 1..] {
                assert!(a.x1 < b.x0 || b.x1 < a.x0, "overlap {a:?} / {b:?}");
            }
        }
        let covered: i32 = drawn.iter().map(|d| d.x1 - d.x0 + 1).sum();
        assert_eq!(covered, 64, "closed room must cover every column");

        // ambient at max: wall pixels come out unremapped
        let fb = sw.framebuffer();
        assert!(fb.iter().any(|&p| p == WALL_COLOR));
        assert!(fb.iter().all(|&p| p as usize >= 32), "lit pixel in a fully bright room");
    }

    #[test]
    fn higher_neighbour_floor_selects_bottom_drawer() {
        let (mut level, bank) = two_rooms(2.0, 10.0);
        let sw = render(&mut level, &bank, camera(vec3(10.0, 2.0, 5.0), 90.0, 90.0), 64, 48);

        let portal = portal_wall(&level, 0, 1);
        let d = sw
            .drawn_walls()
            .iter()
            .find(|d| d.sector == 0 && d.wall == portal)
            .copied()
            .expect("portal wall not drawn");
        assert_eq!(d.kind, WallKind::Bottom);
        let op = d.opening.expect("open neighbour must record an opening");
        assert_eq!(op.floor_height, 2.0);
        assert_eq!(op.ceil_height, 10.0);

        // portal 18 units ahead: step strip rows 29..=32, gap rows 15..=28
        let fb = sw.framebuffer();
        assert_eq!(fb[30 * 64 + 32], STEP_COLOR);
        assert_eq!(sw.windows().column(1, 32), Some((15, 28)));
        assert_eq!(sw.stats().sectors_drawn, 2);
        assert_eq!(sw.stats().adjoins_followed, 1);
    }

    #[test]
    fn lower_neighbour_ceiling_selects_top_drawer() {
        let (mut level, bank) = two_rooms(0.0, 8.0);
        let sw = render(&mut level, &bank, camera(vec3(10.0, 2.0, 5.0), 90.0, 90.0), 64, 48);
        let portal = portal_wall(&level, 0, 1);
        let d = sw.drawn_walls().iter().find(|d| d.wall == portal && d.sector == 0).unwrap();
        assert_eq!(d.kind, WallKind::Top);
        assert_eq!(d.opening.unwrap().ceil_height, 8.0);
    }

    #[test]
    fn equal_heights_give_a_pure_opening() {
        let (mut level, bank) = two_rooms(0.0, 10.0);
        let sw = render(&mut level, &bank, camera(vec3(10.0, 2.0, 5.0), 90.0, 90.0), 64, 48);
        let portal = portal_wall(&level, 0, 1);
        let d = sw.drawn_walls().iter().find(|d| d.wall == portal && d.sector == 0).unwrap();
        assert_eq!(d.kind, WallKind::Mask);
        // far wall of sector 1 visible through the opening
        assert_eq!(sw.framebuffer()[24 * 64 + 32], WALL_COLOR);
    }

    #[test]
    fn closed_neighbour_records_no_opening() {
        let (mut level, bank) = two_rooms(0.0, 10.0);
        level.sectors[1].set_heights(6.0, 6.0);
        let sw = render(&mut level, &bank, camera(vec3(10.0, 2.0, 5.0), 90.0, 90.0), 64, 48);
        let portal = portal_wall(&level, 0, 1);
        let d = sw.drawn_walls().iter().find(|d| d.wall == portal && d.sector == 0).unwrap();
        assert_eq!(d.kind, WallKind::TopAndBottom);
        assert!(d.opening.is_none());
        assert_eq!(sw.stats().sectors_drawn, 1);
    }

    #[test]
    fn mask_wall_drawn_over_the_far_side() {
        let (mut level, bank) = two_rooms(0.0, 10.0);
        let portal = portal_wall(&level, 0, 1);
        let w = &mut level.sectors[0].walls[portal as usize];
        w.flags |= WallFlags::ADJ_MID_TEX;
        w.mid.tex = Some(tex(&bank, "MASK"));
        let sw = render(&mut level, &bank, camera(vec3(10.0, 2.0, 5.0), 90.0, 90.0), 64, 48);
        assert_eq!(sw.framebuffer()[24 * 64 + 32], MASK_COLOR);
        assert_eq!(sw.stats().sectors_drawn, 2, "far side still drawn behind the mask");
    }

    #[test]
    fn exterior_neighbours_show_sky_strips() {
        let (mut level, bank) = two_rooms(0.0, 8.0);
        level.sectors[0].set_flags(SectorFlags::EXTERIOR | SectorFlags::EXTERIOR_ADJOIN);
        level.sectors[1].set_flags(SectorFlags::EXTERIOR);
        let sw = render(&mut level, &bank, camera(vec3(10.0, 2.0, 5.0), 90.0, 90.0), 64, 48);
        let portal = portal_wall(&level, 0, 1);
        let d = sw.drawn_walls().iter().find(|d| d.wall == portal && d.sector == 0).unwrap();
        assert_eq!(d.sky, SkyStrips::TOP);
        // strip between ceiling 10 and 8 at depth 18: rows 15..=18
        assert_eq!(sw.framebuffer()[16 * 64 + 32], SKY_COLOR);
    }

    #[test]
    fn no_wall_draw_still_occludes() {
        let (mut level, bank) = room_level(40.0, 0.0, 10.0, 31);
        level.sectors[0].set_flags(SectorFlags::NO_WALL_DRAW);
        let sw = render(&mut level, &bank, camera(vec3(20.0, 20.0, 5.0), 90.0, 90.0), 64, 48);
        assert!(sw.framebuffer().iter().all(|&p| p != WALL_COLOR));
        assert!(sw.depth1d(0).iter().all(|&z| z < f32::MAX), "depth must still be written");
        assert_eq!(sw.framebuffer()[0], CEIL_COLOR);
    }

    #[test]
    fn missing_texture_skips_drawing() {
        let (mut level, bank) = room_level(40.0, 0.0, 10.0, 31);
        for w in &mut level.sectors[0].walls {
            w.mid.tex = None;
        }
        let sw = render(&mut level, &bank, camera(vec3(20.0, 20.0, 5.0), 90.0, 90.0), 64, 48);
        assert_eq!(sw.framebuffer()[24 * 64 + 32], 0);
        assert_eq!(sw.drawn_walls().len(), sw.stats().segments_drawn);
    }

    #[test]
    fn sign_sits_on_the_wall() {
        let (mut level, bank) = room_level(40.0, 0.0, 10.0, 31);
        let north = wall_at(&level, 0, vec2(0.0, 40.0), vec2(40.0, 40.0));
        let w = &mut level.sectors[0].walls[north as usize];
        w.sign.tex = Some(tex(&bank, "SIGN"));
        // 8×8 texels = 1×1 unit, u 156..164, rows below 6 units high
        w.sign.offset = vec2(156.0, 32.0);
        w.flags |= WallFlags::ILLUM_SIGN;
        let sw = render(&mut level, &bank, camera(vec3(20.0, 20.0, 5.0), 90.0, 90.0), 64, 48);

        let fb = sw.framebuffer();
        // heights 6 → 5 at depth 20 are rows 22..=23
        assert_eq!(fb[23 * 64 + 32], SIGN_COLOR);
        assert_eq!(fb[20 * 64 + 32], WALL_COLOR);
        assert_eq!(fb[27 * 64 + 32], WALL_COLOR);
        assert_eq!(fb[23 * 64 + 8], WALL_COLOR, "sign leaked outside its u range");
    }

    #[test]
    fn depth_limit_bounds_recursion() {
        let (mut level, bank) = corridor(8);
        let cfg = RenderConfig {
            limits: RenderLimits {
                max_adjoin_depth: 2,
                ..RenderLimits::default()
            },
            ..RenderConfig::default()
        };
        let mut sw = Software::new(cfg).unwrap();
        sw.begin_frame(64, 48);
        sw.draw_level(&mut level, &camera(vec3(2.0, 5.0, 5.0), 0.0, 90.0), &bank);
        let st = sw.stats();
        assert_eq!(st.max_depth, 2);
        assert_eq!(st.sectors_drawn, 3);
        assert!(st.depth_limit_hits >= 1);
    }

    #[test]
    fn adjoin_cap_drops_the_opening_but_keeps_the_wall() {
        let (mut level, bank) = two_rooms(0.0, 10.0);
        let cfg = RenderConfig {
            limits: RenderLimits {
                max_adjoin_segs: 0,
                ..RenderLimits::default()
            },
            ..RenderConfig::default()
        };
        let mut sw = Software::new(cfg).unwrap();
        sw.begin_frame(64, 48);
        sw.draw_level(&mut level, &camera(vec3(10.0, 2.0, 5.0), 90.0, 90.0), &bank);

        let st = sw.stats();
        assert_eq!(st.dropped_adjoins, 1);
        assert_eq!(st.sectors_drawn, 1);
        assert_eq!(st.adjoins_followed, 0);
        let portal = portal_wall(&level, 0, 1);
        let d = sw.drawn_walls().iter().find(|d| d.wall == portal && d.sector == 0).unwrap();
        assert!(d.opening.is_some(), "drawn wall still records its gap");
    }

    #[test]
    fn walls_outside_the_column_window_are_culled() {
        let (mut level, bank) = two_rooms(0.0, 10.0);
        let sw = render(&mut level, &bank, camera(vec3(10.0, 2.0, 5.0), 90.0, 90.0), 64, 48);
        let gate = sw
            .drawn_walls()
            .iter()
            .find(|g| g.sector == 0 && g.opening.is_some())
            .copied()
            .expect("portal drawn");
        let inner: Vec<_> = sw.drawn_walls().iter().filter(|d| d.sector == 1).collect();
        assert!(!inner.is_empty());
        for d in inner {
            assert_eq!(d.depth, 1);
            assert!(gate.x0 <= d.x0 && d.x1 <= gate.x1, "{d:?} outside {gate:?}");
        }
    }

    #[test]
    fn corridor_recurses_to_the_end() {
        let (mut level, bank) = corridor(5);
        let sw = render(&mut level, &bank, camera(vec3(2.0, 5.0, 5.0), 0.0, 90.0), 64, 48);
        assert_eq!(sw.stats().sectors_drawn, 5);
        assert_eq!(sw.stats().max_depth, 4);
        assert_eq!(sw.stats().depth_limit_hits, 0);
    }

    #[test]
    fn windows_nest_across_depths() {
        let mut bank = TextureBank::default_with_checker();
        let (mut level, eye, yaw) = demo_level(&mut bank).unwrap();
        let mut sw = Software::default();
        for turn in 0..8 {
            let cam = crate::world::Camera::new(eye, yaw + turn as f32 * 0.8, 1.6);
            sw.begin_frame(96, 60);
            sw.draw_level(&mut level, &cam, &bank);
            let win = sw.windows();
            for d in 0..win.depths() - 1 {
                for x in 0..96 {
                    if let Some((t1, b1)) = win.column(d + 1, x) {
                        let (t0, b0) = win.column(d, x).expect("open child under closed parent");
                        assert!(t0 <= t1 && b1 <= b0, "turn {turn}: depth {d} column {x} widened");
                    }
                }
            }
        }
    }

    #[test]
    fn context_restored_after_recursion() {
        let (mut level, bank) = corridor(3);
        let sw = render(&mut level, &bank, camera(vec3(2.0, 5.0, 5.0), 0.0, 90.0), 64, 48);
        assert!(sw.saved.is_empty());
        assert_eq!(sw.ctx.sector, 0);
        assert_eq!(sw.ctx.depth, 0);
    }
}
