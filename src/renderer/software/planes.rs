use glam::Vec2;

use crate::{
    renderer::software::{
        Software,
        columns::Fixed,
        lighting::compute_lighting,
        projection::TEXELS_PER_UNIT,
    },
    world::{Level, SectorFlags, Texture, TextureBank},
};

/// Which flat of the current sector a region belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Plane {
    Ceiling,
    Floor,
}

/// Rows still uncovered above and below the walls of one sector, per column.
///
/// Filled while walls are drawn, flushed as horizontal runs right after.
#[derive(Debug, Default)]
pub struct FlatRegions {
    ceil_top: Vec<i32>,
    ceil_bot: Vec<i32>,
    floor_top: Vec<i32>,
    floor_bot: Vec<i32>,
    pub min_x: i32,
    pub max_x: i32,
    /// Inclusive row span touched per plane; empty when `lo > hi`.
    rows: [(i32, i32); 2],
}

impl FlatRegions {
    pub fn resize(&mut self, width: usize) {
        for v in [
            &mut self.ceil_top,
            &mut self.ceil_bot,
            &mut self.floor_top,
            &mut self.floor_bot,
        ] {
            v.resize(width, 0);
        }
    }

    /// Forget everything and cover columns `x0 ..= x1` next.
    pub fn begin(&mut self, x0: i32, x1: i32) {
        self.min_x = x0;
        self.max_x = x1;
        self.rows = [(i32::MAX, i32::MIN); 2];
        if x0 > x1 {
            return;
        }
        let r = x0 as usize..=x1 as usize;
        self.ceil_top[r.clone()].fill(1);
        self.ceil_bot[r.clone()].fill(0);
        self.floor_top[r.clone()].fill(1);
        self.floor_bot[r].fill(0);
    }

    /// Record rows `top ..= bot` of column `x` as belonging to `plane`.
    pub fn mark(&mut self, plane: Plane, x: i32, top: i32, bot: i32) {
        if top > bot {
            return;
        }
        let i = x as usize;
        let (t, b) = match plane {
            Plane::Ceiling => (&mut self.ceil_top, &mut self.ceil_bot),
            Plane::Floor => (&mut self.floor_top, &mut self.floor_bot),
        };
        t[i] = top;
        b[i] = bot;
        let rows = &mut self.rows[plane as usize];
        rows.0 = rows.0.min(top);
        rows.1 = rows.1.max(bot);
    }

    #[inline]
    pub fn contains(&self, plane: Plane, x: i32, y: i32) -> bool {
        let i = x as usize;
        let (t, b) = match plane {
            Plane::Ceiling => (self.ceil_top[i], self.ceil_bot[i]),
            Plane::Floor => (self.floor_top[i], self.floor_bot[i]),
        };
        t <= y && y <= b
    }

    #[inline]
    pub fn rows(&self, plane: Plane) -> std::ops::RangeInclusive<i32> {
        let (lo, hi) = self.rows[plane as usize];
        lo..=hi
    }
}

/// What one flat run is filled with.
#[derive(Clone, Copy)]
enum Fill<'a> {
    Sky(&'a Texture),
    Textured {
        tex: &'a Texture,
        height: f32,
        offset: Vec2,
        ambient: i32,
    },
}

impl Software {
    /// Fill the ceiling and floor regions recorded for the current sector.
    ///
    /// Exterior ceilings and pit floors show the sky instead of their texture.
    pub(super) fn draw_flats(&mut self, level: &Level, bank: &TextureBank) {
        let ctx = self.ctx;
        let Some(sector) = level.sector(ctx.sector) else {
            return;
        };
        let sky = bank.surface(level.sky_tex);

        let flats = std::mem::take(&mut self.flats);
        for plane in [Plane::Ceiling, Plane::Floor] {
            let (surface, height, sky_flag) = match plane {
                Plane::Ceiling => (sector.ceil, ctx.ceil_height, SectorFlags::EXTERIOR),
                Plane::Floor => (sector.floor, ctx.floor_height, SectorFlags::PIT),
            };
            let fill = if ctx.flags.contains(sky_flag) {
                match sky {
                    Some(tex) => Fill::Sky(tex),
                    None => continue,
                }
            } else {
                match bank.surface(surface.tex) {
                    Some(tex) => Fill::Textured {
                        tex,
                        height,
                        offset: surface.offset,
                        ambient: ctx.ambient,
                    },
                    None => continue,
                }
            };

            for y in flats.rows(plane) {
                let mut xs = None; // start of the current run

                for x in flats.min_x..=flats.max_x {
                    if flats.contains(plane, x, y) {
                        if xs.is_none() {
                            xs = Some(x);
                        }
                    } else if let Some(start) = xs.take() {
                        self.emit_span(fill, y, start, x - 1, bank);
                    }
                }

                if let Some(start) = xs {
                    // tail-run
                    self.emit_span(fill, y, start, flats.max_x, bank);
                }
            }
        }
        self.flats = flats;
    }

    /// Draw one horizontal run `x_start ..= x_end` of row `y`.
    #[inline(always)]
    fn emit_span(&mut self, fill: Fill, y: i32, x_start: i32, x_end: i32, bank: &TextureBank) {
        let row_idx = y as usize * self.width;
        let row = &mut self.scratch[row_idx..][..self.width];

        match fill {
            Fill::Sky(sky) => {
                let v = sky.wrap_v((y as f32 + self.proj.sky_v_offset).floor() as i32);
                for x in x_start..=x_end {
                    let u = sky.wrap_u(self.proj.sky_u[x as usize].floor() as i32);
                    row[x as usize] = sky.texel(u, v);
                }
            }
            Fill::Textured {
                tex,
                height,
                offset,
                ambient,
            } => {
                let Some(z) = self.proj.plane_depth(height, y) else {
                    return;
                };
                let cam = &self.proj.camera;
                let (fwd, right) = (cam.forward(), cam.right());

                // world position under the first pixel centre, then per-pixel step
                let cx = self.proj.column_x_over_z[x_start as usize];
                let base = cam.pos.truncate() + fwd * z + right * (cx * z);
                let step = right * (z / self.proj.focal);

                let uv = base * TEXELS_PER_UNIT + offset;
                let duv = step * TEXELS_PER_UNIT;
                let (mut u, mut v) = (Fixed::from_f32(uv.x), Fixed::from_f32(uv.y));
                let (du, dv) = (Fixed::from_f32(duv.x), Fixed::from_f32(duv.y));

                let light = compute_lighting(z, 0, ambient, &self.light_env, bank.colormap());
                for px in &mut row[x_start as usize..=x_end as usize] {
                    let t = tex.texel(tex.wrap_u(u.floor()), tex.wrap_v(v.floor()));
                    *px = match light {
                        Some(map) => map[t as usize],
                        None => t,
                    };
                    u += du;
                    v += dv;
                }
            }
        }
    }
}
