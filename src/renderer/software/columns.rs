//! Column drawers.
//!
//! Every wall, mask, sign and sprite ends up here as one vertical run of
//! pixels. The four shading variants (lit/fullbright × opaque/masked) are
//! monomorphised from one generic loop.

use std::ops::{Add, AddAssign};

use glam::Vec2;

use crate::{
    renderer::software::projection::{Projection, TEXELS_PER_UNIT},
    world::{TRANSPARENT, Texture},
};

/// Fractional bits of the vertical texture accumulator.
pub const FRAC_BITS: u32 = 20;

/// 44.20 fixed-point value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Fixed(pub i64);

impl Fixed {
    pub const ONE: Fixed = Fixed(1 << FRAC_BITS);

    #[inline]
    pub fn from_f32(v: f32) -> Self {
        Fixed((v as f64 * Self::ONE.0 as f64).floor() as i64)
    }

    /// Integer part, rounded towards negative infinity.
    #[inline]
    pub fn floor(self) -> i32 {
        (self.0 >> FRAC_BITS) as i32
    }

    #[inline]
    pub fn to_f32(self) -> f32 {
        (self.0 as f64 / Self::ONE.0 as f64) as f32
    }
}

impl Add for Fixed {
    type Output = Fixed;
    #[inline]
    fn add(self, rhs: Fixed) -> Fixed {
        Fixed(self.0 + rhs.0)
    }
}

impl AddAssign for Fixed {
    #[inline]
    fn add_assign(&mut self, rhs: Fixed) {
        self.0 += rhs.0;
    }
}

/*──────────────────────────── shading ─────────────────────────────────*/

/// Maps a texel to the pixel written.
pub trait Shade: Copy {
    fn shade(self, texel: u8) -> u8;
}

#[derive(Clone, Copy)]
pub struct Fullbright;

impl Shade for Fullbright {
    #[inline(always)]
    fn shade(self, texel: u8) -> u8 {
        texel
    }
}

#[derive(Clone, Copy)]
pub struct Lit<'a>(pub &'a [u8; 256]);

impl Shade for Lit<'_> {
    #[inline(always)]
    fn shade(self, texel: u8) -> u8 {
        self.0[texel as usize]
    }
}

/*──────────────────────────── columns ─────────────────────────────────*/

/// One texture column with its vertical stepping.
#[derive(Clone, Copy)]
pub struct TexColumn<'a> {
    pub tex: &'a Texture,
    pub u: i32,
    /// Texel row at the first pixel drawn.
    pub v: Fixed,
    /// Texel rows per screen row.
    pub dv: Fixed,
}

impl<'a> TexColumn<'a> {
    /// Column of a wall surface at depth `z` whose texel row 0 sits at
    /// world height `anchor`, starting at screen row `y0`.
    pub fn on_wall(
        proj: &Projection,
        tex: &'a Texture,
        z: f32,
        u: f32,
        anchor: f32,
        offset: Vec2,
        y0: i32,
    ) -> Self {
        let h = proj.height_at_row(y0, z);
        let v = (anchor - h) * TEXELS_PER_UNIT + offset.y;
        let dv = TEXELS_PER_UNIT * z / proj.focal_aspect;
        Self {
            tex,
            u: (u + offset.x).floor() as i32,
            v: Fixed::from_f32(v),
            dv: Fixed::from_f32(dv),
        }
    }
}

fn fill<const MASKED: bool, S: Shade>(
    fb: &mut [u8],
    width: usize,
    x: usize,
    y0: i32,
    y1: i32,
    col: TexColumn,
    shade: S,
) {
    let tex = col.tex;
    let u = tex.wrap_u(col.u);
    let mut v = col.v;
    let mut i = y0 as usize * width + x;
    for _ in y0..=y1 {
        let t = tex.texel(u, tex.wrap_v(v.floor()));
        if !MASKED || t != TRANSPARENT {
            fb[i] = shade.shade(t);
        }
        v += col.dv;
        i += width;
    }
}

/// Draw rows `y0 ..= y1` of column `x`; `masked` skips transparent texels.
#[inline]
pub fn draw_column(
    fb: &mut [u8],
    width: usize,
    x: i32,
    y0: i32,
    y1: i32,
    col: TexColumn,
    light: Option<&[u8; 256]>,
    masked: bool,
) {
    if y0 > y1 || x < 0 {
        return;
    }
    let x = x as usize;
    match (light, masked) {
        (None, false) => fill::<false, _>(fb, width, x, y0, y1, col, Fullbright),
        (None, true) => fill::<true, _>(fb, width, x, y0, y1, col, Fullbright),
        (Some(map), false) => fill::<false, _>(fb, width, x, y0, y1, col, Lit(map)),
        (Some(map), true) => fill::<true, _>(fb, width, x, y0, y1, col, Lit(map)),
    }
}

/// Sky band: texel column from the camera yaw, rows from the screen row.
pub fn draw_sky_column(
    fb: &mut [u8],
    width: usize,
    x: i32,
    y0: i32,
    y1: i32,
    sky: &Texture,
    u: f32,
    v_offset: f32,
) {
    if y0 > y1 || x < 0 {
        return;
    }
    let u = sky.wrap_u(u.floor() as i32);
    let mut i = y0 as usize * width + x as usize;
    for y in y0..=y1 {
        let v = sky.wrap_v((y as f32 + v_offset).floor() as i32);
        fb[i] = sky.texel(u, v);
        i += width;
    }
}

/// Flat colour run (model faces).
pub fn fill_column(fb: &mut [u8], width: usize, x: i32, y0: i32, y1: i32, color: u8) {
    if y0 > y1 || x < 0 {
        return;
    }
    let mut i = y0 as usize * width + x as usize;
    for _ in y0..=y1 {
        fb[i] = color;
        i += width;
    }
}
