use glam::Vec2;

use crate::{
    renderer::software::projection::{NEAR_PLANE, Projection},
    world::{SectorId, WallId},
};

/// Denominators smaller than this are treated as rays parallel to the wall.
const SOLVE_EPS: f32 = 1e-6;

/// Which slope of the view-space wall line is kept for per-column recovery.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    /// `z = slope * x + intercept`; used when the wall spans more in x.
    DzDx,
    /// `x = slope * z + intercept`; used when the wall recedes steeply.
    DxDz,
}

/// Screen-space projection of one wall after frustum clipping.
///
/// Ephemeral: produced every frame, merged, drawn and thrown away.
#[derive(Clone, Copy, Debug)]
pub struct WallSegment {
    pub sector: SectorId,
    pub wall: WallId,
    /// Clipped view-space endpoints (x lateral, y depth).
    pub p0: Vec2,
    pub p1: Vec2,
    /// Sub-pixel screen X of the clipped endpoints.
    pub sx0: f32,
    pub sx1: f32,
    /// Pixel columns covered by the whole projected wall.
    pub x0_raw: i32,
    pub x1_raw: i32,
    /// Pixel columns this segment is still responsible for.
    pub x0: i32,
    pub x1: i32,
    /// Texel U at `p0` and texels remaining up to `p1`.
    pub u0: f32,
    pub texel_len_rem: f32,
    pub orient: Orientation,
    pub slope: f32,
    pub intercept: f32,
}

impl WallSegment {
    #[inline]
    pub fn z0(&self) -> f32 {
        self.p0.y
    }

    #[inline]
    pub fn z1(&self) -> f32 {
        self.p1.y
    }

    #[inline]
    pub fn overlaps(&self, other: &WallSegment) -> bool {
        self.x0 <= other.x1 && other.x0 <= self.x1
    }

    /// Restrict to columns `lo ..= hi`; `false` when nothing is left.
    pub fn clip_columns(&mut self, lo: i32, hi: i32) -> bool {
        self.x0 = self.x0.max(lo);
        self.x1 = self.x1.min(hi);
        self.x0 <= self.x1
    }

    /// View depth where the ray with `x/z = cx` meets the wall.
    ///
    /// One division, pivoting on whichever slope has the larger magnitude.
    pub fn solve_for_z(&self, cx: f32) -> f32 {
        let z = match self.orient {
            Orientation::DzDx => {
                let den = 1.0 - self.slope * cx;
                if den.abs() < SOLVE_EPS {
                    f32::MAX
                } else {
                    self.intercept / den
                }
            }
            Orientation::DxDz => {
                let den = cx - self.slope;
                if den.abs() < SOLVE_EPS {
                    f32::MAX
                } else {
                    self.intercept / den
                }
            }
        };
        let (lo, hi) = if self.p0.y < self.p1.y {
            (self.p0.y, self.p1.y)
        } else {
            (self.p1.y, self.p0.y)
        };
        if z.is_finite() { z.clamp(lo, hi) } else { hi }
    }

    /// Parameter along the clipped wall (0 at `p0`) of the point at depth `z`
    /// on the ray `x/z = cx`.
    pub fn param(&self, cx: f32, z: f32) -> f32 {
        let t = match self.orient {
            Orientation::DzDx => (cx * z - self.p0.x) / (self.p1.x - self.p0.x),
            Orientation::DxDz => (z - self.p0.y) / (self.p1.y - self.p0.y),
        };
        if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 }
    }

    /// Depth and texel U at screen column `x`.
    #[inline]
    pub fn column(&self, proj: &Projection, x: i32) -> (f32, f32) {
        let cx = proj.column_x_over_z[x as usize];
        let z = self.solve_for_z(cx);
        let u = self.u0 + self.param(cx, z) * self.texel_len_rem;
        (z, u)
    }
}

/// Clip `p0..p1` against the half-plane `f >= 0`, given `f` at both ends.
///
/// Nothing moves unless an endpoint is strictly outside.
fn clip_half_plane(
    p0: &mut Vec2,
    p1: &mut Vec2,
    u0: &mut f32,
    texel_len_rem: &mut f32,
    f0: f32,
    f1: f32,
) -> bool {
    if f0 < 0.0 && f1 < 0.0 {
        return false;
    }
    if f0 < 0.0 {
        let t = f0 / (f0 - f1);
        *p0 += (*p1 - *p0) * t;
        *u0 += *texel_len_rem * t;
        *texel_len_rem *= 1.0 - t;
    } else if f1 < 0.0 {
        let t = f1 / (f1 - f0);
        *p1 += (*p0 - *p1) * t;
        *texel_len_rem *= 1.0 - t;
    }
    true
}

/// Turn one cached wall (endpoints already in view space) into a segment.
///
/// * `None` for walls behind the eye, outside the frustum, back-facing or
///   narrower than one pixel column. These are expected, not errors.
/// * Clipping keeps `u0`/`texel_len_rem` continuous so texturing does not
///   swim when an endpoint crosses a frustum plane.
pub fn wall_process(
    proj: &Projection,
    sector: SectorId,
    wall: WallId,
    view0: Vec2,
    view1: Vec2,
    texel_len: f32,
) -> Option<WallSegment> {
    if view0.y < 0.0 && view1.y < 0.0 {
        return None;
    }
    // interior lies to the right of v0 → v1; the eye must be on that side
    if view0.perp_dot(view1) >= 0.0 {
        return None;
    }

    let (mut p0, mut p1) = (view0, view1);
    let mut u0 = 0.0;
    let mut rem = texel_len;
    let k = proj.frustum_k;

    // near, left, right; each plane is evaluated on the already clipped ends
    let (f0, f1) = (p0.y - NEAR_PLANE, p1.y - NEAR_PLANE);
    if !clip_half_plane(&mut p0, &mut p1, &mut u0, &mut rem, f0, f1) {
        return None;
    }
    let (f0, f1) = (p0.x + k * p0.y, p1.x + k * p1.y);
    if !clip_half_plane(&mut p0, &mut p1, &mut u0, &mut rem, f0, f1) {
        return None;
    }
    let (f0, f1) = (k * p0.y - p0.x, k * p1.y - p1.x);
    if !clip_half_plane(&mut p0, &mut p1, &mut u0, &mut rem, f0, f1) {
        return None;
    }

    let sx0 = proj.screen_x(p0);
    let sx1 = proj.screen_x(p1);
    let last_col = proj.width as i32 - 1;
    let x0 = Projection::first_pixel(sx0).max(0);
    let x1 = Projection::last_pixel(sx1).min(last_col);
    if x0 > x1 {
        return None;
    }

    let d = p1 - p0;
    let (orient, slope, intercept) = if d.x.abs() >= d.y.abs() {
        let s = d.y / d.x;
        (Orientation::DzDx, s, p0.y - s * p0.x)
    } else {
        let s = d.x / d.y;
        (Orientation::DxDz, s, p0.x - s * p0.y)
    };

    Some(WallSegment {
        sector,
        wall,
        p0,
        p1,
        sx0,
        sx1,
        x0_raw: x0,
        x1_raw: x1,
        x0,
        x1,
        u0,
        texel_len_rem: rem,
        orient,
        slope,
        intercept,
    })
}

/// Top and bottom screen edges of an adjoin opening.
///
/// Both edges are straight lines in screen space (1/z is linear across a
/// planar wall), stored as the value at `x0`/`x1` plus the per-column slope.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EdgePair {
    pub x0: i32,
    pub x1: i32,
    pub ceil_height: f32,
    pub floor_height: f32,
    pub y_ceil0: f32,
    pub y_ceil1: f32,
    pub dy_ceil_dx: f32,
    pub y_floor0: f32,
    pub y_floor1: f32,
    pub dy_floor_dx: f32,
}

impl EdgePair {
    pub fn new(proj: &Projection, seg: &WallSegment, ceil_height: f32, floor_height: f32) -> Self {
        let (z0, _) = seg.column(proj, seg.x0);
        let (z1, _) = seg.column(proj, seg.x1);
        let span = (seg.x1 - seg.x0).max(1) as f32;
        let y_ceil0 = proj.screen_y(ceil_height, z0);
        let y_ceil1 = proj.screen_y(ceil_height, z1);
        let y_floor0 = proj.screen_y(floor_height, z0);
        let y_floor1 = proj.screen_y(floor_height, z1);
        Self {
            x0: seg.x0,
            x1: seg.x1,
            ceil_height,
            floor_height,
            y_ceil0,
            y_ceil1,
            dy_ceil_dx: (y_ceil1 - y_ceil0) / span,
            y_floor0,
            y_floor1,
            dy_floor_dx: (y_floor1 - y_floor0) / span,
        }
    }

    #[inline]
    pub fn y_ceil_at(&self, x: i32) -> f32 {
        self.y_ceil0 + self.dy_ceil_dx * (x - self.x0) as f32
    }

    #[inline]
    pub fn y_floor_at(&self, x: i32) -> f32 {
        self.y_floor0 + self.dy_floor_dx * (x - self.x0) as f32
    }
}
