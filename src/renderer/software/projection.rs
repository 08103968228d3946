use glam::{Vec2, Vec3};
use std::f32::consts::TAU;

use crate::world::Camera;

/// Closest view depth a wall may reach after clipping, map units.
pub const NEAR_PLANE: f32 = 0.25;

/// Texture density on walls and flats.
pub const TEXELS_PER_UNIT: f32 = 8.0;

/// Per-frame camera transform and projection constants.
///
/// View space is `x` = lateral (+ right), `y` = depth; screen Y grows
/// downwards from `y_center`, which pitch shears away from the middle row.
#[derive(Clone, Debug, Default)]
pub struct Projection {
    pub width: usize,
    pub height: usize,
    pub half_w: f32,
    pub half_h: f32,
    /// Horizontal focal length in pixels.
    pub focal: f32,
    /// Vertical focal length; differs from `focal` with aspect correction.
    pub focal_aspect: f32,
    /// Frustum half-plane slope: visible points satisfy `|x| <= k * z`.
    pub frustum_k: f32,
    pub y_center: f32,
    pub camera: Camera,
    /// `x / z` of the ray through every column centre.
    pub column_x_over_z: Vec<f32>,
    /// Sky texel column for every screen column.
    pub sky_u: Vec<f32>,
    /// Added to the screen row to get the sky texel row.
    pub sky_v_offset: f32,
}

impl Projection {
    pub fn setup(
        &mut self,
        width: usize,
        height: usize,
        aspect_correct: bool,
        camera: &Camera,
        sky_parallax: Vec2,
    ) {
        self.width = width;
        self.height = height;
        self.half_w = width as f32 * 0.5;
        self.half_h = height as f32 * 0.5;
        self.focal = camera.screen_scale(width);
        self.focal_aspect = if aspect_correct {
            // stretch so the picture fills a 4:3 display
            self.focal * (4.0 * height as f32) / (3.0 * width as f32)
        } else {
            self.focal
        };
        self.frustum_k = self.half_w / self.focal;
        self.y_center = self.half_h + camera.pitch.tan() * self.focal_aspect;
        self.camera = *camera;

        self.column_x_over_z.clear();
        self.column_x_over_z
            .extend((0..width).map(|c| (c as f32 + 0.5 - self.half_w) / self.focal));

        let yaw_u = camera.yaw / TAU * sky_parallax.x;
        self.sky_u.clear();
        self.sky_u.extend(
            self.column_x_over_z
                .iter()
                .map(|&cx| cx.atan() / TAU * sky_parallax.x - yaw_u),
        );
        self.sky_v_offset = camera.pitch / TAU * sky_parallax.y - self.y_center;
    }

    #[inline]
    pub fn eye(&self) -> Vec3 {
        self.camera.pos
    }

    #[inline]
    pub fn to_view(&self, p: Vec2) -> Vec2 {
        self.camera.to_cam(p)
    }

    #[inline]
    pub fn screen_x(&self, v: Vec2) -> f32 {
        self.half_w + v.x * self.focal / v.y
    }

    /// Screen Y of world height `h` at view depth `z`.
    #[inline]
    pub fn screen_y(&self, h: f32, z: f32) -> f32 {
        self.y_center - (h - self.camera.pos.z) * self.focal_aspect / z
    }

    /// First pixel column/row whose centre lies at or past `s`.
    #[inline]
    pub fn first_pixel(s: f32) -> i32 {
        (s - 0.5).ceil() as i32
    }

    /// Last pixel column/row whose centre lies before `s`.
    #[inline]
    pub fn last_pixel(s: f32) -> i32 {
        (s - 0.5).ceil() as i32 - 1
    }

    /// World height seen at the centre of row `y` on a surface at depth `z`.
    #[inline]
    pub fn height_at_row(&self, y: i32, z: f32) -> f32 {
        self.camera.pos.z + (self.y_center - (y as f32 + 0.5)) * z / self.focal_aspect
    }

    /// Depth of a horizontal plane at height `h` along row `y`, if the row
    /// can see it at all.
    #[inline]
    pub fn plane_depth(&self, h: f32, y: i32) -> Option<f32> {
        let dy = self.y_center - (y as f32 + 0.5);
        let z = (h - self.camera.pos.z) * self.focal_aspect / dy;
        (z.is_finite() && z > 0.0).then_some(z)
    }
}
