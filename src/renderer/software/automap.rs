use glam::Vec2;

use crate::{
    renderer::{Pixel, Renderer, software::Software},
    world::{Camera, Level, ramp_index},
};

pub const SOLID_WALL_COLOR: Pixel = ramp_index(1, 28);
pub const ADJOIN_COLOR: Pixel = ramp_index(3, 20);
pub const CAMERA_COLOR: Pixel = ramp_index(6, 31);

/// Camera marker length in pixels.
const MARKER_LEN: f32 = 8.0;

impl Software {
    /// Top-down line map centred on the camera, north up.
    ///
    /// `scale` is in pixels per map unit; call between `begin_frame` and
    /// `end_frame` like any other drawing.
    pub fn draw_automap(&mut self, level: &Level, camera: &Camera, scale: f32) {
        if scale <= 0.0 || self.width == 0 {
            return;
        }
        let (cx, cy) = (self.width as f32 * 0.5, self.height as f32 * 0.5);
        let eye = camera.pos.truncate();
        let to_screen = |p: Vec2| -> (i32, i32) {
            let d = (p - eye) * scale;
            ((cx + d.x).floor() as i32, (cy - d.y).floor() as i32)
        };

        // adjoins after solids so portals stay visible where lines meet
        for solid_pass in [true, false] {
            for s in &level.sectors {
                for w in s.walls.iter().filter(|w| w.is_solid() == solid_pass) {
                    let (a, b) = s.wall_points(w);
                    let ((x0, y0), (x1, y1)) = (to_screen(a), to_screen(b));
                    let color = if solid_pass { SOLID_WALL_COLOR } else { ADJOIN_COLOR };
                    self.draw_line(x0, y0, x1, y1, color);
                }
            }
        }

        /*──────── camera arrow ────────*/
        let len = MARKER_LEN / scale;
        let (fwd, right) = (camera.forward(), camera.right());
        let tip = eye + fwd * len * 0.5;
        let tail = eye - fwd * len * 0.5;
        let (ex, ey) = to_screen(tail);
        let (tx, ty) = to_screen(tip);
        self.draw_line(ex, ey, tx, ty, CAMERA_COLOR);
        for side in [-1.0, 1.0] {
            let wing = eye + right * (side * len * 0.3);
            let (wx, wy) = to_screen(wing);
            self.draw_line(wx, wy, tx, ty, CAMERA_COLOR);
        }
    }
}
