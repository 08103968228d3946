//! Objects of the current sector, drawn once its walls and adjoins are done.
//!
//! * Billboards face the camera and stand on `pos.z`.
//! * Models are flat-shaded convex faces, painter-sorted per object.
//! * Bridges go first, nearest first; every later bridge only fills rows a
//!   nearer one left uncovered. Everything else follows back to front.
//!
//! All of them clip against the window of the current depth and are
//! rejected per column where a wall is nearer (`depth1d`).

use glam::{Vec2, Vec3, vec3};
use smallvec::SmallVec;

use crate::{
    renderer::software::{
        Software,
        columns::{Fixed, TexColumn, draw_column, fill_column},
        lighting::compute_lighting,
        projection::{NEAR_PLANE, Projection},
    },
    world::{Level, Model3d, Object, ObjectFlags, ObjectKind, TextureBank, TextureId},
};

/// Model face ready for rasterisation: screen points plus depth range.
struct ScreenFace {
    points: SmallVec<[Vec2; 8]>,
    z_min: f32,
    z_avg: f32,
    color: u8,
}

impl Software {
    pub(super) fn draw_objects(&mut self, level: &Level, bank: &TextureBank) {
        let ctx = self.ctx;
        let Some(src) = level.sector(ctx.sector) else {
            return;
        };
        if src.objects.is_empty() {
            return;
        }
        let Some(cached) = self.cache.sector(ctx.sector) else {
            return;
        };

        let mut bridges: SmallVec<[(usize, Vec2); 4]> = SmallVec::new();
        let mut rest: SmallVec<[(usize, Vec2); 16]> = SmallVec::new();
        for (i, obj) in src.objects.iter().enumerate() {
            let Some(&view) = cached.obj_view.get(i) else {
                continue;
            };
            if obj.flags.contains(ObjectFlags::BRIDGE) {
                bridges.push((i, view));
            } else {
                rest.push((i, view));
            }
        }
        bridges.sort_by(|a, b| a.1.y.total_cmp(&b.1.y));
        rest.sort_by(|a, b| b.1.y.total_cmp(&a.1.y));

        if !bridges.is_empty() && ctx.x0 <= ctx.x1 {
            self.bridge_rows[ctx.x0 as usize..=ctx.x1 as usize].fill((1, 0));
        }
        for &(i, view) in &bridges {
            self.draw_object(&src.objects[i], view, bank, true);
        }
        for &(i, view) in &rest {
            self.draw_object(&src.objects[i], view, bank, false);
        }
    }

    fn draw_object(&mut self, obj: &Object, view: Vec2, bank: &TextureBank, bridge: bool) {
        match &obj.kind {
            ObjectKind::Sprite { tex, size } => self.draw_sprite(obj, *tex, *size, view, bank),
            ObjectKind::Model(model) => self.draw_model(obj, model, bank, bridge),
        }
    }

    /*──────────────────────── billboards ────────────────────────*/

    fn draw_sprite(&mut self, obj: &Object, tex: TextureId, size: Vec2, view: Vec2, bank: &TextureBank) {
        let ctx = self.ctx;
        let z = view.y;
        if z < NEAR_PLANE || size.x <= 0.0 || size.y <= 0.0 {
            return;
        }
        let Some(tex) = bank.surface(Some(tex)) else {
            return;
        };

        let scale = self.proj.focal / z;
        let xc = self.proj.half_w + view.x * scale;
        let half = size.x * 0.5 * scale;
        let (sx0, sx1) = (xc - half, xc + half);
        let x0 = Projection::first_pixel(sx0).max(ctx.x0);
        let x1 = Projection::last_pixel(sx1).min(ctx.x1);
        if x0 > x1 {
            return;
        }

        let y_top = self.proj.screen_y(obj.pos.z + size.y, z);
        let y_bot = self.proj.screen_y(obj.pos.z, z);
        let (ya, yb) = (Projection::first_pixel(y_top), Projection::last_pixel(y_bot));
        let du = tex.w as f32 / (sx1 - sx0);
        let dv = tex.h as f32 / (y_bot - y_top);

        let light = if obj.flags.contains(ObjectFlags::FULLBRIGHT) {
            None
        } else {
            compute_lighting(z, 0, ctx.ambient, &self.light_env, bank.colormap())
        };

        for x in x0..=x1 {
            if z >= self.windows.depth_at(ctx.depth, x) {
                continue;
            }
            let Some((wt, wb)) = self.windows.column(ctx.depth, x) else {
                continue;
            };
            let (y0, y1) = (ya.max(wt), yb.min(wb));
            if y0 > y1 {
                continue;
            }
            let u = ((x as f32 + 0.5 - sx0) * du).floor() as i32;
            let v = (y0 as f32 + 0.5 - y_top) * dv;
            let col = TexColumn {
                tex,
                u: u.clamp(0, tex.w as i32 - 1),
                v: Fixed::from_f32(v.max(0.0)),
                dv: Fixed::from_f32(dv),
            };
            draw_column(&mut self.scratch, self.width, x, y0, y1, col, light, true);
        }
    }

    /*──────────────────────── 3-D models ────────────────────────*/

    fn draw_model(&mut self, obj: &Object, model: &Model3d, bank: &TextureBank, bridge: bool) {
        let ctx = self.ctx;
        let eye = self.proj.eye();
        let (s, c) = obj.yaw.sin_cos();

        let world: SmallVec<[Vec3; 16]> = model
            .vertices
            .iter()
            .map(|v| obj.pos + vec3(v.x * c - v.y * s, v.x * s + v.y * c, v.z))
            .collect();
        // x = lateral, y = depth, z = height
        let view: SmallVec<[Vec3; 16]> = world
            .iter()
            .map(|w| {
                let v = self.proj.to_view(w.truncate());
                vec3(v.x, v.y, w.z)
            })
            .collect();

        let mut faces: SmallVec<[ScreenFace; 8]> = SmallVec::new();
        for face in &model.faces {
            if face.indices.len() < 3 || face.indices.iter().any(|&i| i as usize >= world.len()) {
                continue;
            }
            let a = world[face.indices[0] as usize];
            let b = world[face.indices[1] as usize];
            let cc = world[face.indices[2] as usize];
            if (b - a).cross(cc - a).dot(eye - a) <= 0.0 {
                continue;
            }

            let poly: SmallVec<[Vec3; 8]> = face.indices.iter().map(|&i| view[i as usize]).collect();
            let poly = clip_near(&poly);
            if poly.len() < 3 {
                continue;
            }
            let z_min = poly.iter().map(|p| p.y).fold(f32::MAX, f32::min);
            let z_avg = poly.iter().map(|p| p.y).sum::<f32>() / poly.len() as f32;
            let points = poly
                .iter()
                .map(|p| Vec2::new(self.proj.screen_x(p.truncate()), self.proj.screen_y(p.z, p.y)))
                .collect();
            faces.push(ScreenFace {
                points,
                z_min,
                z_avg,
                color: face.color,
            });
        }
        faces.sort_by(|a, b| b.z_avg.total_cmp(&a.z_avg));

        let fullbright = obj.flags.contains(ObjectFlags::FULLBRIGHT);
        let mut covered: SmallVec<[(i32, i32, i32); 64]> = SmallVec::new();
        for face in &faces {
            let color = if fullbright {
                face.color
            } else {
                compute_lighting(face.z_avg, 0, ctx.ambient, &self.light_env, bank.colormap())
                    .map_or(face.color, |map| map[face.color as usize])
            };
            let (lo, hi) = face
                .points
                .iter()
                .fold((f32::MAX, f32::MIN), |(lo, hi), p| (lo.min(p.x), hi.max(p.x)));
            let x0 = Projection::first_pixel(lo).max(ctx.x0);
            let x1 = Projection::last_pixel(hi).min(ctx.x1);

            for x in x0..=x1 {
                if face.z_min >= self.windows.depth_at(ctx.depth, x) {
                    continue;
                }
                let Some((wt, wb)) = self.windows.column(ctx.depth, x) else {
                    continue;
                };
                let Some((ya, yb)) = column_span(&face.points, x as f32 + 0.5) else {
                    continue;
                };
                let (y0, y1) = (Projection::first_pixel(ya).max(wt), Projection::last_pixel(yb).min(wb));
                if y0 > y1 {
                    continue;
                }
                if bridge {
                    // rows a nearer bridge already owns stay untouched
                    let (ct, cb) = self.bridge_rows[x as usize];
                    if ct <= cb {
                        fill_column(&mut self.scratch, self.width, x, y0, y1.min(ct - 1), color);
                        fill_column(&mut self.scratch, self.width, x, y0.max(cb + 1), y1, color);
                    } else {
                        fill_column(&mut self.scratch, self.width, x, y0, y1, color);
                    }
                    covered.push((x, y0, y1));
                } else {
                    fill_column(&mut self.scratch, self.width, x, y0, y1, color);
                }
            }
        }

        for (x, y0, y1) in covered {
            let span = &mut self.bridge_rows[x as usize];
            *span = if span.0 <= span.1 {
                (span.0.min(y0), span.1.max(y1))
            } else {
                (y0, y1)
            };
        }
    }
}

/// Clip a view-space polygon against `depth >= NEAR_PLANE`.
fn clip_near(poly: &[Vec3]) -> SmallVec<[Vec3; 8]> {
    let mut out = SmallVec::new();
    for (i, &cur) in poly.iter().enumerate() {
        let prev = poly[(i + poly.len() - 1) % poly.len()];
        let (cin, pin) = (cur.y >= NEAR_PLANE, prev.y >= NEAR_PLANE);
        if cin != pin {
            let t = (NEAR_PLANE - prev.y) / (cur.y - prev.y);
            out.push(prev + (cur - prev) * t);
        }
        if cin {
            out.push(cur);
        }
    }
    out
}

/// Vertical extent of a convex screen polygon along the line `x = xc`.
fn column_span(points: &[Vec2], xc: f32) -> Option<(f32, f32)> {
    let mut span: Option<(f32, f32)> = None;
    for (i, &p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        let crosses = (p.x <= xc && xc < q.x) || (q.x <= xc && xc < p.x);
        if !crosses {
            continue;
        }
        let y = p.y + (xc - p.x) / (q.x - p.x) * (q.y - p.y);
        span = Some(match span {
            Some((lo, hi)) => (lo.min(y), hi.max(y)),
            None => (y, y),
        });
    }
    span
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::{Renderer, software::test_util::*};
    use crate::world::box_model;
    use glam::vec2;

    fn sprite(pos: Vec3, tex: TextureId, size: Vec2) -> Object {
        Object {
            pos,
            yaw: 0.0,
            kind: ObjectKind::Sprite { tex, size },
            flags: ObjectFlags::empty(),
        }
    }

    fn model(pos: Vec3, color: u8, flags: ObjectFlags) -> Object {
        Object {
            pos,
            yaw: 0.0,
            kind: ObjectKind::Model(box_model(vec3(-1.0, -1.0, 0.0), vec3(1.0, 1.0, 2.0), color)),
            flags,
        }
    }

    fn render(level: &mut Level, bank: &TextureBank, pos: Vec3) -> Software {
        let mut sw = Software::default();
        sw.begin_frame(64, 48);
        sw.draw_level(level, &camera(pos, 90.0, 90.0), bank);
        sw
    }

    #[test]
    fn near_clip_cuts_the_polygon() {
        let tri = [vec3(0.0, -1.0, 0.0), vec3(1.0, 2.0, 0.0), vec3(-1.0, 2.0, 0.0)];
        let out = clip_near(&tri);
        assert_eq!(out.len(), 4);
        assert!(out.iter().all(|p| p.y >= NEAR_PLANE - 1e-5));
        assert!(clip_near(&[vec3(0.0, -1.0, 0.0), vec3(1.0, -2.0, 0.0), vec3(0.0, -3.0, 0.0)]).is_empty());
    }

    #[test]
    fn span_of_a_square() {
        let sq = [vec2(0.0, 0.0), vec2(4.0, 0.0), vec2(4.0, 3.0), vec2(0.0, 3.0)];
        assert_eq!(column_span(&sq, 1.5), Some((0.0, 3.0)));
        assert_eq!(column_span(&sq, 5.0), None);
    }

    #[test]
    fn sprite_in_front_of_the_wall_is_drawn() {
        let (mut level, bank) = room_level(40.0, 0.0, 10.0, 31);
        let t = tex(&bank, "SPRITE");
        level.sectors[0].objects.push(sprite(vec3(20.0, 30.0, 4.0), t, vec2(2.0, 2.0)));
        let sw = render(&mut level, &bank, vec3(20.0, 20.0, 5.0));
        // base 4 → top 6 at depth 10: rows 21..=26
        assert_eq!(sw.framebuffer()[24 * 64 + 32], SPRITE_COLOR);
        assert_eq!(sw.framebuffer()[24 * 64 + 20], WALL_COLOR);
    }

    #[test]
    fn sprite_behind_the_wall_is_culled() {
        let (mut level, bank) = room_level(40.0, 0.0, 10.0, 31);
        let t = tex(&bank, "SPRITE");
        level.sectors[0].objects.push(sprite(vec3(20.0, 50.0, 4.0), t, vec2(6.0, 6.0)));
        let sw = render(&mut level, &bank, vec3(20.0, 20.0, 5.0));
        assert!(sw.framebuffer().iter().all(|&p| p != SPRITE_COLOR));
    }

    #[test]
    fn portal_strip_clips_sprites_beyond() {
        let (mut level, bank) = two_rooms(2.0, 10.0);
        let t = tex(&bank, "SPRITE");
        level.sectors[1].objects.push(sprite(vec3(10.0, 30.0, 0.0), t, vec2(2.0, 2.0)));
        let sw = render(&mut level, &bank, vec3(10.0, 2.0, 5.0));
        let fb = sw.framebuffer();
        assert_eq!(fb[28 * 64 + 32], SPRITE_COLOR);
        assert_eq!(fb[29 * 64 + 32], STEP_COLOR, "step strip must hide the sprite's feet");
    }

    #[test]
    fn dark_sprite_is_lit_unless_fullbright() {
        let (mut level, bank) = room_level(40.0, 0.0, 10.0, 5);
        let t = tex(&bank, "SPRITE");
        level.sectors[0].objects.push(sprite(vec3(16.0, 30.0, 4.0), t, vec2(2.0, 2.0)));
        let mut lamp = sprite(vec3(24.0, 30.0, 4.0), t, vec2(2.0, 2.0));
        lamp.flags = ObjectFlags::FULLBRIGHT;
        level.sectors[0].objects.push(lamp);
        let sw = render(&mut level, &bank, vec3(20.0, 20.0, 5.0));
        let fb = sw.framebuffer();
        assert!(fb[24 * 64 + 19] < 32, "lit sprite must come out as a light level");
        assert_eq!(fb[24 * 64 + 44], SPRITE_COLOR);
    }

    #[test]
    fn model_faces_are_culled_and_sorted() {
        let (mut level, bank) = room_level(40.0, 0.0, 10.0, 31);
        level.sectors[0]
            .objects
            .push(model(vec3(20.0, 30.0, 0.0), 130, ObjectFlags::FULLBRIGHT));
        let sw = render(&mut level, &bank, vec3(20.0, 20.0, 5.0));
        let fb = sw.framebuffer();
        // south face (index 2) at depth 9, top face above it
        assert_eq!(fb[38 * 64 + 32], 126);
        assert_eq!(fb[33 * 64 + 32], 130);
        assert!(fb.iter().all(|&p| p != 128), "bottom face faces away");
    }

    #[test]
    fn nearer_bridge_wins() {
        let (mut level, bank) = room_level(40.0, 0.0, 10.0, 31);
        let flags = ObjectFlags::BRIDGE | ObjectFlags::FULLBRIGHT;
        level.sectors[0].objects.push(model(vec3(20.0, 26.0, 0.0), 150, flags));
        level.sectors[0].objects.push(model(vec3(20.0, 32.0, 0.0), 170, flags));
        let sw = render(&mut level, &bank, vec3(20.0, 20.0, 5.0));
        let fb = sw.framebuffer();
        // near top face owns row 38, the far south face shows above it
        assert_eq!(fb[38 * 64 + 32], 150);
        assert_eq!(fb[35 * 64 + 32], 166);
    }
}
