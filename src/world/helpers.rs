use glam::{Vec2, Vec3, vec2, vec3};
use smallvec::smallvec;
use thiserror::Error;

use super::geometry::{
    FlatSurface, Level, Model3d, ModelFace, Object, ObjectFlags, ObjectKind, Sector,
    SectorDirty, SectorFlags, SectorId, Wall, WallFlags, WallId, WallSurface,
};
use super::texture::{Colormap, Palette, Texture, TextureBank, TextureId};

/// Two vertices closer than this are the same point when pairing adjoins.
const WELD_EPS: f32 = 1e-3;

/// Ambient given to new sectors: fully lit.
const DEFAULT_AMBIENT: i32 = 31;

/// Problems found while assembling a level.
#[derive(Debug, Error, PartialEq)]
pub enum LevelError {
    #[error("sector {0} needs at least 3 vertices")]
    TooFewVertices(SectorId),

    #[error("sector {sector} wall {wall} references vertex {vertex} out of range")]
    BadVertex {
        sector: SectorId,
        wall: WallId,
        vertex: u16,
    },

    #[error("sector {sector} wall {wall} adjoins missing sector {target}")]
    BadAdjoin {
        sector: SectorId,
        wall: WallId,
        target: SectorId,
    },

    #[error("sector {sector} wall {wall} adjoins sector {target} but no wall there shares its edge")]
    UnmatchedAdjoin {
        sector: SectorId,
        wall: WallId,
        target: SectorId,
    },

    #[error("sector {0} has its floor above its ceiling")]
    InvertedHeights(SectorId),
}

/// Signed area of a polygon loop; positive = counter-clockwise.
pub fn signed_area(loop_: &[Vec2]) -> f32 {
    let n = loop_.len();
    (0..n)
        .map(|i| loop_[i].perp_dot(loop_[(i + 1) % n]))
        .sum::<f32>()
        * 0.5
}

/// Incremental level assembly used by loaders, tests and the demo map.
///
/// * Vertex loops may come in either winding; they are stored clockwise
///   (interior to the right of every wall), which the renderer relies on
///   for back-face culling.
/// * Walls that share both endpoints with a wall of another sector are
///   paired as adjoins by [`LevelBuilder::build`].
#[derive(Debug, Default)]
pub struct LevelBuilder {
    name: String,
    sectors: Vec<Sector>,
    sky_parallax: Vec2,
    sky_tex: Option<TextureId>,
}

impl LevelBuilder {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            sectors: Vec::new(),
            sky_parallax: vec2(1024.0, 1024.0),
            sky_tex: None,
        }
    }

    pub fn sky(&mut self, tex: TextureId, parallax: Vec2) -> &mut Self {
        self.sky_tex = Some(tex);
        self.sky_parallax = parallax;
        self
    }

    /// Add a sector outlined by `loop_`; every edge becomes a solid wall.
    pub fn add_sector(
        &mut self,
        loop_: &[Vec2],
        floor_height: f32,
        ceil_height: f32,
    ) -> Result<SectorId, LevelError> {
        let id = self.sectors.len() as SectorId;
        if loop_.len() < 3 {
            return Err(LevelError::TooFewVertices(id));
        }
        if floor_height > ceil_height {
            return Err(LevelError::InvertedHeights(id));
        }

        let mut vertices = loop_.to_vec();
        if signed_area(&vertices) > 0.0 {
            vertices.reverse();
        }

        let n = vertices.len() as u16;
        let walls = (0..n).map(|i| Wall::new(i, (i + 1) % n)).collect();

        self.sectors.push(Sector {
            vertices,
            walls,
            objects: Vec::new(),
            floor: FlatSurface::default(),
            ceil: FlatSurface::default(),
            floor_height,
            ceil_height,
            ambient: DEFAULT_AMBIENT,
            flags: SectorFlags::empty(),
            dirty: SectorDirty::ALL,
        });
        Ok(id)
    }

    /// Panics on a bad id: only ids returned by `add_sector` are valid.
    pub fn sector_mut(&mut self, id: SectorId) -> &mut Sector {
        &mut self.sectors[id as usize]
    }

    /// Wall of `sector` running between `a` and `b` in either direction.
    pub fn wall_between(&self, sector: SectorId, a: Vec2, b: Vec2) -> Option<WallId> {
        let s = self.sectors.get(sector as usize)?;
        s.walls
            .iter()
            .position(|w| {
                let (p0, p1) = s.wall_points(w);
                (p0.distance(a) < WELD_EPS && p1.distance(b) < WELD_EPS)
                    || (p0.distance(b) < WELD_EPS && p1.distance(a) < WELD_EPS)
            })
            .map(|i| i as WallId)
    }

    /// Validate indices and pair adjoins.
    pub fn build(mut self) -> Result<Level, LevelError> {
        self.validate()?;
        self.link_adjoins()?;
        Ok(Level {
            name: self.name,
            sectors: self.sectors,
            sky_parallax: self.sky_parallax,
            sky_tex: self.sky_tex,
        })
    }

    fn validate(&self) -> Result<(), LevelError> {
        for (si, s) in self.sectors.iter().enumerate() {
            for (wi, w) in s.walls.iter().enumerate() {
                for v in [w.v0, w.v1] {
                    if v as usize >= s.vertices.len() {
                        return Err(LevelError::BadVertex {
                            sector: si as SectorId,
                            wall: wi as WallId,
                            vertex: v,
                        });
                    }
                }
                if let Some(t) = w.adjoin {
                    if t as usize >= self.sectors.len() {
                        return Err(LevelError::BadAdjoin {
                            sector: si as SectorId,
                            wall: wi as WallId,
                            target: t,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Find the wall in `target` that runs `p1 → p0` (the reverse edge).
    fn find_mirror(&self, target: usize, p0: Vec2, p1: Vec2) -> Option<WallId> {
        let t = &self.sectors[target];
        t.walls
            .iter()
            .position(|w| {
                let (q0, q1) = t.wall_points(w);
                q0.distance(p1) < WELD_EPS && q1.distance(p0) < WELD_EPS
            })
            .map(|i| i as WallId)
    }

    fn link_adjoins(&mut self) -> Result<(), LevelError> {
        let count = self.sectors.len();
        for si in 0..count {
            for wi in 0..self.sectors[si].walls.len() {
                let wall = &self.sectors[si].walls[wi];
                if wall.mirror.is_some() {
                    continue;
                }
                let (p0, p1) = self.sectors[si].wall_points(wall);

                let found = match wall.adjoin {
                    Some(t) => match self.find_mirror(t as usize, p0, p1) {
                        Some(m) => Some((t as usize, m)),
                        None => {
                            return Err(LevelError::UnmatchedAdjoin {
                                sector: si as SectorId,
                                wall: wi as WallId,
                                target: t,
                            });
                        }
                    },
                    None => (0..count)
                        .filter(|&t| t != si)
                        .find_map(|t| self.find_mirror(t, p0, p1).map(|m| (t, m))),
                };

                if let Some((t, m)) = found {
                    let here = &mut self.sectors[si].walls[wi];
                    here.adjoin = Some(t as SectorId);
                    here.mirror = Some(m);
                    let there = &mut self.sectors[t].walls[m as usize];
                    there.adjoin = Some(si as SectorId);
                    there.mirror = Some(wi as WallId);
                }
            }
        }
        Ok(())
    }
}

/*──────────────────────────── demo map ────────────────────────────────*/

fn paint_walls(s: &mut Sector, tex: TextureId) {
    for w in &mut s.walls {
        let surf = WallSurface {
            tex: Some(tex),
            offset: Vec2::ZERO,
        };
        w.top = surf;
        w.mid = surf;
        w.bot = surf;
    }
}

/// Insert `t`, reusing the existing id when the bank already holds `name`.
fn register(bank: &mut TextureBank, name: &str, t: Texture) -> TextureId {
    match bank.insert(name, t) {
        Ok(id) => id,
        Err(_) => bank.id_or_missing(name),
    }
}

fn sprite(pos: Vec3, tex: TextureId, size: Vec2) -> Object {
    Object {
        pos,
        yaw: 0.0,
        kind: ObjectKind::Sprite { tex, size },
        flags: ObjectFlags::empty(),
    }
}

/// Axis-aligned box spanning `min ..= max` in object space.
pub fn box_model(min: Vec3, max: Vec3, color: u8) -> Model3d {
    let vertices = vec![
        vec3(min.x, min.y, min.z),
        vec3(max.x, min.y, min.z),
        vec3(max.x, max.y, min.z),
        vec3(min.x, max.y, min.z),
        vec3(min.x, min.y, max.z),
        vec3(max.x, min.y, max.z),
        vec3(max.x, max.y, max.z),
        vec3(min.x, max.y, max.z),
    ];
    // outward-facing loops, counter-clockwise seen from outside
    let quads: [[u16; 4]; 6] = [
        [4, 5, 6, 7], // top
        [0, 3, 2, 1], // bottom
        [0, 1, 5, 4], // south
        [2, 3, 7, 6], // north
        [1, 2, 6, 5], // east
        [3, 0, 4, 7], // west
    ];
    let faces = quads
        .iter()
        .enumerate()
        .map(|(i, q)| ModelFace {
            indices: smallvec![q[0], q[1], q[2], q[3]],
            color: color.saturating_sub(i as u8 * 2),
        })
        .collect();
    Model3d { vertices, faces }
}

/// Procedural showcase map.
///
/// Registers its textures, palette and colormap in `bank` and returns the
/// level together with a suggested camera start (eye position, yaw).
pub fn demo_level(bank: &mut TextureBank) -> Result<(Level, Vec3, f32), LevelError> {
    use super::texture::ramp_index;

    let palette = Palette::demo();
    bank.set_colormap(Colormap::fade_to_black(&palette));
    bank.set_palette(palette);

    let mut tex = |name: &str, t: Texture| register(bank, name, t);
    let brick = tex("BRICK", Texture::bricks("BRICK", 1));
    let stone = tex("STONE", Texture::bricks("STONE", 3));
    let wood = tex("WOOD", Texture::checker("WOOD", 8, ramp_index(4, 22), ramp_index(4, 16)));
    let floor = tex("FLOOR", Texture::checker("FLOOR", 16, ramp_index(0, 20), ramp_index(0, 14)));
    let moss = tex("MOSS", Texture::checker("MOSS", 16, ramp_index(2, 20), ramp_index(2, 15)));
    let fence = tex("FENCE", Texture::fence("FENCE"));
    let sky = tex("SKY", Texture::gradient_sky("SKY", 5));
    let sign = tex("SIGN", Texture::diamond("SIGN", 16, 6));
    let gem = tex("GEM", Texture::diamond("GEM", 32, 7));
    let lamp = tex("LAMP", Texture::diamond("LAMP", 32, 6));

    let mut b = LevelBuilder::new("DEMO");
    b.sky(sky, vec2(1024.0, 512.0));

    let p = |x: f32, y: f32| vec2(x, y);

    // hall, north wall split in two so each half can lead somewhere else
    let hall = b.add_sector(
        &[p(0.0, 0.0), p(32.0, 0.0), p(32.0, 32.0), p(16.0, 32.0), p(0.0, 32.0)],
        0.0,
        16.0,
    )?;
    // raised alcove: only a lower strip is visible from the hall
    let step = b.add_sector(
        &[p(16.0, 32.0), p(32.0, 32.0), p(32.0, 48.0), p(16.0, 48.0)],
        2.0,
        16.0,
    )?;
    // window: both strips visible from the hall
    let window = b.add_sector(
        &[p(0.0, 32.0), p(16.0, 32.0), p(16.0, 48.0), p(0.0, 48.0)],
        4.0,
        10.0,
    )?;
    let yard = b.add_sector(
        &[p(32.0, 0.0), p(64.0, 0.0), p(64.0, 32.0), p(32.0, 32.0)],
        -2.0,
        40.0,
    )?;
    let pit = b.add_sector(
        &[p(32.0, -16.0), p(64.0, -16.0), p(64.0, 0.0), p(32.0, 0.0)],
        -40.0,
        40.0,
    )?;
    let tower = b.add_sector(
        &[p(64.0, 0.0), p(80.0, 0.0), p(80.0, 32.0), p(64.0, 32.0)],
        0.0,
        24.0,
    )?;

    for (id, walls, flat, ceil, ambient) in [
        (hall, brick, floor, wood, 22),
        (step, brick, wood, wood, 18),
        (window, stone, moss, wood, 14),
        (yard, stone, moss, wood, 28),
        (pit, stone, moss, wood, 26),
        (tower, stone, floor, wood, 20),
    ] {
        let s = b.sector_mut(id);
        paint_walls(s, walls);
        s.floor.tex = Some(flat);
        s.ceil.tex = Some(ceil);
        s.ambient = ambient;
    }

    let outdoor = SectorFlags::EXTERIOR | SectorFlags::EXTERIOR_ADJOIN;
    b.sector_mut(yard).flags = outdoor;
    b.sector_mut(tower).flags = SectorFlags::EXTERIOR;
    b.sector_mut(pit).flags = outdoor | SectorFlags::PIT;

    if let Some(w) = b.wall_between(hall, p(32.0, 0.0), p(32.0, 32.0)) {
        let wall = &mut b.sector_mut(hall).walls[w as usize];
        wall.mid.tex = Some(fence);
        wall.flags |= WallFlags::ADJ_MID_TEX;
    }
    if let Some(w) = b.wall_between(hall, p(0.0, 0.0), p(32.0, 0.0)) {
        let wall = &mut b.sector_mut(hall).walls[w as usize];
        wall.sign = WallSurface {
            tex: Some(sign),
            offset: vec2(120.0, 24.0),
        };
        wall.flags |= WallFlags::ILLUM_SIGN;
        wall.light = 4;
    }

    b.sector_mut(hall)
        .objects
        .push(sprite(vec3(8.0, 24.0, 0.0), gem, vec2(3.0, 3.0)));
    b.sector_mut(yard).objects.push(Object {
        flags: ObjectFlags::FULLBRIGHT,
        ..sprite(vec3(52.0, 20.0, -2.0), lamp, vec2(4.0, 8.0))
    });
    b.sector_mut(pit).objects.push(Object {
        pos: vec3(48.0, -8.0, -2.0),
        yaw: 0.0,
        kind: ObjectKind::Model(box_model(
            vec3(-3.0, -8.0, -1.0),
            vec3(3.0, 8.0, 0.0),
            ramp_index(4, 24),
        )),
        flags: ObjectFlags::BRIDGE,
    });
    b.sector_mut(pit)
        .objects
        .push(sprite(vec3(48.0, -6.0, 0.0), gem, vec2(3.0, 3.0)));

    let level = b.build()?;
    Ok((level, vec3(16.0, 8.0, 5.8), std::f32::consts::FRAC_PI_2))
}
