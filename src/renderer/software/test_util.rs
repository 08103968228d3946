//! Hand-built levels and a predictable texture bank for renderer tests.
//!
//! Every texture is one solid colour, and the colormap replaces any
//! non-transparent index with the light level itself, so a pixel reveals
//! both which surface wrote it and whether it went through lighting.

use glam::{Vec2, Vec3, vec2};

use crate::world::{
    Camera, Colormap, LIGHT_LEVELS, Level, LevelBuilder, SectorId, TRANSPARENT, Texture,
    TextureBank, TextureId, WallId,
};

pub const FLOOR_COLOR: u8 = 50;
pub const CEIL_COLOR: u8 = 60;
pub const WALL_COLOR: u8 = 70;
pub const SKY_COLOR: u8 = 80;
pub const STEP_COLOR: u8 = 90;
pub const SIGN_COLOR: u8 = 100;
pub const MASK_COLOR: u8 = 110;
pub const SPRITE_COLOR: u8 = 120;

pub fn solid(name: &str, color: u8) -> Texture {
    Texture {
        name: name.into(),
        w: 8,
        h: 8,
        pixels: vec![color; 64],
    }
}

/// Level-revealing colormap: `map[level][i] = level` for every opaque `i`.
pub fn level_colormap() -> Colormap {
    let mut map = Colormap::default();
    for (level, row) in map.0.iter_mut().enumerate().take(LIGHT_LEVELS) {
        for (i, v) in row.iter_mut().enumerate() {
            *v = if i == TRANSPARENT as usize { TRANSPARENT } else { level as u8 };
        }
    }
    map
}

pub fn bank() -> TextureBank {
    let mut bank = TextureBank::default_with_checker();
    bank.set_colormap(level_colormap());
    for (name, color) in [
        ("FLOOR", FLOOR_COLOR),
        ("CEIL", CEIL_COLOR),
        ("WALL", WALL_COLOR),
        ("SKY", SKY_COLOR),
        ("STEP", STEP_COLOR),
        ("SIGN", SIGN_COLOR),
        ("MASK", MASK_COLOR),
        ("SPRITE", SPRITE_COLOR),
    ] {
        bank.insert(name, solid(name, color)).unwrap();
    }
    bank
}

pub fn tex(bank: &TextureBank, name: &str) -> TextureId {
    bank.id(name).unwrap()
}

/// Camera with yaw and FoV given in degrees.
pub fn camera(pos: Vec3, yaw_deg: f32, fov_deg: f32) -> Camera {
    Camera::new(pos, yaw_deg.to_radians(), fov_deg.to_radians())
}

/// Axis-aligned clockwise rectangle.
pub fn rect(x0: f32, y0: f32, x1: f32, y1: f32) -> [Vec2; 4] {
    [vec2(x0, y0), vec2(x0, y1), vec2(x1, y1), vec2(x1, y0)]
}

/// Paint every surface of `level`: walls `WALL`, strips `STEP`, flats, sky.
pub fn paint(level: &mut Level, bank: &TextureBank) {
    level.sky_tex = Some(tex(bank, "SKY"));
    for s in &mut level.sectors {
        s.floor.tex = Some(tex(bank, "FLOOR"));
        s.ceil.tex = Some(tex(bank, "CEIL"));
        for w in &mut s.walls {
            w.mid.tex = Some(tex(bank, "WALL"));
            w.top.tex = Some(tex(bank, "STEP"));
            w.bot.tex = Some(tex(bank, "STEP"));
        }
    }
}

pub fn room_level(size: f32, floor: f32, ceil: f32, ambient: i32) -> (Level, TextureBank) {
    let bank = bank();
    let mut b = LevelBuilder::new("ROOM");
    b.add_sector(&rect(0.0, 0.0, size, size), floor, ceil).unwrap();
    let mut level = b.build().unwrap();
    level.sectors[0].set_ambient(ambient);
    paint(&mut level, &bank);
    (level, bank)
}

/// Sector 0 = `[0,20]²` (floor 0, ceiling 10), sector 1 = `[0,20]×[20,40]`.
pub fn two_rooms(floor_b: f32, ceil_b: f32) -> (Level, TextureBank) {
    let bank = bank();
    let mut b = LevelBuilder::new("TWO");
    b.add_sector(&rect(0.0, 0.0, 20.0, 20.0), 0.0, 10.0).unwrap();
    b.add_sector(&rect(0.0, 20.0, 20.0, 40.0), floor_b, ceil_b).unwrap();
    let mut level = b.build().unwrap();
    paint(&mut level, &bank);
    (level, bank)
}

/// `n` sectors of 10×10 in a row along +x, all floor 0 / ceiling 10.
pub fn corridor(n: usize) -> (Level, TextureBank) {
    let bank = bank();
    let mut b = LevelBuilder::new("CORRIDOR");
    for i in 0..n {
        let x = i as f32 * 10.0;
        b.add_sector(&rect(x, 0.0, x + 10.0, 10.0), 0.0, 10.0).unwrap();
    }
    let mut level = b.build().unwrap();
    paint(&mut level, &bank);
    (level, bank)
}

/// Wall of `from` that adjoins `to`.
pub fn portal_wall(level: &Level, from: SectorId, to: SectorId) -> WallId {
    level.sectors[from as usize]
        .walls
        .iter()
        .position(|w| w.adjoin == Some(to))
        .unwrap() as WallId
}

/// Solid wall of sector `s` running from `a` to `b`.
pub fn wall_at(level: &Level, s: SectorId, a: Vec2, b: Vec2) -> WallId {
    let sector = &level.sectors[s as usize];
    sector
        .walls
        .iter()
        .position(|w| sector.wall_points(w) == (a, b))
        .unwrap() as WallId
}
