use bitflags::bitflags;
use glam::{Vec2, Vec3};
use smallvec::SmallVec;

use crate::world::texture::TextureId;

pub type SectorId = u16;
pub type WallId = u16;
pub type VertexId = u16;
pub type ObjectId = u16;

/// Runtime snapshot of one level.
///
/// Geometry is immutable in shape (vertex/wall counts) after load; gameplay
/// mutates heights, light and offsets through the `Sector` setters so the
/// renderer can refresh only what changed.
#[derive(Debug, Clone)]
pub struct Level {
    pub name: String,
    pub sectors: Vec<Sector>,
    /// Sky scroll rate in texels per full turn (x = yaw, y = pitch).
    pub sky_parallax: Vec2,
    /// Texture drawn into exterior ceilings and pit floors.
    pub sky_tex: Option<TextureId>,
}

/*--------------------------- sectors --------------------------------*/

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct SectorFlags: u32 {
        /// Ceiling is open sky.
        const EXTERIOR        = 0x0001;
        /// Floor is open sky (bottomless pit).
        const PIT             = 0x0002;
        /// Walls record occlusion but never write texels.
        const NO_WALL_DRAW    = 0x0004;
        /// Upper strips towards another exterior sector show sky.
        const EXTERIOR_ADJOIN = 0x0008;
        /// Lower strips towards another pit sector show sky.
        const PIT_ADJOIN      = 0x0010;
    }
}

bitflags! {
    /// Attributes changed since the renderer last refreshed its cache.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct SectorDirty: u32 {
        const HEIGHTS      = 0x0001;
        const VERTICES     = 0x0002;
        const WALL_SHAPE   = 0x0004;
        const WALL_OFFSETS = 0x0008;
        const AMBIENT      = 0x0010;
        const FLAGS        = 0x0020;
        const ALL          = 0x003F;
    }
}

/// Floor or ceiling material.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlatSurface {
    pub tex: Option<TextureId>,
    /// Texel offset applied to world-space UVs.
    pub offset: Vec2,
}

#[derive(Debug, Clone)]
pub struct Sector {
    /// Polygon loop, clockwise seen from above (interior on the right).
    pub vertices: Vec<Vec2>,
    pub walls: Vec<Wall>,
    pub objects: Vec<Object>,
    pub floor: FlatSurface,
    pub ceil: FlatSurface,
    pub floor_height: f32,
    pub ceil_height: f32,
    /// 0 ‥ `MAX_LIGHT_LEVEL`; at or above it the sector is fully lit.
    pub ambient: i32,
    pub flags: SectorFlags,
    pub dirty: SectorDirty,
}

impl Sector {
    pub fn set_heights(&mut self, floor_height: f32, ceil_height: f32) {
        self.floor_height = floor_height;
        self.ceil_height = ceil_height;
        self.dirty.insert(SectorDirty::HEIGHTS);
    }

    pub fn set_ambient(&mut self, ambient: i32) {
        self.ambient = ambient;
        self.dirty.insert(SectorDirty::AMBIENT);
    }

    pub fn set_flags(&mut self, flags: SectorFlags) {
        self.flags = flags;
        self.dirty.insert(SectorDirty::FLAGS);
    }

    /// Move one polygon vertex (morphing sectors / sliding doors).
    pub fn move_vertex(&mut self, idx: VertexId, pos: Vec2) {
        if let Some(v) = self.vertices.get_mut(idx as usize) {
            *v = pos;
            self.dirty
                .insert(SectorDirty::VERTICES | SectorDirty::WALL_SHAPE);
        }
    }

    /// Scroll the textures of one wall.
    pub fn set_wall_offsets(&mut self, wall: WallId, top: Vec2, mid: Vec2, bot: Vec2) {
        if let Some(w) = self.walls.get_mut(wall as usize) {
            w.top.offset = top;
            w.mid.offset = mid;
            w.bot.offset = bot;
            self.dirty.insert(SectorDirty::WALL_OFFSETS);
        }
    }

    #[inline]
    pub fn wall_points(&self, wall: &Wall) -> (Vec2, Vec2) {
        (
            self.vertices[wall.v0 as usize],
            self.vertices[wall.v1 as usize],
        )
    }

    /// Even-odd containment test; works for the non-convex loops too.
    pub fn contains(&self, p: Vec2) -> bool {
        let n = self.vertices.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[j];
            if (a.y > p.y) != (b.y > p.y) {
                let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}

/*----------------------------- walls --------------------------------*/

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct WallFlags: u32 {
        /// Mirror the texture along the wall.
        const FLIP_HORIZ   = 0x0001;
        /// Strips anchor to this sector's own floor/ceiling instead of the neighbour's.
        const TEX_ANCHORED = 0x0002;
        /// Draw the see-through mid texture across an adjoin.
        const ADJ_MID_TEX  = 0x0004;
        /// Sign overlay ignores lighting.
        const ILLUM_SIGN   = 0x0008;
    }
}

/// One textured layer of a wall.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WallSurface {
    pub tex: Option<TextureId>,
    /// Texel offset: x along the wall, y downwards from the anchor.
    pub offset: Vec2,
}

#[derive(Debug, Clone)]
pub struct Wall {
    pub v0: VertexId,
    pub v1: VertexId,
    /// Neighbouring sector seen through this wall; `None` = solid.
    pub adjoin: Option<SectorId>,
    /// Matching wall index inside `adjoin`.
    pub mirror: Option<WallId>,
    pub top: WallSurface,
    pub mid: WallSurface,
    pub bot: WallSurface,
    pub sign: WallSurface,
    /// Signed light bias added after distance attenuation.
    pub light: i32,
    pub flags: WallFlags,
}

impl Wall {
    pub fn new(v0: VertexId, v1: VertexId) -> Self {
        Self {
            v0,
            v1,
            adjoin: None,
            mirror: None,
            top: WallSurface::default(),
            mid: WallSurface::default(),
            bot: WallSurface::default(),
            sign: WallSurface::default(),
            light: 0,
            flags: WallFlags::empty(),
        }
    }

    #[inline]
    pub fn is_solid(&self) -> bool {
        self.adjoin.is_none()
    }
}

/*--------------------------- objects --------------------------------*/

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct ObjectFlags: u32 {
        const FULLBRIGHT = 0x0001;
        /// 3-D model other objects stand on; drawn before the sorted pass.
        const BRIDGE     = 0x0002;
    }
}

#[derive(Debug, Clone)]
pub struct ModelFace {
    /// Convex loop into `Model3d::vertices`.
    pub indices: SmallVec<[u16; 4]>,
    /// Base palette index.
    pub color: u8,
}

/// Flat-coloured polygon mesh in object-local space (z up).
#[derive(Debug, Clone, Default)]
pub struct Model3d {
    pub vertices: Vec<Vec3>,
    pub faces: Vec<ModelFace>,
}

#[derive(Debug, Clone)]
pub enum ObjectKind {
    /// Camera-facing billboard; `size` is world width × height.
    Sprite { tex: TextureId, size: Vec2 },
    Model(Model3d),
}

#[derive(Debug, Clone)]
pub struct Object {
    /// x, y on the map; z = world height of the object's base.
    pub pos: Vec3,
    pub yaw: f32,
    pub kind: ObjectKind,
    pub flags: ObjectFlags,
}

impl Level {
    /// First sector whose polygon contains `p`.
    pub fn sector_at(&self, p: Vec2) -> Option<SectorId> {
        self.sectors
            .iter()
            .position(|s| s.contains(p))
            .map(|i| i as SectorId)
    }

    #[inline]
    pub fn sector(&self, id: SectorId) -> Option<&Sector> {
        self.sectors.get(id as usize)
    }
}
