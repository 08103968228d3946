mod camera;
mod geometry;
mod helpers;
mod texture;

pub use geometry::{
    FlatSurface, Level, Model3d, ModelFace, Object, ObjectFlags, ObjectId, ObjectKind, Sector,
    SectorDirty, SectorFlags, SectorId, VertexId, Wall, WallFlags, WallId, WallSurface,
};

pub use camera::{Camera, MAX_PITCH};

pub use helpers::{LevelBuilder, LevelError, box_model, demo_level, signed_area};

pub use texture::{
    Colormap, LIGHT_LEVELS, NO_TEXTURE, Palette, TRANSPARENT, Texture, TextureBank, TextureError,
    TextureId, ramp_index,
};
