//! Portal ("adjoin") based 2.5D software renderer.
//!
//! * [`world`] holds the sector database, camera and decoded textures.
//! * [`renderer`] turns them into an 8-bit paletted frame on the CPU.

pub mod renderer;
pub mod world;
