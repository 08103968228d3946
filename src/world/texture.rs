// Format-agnostic repository of 8-bit textures decoded by the asset loader.
// The renderer and world logic interact through `TextureId` only.

use std::collections::HashMap;

use std::ops::{Index, IndexMut};

/// Runtime handle for a texture in this bank.
///
/// *Guaranteed* to remain stable for the lifetime of the bank.
pub type TextureId = u16;

/// `TextureId` whose pixels are the checkerboard fallback.
/// Always = 0 because `TextureBank::new()` inserts it first.
pub const NO_TEXTURE: TextureId = 0;

/// Number of rows in a [`Colormap`]; row `LIGHT_LEVELS - 1` is full bright.
pub const LIGHT_LEVELS: usize = 32;

/// Palette index treated as a hole by masked walls, signs and sprites.
pub const TRANSPARENT: u8 = 0;

/// Shades per ramp in the generated demo palette.
const RAMP_LEN: u8 = 32;

/// Palette index of `shade` (0 = dark … 31 = bright) in colour ramp `ramp`.
#[inline]
pub const fn ramp_index(ramp: u8, shade: u8) -> u8 {
    ramp * RAMP_LEN + if shade < RAMP_LEN { shade } else { RAMP_LEN - 1 }
}

/// CPU-side storage: palette indices in row-major order.
#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    pub name: String,
    pub w: usize,
    pub h: usize,
    pub pixels: Vec<u8>,
}

/// Convenience checkerboard 8×8 (dark/light grey).
impl Default for Texture {
    fn default() -> Self {
        Texture::checker("CHECKER", 8, ramp_index(0, 24), ramp_index(0, 12))
    }
}

impl Texture {
    /// Non-empty and backed by at least `w * h` texels.
    #[inline]
    pub fn is_drawable(&self) -> bool {
        self.w > 0 && self.h > 0 && self.pixels.len() >= self.w * self.h
    }

    /// Wrap a texel column index, cheap for power-of-two widths.
    #[inline(always)]
    pub fn wrap_u(&self, u: i32) -> usize {
        if self.w.is_power_of_two() {
            (u as usize) & (self.w - 1)
        } else {
            u.rem_euclid(self.w as i32) as usize
        }
    }

    #[inline(always)]
    pub fn wrap_v(&self, v: i32) -> usize {
        if self.h.is_power_of_two() {
            (v as usize) & (self.h - 1)
        } else {
            v.rem_euclid(self.h as i32) as usize
        }
    }

    #[inline(always)]
    pub fn texel(&self, u: usize, v: usize) -> u8 {
        self.pixels[v * self.w + u]
    }

    /// Square checkerboard with `cells` cells per side, 4 texels each.
    pub fn checker(name: &str, cells: usize, light: u8, dark: u8) -> Self {
        let size = cells * 4;
        let mut pixels = vec![0u8; size * size];
        for y in 0..size {
            for x in 0..size {
                pixels[y * size + x] = if ((x / 4) ^ (y / 4)) & 1 == 0 {
                    light
                } else {
                    dark
                };
            }
        }
        Texture {
            name: name.to_string(),
            w: size,
            h: size,
            pixels,
        }
    }

    /// 64×64 running-bond brick pattern using colour ramp `ramp`.
    pub fn bricks(name: &str, ramp: u8) -> Self {
        const S: usize = 64;
        let mut pixels = vec![0u8; S * S];
        for y in 0..S {
            let row = y / 8;
            let shift = if row & 1 == 0 { 0 } else { 8 };
            for x in 0..S {
                let mortar = y % 8 == 7 || (x + shift) % 16 == 15;
                let grain = ((x * 7 + y * 13) % 5) as u8;
                pixels[y * S + x] = if mortar {
                    ramp_index(0, 10)
                } else {
                    ramp_index(ramp, 18 + grain + (row as u8 & 3))
                };
            }
        }
        Texture {
            name: name.to_string(),
            w: S,
            h: S,
            pixels,
        }
    }

    /// 32×64 chain-link fence: diagonal wires, everything else transparent.
    pub fn fence(name: &str) -> Self {
        const W: usize = 32;
        const H: usize = 64;
        let mut pixels = vec![TRANSPARENT; W * H];
        for y in 0..H {
            for x in 0..W {
                if (x + y) % 8 == 0 || (x + H - y) % 8 == 0 || y < 2 {
                    pixels[y * W + x] = ramp_index(0, 26);
                }
            }
        }
        Texture {
            name: name.to_string(),
            w: W,
            h: H,
            pixels,
        }
    }

    /// 256×128 sky: vertical gradient with sparse cloud streaks.
    pub fn gradient_sky(name: &str, ramp: u8) -> Self {
        const W: usize = 256;
        const H: usize = 128;
        let mut pixels = vec![0u8; W * H];
        for y in 0..H {
            let shade = 30 - (y * 20 / H) as u8;
            for x in 0..W {
                let cloud = ((x / 16 + y / 8) % 7 == 0) && y < H / 2;
                pixels[y * W + x] = if cloud {
                    ramp_index(0, 30)
                } else {
                    ramp_index(ramp, shade)
                };
            }
        }
        Texture {
            name: name.to_string(),
            w: W,
            h: H,
            pixels,
        }
    }

    /// Upright billboard: a filled diamond on a transparent background.
    pub fn diamond(name: &str, size: usize, ramp: u8) -> Self {
        let mut pixels = vec![TRANSPARENT; size * size];
        let half = size as i32 / 2;
        for y in 0..size {
            for x in 0..size {
                let d = (x as i32 - half).abs() + (y as i32 - half).abs();
                if d < half {
                    let shade = 31 - (d * 16 / half.max(1)) as u8;
                    pixels[y * size + x] = ramp_index(ramp, shade);
                }
            }
        }
        Texture {
            name: name.to_string(),
            w: size,
            h: size,
            pixels,
        }
    }
}

/// Things that can go wrong when using the bank.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextureError {
    /// Attempted to insert a second texture with an existing name.
    #[error("texture name `{0}` already present in bank")]
    Duplicate(String),

    /// Requested ID is outside `0 .. bank.len()`.
    #[error("texture id {0} out of range")]
    BadId(TextureId),

    /// Zero width or height, or fewer texels than `w * h`.
    #[error("texture `{name}` has unusable size {w}x{h} ({len} texels)")]
    BadSize { name: String, w: usize, h: usize, len: usize },
}

/// 256 colours as 0x00RRGGBB.
#[derive(Clone, Debug, PartialEq)]
pub struct Palette(pub [u32; 256]);
impl Default for Palette {
    fn default() -> Self {
        Palette([0u32; 256])
    }
}
impl Index<usize> for Palette {
    type Output = u32;
    fn index(&self, idx: usize) -> &u32 {
        &self.0[idx]
    }
}
impl IndexMut<usize> for Palette {
    fn index_mut(&mut self, idx: usize) -> &mut u32 {
        &mut self.0[idx]
    }
}

impl Palette {
    /// Build from packed `r, g, b` bytes (256 × 3); missing entries stay black.
    pub fn from_rgb_bytes(bytes: &[u8]) -> Self {
        let mut pal = Palette::default();
        for (i, rgb) in bytes.chunks_exact(3).take(256).enumerate() {
            pal[i] = (rgb[0] as u32) << 16 | (rgb[1] as u32) << 8 | rgb[2] as u32;
        }
        pal
    }

    /// Eight 32-shade ramps: grey, brick, moss, steel, wood, sky, gold, violet.
    pub fn demo() -> Self {
        const BASES: [(u32, u32, u32); 8] = [
            (255, 255, 255),
            (200, 80, 60),
            (90, 170, 70),
            (110, 130, 190),
            (170, 120, 70),
            (120, 180, 255),
            (250, 210, 90),
            (170, 90, 200),
        ];
        let mut pal = Palette::default();
        for (ramp, &(r, g, b)) in BASES.iter().enumerate() {
            for shade in 0..RAMP_LEN as u32 {
                let k = shade + 1;
                let idx = ramp * RAMP_LEN as usize + shade as usize;
                pal[idx] = (r * k / 32) << 16 | (g * k / 32) << 8 | (b * k / 32);
            }
        }
        pal[TRANSPARENT as usize] = 0;
        pal
    }

    /// Expand an 8-bit frame into 0x00RRGGBB pixels.
    pub fn convert(&self, src: &[u8], dst: &mut [u32]) {
        for (d, &s) in dst.iter_mut().zip(src) {
            *d = self.0[s as usize];
        }
    }

    fn nearest(&self, r: i32, g: i32, b: i32) -> u8 {
        let mut best = 0usize;
        let mut best_d = i32::MAX;
        for (i, &c) in self.0.iter().enumerate().skip(1) {
            let dr = ((c >> 16) & 0xFF) as i32 - r;
            let dg = ((c >> 8) & 0xFF) as i32 - g;
            let db = (c & 0xFF) as i32 - b;
            let d = dr * dr + dg * dg + db * db;
            if d < best_d {
                best_d = d;
                best = i;
            }
        }
        best as u8
    }
}

/// Light-level remap tables: `colormap[level][index]` is the lit variant
/// of palette entry `index`.
#[derive(Clone, Debug, PartialEq)]
pub struct Colormap(pub Vec<[u8; 256]>);
impl Default for Colormap {
    /// Identity at every level.
    fn default() -> Self {
        let mut row = [0u8; 256];
        for (i, v) in row.iter_mut().enumerate() {
            *v = i as u8;
        }
        Colormap(vec![row; LIGHT_LEVELS])
    }
}
impl Index<usize> for Colormap {
    type Output = [u8; 256];
    fn index(&self, idx: usize) -> &Self::Output {
        &self.0[idx]
    }
}
impl IndexMut<usize> for Colormap {
    fn index_mut(&mut self, idx: usize) -> &mut [u8; 256] {
        &mut self.0[idx]
    }
}

impl Colormap {
    /// Level `LIGHT_LEVELS-1` is identity, lower levels fade linearly
    /// towards black, matched back to the nearest palette entry.
    pub fn fade_to_black(pal: &Palette) -> Self {
        let mut map = Colormap::default();
        let top = LIGHT_LEVELS - 1;
        for level in 0..top {
            let k = level as i32 + 1;
            for i in 1..256 {
                let c = pal[i];
                let r = ((c >> 16) & 0xFF) as i32 * k / LIGHT_LEVELS as i32;
                let g = ((c >> 8) & 0xFF) as i32 * k / LIGHT_LEVELS as i32;
                let b = (c & 0xFF) as i32 * k / LIGHT_LEVELS as i32;
                map[level][i] = pal.nearest(r, g, b);
            }
            map[level][TRANSPARENT as usize] = TRANSPARENT;
        }
        map
    }

    #[inline]
    pub fn levels(&self) -> usize {
        self.0.len()
    }
}

/// A palette-agnostic, format-agnostic cache of textures.
///
/// * Does **not** know about file formats; decoding is the loader's job.
/// * Stores exactly one copy of every name.
/// * ID **0** is always the “missing” checkerboard.
///
/// **Thread-safety:** access `TextureBank` from a single thread or wrap it
/// in `RwLock`; the struct itself is not `Sync`.
pub struct TextureBank {
    by_name: HashMap<String, TextureId>,
    data: Vec<Texture>,
    palette: Palette,
    colormap: Colormap,
}

impl TextureBank {
    // ---------------------------------------------------------------------
    // Constructors
    // ---------------------------------------------------------------------

    /// Create an empty bank with a mandatory *missing* texture used as
    /// fallback.  The texture is inserted under the fixed name `"MISSING"`
    /// and obtains the handle **0**.
    pub fn new(missing_tex: Texture) -> Self {
        let mut by_name = HashMap::new();
        by_name.insert("MISSING".into(), NO_TEXTURE);
        Self {
            by_name,
            data: vec![missing_tex],
            palette: Palette::default(),
            colormap: Colormap::default(),
        }
    }

    pub fn set_palette(&mut self, palette: Palette) {
        self.palette = palette;
    }

    pub fn set_colormap(&mut self, colormap: Colormap) {
        self.colormap = colormap;
    }

    #[inline]
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    #[inline]
    pub fn colormap(&self) -> &Colormap {
        &self.colormap
    }

    pub fn default_with_checker() -> Self {
        Self::new(Texture::default())
    }

    // ---------------------------------------------------------------------
    // Query helpers
    // ---------------------------------------------------------------------

    /// Number of textures stored (including the “missing” one).
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.len() == 1
    } // only checker

    /// Obtain the id for a *loaded* texture by name.
    /// Returns `None` if the name is unknown.
    pub fn id(&self, name: &str) -> Option<TextureId> {
        self.by_name.get(name).copied()
    }

    /// Fallback-safe query: unknown names resolve to the checkerboard id.
    pub fn id_or_missing(&self, name: &str) -> TextureId {
        self.id(name).unwrap_or(NO_TEXTURE)
    }

    /// Borrow a texture by id, with bounds-checking.
    pub fn texture(&self, id: TextureId) -> Result<&Texture, TextureError> {
        self.data.get(id as usize).ok_or(TextureError::BadId(id))
    }

    /// Resolve an optional surface texture; absent, bad or empty ones yield
    /// `None`.
    #[inline]
    pub fn surface(&self, id: Option<TextureId>) -> Option<&Texture> {
        id.and_then(|id| self.data.get(id as usize))
            .filter(|t| t.is_drawable())
    }

    /// Mutable borrow (e.g. for post-load animation).
    pub fn texture_mut(&mut self, id: TextureId) -> Result<&mut Texture, TextureError> {
        self.data
            .get_mut(id as usize)
            .ok_or(TextureError::BadId(id))
    }

    // ---------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------

    /// Insert a texture under `name`.
    ///
    /// * Returns the newly assigned `TextureId`.
    /// * Fails if the name already exists (`Duplicate`).
    /// * Fails for empty or short pixel data (`BadSize`).
    pub fn insert<S: Into<String>>(
        &mut self,
        name: S,
        tex: Texture,
    ) -> Result<TextureId, TextureError> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(TextureError::Duplicate(name));
        }
        if !tex.is_drawable() {
            return Err(TextureError::BadSize {
                name,
                w: tex.w,
                h: tex.h,
                len: tex.pixels.len(),
            });
        }
        let id = self.data.len() as TextureId;
        self.data.push(tex);
        self.by_name.insert(name, id);
        Ok(id)
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_tex(color: u8) -> Texture {
        Texture {
            name: "Dummy".to_string(),
            w: 2,
            h: 2,
            pixels: vec![color; 4],
        }
    }

    #[test]
    fn insert_and_lookup() {
        let mut bank = TextureBank::default_with_checker();
        let red = bank.insert("RED", dummy_tex(0x00)).unwrap();
        let blue = bank.insert("BLUE", dummy_tex(0xFF)).unwrap();

        assert_ne!(red, NO_TEXTURE);
        assert_ne!(blue, red);
        assert_eq!(bank.id("RED"), Some(red));
        assert_eq!(bank.id("BLUE"), Some(blue));
        assert_eq!(bank.id("NOPE"), None);

        assert_eq!(bank.texture(red).unwrap().pixels[0], 0x00);
        assert_eq!(bank.texture(blue).unwrap().pixels[0], 0xFF);
    }

    #[test]
    fn duplicate_name_rejected() {
        let mut bank = TextureBank::default_with_checker();
        bank.insert("WOOD", dummy_tex(1)).unwrap();
        let err = bank.insert("WOOD", dummy_tex(2)).unwrap_err();
        assert_eq!(err, TextureError::Duplicate("WOOD".into()));
        // texture count still 2 (checker + first WOOD)
        assert_eq!(bank.len(), 2);
    }

    #[test]
    fn bad_id_guard() {
        let bank = TextureBank::default_with_checker();
        let bad = TextureId::MAX;
        assert_eq!(bank.texture(bad).unwrap_err(), TextureError::BadId(bad));
        assert!(bank.surface(Some(bad)).is_none());
        assert!(bank.surface(None).is_none());
    }

    #[test]
    fn empty_texture_rejected() {
        let mut bank = TextureBank::default_with_checker();
        let flat = Texture {
            name: "FLAT".into(),
            w: 4,
            h: 0,
            pixels: Vec::new(),
        };
        assert!(matches!(
            bank.insert("FLAT", flat),
            Err(TextureError::BadSize { w: 4, h: 0, .. })
        ));
        let short = Texture {
            name: "SHORT".into(),
            w: 4,
            h: 4,
            pixels: vec![1; 3],
        };
        assert!(bank.insert("SHORT", short).is_err());
        assert_eq!(bank.len(), 1);
        assert_eq!(bank.id("FLAT"), None);
    }

    #[test]
    fn emptied_texture_is_not_a_surface() {
        let mut bank = TextureBank::default_with_checker();
        let id = bank.insert("RED", dummy_tex(3)).unwrap();
        assert!(bank.surface(Some(id)).is_some());
        bank.texture_mut(id).unwrap().w = 0;
        assert!(bank.surface(Some(id)).is_none());
    }

    #[test]
    fn wrap_handles_negative_and_npot() {
        let pot = dummy_tex(1);
        assert_eq!(pot.wrap_u(-1), 1);
        assert_eq!(pot.wrap_v(5), 1);
        let npot = Texture {
            name: "N".into(),
            w: 3,
            h: 3,
            pixels: vec![0; 9],
        };
        assert_eq!(npot.wrap_u(-1), 2);
        assert_eq!(npot.wrap_v(7), 1);
    }

    #[test]
    fn palette_from_bytes() {
        let pal = Palette::from_rgb_bytes(&[0x12, 0x34, 0x56, 0xFF, 0, 0]);
        assert_eq!(pal[0], 0x12_34_56);
        assert_eq!(pal[1], 0xFF_00_00);
        assert_eq!(pal[2], 0);
    }

    #[test]
    fn colormap_fades_monotonically() {
        let pal = Palette::demo();
        let map = Colormap::fade_to_black(&pal);
        assert_eq!(map.levels(), LIGHT_LEVELS);

        let bright = ramp_index(1, 31);
        // full-bright row is the identity
        assert_eq!(map[LIGHT_LEVELS - 1][bright as usize], bright);
        // transparent key survives every level
        assert!(map.0.iter().all(|row| row[TRANSPARENT as usize] == TRANSPARENT));

        let luma = |idx: u8| {
            let c = pal[idx as usize];
            ((c >> 16) & 0xFF) + ((c >> 8) & 0xFF) + (c & 0xFF)
        };
        let dark = luma(map[0][bright as usize]);
        let mid = luma(map[LIGHT_LEVELS / 2][bright as usize]);
        let full = luma(map[LIGHT_LEVELS - 1][bright as usize]);
        assert!(dark < mid && mid < full, "fade not monotonic: {dark} {mid} {full}");
    }
}
