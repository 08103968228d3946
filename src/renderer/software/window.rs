/// Per-depth column windows and 1-D depth buffers.
///
/// * Row `d` holds the vertical bounds visible through the chain of
///   portals that leads to recursion depth `d`; `top > bot` = closed column.
/// * Within one depth the sectors drawn occupy disjoint column ranges, so
///   each row can be shared by all of them.
/// * Child windows are always cut out of the parent's:
///   `top[d] <= top[d+1] <= bot[d+1] <= bot[d]` wherever depth `d+1` is open.
#[derive(Debug, Default)]
pub struct WindowStack {
    width: usize,
    height: usize,
    depths: usize,
    top: Vec<i32>,
    bot: Vec<i32>,
    depth1d: Vec<f32>,
}

impl WindowStack {
    /// Depth 0 fully open, every deeper window closed, depth buffers empty.
    pub fn reset(&mut self, width: usize, height: usize, max_depth: usize) {
        self.width = width;
        self.height = height;
        self.depths = max_depth + 1;
        let n = width * self.depths;
        self.top.clear();
        self.top.resize(n, height as i32);
        self.bot.clear();
        self.bot.resize(n, -1);
        self.depth1d.clear();
        self.depth1d.resize(n, f32::MAX);

        self.top[..width].fill(0);
        self.bot[..width].fill(height as i32 - 1);
    }

    #[inline]
    pub fn depths(&self) -> usize {
        self.depths
    }

    #[inline]
    fn row(&self, depth: usize) -> std::ops::Range<usize> {
        depth * self.width..(depth + 1) * self.width
    }

    #[inline]
    pub fn top(&self, depth: usize) -> &[i32] {
        &self.top[self.row(depth)]
    }

    #[inline]
    pub fn bot(&self, depth: usize) -> &[i32] {
        &self.bot[self.row(depth)]
    }

    #[inline]
    pub fn depth1d(&self, depth: usize) -> &[f32] {
        &self.depth1d[self.row(depth)]
    }

    /// Open rows `(top, bot)` of column `x` at `depth`, if any.
    #[inline]
    pub fn column(&self, depth: usize, x: i32) -> Option<(i32, i32)> {
        let i = depth * self.width + x as usize;
        let (t, b) = (self.top[i], self.bot[i]);
        (t <= b).then_some((t, b))
    }

    /// Record an opaque surface at depth `z`; never pushes the depth back.
    #[inline]
    pub fn write_depth(&mut self, depth: usize, x: i32, z: f32) {
        let d = &mut self.depth1d[depth * self.width + x as usize];
        if z < *d {
            *d = z;
        }
    }

    #[inline]
    pub fn depth_at(&self, depth: usize, x: i32) -> f32 {
        self.depth1d[depth * self.width + x as usize]
    }

    /// Narrow the window of `depth + 1` over `x0 ..= x1` to the opening
    /// `opening_top[x] ..= opening_bot[x]` (indexed by screen column).
    ///
    /// Returns whether any column stayed open.
    pub fn open_child(
        &mut self,
        depth: usize,
        x0: i32,
        x1: i32,
        opening_top: &[i32],
        opening_bot: &[i32],
    ) -> bool {
        let child = depth + 1;
        if child >= self.depths {
            return false;
        }
        let mut any = false;
        for x in x0..=x1 {
            let p = depth * self.width + x as usize;
            let c = child * self.width + x as usize;
            let t = self.top[p].max(opening_top[x as usize]);
            let b = self.bot[p].min(opening_bot[x as usize]);
            self.top[c] = t;
            self.bot[c] = b;
            self.depth1d[c] = f32::MAX;
            any |= t <= b;
        }
        any
    }
}
