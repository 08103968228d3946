//! Screen-column visibility resolver for the walls of one sector.
//!
//! Segments are accepted one by one; every overlap with an accepted segment
//! is settled by a front/back test and the loser is discarded, removed,
//! truncated or split. Afterwards the accepted spans are pairwise disjoint
//! and sorted by screen X.

use glam::Vec2;
use smallvec::SmallVec;

use crate::renderer::{
    FrameStats, RenderLimits,
    software::{projection::Projection, walls::WallSegment},
};

/// Where a segment lies relative to a line, seen from the eye.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    /// Entirely on the eye's side (endpoints on the line count as neutral).
    Near,
    Far,
    Crossing,
}

fn side_of(l0: Vec2, l1: Vec2, p: Vec2) -> i8 {
    let d = l1 - l0;
    let r = p - l0;
    let c = d.perp_dot(r);
    let eps = 1e-5 * d.length() * r.length();
    if c > eps {
        1
    } else if c < -eps {
        -1
    } else {
        0
    }
}

/// Classify segment `p0..p1` against the line through `l0`, `l1`.
fn segment_crosses_line(l0: Vec2, l1: Vec2, p0: Vec2, p1: Vec2) -> Side {
    let eye = side_of(l0, l1, Vec2::ZERO);
    if eye == 0 {
        return Side::Crossing;
    }
    let s0 = side_of(l0, l1, p0);
    let s1 = side_of(l0, l1, p1);
    if s0 == 0 && s1 == 0 {
        return Side::Crossing;
    }
    if (s0 == 0 || s0 == eye) && (s1 == 0 || s1 == eye) {
        Side::Near
    } else if (s0 == 0 || s0 == -eye) && (s1 == 0 || s1 == -eye) {
        Side::Far
    } else {
        Side::Crossing
    }
}

/// Outcome of comparing two overlapping segments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Order {
    Front,
    Behind,
    /// The walls cross; the nearer one changes at this column.
    CrossAt(i32),
}

/// Is `a` nearer to the eye than `b` where their columns overlap?
fn compare(proj: &Projection, a: &WallSegment, b: &WallSegment) -> Order {
    match segment_crosses_line(a.p0, a.p1, b.p0, b.p1) {
        Side::Far => return Order::Front,
        Side::Near => return Order::Behind,
        Side::Crossing => {}
    }
    match segment_crosses_line(b.p0, b.p1, a.p0, a.p1) {
        Side::Near => return Order::Front,
        Side::Far => return Order::Behind,
        Side::Crossing => {}
    }

    // genuinely crossing: fall back to depth at the shared columns
    let a_nearer = |x: i32| {
        let cx = proj.column_x_over_z[x as usize];
        a.solve_for_z(cx) <= b.solve_for_z(cx)
    };
    let lo = a.x0.max(b.x0);
    let hi = a.x1.min(b.x1);
    let left = a_nearer(lo);
    if left == a_nearer(hi) {
        return if left { Order::Front } else { Order::Behind };
    }
    let (mut lo, mut hi) = (lo, hi);
    while hi - lo > 1 {
        let mid = (lo + hi) / 2;
        if a_nearer(mid) == left {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Order::CrossAt(hi)
}

/// Resolve `input` into `out`: disjoint, nearest-wins, sorted by `x0`.
///
/// Capacity overflows (`max_sector_segs`, `max_split_walls`) drop the
/// offending span and are reported through `stats`. A segment that does not
/// fit leaves the accepted list exactly as it was, so no column loses its
/// wall and the list never grows past `max_sector_segs`.
pub fn merge_sort(
    proj: &Projection,
    input: &[WallSegment],
    out: &mut Vec<WallSegment>,
    limits: &RenderLimits,
    stats: &mut FrameStats,
) {
    out.clear();
    let mut pending: SmallVec<[WallSegment; 32]> = input.iter().rev().copied().collect();
    let mut splits = 0usize;
    let cap = limits.max_sector_segs;
    let mut rollback: Vec<WallSegment> = Vec::new();

    while let Some(mut seg) = pending.pop() {
        // one segment grows `out` by at most two: itself and one carved piece
        let guarded = out.len() + 2 > cap;
        if guarded {
            rollback.clear();
            rollback.extend_from_slice(out);
        }
        let mut hidden = false;
        let mut i = 0;
        while i < out.len() {
            if !seg.overlaps(&out[i]) {
                i += 1;
                continue;
            }
            let ov0 = seg.x0.max(out[i].x0);
            let ov1 = seg.x1.min(out[i].x1);

            let order = match compare(proj, &seg, &out[i]) {
                Order::CrossAt(xc) if splits < limits.max_split_walls => {
                    // settle each side of the crossing separately
                    let mut right = seg;
                    right.x0 = xc;
                    seg.x1 = xc - 1;
                    splits += 1;
                    pending.push(right);
                    continue;
                }
                Order::CrossAt(_) => {
                    stats.split_pool_exhausted(limits.max_split_walls);
                    let mid = (ov0 + ov1) / 2;
                    let cx = proj.column_x_over_z[mid as usize];
                    if seg.solve_for_z(cx) <= out[i].solve_for_z(cx) {
                        Order::Front
                    } else {
                        Order::Behind
                    }
                }
                order => order,
            };

            if order == Order::Front {
                let other = &mut out[i];
                if ov0 <= other.x0 && ov1 >= other.x1 {
                    // hidden completely; `i` now holds the last element
                    out.swap_remove(i);
                    continue;
                }
                if ov0 > other.x0 && ov1 < other.x1 {
                    let mut right = *other;
                    right.x0 = ov1 + 1;
                    other.x1 = ov0 - 1;
                    if splits < limits.max_split_walls {
                        splits += 1;
                        out.push(right);
                    } else {
                        stats.split_pool_exhausted(limits.max_split_walls);
                    }
                } else if ov0 <= other.x0 {
                    other.x0 = ov1 + 1;
                } else {
                    other.x1 = ov0 - 1;
                }
            } else {
                if ov0 <= seg.x0 && ov1 >= seg.x1 {
                    hidden = true;
                    break;
                }
                if ov0 > seg.x0 && ov1 < seg.x1 {
                    let mut right = seg;
                    right.x0 = ov1 + 1;
                    seg.x1 = ov0 - 1;
                    if splits < limits.max_split_walls {
                        splits += 1;
                        pending.push(right);
                    } else {
                        stats.split_pool_exhausted(limits.max_split_walls);
                    }
                } else if ov0 <= seg.x0 {
                    seg.x0 = ov1 + 1;
                } else {
                    seg.x1 = ov0 - 1;
                }
            }
            i += 1;
        }

        if out.len() + usize::from(!hidden) > cap {
            stats.merged_pool_exhausted(cap);
            if guarded {
                out.clear();
                out.extend_from_slice(&rollback);
            }
            continue;
        }
        if !hidden {
            out.push(seg);
        }
    }

    out.sort_unstable_by_key(|s| s.x0);
}
