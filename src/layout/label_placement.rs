// Label tracks and pairwise width fitting for ring labels.
// The geometry here is pure; the pass in targets.rs owns the views.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI, TAU};

use crate::ir::NodeId;
use crate::tween::lerp;

use super::targets::TargetPass;
use super::types::NodeView;

/// Per ring band: the next tangential track to use, plus the first and the
/// most recent label placed in every track. Slot `count` of a band is its
/// radial track.
#[derive(Debug, Clone, Default)]
pub struct LabelTracks {
    counts: Vec<usize>,
    offsets: Vec<usize>,
    last: Vec<Vec<Option<NodeId>>>,
    first: Vec<Vec<Option<NodeId>>>,
}

impl LabelTracks {
    pub fn new(counts: &[usize]) -> Self {
        Self {
            counts: counts.to_vec(),
            offsets: counts.iter().map(|count| count.saturating_sub(1) / 2).collect(),
            last: counts.iter().map(|count| vec![None; count + 1]).collect(),
            first: counts.iter().map(|count| vec![None; count + 1]).collect(),
        }
    }

    pub fn count(&self, ring: usize) -> usize {
        self.counts.get(ring).copied().unwrap_or(0)
    }

    pub fn offset(&self, ring: usize) -> usize {
        self.offsets.get(ring).copied().unwrap_or(0)
    }

    /// Every placed label worth comparing against, each flagged with whether
    /// it sits in a radial track. Latest before first within a slot.
    pub fn neighbours(&self) -> Vec<(NodeId, bool)> {
        let mut out = Vec::new();
        for (ring, count) in self.counts.iter().enumerate() {
            for slot in 0..=*count {
                let radial = slot == *count;
                if let Some(id) = self.last[ring][slot] {
                    out.push((id, radial));
                }
                if let Some(id) = self.first[ring][slot] {
                    out.push((id, radial));
                }
            }
        }
        out
    }

    pub fn place_radial(&mut self, ring: usize, id: NodeId) {
        let slot = self.count(ring);
        self.place(ring, slot, id);
    }

    /// Puts `id` in track `slot` and moves the ring on to its next track.
    pub fn place_tangential(&mut self, ring: usize, slot: usize, id: NodeId) {
        let count = self.count(ring);
        if count == 0 {
            return;
        }
        self.place(ring, slot.min(count - 1), id);
        self.offsets[ring] = (slot + 1) % count;
    }

    fn place(&mut self, ring: usize, slot: usize, id: NodeId) {
        let (Some(last), Some(first)) = (
            self.last.get_mut(ring).and_then(|slots| slots.get_mut(slot)),
            self.first.get_mut(ring).and_then(|slots| slots.get_mut(slot)),
        ) else {
            return;
        };
        *last = Some(id);
        first.get_or_insert(id);
    }
}

/// What the width fitter needs to know about one label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelSlot {
    pub angle: f64,
    pub label_radius: f64,
    pub width: f64,
    pub radial: bool,
    /// Where a radial label is centred, as a fraction of the chart radius.
    pub radial_radius: f64,
}

impl LabelSlot {
    pub fn of(view: &NodeView) -> Self {
        Self {
            angle: view.mid_angle_target(),
            label_radius: view.label_radius.end,
            width: view.label_width.end,
            radial: view.radial,
            radial_radius: (view.radius_inner.end + 1.0) / 2.0,
        }
    }
}

/// Narrows `this` (a tangential label) and/or `other` so they stop
/// overlapping. Returns the new widths, never negative. The second label of
/// a contested pair gives way when both reach past the midpoint.
pub fn fit_label_pair(this: &LabelSlot, other: &LabelSlot, radius: f64, font_size: f64) -> (f64, f64) {
    let mut this_width = this.width;
    let mut other_width = other.width;

    let mut angle = (this.angle - other.angle).abs();
    if angle == 0.0 || !angle.is_finite() {
        return (this_width.max(0.0), other_width.max(0.0));
    }
    if angle > PI {
        angle = TAU - angle;
    }

    if other.radial {
        if angle < FRAC_PI_2 {
            let r = this.label_radius * radius + 0.5 * font_size;
            let hypotenuse = r / angle.cos();
            let opposite = r * angle.tan();
            let font_radius = 0.8 * font_size;
            if other.radial_radius * radius < hypotenuse && this_width / 2.0 + font_radius > opposite {
                this_width = 2.0 * (opposite - font_radius);
            }
        }
    } else if this.label_radius == other.label_radius && angle < FRAC_PI_4 {
        // same track: arc length is close enough
        let dist = angle * this.label_radius * radius - font_size * (1.0 - angle * 4.0 / PI);
        if this_width < dist {
            restrict(&mut other_width, (dist - this_width / 2.0) * 2.0);
        } else if other_width < dist {
            restrict(&mut this_width, (dist - other_width / 2.0) * 2.0);
        } else {
            this_width = dist;
            other_width = dist;
        }
    } else if let Some((l1, l2)) = tangent_reach(this, other, angle, radius, font_size)
        && this_width / 2.0 > l1
        && other_width / 2.0 > l2
    {
        if l1 > l2 {
            restrict(&mut this_width, 2.0 * l1);
        } else {
            restrict(&mut other_width, 2.0 * l2);
        }
    }

    (this_width.max(0.0), other_width.max(0.0))
}

/// Distances from each label centre to where the two label tangents cross,
/// less a little headroom for glyph height.
fn tangent_reach(this: &LabelSlot, other: &LabelSlot, angle: f64, radius: f64, font_size: f64) -> Option<(f64, f64)> {
    let mut r1 = this.label_radius * radius;
    let mut r2 = other.label_radius * radius;

    // shift baselines toward each other by the font's half height
    let fudge = 0.35 * font_size;
    if this.label_radius < other.label_radius {
        r1 += fudge;
        r2 -= fudge;
    } else if this.label_radius > other.label_radius {
        r1 -= fudge;
        r2 += fudge;
    } else {
        r1 -= fudge;
        r2 -= fudge;
    }

    let dist = (r1 * r1 + r2 * r2 - 2.0 * r1 * r2 * angle.cos()).max(0.0).sqrt();
    let sin_opposite = (PI - angle).sin();
    if dist <= f64::EPSILON || r1.abs() <= f64::EPSILON || sin_opposite.abs() <= f64::EPSILON {
        return None;
    }
    let b = ((r1 * r1 + dist * dist - r2 * r2) / (2.0 * r1 * dist)).clamp(-1.0, 1.0).acos();
    let l1 = (angle + b - FRAC_PI_2).sin() * dist / sin_opposite;
    let l2 = (FRAC_PI_2 - b).sin() * dist / sin_opposite;
    let l1 = l1.abs() - 0.4 * font_size;
    let l2 = l2.abs() - 0.4 * font_size;
    (l1.is_finite() && l2.is_finite()).then_some((l1, l2))
}

fn restrict(width: &mut f64, limit: f64) {
    if limit < *width {
        *width = limit;
    }
}

/// Middle-ellipsis truncation of `name` to roughly `max_width` pixels.
pub fn shorten_label(name: &str, name_width: f64, max_width: f64, ellipsis_width: f64) -> String {
    if name_width <= max_width || name.is_empty() {
        return name.to_string();
    }
    let chars: Vec<char> = name.chars().collect();
    let len = chars.len();
    let keep = ((len - 1) as f64 * max_width / (name_width + ellipsis_width) / 2.0).floor();
    let keep = if keep.is_finite() && keep > 0.0 {
        (keep as usize).min(len / 2)
    } else {
        0
    };
    let mut out: String = chars[..keep].iter().collect();
    out.push_str("...");
    out.extend(&chars[len - keep..]);
    out
}

impl TargetPass<'_> {
    /// Picks the label radius for a non-selected node inside the display
    /// depth, then narrows it and its placed neighbours so they stop
    /// overlapping.
    pub(super) fn set_target_label_radius(&mut self, id: NodeId) {
        let progress = self.ctx.progress;
        let depth = self.relative_depth(id);
        let Some(ring) = usize::try_from(depth - 2).ok() else {
            return;
        };
        let count = self.tracks.count(ring);
        let offset = self.tracks.offset(ring);
        let inner = self.radii.get(ring).copied().unwrap_or(1.0);
        let outer = self.radii.get(ring + 1).copied().unwrap_or(1.0);
        let radial = self.views[id].radial;

        let target = if radial {
            let max = if depth == self.max_display_depth() { 1.0 } else { outer };
            (inner + max) / 2.0
        } else if count > 1 {
            lerp(offset as f64 + 0.75, 0.0, count as f64 + 0.5, inner, outer)
        } else {
            (inner + outer) / 2.0
        };
        self.views[id].label_radius.set_target(target, progress);

        let (hide, keyed) = (self.views[id].hide, self.views[id].keyed);
        if !hide && !keyed && count > 0 {
            for (neighbour, radial_track) in self.tracks.neighbours() {
                if radial_track {
                    self.fit_labels(id, neighbour);
                } else {
                    self.fit_labels(neighbour, id);
                }
            }
            if self.unclassified.can_display_label {
                self.fit_label_against_unclassified(id);
            }
            if radial {
                self.tracks.place_radial(ring, id);
            } else {
                self.tracks.place_tangential(ring, offset, id);
            }
        } else if hide {
            self.views[id].label_width.end = 0.0;
        }
    }

    fn fit_labels(&mut self, this: NodeId, other: NodeId) {
        if this == other || !self.ctx.config.shorten || self.views[this].radial || self.views[other].hide {
            return;
        }
        let (this_width, other_width) = fit_label_pair(
            &LabelSlot::of(&self.views[this]),
            &LabelSlot::of(&self.views[other]),
            self.radius,
            self.ctx.font_size(),
        );
        self.views[this].label_width.end = this_width;
        self.views[other].label_width.end = other_width;
    }

    fn fit_label_against_unclassified(&mut self, this: NodeId) {
        let Some(angle) = self.unclassified.angle else {
            return;
        };
        if !self.ctx.config.shorten || self.views[this].radial {
            return;
        }
        let first_inner = self
            .tree
            .node(self.ctx.selected)
            .children
            .first()
            .map(|child| self.views[*child].radius_inner.end)
            .unwrap_or(1.0);
        let other = LabelSlot {
            angle,
            label_radius: 0.0,
            width: 0.0,
            radial: true,
            radial_radius: (first_inner + 1.0) / 2.0,
        };
        let (this_width, _) = fit_label_pair(
            &LabelSlot::of(&self.views[this]),
            &other,
            self.radius,
            self.ctx.font_size(),
        );
        self.views[this].label_width.end = this_width;
    }
}
