use crate::ir::{NodeId, Tree};
use crate::tween::lerp;

use super::types::ViewContext;

/// Upper bound on depth-fit passes. Each pass strictly lowers the candidate
/// depth, so this only trips on a pathological tree.
const MAX_FIT_ITERATIONS: usize = 64;

/// Offset search bound for the arctangent spacing.
const MAX_ATAN_OFFSET: f64 = 10.0;

/// Inner radius of each ring relative to the selected node.
///
/// `radii[0]` bounds the centre disc (the selected node). The ring at
/// relative depth `d >= 2` starts at `radii[d - 2]`; the last entry marks the
/// outer edge reserved for labels of the deepest ring.
#[derive(Debug, Clone, PartialEq)]
pub struct RingRadii {
    pub radii: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
}

impl RingRadii {
    pub fn max_display_depth(&self) -> usize {
        self.radii.len()
    }
}

/// Radii for `max_depth` rings inside a chart of `radius` pixels.
pub fn ring_radii(max_depth: usize, font_size: f64, radius: f64, compress: bool) -> Vec<f64> {
    let max_depth = max_depth.max(1);
    if !compress {
        return (0..max_depth)
            .map(|index| (index + 1) as f64 / max_depth as f64)
            .collect();
    }

    let min_inner = (font_size * 8.0 / radius).min(0.25);
    let min_first = (font_size * 6.0 / radius).min(0.15);
    let min_outer = (font_size * 5.0 / radius).min(0.15);
    let outer = 1.0 - min_outer;
    let top = max_depth as f64 - 1.0;

    // Slide along the arctangent until the first ring is no wider than
    // `min_first`, then back off one step.
    let mut offset = 0.0;
    if max_depth > 2 {
        while offset < MAX_ATAN_OFFSET
            && lerp(
                (offset + 2.0).atan(),
                (offset + 1.0).atan(),
                (top + offset).atan(),
                min_inner,
                outer,
            ) - min_inner
                > min_first
        {
            offset += 1.0;
        }
    }
    offset -= 1.0;

    let mut radii = Vec::with_capacity(max_depth);
    radii.push(min_inner);
    for index in 1..max_depth {
        radii.push(lerp(
            (index as f64 + offset).atan(),
            offset.atan(),
            (top + offset).atan(),
            min_inner,
            outer,
        ));
    }
    radii
}

/// Finds the deepest ring that still shows legible wedges, refitting the
/// ring spacing until the depth stops shrinking.
pub fn compute_radii(tree: &Tree, ctx: &ViewContext<'_>, radius: f64, angle_factor: f64) -> RingRadii {
    let selected = ctx.selected;
    let policy = ctx.policy;
    let max_possible = ((radius / (ctx.font_size() * ctx.config.min_ring_width_factor)).floor() as usize).max(4);

    let start = tree
        .display_max_depth(selected, policy)
        .saturating_sub(tree.display_depth(selected, policy))
        + 1;
    let mut candidate = start.max(1);
    let mut iterations = 0;
    let mut last_stable: Option<Vec<f64>> = None;

    loop {
        iterations += 1;
        let mut max_depth = candidate;
        if !ctx.config.compress && max_depth > max_possible {
            max_depth = max_possible;
        }
        let radii = ring_radii(max_depth, ctx.font_size(), radius, ctx.config.compress);
        let visible = max_visible_depth(tree, ctx, selected, max_depth, &radii, radius, angle_factor);

        if visible >= max_depth {
            return RingRadii {
                radii,
                iterations,
                converged: true,
            };
        }
        if iterations >= MAX_FIT_ITERATIONS {
            log::warn!(
                "ring depth did not settle after {iterations} passes; keeping depth {}",
                radii.len()
            );
            let radii = last_stable.unwrap_or(radii);
            return RingRadii {
                radii,
                iterations,
                converged: false,
            };
        }
        last_stable = Some(radii);
        candidate = visible.max(1);
    }
}

/// Deepest relative depth under `id` reachable through wedges at least
/// `min_width` pixels wide, given trial `radii`.
pub fn max_visible_depth(
    tree: &Tree,
    ctx: &ViewContext<'_>,
    id: NodeId,
    max_depth: usize,
    radii: &[f64],
    radius: f64,
    angle_factor: f64,
) -> usize {
    let policy = ctx.policy;
    let depth = (tree.display_depth(id, policy) + 1).saturating_sub(tree.display_depth(ctx.selected, policy));
    let mut current = depth;
    if !tree.has_children(id, policy) || depth >= max_depth {
        return current;
    }

    let node = tree.node(id);
    if let Some(last) = node.children.last().map(|child| tree.node(*child))
        && last.magnitude_end() < node.magnitude_end() - node.magnitude * 1e-12
    {
        // room for the unclassified filler one ring further out
        current += 1;
    }

    let child_inner = radii.get(depth.saturating_sub(1)).copied().unwrap_or(1.0);
    let min_width = ctx.min_width();
    for child in &node.children {
        let magnitude = tree.node(*child).magnitude;
        if magnitude * angle_factor * (child_inner + 1.0) * radius >= min_width {
            current = current.max(max_visible_depth(tree, ctx, *child, max_depth, radii, radius, angle_factor));
        }
    }
    current
}

/// Number of tangential label tracks per ring band, `[0]` being the band
/// just outside the centre disc.
pub fn label_offset_counts(radii: &[f64], radius: f64, font_size: f64, max_offsets: usize) -> Vec<usize> {
    if font_size <= 0.0 {
        return vec![0; radii.len().saturating_sub(1)];
    }
    radii
        .windows(2)
        .map(|pair| {
            let width = ((pair[1] - pair[0]) * radius).max(0.0);
            let tracks = (width / font_size / 1.2).floor() as usize;
            if tracks > 2 {
                ((width / font_size / 1.75).floor() as usize).min(max_offsets)
            } else {
                tracks
            }
        })
        .collect()
}
