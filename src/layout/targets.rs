use std::f64::consts::TAU;

use crate::ir::{NodeId, Tree};
use crate::theme::hsl_to_rgb;
use crate::tween::lerp;

use super::label_placement::LabelTracks;
use super::text::format_percentage;
use super::types::{NodeView, Unclassified, ViewContext};

/// Hue span handed to any subtree is capped so siblings stay distinct.
const MAX_HUE_SPAN: f64 = 1.0 / 12.0;

/// One target-assignment walk over the whole tree.
pub(super) struct TargetPass<'a> {
    pub tree: &'a Tree,
    pub ctx: &'a ViewContext<'a>,
    pub views: &'a mut [NodeView],
    pub radii: &'a [f64],
    pub tracks: LabelTracks,
    pub label_counts: &'a [usize],
    pub angle_factor: f64,
    /// Target chart radius in pixels.
    pub radius: f64,
    pub lightness_factor: f64,
    pub font_size_changed: bool,
    pub keys: Vec<NodeId>,
    pub unclassified: Unclassified,
    pub hidden_groups: usize,
}

impl TargetPass<'_> {
    pub(super) fn max_display_depth(&self) -> isize {
        self.radii.len() as isize
    }

    /// Ring index relative to the selected node, which sits at 1.
    pub(super) fn relative_depth(&self, id: NodeId) -> isize {
        let policy = self.ctx.policy;
        self.tree.display_depth(id, policy) as isize - self.tree.display_depth(self.ctx.selected, policy) as isize
            + 1
    }

    fn can_display_depth(&self, id: NodeId) -> bool {
        self.tree.node(id).depth <= self.ctx.policy.max_absolute_depth
    }

    fn ring_radius(&self, index: isize) -> f64 {
        usize::try_from(index)
            .ok()
            .and_then(|index| self.radii.get(index))
            .copied()
            .unwrap_or(1.0)
    }

    fn reset_label_width(&mut self, id: NodeId) {
        let fudge = self.ctx.config.label_width_fudge;
        let progress = self.ctx.progress;
        let name_width = self.ctx.text.width(&self.tree.node(id).name);
        let view = &mut self.views[id];
        let old = view.name_width;
        view.name_width = name_width;
        if self.font_size_changed && view.label_width.end == old * fudge {
            // the font changed under a full-width label: no shrink-and-grow
            view.label_width.start = name_width * fudge;
        } else {
            view.label_width.start = view.label_width.current(progress);
        }
        view.label_width.end = name_width * fudge;
    }

    /// Targets for every node outside the selected subtree (ancestors become
    /// breadcrumbs, the rest fold away), recursing into the selected node.
    pub(super) fn set_targets(&mut self, id: NodeId) {
        let tree = self.tree;
        let selected = self.ctx.selected;
        let progress = self.ctx.progress;
        if id == selected {
            let base = self.ctx.config.lightness_base;
            self.set_targets_selected(id, 0.0, 1.0, base, false, false);
            return;
        }

        let depth_relative = self.relative_depth(id) - 1;
        let ancestor = tree.has_ancestor(selected, id);
        let node = tree.node(id);
        let selected_node = tree.node(selected);

        if ancestor {
            self.reset_label_width(id);
        } else {
            let name_width = self.ctx.text.width(&node.name);
            let view = &mut self.views[id];
            view.name_width = name_width;
            view.label_width.set_target(0.0, progress);
        }

        {
            let view = &mut self.views[id];
            let start = if node.base_magnitude <= selected_node.base_magnitude { 0.0 } else { TAU };
            view.angle_start.set_target(start, progress);
            let end = if ancestor || node.magnitude_end() >= selected_node.magnitude_end() {
                TAU
            } else {
                0.0
            };
            view.angle_end.set_target(end, progress);
        }

        for child in &node.children {
            self.set_targets(*child);
        }

        let font_size = self.ctx.font_size();
        let spacing = self.ctx.config.history_spacing_factor;
        let (radius_inner, label_radius) = if depth_relative < 1 {
            let label_radius = if ancestor {
                (-depth_relative) as f64 * spacing * font_size / self.radius
            } else {
                0.0
            };
            (0.0, label_radius)
        } else if depth_relative + 1 > self.max_display_depth() {
            (1.0, 1.0)
        } else {
            let inner = self.ring_radius(depth_relative - 1);
            (inner, (inner + self.ring_radius(depth_relative)) / 2.0)
        };

        let breadcrumb_alpha = if ancestor && !tree.is_collapsed(id, self.ctx.policy) {
            let slots = (self.ring_radius(0) * self.radius / (spacing * font_size) - 0.5).floor() + 1.0;
            if slots > 0.0 {
                Some((1.0 - (-depth_relative) as f64 / slots).max(0.0))
            } else {
                Some(0.0)
            }
        } else {
            None
        };

        let same_parent = tree.display_parent(id, self.ctx.policy) == tree.display_parent(selected, self.ctx.policy);
        let view = &mut self.views[id];
        view.radius_inner.set_target(radius_inner, progress);
        view.label_radius.set_target(label_radius, progress);
        view.breadcrumb = ancestor;
        for channel in [&mut view.r, &mut view.g, &mut view.b] {
            channel.set_target(255.0, progress);
        }
        for alpha in [
            &mut view.alpha_line,
            &mut view.alpha_arc,
            &mut view.alpha_wedge,
            &mut view.alpha_pattern,
            &mut view.alpha_other,
        ] {
            alpha.set_target(0.0, progress);
        }
        match breadcrumb_alpha {
            Some(alpha) => {
                view.alpha_label.set_target(alpha, progress);
                view.radial = false;
            }
            None => view.alpha_label.set_target(0.0, progress),
        }

        view.hide_alone_prev = view.hide_alone;
        view.hide_prev = view.hide;
        if ancestor {
            view.hide_alone = false;
            view.hide = false;
        }
        if same_parent {
            view.hidden_end = None;
        }
        view.radial_prev = view.radial;
    }

    /// Targets for the selected node and its descendants. `hue_min` and
    /// `hue_max` bound the hues this subtree may use; `hide` forces the whole
    /// subtree into the hidden state.
    pub(super) fn set_targets_selected(
        &mut self,
        id: NodeId,
        hue_min: f64,
        hue_max: f64,
        lightness: f64,
        hide: bool,
        next_sibling_hidden: bool,
    ) {
        let tree = self.tree;
        let ctx = self.ctx;
        let config = ctx.config;
        let progress = ctx.progress;
        let policy = ctx.policy;
        let selected = ctx.selected;
        let is_selected = id == selected;
        let node = tree.node(id);
        let children = &node.children;
        let collapse = tree.is_collapsed(id, policy);
        let depth = self.relative_depth(id);
        let max_display_depth = self.max_display_depth();
        let has_children = tree.has_children(id, policy);
        let last_child = if has_children { children.last().copied() } else { None };

        self.views[id].hide_alone = has_children;
        if self.views[id].keyed {
            self.keys.push(id);
        }

        for child in children {
            self.set_target_wedge(*child);
            if !self.views[*child].hide
                && (collapse || depth < max_display_depth)
                && node.depth < policy.max_absolute_depth
            {
                self.views[id].hide_alone = false;
            }
        }

        if is_selected
            || last_child.is_some_and(|last| self.views[last].angle_end.end < self.views[id].angle_end.end - 0.01)
        {
            self.views[id].hide_alone = false;
        }

        if is_selected {
            self.set_unclassified(id, last_child);
            let view = &mut self.views[id];
            view.angle_start.set_target(0.0, progress);
            view.angle_end.set_target(TAU, progress);
            view.radius_inner.set_target(0.0, progress);
            view.hide_prev = view.hide;
            view.hide = false;
            view.hide_alone_prev = view.hide_alone;
            view.hide_alone = false;
            view.keyed = false;
            view.breadcrumb = false;
        }

        let hue_max = hue_max.min(hue_min + MAX_HUE_SPAN);
        let hide_alone = self.views[id].hide_alone;
        let lightness = if hide || hide_alone {
            lightness
        } else if ctx.use_hue {
            (config.lightness_base + config.lightness_max) / 2.0
        } else {
            (config.lightness_base + (depth - 1) as f64 * self.lightness_factor).min(config.lightness_max)
        };

        if hide {
            self.views[id].hide = true;
        }
        let own_hide = self.views[id].hide;
        if !own_hide {
            self.views[id].hidden_end = None;
        }
        let keyed = self.views[id].keyed;
        let dataset = tree.dataset();

        let count = children.len();
        let mut hidden_start: Option<usize> = None;
        let mut hidden_hue_numer = 0.0;
        let mut hidden_hue_denom = 0.0;
        let mut index = 0;
        loop {
            if !hide_alone && !hide && (index == count || !self.views[children[index]].hide) {
                // flush the run of hidden siblings that just ended
                if let Some(start) = hidden_start {
                    let hue = if hidden_hue_denom > 0.0 {
                        hidden_hue_numer / hidden_hue_denom
                    } else {
                        hue_min
                    };
                    for member in start..index {
                        self.set_targets_selected(children[member], hue, hue, lightness, false, member + 1 < index);
                        self.views[children[member]].hidden_end = None;
                    }
                    self.views[children[start]].hidden_end = Some(index - 1);
                    self.hidden_groups += 1;
                }
            }
            if index == count {
                break;
            }

            let child = tree.node(children[index]);
            let (child_hue_min, child_hue_max) = if node.magnitude > 0.0 && !own_hide && !hide_alone {
                if ctx.use_hue {
                    let hue = child.hue(dataset).unwrap_or(hue_min);
                    (hue, hue)
                } else if is_selected {
                    sibling_hues(index, count)
                } else {
                    (
                        lerp(child.base_magnitude, node.base_magnitude, node.magnitude_end(), hue_min, hue_max),
                        lerp(
                            child.base_magnitude + child.magnitude * 0.99,
                            node.base_magnitude,
                            node.magnitude_end(),
                            hue_min,
                            hue_max,
                        ),
                    )
                }
            } else {
                (hue_min, hue_max)
            };

            if !hide_alone && !hide && !own_hide && self.views[child.id].hide {
                hidden_start.get_or_insert(index);
                if ctx.use_hue {
                    hidden_hue_numer += child_hue_min * child.magnitude;
                    hidden_hue_denom += child.magnitude;
                } else {
                    hidden_hue_numer += child_hue_min;
                    hidden_hue_denom += 1.0;
                }
            } else {
                hidden_start = None;
                hidden_hue_numer = 0.0;
                hidden_hue_denom = 0.0;
                self.set_targets_selected(
                    child.id,
                    child_hue_min,
                    child_hue_max,
                    lightness,
                    hide || keyed || hide_alone || (own_hide && !collapse),
                    false,
                );
            }
            index += 1;
        }

        self.views[id].radial_prev = self.views[id].radial;

        if is_selected {
            self.reset_label_width(id);
            let view = &mut self.views[id];
            view.label_width.set_target(view.name_width * config.label_width_fudge, progress);
            view.alpha_wedge.set_target(0.0, progress);
            view.alpha_label.set_target(1.0, progress);
            view.alpha_other.set_target(1.0, progress);
            view.alpha_arc.set_target(0.0, progress);
            view.alpha_line.set_target(0.0, progress);
            view.alpha_pattern.set_target(0.0, progress);
            for channel in [&mut view.r, &mut view.g, &mut view.b] {
                channel.set_target(255.0, progress);
            }
            view.radial = false;
            view.label_radius.set_target(0.0, progress);
            return;
        }

        let can_display_depth = self.can_display_depth(id);
        let beyond = depth > max_display_depth || !can_display_depth;
        let min_width = ctx.min_width();
        let radius = self.radius;
        let label_tracks = usize::try_from(depth - 2)
            .ok()
            .and_then(|ring| self.label_counts.get(ring))
            .copied()
            .unwrap_or(0);
        let last_child_end = last_child.map(|last| self.views[last].angle_end.end);

        let [r, g, b] = hsl_to_rgb(hue_min, config.saturation, lightness);
        let view = &mut self.views[id];
        view.r.set_target(r, progress);
        view.g.set_target(g, progress);
        view.b.set_target(b, progress);
        view.alpha_other.set_target(0.0, progress);
        view.alpha_wedge.set_target(1.0, progress);
        let pattern = if view.hide || view.hide_alone { 1.0 } else { 0.0 };
        view.alpha_pattern.set_target(pattern, progress);

        if !(hide || view.hide) {
            view.radial = true;
            if !view.hide_alone
                && depth < max_display_depth
                && let Some(last_end) = last_child_end
            {
                let span = (view.mid_angle_target() - last_end) * (view.radius_inner.end + 1.0) * radius * 2.0;
                if last_end == view.angle_end.end || span < min_width {
                    view.radial = false;
                }
            }
        }

        if collapse || hide || view.hide || view.keyed || beyond {
            view.alpha_label.set_target(0.0, progress);
        } else if view.radial || label_tracks > 0 {
            view.alpha_label.set_target(1.0, progress);
        } else {
            view.alpha_label.set_target(0.0, progress);
            if view.radial_prev {
                view.alpha_label.start = 0.0;
            }
        }

        let arc = if collapse || hide || beyond { 0.0 } else { 1.0 };
        view.alpha_arc.set_target(arc, progress);
        let line = if hide || (view.hide && next_sibling_hidden) || beyond {
            0.0
        } else {
            1.0
        };
        view.alpha_line.set_target(line, progress);

        self.reset_label_width(id);

        if collapse {
            let inner = self.views[id].radius_inner.end;
            self.views[id].label_radius.set_target(inner, progress);
        } else if beyond {
            self.views[id].label_radius.set_target(1.0, progress);
        } else {
            self.set_target_label_radius(id);
        }
    }

    /// Angles, inner radius and hidden/keyed state of a child of a node in
    /// the selected subtree.
    fn set_target_wedge(&mut self, id: NodeId) {
        let tree = self.tree;
        let progress = self.ctx.progress;
        let policy = self.ctx.policy;
        let node = tree.node(id);
        let selected = tree.node(self.ctx.selected);
        let depth = self.relative_depth(id);
        let beyond = depth > self.max_display_depth() || !self.can_display_depth(id);
        let inner = if beyond { 1.0 } else { self.ring_radius(depth - 2) };
        let base = node.base_magnitude - selected.base_magnitude;
        let keyable = depth == 2 && !tree.is_collapsed(id, policy) && node.depth <= policy.max_absolute_depth;
        let min_width = self.ctx.min_width();
        let radius = self.radius;
        let key_label = if keyable {
            let percent = if selected.magnitude > 0.0 {
                node.magnitude / selected.magnitude * 100.0
            } else {
                0.0
            };
            Some(format!("{}   {}%", node.name, format_percentage(percent)))
        } else {
            None
        };
        let key_width = key_label.as_deref().map(|label| self.ctx.text.width(label));

        let view = &mut self.views[id];
        view.angle_start.set_target(base * self.angle_factor, progress);
        view.angle_end.set_target((base + node.magnitude) * self.angle_factor, progress);
        view.radius_inner.set_target(inner, progress);
        view.breadcrumb = false;
        view.hide_prev = view.hide;
        view.hide_alone_prev = view.hide_alone;

        if view.angle_width_target() * (inner + 1.0) * radius < min_width {
            if let (Some(label), Some(width)) = (key_label, key_width) {
                view.keyed = true;
                view.hide = false;
                view.key_label = label;
                view.key_name_width = width;
            } else {
                view.keyed = false;
                view.hide = depth > 2;
            }
        } else {
            view.keyed = false;
            view.hide = false;
        }
    }

    fn set_unclassified(&mut self, id: NodeId, last_child: Option<NodeId>) {
        let tree = self.tree;
        let node = tree.node(id);
        let Some(last) = last_child else {
            self.unclassified = Unclassified::default();
            return;
        };
        let arc = (self.angle_factor * (node.magnitude_end() - tree.node(last).magnitude_end())).max(0.0);
        let first_inner = node
            .children
            .first()
            .map(|child| self.views[*child].radius_inner.end)
            .unwrap_or(1.0);
        let can_display_label = arc * (first_inner + 1.0) * self.radius >= self.ctx.min_width();
        self.unclassified = Unclassified {
            arc,
            angle: can_display_label.then_some(TAU - arc / 2.0),
            can_display_label,
            keyed: !can_display_label && arc > 1e-10,
        };
    }
}

/// Hue band of child `index` of the selected node, spread over the wheel
/// and bunched toward the start when there are many children.
fn sibling_hues(index: usize, count: usize) -> (f64, f64) {
    let count = count.max(1) as f64;
    let start = index as f64 / count;
    let end = (index as f64 + 0.55) / count;
    if count > 6.0 {
        let warp = |fraction: f64| (1.0 - (1.0 - fraction).max(0.0).powf(1.4)) * 0.95;
        (warp(start), warp(end))
    } else {
        (start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_hues_cover_the_wheel() {
        assert_eq!(sibling_hues(0, 3), (0.0, 0.55 / 3.0));
        let (first, _) = sibling_hues(0, 10);
        let (last, last_end) = sibling_hues(9, 10);
        assert_eq!(first, 0.0);
        assert!(last > 0.8 && last_end <= 0.95);
    }
}
